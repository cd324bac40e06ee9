//! MongoDB Atlas Vector Search backend for Memoir.
//!
//! This crate provides [`MongoVectorStore`], an implementation of the
//! [`VectorStore`](memoir_core::VectorStore) trait backed by
//! [MongoDB Atlas Vector Search](https://www.mongodb.com/docs/atlas/atlas-vector-search/).
//!
//! # Example
//!
//! ```rust,no_run
//! use memoir_mongodb::{MongoVectorConfig, MongoVectorStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MongoVectorConfig::new("my_database", "my_collection");
//! let store = MongoVectorStore::from_uri("mongodb+srv://...", config).await?;
//! # Ok(())
//! # }
//! ```

mod vector_store;

pub use vector_store::{MongoVectorConfig, MongoVectorStore};

// Re-export core traits for convenience.
pub use memoir_core::{Embeddings, StoreError, StoreStats, VectorStore};
