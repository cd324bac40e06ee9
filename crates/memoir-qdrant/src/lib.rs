//! Qdrant vector store backend for Memoir.
//!
//! This crate provides [`QdrantVectorStore`], an implementation of the
//! [`VectorStore`](memoir_core::VectorStore) trait backed by
//! [Qdrant](https://qdrant.tech/).
//!
//! # Example
//!
//! ```rust,no_run
//! use memoir_qdrant::{QdrantConfig, QdrantVectorStore};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QdrantConfig::new("http://localhost:6334", "my_collection", 768);
//! let store = QdrantVectorStore::new(config)?;
//! # Ok(())
//! # }
//! ```

mod vector_store;

pub use vector_store::{QdrantConfig, QdrantVectorStore};

// Re-export core traits for convenience.
pub use memoir_core::{Embeddings, StoreError, StoreStats, VectorStore};
