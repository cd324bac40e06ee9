//! Memoir — a pluggable text retrieval layer over interchangeable vector
//! store backends.
//!
//! This crate re-exports the Memoir sub-crates for convenient single-import
//! usage. Enable features to control which backends are available.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `embeddings`, `vectorstores` |
//! | `embeddings` | Embedding providers (Fake for tests) |
//! | `vectorstores` | In-process flat and clustered indexes with snapshots |
//! | `qdrant` | Qdrant backend |
//! | `mongodb` | MongoDB Atlas Vector Search backend |
//! | `full` | All of the above |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use memoir::core::{Embeddings, VectorStore};
//! use memoir::vectorstores::{LocalStoreConfig, LocalVectorStore};
//! ```

/// Core traits and types: Embeddings, VectorStore, StoreError, StoreStats.
/// Always available.
pub use memoir_core as core;

/// Embedding providers: trait re-export plus Fake for tests.
#[cfg(feature = "embeddings")]
pub use memoir_embeddings as embeddings;

/// In-process vector stores: flat and clustered indexes, disk snapshots.
#[cfg(feature = "vectorstores")]
pub use memoir_vectorstores as vectorstores;

/// Qdrant vector store backend.
#[cfg(feature = "qdrant")]
pub use memoir_qdrant as qdrant;

/// MongoDB Atlas Vector Search backend.
#[cfg(feature = "mongodb")]
pub use memoir_mongodb as mongodb;
