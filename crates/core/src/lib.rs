//! # retrieval-core
//!
//! In-memory k-nearest-neighbor search over feature vectors partitioned by an
//! integer label. Three index strategies (exact cosine, binary signature with
//! Hamming distance, and HNSW) share one contract and one record model; the
//! exact and binary indexes fan bucket scans out across a fixed worker pool.
//!
//! This is the core library crate with no async dependencies. The HTTP service
//! lives in `retrieval-server`.

/// Fixed worker pool and fork-join latch.
pub mod concurrency;
/// Global configuration constants: limits, defaults, and tuning parameters.
pub mod config;
/// Cosine and squared Euclidean distance with runtime SIMD dispatch.
pub mod distance;
/// Error taxonomy and the crate `Result` alias.
pub mod error;
/// Index contract, strategies and dispatch.
pub mod index;
/// Feature record type.
pub mod record;
/// Length-prefixed record frame codec.
pub mod source;

pub use error::{ErrorKind, IndexError, Result};
pub use index::{
    Index, IndexKind, IndexOptions, Neighbor, SearchRequest, SearchResponse,
};
pub use record::{Label, Record};
