//! Error taxonomy shared by every index strategy.

use std::io;

/// Coarse classification of an [`IndexError`], used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Dimension mismatch or invalid construction options.
    Configuration,
    /// A fixed capacity (signature bits, graph size) would be exceeded.
    Capacity,
    /// The record source is unreadable, truncated or corrupt.
    Io,
    /// The operation is not valid in the index's current lifecycle phase.
    State,
    /// A search task failed while running on the worker pool.
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("feature dim size should be equal to index feature, while got {actual} vs {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid index configuration: {0}")]
    InvalidConfig(String),

    #[error("capacity exceeded: {required} required, {capacity} available")]
    CapacityExceeded { required: usize, capacity: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupted record source: {0}")]
    Corrupt(String),

    #[error("index is serving; records can no longer be added")]
    Sealed,

    #[error("index has not been finalized and lazy finalization is disabled")]
    NotServing,

    #[error("search task failed: {0}")]
    TaskFailed(String),
}

impl IndexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IndexError::DimensionMismatch { .. } | IndexError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            IndexError::CapacityExceeded { .. } => ErrorKind::Capacity,
            IndexError::Io(_) | IndexError::Corrupt(_) => ErrorKind::Io,
            IndexError::Sealed | IndexError::NotServing => ErrorKind::State,
            IndexError::TaskFailed(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
