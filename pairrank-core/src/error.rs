/// Error types for pairrank-core.
///
/// Only contract violations are errors. Domain outcomes such as an infeasible
/// design or a non-convergent solve are reported as values.
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A sample larger than the population was requested.
    #[error("Invalid sample size: requested {requested} items from a population of {population}")]
    InvalidSampleSize { requested: usize, population: usize },

    /// Blocks must hold at least two items to form a pair.
    #[error("Invalid block size {block_size}: blocks need at least 2 items")]
    InvalidBlockSize { block_size: usize },

    /// Win matrices must be square.
    #[error("Win matrix must be square, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },

    /// Win counts must be finite and non-negative.
    #[error("Invalid win count {value} at ({row}, {col})")]
    InvalidCount { row: usize, col: usize, value: f64 },

    /// An index referenced an item outside the matrix or item set.
    #[error("Index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    /// An item cannot beat itself.
    #[error("Item {index} recorded as both winner and loser")]
    SelfComparison { index: usize },

    /// The same item ID was supplied more than once.
    #[error("Duplicate item ID: {id}")]
    DuplicateItem { id: String },

    /// Option validation failed.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
