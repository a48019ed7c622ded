//! Engine error kinds
//!
//! Only `UnknownArtist` is user-recoverable; `CorruptStore` and `Io` are
//! fatal for the request and logged with context by the caller. The engine
//! itself stays up across either.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Identifier or name not found; a well-formed negative answer.
    #[error("artist not found: {0}")]
    UnknownArtist(String),

    /// Parameters out of range, rejected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The visit cap was reached before the search concluded.
    #[error("search budget exhausted after visiting {visited} artists")]
    BudgetExceeded { visited: u64, edges: u64 },

    /// Deadline expired or the caller tripped the cancellation flag.
    #[error("search cancelled after visiting {visited} artists")]
    Cancelled { visited: u64 },

    /// Structural violation detected at read time.
    #[error("corrupt store in {file} at offset {offset}: {detail}")]
    CorruptStore {
        file: &'static str,
        offset: u64,
        detail: String,
    },

    /// Mapping or read failure from the operating system.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn corrupt(file: &'static str, offset: u64, detail: impl Into<String>) -> Self {
        EngineError::CorruptStore {
            file,
            offset,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
