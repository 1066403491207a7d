//! Error types for MBO → MBP reconstruction.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.
//! Book operations never fail; every variant here originates in the I/O
//! layer (reading events, writing snapshots).

use thiserror::Error;

/// Result type alias for reconstruction operations.
pub type Result<T> = std::result::Result<T, MbpError>;

/// Main error type for reconstruction operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MbpError {
    /// Unknown action code in an MBO record
    #[error("Invalid action: {0:?}")]
    InvalidAction(char),

    /// Unknown side code in an MBO record
    #[error("Invalid side: {0:?}")]
    InvalidSide(char),

    /// Price text that is not a non-negative decimal number
    #[error("Invalid price: {0:?}")]
    InvalidPrice(String),

    /// A numeric field that failed to parse
    #[error("Invalid value for field {field}: {value:?}")]
    InvalidField {
        /// Column name
        field: &'static str,
        /// Raw text of the column
        value: String,
    },

    /// A record that could not be decoded (1-based line number in the source)
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// Line number, counting the header as line 1
        line: u64,
        /// What went wrong
        reason: String,
    },

    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl MbpError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        MbpError::Generic(msg.into())
    }

    /// Attach a line number to a field-level parse error.
    pub fn at_line(self, line: u64) -> Self {
        match self {
            MbpError::MalformedRecord { .. } | MbpError::Io(_) => self,
            other => MbpError::MalformedRecord {
                line,
                reason: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for MbpError {
    fn from(err: std::io::Error) -> Self {
        MbpError::Io(err.to_string())
    }
}

impl From<String> for MbpError {
    fn from(err: String) -> Self {
        MbpError::Generic(err)
    }
}

impl From<&str> for MbpError {
    fn from(err: &str) -> Self {
        MbpError::Generic(err.to_string())
    }
}
