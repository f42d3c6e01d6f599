//! Error taxonomy for driver operations.
//!
//! Every driver raises the same set of failures so callers can react
//! uniformly regardless of the source format. Validation errors
//! ([`GeotableError::FormatUnsupported`], [`GeotableError::InvalidIdentifier`],
//! [`GeotableError::TargetAlreadyExists`]) are detected before any mutating
//! statement is issued and leave no side effects.
//! [`GeotableError::MalformedSource`] and [`GeotableError::Cancelled`] may
//! surface after partial COPY-mode commits: batches flushed before the
//! failure stay committed.

use thiserror::Error;

/// Main error type for `geotable` operations.
#[derive(Debug, Error)]
pub enum GeotableError {
    /// The file extension is not declared by any registered driver.
    #[error("Unsupported file extension '{extension}'")]
    FormatUnsupported {
        /// The unmatched extension (lower-cased, without the dot).
        extension: String,
    },

    /// The source file cannot be parsed per its format grammar.
    #[error(
        "Malformed {format} source at line {line}: {message}",
        line = .line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string())
    )]
    MalformedSource {
        /// The format being parsed (e.g. "CSV", "GPX").
        format: String,
        /// Line number where parsing failed, if the parser reports one.
        line: Option<u64>,
        /// Description of the parse failure.
        message: String,
    },

    /// A target table (or one of a GPX table set) already exists and the
    /// delete-existing option was not given.
    #[error("The table {table} already exists")]
    TargetAlreadyExists {
        /// The colliding table reference, formatted.
        table: String,
    },

    /// A derived table name does not satisfy the host identifier grammar.
    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        /// The rejected identifier.
        identifier: String,
        /// Why the identifier was rejected.
        reason: String,
    },

    /// Cancellation was observed at a checkpoint.
    #[error("Canceled by user")]
    Cancelled,

    /// An insert/commit/DDL failure passed through from the host engine.
    #[error("Storage failure: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// Local file I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GeotableError {
    /// Shorthand for a [`GeotableError::Storage`] error.
    pub fn storage(message: impl Into<String>) -> Self {
        GeotableError::Storage {
            message: message.into(),
        }
    }

    /// Shorthand for a [`GeotableError::MalformedSource`] error without a
    /// line position.
    pub fn malformed(format: impl Into<String>, message: impl Into<String>) -> Self {
        GeotableError::MalformedSource {
            format: format.into(),
            line: None,
            message: message.into(),
        }
    }
}

/// Type alias for Results using [`GeotableError`].
pub type Result<T> = std::result::Result<T, GeotableError>;
