//! Error handling for the UTK codec
//!
//! This module defines the error type shared by the codec kernel, the
//! container readers/writers, and the command-line tools, providing
//! detailed information for debugging and consistent exit-code behavior.

use thiserror::Error;

/// Result type alias for UTK operations.
pub type Result<T> = std::result::Result<T, UtkError>;

/// Error type for UTK codec and container operations.
#[derive(Error, Debug)]
pub enum UtkError {
    /// A header or field did not match the expected format.
    #[error("invalid format: {details}")]
    Format { details: String },

    /// Input ended before a header, chunk, or frame was fully read.
    #[error("unexpected end of input: {context}")]
    Truncated { context: String },

    /// An I/O operation on the underlying source or sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Output path already exists and `-f`/force was not given.
    #[error("'{path}' already exists")]
    OutputExists { path: String },

    /// A CLI argument value was outside its documented range.
    #[error("invalid argument: {details}")]
    InvalidArgument { details: String },
}

impl UtkError {
    /// Build a [`UtkError::Format`] from any displayable detail.
    pub fn format(details: impl Into<String>) -> Self {
        Self::Format {
            details: details.into(),
        }
    }

    /// Build a [`UtkError::Truncated`] naming the context that ran out of data.
    pub fn truncated(context: impl Into<String>) -> Self {
        Self::Truncated {
            context: context.into(),
        }
    }

    /// Build an [`UtkError::InvalidArgument`].
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        Self::InvalidArgument {
            details: details.into(),
        }
    }
}
