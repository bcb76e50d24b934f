//! Error types for the PurpleAir monitor.

use thiserror::Error;

/// Errors that can occur while fetching and converting sensor data.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input (e.g. an empty or mistyped field list)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Network-level failure (connection refused, timeout, DNS, etc.)
    #[error("HTTP transport failed: {0}")]
    Transport(String),

    /// PurpleAir API returned a non-success status code
    #[error("API request failed with status code {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// A success response whose body could not be read or parsed
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A PM2.5 value that is not a number
    #[error("PM value ({0}) is not a number")]
    InvalidInput(String),

    /// A PM2.5 value below zero
    #[error("PM value ({0}) is out of range")]
    OutOfRange(f64),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// How the poll loop reacts to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller bug or bad configuration; surfaced immediately, never retried
    Caller,
    /// Blank the display and retry after the short retry interval
    Recoverable,
    /// Unrecoverable; the process must be restarted
    Fatal,
}

impl Error {
    /// Classify this error for the poll loop.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidArgument(_) | Error::Config(_) => ErrorClass::Caller,
            Error::Transport(_) => ErrorClass::Fatal,
            Error::Api { .. }
            | Error::Decode(_)
            | Error::InvalidInput(_)
            | Error::OutOfRange(_) => ErrorClass::Recoverable,
        }
    }

    /// Returns true if this error requires a process restart.
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Error::InvalidArgument(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
