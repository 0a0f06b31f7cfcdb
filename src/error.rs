//! Error types for the tidewater retrieval engine.

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// A specialized Result type for tidewater operations.
pub type Result<T> = result::Result<T, Error>;

/// Coarse classification used by transport layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request parameters were rejected before any store call.
    ClientInput,
    /// The store has no such series.
    NotFound,
    /// The store or the process failed.
    Server,
}

/// The error type for tidewater operations.
#[derive(Debug)]
pub enum Error {
    /// A begin, end or version date could not be parsed
    InvalidTimeFormat(String),
    /// The begin time carries only an offset and no timezone parameter was given
    AmbiguousTimezone(String),
    /// The resolved window ends before it starts
    InvalidTimeWindow(String),
    /// The version-date and version-type parameters do not agree
    ConflictingVersionParameters(String),
    /// The pagination token could not be decoded
    MalformedCursor(String),
    /// The store has no series with the requested identifier
    SeriesNotFound(String),
    /// A store call failed
    StoreUnavailable(String),
    /// Other rejected input
    Validation(String),
    /// Configuration errors
    Config(String),
    /// I/O errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serialization(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidTimeFormat(_)
            | Error::AmbiguousTimezone(_)
            | Error::InvalidTimeWindow(_)
            | Error::ConflictingVersionParameters(_)
            | Error::MalformedCursor(_)
            | Error::Validation(_) => ErrorKind::ClientInput,
            Error::SeriesNotFound(_) => ErrorKind::NotFound,
            Error::StoreUnavailable(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorKind::Server,
        }
    }

    /// True for errors raised while validating request parameters.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::ClientInput
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTimeFormat(msg) => write!(f, "Invalid time format: {}", msg),
            Error::AmbiguousTimezone(msg) => write!(f, "Ambiguous timezone: {}", msg),
            Error::InvalidTimeWindow(msg) => write!(f, "Invalid time window: {}", msg),
            Error::ConflictingVersionParameters(msg) => {
                write!(f, "Conflicting version parameters: {}", msg)
            }
            Error::MalformedCursor(msg) => write!(f, "Malformed page cursor: {}", msg),
            Error::SeriesNotFound(msg) => write!(f, "Time series not found: {}", msg),
            Error::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}
