//! Error types for lossless serialization and reconstruction.
//!
//! Every failure is terminal for the call in progress: the transforms are pure and
//! deterministic, so nothing is retried and no partially reconstructed value is returned.
//!
//! ## Error Categories
//!
//! - **Invalid payloads**: the input to `deserialize` is structurally malformed
//! - **Unknown transforms**: an annotation names a tag with no resolvable inverse
//! - **Path resolution**: an annotation or equivalence path does not exist in the plain value
//! - **Duplicate registrations**: two registry entries claim the same identifier
//!
//! ## Examples
//!
//! ```rust
//! use serde_lossless::{parse, Error};
//!
//! let result = parse(r#"{"json": 1, "meta": {"values": [null, {"x": ["no-such-tag"]}]}}"#);
//! assert!(matches!(result, Err(Error::UnknownTransform(_))));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while serializing or reconstructing values.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The payload handed to `deserialize` is structurally malformed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// An annotation names a transform that cannot be resolved
    #[error("Unknown transform: {0}")]
    UnknownTransform(String),

    /// A path does not exist in the value it is applied to
    #[error("Cannot resolve path `{path}`: {reason}")]
    PathResolution { path: String, reason: String },

    /// Two registry entries claim the same identifier
    #[error("Duplicate {kind} registration for identifier `{identifier}`")]
    DuplicateRegistration {
        kind: &'static str,
        identifier: String,
    },

    /// The value is nested deeper than the configured limit
    #[error("Nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),

    /// A value cannot be expressed in the requested context
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Text-level JSON error (syntax, I/O)
    #[error("JSON error: {0}")]
    Json(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates an invalid payload error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_lossless::Error;
    ///
    /// let err = Error::invalid_payload("missing field `json`");
    /// assert!(err.to_string().contains("missing field"));
    /// ```
    pub fn invalid_payload<T: fmt::Display>(msg: T) -> Self {
        Error::InvalidPayload(msg.to_string())
    }

    /// Creates an unknown transform error for a tag that has no inverse.
    pub fn unknown_transform<T: fmt::Display>(tag: T) -> Self {
        Error::UnknownTransform(tag.to_string())
    }

    /// Creates a path resolution error.
    ///
    /// `path` is the escaped path string as it appears in the payload.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_lossless::Error;
    ///
    /// let err = Error::path_resolution("a.3", "index out of range");
    /// assert!(err.to_string().contains("`a.3`"));
    /// ```
    pub fn path_resolution(path: &str, reason: &str) -> Self {
        Error::PathResolution {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a duplicate registration error.
    pub fn duplicate_registration(kind: &'static str, identifier: &str) -> Self {
        Error::DuplicateRegistration {
            kind,
            identifier: identifier.to_string(),
        }
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_lossless::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Data => Error::InvalidPayload(err.to_string()),
            Category::Io | Category::Syntax | Category::Eof => Error::Json(err.to_string()),
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
