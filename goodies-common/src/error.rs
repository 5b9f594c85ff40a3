//! # Error taxonomy
//!
//! A closed set of failure kinds shared by the storage engine, the command
//! processor, and every transport. Each variant carries a single textual
//! detail and round-trips through its wire representation `"<Kind>: <detail>"`
//! so that a client on the other side of a transport can reconstruct the
//! original variant from `ErrStr` (see [`GoodiesError::from_wire`]).

use thiserror::Error;

/// Result type used across the engine, processor, and transports.
pub type GoodiesResult<T> = Result<T, GoodiesError>;

/// The closed error enumeration for the goodies cache.
///
/// Variant order matches the dispatch table in `original_source/goodies/errors.go`;
/// unlike that source this type derives its wire prefix from the variant name
/// rather than duplicating it in a format string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GoodiesError {
    /// Dispatch table has no handler for the requested command name.
    #[error("UnknownCommand: {0}")]
    UnknownCommand(String),
    /// Wrong arity, or an argument failed format parsing (non-integer index/ttl).
    #[error("ArgumentsMismatch: {0}")]
    ArgumentsMismatch(String),
    /// Key does not exist, or has expired.
    #[error("NotFound: {0}")]
    NotFound(String),
    /// Key exists but its variant is not the one the operation requires.
    #[error("TypeMismatch: {0}")]
    TypeMismatch(String),
    /// The outer key addresses a dictionary, but the inner key is absent.
    #[error("DictKeyNotFound: {0}")]
    DictKeyNotFound(String),
    /// Serialization or deserialization failed.
    #[error("Transformation: {0}")]
    Transformation(String),
    /// Transport, I/O, or unexpected fault (including caught panics).
    #[error("Internal: {0}")]
    Internal(String),
}

impl GoodiesError {
    /// The wire prefix for this variant, i.e. the `<Kind>` in `"<Kind>: <detail>"`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "UnknownCommand",
            Self::ArgumentsMismatch(_) => "ArgumentsMismatch",
            Self::NotFound(_) => "NotFound",
            Self::TypeMismatch(_) => "TypeMismatch",
            Self::DictKeyNotFound(_) => "DictKeyNotFound",
            Self::Transformation(_) => "Transformation",
            Self::Internal(_) => "Internal",
        }
    }

    /// Reconstructs a [`GoodiesError`] from its wire text (`ErrStr`).
    ///
    /// Chooses a variant by matching the prefix before the first `": "` and
    /// takes everything after the *last* `": "` as the detail, mirroring
    /// `ErrorFromString` in `original_source/goodies/errors.go`. An unknown
    /// prefix maps to [`GoodiesError::Internal`].
    pub fn from_wire(text: &str) -> Self {
        let detail = |s: &str| match s.rfind(": ") {
            Some(idx) => s[idx + 2..].to_string(),
            None => String::new(),
        };
        if text.starts_with("UnknownCommand") {
            Self::UnknownCommand(detail(text))
        } else if text.starts_with("ArgumentsMismatch") {
            Self::ArgumentsMismatch(detail(text))
        } else if text.starts_with("DictKeyNotFound") {
            Self::DictKeyNotFound(detail(text))
        } else if text.starts_with("NotFound") {
            Self::NotFound(detail(text))
        } else if text.starts_with("TypeMismatch") {
            Self::TypeMismatch(detail(text))
        } else if text.starts_with("Transformation") {
            Self::Transformation(detail(text))
        } else if text.starts_with("Internal") {
            Self::Internal(detail(text))
        } else {
            Self::Internal(format!("unknown error received: {text}"))
        }
    }
}
