use std::fmt::{self, Display, Formatter};

/// Result type returned by all fallible `txkv` operations.
pub type CResult<T> = Result<T, Error>;

/// The single error type surfaced across the crate, per the taxonomy:
/// conflict, constraint, format, capability, and I/O passthrough.
#[derive(Debug)]
pub enum Error {
    /// A commit or reckless write observed a value different from the one
    /// it read or remembered.
    ConcurrentUpdate,
    /// An `insert` found an existing row under the same primary key.
    DuplicateKey,
    /// A non-nullable column without a default received no value.
    NullConstraint,
    /// A primary-key value could not be encoded (e.g. a multi-column key).
    BadKeyFormat,
    /// A record could not be decoded against its schema.
    BadRowFormat,
    /// A write was attempted against a read-only overlay.
    ReadOnly,
    /// An internal invariant was violated (poisoned lock, serialization bug).
    Internal(String),
    /// A codec failed to parse encoded bytes.
    Parse(String),
    /// A storage-engine-level failure with a descriptive message.
    Value(String),
    /// Propagated unchanged from the underlying storage medium.
    Io(std::io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConcurrentUpdate => write!(f, "concurrent update"),
            Error::DuplicateKey => write!(f, "duplicate key"),
            Error::NullConstraint => write!(f, "null constraint violation"),
            Error::BadKeyFormat => write!(f, "bad key format"),
            Error::BadRowFormat => write!(f, "bad row format"),
            Error::ReadOnly => write!(f, "read-only transaction"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::Value(msg) => write!(f, "{msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::Internal(format!("lock poisoned: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
