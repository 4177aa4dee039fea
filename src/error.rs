//! Error taxonomy for typelib loading and validation.

use thiserror::Error;

/// Errors produced while loading or validating a typelib.
///
/// Validator errors carry a message that may be prefixed with a breadcrumb
/// context ("In Ns (Context: Outer/inner): ...") identifying the blob that was
/// being checked when the failure was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypelibError {
    /// Magic, version, declared size, or fixed blob-size disagreement.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// A bounds check would have read past the end of the buffer.
    #[error("truncated buffer: {0}")]
    TruncatedBuffer(String),
    /// Directory-level problem: locality, alignment, or entry tag.
    #[error("invalid directory: {0}")]
    InvalidDirectory(String),
    /// A local invariant inside a blob does not hold.
    #[error("invalid blob: {0}")]
    InvalidBlob(String),
    /// A name contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid name: {0}")]
    InvalidName(String),
    /// No NUL terminator within the permitted name length.
    #[error("name too long: {0}")]
    NameTooLong(String),
    /// A directory entry's blob type fell outside the known range.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TypelibError>;
