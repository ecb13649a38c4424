//! Error taxonomy for the codec (`spec.md` §7).
//!
//! Every fallible operation returns one of these variants; the crate never
//! panics or unwinds on caller-supplied data. `thiserror` generates the
//! `std::error::Error` and `Display` impls, matching the teacher's existing
//! use of `thiserror` rather than hand-rolled error types.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Null/missing required pointer, bad type code, ill-formed signature,
    /// bad container kind for the current position.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation on a sealed message that requires unsealed, or vice versa;
    /// closing with no open container; exhausted signature on close.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Write attempted against a sealed message.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Reading an unset header field or absent value.
    #[error("not found: {0}")]
    NotFound(String),

    /// The signature position disagrees with the operation's type.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    /// Header validation failure, bad padding, length mismatch, array size
    /// over cap, depth exceeded, invalid UTF-8/path/name, body/signature
    /// inconsistency.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Allocation failure or size overflow.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Setting a value (e.g. destination) that is already set.
    #[error("already exists: {0}")]
    Exists(String),

    /// Partial write to an external byte sink.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Error {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Error {
        Error::InvalidState(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Error {
        Error::MalformedMessage(msg.into())
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Error {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Error {
        Error::NotFound(msg.into())
    }

    pub(crate) fn permission_denied(msg: impl Into<String>) -> Error {
        Error::PermissionDenied(msg.into())
    }

    pub(crate) fn exists(msg: impl Into<String>) -> Error {
        Error::Exists(msg.into())
    }

    pub(crate) fn out_of_memory(msg: impl Into<String>) -> Error {
        Error::OutOfMemory(msg.into())
    }
}
