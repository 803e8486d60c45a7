//! Error types for mibward.
//!
//! One [`Error`] enum covers every failure mode in the crate. The protocol
//! engine never surfaces these on the wire: it translates them into the fixed
//! pass_persist reply codes and logs the underlying error instead.

use crate::value::TypeTag;

/// Result type alias using the crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all mibward operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Backing-store failure (I/O, constraint violation, malformed SQL).
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Filesystem failure while reading or writing an external file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A primitive constructor rejected its input.
    #[error("invalid {tag} value {input:?}")]
    Parse { tag: TypeTag, input: String },

    /// A SET carried a datatype that differs from the declared type.
    #[error("wrong type: expected {expected}, got {got}")]
    WrongType { expected: TypeTag, got: String },

    /// The OID's access mode forbids the requested operation.
    #[error("OID {0} is not accessible for this operation")]
    Access(String),

    /// The OID is absent from the MIB table.
    #[error("OID {0} does not exist")]
    NotFound(String),

    /// The OID is already present in the MIB table.
    #[error("OID {0} already exists")]
    Duplicate(String),

    /// Malformed dotted-decimal OID string.
    #[error("invalid OID {0:?}")]
    InvalidOid(String),

    /// A type tag outside the closed primitive family.
    #[error("unknown type tag {0:?}")]
    UnknownType(String),

    /// A stored row could not be reconstructed into a MIB entry.
    #[error("corrupt row for OID {oid}: {msg}")]
    CorruptRow { oid: String, msg: String },

    /// An event could not be registered or executed.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// A record in a scheduling or compiled-MIB file was malformed.
    #[error("line {line}: {msg}")]
    BadRecord { line: usize, msg: String },
}
