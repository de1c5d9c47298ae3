//! Error types for the editing engine.

use thiserror::Error;

/// Errors surfaced by the editing engine.
///
/// Nothing here is fatal: validation and reference violations mean the
/// requested operation is simply not permitted, and the store is left
/// unchanged. Per-content geometry failures never reach this type; they
/// degrade to empty geometry at the cache layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A commit would introduce structurally invalid content.
    #[error("content at slot {index} failed validation: {reason}")]
    Validation { index: usize, reason: String },

    /// A delete or compress targeted content that is still referenced.
    #[error("content at slot {index} is still referenced")]
    ReferenceViolation { index: usize },

    /// An exclusive operation (compress, bulk load) ran while a command
    /// held uncommitted preview state.
    #[error("operation requires that no preview is pending")]
    PendingPreview,

    /// A content value was not an object or carried no `type` tag.
    #[error("malformed content: {0}")]
    MalformedContent(String),

    /// A patch path could not be interpreted against the store.
    #[error("malformed patch: {0}")]
    MalformedPatch(String),

    /// A content type tag with no registered model.
    #[error("unknown content type `{0}`")]
    UnknownType(String),

    /// A command name with no registered descriptor.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    /// A document could not be read back from its serialized form.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}
