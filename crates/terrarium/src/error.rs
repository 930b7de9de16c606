//! Error types for Terrarium
//!
//! One taxonomy for the whole environment: lexing, parsing, command
//! validation, path resolution, permissions, persistence. Failures carry
//! human-readable one-line messages; callers render them to the screen,
//! tests match on the variant.

use thiserror::Error;

/// Result type alias using Terrarium's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Terrarium error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Lexing failed (unterminated quote, stray control character).
    #[error("lex error: {0}")]
    Lex(String),

    /// Token stream did not match the command-line grammar.
    #[error("parse error: {0}")]
    Parse(String),

    /// A command rejected its invocation (bad flag, wrong arity, bad
    /// operand). Scoped to the command that raised it.
    #[error("{command}: {message}")]
    Validation { command: String, message: String },

    /// Path resolution or node lookup failed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The acting user lacks the required permission.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No command registered under this name.
    #[error("command not found: {0}")]
    UnknownCommand(String),

    /// Saving or loading persisted state failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Invariant breakage that should never be user-visible.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error scoped to `command`.
    pub fn validation(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Path and node lookup failures.
#[derive(Error, Debug)]
pub enum PathError {
    /// No node at the given path (or an ancestor is missing).
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// A non-directory appeared where a directory was required.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A directory appeared where a file was required.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Creation would clobber an existing node.
    #[error("file exists: {0}")]
    AlreadyExists(String),
}

/// Persistence failures.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The serialized tree would exceed the configured quota.
    #[error("state quota exceeded: {used} of {quota} bytes")]
    QuotaExceeded { used: u64, quota: u64 },

    /// The backing store could not be read or written.
    #[error("storage unavailable: {0}")]
    Storage(String),
}
