//! The error type returned by every [`crate::WorktreeBackend`] method.

use thiserror::Error;

/// Errors produced by working-directory I/O.
#[derive(Debug, Error)]
pub enum WorktreeError {
    /// The requested path does not exist. Most read-side methods prefer
    /// returning an absent result (`None`/empty) over this variant — see
    /// [`crate::WorktreeBackend`]'s contract invariants — so this is
    /// reserved for operations that have no sensible absent value (e.g.
    /// `rmdir` on a path that was never a directory).
    #[error("not found: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },

    /// The platform or backend cannot represent a symlink; callers fall back
    /// to writing the link target as a regular file per the checkout
    /// engine's failure semantics.
    #[error("symlinks are not supported for {path}")]
    SymlinkUnsupported {
        /// The path a symlink was requested at.
        path: String,
    },

    /// An internal invariant was violated.
    #[error("internal error: {reason}")]
    Internal {
        /// Description of the violated invariant.
        reason: String,
    },

    /// Low-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
