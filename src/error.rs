//! [`GitPortError`]: the façade's error type, wrapping each subsystem's own
//! error via `#[from]` rather than re-deriving the closed taxonomy a second
//! time — `git_backend::GitError` already carries nearly all of it.

use thiserror::Error;

/// Errors surfaced by [`crate::Repository`] and the rest of the façade.
#[derive(Debug, Error)]
pub enum GitPortError {
    /// The object database, refs, index, or config failed.
    #[error(transparent)]
    Git(#[from] git_backend::GitError),

    /// Working-directory I/O failed.
    #[error(transparent)]
    Worktree(#[from] worktree_backend::WorktreeError),

    /// The checkout engine failed.
    #[error(transparent)]
    Checkout(#[from] checkout::CheckoutError),

    /// The stash algebra failed.
    #[error(transparent)]
    Stash(#[from] stash::StashError),

    /// The worker pool, transport, or parallel-checkout coordinator failed.
    #[error(transparent)]
    Worker(#[from] workers::WorkerError),

    /// The bundle codec failed.
    #[error(transparent)]
    Bundle(#[from] bundle::BundleError),

    /// The repository is bare; the requested operation needs a worktree.
    #[error("operation requires a worktree, but the repository is bare")]
    BareRepository,

    /// A required parameter was not supplied.
    #[error("missing parameter `{name}`")]
    MissingParameter {
        /// The parameter name.
        name: String,
    },

    /// A parameter was supplied but failed validation.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A remote with this name already exists and the caller did not
    /// request an overwrite.
    #[error("{kind} `{name}` already exists")]
    AlreadyExists {
        /// The kind of thing that collided (`"remote"`, `"worktree"`, ...).
        kind: String,
        /// The name that collided.
        name: String,
    },

    /// A ref, object, remote, submodule, or file was not found.
    #[error("not found: {what}")]
    NotFound {
        /// What was missing.
        what: String,
    },

    /// A remote operation (fetch/push/pull) requires a wire transport this
    /// build does not provide. Wire transports are out of scope for this
    /// crate (spec.md §1 "Out of scope"); hosts inject a real
    /// [`crate::RemoteBackend`] to support them.
    #[error("remote `{name}` has no transport configured")]
    NoTransport {
        /// The remote name.
        name: String,
    },
}

impl GitPortError {
    /// Annotate this error with the name of the façade entrypoint that
    /// surfaced it, for log correlation without losing the original kind.
    #[must_use]
    pub fn with_caller(self, caller: &str) -> Self {
        tracing::debug!(caller, error = %self, "gitport operation failed");
        self
    }
}
