//! Errors from the checkout engine.

use thiserror::Error;

/// Errors from [`crate::analyze_checkout`]/[`crate::execute_checkout`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// One or more dirty paths prevent checkout from proceeding
    /// (accumulated, not raised per-path: §4.3.5).
    #[error("checkout conflict on {} path(s): {}", paths.len(), paths.join(", "))]
    Conflict {
        /// The conflicting paths.
        paths: Vec<String>,
    },

    /// `info/sparse-checkout` could not be parsed, or cone mode was
    /// requested with non-cone-shaped patterns. Sparse-checkout
    /// configuration errors are fatal per §4.3.5.
    #[error("invalid sparse-checkout configuration: {reason}")]
    SparseConfig {
        /// Description of the problem.
        reason: String,
    },

    /// The git object database failed.
    #[error(transparent)]
    Git(#[from] git_backend::GitError),

    /// The working-directory backend failed.
    #[error(transparent)]
    Worktree(#[from] worktree_backend::WorktreeError),
}
