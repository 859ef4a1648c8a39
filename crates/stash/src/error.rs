//! [`StashError`]: the failure taxonomy for the stash algebra (§4.6, §7).

use git_backend::GitError;
use worktree_backend::WorktreeError;

/// Failures the stash algebra can produce, in the order its preconditions
/// are checked.
#[derive(Debug, thiserror::Error)]
pub enum StashError {
    /// No committer identity is configured (`user.name`/`user.email`).
    #[error("no committer identity configured")]
    MissingName,
    /// The index has unmerged (conflicted) paths.
    #[error("cannot stash: unmerged paths {paths:?}")]
    UnmergedPaths {
        /// The conflicted paths found in the index.
        paths: Vec<String>,
    },
    /// Neither the index nor the working directory differ from HEAD.
    #[error("no local changes to save")]
    NothingToStash,
    /// No stash entries exist (for apply/pop/drop with an empty stash).
    #[error("no stash entries found")]
    EmptyStash,
    /// The requested `stash@{n}` index does not exist.
    #[error("stash entry {index} not found")]
    NotFound {
        /// The requested stash index.
        index: usize,
    },
    /// A lower-level git-backend failure.
    #[error(transparent)]
    Git(#[from] GitError),
    /// A lower-level working-directory failure.
    #[error(transparent)]
    Worktree(#[from] WorktreeError),
    /// Raw filesystem failure manipulating the stash ref/reflog files
    /// directly (§6 on-disk ref/reflog layout).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
