//! The operation taxonomy (§4.3.2): the output of [`crate::analyze_checkout`]
//! and the input to [`crate::execute_checkout`]. Each operation is a tagged
//! record over a single path.

use git_backend::{EntryMode, GitOid};

/// Cached stat info carried by a [`Operation::Keep`] so the executor can
/// reinsert an index entry without re-stat'ing the working directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachedStat {
    /// File size in bytes.
    pub size: u32,
    /// Modification time as (seconds, nanoseconds).
    pub mtime: (u32, u32),
}

/// A single reconciliation step produced by the analyzer and consumed by the
/// executor, in emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Create or overwrite the working-directory entry and set index
    /// stage-0.
    Update {
        /// Repo-root-relative path.
        path: String,
        /// Target blob OID.
        oid: GitOid,
        /// Target file mode.
        mode: EntryMode,
    },
    /// The working-directory entry already matches the target; reinsert an
    /// index stage-0 entry without touching the filesystem.
    Keep {
        /// Repo-root-relative path.
        path: String,
        /// Target blob OID.
        oid: GitOid,
        /// Target file mode.
        mode: EntryMode,
        /// Cached stat info to reinsert into the index.
        stat: CachedStat,
    },
    /// Remove the working-directory entry.
    Delete {
        /// Repo-root-relative path.
        path: String,
    },
    /// Drop the index entry only (sparse exclusion); no filesystem effect.
    DeleteIndex {
        /// Repo-root-relative path.
        path: String,
    },
    /// Ensure a directory exists (used for gitlink/submodule targets, which
    /// materialize only their containing directory).
    Mkdir {
        /// Repo-root-relative path.
        path: String,
    },
    /// The path cannot proceed without data loss; accumulated and reported
    /// as a single [`crate::CheckoutError::Conflict`] before any mutation.
    Conflict {
        /// Repo-root-relative path.
        path: String,
    },
}

impl Operation {
    /// The path this operation concerns, regardless of variant.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Update { path, .. }
            | Self::Keep { path, .. }
            | Self::Delete { path }
            | Self::DeleteIndex { path }
            | Self::Mkdir { path }
            | Self::Conflict { path } => path,
        }
    }
}
