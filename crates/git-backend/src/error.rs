//! The closed error taxonomy shared by every crate in this workspace.
//!
//! [`GitError`] is returned by all [`GitBackend`](crate::GitBackend) methods.
//! Downstream crates (`checkout`, `stash`, `workers`, `bundle`, and the root
//! `gitport` façade) define their own error enums for concerns outside the
//! object database, but each carries a `#[from] GitError` variant and mirrors
//! this same set of kinds so a caller can match on failure mode without
//! parsing messages.

use thiserror::Error;

/// Errors returned by [`GitBackend`](crate::GitBackend) operations, and
/// re-used verbatim (via `#[from]`) by every other crate in the workspace.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested ref, object, remote, submodule, or file was not found.
    #[error("not found: {what}")]
    NotFound {
        /// What was missing.
        what: String,
    },

    /// Something with this name/kind already exists and the caller did not
    /// request an overwrite.
    #[error("{kind} `{name}` already exists")]
    AlreadyExists {
        /// The kind of thing that collided (`"remote"`, `"worktree"`, ...).
        kind: String,
        /// The name that collided.
        name: String,
    },

    /// A ref name failed validation.
    #[error("invalid ref name `{ref_name}`{}", suggestion.as_deref().map(|s| format!(": {s}")).unwrap_or_default())]
    InvalidRefName {
        /// The rejected ref name.
        ref_name: String,
        /// An optional suggestion for a valid spelling.
        suggestion: Option<String>,
    },

    /// The operation requires a worktree but the repository is bare.
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

    /// One or more dirty paths prevent a checkout from proceeding.
    #[error("checkout conflict on {} path(s): {}", paths.len(), paths.join(", "))]
    CheckoutConflict {
        /// The conflicting paths.
        paths: Vec<String>,
    },

    /// A ref resolves to an object absent from the local object database.
    #[error("`{reference}` resolves to {oid}, which has not been fetched")]
    CommitNotFetched {
        /// The ref or revspec that was being resolved.
        reference: String,
        /// The OID it resolved to.
        oid: String,
    },

    /// The index has stage 1/2/3 (unmerged) entries where a clean stage-0
    /// state was required.
    #[error("unmerged paths: {}", paths.join(", "))]
    UnmergedPaths {
        /// The unmerged paths.
        paths: Vec<String>,
    },

    /// No committer identity (`user.name`/`user.email`) is resolvable.
    #[error("no committer identity is configured (user.name / user.email)")]
    MissingName,

    /// The merge engine produced conflicts; surfaced as a value, not panicked.
    #[error("merge conflict: {details}")]
    MergeConflict {
        /// Description of the conflict.
        details: String,
    },

    /// A remote URL could not be parsed.
    #[error("failed to parse URL `{url}`")]
    UrlParse {
        /// The offending URL.
        url: String,
    },

    /// A smart-HTTP (or other wire protocol) response could not be understood.
    #[error("smart HTTP protocol error: {preview}")]
    SmartHttp {
        /// A preview of the unexpected response.
        preview: String,
    },

    /// An internal invariant was violated — indicates a bug in this crate
    /// rather than a normal failure mode.
    #[error("internal error: {reason}")]
    Internal {
        /// Description of the violated invariant.
        reason: String,
    },

    /// Low-level I/O failure (filesystem, process spawn). This is the
    /// concrete form that [`Self::NotFound`] or [`Self::Internal`] often take
    /// at the storage boundary; kept distinct because `#[from]` lets `?`
    /// propagate it without a manual `map_err` at every call site.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Wrap this error with the name of the entrypoint that surfaced it,
    /// folding the annotation into the `Internal` message when no better
    /// variant applies. Used by callers that want to identify which
    /// high-level operation (e.g. `"stash"`) failed without losing the
    /// original kind for programmatic matching.
    #[must_use]
    pub fn with_caller(self, caller: &str) -> Self {
        tracing::debug!(caller, error = %self, "operation failed");
        self
    }
}

impl From<crate::types::OidParseError> for GitError {
    fn from(e: crate::types::OidParseError) -> Self {
        Self::InvalidParameter {
            name: "oid".to_owned(),
            reason: e.to_string(),
        }
    }
}

impl From<crate::types::RefNameError> for GitError {
    fn from(e: crate::types::RefNameError) -> Self {
        Self::InvalidRefName {
            ref_name: e.value,
            suggestion: Some(e.reason),
        }
    }
}
