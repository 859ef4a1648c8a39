//! The [`GitBackend`] trait — the object-database half of the backend split
//! described in the component design (object database, refs, index, config,
//! HEAD, reflog, submodule metadata). The working-directory half lives in the
//! sibling `worktree-backend` crate as `WorktreeBackend`; the two are composed
//! by the `checkout`, `stash`, and `workers` crates and by the root façade.
//!
//! # Object safety
//!
//! This trait is object-safe: no generic methods, no `Self` in return
//! position outside of `Result`. Callers may use `&dyn GitBackend` or
//! `Box<dyn GitBackend>`, and the root façade additionally offers a
//! tagged-enum (`AnyGitBackend`) for call sites that need a concrete,
//! non-dynamically-dispatched type.

use std::path::Path;

use crate::error::GitError;
use crate::types::{
    CommitInfo, DiffEntry, GitOid, IndexEntry, ObjectData, ObjectForm, ObjectFormat, ObjectKind,
    RefEdit, RefName, RefTarget, SubmoduleMeta, TreeEdit, TreeEntry, WorktreeInfo,
};

/// A single config write target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigScope {
    /// System-wide config (lowest precedence).
    System,
    /// Per-user global config.
    Global,
    /// Repository-local config (`<gitdir>/config`).
    Local,
    /// Per-worktree config (only meaningful when `extensions.worktreeConfig`
    /// is enabled; highest precedence).
    Worktree,
}

/// A fully-qualified config key, e.g. `remote.origin.url` splits into
/// section `"remote"`, subsection `Some("origin")`, key `"url"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigPath {
    /// The section name (`"core"`, `"remote"`, ...).
    pub section: String,
    /// The subsection name, if any (`"origin"` in `remote.origin.url`).
    pub subsection: Option<String>,
    /// The key within the (sub)section (`"url"`).
    pub key: String,
}

impl ConfigPath {
    /// Parse a dotted config path like `"core.bare"` or `"remote.origin.url"`.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let mut parts: Vec<&str> = path.split('.').collect();
        let key = parts.pop().unwrap_or_default().to_owned();
        let section = parts.first().copied().unwrap_or_default().to_owned();
        let subsection = if parts.len() > 1 {
            Some(parts[1..].join("."))
        } else {
            None
        };
        Self {
            section,
            subsection,
            key,
        }
    }
}

/// The git-backend contract: object database, refs, index, config, HEAD,
/// reflog, and submodule metadata.
///
/// The default implementation ([`crate::fs_backend::FsGitBackend`]) operates
/// over an on-disk `.git` directory (loose objects + packfiles) using `gix`
/// as its storage engine; alternative implementations (in-memory, blob
/// store, SQL) may implement this trait directly.
pub trait GitBackend {
    // -------------------------------------------------------------------
    // Identity / gitdir
    // -------------------------------------------------------------------

    /// The directory this backend persists state under (the `.git` directory
    /// for the filesystem backend). Backends with no notion of a filesystem
    /// path should return a synthetic, stable path.
    fn gitdir(&self) -> &Path;

    /// Probe the repository-wide object hash algorithm
    /// (`extensions.objectFormat`, defaulting to SHA-1).
    fn object_format(&self) -> Result<ObjectFormat, GitError>;

    // -------------------------------------------------------------------
    // Refs
    // -------------------------------------------------------------------

    /// Resolve a ref to its direct OID, following any chain of symbolic refs.
    /// Returns `None` if the ref does not exist.
    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError>;

    /// Read a ref's immediate target without following symbolic chains.
    fn read_ref_target(&self, name: &RefName) -> Result<Option<RefTarget>, GitError>;

    /// Create or overwrite a direct ref unconditionally, appending a reflog
    /// entry with the given message (empty string for no message).
    fn write_ref(&self, name: &RefName, oid: GitOid, log_message: &str) -> Result<(), GitError>;

    /// Point a symbolic ref (typically `HEAD`) at another ref name.
    fn write_symbolic_ref(&self, name: &RefName, target: &RefName) -> Result<(), GitError>;

    /// Delete a ref. No-op if the ref does not exist.
    fn delete_ref(&self, name: &RefName) -> Result<(), GitError>;

    /// Atomically apply a batch of ref updates with compare-and-swap
    /// semantics: all updates succeed or all fail.
    fn atomic_ref_update(&self, edits: &[RefEdit]) -> Result<(), GitError>;

    /// List refs matching a literal prefix (e.g. `"refs/heads/"`), sorted by
    /// ref name.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError>;

    /// Read the append-only reflog for a ref, newest entry first.
    fn read_reflog(&self, name: &RefName) -> Result<Vec<ReflogEntry>, GitError>;

    // -------------------------------------------------------------------
    // Rev-parse
    // -------------------------------------------------------------------

    /// Resolve a revision specification (ref name, `HEAD~3`, short/long OID,
    /// ...) to an OID. Fails with [`GitError::NotFound`] if unresolvable.
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError>;

    /// Like [`rev_parse`](Self::rev_parse) but returns `None` instead of an
    /// error when the spec cannot be resolved.
    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError>;

    // -------------------------------------------------------------------
    // Object read / write
    // -------------------------------------------------------------------

    /// Read an object's bytes in the requested [`ObjectForm`], transparently
    /// resolving from loose and packed storage.
    fn read_object(&self, oid: GitOid, form: ObjectForm) -> Result<ObjectData, GitError>;

    /// Write an object of the given kind from its content-only bytes.
    /// Idempotent; returns the OID computed under the repository's object
    /// format.
    fn write_object(&self, kind: ObjectKind, content: &[u8]) -> Result<GitOid, GitError>;

    /// Read the entries of a tree object (one level deep).
    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError>;

    /// Write a tree object from a list of entries, which MUST already be
    /// sorted by the git tree-entry ordering.
    fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, GitError>;

    /// Read a commit object's metadata.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    /// Create a commit object and optionally update a ref to point to it.
    fn create_commit(
        &self,
        tree: GitOid,
        parents: &[GitOid],
        message: &str,
        update_ref: Option<&RefName>,
    ) -> Result<GitOid, GitError>;

    /// Apply a set of edits to an existing tree and return the OID of the
    /// resulting tree. Intermediate trees are created or rewritten as needed.
    fn edit_tree(&self, base: GitOid, edits: &[TreeEdit]) -> Result<GitOid, GitError>;

    /// Diff two trees and return the list of changed files. If `old` is
    /// `None`, the diff is against an empty tree (every path in `new`
    /// appears as an addition).
    fn diff_trees(&self, old: Option<GitOid>, new: GitOid) -> Result<Vec<DiffEntry>, GitError>;

    /// `true` if `ancestor` is reachable from `descendant` via parent links.
    fn is_ancestor(&self, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError>;

    /// The best common ancestor (merge base) of two commits, or `None` if
    /// they share no history.
    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError>;

    // -------------------------------------------------------------------
    // Index (opaque bytes — callers parse/serialize via `git_backend::index`)
    // -------------------------------------------------------------------

    /// Read the raw, canonical index-v2-format bytes.
    fn read_index(&self) -> Result<Vec<u8>, GitError>;

    /// Overwrite the index with the given canonical index-v2-format bytes.
    fn write_index(&self, bytes: &[u8]) -> Result<(), GitError>;

    // -------------------------------------------------------------------
    // Config
    // -------------------------------------------------------------------

    /// Read the highest-precedence value for a dotted config path.
    fn get_config(&self, path: &str) -> Result<Option<String>, GitError>;

    /// Read every value for a dotted config path across local+worktree
    /// scope, in insertion order (multi-valued keys).
    fn get_all_config(&self, path: &str) -> Result<Vec<String>, GitError>;

    /// Set a config value in the given scope. `append` adds another value
    /// for a multi-valued key instead of replacing the existing one(s).
    fn set_config(
        &self,
        path: &str,
        value: &str,
        scope: ConfigScope,
        append: bool,
    ) -> Result<(), GitError>;

    /// The set of distinct subsection names under a section (e.g. every
    /// configured remote name under `remote`).
    fn get_config_subsections(&self, section: &str) -> Result<Vec<String>, GitError>;

    /// The set of distinct section names present in the merged config.
    fn get_config_sections(&self) -> Result<Vec<String>, GitError>;

    /// Re-read all config scopes from storage, discarding any cached view.
    fn reload_config(&self) -> Result<(), GitError>;

    // -------------------------------------------------------------------
    // Submodules
    // -------------------------------------------------------------------

    /// Parse `.gitmodules` (read from the given tree) into its entries.
    fn list_submodules(&self, tree: GitOid) -> Result<Vec<SubmoduleMeta>, GitError>;

    // -------------------------------------------------------------------
    // Linked worktrees (gitdir-level bookkeeping, not working-directory I/O)
    // -------------------------------------------------------------------

    /// Register a new linked worktree's gitdir metadata under
    /// `<gitdir>/worktrees/<name>`, with HEAD detached at `target`.
    fn worktree_add(&self, name: &str, target: GitOid, path: &Path) -> Result<(), GitError>;

    /// Remove a linked worktree's gitdir metadata by name.
    fn worktree_remove(&self, name: &str) -> Result<(), GitError>;

    /// List all worktrees (main + linked) known to this gitdir.
    fn worktree_list(&self) -> Result<Vec<WorktreeInfo>, GitError>;
}

/// A single reflog line: `<old_oid> <new_oid> <who> <timestamp> <tz>\t<message>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReflogEntry {
    /// The ref's value before this update.
    pub old_oid: GitOid,
    /// The ref's value after this update.
    pub new_oid: GitOid,
    /// Identity string of whoever performed the update.
    pub who: String,
    /// Unix timestamp of the update.
    pub timestamp: i64,
    /// Timezone offset, e.g. `"+0000"`.
    pub tz: String,
    /// The reflog message.
    pub message: String,
}
