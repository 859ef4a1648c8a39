//! The [`WorktreeBackend`] trait — working-directory I/O, the sibling half
//! of the backend split to `git_backend::GitBackend`.
//!
//! # Object safety
//!
//! Object-safe by construction (no generics, no `Self` outside `Arc<Self>`
//! in [`WorktreeBackend::register_submodule`]): callers hold
//! `Arc<dyn WorktreeBackend>`, which is also how a backend refers to a
//! registered submodule's backend without owning it.

use std::path::Path;
use std::sync::Arc;

use crate::error::WorktreeError;
use crate::types::{DirEntry, FileMode, Metadata, ResolvedPath};

/// Working-directory I/O: read/write files, directory enumeration,
/// mkdir/rmdir/rm, stat/lstat, symlink read/write, submodule-path
/// resolution.
///
/// Every path argument is repo-root-relative and forward-slash separated
/// (see [`crate::types::normalize`]). `read`, `readdir`, and `lstat` return
/// an absent result (`None`/empty `Vec`) rather than an error when the
/// target does not exist — only structurally invalid operations (e.g.
/// `rmdir` on a file) return [`WorktreeError`].
pub trait WorktreeBackend: Send + Sync {
    /// The worktree root directory. Backends with no filesystem notion of a
    /// root (in-memory, blob store) return a synthetic, stable path.
    fn root(&self) -> &Path;

    /// Resolve a repo-root-relative path, delegating to a registered
    /// submodule's backend when the path falls inside one. All file
    /// operations apply this resolution once before acting.
    fn resolve_path(&self, path: &str) -> Result<ResolvedPath, WorktreeError>;

    /// Register a submodule's own worktree backend at `path` (the gitlink's
    /// location), so that [`resolve_path`](Self::resolve_path) delegates
    /// paths under it. Re-registering the same path replaces the prior
    /// backend.
    fn register_submodule(&self, path: &str, backend: Arc<dyn WorktreeBackend>);

    /// Read a file's full contents, or `None` if it does not exist (or is
    /// not a regular file).
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, WorktreeError>;

    /// Write a file's contents, creating or overwriting it. Does not create
    /// parent directories — callers call [`mkdir`](Self::mkdir) first.
    fn write(&self, path: &str, contents: &[u8], mode: FileMode) -> Result<(), WorktreeError>;

    /// Create a directory and all missing parents. No-op if it already
    /// exists as a directory.
    fn mkdir(&self, path: &str) -> Result<(), WorktreeError>;

    /// Remove a directory and everything under it. No-op if it does not
    /// exist.
    fn rmdir(&self, path: &str) -> Result<(), WorktreeError>;

    /// Remove a file (or symlink). No-op if it does not exist.
    fn rm(&self, path: &str) -> Result<(), WorktreeError>;

    /// List the immediate children of a directory, or an empty list if it
    /// does not exist. Order is unspecified; callers that need a stable
    /// order sort by `name`.
    fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, WorktreeError>;

    /// List every file path (not directories) under `path`, recursively,
    /// relative to the worktree root.
    fn readdir_deep(&self, path: &str) -> Result<Vec<String>, WorktreeError>;

    /// Metadata for a path, following a trailing symlink. `None` if the path
    /// (or what it points to) does not exist.
    fn stat(&self, path: &str) -> Result<Option<Metadata>, WorktreeError>;

    /// Metadata for a path, not following a trailing symlink. `None` if the
    /// path does not exist.
    fn lstat(&self, path: &str) -> Result<Option<Metadata>, WorktreeError>;

    /// Read a symlink's target string, or `None` if the path is not a
    /// symlink (or does not exist).
    fn read_link(&self, path: &str) -> Result<Option<String>, WorktreeError>;

    /// Create a symlink at `path` pointing at `target`, replacing any
    /// existing entry. Returns
    /// [`WorktreeError::SymlinkUnsupported`] on platforms/backends that
    /// cannot represent symlinks; the checkout engine falls back to writing
    /// the target string as a regular file on this error.
    fn write_link(&self, path: &str, target: &str) -> Result<(), WorktreeError>;
}
