//! Value types used in [`crate::WorktreeBackend`] signatures.

use std::sync::Arc;

use crate::WorktreeBackend;

/// The mode a working-directory entry is written with. Distinct from
/// `git_backend::EntryMode`: this crate has no dependency on `git-backend`
/// (both are leaves in the dependency order), so it only distinguishes the
/// three things a filesystem write actually needs to know. `checkout` maps
/// between the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular, non-executable file.
    Regular,
    /// Regular file with the executable bit set.
    Executable,
    /// Symbolic link (target is written via
    /// [`WorktreeBackend::write_link`](crate::WorktreeBackend::write_link)
    /// instead of [`write`](crate::WorktreeBackend::write)).
    Symlink,
}

/// Metadata about a working-directory entry, as returned by `stat`/`lstat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metadata {
    /// `true` if the entry is a regular file.
    pub is_file: bool,
    /// `true` if the entry is a directory.
    pub is_dir: bool,
    /// `true` if the entry is a symlink (only meaningful for `lstat`; `stat`
    /// follows symlinks so never reports this).
    pub is_symlink: bool,
    /// File size in bytes (0 for directories and symlinks).
    pub len: u64,
    /// Modification time as (seconds, nanoseconds) since the Unix epoch.
    pub mtime: (u32, u32),
    /// `true` if the regular file's executable bit is set.
    pub executable: bool,
}

/// A single entry returned by [`WorktreeBackend::readdir`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// The entry's basename (not a full path).
    pub name: String,
    /// `true` if the entry is a directory.
    pub is_dir: bool,
    /// `true` if the entry is a symlink.
    pub is_symlink: bool,
}

/// The result of resolving a repo-root-relative path: either a plain local
/// path, or a path that falls inside a registered submodule, in which case
/// the submodule's own backend and submodule-relative path are returned so
/// the caller can delegate to it directly.
pub enum ResolvedPath {
    /// The path is local to this worktree.
    Local {
        /// Forward-slash-separated path relative to this worktree's root.
        relative_path: String,
    },
    /// The path falls inside a registered submodule.
    Submodule {
        /// The submodule's own worktree backend.
        backend: Arc<dyn WorktreeBackend>,
        /// Path relative to this worktree's root (the gitlink's location).
        submodule_path: String,
        /// Path relative to the submodule's own root.
        relative_path: String,
    },
}

/// Normalize a path argument to the contract's shape: forward slashes, no
/// leading/trailing slash, no `.`/`..` components.
#[must_use]
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}
