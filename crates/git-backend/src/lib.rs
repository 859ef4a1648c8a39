//! The git-backend contract for gitport.
//!
//! This crate defines the [`GitBackend`] trait — the object-database half of
//! the backend split ([`GitBackend`] for the ODB/refs/index/config/HEAD/
//! reflog, `worktree_backend::WorktreeBackend` for working-directory I/O).
//! Other crates in this workspace (`checkout`, `stash`, `workers`, `bundle`,
//! the root `gitport` façade) program against the trait, never against `gix`
//! directly; [`FsGitBackend`] is the default, gix-backed, on-disk
//! implementation.
//!
//! # Crate layout
//!
//! - [`repo`] — the [`GitBackend`] trait definition, plus [`ConfigScope`],
//!   [`ConfigPath`], and [`ReflogEntry`].
//! - [`types`] — value types used in trait signatures ([`GitOid`],
//!   [`RefName`], [`TreeEntry`], [`DiffEntry`], etc.). Contain no gix types.
//! - [`error`] — the [`GitError`] enum returned by every method.
//! - [`config`] — the INI-ish config parser/serializer and four-scope merge.
//! - [`objects`] — small, independent commit/tree/tag (de)serializers.
//! - [`index`] — the canonical index-v2 binary format parser/serializer.
//! - [`reflog`] — the reflog line format parser/serializer.
//! - [`fs_backend`] — [`FsGitBackend`], the default filesystem implementation,
//!   and its supporting `fs_*` modules (refs, objects, diff, config,
//!   submodules, worktrees).

pub mod config;
pub mod error;
pub mod fs_backend;
mod fs_config;
mod fs_diff;
mod fs_objects;
mod fs_refs;
mod fs_submodule;
mod fs_worktree;
pub mod index;
pub mod objects;
pub mod reflog;
pub mod repo;
pub mod types;

pub use error::GitError;
pub use fs_backend::FsGitBackend;
pub use repo::{ConfigPath, ConfigScope, GitBackend, ReflogEntry};
pub use types::{
    ChangeType, CommitInfo, DiffEntry, EntryMode, FileStatus, GitOid, IndexEntry, ObjectData,
    ObjectForm, ObjectFormat, ObjectKind, OidParseError, RefEdit, RefName, RefNameError, RefTarget,
    StatusEntry, SubmoduleMeta, TagInfo, TreeEdit, TreeEntry, WorktreeInfo,
};
