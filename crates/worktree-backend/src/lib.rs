//! The worktree-backend contract for gitport.
//!
//! This crate defines the [`WorktreeBackend`] trait — the working-directory
//! half of the backend split (`git_backend::GitBackend` for the
//! ODB/refs/index/config, [`WorktreeBackend`] for file I/O). The `checkout`,
//! `stash`, and `workers` crates program against the trait; [`FsWorktreeBackend`]
//! is the default, filesystem-backed implementation, and
//! [`InMemoryWorktreeBackend`] serves hosts with no real filesystem and fast
//! tests.
//!
//! # Crate layout
//!
//! - [`repo`] — the [`WorktreeBackend`] trait.
//! - [`types`] — [`FileMode`], [`Metadata`], [`DirEntry`], [`ResolvedPath`].
//! - [`error`] — [`WorktreeError`].
//! - [`fs_impl`] — [`FsWorktreeBackend`].
//! - [`mem_impl`] — [`InMemoryWorktreeBackend`].

mod error;
mod fs_impl;
mod mem_impl;
mod repo;
mod types;

pub use error::WorktreeError;
pub use fs_impl::FsWorktreeBackend;
pub use mem_impl::InMemoryWorktreeBackend;
pub use repo::WorktreeBackend;
pub use types::{normalize, DirEntry, FileMode, Metadata, ResolvedPath};
