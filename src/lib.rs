//! gitport: a portable Git implementation over pluggable storage backends.
//!
//! The object database, refs, index, and config live behind [`GitBackend`]
//! (crate `git-backend`); working-directory I/O lives behind
//! [`WorktreeBackend`] (crate `worktree-backend`). Everything else —
//! checkout, stash, the worker pool, bundle encode/decode — is built once
//! against those two traits, so a host can swap in an in-memory, network,
//! or database-backed repository without touching the command surface.
//!
//! # Crate layout
//!
//! - [`repository`] — [`Repository`], the façade tying a backend pair
//!   together behind the command surface (open/init, refs, config, remotes,
//!   checkout, add/commit/status/reset, fetch/push/pull, workers,
//!   submodules).
//! - [`config`] — [`RepoConfig`], a merged read/write config view.
//! - [`remote`] — [`RemoteBackend`], the fetch/push/pull seam, and
//!   [`NullRemote`], the transport-less default.
//! - [`error`] — [`GitPortError`], wrapping every subsystem's own error.
//!
//! The underlying object database, worktree I/O, checkout engine, stash
//! algebra, worker pool, and bundle codec are re-exported from their own
//! crates (`git_backend`, `worktree_backend`, `checkout`, `stash`,
//! `workers`, `bundle`) for callers who need lower-level access.

pub mod config;
pub mod error;
pub mod remote;
mod repository;

pub use config::RepoConfig;
pub use error::GitPortError;
pub use remote::{NullRemote, RemoteBackend};
pub use repository::{CheckoutOptions, CheckoutTarget, Repository, ResetMode, StatusMatrixEntry};

pub use bundle;
pub use checkout;
pub use git_backend;
pub use stash;
pub use worktree_backend;
pub use workers;
