//! The stash algebra for gitport (§4.6): push, apply, pop, and drop, built
//! entirely on `GitBackend` commits/trees and `WorktreeBackend` file I/O —
//! stashes are ordinary two-parent-capable commits under `refs/stash`, with
//! an append-only reflog giving the `stash@{n}` ordering.
//!
//! # Crate layout
//!
//! - [`tree_diff`] — shared tree-walk/diff/blob-write helpers.
//! - [`algebra`] — [`stash_push`], [`stash_apply`], [`stash_pop`],
//!   [`stash_drop`], [`list`].
//! - [`error`] — [`StashError`].

mod algebra;
mod error;
mod tree_diff;

pub use algebra::{list, stash_apply, stash_drop, stash_pop, stash_push};
pub use error::StashError;
