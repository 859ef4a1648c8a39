//! The checkout engine for gitport: the sparse-checkout matcher plus the
//! analyze/execute split that reconciles a target tree with the current
//! index and working directory (§4.3-§4.4).
//!
//! # Crate layout
//!
//! - [`matcher`] — [`sparse_match`]/[`should_descend`], cone and non-cone
//!   pattern semantics, pure and reusable by the `workers` crate's
//!   discovery phase.
//! - [`operation`] — the [`Operation`] taxonomy.
//! - [`analyze`] — [`analyze_checkout`], a pure function of its inputs.
//! - [`execute`] — [`execute_checkout`], which applies operations and
//!   rebuilds the index.
//! - [`error`] — [`CheckoutError`].

mod analyze;
mod error;
mod execute;
mod matcher;
mod operation;

pub use analyze::{analyze_checkout, AnalyzeInputs, SparseConfig};
pub use error::CheckoutError;
pub use execute::execute_checkout;
pub use matcher::{parse_sparse_file, should_descend, sparse_match, Pattern};
pub use operation::{CachedStat, Operation};
