//! The bundle codec for gitport (spec.md §6 "Bundle format v2/v3"): pkt-line
//! framing, the bundle container (signature line, capability block,
//! prerequisites, ref advertisement), and non-deltified packfile framing.
//!
//! # Crate layout
//!
//! - [`pktline`] — [`pktline::encode`]/[`pktline::decode`], the flush
//!   packet, and [`pktline::decode_until_flush`] for advertisement streams.
//! - [`pack`] — [`pack::write_pack`]/[`pack::parse_pack`], the `PACK` v2
//!   object framing.
//! - [`bundle`] — [`write_bundle`]/[`parse_bundle`], the container format
//!   satisfying `parse_bundle(write_bundle(refs, pack)) = (refs, pack)`.
//! - [`error`] — [`BundleError`].

mod bundle;
mod error;
mod pack;
mod pktline;

pub use bundle::{parse_bundle, write_bundle, Bundle, BundleRef, BundleVersion, Capability, Prerequisite};
pub use error::BundleError;
pub use pack::{parse_pack, write_pack};
pub use pktline::{decode as decode_pkt_line, decode_until_flush, encode as encode_pkt_line, encode_flush, PktLine};
