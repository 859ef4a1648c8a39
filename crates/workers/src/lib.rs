//! The concurrency layer for gitport (§4.5, §5): a worker pool bounded by
//! `max_workers`, a pluggable control-message transport, and the
//! multi-worker sparse-checkout coordinator built on top of both plus the
//! `checkout` crate's sparse matcher.
//!
//! # Crate layout
//!
//! - [`pool`] — [`WorkerPool`], [`WorkerHandle`].
//! - [`transport`] — [`Transport`] and its three flavors.
//! - [`coordinator`] — [`run_parallel_checkout`], [`discover_tasks`],
//!   [`distribute`], [`Task`], [`FileTask`], [`RepoFactory`].
//! - [`error`] — [`WorkerError`].

mod coordinator;
mod error;
mod pool;
mod transport;

pub use coordinator::{
    discover_tasks, distribute, run_parallel_checkout, FileTask, RepoFactory, Task,
    DEFAULT_WORKER_TIMEOUT,
};
pub use error::WorkerError;
pub use pool::{WorkerHandle, WorkerPool};
pub use transport::{
    BroadcastTransport, ControlMessage, InProcessTransport, PointToPointTransport, Transport,
};
