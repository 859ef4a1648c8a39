//! [`WorkerError`]: failures from the worker pool, transport, and the
//! multi-worker checkout coordinator (§4.5, §7).

use checkout::CheckoutError;
use git_backend::GitError;
use worktree_backend::WorktreeError;

/// Failures the concurrency layer can produce.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A worker call exceeded the coordinator's timeout; its handle has
    /// been freed and its (possibly still-running) results discarded.
    #[error("worker {worker_id} timed out")]
    Timeout {
        /// The worker slot that timed out.
        worker_id: usize,
    },
    /// One or more workers reported per-path failures; surfaced as a single
    /// aggregate failure per §4.5.3 step 7.
    #[error("{} worker task(s) failed: {failures:?}", failures.len())]
    Aggregate {
        /// `(path, message)` pairs for every failed task across all workers.
        failures: Vec<(String, String)>,
    },
    /// A send/receive was attempted on a transport after `close`.
    #[error("transport is closed")]
    TransportClosed,
    /// No worker handle was available within the pool's wait budget.
    #[error("worker pool exhausted: all {max_workers} handles in use")]
    PoolExhausted {
        /// The pool's configured capacity.
        max_workers: usize,
    },
    /// A lower-level git-backend failure.
    #[error(transparent)]
    Git(#[from] GitError),
    /// A lower-level working-directory failure.
    #[error(transparent)]
    Worktree(#[from] WorktreeError),
    /// A lower-level checkout-engine failure (matcher/analyze/execute).
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}
