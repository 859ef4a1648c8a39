//! The worker pool (§4.5.1, §5): up to `max_workers` worker handles backed
//! by a dedicated `rayon` thread pool. A handle is a logical accounting
//! token, not the thread itself — `rayon` owns scheduling and work-stealing
//! across the pool's threads; this layer only enforces the free-list
//! acquire/release contract callers rely on ("at most N concurrent worker
//! tasks in flight") and provides `execute`/`spawn` on top of it.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::WorkerError;

/// An acquired worker slot. Dropping it releases the slot back to the pool.
pub struct WorkerHandle<'a> {
    pool: &'a WorkerPool,
    id: usize,
}

impl WorkerHandle<'_> {
    /// The slot index, stable for the handle's lifetime (0..`max_workers`).
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }
}

impl Drop for WorkerHandle<'_> {
    fn drop(&mut self) {
        self.pool.release(self.id);
    }
}

struct PoolState {
    free: VecDeque<usize>,
}

/// A bounded pool of worker handles with a real `rayon` thread pool behind
/// it for executing the actual work.
pub struct WorkerPool {
    max_workers: usize,
    state: Mutex<PoolState>,
    available: Condvar,
    threads: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `max_workers` handles and a matching `rayon`
    /// thread pool.
    ///
    /// # Errors
    /// Propagates `rayon`'s thread-spawn failure, wrapped as
    /// [`WorkerError::PoolExhausted`] is NOT used here — spawn failure is a
    /// distinct, lower-level condition.
    pub fn new(max_workers: usize) -> Result<Self, WorkerError> {
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers.max(1))
            .thread_name(|i| format!("gitport-worker-{i}"))
            .build()
            .map_err(|e| WorkerError::Git(git_backend::GitError::Internal {
                reason: format!("failed to start worker thread pool: {e}"),
            }))?;
        Ok(Self {
            max_workers,
            state: Mutex::new(PoolState {
                free: (0..max_workers).collect(),
            }),
            available: Condvar::new(),
            threads,
        })
    }

    /// The pool's configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_workers
    }

    /// Acquire a handle, blocking up to `wait` for one to free up.
    ///
    /// # Errors
    /// [`WorkerError::PoolExhausted`] if no handle frees up within `wait`.
    pub fn acquire(&self, wait: Duration) -> Result<WorkerHandle<'_>, WorkerError> {
        let deadline = Instant::now() + wait;
        let mut guard = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        loop {
            if let Some(id) = guard.free.pop_front() {
                return Ok(WorkerHandle { pool: self, id });
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(WorkerError::PoolExhausted {
                    max_workers: self.max_workers,
                });
            }
            let (next_guard, timeout_result) = self
                .available
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            guard = next_guard;
            if timeout_result.timed_out() && guard.free.is_empty() {
                return Err(WorkerError::PoolExhausted {
                    max_workers: self.max_workers,
                });
            }
        }
    }

    fn release(&self, id: usize) {
        let mut guard = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.free.push_back(id);
        drop(guard);
        self.available.notify_one();
    }

    /// Run `f` on the pool's thread pool, blocking the caller until it
    /// completes. Used for coordinator-timed work where the caller manages
    /// its own timeout via a channel (see [`crate::coordinator`]).
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.threads.install(f)
    }

    /// Fire-and-forget a task onto the pool's threads.
    pub fn spawn(&self, f: impl FnOnce() + Send + 'static) {
        self.threads.spawn(f);
    }

    /// Terminate the pool: drains the free list so no further handle can be
    /// acquired. In-flight `rayon` tasks already spawned still run to
    /// completion (§5: "the underlying job may still complete but its
    /// results are discarded" on timeout); this only prevents new work from
    /// being scheduled through this pool's handles.
    pub fn terminate_all(&self) {
        let mut guard = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_release_round_trips_through_free_list() {
        let pool = WorkerPool::new(2).unwrap();
        let a = pool.acquire(Duration::from_millis(100)).unwrap();
        let b = pool.acquire(Duration::from_millis(100)).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(pool.acquire(Duration::from_millis(50)).is_err());
        drop(a);
        assert!(pool.acquire(Duration::from_millis(100)).is_ok());
    }

    #[test]
    fn terminate_all_prevents_further_acquire() {
        let pool = WorkerPool::new(1).unwrap();
        pool.terminate_all();
        assert!(matches!(
            pool.acquire(Duration::from_millis(10)),
            Err(WorkerError::PoolExhausted { .. })
        ));
    }
}
