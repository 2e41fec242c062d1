//! Termination detection for work that keeps spawning more work.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// A counter of outstanding work units together with a one-shot completion signal.
///
/// Every unit of work registers itself with [`TerminationBarrier::acquire()`] before it becomes observable to anybody else,
/// and gives its [`WorkUnit`] back once done. Any work spawning more work must acquire the new units before releasing its own,
/// so that the counter can only drop to zero once, when nothing is left at all.
///
/// ```
/// # tokio_test::block_on(async {
/// # use crawler::barrier::TerminationBarrier;
/// let barrier = TerminationBarrier::new();
///
/// let parent = barrier.acquire();
/// let child = barrier.acquire();
/// parent.release();
/// assert!(!barrier.is_quiescent());
///
/// child.release();
/// barrier.wait_for_quiescence().await;
/// # })
/// ```
#[derive(Debug)]
pub struct TerminationBarrier {
    /// Number of acquired units not released yet.
    pending: Mutex<usize>,
    /// Flipped once to `true` when `pending` drops to zero.
    quiescent: watch::Sender<bool>,
}

impl TerminationBarrier {
    /// Create a shared barrier without any pending work.
    ///
    /// A fresh barrier is not quiescent: the signal is only raised by releasing the last acquired unit.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(0),
            quiescent: watch::channel(false).0,
        })
    }

    /// Register one new unit of outstanding work.
    #[must_use = "dropping a work unit releases it immediately"]
    pub fn acquire(self: &Arc<Self>) -> WorkUnit {
        let mut pending = self.lock();

        if *self.quiescent.borrow() {
            tracing::warn!("Acquiring work after quiescence has been signaled.");
        }

        *pending += 1;

        WorkUnit {
            barrier: Arc::clone(self),
        }
    }

    /// Wait until every acquired unit has been released.
    pub async fn wait_for_quiescence(&self) {
        let mut receiver = self.quiescent.subscribe();

        // the sender is owned by `self`, the channel cannot be closed while waiting
        let _ = receiver.wait_for(|quiescent| *quiescent).await;
    }

    /// Whether the last unit has been released.
    #[inline]
    pub fn is_quiescent(&self) -> bool {
        *self.quiescent.borrow()
    }

    /// Number of outstanding units.
    pub fn pending(&self) -> usize {
        *self.lock()
    }

    fn release(&self) {
        let mut pending = self.lock();

        debug_assert!(*pending > 0, "more work units released than acquired");
        *pending = pending.saturating_sub(1);

        if *pending == 0 {
            let already = self.quiescent.send_replace(true);
            debug_assert!(!already, "quiescence signaled twice");

            tracing::debug!("All work units released, quiescence reached.");
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // the counter is never left inconsistent by a panicking holder
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One unit of outstanding work registered in a [`TerminationBarrier`].
///
/// The unit is released when dropped, so that a task bailing out early (or unwinding) never stalls the barrier.
#[derive(Debug)]
pub struct WorkUnit {
    barrier: Arc<TerminationBarrier>,
}

impl WorkUnit {
    /// Mark this unit of work as complete.
    #[inline]
    pub fn release(self) {
        drop(self)
    }
}

impl Drop for WorkUnit {
    fn drop(&mut self) {
        self.barrier.release();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fresh_barrier_is_not_quiescent() {
        let barrier = TerminationBarrier::new();

        assert_eq!(barrier.pending(), 0);
        assert!(!barrier.is_quiescent());
    }

    #[test]
    fn test_counter_follows_units() {
        let barrier = TerminationBarrier::new();

        let units = (0..5).map(|_| barrier.acquire()).collect::<Vec<_>>();
        assert_eq!(barrier.pending(), 5);

        for (released, unit) in units.into_iter().enumerate() {
            assert!(!barrier.is_quiescent());
            unit.release();
            assert_eq!(barrier.pending(), 4 - released);
        }

        assert!(barrier.is_quiescent());
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_handoff_never_touches_zero() {
        let barrier = TerminationBarrier::new();

        let download = barrier.acquire();
        let parse = barrier.acquire();
        download.release();
        let write = barrier.acquire();
        parse.release();
        assert!(!barrier.is_quiescent());
        write.release();

        assert!(barrier.is_quiescent());
        logs_assert(|lines: &[&str]| match lines.iter().filter(|line| line.contains("quiescence reached")).count() {
            1 => Ok(()),
            n => Err(format!("quiescence reached {n} times")),
        });
    }

    #[tokio::test]
    async fn test_wait_after_quiescence_returns() {
        let barrier = TerminationBarrier::new();
        barrier.acquire().release();

        barrier.wait_for_quiescence().await;
        barrier.wait_for_quiescence().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wait_blocks_until_last_release() {
        let barrier = TerminationBarrier::new();
        let unit = barrier.acquire();

        let waiter = tokio::spawn({
            let barrier = Arc::clone(&barrier);
            async move { barrier.wait_for_quiescence().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let nested = barrier.acquire();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            nested.release();
        });
        unit.release();

        tokio::time::timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
        assert_eq!(barrier.pending(), 0);
    }
}
