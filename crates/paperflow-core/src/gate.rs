//! Counting gate limiting how many work items talk to external services at once.

use tokio::sync::{Semaphore, SemaphorePermit};

/// A counting gate shared by every task of a run.
///
/// Only [`acquire`](ConcurrencyGate::acquire) is exposed; the permit is
/// returned when the guard drops, whether the handler succeeded, failed or
/// panicked.
#[derive(Debug)]
pub struct ConcurrencyGate {
    inner: Semaphore,
    permits: usize,
}

/// RAII guard that releases one slot on drop.
#[derive(Debug)]
pub struct GatePermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl ConcurrencyGate {
    /// Create a gate with `permits` slots (at least one).
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            inner: Semaphore::new(permits),
            permits,
        }
    }

    /// Wait until a slot is free, then take it.
    pub async fn acquire(&self) -> GatePermit<'_> {
        // The semaphore is owned here and never closed
        let permit = self
            .inner
            .acquire()
            .await
            .unwrap_or_else(|_| unreachable!("gate semaphore closed"));
        GatePermit { _permit: permit }
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.permits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_and_release() {
        let gate = ConcurrencyGate::new(2);
        let g1 = gate.acquire().await;
        let _g2 = gate.acquire().await;
        assert_eq!(gate.inner.available_permits(), 0);
        drop(g1);
        assert_eq!(gate.inner.available_permits(), 1);
    }

    #[tokio::test]
    async fn zero_is_clamped_to_one() {
        let gate = ConcurrencyGate::new(0);
        assert_eq!(gate.capacity(), 1);
        let _g = gate.acquire().await;
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_acquire() {
        let gate = ConcurrencyGate::new(1);
        let guard = gate.acquire().await;

        let waiter = async {
            let _g = gate.acquire().await;
            42
        };
        let release = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        };

        let (value, ()) = tokio::join!(waiter, release);
        assert_eq!(value, 42);
        assert_eq!(gate.inner.available_permits(), 1);
    }
}
