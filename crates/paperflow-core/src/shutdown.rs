//! Graceful shutdown support via atomic flag

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// How often [`Shutdown::relay`] looks for a flag set from a signal handler.
const SIGNAL_POLL: Duration = Duration::from_millis(250);

/// Cancellation token checked by the runner between items.
///
/// Once requested, no new item starts; items already inside their handler
/// run to completion so no sink is left with a half-written record.
/// Items still waiting out a start delay, and the pause between batches,
/// are woken through [`Shutdown::requested`].
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown was requested
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Request shutdown; returns whether it had already been requested
    pub fn request(&self) -> bool {
        let already = self.flag.swap(true, Ordering::Relaxed);
        self.notify.notify_waiters();
        already
    }

    /// Resolves once shutdown is requested.
    ///
    /// Wakes immediately on [`Shutdown::request`]. A flag set by a signal
    /// handler is noticed only while [`Shutdown::relay`] is being polled.
    pub async fn requested(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Forward a signal-set flag to [`Shutdown::requested`] waiters. Never completes.
    ///
    /// Signal handlers may only touch the atomic, so the wakeup happens here.
    pub async fn relay(&self) -> Infallible {
        while !self.is_requested() {
            tokio::time::sleep(SIGNAL_POLL).await;
        }
        self.notify.notify_waiters();
        std::future::pending().await
    }

    /// Route SIGINT/SIGTERM to this token.
    ///
    /// First signal: graceful stop. Second signal: exit immediately with 130.
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
            let flag = self.flag.clone();
            // SAFETY: AtomicBool::swap and low_level::exit (_exit) are async-signal-safe
            unsafe {
                signal_hook::low_level::register(signal, move || {
                    if flag.swap(true, Ordering::Relaxed) {
                        signal_hook::low_level::exit(130);
                    }
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_shared_between_clones() {
        let a = Shutdown::new();
        let b = a.clone();
        assert!(!b.is_requested());
        assert!(!a.request());
        assert!(b.is_requested());
        assert!(b.request());
    }

    #[tokio::test(start_paused = true)]
    async fn request_wakes_waiter() {
        let shutdown = Shutdown::new();
        let start = tokio::time::Instant::now();
        tokio::join!(shutdown.requested(), async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            shutdown.request();
        });
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3010));
    }

    #[tokio::test]
    async fn requested_returns_at_once_when_already_set() {
        let shutdown = Shutdown::new();
        shutdown.request();
        shutdown.requested().await;
    }

    #[tokio::test(start_paused = true)]
    async fn relay_wakes_waiter_on_bare_flag() {
        let shutdown = Shutdown::new();
        let start = tokio::time::Instant::now();
        tokio::select! {
            () = async {
                tokio::join!(shutdown.requested(), async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    // what a signal handler does: no notify
                    shutdown.flag.store(true, Ordering::Relaxed);
                });
            } => {}
            never = shutdown.relay() => match never {},
        }
        assert!(start.elapsed() <= Duration::from_secs(1) + SIGNAL_POLL);
    }
}
