use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Cooperative cancellation flag shared by the scheduler, its workers and the end-time
/// watchdog. Nothing is interrupted mid-case; holders check it at iteration boundaries.
#[derive(Debug, Default)]
pub struct CancelSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::info!(
                "cancelled at {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f")
            );
        }
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent `cancel` cannot slip between.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Sleeps for `duration` unless cancelled first. Returns `false` when cut short.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
            _ = self.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let signal = Arc::new(CancelSignal::new());
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };
        tokio::task::yield_now().await;
        signal.cancel();

        let joined = tokio::time::timeout(Duration::from_secs(5), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_cancel() {
        let signal = Arc::new(CancelSignal::new());
        let started = Instant::now();
        let canceller = {
            let signal = signal.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                signal.cancel();
            })
        };

        assert!(!signal.sleep(Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(10));
        let _ = canceller.await;
    }

    #[tokio::test]
    async fn reset_clears_flag() {
        let signal = CancelSignal::new();
        signal.cancel();
        signal.reset();
        assert!(!signal.is_cancelled());
        assert!(signal.sleep(Duration::from_millis(1)).await);
    }
}
