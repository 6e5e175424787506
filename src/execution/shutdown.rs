use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Cloneable cancellation signal for the trading loop
///
/// Checked between cycles and before blocking gateway calls. Sleeps wait on
/// it so a trigger interrupts the poll delay immediately.
#[derive(Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`; returns `true` if woken by a trigger
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent trigger is not lost
        notified.as_mut().enable();

        if self.is_triggered() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_triggered(),
            _ = notified => true,
        }
    }

    /// Trigger on ctrl-c
    pub fn listen_for_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::warn!("Received Ctrl+C, liquidating and shutting down...");
                    shutdown.trigger();
                }
                Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_visible_to_clones() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();
        assert!(!clone.is_triggered());

        shutdown.trigger();
        assert!(clone.is_triggered());
    }

    #[tokio::test]
    async fn test_sleep_runs_to_completion() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.sleep(Duration::from_millis(5)).await);
    }

    #[test]
    fn test_sleep_returns_early_when_already_triggered() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(tokio_test::block_on(shutdown.sleep(Duration::from_secs(3600))));
    }

    #[tokio::test]
    async fn test_trigger_interrupts_sleep() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();

        let handle = tokio::spawn(async move { shutdown.sleep(Duration::from_secs(3600)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();

        let woke_early = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sleep was not interrupted")
            .unwrap();
        assert!(woke_early);
    }
}
