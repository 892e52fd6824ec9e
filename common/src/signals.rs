// Signal coordination for the polling loop
//
// SIGHUP requests a configuration reload, SIGTERM/SIGINT request
// termination. Delivery only sets a flag and wakes the loop; all real
// work happens on the loop thread between cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{debug, info};

/// Outcome of one bounded wait at the top of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full naptime elapsed with no wake.
    TimedOut,
    /// A signal (or programmatic request) woke the wait early.
    Woken,
}

/// Flags set by signal delivery and observed once per loop iteration.
///
/// The terminate flag is sticky: once set it is never cleared, and the
/// loop must exit. The reload flag is cleared by the loop when taken.
pub struct SignalCoordinator {
    reload: AtomicBool,
    terminate: AtomicBool,
    wake: Notify,
}

impl SignalCoordinator {
    pub fn new() -> Self {
        Self {
            reload: AtomicBool::new(false),
            terminate: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    /// Install the OS signal listeners on the current runtime.
    ///
    /// Spawns a task that maps SIGHUP to the reload flag and
    /// SIGTERM/SIGINT to the terminate flag, waking the loop on each
    /// delivery.
    pub fn spawn_listeners(self: &Arc<Self>) -> std::io::Result<()> {
        let mut hangup = signal(SignalKind::hangup())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut interrupt = signal(SignalKind::interrupt())?;

        let flags = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = hangup.recv() => {
                        info!("SIGHUP received, requesting configuration reload");
                        flags.request_reload();
                    }
                    _ = terminate.recv() => {
                        info!("SIGTERM received, requesting termination");
                        flags.request_terminate();
                    }
                    _ = interrupt.recv() => {
                        info!("SIGINT received, requesting termination");
                        flags.request_terminate();
                    }
                }
            }
        });

        Ok(())
    }

    /// Set the reload flag and wake the loop. Also used by tests.
    pub fn request_reload(&self) {
        self.reload.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Set the terminate flag and wake the loop. The flag stays set.
    pub fn request_terminate(&self) {
        self.terminate.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Read and clear the reload flag.
    pub fn take_reload(&self) -> bool {
        self.reload.swap(false, Ordering::SeqCst)
    }

    pub fn terminate_requested(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Wait for up to `naptime`, or until a signal wakes the loop,
    /// whichever comes first. A wake requested before the wait begins
    /// is not lost: the stored permit completes the wait immediately.
    pub async fn wait(&self, naptime: Duration) -> WaitOutcome {
        match tokio::time::timeout(naptime, self.wake.notified()).await {
            Ok(()) => {
                debug!("Wait woken by signal");
                WaitOutcome::Woken
            }
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}

impl Default for SignalCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_flag_is_cleared_when_taken() {
        let signals = SignalCoordinator::new();
        assert!(!signals.take_reload());

        signals.request_reload();
        assert!(signals.take_reload());
        assert!(!signals.take_reload());
    }

    #[test]
    fn test_terminate_flag_is_sticky() {
        let signals = SignalCoordinator::new();
        assert!(!signals.terminate_requested());

        signals.request_terminate();
        assert!(signals.terminate_requested());
        // Repeated observation never clears it.
        assert!(signals.terminate_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_after_full_naptime() {
        let signals = SignalCoordinator::new();
        let started = tokio::time::Instant::now();

        let outcome = signals.wait(Duration::from_secs(60)).await;

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_requested_before_wait_is_not_lost() {
        let signals = SignalCoordinator::new();
        signals.request_terminate();

        let started = tokio::time::Instant::now();
        let outcome = signals.wait(Duration::from_secs(60)).await;

        assert_eq!(outcome, WaitOutcome::Woken);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
