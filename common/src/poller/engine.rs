// Poller engine implementation

use crate::config::{ConfigSource, NAPTIME_DEFAULT};
use crate::errors::PollerError;
use crate::poller::work::WorkUnit;
use crate::signals::SignalCoordinator;
use crate::telemetry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Idle duration between poll cycles
    pub naptime: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            naptime: Duration::from_secs(NAPTIME_DEFAULT),
        }
    }
}

impl PollerConfig {
    /// Build the loop configuration from validated settings, applying
    /// the naptime bounds.
    pub fn from_settings(settings: &crate::config::PollerSettings) -> Self {
        Self {
            naptime: Duration::from_secs(settings.naptime_seconds_clamped()),
        }
    }
}

/// Why the loop stopped.
///
/// There is no success exit: the loop runs until signaled, until its
/// supervising parent disappears, or until a work unit fails (which
/// surfaces as an error, not an `ExitReason`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The terminate flag was observed; graceful stop.
    Terminated,
    /// The supervising parent process is gone; fatal, not retryable.
    ParentDeath,
}

/// Drives the wake/sleep/execute cycle and owns the loop lifecycle.
///
/// State machine per iteration:
/// WAITING → (woken or timed out) →
///   parent dead → exit | reload → re-read config | terminate → exit |
///   otherwise → RUNNING → back to WAITING.
pub struct PollerEngine {
    config: PollerConfig,
    signals: Arc<SignalCoordinator>,
    config_source: Arc<dyn ConfigSource>,
    work: Arc<dyn WorkUnit>,
    parent_pid: u32,
}

impl PollerEngine {
    /// Create a new engine. The parent PID is captured here; a later
    /// mismatch means the process was reparented and must exit.
    pub fn new(
        config: PollerConfig,
        signals: Arc<SignalCoordinator>,
        config_source: Arc<dyn ConfigSource>,
        work: Arc<dyn WorkUnit>,
    ) -> Self {
        Self {
            config,
            signals,
            config_source,
            work,
            parent_pid: std::os::unix::process::parent_id(),
        }
    }

    /// Watch a specific supervising PID instead of the parent captured
    /// at construction. Once the process's actual parent no longer
    /// matches, the next wake exits with `ExitReason::ParentDeath`.
    pub fn with_supervisor_pid(mut self, pid: u32) -> Self {
        self.parent_pid = pid;
        self
    }

    /// Run the loop until a signal stops it or a work unit fails.
    ///
    /// Signal flags are observed once per iteration, after the bounded
    /// wait returns; a signal arriving mid-cycle is acted on only after
    /// the cycle completes. Cancellation is cooperative: a running work
    /// unit is never aborted in flight.
    #[instrument(skip(self), fields(naptime_seconds = self.config.naptime.as_secs()))]
    pub async fn run(&mut self) -> Result<ExitReason, PollerError> {
        info!(
            naptime_seconds = self.config.naptime.as_secs(),
            "Starting poller engine"
        );

        loop {
            let outcome = self.signals.wait(self.config.naptime).await;
            debug!(?outcome, "Wait returned");

            // The reparenting check is the standalone analogue of a
            // supervisor-death latch event: evaluated on every wake.
            if std::os::unix::process::parent_id() != self.parent_pid {
                error!(
                    original_parent = self.parent_pid,
                    "Supervising parent process is gone, exiting"
                );
                return Ok(ExitReason::ParentDeath);
            }

            if self.signals.take_reload() {
                self.reload();
            }

            if self.signals.terminate_requested() {
                info!("Terminate requested, stopping poller engine");
                return Ok(ExitReason::Terminated);
            }

            self.run_cycle().await?;
        }
    }

    /// Execute the work unit once, reporting running/idle state around it.
    async fn run_cycle(&self) -> Result<(), PollerError> {
        telemetry::set_state_running(true);
        debug!(statement = self.work.describe(), "Executing work unit");

        let started = Instant::now();
        let result = self.work.run().await;
        let elapsed = started.elapsed();

        telemetry::set_state_running(false);

        match result {
            Ok(rows_appended) => {
                telemetry::record_cycle(rows_appended, elapsed.as_secs_f64());
                debug!(
                    rows_appended,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Cycle completed"
                );
                Ok(())
            }
            Err(e) => {
                // No recovery is defined for a failed cycle; surface it
                // and let the supervisor's restart policy take over.
                error!(error = %e, "Work unit failed, stopping poller engine");
                Err(e)
            }
        }
    }

    /// Re-read settings from the configuration source.
    ///
    /// Never aborts the loop: an unreadable source keeps the previous
    /// settings, and out-of-range naptimes are clamped before they
    /// reach the loop.
    fn reload(&mut self) {
        match self.config_source.load_poller() {
            Ok(settings) => {
                let naptime = Duration::from_secs(settings.naptime_seconds_clamped());
                if naptime != self.config.naptime {
                    info!(
                        old_seconds = self.config.naptime.as_secs(),
                        new_seconds = naptime.as_secs(),
                        "Naptime updated on reload"
                    );
                    self.config.naptime = naptime;
                } else {
                    debug!("Configuration reloaded, naptime unchanged");
                }
                telemetry::record_reload();
            }
            Err(e) => {
                warn!(error = %e, "Configuration reload failed, keeping previous settings");
            }
        }
    }

    /// The naptime currently in effect (after any reloads).
    pub fn naptime(&self) -> Duration {
        self.config.naptime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poller_config_default() {
        let config = PollerConfig::default();
        assert_eq!(config.naptime, Duration::from_secs(1));
    }

    #[test]
    fn test_poller_config_from_settings_clamps() {
        let settings = crate::config::PollerSettings {
            naptime_seconds: 600,
            exit_code_on_terminate: 0,
        };
        let config = PollerConfig::from_settings(&settings);
        assert_eq!(config.naptime, Duration::from_secs(60));
    }

    #[test]
    fn test_poller_config_from_settings_passes_valid_value() {
        let settings = crate::config::PollerSettings {
            naptime_seconds: 30,
            exit_code_on_terminate: 0,
        };
        let config = PollerConfig::from_settings(&settings);
        assert_eq!(config.naptime, Duration::from_secs(30));
    }
}
