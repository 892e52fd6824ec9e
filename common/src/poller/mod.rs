// Poller module: the wake/sleep/execute loop and its work unit

pub mod engine;
pub mod work;

pub use engine::{ExitReason, PollerConfig, PollerEngine};
pub use work::{CpuRollup, WorkUnit};
