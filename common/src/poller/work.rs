// Work unit abstraction and the production CPU-rollup implementation

use crate::db::RollupRepository;
use crate::errors::PollerError;
use async_trait::async_trait;
use tracing::instrument;

/// One parameterless, fallible unit of work, invoked once per cycle.
///
/// Implementations hold no mutable state between invocations. The loop
/// treats any error as fatal: no retry, no backoff, the process exits
/// non-zero and the supervisor decides whether to restart it. Swapping
/// the implementation is how this runner is repurposed for other
/// periodic tasks.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    /// Execute the unit once, returning the number of rows it appended.
    async fn run(&self) -> Result<u64, PollerError>;

    /// Short description used for activity reporting.
    fn describe(&self) -> &str;
}

/// The production work unit: one transaction-scoped pass of the fixed
/// CPU aggregation statement.
pub struct CpuRollup {
    repo: RollupRepository,
}

impl CpuRollup {
    pub fn new(repo: RollupRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl WorkUnit for CpuRollup {
    #[instrument(skip(self))]
    async fn run(&self) -> Result<u64, PollerError> {
        let rows = self.repo.aggregate_once().await?;
        Ok(rows)
    }

    fn describe(&self) -> &str {
        self.repo.statement()
    }
}
