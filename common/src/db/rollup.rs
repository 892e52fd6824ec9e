// Repository owning the fixed CPU-rollup statement

use crate::db::DbPool;
use crate::errors::DatabaseError;
use tracing::{debug, instrument};

/// One row per configured pattern, holding the summed CPU percent of
/// every inventoried process whose name contains the pattern
/// (case-insensitive). Appended to `stats` each cycle; the table is an
/// append-only time series, never overwritten.
const ROLLUP_SQL: &str = "\
    INSERT INTO stats (process_family, cpu_percent) \
    SELECT pattern, SUM(cpu_percent) \
    FROM processes \
    INNER JOIN monitored_processes \
            ON name ILIKE ('%' || pattern || '%') \
    GROUP BY pattern";

/// Executes the fixed aggregation statement against the process
/// inventory.
///
/// `processes` is read-only here and owned by the external inventory
/// importer; `monitored_processes` is read-only and owned by
/// administration; `stats` is the append target.
#[derive(Debug, Clone)]
pub struct RollupRepository {
    db_pool: DbPool,
}

impl RollupRepository {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    /// Run one aggregation pass inside a fresh transaction.
    ///
    /// Opens a transaction (which pins a consistent snapshot for the
    /// statement), executes the rollup, commits, and returns the number
    /// of rows appended to `stats`. An empty pattern table appends zero
    /// rows and still commits.
    #[instrument(skip(self))]
    pub async fn aggregate_once(&self) -> Result<u64, DatabaseError> {
        let mut tx = self
            .db_pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let result = sqlx::query(ROLLUP_SQL).execute(&mut *tx).await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let rows = result.rows_affected();
        debug!(rows_appended = rows, "Rollup statement committed");
        Ok(rows)
    }

    /// The statement text, exposed for activity reporting.
    pub fn statement(&self) -> &'static str {
        ROLLUP_SQL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollup_sql_shape() {
        // The statement is fixed and parameterless; guard its key
        // clauses against accidental edits.
        assert!(ROLLUP_SQL.starts_with("INSERT INTO stats"));
        assert!(ROLLUP_SQL.contains("ILIKE"));
        assert!(ROLLUP_SQL.contains("GROUP BY pattern"));
        assert!(!ROLLUP_SQL.contains('$'));
    }
}
