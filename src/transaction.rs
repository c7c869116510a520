use tracing::{debug, warn};

use crate::builders::Query;
use crate::error::Result;
use crate::traits::DatabaseDriver;

/// Rolls back only when a transaction is still open, so it is safe after a
/// failed `COMMIT` and on a clean session.
pub(crate) const ROLLBACK_IF_OPEN: &str = "IF @@TRANCOUNT > 0 ROLLBACK";

/// Runs `statements` between `BEGIN TRANSACTION` and `COMMIT`.
///
/// When a statement or the `COMMIT` fails, the transaction is rolled back and
/// that first error is returned; a failing rollback is only logged.
pub(crate) async fn run_in_transaction(
    driver: &dyn DatabaseDriver,
    statements: &[Query],
) -> Result<()> {
    debug!(statements = statements.len(), "Beginning transaction");
    driver.execute("BEGIN TRANSACTION", &[]).await?;

    if let Err(e) = execute_and_commit(driver, statements).await {
        if let Err(rollback_err) = driver.execute(ROLLBACK_IF_OPEN, &[]).await {
            warn!(error = %rollback_err, "Rollback failed");
        }
        return Err(e);
    }
    Ok(())
}

async fn execute_and_commit(driver: &dyn DatabaseDriver, statements: &[Query]) -> Result<()> {
    for statement in statements {
        driver.execute(&statement.sql, &statement.params).await?;
    }
    debug!("Committing transaction");
    driver.execute("COMMIT", &[]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::InMemoryTestDriver;
    use crate::error::SqlFrameError;
    use crate::types::RawQueryResult;

    fn statements() -> Vec<Query> {
        vec![Query::raw("DELETE FROM [t]"), Query::raw("INSERT INTO [t] DEFAULT VALUES")]
    }

    #[tokio::test]
    async fn test_statements_between_begin_and_commit() {
        let driver = InMemoryTestDriver::new();
        run_in_transaction(&driver, &statements()).await.unwrap();
        assert_eq!(
            driver.recorded_sql(),
            vec![
                "BEGIN TRANSACTION",
                "DELETE FROM [t]",
                "INSERT INTO [t] DEFAULT VALUES",
                "COMMIT"
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back() {
        let driver = InMemoryTestDriver::new()
            .with_response(RawQueryResult::empty())
            .with_failure("lock timeout")
            .with_failure("connection reset");

        let err = run_in_transaction(&driver, &statements()).await.unwrap_err();
        assert!(matches!(err, SqlFrameError::QueryFailed(m) if m == "lock timeout"));
        assert_eq!(
            driver.recorded_sql(),
            vec!["BEGIN TRANSACTION", "DELETE FROM [t]", ROLLBACK_IF_OPEN]
        );
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back() {
        let driver = InMemoryTestDriver::new()
            .with_response(RawQueryResult::empty())
            .with_response(RawQueryResult::empty())
            .with_response(RawQueryResult::empty())
            .with_failure("commit failed");

        let err = run_in_transaction(&driver, &statements()).await.unwrap_err();
        assert!(matches!(err, SqlFrameError::QueryFailed(m) if m == "commit failed"));
        assert_eq!(driver.recorded_sql().len(), 5);
        driver.assert_last_query(ROLLBACK_IF_OPEN, &[]);
    }
}
