use std::{future::Future, time::Duration};

use sea_orm::{DbErr, SqlErr};

const MAX_RETRIES: usize = 3;
const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 200;

/// Re-runs `op` when it loses a race on a unique index.
///
/// The closure receives the attempt number so it can pick a fresh candidate value.
pub(crate) async fn retry_on_unique_violation<T, F, Fut>(mut op: F) -> Result<T, DbErr>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Err(err) if is_unique_violation(&err) && attempt < MAX_RETRIES => {
                tracing::debug!(attempt, error = %err, "Unique conflict, retrying");
                tokio::time::sleep(backoff).await;
                let next_ms = (backoff.as_millis() as u64)
                    .saturating_mul(2)
                    .min(MAX_BACKOFF_MS);
                backoff = Duration::from_millis(next_ms);
                attempt += 1;
            }
            result => return result,
        }
    }
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sea_orm::{ConnectionTrait, Database};

    use super::*;

    #[tokio::test]
    async fn retries_with_next_candidate_after_conflict() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.execute_unprepared("CREATE TABLE codes (code TEXT NOT NULL UNIQUE);")
            .await
            .unwrap();
        db.execute_unprepared("INSERT INTO codes (code) VALUES ('C-1'), ('C-2');")
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let inserted = retry_on_unique_violation(|attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            let db = &db;
            async move {
                let code = format!("C-{}", attempt + 1);
                db.execute_unprepared(&format!("INSERT INTO codes (code) VALUES ('{code}');"))
                    .await?;
                Ok(code)
            }
        })
        .await
        .unwrap();

        assert_eq!(inserted, "C-3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), DbErr> = retry_on_unique_violation(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DbErr::Custom("boom".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
