// src/common/db_utils.rs

use std::{future::Future, time::Duration};

use crate::common::error::{is_transient, AppError};

const RETRY_DELAY: Duration = Duration::from_millis(100);

// ---
// Helper de Retry: uma única nova tentativa para falhas transitórias do banco
// ---
/// Executa `operation` e, se falhar com um erro transitório do store
/// (timeout da pool, I/O, deadlock, serialização), tenta mais uma vez.
/// Qualquer outro erro é devolvido imediatamente.
pub async fn retry_transient<F, Fut, T>(operation_name: &str, mut operation: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    match operation().await {
        Err(AppError::DatabaseError(e)) if is_transient(&e) => {
            tracing::warn!(
                operation = operation_name,
                error = %e,
                delay_ms = RETRY_DELAY.as_millis() as u64,
                "Falha transitória no banco, tentando novamente"
            );
            tokio::time::sleep(RETRY_DELAY).await;
            operation().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_error_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, AppError> = retry_transient("test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_second_transient_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), AppError> = retry_transient("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
        })
        .await;

        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_domain_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), AppError> = retry_transient("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Forbidden)
        })
        .await;

        assert!(matches!(result, Err(AppError::Forbidden)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
