//! Generation of customer-facing codes
//!
//! Tracking codes (`PF######-####`), list share tokens (24 alphanumeric
//! characters) and bundle scan codes (`SACO-########`). Uniqueness is enforced
//! by the repositories; [`with_unique_token`] retries a bounded number of
//! times when a generated value collides.

use std::future::Future;

use rand::{distributions::Alphanumeric, Rng};
use shared::{SCAN_CODE_PREFIX, SHARE_TOKEN_LEN, TRACKING_CODE_PREFIX};

use crate::error::{AppError, AppResult};

/// Source of random codes
pub trait TokenGenerator: Send + Sync {
    fn tracking_code(&self) -> String;
    fn share_token(&self) -> String;
    fn scan_code(&self) -> String;
}

/// `rand`-backed generator used by the server
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn tracking_code(&self) -> String {
        let mut rng = rand::thread_rng();
        format!(
            "{}{:06}-{:04}",
            TRACKING_CODE_PREFIX,
            rng.gen_range(0..1_000_000),
            rng.gen_range(0..10_000)
        )
    }

    fn share_token(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SHARE_TOKEN_LEN)
            .map(char::from)
            .collect()
    }

    fn scan_code(&self) -> String {
        format!(
            "{}{:08}",
            SCAN_CODE_PREFIX,
            rand::thread_rng().gen_range(0..100_000_000)
        )
    }
}

/// Run `attempt` with fresh tokens until it stops failing with
/// `DuplicateToken`, up to `max_attempts` tries
pub async fn with_unique_token<T, G, F, Fut>(
    kind: &str,
    max_attempts: u32,
    mut generate: G,
    mut attempt: F,
) -> AppResult<T>
where
    G: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        let token = generate();
        match attempt(token.clone()).await {
            Err(AppError::DuplicateToken(_)) => {
                tracing::debug!("{} {} collided (attempt {}/{})", kind, token, n, max_attempts);
            }
            other => return other,
        }
    }

    tracing::warn!("Gave up generating a unique {} after {} attempts", kind, max_attempts);
    Err(AppError::DuplicateToken(kind.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{validate_scan_code, validate_share_token, validate_tracking_code};

    #[test]
    fn test_generated_formats() {
        let tokens = RandomTokenGenerator;
        for _ in 0..50 {
            assert!(validate_tracking_code(&tokens.tracking_code()).is_ok());
            assert!(validate_share_token(&tokens.share_token()).is_ok());
            assert!(validate_scan_code(&tokens.scan_code()).is_ok());
        }
    }

    #[tokio::test]
    async fn test_retries_until_unique() {
        let mut calls = 0;
        let result = with_unique_token(
            "tracking code",
            5,
            || "PF000001-0001".to_string(),
            |_token| {
                calls += 1;
                let n = calls;
                async move {
                    if n < 3 {
                        Err(AppError::DuplicateToken("tracking code".into()))
                    } else {
                        Ok(n)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let result: AppResult<()> = with_unique_token(
            "share token",
            2,
            || "x".to_string(),
            |_| async { Err(AppError::DuplicateToken("share token".into())) },
        )
        .await;
        assert!(matches!(result, Err(AppError::DuplicateToken(_))));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mut calls = 0;
        let result: AppResult<()> = with_unique_token(
            "scan code",
            5,
            || "SACO-00000001".to_string(),
            |_| {
                calls += 1;
                async { Err(AppError::NotFound("Bundle".into())) }
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(calls, 1);
    }
}
