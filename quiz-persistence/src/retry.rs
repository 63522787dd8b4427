use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::SessionError;

pub const DEFAULT_LOCK_RETRY_ATTEMPTS: u32 = 3;
const LOCK_RETRY_BASE_DELAY: Duration = Duration::from_millis(25);

/// Runs `op` until it succeeds, fails with a non-transient error, or
/// `attempts` runs out. Each retry starts a fresh transaction.
pub async fn with_lock_retry<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Err(err) if attempt < attempts && err.is_transient() => {
                warn!("Transient lock failure (attempt {}/{}): {}", attempt, attempts, err);
                tokio::time::sleep(LOCK_RETRY_BASE_DELAY * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
