use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::warn;

const BASE_DELAY_MS: u64 = 250;

/// Sends the request built by `build`, retrying transport failures
/// (connect errors and timeouts) up to `retries` extra times. HTTP error
/// statuses are returned to the caller untouched.
pub(crate) async fn send_with_retry<F>(
    retries: u32,
    mut build: F,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        match build().send().await {
            Ok(response) => return Ok(response),
            Err(err) if attempt < retries && (err.is_connect() || err.is_timeout()) => {
                attempt += 1;
                let delay = backoff_delay(attempt);
                warn!("upstream request failed ({}); retry {} in {:?}", err, attempt, delay);
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(6);
    Duration::from_millis(BASE_DELAY_MS << exponent)
}

#[cfg(test)]
mod tests {
    use super::backoff_delay;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(250));
        assert_eq!(backoff_delay(2), Duration::from_millis(500));
        assert_eq!(backoff_delay(3), Duration::from_millis(1000));
        assert_eq!(backoff_delay(50), Duration::from_millis(250 << 6));
    }
}
