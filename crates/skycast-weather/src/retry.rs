//! Exponential-backoff retries for weather API requests.
//!
//! Retried: timeouts, connection failures, 5xx, 408 and 429.
//! Not retried: other 4xx (bad key, unknown place, bad query).

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries (doubles each attempt)
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// No retries at all; used by tests against mock servers.
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Delay before retry number `attempt` (0-based): initial * 2^attempt, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

/// Check if a status code is worth retrying
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Check if a transport error is worth retrying
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    if error.is_request() {
        return false;
    }
    error.status().map(is_retryable_status).unwrap_or(false)
}

/// Run `operation` until it yields a non-retryable outcome or attempts run out.
///
/// When every attempt returns a retryable status, the last response is handed
/// back so the caller can map it to an error.
pub async fn with_retry<F, Fut>(
    config: &RetryConfig,
    operation: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;

    loop {
        let outcome = operation().await;
        let exhausted = attempt >= config.max_retries;

        let retry = match &outcome {
            Ok(response) if is_retryable_status(response.status()) && !exhausted => {
                tracing::warn!(
                    "Request returned {}, attempt {} of {}",
                    response.status(),
                    attempt + 1,
                    config.max_retries + 1
                );
                true
            }
            Err(e) if is_retryable_error(e) && !exhausted => {
                tracing::warn!(
                    "Retryable error on attempt {} of {}: {}",
                    attempt + 1,
                    config.max_retries + 1,
                    e
                );
                true
            }
            _ => false,
        };

        if !retry {
            if attempt > 0 && outcome.is_ok() {
                tracing::info!("Request completed after {} retries", attempt);
            }
            return outcome;
        }

        let delay = config.delay_for_attempt(attempt);
        attempt += 1;
        tracing::debug!("Retry {} of {} in {:?}", attempt, config.max_retries, delay);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_millis(5000));
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::new(10, 100, 1000);
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(63), Duration::from_millis(1000));
    }

    #[test]
    fn test_retryable_status_codes() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));

        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/flaky", mock_server.uri());
        let calls = Arc::new(AtomicUsize::new(0));

        let response = with_retry(&RetryConfig::new(3, 1, 5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            client.get(&url).send()
        })
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_returns_last_response_when_exhausted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/down", mock_server.uri());

        let response = with_retry(&RetryConfig::new(2, 1, 5), || client.get(&url).send())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_client_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/missing", mock_server.uri());

        let response = with_retry(&RetryConfig::new(3, 1, 5), || client.get(&url).send())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
