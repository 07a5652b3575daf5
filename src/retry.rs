use std::time::Duration;
use tokio::time::sleep;

use crate::config::FetchConfig;
use crate::error::{ExporterError, RpcError};
use crate::logging::LogContext;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between retries in seconds
    pub initial_delay_seconds: u64,
    /// Maximum delay between retries in seconds
    pub max_delay_seconds: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_seconds: 2,
            max_delay_seconds: 60,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Derive retry behavior from the fetch configuration
    pub fn from_fetch(fetch: &FetchConfig) -> Self {
        Self {
            max_attempts: fetch.max_retries,
            initial_delay_seconds: fetch.retry_delay_seconds,
            max_delay_seconds: fetch.max_retry_delay_seconds,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Retry mechanism with exponential backoff and jitter.
///
/// Only recoverable errors (timeouts, connection failures, rate limits) are
/// retried; everything else aborts on the first attempt. Rate-limit errors
/// use the server-suggested delay instead of the backoff curve.
pub struct RetryManager {
    config: RetryConfig,
    operation_name: String,
}

impl RetryManager {
    pub fn new(operation_name: &str, config: RetryConfig) -> Self {
        Self {
            config,
            operation_name: operation_name.to_string(),
        }
    }

    /// Execute an operation with retry logic
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, ExporterError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ExporterError>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        let context = LogContext::new("retry", &self.operation_name)
                            .with_metadata("attempt", serde_json::json!(attempt));
                        context.info("Operation recovered after retry");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !error.is_recoverable() {
                        let context = LogContext::new("retry", &self.operation_name)
                            .with_metadata("attempt", serde_json::json!(attempt));
                        context
                            .warn(&format!("Non-recoverable error, aborting retries: {}", error));
                        return Err(error);
                    }

                    if attempt >= self.config.max_attempts {
                        last_error = Some(error);
                        break;
                    }

                    let delay = self.delay_for(&error, attempt);

                    let context = LogContext::new("retry", &self.operation_name)
                        .with_metadata("attempt", serde_json::json!(attempt))
                        .with_metadata("max_attempts", serde_json::json!(self.config.max_attempts))
                        .with_metadata("delay_seconds", serde_json::json!(delay.as_secs()));
                    context.warn(&format!(
                        "Retrying in {}s (attempt {} of {}): {}",
                        delay.as_secs(),
                        attempt,
                        self.config.max_attempts,
                        error
                    ));

                    sleep(delay).await;
                    last_error = Some(error);
                }
            }
        }

        let final_error = last_error.unwrap_or_else(|| {
            ExporterError::Rpc(RpcError::Connection(
                "All retry attempts exhausted".to_string(),
            ))
        });

        let context = LogContext::new("retry", &self.operation_name)
            .with_metadata("max_attempts", serde_json::json!(self.config.max_attempts));
        context.error(&format!(
            "All {} attempts failed: {}",
            self.config.max_attempts, final_error
        ));

        Err(final_error)
    }

    fn delay_for(&self, error: &ExporterError, attempt: u32) -> Duration {
        // Rate-limited endpoints tell us how long to wait
        if let ExporterError::Rpc(RpcError::RateLimit { seconds }) = error {
            return Duration::from_secs(*seconds);
        }
        self.calculate_delay(attempt)
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponential = self.config.initial_delay_seconds as f64
            * self
                .config
                .backoff_multiplier
                .powi(attempt.saturating_sub(1) as i32);
        let capped = exponential.min(self.config.max_delay_seconds as f64);

        let delay = if self.config.jitter {
            let jitter = capped * 0.1 * (rand::random::<f64>() - 0.5);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis((delay * 1000.0) as u64)
    }
}
