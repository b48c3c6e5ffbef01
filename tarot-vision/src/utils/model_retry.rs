//! Model call retry
//!
//! Linear backoff for transient model failures.
//!
//! **Algorithm:**
//! 1. Call the model
//! 2. On success, return the response
//! 3. On a retryable error with retries left: log WARN, wait, retry
//! 4. On any other error, or when retries are exhausted: return the error
//!
//! **Backoff:** `base_delay * (attempt + 1)`, tripled when rate limited.

use std::time::Duration;

use crate::error::ModelError;
use crate::services::{ImageInput, ModelResponse, VisionModel};

/// Multiplier applied to the backoff when the provider rate limits us
const RATE_LIMIT_FACTOR: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Wait before retrying after failed attempt `attempt` (0-based)
    pub fn backoff(&self, attempt: u32, error: &ModelError) -> Duration {
        let factor = if matches!(error, ModelError::RateLimited(_)) {
            RATE_LIMIT_FACTOR
        } else {
            1
        };
        self.base_delay * factor * (attempt + 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Call `model` with retries for network, timeout and rate-limit failures
pub async fn call_with_retry(
    model: &dyn VisionModel,
    image: &ImageInput,
    prompt: &str,
    policy: RetryPolicy,
) -> Result<ModelResponse, ModelError> {
    let mut attempt = 0u32;

    loop {
        if attempt > 0 {
            tracing::debug!(image = %image.filename, attempt, "Retrying model call");
        }

        match model.recognize(image, prompt).await {
            Ok(response) => return Ok(response),
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                if attempt >= policy.max_retries {
                    tracing::error!(
                        image = %image.filename,
                        attempts = attempt + 1,
                        "Model call failed after retries: {}",
                        err
                    );
                    return Err(err);
                }

                let backoff = policy.backoff(attempt, &err);
                tracing::warn!(
                    image = %image.filename,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Model call failed, will retry: {}",
                    err
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct Scripted {
        outcomes: Mutex<Vec<Result<ModelResponse, ModelError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(mut outcomes: Vec<Result<ModelResponse, ModelError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl VisionModel for Scripted {
        fn model_id(&self) -> &str {
            "scripted"
        }

        async fn recognize(
            &self,
            _image: &ImageInput,
            _prompt: &str,
        ) -> Result<ModelResponse, ModelError> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ModelError::Api("script exhausted".into())))
        }
    }

    fn image() -> ImageInput {
        ImageInput {
            filename: "a.jpg".into(),
            path: PathBuf::from("a.jpg"),
            media_type: "image/jpeg",
            bytes: Vec::new(),
        }
    }

    fn ok() -> Result<ModelResponse, ModelError> {
        Ok(ModelResponse {
            text: "{}".into(),
            latency_ms: 5,
        })
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_is_linear_and_tripled_on_rate_limit() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0, &ModelError::Network("x".into())), Duration::from_secs(1));
        assert_eq!(policy.backoff(1, &ModelError::Timeout("x".into())), Duration::from_secs(2));
        assert_eq!(policy.backoff(1, &ModelError::RateLimited("x".into())), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_errors() {
        let model = Scripted::new(vec![
            Err(ModelError::Network("reset".into())),
            Err(ModelError::RateLimited("429".into())),
            ok(),
        ]);

        let result = call_with_retry(&model, &image(), "prompt", fast(2)).await;
        assert!(result.is_ok());
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_when_retries_exhausted() {
        let model = Scripted::new(vec![
            Err(ModelError::Timeout("1".into())),
            Err(ModelError::Timeout("2".into())),
            ok(),
        ]);

        let result = call_with_retry(&model, &image(), "prompt", fast(1)).await;
        assert_eq!(result.unwrap_err(), ModelError::Timeout("2".into()));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_api_error_fails_immediately() {
        let model = Scripted::new(vec![Err(ModelError::Api("401".into())), ok()]);

        let result = call_with_retry(&model, &image(), "prompt", fast(3)).await;
        assert!(result.is_err());
        assert_eq!(model.calls(), 1);
    }
}
