//! Bounded retry with exponential backoff for transient call failures.

// built-in
use std::future::Future;
use std::time::Duration;

// external
use tracing::warn;

/// Retry behavior for a single external call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each subsequent one.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Scale each delay by a random factor in [0.5, 1.0).
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter {
            delay.mul_f64(0.5 + fastrand::f64() * 0.5)
        } else {
            delay
        }
    }
}

/// Outcome of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError {
    /// Worth another try: timeouts, connection errors, 408, 429, 5xx.
    Transient(String),
    /// Retrying would not help: auth, bad request, malformed response.
    Fatal(String),
}

/// Run `op` until it succeeds, fails fatally, or the retry budget is spent.
/// `op` receives the zero-based attempt number.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, String>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(CallError::Fatal(msg)) => return Err(msg),
            Err(CallError::Transient(msg)) if attempt < config.max_retries => {
                let delay = config.delay_for(attempt);
                warn!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %msg, "transient failure; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(CallError::Transient(msg)) => {
                return Err(format!("{msg} (gave up after {} attempts)", attempt + 1));
            }
        }
    }
}
