//! Exponential backoff with jitter, shared by every component that retries
//! a fallible operation: the distributed lock's `acquire`, the cross-instance
//! bus producer, and the Worker Pool's notify tasks.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl RetryConfig {
    /// Low-latency retry for calls on a request's critical path (join/ready).
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }

    /// Used by the distributed lock's `acquire` when callers are willing to
    /// wait out contention (e.g. two instances racing `start`).
    pub fn persistent() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(25),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter_factor: 0.3,
        }
    }

    /// Used for cross-instance bus publish retries.
    pub fn bus() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter_factor: 0.25,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = capped * self.jitter_factor * fastrand::f64();
        Duration::from_secs_f64(capped + jitter)
    }
}

pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Retries `op` until it returns `Ok` or the attempt budget is spent.
    pub async fn execute<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.execute_with_condition(&mut op, |_| true).await
    }

    /// Retries `op` only while `should_retry` returns true for the error.
    pub async fn execute_with_condition<T, E, F, Fut, C>(
        &self,
        mut op: F,
        should_retry: C,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.config.max_attempts || !should_retry(&e) {
                        return Err(e);
                    }
                    tokio::time::sleep(self.config.delay_for_attempt(attempt)).await;
                }
            }
        }
    }
}

/// String-matches a lowercased error message against known-transient
/// conditions. Storage/backends in this codebase surface errors as strings
/// (`anyhow`), so this is the same pattern used throughout for retry gating.
pub fn is_retryable_error(message: &str) -> bool {
    let m = message.to_lowercase();
    is_race_condition_error(&m) || is_temporary_connection_error(&m)
}

pub fn is_race_condition_error(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("lock busy")
        || m.contains("already locked")
        || m.contains("conflict")
        || m.contains("deadlock")
}

pub fn is_temporary_connection_error(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("timeout")
        || m.contains("connection reset")
        || m.contains("connection refused")
        || m.contains("unavailable")
}
