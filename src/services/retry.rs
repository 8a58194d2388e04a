//! Retry policy for non-streaming requests
//!
//! Retries are composed around a whole call by the caller. Streaming calls are
//! never retried: restarting a partially consumed stream would duplicate
//! tokens already handed out.

use std::{
    future::Future,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Exponential backoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying
    pub max_retries: u32,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval_ms: 500,
            max_interval_ms: 30_000,
            multiplier: 1.5,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_interval_ms))
            .with_max_interval(Duration::from_millis(self.max_interval_ms))
            .with_multiplier(self.multiplier)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Run `operation`, retrying failures that `is_retryable` accepts.
///
/// Gives up after `policy.max_retries` retries and returns the last error.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last retryable one once
/// retries are exhausted.
pub async fn with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    is_retryable: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    if policy.max_retries == 0 {
        return operation().await;
    }

    let attempts = AtomicU32::new(0);
    let attempts = &attempts;
    let operation = &operation;
    let is_retryable = &is_retryable;

    backoff::future::retry_notify(
        policy.backoff(),
        || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            operation().await.map_err(|err| {
                if attempt < policy.max_retries && is_retryable(&err) {
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        },
        |err: E, wait: Duration| {
            warn!("Request failed, retrying in {wait:?}: {err}");
        },
    )
    .await
}
