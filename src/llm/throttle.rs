// Contract-Drafter: Retry policy and call pacing
// The model endpoint has a shared quota, so every call made through one
// handle is spaced by a fixed cooldown, regardless of which agent makes it.

use super::{ChatModel, LlmResponse, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Bounded retry behaviour shared by every worker agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per generation, first call included
    pub max_attempts: u32,
    /// Minimum spacing between two consecutive model calls
    pub cooldown_ms: u64,
    /// Deadline for a single model call
    pub call_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown_ms: 20_000,
            call_timeout_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    /// No cooldown and a short deadline, for tests and local models
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            cooldown_ms: 0,
            call_timeout_ms: 5_000,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Reject policies whose cooldown would not fit inside one call deadline
    pub fn validate(&self) -> Result<(), String> {
        if self.call_timeout_ms == 0 {
            return Err("call_timeout_ms must be greater than zero".to_string());
        }
        if self.cooldown_ms >= self.call_timeout_ms {
            return Err(format!(
                "cooldown_ms ({}) must be less than call_timeout_ms ({})",
                self.cooldown_ms, self.call_timeout_ms
            ));
        }
        Ok(())
    }

    /// Attempts actually made; a zero budget still makes one call.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Statistics for paced model calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
    pub total_calls: u64,
    pub failed_calls: u64,
    /// Calls that had to wait for the cooldown to elapse
    pub delayed_calls: u64,
}

/// Wraps a model so consecutive calls are at least `cooldown` apart
pub struct Throttled<M> {
    inner: M,
    cooldown: Duration,
    last_call: Mutex<Option<Instant>>,
    /// Set when `ready` slept, so the following call counts as delayed
    waited: AtomicBool,
    stats: std::sync::Mutex<CallStats>,
}

impl<M: ChatModel> Throttled<M> {
    pub fn new(inner: M, cooldown: Duration) -> Self {
        Self {
            inner,
            cooldown,
            last_call: Mutex::new(None),
            waited: AtomicBool::new(false),
            stats: std::sync::Mutex::new(CallStats::default()),
        }
    }

    pub fn from_policy(inner: M, policy: &RetryPolicy) -> Self {
        Self::new(inner, policy.cooldown())
    }

    pub fn stats(&self) -> CallStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Sleep until the cooldown after `previous` has passed; true if it slept
    async fn cool_down(&self, previous: Option<Instant>) -> bool {
        let Some(previous) = previous else {
            return false;
        };
        let ready_at = previous + self.cooldown;
        if ready_at <= Instant::now() {
            return false;
        }
        log::debug!("Cooling down for {:?} before next model call", ready_at - Instant::now());
        tokio::time::sleep_until(ready_at).await;
        true
    }

    fn record(&self, delayed: bool, failed: bool) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_calls += 1;
            if delayed {
                stats.delayed_calls += 1;
            }
            if failed {
                stats.failed_calls += 1;
            }
        }
    }
}

#[async_trait]
impl<M: ChatModel> ChatModel for Throttled<M> {
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse, anyhow::Error> {
        // Held for the whole call: callers are serialized as well as spaced.
        let mut last_call = self.last_call.lock().await;
        let slept = self.cool_down(*last_call).await;
        let delayed = slept || self.waited.swap(false, Ordering::Relaxed);

        let result = self.inner.complete(messages).await;
        *last_call = Some(Instant::now());
        self.record(delayed, result.is_err());
        result
    }

    async fn ready(&self) {
        let previous = *self.last_call.lock().await;
        if self.cool_down(previous).await {
            self.waited.store(true, Ordering::Relaxed);
        }
        self.inner.ready().await;
    }
}
