use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

/// Pause between attempts; swapped out in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested pauses without waiting
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// Fixed-backoff retry bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// What a bounded retry produced
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    /// Value from the last attempt made
    pub value: T,
    pub attempts: u32,
    pub accepted: bool,
}

/// Run `op` until `accept` approves its value or the attempts run out
///
/// `op` receives the 1-based attempt number. The backoff is only slept
/// between attempts, never after the last one.
pub async fn retry_until<T, F, Fut, P>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
    accept: P,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let value = op(attempt).await;
        if accept(&value) {
            return RetryOutcome {
                value,
                attempts: attempt,
                accepted: true,
            };
        }
        if attempt >= max_attempts {
            return RetryOutcome {
                value,
                attempts: attempt,
                accepted: false,
            };
        }

        tracing::debug!("Attempt {}/{} not accepted, retrying in {:?}", attempt, max_attempts, policy.backoff);
        sleeper.sleep(policy.backoff).await;
        attempt += 1;
    }
}
