//! Condition Poller
//!
//! Every "wait until X" in Sondar goes through [`wait_for_value`]: evaluate a
//! probe, sleep for the poll interval, repeat until the probe yields a value
//! or the timeout is spent.
//!
//! - A probe error counts as "not yet" for that tick, unless it is fatal
//!   ([`SondarError::is_fatal`]), in which case it propagates immediately.
//! - The timeout is the only bound. There is no cap on the number of polls.
//! - Sleeping uses `tokio::time`, so independent sessions on one runtime
//!   interleave while a poll is pending.

use crate::result::{SondarError, SondarResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Smallest poll interval accepted from configuration
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

fn default_description() -> String {
    "condition".to_string()
}

#[derive(Deserialize)]
struct RawConditionSpec {
    timeout: Duration,
    interval: Duration,
    #[serde(default = "default_description")]
    description: String,
}

/// Timeout, poll interval and a description of what is awaited.
///
/// Invariant: `interval > 0` and `timeout >= interval`, also when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConditionSpec")]
pub struct ConditionSpec {
    timeout: Duration,
    interval: Duration,
    description: String,
}

impl TryFrom<RawConditionSpec> for ConditionSpec {
    type Error = SondarError;

    fn try_from(raw: RawConditionSpec) -> SondarResult<Self> {
        Ok(Self::new(raw.timeout, raw.interval)?.with_description(raw.description))
    }
}

impl Default for ConditionSpec {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            description: default_description(),
        }
    }
}

impl ConditionSpec {
    /// Create a validated condition spec
    pub fn new(timeout: Duration, interval: Duration) -> SondarResult<Self> {
        if interval.is_zero() {
            return Err(SondarError::InvalidCondition {
                message: "poll interval must be greater than zero".to_string(),
            });
        }
        if timeout < interval {
            return Err(SondarError::InvalidCondition {
                message: format!(
                    "timeout {}ms is shorter than poll interval {}ms",
                    timeout.as_millis(),
                    interval.as_millis()
                ),
            });
        }
        Ok(Self {
            timeout,
            interval,
            description: default_description(),
        })
    }

    /// Create a validated condition spec from milliseconds
    pub fn from_millis(timeout_ms: u64, interval_ms: u64) -> SondarResult<Self> {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
        )
    }

    /// Set the description used in timeout errors
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Total time budget
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pause between evaluations
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// What is being waited for
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Result of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of probe evaluations, including the successful one
    pub polls: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll `probe` until it yields a value or `spec`'s timeout elapses.
///
/// Returns the value together with how long it took. Fails with
/// [`SondarError::ConditionTimeout`] once elapsed time reaches the timeout.
pub async fn wait_for_value<T, F, Fut>(
    spec: &ConditionSpec,
    mut probe: F,
) -> SondarResult<(T, WaitOutcome)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SondarResult<Option<T>>>,
{
    let start = Instant::now();
    let mut polls = 0_u32;

    loop {
        polls += 1;
        match probe().await {
            Ok(Some(value)) => {
                let outcome = WaitOutcome {
                    elapsed: start.elapsed(),
                    polls,
                    waited_for: spec.description.clone(),
                };
                debug!(
                    waited_for = %spec.description,
                    polls,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "condition met"
                );
                return Ok((value, outcome));
            }
            Ok(None) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!(waited_for = %spec.description, poll = polls, error = %err, "probe failed, retrying");
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= spec.timeout {
            return Err(SondarError::ConditionTimeout {
                description: spec.description.clone(),
                timeout_ms: spec.timeout.as_millis() as u64,
                elapsed_ms: elapsed.as_millis() as u64,
                polls,
            });
        }
        tokio::time::sleep(spec.interval.min(spec.timeout - elapsed)).await;
    }
}

/// Poll a boolean predicate until it returns true.
pub async fn wait_until<F, Fut>(spec: &ConditionSpec, mut predicate: F) -> SondarResult<WaitOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SondarResult<bool>>,
{
    let ((), outcome) = wait_for_value(spec, || {
        let pending = predicate();
        async move { pending.await.map(|ready| ready.then_some(())) }
    })
    .await?;
    Ok(outcome)
}

/// Wait for a fixed duration (discouraged - use [`wait_until`] whenever a
/// concrete condition can be checked)
pub async fn pause(duration: Duration) {
    tokio::time::sleep(duration).await;
}
