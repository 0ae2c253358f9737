//! Retry loop: attempt until success, a non-retryable kind, or the budget runs out.

use std::time::Duration;

use super::classify;
use super::error::TransportError;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use super::sleep::Sleeper;
use crate::observe::AttemptObserver;

/// Tagged outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(ErrorKind),
}

/// One try within a retry loop; handed to the observer and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 0-based attempt index.
    pub index: u32,
    /// Total attempts the policy allows.
    pub budget: u32,
    pub outcome: AttemptOutcome,
    /// HTTP status, when the service answered.
    pub status: Option<u32>,
    /// Wait applied before the next attempt; `None` when this was the last.
    pub wait: Option<Duration>,
}

/// Terminal failure of a retry loop.
#[derive(Debug)]
pub struct RetryFailure {
    pub kind: ErrorKind,
    /// Attempts made, including the failing one.
    pub attempts: u32,
    /// Error from the last attempt.
    pub error: TransportError,
}

impl RetryFailure {
    /// Server-supplied hint carried by the last attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        self.error.retry_after()
    }
}

/// Result of a whole retry loop.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    Failure(RetryFailure),
}

/// Runs `f` until it succeeds or the policy says to stop.
///
/// Each failure is classified, reported to `observer` together with the wait
/// chosen for it, and then slept on through `sleeper`.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    observer: &dyn AttemptObserver,
    mut f: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Result<T, TransportError>,
{
    let budget = policy.attempts();
    let mut index = 0u32;
    loop {
        match f() {
            Ok(value) => {
                observer.attempt(&AttemptRecord {
                    index,
                    budget,
                    outcome: AttemptOutcome::Success,
                    status: None,
                    wait: None,
                });
                return RetryOutcome::Success {
                    value,
                    attempts: index + 1,
                };
            }
            Err(error) => {
                let kind = classify::classify(&error);
                let decision = policy.decide(index, kind, error.retry_after());
                let wait = match decision {
                    RetryDecision::RetryAfter(d) => Some(d),
                    RetryDecision::NoRetry => None,
                };
                observer.attempt(&AttemptRecord {
                    index,
                    budget,
                    outcome: AttemptOutcome::Failure(kind),
                    status: error.status(),
                    wait,
                });
                match decision {
                    RetryDecision::NoRetry => {
                        return RetryOutcome::Failure(RetryFailure {
                            kind,
                            attempts: index + 1,
                            error,
                        })
                    }
                    RetryDecision::RetryAfter(d) => {
                        sleeper.sleep(d);
                        index += 1;
                    }
                }
            }
        }
    }
}
