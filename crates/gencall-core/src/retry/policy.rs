use std::fmt;
use std::time::Duration;

/// Closed classification of a failed attempt.
///
/// Every transport failure maps to exactly one kind (see `classify`); the
/// retry decision is made from the kind alone, never from the raw error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport-level failure: connection refused, DNS, timeout.
    Network,
    /// Service throttling (HTTP 429).
    RateLimited,
    /// The request itself is at fault (4xx other than 429). Never retried.
    Client,
    /// Service-side fault (5xx or an unusable response).
    Server,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network error",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::Client => "client error",
            ErrorKind::Server => "server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop here and surface (or defer) the failure.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Wait schedule between attempts.
///
/// Throttling and server faults back off exponentially, network failures wait
/// one fixed unit. A server-supplied `retry-after` replaces the computed value
/// for that wait only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// One time unit; `2^attempt` units for exponential waits.
    pub unit: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Largest exponent applied; beyond this the delay stops growing.
    const MAX_EXPONENT: u32 = 30;

    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    /// Wait to apply after a failed attempt `attempt_index` (0-based).
    pub fn delay(
        &self,
        attempt_index: u32,
        kind: ErrorKind,
        retry_after: Option<Duration>,
    ) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }
        match kind {
            ErrorKind::Network => self.unit,
            ErrorKind::RateLimited | ErrorKind::Server => {
                let exp = 1u32 << attempt_index.min(Self::MAX_EXPONENT);
                self.unit.saturating_mul(exp)
            }
            ErrorKind::Client => Duration::ZERO,
        }
    }
}

/// Attempt budget plus backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request; 0 is treated as 1.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Attempts actually made for one request.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Decide what follows a failed attempt `attempt_index` (0-based).
    pub fn decide(
        &self,
        attempt_index: u32,
        kind: ErrorKind,
        retry_after: Option<Duration>,
    ) -> RetryDecision {
        if kind == ErrorKind::Client {
            return RetryDecision::NoRetry;
        }
        if attempt_index.saturating_add(1) >= self.attempts() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff.delay(attempt_index, kind, retry_after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn exponential_for_rate_limit_and_server() {
        let b = Backoff::default();
        for kind in [ErrorKind::RateLimited, ErrorKind::Server] {
            assert_eq!(b.delay(0, kind, None), secs(1));
            assert_eq!(b.delay(1, kind, None), secs(2));
            assert_eq!(b.delay(2, kind, None), secs(4));
            assert_eq!(b.delay(5, kind, None), secs(32));
        }
    }

    #[test]
    fn network_wait_is_constant() {
        let b = Backoff::default();
        assert_eq!(b.delay(0, ErrorKind::Network, None), secs(1));
        assert_eq!(b.delay(7, ErrorKind::Network, None), secs(1));
    }

    #[test]
    fn retry_after_overrides_computed_delay() {
        let b = Backoff::default();
        assert_eq!(b.delay(3, ErrorKind::RateLimited, Some(secs(5))), secs(5));
        assert_eq!(
            b.delay(0, ErrorKind::Server, Some(Duration::ZERO)),
            Duration::ZERO
        );
    }

    #[test]
    fn huge_attempt_index_saturates() {
        let b = Backoff::new(Duration::from_millis(1));
        let d = b.delay(u32::MAX, ErrorKind::Server, None);
        assert_eq!(d, Duration::from_millis(1 << 30));
    }

    #[test]
    fn client_error_never_retried() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(0, ErrorKind::Client, None), RetryDecision::NoRetry);
    }

    #[test]
    fn respects_attempt_budget() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.decide(0, ErrorKind::RateLimited, None),
            RetryDecision::RetryAfter(secs(1))
        );
        assert_eq!(
            p.decide(1, ErrorKind::RateLimited, None),
            RetryDecision::RetryAfter(secs(2))
        );
        assert_eq!(p.decide(2, ErrorKind::RateLimited, None), RetryDecision::NoRetry);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let p = RetryPolicy::new(0, Backoff::default());
        assert_eq!(p.attempts(), 1);
        assert_eq!(p.decide(0, ErrorKind::Network, None), RetryDecision::NoRetry);
    }
}
