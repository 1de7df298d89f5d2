//! Advisory circuit breaker for retryable async operations.
//!
//! The breaker never refuses to run the wrapped operation: a failed deck
//! load must stay retryable by user action, so tripping only changes the
//! observable state and log output. Callers that want backoff read
//! [`CircuitBreaker::state`] and decide for themselves.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use study_core::Clock;

use crate::error::BreakerConfigError;

/// Failures before a closed breaker trips.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 8;
/// Time an open breaker waits before allowing a probe.
pub const DEFAULT_RESET_TIMEOUT_MS: i64 = 3_000;
/// Consecutive successes required to close a half-open breaker.
pub const DEFAULT_HALF_OPEN_SUCCESSES: u32 = 3;

//
// ─── STATE & CONFIG ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation.
    Closed,
    /// Tripped; operations still run but are flagged.
    Open,
    /// Probation after the reset timeout elapsed.
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_successes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: Duration::milliseconds(DEFAULT_RESET_TIMEOUT_MS),
            half_open_successes: DEFAULT_HALF_OPEN_SUCCESSES,
        }
    }
}

impl BreakerConfig {
    /// Creates a custom breaker configuration.
    ///
    /// # Errors
    ///
    /// Returns `BreakerConfigError` if any parameter is zero or non-positive.
    pub fn new(
        failure_threshold: u32,
        reset_timeout: Duration,
        half_open_successes: u32,
    ) -> Result<Self, BreakerConfigError> {
        if failure_threshold == 0 {
            return Err(BreakerConfigError::InvalidFailureThreshold);
        }
        if reset_timeout <= Duration::zero() {
            return Err(BreakerConfigError::InvalidResetTimeout);
        }
        if half_open_successes == 0 {
            return Err(BreakerConfigError::InvalidHalfOpenSuccesses);
        }

        Ok(Self {
            failure_threshold,
            reset_timeout,
            half_open_successes,
        })
    }

    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    #[must_use]
    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    #[must_use]
    pub fn half_open_successes(&self) -> u32 {
        self.half_open_successes
    }
}

//
// ─── BREAKER ───────────────────────────────────────────────────────────────────
//

/// Per-operation failure bookkeeping.
///
/// State transitions: `Closed → Open` once the failure threshold is crossed,
/// `Open → HalfOpen` when the reset timeout elapses before the next attempt,
/// `HalfOpen → Closed` after enough consecutive successes, `HalfOpen → Open`
/// on any failure.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    clock: Clock,
    state: BreakerState,
    failure_count: u32,
    half_open_successes: u32,
    opened_at: Option<DateTime<Utc>>,
    last_failure_at: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: BreakerConfig, clock: Clock) -> Self {
        Self {
            config,
            clock,
            state: BreakerState::Closed,
            failure_count: 0,
            half_open_successes: 0,
            opened_at: None,
            last_failure_at: None,
        }
    }

    /// Called before each attempt; applies the `Open → HalfOpen` probe
    /// transition when the reset timeout has elapsed. Returns the state the
    /// attempt runs under.
    pub fn begin_attempt(&mut self) -> BreakerState {
        if self.state == BreakerState::Open
            && let Some(opened_at) = self.opened_at
            && self.clock.elapsed_since(opened_at) >= self.config.reset_timeout
        {
            self.state = BreakerState::HalfOpen;
            self.half_open_successes = 0;
            debug!("circuit breaker entering probation");
        }
        self.state
    }

    /// Record a successful attempt.
    pub fn record_success(&mut self) {
        match self.state {
            BreakerState::HalfOpen => {
                self.half_open_successes += 1;
                if self.half_open_successes >= self.config.half_open_successes {
                    debug!(
                        successes = self.half_open_successes,
                        "circuit breaker closing after probation"
                    );
                    self.reset();
                }
            }
            // Successes chip away at the accumulated failure count.
            BreakerState::Closed | BreakerState::Open => {
                self.failure_count = self.failure_count.saturating_sub(1);
            }
        }
    }

    /// Record a failed attempt.
    pub fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_at = Some(self.clock.now());

        match self.state {
            BreakerState::HalfOpen => self.trip(),
            BreakerState::Closed if self.failure_count >= self.config.failure_threshold => {
                self.trip();
            }
            _ => {}
        }
    }

    fn trip(&mut self) {
        self.state = BreakerState::Open;
        self.opened_at = Some(self.clock.now());
        self.half_open_successes = 0;
        warn!(
            failures = self.failure_count,
            "circuit breaker tripped open"
        );
    }

    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.state
    }

    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    #[must_use]
    pub fn last_failure_at(&self) -> Option<DateTime<Utc>> {
        self.last_failure_at
    }

    /// Force the breaker back to `Closed` with zeroed counters.
    pub fn reset(&mut self) {
        self.state = BreakerState::Closed;
        self.failure_count = 0;
        self.half_open_successes = 0;
        self.opened_at = None;
        self.last_failure_at = None;
    }

    /// Emergency recovery: same effect as [`reset`](Self::reset), logged so
    /// operators can tell the two apart.
    pub fn force_bypass(&mut self) {
        warn!("circuit breaker force-bypassed");
        self.reset();
    }
}

//
// ─── REGISTRY ──────────────────────────────────────────────────────────────────
//

/// One breaker per operation key, created on first use.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    config: BreakerConfig,
    clock: Clock,
    breakers: Mutex<HashMap<String, Arc<Mutex<CircuitBreaker>>>>,
}

impl BreakerRegistry {
    #[must_use]
    pub fn new(config: BreakerConfig, clock: Clock) -> Self {
        Self {
            config,
            clock,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch (or create) the breaker owning the given key.
    #[must_use]
    pub fn breaker(&self, key: &str) -> Arc<Mutex<CircuitBreaker>> {
        let mut breakers = self
            .breakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(breakers.entry(key.to_owned()).or_insert_with(|| {
            Arc::new(Mutex::new(CircuitBreaker::new(self.config, self.clock)))
        }))
    }

    /// Current state of the breaker for `key`, if one exists yet.
    #[must_use]
    pub fn state(&self, key: &str) -> Option<BreakerState> {
        let breakers = self
            .breakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        breakers.get(key).map(|b| {
            b.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .state()
        })
    }

    /// Run `op` under the breaker for `key`.
    ///
    /// The operation is ALWAYS invoked, whatever the breaker state; the
    /// breaker only observes the outcome. The operation's own error
    /// propagates to the caller untouched.
    pub async fn execute<F, Fut, T, E>(&self, key: &str, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let breaker = self.breaker(key);
        {
            let mut guard = breaker.lock().unwrap_or_else(PoisonError::into_inner);
            let state = guard.begin_attempt();
            if state != BreakerState::Closed {
                debug!(key, ?state, "attempt running under tripped breaker");
            }
        }

        // Lock released across the await; the outcome is recorded after.
        let result = op().await;

        let mut guard = breaker.lock().unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(_) => guard.record_success(),
            Err(_) => guard.record_failure(),
        }
        result
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::time::fixed_clock;

    fn small_config() -> BreakerConfig {
        BreakerConfig::new(3, Duration::milliseconds(1_000), 2).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = BreakerConfig::default();
        assert_eq!(config.failure_threshold(), 8);
        assert_eq!(config.reset_timeout(), Duration::milliseconds(3_000));
        assert_eq!(config.half_open_successes(), 3);
    }

    #[test]
    fn config_rejects_zero_threshold() {
        let err = BreakerConfig::new(0, Duration::milliseconds(1), 1).unwrap_err();
        assert_eq!(err, BreakerConfigError::InvalidFailureThreshold);
    }

    #[test]
    fn trips_at_failure_threshold() {
        let mut breaker = CircuitBreaker::new(small_config(), fixed_clock());

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(breaker.failure_count(), 3);
    }

    #[test]
    fn success_decrements_failure_count_when_closed() {
        let mut breaker = CircuitBreaker::new(small_config(), fixed_clock());

        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        // 2 - 1 + 1 = 2, still under the threshold of 3
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.failure_count(), 2);
    }

    #[test]
    fn open_enters_probation_after_reset_timeout() {
        let mut breaker = CircuitBreaker::new(small_config(), fixed_clock());
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.begin_attempt(), BreakerState::Open);

        breaker.clock.advance(Duration::milliseconds(1_000));
        assert_eq!(breaker.begin_attempt(), BreakerState::HalfOpen);
    }

    #[test]
    fn half_open_closes_after_enough_successes() {
        let mut breaker = CircuitBreaker::new(small_config(), fixed_clock());
        for _ in 0..3 {
            breaker.record_failure();
        }
        breaker.clock.advance(Duration::milliseconds(1_500));
        breaker.begin_attempt();

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn half_open_failure_reopens() {
        let mut breaker = CircuitBreaker::new(small_config(), fixed_clock());
        for _ in 0..3 {
            breaker.record_failure();
        }
        breaker.clock.advance(Duration::milliseconds(1_500));
        breaker.begin_attempt();

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);

        // The reopen restarts the reset timeout from the new trip instant.
        assert_eq!(breaker.begin_attempt(), BreakerState::Open);
        breaker.clock.advance(Duration::milliseconds(1_000));
        assert_eq!(breaker.begin_attempt(), BreakerState::HalfOpen);
    }

    #[test]
    fn reset_and_force_bypass_close_the_breaker() {
        let mut breaker = CircuitBreaker::new(small_config(), fixed_clock());
        for _ in 0..3 {
            breaker.record_failure();
        }
        breaker.reset();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.failure_count(), 0);

        for _ in 0..3 {
            breaker.record_failure();
        }
        breaker.force_bypass();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.last_failure_at(), None);
    }

    #[tokio::test]
    async fn execute_always_invokes_even_when_open() {
        let registry = BreakerRegistry::new(small_config(), fixed_clock());
        let mut calls = 0_u32;

        for _ in 0..5 {
            let result: Result<(), &str> = registry
                .execute("load", || {
                    calls += 1;
                    async { Err("boom") }
                })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(calls, 5);
        assert_eq!(registry.state("load"), Some(BreakerState::Open));
    }

    #[tokio::test]
    async fn execute_propagates_success_value() {
        let registry = BreakerRegistry::new(small_config(), fixed_clock());

        let result: Result<u32, &str> = registry.execute("ok", || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(registry.state("ok"), Some(BreakerState::Closed));
    }

    #[tokio::test]
    async fn registry_isolates_keys_and_reuses_instances() {
        let registry = BreakerRegistry::new(small_config(), fixed_clock());

        for _ in 0..3 {
            let _: Result<(), &str> = registry.execute("bad", || async { Err("x") }).await;
        }
        let _: Result<(), &str> = registry.execute("good", || async { Ok(()) }).await;

        assert_eq!(registry.state("bad"), Some(BreakerState::Open));
        assert_eq!(registry.state("good"), Some(BreakerState::Closed));
        assert_eq!(registry.state("never-used"), None);

        // Same key resolves to the same breaker instance.
        let a = registry.breaker("bad");
        let b = registry.breaker("bad");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
