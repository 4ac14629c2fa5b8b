//! Circuit breaker for the live embedding backend.
//!
//! After `failure_threshold` consecutive failures the breaker opens and every live
//! attempt is refused until `reset_timeout` has passed. Exactly one call is then
//! let through as a trial (half-open); its outcome closes or re-opens the circuit.
//! A trial that never reports back is replaced after another `reset_timeout`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long an open circuit waits before allowing a trial call.
    #[serde(with = "crate::serde_millis")]
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    last_state_change: Instant,
    trial_in_flight: bool,
}

/// One breaker per backend instance; cheap to share behind `Arc`.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    failure_count: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                last_state_change: Instant::now(),
                trial_in_flight: false,
            }),
            failure_count: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock leaves plain data behind; keep going.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a live call may go out right now.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        let waited = inner.last_state_change.elapsed() >= self.config.reset_timeout;
        let state = inner.state;
        match state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen if inner.trial_in_flight && !waited => false,
            CircuitState::Open if !waited => false,
            CircuitState::HalfOpen | CircuitState::Open => {
                inner.state = CircuitState::HalfOpen;
                inner.last_state_change = Instant::now();
                inner.trial_in_flight = true;
                true
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        self.failure_count.store(0, Ordering::Relaxed);
        inner.trial_in_flight = false;
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.last_state_change = Instant::now();
        }
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut inner = self.lock();
        inner.trial_in_flight = false;
        let trip = match inner.state {
            CircuitState::Closed => failures >= u64::from(self.config.failure_threshold),
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trip {
            inner.state = CircuitState::Open;
            inner.last_state_change = Instant::now();
        }
    }

    pub fn current_state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures since the last success.
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }
}
