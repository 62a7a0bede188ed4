//! Circuit breaker guarding calls to external collaborators.
//!
//! Unlike breakers that track an accumulating failure score, this one counts
//! consecutive failures: once the threshold is reached the circuit opens for a
//! fixed cooldown and every call during that window short-circuits straight to
//! the deterministic fallback. One success closes it again.
//!
//! The state transitions are pure functions over [`BreakerState`]; the
//! [`CircuitBreaker`] wrapper adds interior mutability and a [`Clock`] so the
//! cooldown is testable without sleeping.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::clock::Clock;

/// Configuration for one circuit breaker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures required to open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open once tripped.
    pub cooldown_seconds: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_seconds: 60,
        }
    }
}

impl BreakerConfig {
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Snapshot of breaker state. Transitions are pure; callers supply `now`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreakerState {
    /// Consecutive failures since the last success.
    pub failure_count: u32,
    /// When set and in the future, the circuit is open.
    pub open_until: Option<Instant>,
}

impl BreakerState {
    /// Whether calls should be short-circuited at `now`.
    #[must_use]
    pub fn is_open(&self, now: Instant) -> bool {
        self.open_until.is_some_and(|until| now < until)
    }

    /// Record a failure, opening the circuit once the threshold is reached.
    ///
    /// A failure after the cooldown has lapsed re-opens immediately: the
    /// count is already at or above the threshold.
    #[must_use]
    pub fn on_failure(self, now: Instant, config: &BreakerConfig) -> Self {
        let failure_count = self.failure_count.saturating_add(1);
        let open_until = if failure_count >= config.failure_threshold {
            Some(now + config.cooldown())
        } else {
            self.open_until
        };
        Self {
            failure_count,
            open_until,
        }
    }

    /// Record a success, resetting the breaker entirely.
    #[must_use]
    pub fn on_success(self) -> Self {
        Self::default()
    }
}

/// Thread-safe breaker around the pure [`BreakerState`] transitions.
pub struct CircuitBreaker {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<BreakerState>,
    /// Name used in log lines, e.g. "classifier".
    name: &'static str,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(BreakerState::default()),
            name,
        }
    }

    /// Whether calls should currently be short-circuited.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().is_open(self.clock.now())
    }

    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let was_open = state.is_open(now);
        *state = state.on_failure(now, &self.config);
        if !was_open && state.is_open(now) {
            warn!(
                breaker = self.name,
                failures = state.failure_count,
                cooldown_seconds = self.config.cooldown_seconds,
                "circuit opened"
            );
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = state.on_success();
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.lock()
    }

    fn lock(&self) -> BreakerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.lock())
            .finish()
    }
}
