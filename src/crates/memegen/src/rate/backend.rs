//! Rate state backends

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Default number of generations per window
pub const DEFAULT_LIMIT: u32 = 6;

/// Increments between sweeps of expired in-memory windows
const SWEEP_EVERY: u64 = 256;

/// Rate tracking errors
#[derive(Debug, Error)]
pub enum RateError {
    /// The backing store could not be queried or updated
    #[error("Rate backend error: {0}")]
    Backend(String),
}

impl From<crate::db::DatabaseError> for RateError {
    fn from(err: crate::db::DatabaseError) -> Self {
        RateError::Backend(err.to_string())
    }
}

/// Limit and window applied to every identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub limit: u32,
    pub window: Duration,
}

impl RatePolicy {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    /// Build a policy from a window given in whole seconds
    pub fn from_secs(limit: u32, window_secs: u64) -> Self {
        let secs = i64::try_from(window_secs).unwrap_or(i64::MAX / 1000);
        Self::new(limit, Duration::seconds(secs))
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, Duration::hours(24))
    }
}

/// Storage of per-identity usage counts
#[async_trait]
pub trait RateBackend: Send + Sync {
    /// Generations recorded for `identity` in the window ending at `now`
    async fn usage(&self, identity: &str, policy: &RatePolicy, now: DateTime<Utc>)
        -> Result<u32, RateError>;

    /// Count one more generation and return the new usage
    async fn increment(
        &self,
        identity: &str,
        policy: &RatePolicy,
        now: DateTime<Utc>,
    ) -> Result<u32, RateError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
struct RateState {
    count: u32,
    window_start: DateTime<Utc>,
}

impl RateState {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, policy: &RatePolicy, now: DateTime<Utc>) -> bool {
        now - self.window_start > policy.window
    }
}

/// In-process usage table
///
/// Each identity gets a fixed window starting at its first recorded
/// generation; the count resets once the window has fully elapsed.
///
/// Expired windows are swept every [`SWEEP_EVERY`] increments, so identities
/// that never return do not stay in the table.
#[derive(Debug, Default)]
pub struct InMemoryRateBackend {
    states: DashMap<String, RateState>,
    increments: AtomicU64,
}

impl InMemoryRateBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_expired(&self, policy: &RatePolicy, now: DateTime<Utc>) {
        let before = self.states.len();
        self.states.retain(|_, state| !state.is_expired(policy, now));
        tracing::debug!(
            removed = before.saturating_sub(self.states.len()),
            tracked = self.states.len(),
            "Swept expired rate windows"
        );
    }
}

#[async_trait]
impl RateBackend for InMemoryRateBackend {
    async fn usage(
        &self,
        identity: &str,
        policy: &RatePolicy,
        now: DateTime<Utc>,
    ) -> Result<u32, RateError> {
        self.states
            .remove_if(identity, |_, state| state.is_expired(policy, now));
        Ok(self.states.get(identity).map(|s| s.count).unwrap_or(0))
    }

    async fn increment(
        &self,
        identity: &str,
        policy: &RatePolicy,
        now: DateTime<Utc>,
    ) -> Result<u32, RateError> {
        if self.increments.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep_expired(policy, now);
        }

        let mut state = self
            .states
            .entry(identity.to_string())
            .or_insert_with(|| RateState::fresh(now));
        if state.is_expired(policy, now) {
            *state = RateState::fresh(now);
        }
        state.count += 1;
        Ok(state.count)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
