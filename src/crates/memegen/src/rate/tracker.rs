//! Admission decisions and usage recording

use super::backend::{RateBackend, RateError, RatePolicy};
use super::clock::{Clock, SystemClock};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Admission answer for one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateInfo {
    pub remaining: u32,
    pub limit: u32,
    pub is_blocked: bool,
    /// Present only when the backend failed and admission failed open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl RateInfo {
    /// Derive the answer from a usage count
    pub fn from_usage(used: u32, limit: u32) -> Self {
        Self {
            remaining: limit.saturating_sub(used),
            limit,
            is_blocked: used >= limit,
            diagnostic: None,
        }
    }

    fn fail_open(limit: u32, err: &RateError) -> Self {
        Self {
            remaining: limit,
            limit,
            is_blocked: false,
            diagnostic: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct IdentityGate {
    lock: Mutex<()>,
    in_flight: AtomicU32,
    /// Reservations in progress plus slots held; the gate is dropped at zero
    users: AtomicU32,
}

/// One counted use of a gate, released on drop
struct GateUse<'a> {
    tracker: &'a RateTracker,
    identity: &'a str,
    gate: Arc<IdentityGate>,
}

impl Drop for GateUse<'_> {
    fn drop(&mut self) {
        self.tracker.release_gate(self.identity, &self.gate);
    }
}

/// Tracks generations per identity against a [`RatePolicy`]
pub struct RateTracker {
    backend: Arc<dyn RateBackend>,
    policy: RatePolicy,
    clock: Arc<dyn Clock>,
    gates: DashMap<String, Arc<IdentityGate>>,
}

impl RateTracker {
    pub fn new(backend: Arc<dyn RateBackend>, policy: RatePolicy) -> Self {
        Self::with_clock(backend, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        backend: Arc<dyn RateBackend>,
        policy: RatePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            policy,
            clock,
            gates: DashMap::new(),
        }
    }

    /// Current admission answer for `identity`
    ///
    /// Read-only apart from dropping an expired window. A failing backend
    /// admits with a full quota and a `diagnostic`.
    pub async fn admit(&self, identity: &str) -> RateInfo {
        let in_flight = self
            .gates
            .get(identity)
            .map(|gate| gate.in_flight.load(Ordering::SeqCst))
            .unwrap_or(0);
        self.current(identity, in_flight).await
    }

    /// Count one completed generation for `identity`
    pub async fn record(&self, identity: &str) -> Result<RateInfo, RateError> {
        let used = self
            .backend
            .increment(identity, &self.policy, self.clock.now())
            .await?;
        tracing::debug!(identity, used, limit = self.policy.limit, "Recorded generation");
        Ok(RateInfo::from_usage(used, self.policy.limit))
    }

    /// Admit and hold a slot until the run commits or gives up
    ///
    /// Admission for one identity is serialized, and slots held by runs still
    /// in flight count against the limit. Returns the blocked answer when no
    /// slot is free.
    pub async fn reserve(self: &Arc<Self>, identity: &str) -> Result<RateSlot, RateInfo> {
        let gate_use = self.acquire_gate(identity);
        let gate = &gate_use.gate;

        let _guard = gate.lock.lock().await;
        let info = self
            .current(identity, gate.in_flight.load(Ordering::SeqCst))
            .await;
        if info.is_blocked {
            return Err(info);
        }
        gate.in_flight.fetch_add(1, Ordering::SeqCst);
        // the slot's own use; ours is still held so the count stays above zero
        gate.users.fetch_add(1, Ordering::SeqCst);

        Ok(RateSlot {
            tracker: Arc::clone(self),
            identity: identity.to_string(),
            gate: Arc::clone(gate),
        })
    }

    fn acquire_gate<'a>(&'a self, identity: &'a str) -> GateUse<'a> {
        let entry = self.gates.entry(identity.to_string()).or_default();
        // counted under the shard lock, so a concurrent release cannot see zero
        entry.users.fetch_add(1, Ordering::SeqCst);
        GateUse {
            tracker: self,
            identity,
            gate: Arc::clone(entry.value()),
        }
    }

    fn release_gate(&self, identity: &str, gate: &IdentityGate) {
        gate.users.fetch_sub(1, Ordering::SeqCst);
        self.gates
            .remove_if(identity, |_, g| g.users.load(Ordering::SeqCst) == 0);
    }

    async fn current(&self, identity: &str, in_flight: u32) -> RateInfo {
        let limit = self.policy.limit;
        match self
            .backend
            .usage(identity, &self.policy, self.clock.now())
            .await
        {
            Ok(used) => RateInfo::from_usage(used.saturating_add(in_flight), limit),
            Err(err) => {
                tracing::warn!(
                    identity,
                    backend = self.backend.name(),
                    error = %err,
                    "Rate backend unavailable, admitting"
                );
                RateInfo::fail_open(limit, &err)
            }
        }
    }
}

/// A reserved generation slot
///
/// Dropping the slot releases it without counting usage.
pub struct RateSlot {
    tracker: Arc<RateTracker>,
    identity: String,
    gate: Arc<IdentityGate>,
}

impl RateSlot {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Record the generation and release the slot
    pub async fn commit(self) -> Result<RateInfo, RateError> {
        self.tracker.record(&self.identity).await
    }
}

impl Drop for RateSlot {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.tracker.release_gate(&self.identity, &self.gate);
    }
}

impl std::fmt::Debug for RateSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateSlot")
            .field("identity", &self.identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::InMemoryRateBackend;
    use futures::FutureExt;

    fn tracker(limit: u32) -> Arc<RateTracker> {
        Arc::new(RateTracker::new(
            Arc::new(InMemoryRateBackend::new()),
            RatePolicy::new(limit, chrono::Duration::hours(24)),
        ))
    }

    #[test]
    fn test_rate_info_from_usage() {
        let info = RateInfo::from_usage(6, 6);
        assert!(info.is_blocked);
        assert_eq!(info.remaining, 0);

        let info = RateInfo::from_usage(9, 6);
        assert_eq!(info.remaining, 0);

        let info = RateInfo::from_usage(2, 6);
        assert!(!info.is_blocked);
        assert_eq!(info.remaining, 4);
    }

    #[test]
    fn test_rate_info_wire_shape() {
        let json = serde_json::to_value(RateInfo::from_usage(1, 6)).unwrap();
        assert_eq!(json, serde_json::json!({"remaining": 5, "limit": 6, "isBlocked": false}));
    }

    #[tokio::test]
    async fn test_admit_is_idempotent() {
        let tracker = tracker(6);
        let first = tracker.admit("a").await;
        let second = tracker.admit("a").await;
        assert_eq!(first, second);
        assert_eq!(first.remaining, 6);
    }

    #[tokio::test]
    async fn test_slot_counts_while_held() {
        let tracker = tracker(2);

        let slot = tracker.reserve("a").await.unwrap();
        assert_eq!(tracker.admit("a").await.remaining, 1);

        drop(slot);
        assert_eq!(tracker.admit("a").await.remaining, 2);
    }

    #[tokio::test]
    async fn test_commit_records_usage() {
        let tracker = tracker(2);

        let slot = tracker.reserve("a").await.unwrap();
        let info = slot.commit().await.unwrap();
        assert_eq!(info.remaining, 1);
        assert_eq!(tracker.admit("a").await.remaining, 1);
    }

    #[tokio::test]
    async fn test_reserve_blocked_at_limit() {
        let tracker = tracker(1);
        tracker.record("a").await.unwrap();

        let denied = tracker.reserve("a").await.unwrap_err();
        assert!(denied.is_blocked);
        assert_eq!(denied.limit, 1);
        assert_eq!(tracker.gates.len(), 0);
    }

    #[tokio::test]
    async fn test_released_gates_are_dropped() {
        let tracker = tracker(6);

        for n in 0..1000 {
            let slot = tracker.reserve(&format!("caller-{}", n)).await.unwrap();
            drop(slot);
        }
        assert_eq!(tracker.gates.len(), 0);

        let committed = tracker.reserve("a").await.unwrap();
        committed.commit().await.unwrap();
        assert_eq!(tracker.gates.len(), 0);
    }

    #[tokio::test]
    async fn test_gate_survives_while_any_slot_held() {
        let tracker = tracker(6);

        let first = tracker.reserve("a").await.unwrap();
        let second = tracker.reserve("a").await.unwrap();
        drop(first);
        assert_eq!(tracker.gates.len(), 1);
        assert_eq!(tracker.admit("a").await.remaining, 5);

        drop(second);
        assert_eq!(tracker.gates.len(), 0);
        assert_eq!(tracker.admit("a").await.remaining, 6);
    }

    #[tokio::test]
    async fn test_cancelled_reservation_releases_gate() {
        let tracker = tracker(6);

        let gate_use = tracker.acquire_gate("a");
        let guard = gate_use.gate.lock.lock().await;
        assert!(tracker.reserve("a").now_or_never().is_none());
        drop(guard);
        drop(gate_use);

        assert_eq!(tracker.gates.len(), 0);
    }
}
