//! Rate backend that derives usage from persisted generation records

use super::backend::{RateBackend, RateError, RatePolicy};
use crate::db::GenerationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Counts the identity's generation records inside the trailing window.
///
/// The stored record is the unit of usage, so `increment` writes nothing and
/// just re-reads the count.
#[derive(Clone)]
pub struct StoreRateBackend {
    store: Arc<dyn GenerationStore>,
}

impl StoreRateBackend {
    pub fn new(store: Arc<dyn GenerationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RateBackend for StoreRateBackend {
    async fn usage(
        &self,
        identity: &str,
        policy: &RatePolicy,
        now: DateTime<Utc>,
    ) -> Result<u32, RateError> {
        Ok(self.store.count_since(identity, now - policy.window).await?)
    }

    async fn increment(
        &self,
        identity: &str,
        policy: &RatePolicy,
        now: DateTime<Utc>,
    ) -> Result<u32, RateError> {
        self.usage(identity, policy, now).await
    }

    fn name(&self) -> &'static str {
        "database"
    }
}
