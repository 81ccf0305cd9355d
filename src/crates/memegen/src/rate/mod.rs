//! Per-identity generation quota
//!
//! A [`RateTracker`] answers "may this identity start another generation"
//! against a rolling window, backed by a pluggable [`RateBackend`]. The
//! pipeline admits through [`RateTracker::reserve`], which counts runs
//! already in flight so concurrent requests cannot overshoot the limit.

pub mod backend;
pub mod clock;
pub mod store_backend;
pub mod tracker;

pub use backend::{InMemoryRateBackend, RateBackend, RateError, RatePolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use store_backend::StoreRateBackend;
pub use tracker::{RateInfo, RateSlot, RateTracker};
