// # History Store Trait
//
// Defines the interface to the tracking-history persistence collaborator.
//
// The core treats history as an opaque append/query store keyed by
// (user, tracking number). The caching layer upstream of the resolver uses
// `latest()` plus a fixed freshness window to decide whether to invoke the
// resolver at all; that freshness policy lives with the caller, not here.

use crate::model::TrackingInfo;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// One stored history record
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// The normalized tracking record at the time of lookup
    pub info: TrackingInfo,
    /// When the record was stored
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time
    pub fn new(info: TrackingInfo) -> Self {
        Self {
            info,
            recorded_at: Utc::now(),
        }
    }

    /// Whether this entry was recorded within the given window
    pub fn is_fresh(&self, window: Duration) -> bool {
        Utc::now() - self.recorded_at < window
    }
}

/// Trait for tracking-history persistence
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a resolved tracking record
    ///
    /// `user_id` is `None` for anonymous lookups.
    async fn append(&self, user_id: Option<&str>, info: &TrackingInfo) -> crate::Result<()>;

    /// The most recent stored record for (user, tracking number)
    async fn latest(
        &self,
        user_id: Option<&str>,
        tracking_number: &str,
    ) -> crate::Result<Option<HistoryEntry>>;

    /// All stored records for a user, most recent first
    async fn list(&self, user_id: Option<&str>) -> crate::Result<Vec<HistoryEntry>>;
}
