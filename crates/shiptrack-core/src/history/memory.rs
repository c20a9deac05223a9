// # Memory History Store
//
// In-memory implementation of HistoryStore.
//
// ## Purpose
//
// Backs the freshness-window cache in single-process deployments and keeps
// tests hermetic. Nothing persists across restarts.
//
// ## Crash Behavior
//
// - All history is lost on restart/crash
// - First lookup after a restart always invokes the resolver
//
// ## When to Use
//
// - Testing environments
// - The bundled CLI, where history only needs to outlive one invocation

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::TrackingInfo;
use crate::traits::{HistoryEntry, HistoryStore};
use async_trait::async_trait;

/// Key: (user id or None for anonymous, uppercase tracking number)
type HistoryKey = (Option<String>, String);

/// In-memory history store
///
/// Entries are stored append-only per (user, tracking number); `latest`
/// returns the newest append.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    inner: Arc<RwLock<HashMap<HistoryKey, Vec<HistoryEntry>>>>,
}

impl MemoryHistoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored entries
    pub async fn len(&self) -> usize {
        self.inner.read().await.values().map(Vec::len).sum()
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, user_id: Option<&str>, info: &TrackingInfo) -> crate::Result<()> {
        let key = (
            user_id.map(str::to_string),
            info.tracking_number.clone(),
        );

        let mut guard = self.inner.write().await;
        guard.entry(key).or_default().push(HistoryEntry::new(info.clone()));
        Ok(())
    }

    async fn latest(
        &self,
        user_id: Option<&str>,
        tracking_number: &str,
    ) -> crate::Result<Option<HistoryEntry>> {
        let key = (
            user_id.map(str::to_string),
            tracking_number.to_uppercase(),
        );

        let guard = self.inner.read().await;
        Ok(guard.get(&key).and_then(|entries| entries.last().cloned()))
    }

    async fn list(&self, user_id: Option<&str>) -> crate::Result<Vec<HistoryEntry>> {
        let guard = self.inner.read().await;

        let mut entries: Vec<HistoryEntry> = guard
            .iter()
            .filter(|((user, _), _)| user.as_deref() == user_id)
            .flat_map(|(_, entries)| entries.iter().cloned())
            .collect();

        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CarrierId, TrackingStatus};

    fn record(number: &str, status: TrackingStatus) -> TrackingInfo {
        let mut info = TrackingInfo::unavailable(number, CarrierId::Ups);
        info.status = status;
        info
    }

    #[tokio::test]
    async fn test_append_and_latest() {
        let store = MemoryHistoryStore::new();
        assert!(store.is_empty().await);

        store
            .append(Some("alice"), &record("1Z999AA1234567890", TrackingStatus::InTransit))
            .await
            .unwrap();
        store
            .append(Some("alice"), &record("1Z999AA1234567890", TrackingStatus::Delivered))
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);

        let latest = store
            .latest(Some("alice"), "1Z999AA1234567890")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.info.status, TrackingStatus::Delivered);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = MemoryHistoryStore::new();

        store
            .append(Some("alice"), &record("1Z999AA1234567890", TrackingStatus::InTransit))
            .await
            .unwrap();

        assert!(store
            .latest(Some("bob"), "1Z999AA1234567890")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .latest(None, "1Z999AA1234567890")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_latest_normalizes_lookup_key() {
        let store = MemoryHistoryStore::new();

        store
            .append(None, &record("1Z999AA1234567890", TrackingStatus::InTransit))
            .await
            .unwrap();

        // Stored records carry uppercase-normalized numbers; lookups accept
        // whatever case the caller has in hand
        assert!(store
            .latest(None, "1z999aa1234567890")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let store = MemoryHistoryStore::new();

        store
            .append(Some("alice"), &record("1Z999AA1234567890", TrackingStatus::InTransit))
            .await
            .unwrap();
        store
            .append(Some("alice"), &record("1Z111BB1234567890", TrackingStatus::Pending))
            .await
            .unwrap();

        let entries = store.list(Some("alice")).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].recorded_at >= entries[1].recorded_at);
    }
}
