//! In-memory window store.
//!
//! A single-process stand-in for the networked store, mainly used in tests.
//! Atomicity comes from holding the map entry for the whole batch, which
//! serializes batches per key the same way a store-side transaction does.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;

use super::{StoreCommand, StoreReply, WindowStore};

/// One window record: scored members plus an optional expiry deadline.
#[derive(Debug, Default)]
struct WindowEntry {
    /// Member -> score
    members: HashMap<String, i64>,
    /// Deadline after which the record reads as empty
    expires_at: Option<Instant>,
}

impl WindowEntry {
    /// Expiry is lazy: a record past its deadline is cleared on next access.
    fn purge_if_expired(&mut self) {
        if let Some(deadline) = self.expires_at {
            if Instant::now() >= deadline {
                self.members.clear();
                self.expires_at = None;
            }
        }
    }

    fn sorted_members(&self) -> Vec<String> {
        let mut pairs: Vec<(i64, &String)> = self
            .members
            .iter()
            .map(|(member, score)| (*score, member))
            .collect();
        pairs.sort();
        pairs.into_iter().map(|(_, member)| member.clone()).collect()
    }
}

/// A [`WindowStore`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
    windows: DashMap<String, WindowEntry>,
}

impl MemoryWindowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of window records currently held, expired or not.
    pub fn record_count(&self) -> usize {
        self.windows.len()
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn atomic_batch(&self, key: &str, commands: &[StoreCommand]) -> Result<Vec<StoreReply>> {
        let mut entry = self.windows.entry(key.to_string()).or_default();
        entry.purge_if_expired();

        let replies = commands
            .iter()
            .map(|command| match command {
                StoreCommand::RemoveRangeByScore { min, max } => {
                    let before = entry.members.len();
                    entry.members.retain(|_, score| *score < *min || *score > *max);
                    StoreReply::Removed((before - entry.members.len()) as u64)
                }
                StoreCommand::RangeAll => StoreReply::Members(entry.sorted_members()),
                StoreCommand::Add { score, member } => {
                    entry.members.insert(member.clone(), *score);
                    StoreReply::Added
                }
                StoreCommand::SetExpiry { seconds } => {
                    entry.expires_at = Some(Instant::now() + Duration::from_secs(*seconds));
                    StoreReply::ExpirySet
                }
            })
            .collect();

        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_range_all_orders_by_score() {
        let store = MemoryWindowStore::new();

        store.add("w", 30, "c").await.unwrap();
        store.add("w", 10, "a").await.unwrap();
        store.add("w", 20, "b").await.unwrap();

        let members = store.range_all("w").await.unwrap();
        assert_eq!(members, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_add_replaces_existing_member_score() {
        let store = MemoryWindowStore::new();

        store.add("w", 10, "a").await.unwrap();
        store.add("w", 40, "a").await.unwrap();
        store.add("w", 20, "b").await.unwrap();

        let members = store.range_all("w").await.unwrap();
        assert_eq!(members, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_remove_range_bounds_are_inclusive() {
        let store = MemoryWindowStore::new();

        store.add("w", 10, "a").await.unwrap();
        store.add("w", 20, "b").await.unwrap();
        store.add("w", 30, "c").await.unwrap();

        let removed = store.remove_range_by_score("w", 10, 20).await.unwrap();
        assert_eq!(removed, 2);

        let members = store.range_all("w").await.unwrap();
        assert_eq!(members, vec!["c"]);
    }

    #[tokio::test]
    async fn test_batch_range_sees_prune_but_not_later_add() {
        let store = MemoryWindowStore::new();

        store.add("w", 10, "stale").await.unwrap();
        store.add("w", 50, "live").await.unwrap();

        let replies = store
            .atomic_batch(
                "w",
                &[
                    StoreCommand::RemoveRangeByScore { min: 0, max: 20 },
                    StoreCommand::RangeAll,
                    StoreCommand::Add {
                        score: 60,
                        member: "new".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(replies[0], StoreReply::Removed(1));
        assert_eq!(replies[1], StoreReply::Members(vec!["live".to_string()]));
        assert_eq!(replies[2], StoreReply::Added);

        // The add is visible to the next read.
        let members = store.range_all("w").await.unwrap();
        assert_eq!(members, vec!["live", "new"]);
    }

    #[tokio::test]
    async fn test_expired_record_reads_empty() {
        let store = MemoryWindowStore::new();

        store.add("w", 10, "a").await.unwrap();
        store.set_expiry("w", 1).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let members = store.range_all("w").await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryWindowStore::new();

        store.add("w1", 10, "a").await.unwrap();
        store.add("w2", 20, "b").await.unwrap();

        assert_eq!(store.range_all("w1").await.unwrap(), vec!["a"]);
        assert_eq!(store.range_all("w2").await.unwrap(), vec!["b"]);
        assert_eq!(store.record_count(), 2);
    }
}
