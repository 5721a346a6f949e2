//! Window storage abstraction.
//!
//! The limiter keeps all shared state in an ordered-set store reachable by
//! every process enforcing the same limit. This module defines the minimal
//! capability the algorithm needs from such a store, so any product with
//! sorted-set plus atomic-batch semantics can back it, and an in-memory
//! implementation can swap in for tests.

use async_trait::async_trait;

use crate::error::{FloodgateError, Result};

mod memory;
mod redis;

pub use self::memory::MemoryWindowStore;
pub use self::redis::RedisWindowStore;

/// A single operation against one window record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Remove all members with score in `[min, max]`, inclusive.
    RemoveRangeByScore { min: i64, max: i64 },
    /// Read all members, ascending by score.
    RangeAll,
    /// Insert a scored member, replacing the score if the member exists.
    Add { score: i64, member: String },
    /// Set or refresh the record's time-to-live.
    SetExpiry { seconds: u64 },
}

/// The result of one [`StoreCommand`], in command order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreReply {
    /// Number of members removed by `RemoveRangeByScore`.
    Removed(u64),
    /// Members read by `RangeAll`, ascending by score.
    Members(Vec<String>),
    /// Acknowledgement of `Add`.
    Added,
    /// Acknowledgement of `SetExpiry`.
    ExpirySet,
}

/// Storage capability required by the rate limiter.
///
/// Implementations must execute [`atomic_batch`](Self::atomic_batch) as one
/// indivisible unit per key: no operation from another caller may interleave
/// between the commands of a batch, and a `RangeAll` must observe the effect
/// of a preceding `RemoveRangeByScore` in the same batch but not of an `Add`
/// issued later in it.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Execute all commands against `key` as one indivisible unit and
    /// return their replies in order.
    async fn atomic_batch(&self, key: &str, commands: &[StoreCommand]) -> Result<Vec<StoreReply>>;

    /// Remove all members of `key` with score in `[min, max]`, inclusive.
    async fn remove_range_by_score(&self, key: &str, min: i64, max: i64) -> Result<u64> {
        let replies = self
            .atomic_batch(key, &[StoreCommand::RemoveRangeByScore { min, max }])
            .await?;
        match replies.first() {
            Some(StoreReply::Removed(count)) => Ok(*count),
            other => Err(unexpected_reply(key, other)),
        }
    }

    /// Read all members of `key`, ascending by score.
    async fn range_all(&self, key: &str) -> Result<Vec<String>> {
        let mut replies = self.atomic_batch(key, &[StoreCommand::RangeAll]).await?;
        match replies.pop() {
            Some(StoreReply::Members(members)) if replies.is_empty() => Ok(members),
            other => Err(unexpected_reply(key, other.as_ref())),
        }
    }

    /// Insert a scored member into `key`, replacing any existing score.
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<()> {
        let replies = self
            .atomic_batch(
                key,
                &[StoreCommand::Add {
                    score,
                    member: member.to_string(),
                }],
            )
            .await?;
        match replies.first() {
            Some(StoreReply::Added) => Ok(()),
            other => Err(unexpected_reply(key, other)),
        }
    }

    /// Set or refresh the time-to-live of `key`.
    async fn set_expiry(&self, key: &str, seconds: u64) -> Result<()> {
        let replies = self
            .atomic_batch(key, &[StoreCommand::SetExpiry { seconds }])
            .await?;
        match replies.first() {
            Some(StoreReply::ExpirySet) => Ok(()),
            other => Err(unexpected_reply(key, other)),
        }
    }
}

fn unexpected_reply(key: &str, reply: Option<&StoreReply>) -> FloodgateError {
    FloodgateError::CorruptState {
        key: key.to_string(),
        detail: format!("unexpected store reply: {:?}", reply),
    }
}
