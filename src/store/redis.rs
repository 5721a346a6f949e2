//! Redis-backed window store.
//!
//! Window records are Redis sorted sets; an atomic batch maps to a
//! MULTI/EXEC transaction, which gives exactly the per-key isolation the
//! limiter requires: the queued commands run back to back with no other
//! client's commands interleaved.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{from_redis_value, Value};
use tracing::trace;

use crate::error::{FloodgateError, Result};

use super::{StoreCommand, StoreReply, WindowStore};

/// A [`WindowStore`] backed by Redis sorted sets.
///
/// Holds a [`ConnectionManager`], which multiplexes one connection across
/// concurrent callers and reconnects on failure. Connection lifecycle beyond
/// that (pooling, timeouts) is the client's concern, not the limiter's.
#[derive(Clone)]
pub struct RedisWindowStore {
    connection: ConnectionManager,
}

impl RedisWindowStore {
    /// Create a store from an existing connection manager.
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    /// Connect to Redis at the given URL, e.g. `redis://127.0.0.1:6379`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self::new(connection))
    }

    fn decode_reply(command: &StoreCommand, value: &Value) -> Result<StoreReply> {
        match command {
            StoreCommand::RemoveRangeByScore { .. } => {
                Ok(StoreReply::Removed(from_redis_value(value)?))
            }
            StoreCommand::RangeAll => Ok(StoreReply::Members(from_redis_value(value)?)),
            StoreCommand::Add { .. } => {
                // ZADD replies with the number of new members; the count is
                // irrelevant here, only that the reply is well-formed.
                from_redis_value::<i64>(value)?;
                Ok(StoreReply::Added)
            }
            StoreCommand::SetExpiry { .. } => {
                from_redis_value::<i64>(value)?;
                Ok(StoreReply::ExpirySet)
            }
        }
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn atomic_batch(&self, key: &str, commands: &[StoreCommand]) -> Result<Vec<StoreReply>> {
        let mut pipe = redis::pipe();
        pipe.atomic();

        for command in commands {
            match command {
                StoreCommand::RemoveRangeByScore { min, max } => {
                    pipe.zrembyscore(key, *min, *max);
                }
                StoreCommand::RangeAll => {
                    pipe.zrange(key, 0, -1);
                }
                StoreCommand::Add { score, member } => {
                    pipe.zadd(key, member, *score);
                }
                StoreCommand::SetExpiry { seconds } => {
                    pipe.expire(key, *seconds as i64);
                }
            }
        }

        trace!(key = %key, commands = commands.len(), "Executing store transaction");

        let mut connection = self.connection.clone();
        let values: Vec<Value> = pipe.query_async(&mut connection).await?;

        if values.len() != commands.len() {
            return Err(FloodgateError::CorruptState {
                key: key.to_string(),
                detail: format!(
                    "transaction returned {} replies for {} commands",
                    values.len(),
                    commands.len()
                ),
            });
        }

        commands
            .iter()
            .zip(values.iter())
            .map(|(command, value)| Self::decode_reply(command, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RedisWindowStore::connect("not a redis url").await;
        assert!(matches!(result, Err(FloodgateError::Store(_))));
    }

    #[test]
    fn test_decode_removed_reply() {
        let command = StoreCommand::RemoveRangeByScore { min: 0, max: 10 };
        let reply = RedisWindowStore::decode_reply(&command, &Value::Int(3)).unwrap();
        assert_eq!(reply, StoreReply::Removed(3));
    }

    #[test]
    fn test_decode_mismatched_reply_is_corrupt_state() {
        let command = StoreCommand::RemoveRangeByScore { min: 0, max: 10 };
        let result = RedisWindowStore::decode_reply(&command, &Value::Nil);
        assert!(result.is_err());
    }
}
