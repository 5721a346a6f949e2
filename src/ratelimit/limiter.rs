//! Core rate limiter implementation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, trace};

use crate::config::RateLimiterConfig;
use crate::error::{FloodgateError, Result};
use crate::store::{StoreCommand, StoreReply, WindowStore};

/// A sliding-window rate limiter over a shared window store.
///
/// Every check is one atomic prune-read-append batch against the store, so
/// any number of limiter instances across processes enforce the same limit
/// as long as they share the store and the config. The limiter itself holds
/// no per-identity state and no locks; instances are cheap to clone.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    store: Arc<dyn WindowStore>,
}

impl RateLimiter {
    /// Create a rate limiter over the given store.
    pub fn new(config: RateLimiterConfig, store: Arc<dyn WindowStore>) -> Self {
        Self { config, store }
    }

    /// The configuration shared by all checks.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Check whether an action by `identity` may proceed now.
    ///
    /// Returns `0` when the action is admitted, or the number of whole
    /// seconds the caller should wait before retrying. A failed check
    /// surfaces as an error and must not be read as either outcome.
    ///
    /// In store-blocked mode (the default) every check records a timestamp,
    /// rejected or not, and the per-window ceiling is a hard bound. With
    /// `store_blocked` off, only admitted checks are recorded, via a second
    /// batch that is not atomic with the read; concurrent checks racing in
    /// that gap can each be admitted on the same window state.
    pub async fn check(&self, identity: &str) -> Result<u64> {
        let interval_micros = self.config.interval_millis() as i64 * 1000;
        let expiry_seconds = self.config.interval_millis().div_ceil(1000);

        // One wall-clock read per check, at the same resolution as the
        // stored scores.
        let now = Utc::now().timestamp_micros();
        let clear_before = now - interval_micros;
        let key = format!("{}{}", self.config.namespace(), identity);

        trace!(key = %key, "Checking rate limit");

        let mut commands = vec![
            StoreCommand::RemoveRangeByScore {
                min: 0,
                max: clear_before,
            },
            StoreCommand::RangeAll,
        ];
        if self.config.store_blocked() {
            commands.push(StoreCommand::Add {
                score: now,
                member: now.to_string(),
            });
            commands.push(StoreCommand::SetExpiry {
                seconds: expiry_seconds,
            });
        }

        let replies = self.store.atomic_batch(&key, &commands).await?;
        let user_set = match replies.get(1) {
            Some(StoreReply::Members(members)) => parse_timestamps(&key, members)?,
            other => {
                return Err(FloodgateError::CorruptState {
                    key,
                    detail: format!("unexpected store reply: {:?}", other),
                })
            }
        };

        let too_many_in_interval = user_set.len() as u64 >= self.config.max_in_interval();

        // Time until the oldest recorded action falls out of the window.
        let time_until_next_interval_opportunity = user_set
            .first()
            .map(|oldest| oldest + interval_micros - now);

        let time_since_last_request = match (self.config.min_difference_millis(), user_set.last()) {
            (Some(_), Some(last)) => Some(now - last),
            _ => None,
        };

        let time_left: Option<i64> = if too_many_in_interval {
            time_until_next_interval_opportunity.map(|micros| micros / 1000 / 1000)
        } else if let (Some(min_difference), Some(since_last)) =
            (self.config.min_difference_millis(), time_since_last_request)
        {
            if since_last < min_difference as i64 * 1000 {
                let until_min_difference_millis = min_difference as i64 - since_last / 1000;
                let wait_millis = match time_until_next_interval_opportunity {
                    Some(interval_micros_left) => {
                        (interval_micros_left / 1000).min(until_min_difference_millis)
                    }
                    None => until_min_difference_millis,
                };
                Some(wait_millis / 1000)
            } else {
                None
            }
        } else {
            None
        };

        match time_left {
            Some(wait_seconds) => {
                debug!(
                    key = %key,
                    count = user_set.len(),
                    limit = self.config.max_in_interval(),
                    wait_seconds,
                    "Rate limit exceeded"
                );
                Ok(wait_seconds.max(0) as u64)
            }
            None => {
                if !self.config.store_blocked() {
                    self.store
                        .atomic_batch(
                            &key,
                            &[
                                StoreCommand::Add {
                                    score: now,
                                    member: now.to_string(),
                                },
                                StoreCommand::SetExpiry {
                                    seconds: expiry_seconds,
                                },
                            ],
                        )
                        .await?;
                }
                Ok(0)
            }
        }
    }
}

/// Parse the stored members back into timestamps, ascending by score.
fn parse_timestamps(key: &str, members: &[String]) -> Result<Vec<i64>> {
    members
        .iter()
        .map(|member| {
            member
                .parse::<i64>()
                .map_err(|_| FloodgateError::CorruptState {
                    key: key.to_string(),
                    detail: format!("non-numeric timestamp member {:?}", member),
                })
        })
        .collect()
}
