//! Floodgate - Distributed Sliding-Window Rate Limiting
//!
//! This crate implements a sliding-window rate limiter whose state lives in
//! a shared ordered-set store, so any number of processes can enforce one
//! limit together. Each check runs a single atomic prune-read-append batch
//! against the store and returns how long the caller must wait, with `0`
//! meaning the action is admitted now.
//!
//! ```no_run
//! use std::sync::Arc;
//! use floodgate::config::{RateLimiterConfig, RateLimiterOptions};
//! use floodgate::ratelimit::RateLimiter;
//! use floodgate::store::RedisWindowStore;
//!
//! # async fn run() -> floodgate::error::Result<()> {
//! let config = RateLimiterConfig::new(RateLimiterOptions {
//!     namespace: "login-".to_string(),
//!     interval_millis: 60_000,
//!     max_in_interval: 5,
//!     min_difference_millis: None,
//!     store_blocked: true,
//! })?;
//! let store = Arc::new(RedisWindowStore::connect("redis://127.0.0.1:6379").await?);
//! let limiter = RateLimiter::new(config, store);
//!
//! let wait_seconds = limiter.check("user-42").await?;
//! if wait_seconds == 0 {
//!     // proceed
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod store;
