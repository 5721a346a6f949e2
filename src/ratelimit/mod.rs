//! Rate limiting logic.

mod limiter;

pub use limiter::RateLimiter;
