pub mod client;
pub mod rate_limiter;
pub mod types;

pub use client::{ApiError, MarketClient, OrderSource};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use types::*;
