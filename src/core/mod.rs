pub mod config;
pub mod health;
pub mod logging;

pub use config::{Config, WatchedItem};
pub use health::{HealthChecker, HealthStatus};
