use serde::Serialize;
use std::sync::Arc;

use crate::sniper::{SniperStats, StatsSnapshot};

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentHealth,
    pub sniper: StatsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub market_api: bool,
    pub webhook: bool,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    stats: Arc<SniperStats>,
    webhook_configured: bool,
}

impl HealthChecker {
    pub fn new(stats: Arc<SniperStats>, webhook_configured: bool) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            stats,
            webhook_configured,
        }
    }

    pub fn get_status(&self) -> HealthStatus {
        let market_api = self.stats.market_api_ok();

        HealthStatus {
            status: if market_api {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components: ComponentHealth {
                market_api,
                webhook: self.webhook_configured,
            },
            sniper: self.stats.snapshot(),
        }
    }
}
