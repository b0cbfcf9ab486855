use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use wfm_sniper_bot::api::{MarketClient, OrderSource, RateLimiter, RateLimiterConfig};
use wfm_sniper_bot::core::{self, Config, HealthChecker};
use wfm_sniper_bot::notify::Notifier;
use wfm_sniper_bot::sniper::{AcceptanceHandoff, Scheduler, SniperStats};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    core::logging::init_logging(&config.monitoring.log_level);

    tracing::info!("🚀 warframe.market sniper starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Watching {} items, checking every {:.1}s, {} requests per {:.1}s",
        config.sniper.items.len(),
        config.sniper.check_interval_secs,
        config.market.rate_limit_requests,
        config.market.rate_limit_window_secs
    );

    let stats = Arc::new(SniperStats::new());
    let source: Arc<dyn OrderSource> = Arc::new(MarketClient::new(&config.market)?);
    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
        max_requests: config.market.rate_limit_requests,
        window: Duration::from_secs_f64(config.market.rate_limit_window_secs),
    }));
    let handoff: Arc<dyn AcceptanceHandoff> = Arc::new(Notifier::new(
        config.notify.clone(),
        source.clone(),
        limiter.clone(),
    )?);

    // Start health check endpoint
    let health_checker = Arc::new(HealthChecker::new(
        stats.clone(),
        config.notify.webhook_url.is_some(),
    ));
    let health_port = config.monitoring.health_port;
    tokio::spawn(async move { start_health_server(health_checker, health_port).await });

    tracing::info!("✅ Health endpoint running on port {}", health_port);

    // Wire the interrupt signal to cooperative shutdown
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("🛑 Interrupt received, shutting down...");
                cancel.cancel();
            }
        });
    }

    let scheduler = Scheduler::new(
        config.sniper.items.clone(),
        source,
        limiter,
        handoff,
        stats,
        Duration::from_secs_f64(config.sniper.check_interval_secs),
        cancel,
    );
    scheduler.run().await?;

    tracing::info!("Exiting.");
    Ok(())
}

async fn start_health_server(health_checker: Arc<HealthChecker>, port: u16) {
    use warp::Filter;

    let health = warp::path("health")
        .and(warp::any().map(move || health_checker.clone()))
        .map(|checker: Arc<HealthChecker>| warp::reply::json(&checker.get_status()));

    warp::serve(health).run(([0, 0, 0, 0], port)).await;
}
