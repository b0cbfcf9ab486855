use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use uuid::Uuid;

use super::{AcceptanceHandoff, AcceptedOrders, SniperStats};
use crate::api::{ApiError, OrderSource, OrderWithUser, RateLimiter, UserStatus};
use crate::core::WatchedItem;

/// Why a monitoring run ended. Cancellation is decided by the scheduler,
/// which races each run against its shutdown token.
#[derive(Debug, Clone)]
pub enum MonitorOutcome {
    Matched {
        item: WatchedItem,
        order_id: String,
    },
    Cancelled {
        item: WatchedItem,
    },
}

/// An order is worth acting on iff nobody claimed it yet, it is at or
/// under the price ceiling, the stack is big enough, and the seller is
/// actually in game.
pub(crate) fn order_is_acceptable(
    order: &OrderWithUser,
    item: &WatchedItem,
    accepted: &AcceptedOrders,
) -> bool {
    !accepted.contains(&order.id)
        && order.platinum <= item.price_threshold
        && item.quantity_min.map_or(true, |min| order.quantity >= min)
        && order.user.status == UserStatus::Ingame
}

/// One watched item's polling loop: fetch the top sell orders, take the
/// first acceptable one, otherwise sleep one check interval and try
/// again. Fetch failures never end a run; only a claim does.
pub struct ItemMonitor {
    item: WatchedItem,
    source: Arc<dyn OrderSource>,
    limiter: Arc<RateLimiter>,
    accepted: AcceptedOrders,
    handoff: Arc<dyn AcceptanceHandoff>,
    stats: Arc<SniperStats>,
    check_interval: Duration,
}

impl ItemMonitor {
    pub fn new(
        item: WatchedItem,
        source: Arc<dyn OrderSource>,
        limiter: Arc<RateLimiter>,
        accepted: AcceptedOrders,
        handoff: Arc<dyn AcceptanceHandoff>,
        stats: Arc<SniperStats>,
        check_interval: Duration,
    ) -> Self {
        Self {
            item,
            source,
            limiter,
            accepted,
            handoff,
            stats,
            check_interval,
        }
    }

    pub fn item(&self) -> &WatchedItem {
        &self.item
    }

    pub async fn run(&self) -> MonitorOutcome {
        let run_id = Uuid::new_v4();
        let mut attempts: u64 = 0;
        let mut last_error: Option<String> = None;

        tracing::debug!("🔍 {}: monitor run {} started", self.item.name, run_id);

        loop {
            self.limiter.acquire().await;

            let top = match self.source.top_orders(&self.item.name, self.item.rank).await {
                Ok(top) => {
                    attempts += 1;
                    self.stats.record_request();
                    top
                }
                Err(ApiError::NoData) => {
                    // Missing data is an upstream hiccup, not "no offers":
                    // go straight into the next cycle.
                    attempts += 1;
                    self.stats.record_request();
                    tracing::warn!("⚠️  No data for {}", self.item.name);
                    continue;
                }
                Err(err) => {
                    self.stats.record_fetch_failure();
                    last_error = Some(err.to_string());
                    tracing::warn!("⚠️  Fetch failed for {}: {}. Retrying.", self.item.name, err);
                    continue;
                }
            };

            let mut matched: Option<OrderWithUser> = None;
            for order in top.sell {
                // claim() re-checks membership atomically; a concurrent
                // monitor may have taken the id since the predicate ran.
                if order_is_acceptable(&order, &self.item, &self.accepted)
                    && self.accepted.claim(&order.id)
                {
                    matched = Some(order);
                    break;
                }
            }

            if let Some(order) = matched {
                self.stats.record_claim();
                tracing::info!(
                    "🎯 {}: {}p x{} from {} (order {}, attempt {})",
                    self.item.name,
                    order.platinum,
                    order.quantity,
                    order.user.ingame_name,
                    order.id,
                    attempts
                );
                if let Some(err) = &last_error {
                    tracing::debug!("Run {} had recovered from: {}", run_id, err);
                }

                let order_id = order.id.clone();
                self.handoff.handoff(order, self.item.clone());

                return MonitorOutcome::Matched {
                    item: self.item.clone(),
                    order_id,
                };
            }

            tracing::debug!(
                "📡 {}: attempt {}, nothing acceptable yet",
                self.item.name,
                attempts
            );

            time::sleep(self.check_interval).await;
        }
    }
}
