use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

use super::monitor::{ItemMonitor, MonitorOutcome};
use super::{AcceptanceHandoff, AcceptedOrders, SniperStats};
use crate::api::{OrderSource, RateLimiter};
use crate::core::WatchedItem;

/// Supervises one monitoring run per watched item. Whenever a run ends
/// with a claim, a fresh run for the same item is spawned immediately, so
/// every item stays covered for the life of the process. Cancelling the
/// token ends every run at its next suspension point and drains the loop.
pub struct Scheduler {
    monitors: Vec<Arc<ItemMonitor>>,
    accepted: AcceptedOrders,
    stats: Arc<SniperStats>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        items: Vec<WatchedItem>,
        source: Arc<dyn OrderSource>,
        limiter: Arc<RateLimiter>,
        handoff: Arc<dyn AcceptanceHandoff>,
        stats: Arc<SniperStats>,
        check_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let accepted = AcceptedOrders::new();

        let monitors = items
            .into_iter()
            .map(|item| {
                Arc::new(ItemMonitor::new(
                    item,
                    source.clone(),
                    limiter.clone(),
                    accepted.clone(),
                    handoff.clone(),
                    stats.clone(),
                    check_interval,
                ))
            })
            .collect();

        Self {
            monitors,
            accepted,
            stats,
            cancel,
        }
    }

    /// Ids already handed off. Exposed for inspection; monitors share it.
    pub fn accepted(&self) -> &AcceptedOrders {
        &self.accepted
    }

    pub async fn run(&self) -> Result<()> {
        let mut runs: JoinSet<MonitorOutcome> = JoinSet::new();
        let mut live: HashMap<Id, Arc<ItemMonitor>> = HashMap::new();

        for monitor in &self.monitors {
            self.spawn_run(&mut runs, &mut live, monitor.clone());
        }
        self.stats.set_live_monitors(live.len());
        tracing::info!("🔭 Watching {} items", live.len());

        while let Some(joined) = runs.join_next_with_id().await {
            match joined {
                Ok((id, MonitorOutcome::Matched { item, order_id })) => {
                    let monitor = live.remove(&id);
                    tracing::debug!(
                        "✅ {}: run finished (order {}), rescheduling",
                        item.name,
                        order_id
                    );
                    if let Some(monitor) = monitor {
                        if !self.cancel.is_cancelled() {
                            self.spawn_run(&mut runs, &mut live, monitor);
                        }
                    }
                }
                Ok((id, MonitorOutcome::Cancelled { item })) => {
                    live.remove(&id);
                    tracing::debug!("🛑 {}: run stopped", item.name);
                }
                Err(err) => {
                    let monitor = live.remove(&err.id());
                    if !err.is_cancelled() {
                        tracing::error!("💥 Monitor run panicked: {}", err);
                        // Coverage survives a bad cycle: put the item back.
                        if let Some(monitor) = monitor {
                            if !self.cancel.is_cancelled() {
                                self.spawn_run(&mut runs, &mut live, monitor);
                            }
                        }
                    }
                }
            }
            self.stats.set_live_monitors(live.len());
        }

        tracing::info!("👋 All monitor runs drained, scheduler exiting");
        Ok(())
    }

    fn spawn_run(
        &self,
        runs: &mut JoinSet<MonitorOutcome>,
        live: &mut HashMap<Id, Arc<ItemMonitor>>,
        monitor: Arc<ItemMonitor>,
    ) {
        let cancel = self.cancel.child_token();
        let task_monitor = monitor.clone();

        let handle = runs.spawn(async move {
            tokio::select! {
                outcome = task_monitor.run() => outcome,
                _ = cancel.cancelled() => MonitorOutcome::Cancelled {
                    item: task_monitor.item().clone(),
                },
            }
        });

        live.insert(handle.id(), monitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::MockOrderSource;
    use crate::api::{ApiError, OrderWithUser, TopOrders, UserShort, UserStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time;

    #[derive(Default)]
    struct RecordingHandoff {
        calls: parking_lot::Mutex<Vec<String>>,
    }

    impl RecordingHandoff {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl AcceptanceHandoff for RecordingHandoff {
        fn handoff(&self, order: OrderWithUser, _item: WatchedItem) {
            self.calls.lock().push(order.id);
        }
    }

    fn watched(name: &str, price_threshold: u32) -> WatchedItem {
        WatchedItem {
            name: name.to_string(),
            price_threshold,
            quantity_min: None,
            rank: None,
        }
    }

    fn order(id: &str, platinum: u32) -> OrderWithUser {
        OrderWithUser {
            id: id.to_string(),
            order_type: "sell".to_string(),
            platinum,
            quantity: 1,
            visible: true,
            item_id: "item9".to_string(),
            rank: None,
            user: UserShort {
                id: format!("user-of-{}", id),
                ingame_name: "Tenno".to_string(),
                slug: "tenno".to_string(),
                avatar: None,
                status: UserStatus::Ingame,
                reputation: 0,
            },
        }
    }

    fn top(sell: Vec<OrderWithUser>) -> TopOrders {
        TopOrders { sell, buy: vec![] }
    }

    fn scheduler(
        items: Vec<WatchedItem>,
        source: MockOrderSource,
        handoff: Arc<RecordingHandoff>,
        stats: Arc<SniperStats>,
        cancel: CancellationToken,
    ) -> Arc<Scheduler> {
        Arc::new(Scheduler::new(
            items,
            Arc::new(source),
            Arc::new(RateLimiter::new(Default::default())),
            handoff,
            stats,
            Duration::from_secs(1),
            cancel,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_spawns_replacement_and_never_reclaims() {
        let mut source = MockOrderSource::new();
        // The same order keeps reappearing in every later fetch.
        source
            .expect_top_orders()
            .returning(|_, _| Ok(top(vec![order("B", 40)])));

        let handoff = Arc::new(RecordingHandoff::default());
        let stats = Arc::new(SniperStats::new());
        let cancel = CancellationToken::new();
        let scheduler = scheduler(
            vec![watched("arcane_grace", 50)],
            source,
            handoff.clone(),
            stats.clone(),
            cancel.clone(),
        );

        let task = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run().await }
        });

        while stats.orders_claimed() < 1 {
            time::sleep(Duration::from_millis(10)).await;
        }
        // Several replacement cycles re-observe the claimed id.
        time::sleep(Duration::from_secs(3)).await;

        assert_eq!(stats.orders_claimed(), 1);
        assert_eq!(handoff.calls(), vec!["B".to_string()]);
        assert_eq!(stats.live_monitors(), 1);
        assert!(scheduler.accepted().contains("B"));

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(stats.live_monitors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_completions_each_get_replacements() {
        let mut source = MockOrderSource::new();
        source.expect_top_orders().returning(|name, _| {
            if name == "item_a" {
                Ok(top(vec![order("A1", 10)]))
            } else {
                Ok(top(vec![order("B1", 10)]))
            }
        });

        let handoff = Arc::new(RecordingHandoff::default());
        let stats = Arc::new(SniperStats::new());
        let cancel = CancellationToken::new();
        let scheduler = scheduler(
            vec![watched("item_a", 50), watched("item_b", 50)],
            source,
            handoff.clone(),
            stats.clone(),
            cancel.clone(),
        );

        let task = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run().await }
        });

        while stats.orders_claimed() < 2 {
            time::sleep(Duration::from_millis(10)).await;
        }
        time::sleep(Duration::from_secs(2)).await;

        let mut calls = handoff.calls();
        calls.sort();
        assert_eq!(calls, vec!["A1".to_string(), "B1".to_string()]);
        assert_eq!(stats.live_monitors(), 2);

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_sleep_drains_all_runs() {
        let mut source = MockOrderSource::new();
        // Offers exist but never match, so every cycle ends in a sleep.
        source
            .expect_top_orders()
            .returning(|_, _| Ok(top(vec![order("X", 999)])));

        let handoff = Arc::new(RecordingHandoff::default());
        let stats = Arc::new(SniperStats::new());
        let cancel = CancellationToken::new();
        let scheduler = scheduler(
            vec![watched("item_a", 50), watched("item_b", 50)],
            source,
            handoff.clone(),
            stats.clone(),
            cancel.clone(),
        );

        let task = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run().await }
        });

        while stats.total_requests() < 2 {
            time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        task.await.unwrap().unwrap();

        assert!(handoff.calls().is_empty());
        assert_eq!(stats.live_monitors(), 0);
        assert!(scheduler.accepted().is_empty());
    }

    /// Panics on the first fetch, then serves a matching order.
    #[derive(Default)]
    struct PanicsOnce {
        fired: AtomicBool,
    }

    #[async_trait]
    impl crate::api::OrderSource for PanicsOnce {
        async fn top_orders(
            &self,
            _item_name: &str,
            _rank: Option<u32>,
        ) -> Result<TopOrders, ApiError> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                panic!("poisoned cycle");
            }
            Ok(top(vec![order("B", 40)]))
        }

        async fn item_detail(
            &self,
            _item_id: &str,
        ) -> Result<crate::api::ItemInfo, ApiError> {
            Err(ApiError::NoData)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicked_run_is_respawned() {
        let handoff = Arc::new(RecordingHandoff::default());
        let stats = Arc::new(SniperStats::new());
        let cancel = CancellationToken::new();
        let scheduler = Arc::new(Scheduler::new(
            vec![watched("arcane_grace", 50)],
            Arc::new(PanicsOnce::default()),
            Arc::new(RateLimiter::new(Default::default())),
            handoff.clone(),
            stats.clone(),
            Duration::from_secs(1),
            cancel.clone(),
        ));

        let task = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run().await }
        });

        while stats.orders_claimed() < 1 {
            time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(handoff.calls(), vec!["B".to_string()]);

        cancel.cancel();
        task.await.unwrap().unwrap();
    }
}
