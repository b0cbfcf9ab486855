pub mod monitor;
pub mod scheduler;

pub use monitor::{ItemMonitor, MonitorOutcome};
pub use scheduler::Scheduler;

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::api::OrderWithUser;
use crate::core::WatchedItem;

/// Receives each claimed order exactly once, after its id is already in
/// [`AcceptedOrders`]. Implementations must not block the caller: deliver
/// side effects on their own tasks.
#[cfg_attr(test, mockall::automock)]
pub trait AcceptanceHandoff: Send + Sync {
    fn handoff(&self, order: OrderWithUser, item: WatchedItem);
}

/// Order ids that have already been handed off, shared by every
/// monitoring run. Ids are never removed and never persisted: the set
/// grows for the life of the process, and a restart forgets all prior
/// claims. Both are deliberate.
#[derive(Clone, Default)]
pub struct AcceptedOrders {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl AcceptedOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().contains(id)
    }

    /// Returns true when the id was not claimed before. This is the
    /// commit point: no await separates the membership check from the
    /// insert, so concurrent monitors and a mid-shutdown drop both see
    /// one winner.
    pub fn claim(&self, id: &str) -> bool {
        self.ids.lock().insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}

/// Run counters shared between the monitors, the scheduler, and the
/// health endpoint.
#[derive(Default)]
pub struct SniperStats {
    total_requests: AtomicU64,
    fetch_failures: AtomicU64,
    orders_claimed: AtomicU64,
    live_monitors: AtomicUsize,
    market_api_ok: AtomicBool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub fetch_failures: u64,
    pub orders_claimed: u64,
    pub live_monitors: usize,
}

impl SniperStats {
    pub fn new() -> Self {
        Self {
            market_api_ok: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.market_api_ok.store(true, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        self.market_api_ok.store(false, Ordering::Relaxed);
    }

    pub fn record_claim(&self) {
        self.orders_claimed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_live_monitors(&self, count: usize) {
        self.live_monitors.store(count, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn orders_claimed(&self) -> u64 {
        self.orders_claimed.load(Ordering::Relaxed)
    }

    pub fn live_monitors(&self) -> usize {
        self.live_monitors.load(Ordering::Relaxed)
    }

    pub fn market_api_ok(&self) -> bool {
        self.market_api_ok.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests(),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            orders_claimed: self.orders_claimed(),
            live_monitors: self.live_monitors(),
        }
    }
}
