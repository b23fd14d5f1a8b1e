// Connectivity monitor.
//
// Purpose
// - Give the rest of the agent one debounced `online` signal, whatever the
//   platform's reachability primitive is.
//
// Responsibilities
// - Feed raw probe samples through the debouncer.
// - Notify subscribers exactly once per reported transition.
// - Stop notifying a subscriber as soon as it unsubscribes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use crate::modules::connectivity::core::debouncer::{Debouncer, Transition};
use crate::shared::infrastructure::reachability::ReachabilityProbe;

pub const DEFAULT_HOLD: Duration = Duration::from_secs(2);

type Handler = Arc<dyn Fn(Transition) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub struct ConnectivityMonitor {
    online: AtomicBool,
    debouncer: Mutex<Debouncer>,
    subscribers: Mutex<BTreeMap<u64, Handler>>,
    next_subscription: AtomicU64,
}

impl ConnectivityMonitor {
    pub fn new(initial: bool, hold: Duration) -> Self {
        Self {
            online: AtomicBool::new(initial),
            debouncer: Mutex::new(Debouncer::new(initial, hold)),
            subscribers: Mutex::new(BTreeMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Last reported state.
    pub fn current(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Registers `handler` for every future transition.
    ///
    /// Handlers run on the thread that observed the transition, with the
    /// subscriber list locked: they must be quick and must not subscribe or
    /// unsubscribe themselves.
    pub fn subscribe(&self, handler: impl Fn(Transition) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(handler));
        SubscriptionId(id)
    }

    /// Returns false when the subscription was already gone.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&subscription.0)
            .is_some()
    }

    pub fn observe(&self, reachable: bool) -> Option<Transition> {
        // tokio's clock, so a paused runtime drives the hold period too.
        self.observe_at(reachable, tokio::time::Instant::now().into_std())
    }

    pub fn observe_at(&self, reachable: bool, now: Instant) -> Option<Transition> {
        let mut debouncer = self.debouncer.lock().unwrap_or_else(PoisonError::into_inner);
        let transition = debouncer.observe(reachable, now)?;
        self.online.store(transition.is_online(), Ordering::SeqCst);
        tracing::info!(?transition, "connectivity changed");

        // Dispatch under the debouncer lock so subscribers see transitions in order.
        let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        for handler in subscribers.values() {
            handler(transition);
        }
        Some(transition)
    }

    /// Samples `probe` every `interval` until the task is dropped.
    pub async fn watch(self: Arc<Self>, probe: Arc<dyn ReachabilityProbe>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = probe.is_reachable().await;
            self.observe(reachable);
        }
    }
}
