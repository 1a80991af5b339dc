// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aura_core::{Category, Event, Priority};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tracing::warn;

/// CRITICAL events whose queue wait exceeds this are logged as a
/// violation — see §4.2: "A CRITICAL event whose queue wait exceeds 100 ms
/// is logged as a violation."
const CRITICAL_LATENCY_BUDGET: Duration = Duration::from_millis(100);

/// How many past events the bus retains for introspection.
const RING_CAPACITY: usize = 1000;

/// Per-subscriber outgoing channel depth. Small and deliberate: a
/// subscriber is expected to keep up; if it can't, it should unsubscribe
/// and resync from a snapshot rather than let events pile up here.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

struct QueuedEvent {
    event: Event,
    enqueued_at: Instant,
    sequence: u64,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event.priority == other.event.priority && self.sequence == other.sequence
    }
}
impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    /// Higher priority sorts greater (so `BinaryHeap`, a max-heap, pops it
    /// first). Within equal priority, the *lower* sequence number sorts
    /// greater, so FIFO order among equal-priority events is preserved.
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .priority
            .cmp(&other.event.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

type SubscriberId = u64;

struct SubscriberEntry {
    categories: Option<Vec<Category>>,
    min_priority: Priority,
    sender: mpsc::Sender<Event>,
}

impl SubscriberEntry {
    fn matches(&self, event: &Event) -> bool {
        if event.priority < self.min_priority {
            return false;
        }
        match &self.categories {
            None => true,
            Some(categories) => categories.contains(&event.category),
        }
    }
}

struct Inner {
    queue: Mutex<BinaryHeap<QueuedEvent>>,
    notify: Notify,
    subscribers: Mutex<HashMap<SubscriberId, SubscriberEntry>>,
    ring: Mutex<VecDeque<Event>>,
    sequence: AtomicU64,
    next_subscriber_id: AtomicU64,
}

/// Priority, category-filtered async pub/sub.
///
/// Cloning an `EventBus` shares the same queue, subscriber table, and
/// worker task — it is a thin `Arc` handle, constructed once per process
/// and injected into every component that needs to publish or subscribe.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

/// A live subscription. Dropping it (or its inner `Receiver`) unsubscribes;
/// any delivery already in flight to it completes.
pub struct Subscription {
    id: SubscriberId,
    bus: EventBus,
    pub receiver: mpsc::Receiver<Event>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.inner.subscribers.lock().remove(&self.id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let inner = Arc::new(Inner {
            queue: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            subscribers: Mutex::new(HashMap::new()),
            ring: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
            sequence: AtomicU64::new(0),
            next_subscriber_id: AtomicU64::new(0),
        });
        let bus = Self { inner };
        bus.spawn_worker();
        bus
    }

    /// Enqueue `event` for asynchronous delivery. Returns immediately;
    /// never blocks on subscriber delivery.
    pub fn publish(&self, event: Event) {
        let sequence = self.inner.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        self.inner.queue.lock().push(QueuedEvent { event, enqueued_at: Instant::now(), sequence });
        self.inner.notify.notify_one();
    }

    /// Register a subscriber filtered by an optional category allow-list
    /// and a minimum priority. `None` categories means "all categories".
    pub fn subscribe(
        &self,
        categories: Option<Vec<Category>>,
        min_priority: Priority,
    ) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let id = self.inner.next_subscriber_id.fetch_add(1, AtomicOrdering::Relaxed);
        self.inner.subscribers.lock().insert(id, SubscriberEntry { categories, min_priority, sender });
        Subscription { id, bus: self.clone(), receiver }
    }

    /// Snapshot of the last up-to-1000 delivered events, oldest first.
    pub fn recent_events(&self) -> Vec<Event> {
        self.inner.ring.lock().iter().cloned().collect()
    }

    fn spawn_worker(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            loop {
                let next = { inner.queue.lock().pop() };
                let Some(queued) = next else {
                    inner.notify.notified().await;
                    continue;
                };
                deliver(&inner, queued);
            }
        });
    }
}

fn deliver(inner: &Inner, queued: QueuedEvent) {
    let QueuedEvent { event, enqueued_at, .. } = queued;

    if event.priority == Priority::Critical {
        let wait = enqueued_at.elapsed();
        if wait > CRITICAL_LATENCY_BUDGET {
            warn!(
                violation = "critical_latency",
                wait_ms = wait.as_millis() as u64,
                event = event.name(),
                "critical event queue wait exceeded budget"
            );
        }
    }

    {
        let mut ring = inner.ring.lock();
        if ring.len() >= RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(event.clone());
    }

    // At-most-once, best-effort: a subscriber that can't keep up has its
    // delivery dropped rather than blocking every other subscriber — per
    // §4.2, "no retries; subscribers must be idempotent".
    let subscribers = inner.subscribers.lock();
    for entry in subscribers.values() {
        if entry.matches(&event) {
            if let Err(err) = entry.sender.try_send(event.clone()) {
                warn!(error = %err, event = event.name(), "event bus subscriber delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::{DaemonId, EventKind};
    use std::time::Duration;

    fn event(category: &str, priority: Priority) -> Event {
        Event::new(Category::new(category), EventKind::Running, priority, DaemonId::new(), 0)
    }

    #[tokio::test]
    async fn subscriber_receives_matching_category_only() {
        let bus = EventBus::new();
        let mut wifi_sub = bus.subscribe(Some(vec![Category::new("wifi")]), Priority::Low);
        let mut bt_sub = bus.subscribe(Some(vec![Category::new("bluetooth")]), Priority::Low);

        bus.publish(event("wifi", Priority::Normal));

        let received = wifi_sub.receiver.recv().await.unwrap();
        assert_eq!(received.category, Category::new("wifi"));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), bt_sub.receiver.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn min_priority_filters_out_lower_priority_events() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(None, Priority::High);

        bus.publish(event("wifi", Priority::Low));
        bus.publish(event("wifi", Priority::Critical));

        let received = sub.receiver.recv().await.unwrap();
        assert_eq!(received.priority, Priority::Critical);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), sub.receiver.recv()).await.is_err()
        );
    }

    #[tokio::test]
    async fn higher_priority_is_delivered_before_lower_priority_enqueued_earlier() {
        let bus = EventBus::new();
        // Prevent the worker from draining until both are enqueued by
        // publishing faster than the (empty) queue can be observed: we
        // assert on ordering via recent_events after both are delivered.
        bus.publish(event("a", Priority::Low));
        bus.publish(event("a", Priority::Critical));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let recent = bus.recent_events();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].priority, Priority::Critical);
        assert_eq!(recent[1].priority, Priority::Low);
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let bus = EventBus::new();
        let sub = bus.subscribe(None, Priority::Low);
        drop(sub);
        // Should not panic or block: publishing with zero live subscribers.
        bus.publish(event("wifi", Priority::Normal));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn ring_buffer_is_capped_at_1000() {
        let bus = EventBus::new();
        for _ in 0..(RING_CAPACITY + 50) {
            bus.publish(event("wifi", Priority::Normal));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(bus.recent_events().len(), RING_CAPACITY);
    }
}
