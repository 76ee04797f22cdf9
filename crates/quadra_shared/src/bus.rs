//! # Animation Event Bus
//!
//! Explicit pub/sub channel between the ledger, the choreographer and the
//! visual surfaces. There is no global instance: whoever mounts a voting
//! session creates one bus and hands clones of it to every participant.
//!
//! ```text
//! publish(event) ──┬──> [queue] Subscription (choreographer: LAUNCH | RESET)
//!                  ├──> [queue] Subscription (pool: FLIGHT_START | POOL_SETTLE | RESET)
//!                  └──> [queue] Subscription (diamond: ...)
//! ```
//!
//! Each subscriber owns a bounded FIFO queue, so per-subscriber ordering is
//! publish order. Dropping a [`Subscription`] unregisters it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::events::AnimEvent;

/// Default per-subscriber queue capacity.
///
/// A 225-credit launch produces at most 225 units × 4 events.
pub const DEFAULT_BUS_CAPACITY: usize = 4096;

/// Topic mask (bitfield) selecting which events a subscriber receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topics(u32);

impl Topics {
    /// [`AnimEvent::Launch`].
    pub const LAUNCH: Self = Self(1 << 0);
    /// [`AnimEvent::FlightStart`].
    pub const FLIGHT_START: Self = Self(1 << 1);
    /// [`AnimEvent::PoolSettle`].
    pub const POOL_SETTLE: Self = Self(1 << 2);
    /// [`AnimEvent::DiamondSettle`].
    pub const DIAMOND_SETTLE: Self = Self(1 << 3);
    /// [`AnimEvent::FlightEnd`].
    pub const FLIGHT_END: Self = Self(1 << 4);
    /// [`AnimEvent::Reset`].
    pub const RESET: Self = Self(1 << 5);
    /// Every event kind.
    pub const ALL: Self = Self(0b11_1111);

    /// Returns the topic an event is published under.
    #[must_use]
    pub const fn of(event: &AnimEvent) -> Self {
        match event {
            AnimEvent::Launch(_) => Self::LAUNCH,
            AnimEvent::FlightStart(_) => Self::FLIGHT_START,
            AnimEvent::PoolSettle(_) => Self::POOL_SETTLE,
            AnimEvent::DiamondSettle(_) => Self::DIAMOND_SETTLE,
            AnimEvent::FlightEnd(_) => Self::FLIGHT_END,
            AnimEvent::Reset { .. } => Self::RESET,
        }
    }

    /// Combines two masks.
    #[inline]
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if any topic of `other` is set.
    #[inline]
    #[must_use]
    pub const fn has(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for Topics {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

struct Slot {
    id: u64,
    topics: Topics,
    sender: Sender<AnimEvent>,
}

struct BusInner {
    slots: Mutex<Vec<Slot>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl BusInner {
    fn publish(&self, event: &AnimEvent) -> usize {
        let topic = Topics::of(event);
        let slots = self.slots.lock();
        let mut delivered = 0;

        for slot in slots.iter().filter(|slot| slot.topics.has(topic)) {
            match slot.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber = slot.id,
                        event = event.key(),
                        "subscriber queue full, event dropped"
                    );
                }
                // Receiver half lives inside the Subscription; it unregisters on drop.
                Err(TrySendError::Disconnected(_)) => {}
            }
        }

        delivered
    }
}

/// The animation event bus.
///
/// Cloning is cheap; clones share subscribers.
#[derive(Clone)]
pub struct AnimationBus {
    inner: Arc<BusInner>,
}

impl AnimationBus {
    /// Creates a bus whose subscribers each buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                slots: Mutex::new(Vec::with_capacity(8)),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Registers a subscriber for the given topics.
    ///
    /// The subscription stays active until the returned guard is dropped.
    #[must_use]
    pub fn subscribe(&self, topics: Topics) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = bounded(self.inner.capacity);
        self.inner.slots.lock().push(Slot { id, topics, sender });

        Subscription {
            id,
            topics,
            receiver,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Publishes an event to every matching subscriber.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, event: &AnimEvent) -> usize {
        self.inner.publish(event)
    }

    /// Creates a publish-only handle.
    #[must_use]
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.slots.lock().len()
    }
}

impl Default for AnimationBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl std::fmt::Debug for AnimationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationBus")
            .field("subscribers", &self.subscriber_count())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

/// Publish-only handle, held by event producers such as the ledger.
#[derive(Clone)]
pub struct EventPublisher {
    inner: Arc<BusInner>,
}

impl EventPublisher {
    /// Publishes an event. Returns how many subscribers received it.
    #[inline]
    pub fn publish(&self, event: &AnimEvent) -> usize {
        self.inner.publish(event)
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher").finish_non_exhaustive()
    }
}

/// Scoped registration on the bus. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    topics: Topics,
    receiver: Receiver<AnimEvent>,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Returns the topics this subscription listens to.
    #[must_use]
    pub const fn topics(&self) -> Topics {
        self.topics
    }

    /// Receives one event (non-blocking).
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<AnimEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receives all pending events (non-blocking), in publish order.
    #[must_use]
    pub fn drain(&self) -> Vec<AnimEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.slots.lock().retain(|slot| slot.id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topics", &self.topics)
            .field("pending", &self.pending_count())
            .finish()
    }
}
