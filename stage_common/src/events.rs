//! Typed publish/subscribe bus for stage notifications.
//!
//! Positioner drivers publish [`StageEvent::DeviceMoved`] and
//! [`StageEvent::DeviceStopped`]; the stage mover consumes those and
//! publishes the aggregate notifications (position, limits, step sizes,
//! sites) that user interfaces and overlays subscribe to.
//!
//! Callbacks run synchronously on the publishing thread, outside the bus
//! lock, so a subscriber may itself publish.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::axis::Axis;
use crate::limits::LimitBound;
use crate::site::Site;

/// Every notification that travels over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    /// A positioner reports a new position for itself.
    DeviceMoved {
        /// Positioner name.
        device: String,
        /// Axis of the positioner.
        axis: Axis,
        /// Positioner (not aggregate) position.
        position: f64,
    },
    /// A positioner finished its move.
    DeviceStopped {
        /// Positioner name.
        device: String,
    },
    /// Aggregate position of an axis changed.
    PositionChanged {
        /// Axis.
        axis: Axis,
        /// Sum of all positioner positions on the axis.
        position: f64,
    },
    /// A soft limit was changed.
    SoftLimitChanged {
        /// Axis.
        axis: Axis,
        /// New limit value.
        value: f64,
        /// Which end of the range.
        bound: LimitBound,
    },
    /// Keypad step size of an axis changed.
    StepSizeChanged {
        /// Axis.
        axis: Axis,
        /// New step size in microns.
        step: f64,
    },
    /// The control depth changed.
    StepIndexChanged {
        /// New control depth.
        depth: usize,
    },
    /// A site was added.
    SiteCreated(Site),
    /// A site was removed.
    SiteDeleted(Site),
    /// The stage finished moving to a site.
    ArrivedAtSite(Site),
}

impl StageEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StageEvent::DeviceMoved { .. } => "device_moved",
            StageEvent::DeviceStopped { .. } => "device_stopped",
            StageEvent::PositionChanged { .. } => "position_changed",
            StageEvent::SoftLimitChanged { .. } => "soft_limit_changed",
            StageEvent::StepSizeChanged { .. } => "step_size_changed",
            StageEvent::StepIndexChanged { .. } => "step_index_changed",
            StageEvent::SiteCreated(_) => "site_created",
            StageEvent::SiteDeleted(_) => "site_deleted",
            StageEvent::ArrivedAtSite(_) => "arrived_at_site",
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&StageEvent) + Send + Sync>;

struct BusInner {
    subscribers: RwLock<Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
}

/// Cloneable handle to a shared event bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

/// Non-owning bus handle, for subscribers that must not keep the bus alive.
#[derive(Clone)]
pub struct WeakEventBus {
    inner: Weak<BusInner>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a callback for every future event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StageEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.inner.subscribers.write();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    /// Deliver an event to every subscriber.
    pub fn publish(&self, event: StageEvent) {
        let subscribers: Vec<Callback> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        trace!(kind = event.kind(), subscribers = subscribers.len(), "publish");
        for callback in subscribers {
            callback(&event);
        }
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Non-owning handle to this bus.
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl fmt::Debug for WeakEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEventBus")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl WeakEventBus {
    /// Upgrade to a full handle if the bus still exists.
    pub fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }

    /// Publish if the bus still exists; returns whether it did.
    pub fn publish(&self, event: StageEvent) -> bool {
        match self.upgrade() {
            Some(bus) => {
                bus.publish(event);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |e| sink.lock().push(e.clone()));

        bus.publish(StageEvent::StepIndexChanged { depth: 1 });
        bus.publish(StageEvent::DeviceStopped {
            device: "piezo".into(),
        });

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], StageEvent::StepIndexChanged { depth: 1 });
        assert_eq!(seen[1].kind(), "device_stopped");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let id = bus.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(StageEvent::StepIndexChanged { depth: 0 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(StageEvent::StepIndexChanged { depth: 0 });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_may_publish_reentrantly() {
        let bus = EventBus::new();
        let weak = bus.downgrade();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |e| {
            sink.lock().push(e.kind());
            if let StageEvent::DeviceMoved { axis, position, .. } = e {
                weak.publish(StageEvent::PositionChanged {
                    axis: *axis,
                    position: *position,
                });
            }
        });

        bus.publish(StageEvent::DeviceMoved {
            device: "x".into(),
            axis: Axis::X,
            position: 1.0,
        });
        assert_eq!(*seen.lock(), vec!["device_moved", "position_changed"]);
    }

    #[test]
    fn weak_handle_does_not_keep_bus_alive() {
        let bus = EventBus::new();
        let weak = bus.downgrade();
        assert!(weak.upgrade().is_some());
        drop(bus);
        assert!(!weak.publish(StageEvent::StepIndexChanged { depth: 0 }));
    }
}
