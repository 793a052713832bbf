//! Synchronous publish/subscribe channel.
//!
//! One `EventBus<E>` per emitter. Delivery is in subscription order and
//! completes before `emit` returns. There is no queue, no replay and no
//! cancellation: a listener registered while an event is being dispatched
//! does not see that event, and a listener released mid-dispatch is skipped
//! for the rest of it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

/// Identifies one registered listener on a bus.
pub type ListenerId = u64;

struct Listener<E> {
    id: ListenerId,
    active: Cell<bool>,
    callback: Box<dyn Fn(&E)>,
}

struct BusInner<E> {
    next_id: Cell<ListenerId>,
    listeners: RefCell<Vec<Rc<Listener<E>>>>,
}

/// Type-erased detach hook so `Subscription` does not carry the event type.
trait Detach {
    fn detach(&self, id: ListenerId) -> bool;
}

impl<E> Detach for BusInner<E> {
    fn detach(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| l.id == id) {
            Some(index) => {
                let listener = listeners.remove(index);
                listener.active.set(false);
                true
            }
            None => false,
        }
    }
}

/// A per-emitter listener registry with synchronous, ordered dispatch.
pub struct EventBus<E> {
    inner: Rc<BusInner<E>>,
}

impl<E: 'static> EventBus<E> {
    /// Creates a bus with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BusInner {
                next_id: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Registers a callback. The returned handle must be released explicitly
    /// with [`Subscription::unsubscribe`]; dropping it keeps the listener.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&E) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.listeners.borrow_mut().push(Rc::new(Listener {
            id,
            active: Cell::new(true),
            callback: Box::new(callback),
        }));

        let bus: Weak<dyn Detach> = Rc::downgrade(&self.inner) as Weak<dyn Detach>;
        Subscription {
            id,
            bus,
            released: Cell::new(false),
        }
    }

    /// Delivers `event` to every listener registered at the time of the call.
    pub fn emit(&self, event: &E) {
        // Listeners may subscribe/unsubscribe re-entrantly, so dispatch from a
        // snapshot and never hold the registry borrow across a callback.
        let snapshot: Vec<Rc<Listener<E>>> = self.inner.listeners.borrow().clone();
        trace!(listeners = snapshot.len(), "dispatching event");
        for listener in snapshot {
            if listener.active.get() {
                (listener.callback)(event);
            }
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// Handle for one registered listener.
#[must_use = "a subscription stays registered until `unsubscribe` is called"]
pub struct Subscription {
    id: ListenerId,
    bus: Weak<dyn Detach>,
    released: Cell<bool>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes the listener from its bus. Returns false if it was already
    /// released or the bus no longer exists.
    pub fn unsubscribe(&self) -> bool {
        if self.released.replace(true) {
            return false;
        }
        match self.bus.upgrade() {
            Some(bus) => bus.detach(self.id),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.released.get() && self.bus.strong_count() > 0
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus: EventBus<u32> = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s1 = {
            let seen = seen.clone();
            bus.subscribe(move |e| seen.borrow_mut().push(("first", *e)))
        };
        let s2 = {
            let seen = seen.clone();
            bus.subscribe(move |e| seen.borrow_mut().push(("second", *e)))
        };

        bus.emit(&7);
        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
        assert!(s1.unsubscribe());
        assert!(s2.unsubscribe());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus: EventBus<u32> = EventBus::new();
        let sub = bus.subscribe(|_| {});
        assert!(sub.is_active());
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.is_active());
    }

    #[test]
    fn test_subscriber_added_during_dispatch_misses_event() {
        let bus: EventBus<u32> = EventBus::new();
        let late_hits = Rc::new(Cell::new(0));

        let bus_handle = bus.clone();
        let hits = late_hits.clone();
        let _outer = bus.subscribe(move |_| {
            let hits = hits.clone();
            let _late = bus_handle.subscribe(move |_| hits.set(hits.get() + 1));
        });

        bus.emit(&1);
        assert_eq!(late_hits.get(), 0);
        bus.emit(&2);
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_listener_released_mid_dispatch_is_skipped() {
        let bus: EventBus<u32> = EventBus::new();
        let victim_hits = Rc::new(Cell::new(0));
        let victim_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let slot = victim_slot.clone();
        let _killer = bus.subscribe(move |_| {
            if let Some(sub) = slot.borrow().as_ref() {
                sub.unsubscribe();
            }
        });
        let hits = victim_hits.clone();
        *victim_slot.borrow_mut() = Some(bus.subscribe(move |_| hits.set(hits.get() + 1)));

        bus.emit(&1);
        assert_eq!(victim_hits.get(), 0);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus: EventBus<u32> = EventBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        assert!(!sub.is_active());
        assert!(!sub.unsubscribe());
    }
}
