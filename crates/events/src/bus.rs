use crate::event::{Event, EventKind};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Error returned by a listener that could not handle an event.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Summary of one [`EventBus::post`] fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Listeners that handled the event successfully.
    pub delivered: usize,
    /// Listeners that returned an error.
    pub failed: usize,
}

type Listener = Rc<dyn Fn(&Event) -> Result<(), ListenerError>>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    listener: Listener,
}

/// Process-wide event dispatcher.
///
/// One instance is created at startup and shared as `Rc<EventBus>` with every
/// component that posts or subscribes. The bus is single-threaded (`!Send`);
/// it lives and dies with the thread that owns the graphics context.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) -> Result<(), ListenerError> + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            kind,
            listener: Rc::new(listener),
        });
        tracing::debug!(?kind, subscription = id.0, "listener subscribed");
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.borrow_mut();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }

    /// Deliver `event` to every listener of its kind, in registration order.
    ///
    /// Listeners registered while the event is being delivered do not see it.
    pub fn post(&self, event: &Event) -> Dispatch {
        let kind = event.kind();
        // Snapshot so listeners may subscribe or post re-entrantly.
        let listeners: Vec<Listener> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Rc::clone(&s.listener))
            .collect();

        let mut dispatch = Dispatch::default();
        for listener in listeners {
            match listener(event) {
                Ok(()) => dispatch.delivered += 1,
                Err(e) => {
                    tracing::warn!(?kind, "event listener failed: {e}");
                    dispatch.failed += 1;
                }
            }
        }
        tracing::debug!(?event, delivered = dispatch.delivered, "event posted");
        dispatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::WindowId;
    use glam::UVec2;

    fn resize(size: UVec2) -> Event {
        Event::WindowResize {
            window: WindowId(7),
            size,
        }
    }

    #[test]
    fn post_reaches_only_matching_kind() {
        let bus = EventBus::new();
        let resizes = Rc::new(Cell::new(0));
        let closes = Rc::new(Cell::new(0));

        let r = resizes.clone();
        bus.subscribe(EventKind::WindowResize, move |_| {
            r.set(r.get() + 1);
            Ok(())
        });
        let c = closes.clone();
        bus.subscribe(EventKind::WindowClose, move |_| {
            c.set(c.get() + 1);
            Ok(())
        });

        let dispatch = bus.post(&resize(UVec2::new(10, 20)));
        assert_eq!(dispatch.delivered, 1);
        assert_eq!(resizes.get(), 1);
        assert_eq!(closes.get(), 0);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..4 {
            let order = order.clone();
            bus.subscribe(EventKind::WindowClose, move |_| {
                order.borrow_mut().push(n);
                Ok(())
            });
        }
        bus.post(&Event::WindowClose {
            window: WindowId(1),
        });
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn failing_listener_does_not_block_later_ones() {
        let bus = EventBus::new();
        let reached = Rc::new(Cell::new(false));
        bus.subscribe(EventKind::WindowResize, |_| {
            Err(ListenerError::new("boom"))
        });
        let r = reached.clone();
        bus.subscribe(EventKind::WindowResize, move |_| {
            r.set(true);
            Ok(())
        });

        let dispatch = bus.post(&resize(UVec2::ONE));
        assert_eq!(dispatch, Dispatch { delivered: 1, failed: 1 });
        assert!(reached.get());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = bus.subscribe(EventKind::WindowResize, move |_| {
            h.set(h.get() + 1);
            Ok(())
        });
        bus.post(&resize(UVec2::ONE));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.post(&resize(UVec2::ONE));
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.listener_count(EventKind::WindowResize), 0);
    }

    #[test]
    fn listener_may_post_and_subscribe_reentrantly() {
        let bus = Rc::new(EventBus::new());
        let closes = Rc::new(Cell::new(0));

        let c = closes.clone();
        bus.subscribe(EventKind::WindowClose, move |_| {
            c.set(c.get() + 1);
            Ok(())
        });

        let inner = Rc::downgrade(&bus);
        bus.subscribe(EventKind::WindowResize, move |event| {
            if let Some(bus) = inner.upgrade() {
                bus.subscribe(EventKind::WindowResize, |_| Ok(()));
                bus.post(&Event::WindowClose {
                    window: event.window(),
                });
            }
            Ok(())
        });

        let dispatch = bus.post(&resize(UVec2::new(4, 4)));
        // The listener added during delivery is not part of this fan-out.
        assert_eq!(dispatch.delivered, 1);
        assert_eq!(closes.get(), 1);
        assert_eq!(bus.listener_count(EventKind::WindowResize), 2);
    }
}
