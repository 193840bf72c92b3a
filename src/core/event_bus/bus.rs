//=========================================================================
// Event Bus
//=========================================================================
//
// Shared, reentrancy-safe registry of typed event handlers.
//
// Pattern: subscribe → publish (snapshot, then invoke) → unsubscribe
//
// Handlers may subscribe, unsubscribe and publish from inside a dispatch.
// A dispatch always runs the handlers that were registered when it began.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::type_name;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::error;

//=== Internal Dependencies ===============================================

use super::handler_list::{Handler, HandlerList, Registration};
use super::{Event, EventError, EventKind};

//=== Subscription ========================================================

/// Identity of one registered handler; pass it back to
/// [`EventBus::unsubscribe`] to remove exactly that handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

//=== EventBus ============================================================

struct BusState {
    handlers: HashMap<EventKind, Box<dyn HandlerList>>,
    next_id: u64,
}

/// Cloneable handle to a shared event registry.
#[derive(Clone)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                handlers: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Appends a handler to the registry for `E`'s kind.
    ///
    /// Fails if the kind is already bound to a different payload type.
    pub fn subscribe<E, F>(&self, handler: F) -> Result<Subscription, EventError>
    where
        E: Event,
        F: Fn(&E) + 'static,
    {
        let kind = E::kind();
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let list = state
            .handlers
            .entry(kind)
            .or_insert_with(|| Box::new(Vec::<Registration<E>>::new()));
        let registered = list.payload_type();

        let Some(list) = list.as_any_mut().downcast_mut::<Vec<Registration<E>>>() else {
            let err = mismatch::<E>(kind, registered);
            error!("{}", err);
            return Err(err);
        };

        let id = state.next_id;
        list.push(Registration {
            id,
            handler: Rc::new(handler),
        });
        state.next_id += 1;

        Ok(Subscription { kind, id })
    }

    /// Removes exactly the handler registered under `subscription`.
    ///
    /// Removing a kind's last handler frees its registry entry. Returns false
    /// if the handler was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(list) = state.handlers.get_mut(&subscription.kind) else {
            return false;
        };

        let removed = list.remove(subscription.id);
        if list.is_empty() {
            state.handlers.remove(&subscription.kind);
        }
        removed
    }

    /// Drops every registration.
    pub fn clear(&self) {
        self.state.borrow_mut().handlers.clear();
    }

    //--- Dispatch ---------------------------------------------------------

    /// Invokes every handler for `E`'s kind in registration order and returns
    /// how many ran.
    ///
    /// # Panics
    ///
    /// Panics if the kind is bound to a different payload type. That is a
    /// wiring bug, never a runtime condition; use [`EventBus::try_publish`]
    /// to observe it as an error instead.
    pub fn publish<E: Event>(&self, event: E) -> usize {
        match self.try_publish(event) {
            Ok(invoked) => invoked,
            Err(err) => {
                error!("{}", err);
                panic!("{}", err);
            }
        }
    }

    /// Like [`EventBus::publish`] but reports a payload mismatch as an error.
    ///
    /// Publishing a kind nobody subscribed to is a no-op returning `Ok(0)`.
    pub fn try_publish<E: Event>(&self, event: E) -> Result<usize, EventError> {
        let kind = E::kind();

        let handlers: Vec<Handler<E>> = {
            let state = self.state.borrow();
            let Some(list) = state.handlers.get(&kind) else {
                return Ok(0);
            };
            match list.as_any().downcast_ref::<Vec<Registration<E>>>() {
                Some(list) => list.iter().map(|r| r.handler.clone()).collect(),
                None => return Err(mismatch::<E>(kind, list.payload_type())),
            }
        };

        for handler in &handlers {
            handler(&event);
        }

        Ok(handlers.len())
    }

    //--- Query API --------------------------------------------------------

    /// Number of handlers registered for `E`'s kind.
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.state
            .borrow()
            .handlers
            .get(&E::kind())
            .map(|list| list.len())
            .unwrap_or(0)
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.subscriber_count::<E>() > 0
    }

    /// Number of kinds with at least one handler.
    pub fn kind_count(&self) -> usize {
        self.state.borrow().handlers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn mismatch<E: Event>(kind: EventKind, registered: &'static str) -> EventError {
    EventError::TypeMismatch {
        kind,
        expected: registered,
        found: type_name::<E>(),
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, PartialEq)]
    struct Scored {
        points: u32,
    }
    impl Event for Scored {}

    #[derive(Debug)]
    struct Cleared;
    impl Event for Cleared {}

    /// Claims `Scored`'s kind with a different payload.
    struct Impostor;
    impl Event for Impostor {
        fn kind() -> EventKind {
            Scored::kind()
        }
    }

    //--- Fan-out ----------------------------------------------------------

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(Cleared), 0);
        assert!(!bus.has_subscribers::<Cleared>());
    }

    #[test]
    fn fan_out_reaches_every_handler_in_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..4 {
            let seen = seen.clone();
            bus.subscribe(move |e: &Scored| seen.borrow_mut().push((tag, e.points)))
                .unwrap();
        }

        assert_eq!(bus.publish(Scored { points: 20 }), 4);
        assert_eq!(*seen.borrow(), vec![(0, 20), (1, 20), (2, 20), (3, 20)]);
    }

    #[test]
    fn same_closure_subscribed_twice_runs_twice() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let handler = {
            let count = count.clone();
            Rc::new(move |_: &Cleared| count.set(count.get() + 1))
        };

        let (a, b) = (handler.clone(), handler.clone());
        let first = bus.subscribe(move |e: &Cleared| a(e)).unwrap();
        bus.subscribe(move |e: &Cleared| b(e)).unwrap();
        bus.publish(Cleared);
        assert_eq!(count.get(), 2);

        assert!(bus.unsubscribe(first));
        bus.publish(Cleared);
        assert_eq!(count.get(), 3);
    }

    //--- Reentrancy -------------------------------------------------------

    #[test]
    fn unsubscribe_mid_dispatch_keeps_the_in_flight_snapshot() {
        let bus = EventBus::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let victim: Rc<Cell<Option<Subscription>>> = Rc::new(Cell::new(None));

        {
            let (bus2, calls, victim) = (bus.clone(), calls.clone(), victim.clone());
            bus.subscribe(move |_: &Cleared| {
                calls.borrow_mut().push("first");
                if let Some(sub) = victim.take() {
                    bus2.unsubscribe(sub);
                }
            })
            .unwrap();
        }
        {
            let calls = calls.clone();
            let sub = bus
                .subscribe(move |_: &Cleared| calls.borrow_mut().push("second"))
                .unwrap();
            victim.set(Some(sub));
        }

        assert_eq!(bus.publish(Cleared), 2);
        assert_eq!(*calls.borrow(), vec!["first", "second"]);

        assert_eq!(bus.publish(Cleared), 1);
        assert_eq!(bus.subscriber_count::<Cleared>(), 1);
    }

    #[test]
    fn subscribe_mid_dispatch_applies_to_the_next_publish() {
        let bus = EventBus::new();
        let late = Rc::new(Cell::new(0));

        {
            let (bus2, late) = (bus.clone(), late.clone());
            bus.subscribe(move |_: &Cleared| {
                let late = late.clone();
                bus2.subscribe(move |_: &Cleared| late.set(late.get() + 1))
                    .unwrap();
            })
            .unwrap();
        }

        assert_eq!(bus.publish(Cleared), 1);
        assert_eq!(late.get(), 0);
        assert_eq!(bus.publish(Cleared), 2);
        assert_eq!(late.get(), 1);
    }

    #[test]
    fn handlers_may_publish_other_events() {
        let bus = EventBus::new();
        let total = Rc::new(Cell::new(0));

        {
            let bus2 = bus.clone();
            bus.subscribe(move |_: &Cleared| {
                bus2.publish(Scored { points: 100 });
            })
            .unwrap();
        }
        {
            let total = total.clone();
            bus.subscribe(move |e: &Scored| total.set(total.get() + e.points))
                .unwrap();
        }

        bus.publish(Cleared);
        assert_eq!(total.get(), 100);
    }

    //--- Registry Entries -------------------------------------------------

    #[test]
    fn removing_the_last_handler_frees_the_entry() {
        let bus = EventBus::new();
        let sub = bus.subscribe(|_: &Cleared| {}).unwrap();
        assert_eq!(bus.kind_count(), 1);

        assert!(bus.unsubscribe(sub));
        assert_eq!(bus.kind_count(), 0);
        assert!(!bus.unsubscribe(sub));
    }

    //--- Type Mismatch ----------------------------------------------------

    #[test]
    fn subscribing_a_conflicting_payload_fails() {
        let bus = EventBus::new();
        bus.subscribe(|_: &Scored| {}).unwrap();

        let err = bus.subscribe(|_: &Impostor| {}).unwrap_err();
        assert!(matches!(err, EventError::TypeMismatch { .. }));
        assert_eq!(bus.subscriber_count::<Scored>(), 1);
    }

    #[test]
    fn try_publish_reports_payload_mismatch() {
        let bus = EventBus::new();
        bus.subscribe(|_: &Scored| {}).unwrap();
        assert!(bus.try_publish(Impostor).is_err());
    }

    #[test]
    #[should_panic(expected = "Event type mismatch")]
    fn publish_panics_on_payload_mismatch() {
        let bus = EventBus::new();
        bus.subscribe(|_: &Scored| {}).unwrap();
        bus.publish(Impostor);
    }
}
