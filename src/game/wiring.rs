//=========================================================================
// Wiring Helpers
//=========================================================================
//
// Components keep their state behind an `Rc` and register bus handlers and
// timer callbacks that hold only a `Weak` to it. Dropping the component
// therefore drops its state even while registrations are still in place;
// orphaned handlers simply stop doing anything.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::rc::Rc;

//=== Internal Dependencies ===============================================

use crate::core::event_bus::{Event, EventBus, EventError, Subscription};
use crate::core::timer::{CallbackId, TimerError, TimerHandle, TimerScheduler};

//=== Bus =================================================================

/// Subscribes `handler` with a weak reference to `owner`.
pub(crate) fn subscribe_weak<S, E, F>(
    bus: &EventBus,
    owner: &Rc<S>,
    handler: F,
) -> Result<Subscription, EventError>
where
    S: 'static,
    E: Event,
    F: Fn(&Rc<S>, &E) + 'static,
{
    let weak = Rc::downgrade(owner);
    bus.subscribe(move |event: &E| {
        if let Some(owner) = weak.upgrade() {
            handler(&owner, event);
        }
    })
}

//=== Timers ==============================================================

/// Registers an on-stop callback with a weak reference to `owner`.
pub(crate) fn on_stop_weak<S, F>(
    timers: &TimerScheduler,
    timer: TimerHandle,
    owner: &Rc<S>,
    callback: F,
) -> Result<CallbackId, TimerError>
where
    S: 'static,
    F: Fn(&Rc<S>) + 'static,
{
    let weak = Rc::downgrade(owner);
    timers.on_stop(timer, move || {
        if let Some(owner) = weak.upgrade() {
            callback(&owner);
        }
    })
}

/// A timer together with the callback its owner registered on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OwnedTimer {
    pub(crate) handle: TimerHandle,
    pub(crate) callback: CallbackId,
}

impl OwnedTimer {
    /// Detaches the owner's callback, then releases the timer, so a running
    /// timer is cancelled without its owner reacting to the stop.
    pub(crate) fn release(self, timers: &TimerScheduler) {
        timers.remove_callback(self.handle, self.callback);
        // Already released timers are fine here.
        let _ = timers.release(self.handle);
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timer::TimerVariant;
    use std::cell::Cell;

    struct Tick;
    impl Event for Tick {}

    #[test]
    fn dropped_owner_silences_its_handlers() {
        let bus = EventBus::new();
        let owner = Rc::new(Cell::new(0));
        subscribe_weak(&bus, &owner, |owner, _: &Tick| owner.set(owner.get() + 1)).unwrap();

        bus.publish(Tick);
        assert_eq!(owner.get(), 1);

        drop(owner);
        assert_eq!(bus.publish(Tick), 1);
    }

    #[test]
    fn owned_timer_release_cancels_without_callback() {
        let timers = TimerScheduler::with_default_variants(4);
        let owner = Rc::new(Cell::new(0));
        let handle = timers.create(TimerVariant::Countdown, 1.0).unwrap();
        let callback = on_stop_weak(&timers, handle, &owner, |owner| owner.set(1)).unwrap();
        timers.start(handle, None).unwrap();

        OwnedTimer { handle, callback }.release(&timers);
        assert_eq!(owner.get(), 0);
        assert_eq!(timers.live_count(), 0);
    }
}
