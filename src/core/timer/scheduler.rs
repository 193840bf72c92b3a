//=========================================================================
// Timer Scheduler
//=========================================================================
//
// Shared owner of every live timer. Timers are allocated from per-variant
// pools and ticked once per frame in allocation order.
//
// Dispatch rule: no `RefCell` borrow is held while a callback runs. Callback
// lists are cloned (cheap `Rc` clones) before invocation, so a callback may
// freely call back into the scheduler.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

//=== Internal Dependencies ===============================================

use super::{CallbackId, Timer, TimerError, TimerHandle, TimerSignal, TimerState, TimerVariant};
use crate::core::pool::{Pool, PoolConfig, Poolable};

//=== Scheduled Timer =====================================================

type Callback = Rc<dyn Fn()>;
type CallbackList = Vec<(CallbackId, Callback)>;

/// Pool payload: a timer plus its callback lists.
struct ScheduledTimer {
    timer: Timer,
    /// Serial of the latest `start` call; a frame only ticks the run it saw.
    run: u64,
    on_start: CallbackList,
    on_stop: CallbackList,
}

impl Poolable for ScheduledTimer {
    fn set_active(&mut self, active: bool) {
        self.timer.set_active(active);
    }

    fn is_active(&self) -> bool {
        self.timer.is_active()
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Start,
    Stop,
}

//=== Scheduler State =====================================================

struct SchedulerState {
    pools: HashMap<TimerVariant, Pool<ScheduledTimer>>,
    live: Vec<TimerHandle>,
    next_callback: u64,
    next_run: u64,
}

impl SchedulerState {
    fn entry(&self, handle: TimerHandle) -> Option<&ScheduledTimer> {
        self.pools.get(&handle.variant())?.get(handle.slot())
    }

    fn entry_mut(&mut self, handle: TimerHandle) -> Option<&mut ScheduledTimer> {
        self.pools.get_mut(&handle.variant())?.get_mut(handle.slot())
    }
}

//=== TimerScheduler ======================================================

/// Cloneable handle to the shared timer scheduler.
///
/// Clones refer to the same timers; pass clones to every component that
/// needs delays.
#[derive(Clone)]
pub struct TimerScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl TimerScheduler {
    /// Creates a scheduler with no registered variants.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState {
                pools: HashMap::new(),
                live: Vec::new(),
                next_callback: 0,
                next_run: 0,
            })),
        }
    }

    /// Creates a scheduler with both variants registered on soft-capped pools.
    pub fn with_default_variants(pool_capacity: usize) -> Self {
        let scheduler = Self::new();
        scheduler.register_variant(TimerVariant::Countdown, PoolConfig::soft(pool_capacity));
        scheduler.register_variant(TimerVariant::Stopwatch, PoolConfig::soft(pool_capacity));
        scheduler
    }

    /// Registers (or replaces) the pool serving `variant`.
    pub fn register_variant(&self, variant: TimerVariant, config: PoolConfig) {
        let pool = Pool::new(config, move || ScheduledTimer {
            timer: Timer::new(variant, 0.0),
            run: 0,
            on_start: Vec::new(),
            on_stop: Vec::new(),
        })
        .on_release(|entry: &mut ScheduledTimer| {
            entry.on_start.clear();
            entry.on_stop.clear();
        });

        let mut state = self.state.borrow_mut();
        state.live.retain(|handle| handle.variant() != variant);
        state.pools.insert(variant, pool);
        debug!("Registered timer variant {:?} (capacity {})", variant, config.capacity);
    }

    //--- Allocation -------------------------------------------------------

    /// Allocates an idle timer with the given initial value.
    pub fn create(&self, variant: TimerVariant, initial: f32) -> Result<TimerHandle, TimerError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let pool = state
            .pools
            .get_mut(&variant)
            .ok_or(TimerError::UnknownVariant(variant))?;
        let slot = pool.acquire()?;
        if let Some(entry) = pool.get_mut(slot) {
            entry.timer.configure(initial);
        }

        let handle = TimerHandle::new(variant, slot);
        state.live.push(handle);
        Ok(handle)
    }

    /// Stops (firing on-stop if the timer was inside a run) and releases a
    /// timer back to its pool. Its callbacks are dropped.
    pub fn release(&self, handle: TimerHandle) -> Result<(), TimerError> {
        self.stop(handle)?;

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        // A stop callback may already have released this timer.
        let Some(pool) = state.pools.get_mut(&handle.variant()) else {
            return Err(TimerError::InvalidHandle);
        };
        if !pool.contains(handle.slot()) {
            return Ok(());
        }
        pool.release(handle.slot())?;
        state.live.retain(|live| *live != handle);
        Ok(())
    }

    /// Stops and releases every live timer.
    pub fn clear(&self) {
        let handles = self.state.borrow().live.clone();
        for handle in handles {
            // Earlier callbacks may have released later timers.
            let _ = self.release(handle);
        }
    }

    //--- Run Control ------------------------------------------------------

    /// Starts or restarts a timer, optionally with a new duration.
    pub fn start(&self, handle: TimerHandle, duration: Option<f32>) -> Result<(), TimerError> {
        let signal = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            if !state.pools.contains_key(&handle.variant()) {
                return Err(TimerError::UnknownVariant(handle.variant()));
            }

            let run = state.next_run;
            let entry = state.entry_mut(handle).ok_or(TimerError::InvalidHandle)?;
            entry.run = run;
            let signal = entry.timer.start(duration);
            state.next_run += 1;
            signal
        };
        self.dispatch(handle, signal);
        Ok(())
    }

    /// Stops a timer. On-stop fires only if it was running or paused.
    pub fn stop(&self, handle: TimerHandle) -> Result<(), TimerError> {
        let signal = self.update(handle, Timer::stop)?;
        self.dispatch(handle, signal);
        Ok(())
    }

    pub fn pause(&self, handle: TimerHandle) -> Result<bool, TimerError> {
        self.update(handle, Timer::pause)
    }

    pub fn resume(&self, handle: TimerHandle) -> Result<bool, TimerError> {
        self.update(handle, Timer::resume)
    }

    /// Rewinds a timer without touching its run state.
    pub fn reset(&self, handle: TimerHandle) -> Result<(), TimerError> {
        self.update(handle, Timer::reset)
    }

    //--- Callbacks --------------------------------------------------------

    /// Appends a callback fired whenever the timer starts a new run.
    pub fn on_start<F>(&self, handle: TimerHandle, callback: F) -> Result<CallbackId, TimerError>
    where
        F: Fn() + 'static,
    {
        self.add_callback(handle, Phase::Start, Rc::new(callback))
    }

    /// Appends a callback fired whenever the timer's run ends.
    pub fn on_stop<F>(&self, handle: TimerHandle, callback: F) -> Result<CallbackId, TimerError>
    where
        F: Fn() + 'static,
    {
        self.add_callback(handle, Phase::Stop, Rc::new(callback))
    }

    /// Removes a callback by identity. Returns false if it was not found.
    pub fn remove_callback(&self, handle: TimerHandle, id: CallbackId) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(entry) = state.entry_mut(handle) else {
            return false;
        };

        let before = entry.on_start.len() + entry.on_stop.len();
        entry.on_start.retain(|(callback_id, _)| *callback_id != id);
        entry.on_stop.retain(|(callback_id, _)| *callback_id != id);
        before != entry.on_start.len() + entry.on_stop.len()
    }

    //--- Frame Tick -------------------------------------------------------

    /// Ticks every allocated timer once, running stop callbacks of expired
    /// countdowns as they expire.
    ///
    /// Only runs in progress when the call begins are ticked. Timers created,
    /// started or restarted by callbacks during this call first advance on
    /// the next frame.
    pub fn advance(&self, dt: f32) {
        let runs: Vec<(TimerHandle, u64)> = {
            let state = self.state.borrow();
            state
                .live
                .iter()
                .filter_map(|handle| {
                    let entry = state.entry(*handle)?;
                    entry.timer.is_running().then_some((*handle, entry.run))
                })
                .collect()
        };

        for (handle, run) in runs {
            let signal = {
                let mut state = self.state.borrow_mut();
                match state.entry_mut(handle) {
                    Some(entry) if entry.run == run => entry.timer.tick(dt),
                    _ => continue,
                }
            };
            self.dispatch(handle, signal);
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Remaining (countdown) or accumulated (stopwatch) time.
    pub fn remaining(&self, handle: TimerHandle) -> Option<f32> {
        self.state.borrow().entry(handle).map(|entry| entry.timer.time())
    }

    pub fn progress(&self, handle: TimerHandle) -> Option<f32> {
        self.state
            .borrow()
            .entry(handle)
            .and_then(|entry| entry.timer.progress())
    }

    pub fn state(&self, handle: TimerHandle) -> Option<TimerState> {
        self.state.borrow().entry(handle).map(|entry| entry.timer.state())
    }

    pub fn is_running(&self, handle: TimerHandle) -> bool {
        self.state(handle) == Some(TimerState::Running)
    }

    /// Returns true while the handle refers to an allocated timer.
    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.state.borrow().entry(handle).is_some()
    }

    /// Number of allocated timers across all variants.
    pub fn live_count(&self) -> usize {
        self.state.borrow().live.len()
    }

    //--- Internal Helpers -------------------------------------------------

    fn update<R>(
        &self,
        handle: TimerHandle,
        op: impl FnOnce(&mut Timer) -> R,
    ) -> Result<R, TimerError> {
        let mut state = self.state.borrow_mut();
        if !state.pools.contains_key(&handle.variant()) {
            return Err(TimerError::UnknownVariant(handle.variant()));
        }
        let entry = state.entry_mut(handle).ok_or(TimerError::InvalidHandle)?;
        Ok(op(&mut entry.timer))
    }

    fn add_callback(
        &self,
        handle: TimerHandle,
        phase: Phase,
        callback: Callback,
    ) -> Result<CallbackId, TimerError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let id = CallbackId::new(state.next_callback);
        let entry = state.entry_mut(handle).ok_or(TimerError::InvalidHandle)?;
        match phase {
            Phase::Start => entry.on_start.push((id, callback)),
            Phase::Stop => entry.on_stop.push((id, callback)),
        }
        state.next_callback += 1;
        Ok(id)
    }

    fn dispatch(&self, handle: TimerHandle, signal: Option<TimerSignal>) {
        let phase = match signal {
            Some(TimerSignal::Started) => Phase::Start,
            Some(TimerSignal::Stopped) => Phase::Stop,
            None => return,
        };

        let callbacks: Vec<Callback> = {
            let state = self.state.borrow();
            let Some(entry) = state.entry(handle) else {
                return;
            };
            let list = match phase {
                Phase::Start => &entry.on_start,
                Phase::Stop => &entry.on_stop,
            };
            list.iter().map(|(_, callback)| callback.clone()).collect()
        };

        for callback in callbacks {
            callback();
        }
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Tests
//=========================================================================
