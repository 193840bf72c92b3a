//=========================================================================
// Timer
//=========================================================================
//
// Pure timer state machine. Operations report edges as `TimerSignal`s and
// never call out; callback dispatch belongs to the scheduler.
//
//   Idle ──start──> Running ──pause──> Paused
//    ▲                │  ▲               │
//    │                │  └────resume─────┘
//    │      stop / countdown expiry      │ stop
//    │                ▼                  ▼
//    └──start── Stopped <────────────────┘
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::{TimerSignal, TimerState, TimerVariant};
use crate::core::pool::Poolable;

/// Relative slack below which a countdown counts as expired. Absorbs the
/// representation error of `f32` frame deltas that sum to the duration.
const EXPIRY_TOLERANCE: f64 = 1e-6;

//=== Timer ===============================================================

/// Countdown or stopwatch driven by explicit `tick(dt)` calls.
///
/// A stopped timer keeps its last time value until it is started or reset.
/// Time accumulates in `f64` so long runs of small deltas do not drift.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    variant: TimerVariant,
    state: TimerState,
    initial: f32,
    time: f64,
    active: bool,
}

impl Timer {
    pub fn new(variant: TimerVariant, initial: f32) -> Self {
        Self {
            variant,
            state: TimerState::Idle,
            initial,
            time: f64::from(initial),
            active: false,
        }
    }

    pub fn countdown(initial: f32) -> Self {
        Self::new(TimerVariant::Countdown, initial)
    }

    pub fn stopwatch() -> Self {
        Self::new(TimerVariant::Stopwatch, 0.0)
    }

    //--- Run Control ------------------------------------------------------

    /// Starts (or restarts) the run.
    ///
    /// A given `duration` replaces the initial value. Either way the time is
    /// rewound to the initial value. Restarting a timer that is still inside
    /// its run (running or paused) does not report `Started` again.
    pub fn start(&mut self, duration: Option<f32>) -> Option<TimerSignal> {
        match duration {
            Some(duration) => self.reset_to(duration),
            None => self.time = f64::from(self.initial),
        }

        let in_run = matches!(self.state, TimerState::Running | TimerState::Paused);
        self.state = TimerState::Running;

        if in_run {
            None
        } else {
            Some(TimerSignal::Started)
        }
    }

    /// Ends the run. Only reports `Stopped` if the timer was inside a run.
    pub fn stop(&mut self) -> Option<TimerSignal> {
        match self.state {
            TimerState::Running | TimerState::Paused => {
                self.state = TimerState::Stopped;
                Some(TimerSignal::Stopped)
            }
            TimerState::Idle | TimerState::Stopped => None,
        }
    }

    /// Freezes a running timer. Returns false if it was not running.
    pub fn pause(&mut self) -> bool {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
            true
        } else {
            false
        }
    }

    /// Unfreezes a paused timer. Returns false if it was not paused.
    pub fn resume(&mut self) -> bool {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
            true
        } else {
            false
        }
    }

    /// Advances the timer by `dt` seconds.
    ///
    /// A countdown stops on the tick where the deltas sum to its duration:
    /// it clamps to zero, stops itself and reports `Stopped`. Stopwatches
    /// never stop on their own.
    pub fn tick(&mut self, dt: f32) -> Option<TimerSignal> {
        if self.state != TimerState::Running {
            return None;
        }

        match self.variant {
            TimerVariant::Countdown => {
                self.time -= f64::from(dt);
                let slack = EXPIRY_TOLERANCE * f64::from(self.initial).max(1.0);
                if self.time <= slack {
                    self.time = 0.0;
                    self.state = TimerState::Stopped;
                    return Some(TimerSignal::Stopped);
                }
            }
            TimerVariant::Stopwatch => self.time += f64::from(dt),
        }

        None
    }

    //--- Reset ------------------------------------------------------------

    /// Rewinds without changing the run state: countdowns to their initial
    /// value, stopwatches to zero.
    pub fn reset(&mut self) {
        self.time = match self.variant {
            TimerVariant::Countdown => f64::from(self.initial),
            TimerVariant::Stopwatch => 0.0,
        };
    }

    /// Replaces the initial value and rewinds to it.
    pub fn reset_to(&mut self, initial: f32) {
        self.initial = initial;
        self.time = f64::from(initial);
    }

    /// Puts a recycled timer back into a fresh idle state.
    pub(crate) fn configure(&mut self, initial: f32) {
        self.state = TimerState::Idle;
        self.reset_to(initial);
    }

    //--- Queries ----------------------------------------------------------

    pub fn variant(&self) -> TimerVariant {
        self.variant
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn initial(&self) -> f32 {
        self.initial
    }

    /// Remaining time for countdowns, accumulated time for stopwatches.
    pub fn time(&self) -> f32 {
        self.time as f32
    }

    /// Time spent in the current run.
    pub fn elapsed(&self) -> f32 {
        match self.variant {
            TimerVariant::Countdown => (f64::from(self.initial) - self.time) as f32,
            TimerVariant::Stopwatch => self.time as f32,
        }
    }

    /// `time / initial`, defined only when the initial value is positive.
    pub fn progress(&self) -> Option<f32> {
        (self.initial > 0.0).then(|| (self.time / f64::from(self.initial)) as f32)
    }

    /// True once a countdown has run out. Stopwatches never finish.
    pub fn is_finished(&self) -> bool {
        self.variant == TimerVariant::Countdown
            && self.state == TimerState::Stopped
            && self.time <= 0.0
    }
}

impl Poolable for Timer {
    fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.state = TimerState::Idle;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    //--- Countdown --------------------------------------------------------

    #[test]
    fn countdown_stops_exactly_once_at_zero() {
        let mut timer = Timer::countdown(1.0);
        assert_eq!(timer.start(None), Some(TimerSignal::Started));

        let mut stops = 0;
        for _ in 0..20 {
            if timer.tick(0.1) == Some(TimerSignal::Stopped) {
                stops += 1;
            }
        }

        assert_eq!(stops, 1);
        assert_eq!(timer.time(), 0.0);
        assert!(timer.is_finished());
        assert_eq!(timer.progress(), Some(0.0));
    }

    #[test]
    fn countdown_is_deterministic_for_identical_ticks() {
        let run = || {
            let mut timer = Timer::countdown(0.5);
            timer.start(None);
            (1..=10)
                .find(|_| timer.tick(1.0 / 60.0) == Some(TimerSignal::Stopped))
                .map(|_| timer.time())
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.is_none());
    }

    #[test]
    fn countdown_stops_on_the_tick_where_frame_deltas_reach_the_duration() {
        let dt = 1.0 / 60.0;
        for (duration, frames) in [(2.0, 120), (3.0, 180), (0.15, 9)] {
            let mut timer = Timer::countdown(duration);
            timer.start(None);
            let stopped_at = (1..=frames + 5).find(|_| timer.tick(dt) == Some(TimerSignal::Stopped));
            assert_eq!(stopped_at, Some(frames), "duration {}", duration);
        }

        let mut timer = Timer::countdown(1.4);
        timer.start(None);
        assert_eq!(timer.tick(0.7), None);
        assert_eq!(timer.tick(0.7), Some(TimerSignal::Stopped));
    }

    #[test]
    fn zero_duration_countdown_stops_on_first_tick() {
        let mut timer = Timer::countdown(0.0);
        timer.start(None);
        assert_eq!(timer.progress(), None);
        assert_eq!(timer.tick(0.0), Some(TimerSignal::Stopped));
    }

    #[test]
    fn start_with_duration_replaces_initial() {
        let mut timer = Timer::countdown(3.0);
        timer.start(Some(1.5));
        assert_eq!(timer.initial(), 1.5);
        timer.tick(0.5);
        assert_eq!(timer.time(), 1.0);
        assert!((timer.elapsed() - 0.5).abs() < f32::EPSILON);
    }

    //--- Restart ----------------------------------------------------------

    #[test]
    fn restarting_a_running_timer_reports_start_once() {
        let mut timer = Timer::countdown(2.0);
        assert_eq!(timer.start(None), Some(TimerSignal::Started));
        timer.tick(1.0);
        assert_eq!(timer.start(None), None);
        assert_eq!(timer.time(), 2.0);
        assert!(timer.is_running());
    }

    #[test]
    fn stopped_timer_keeps_its_time_and_restarts_with_signal() {
        let mut timer = Timer::countdown(2.0);
        timer.start(None);
        timer.tick(0.5);
        assert_eq!(timer.stop(), Some(TimerSignal::Stopped));
        assert_eq!(timer.time(), 1.5);
        assert_eq!(timer.stop(), None);
        assert_eq!(timer.start(None), Some(TimerSignal::Started));
    }

    //--- Pause ------------------------------------------------------------

    #[test]
    fn paused_timer_ignores_ticks_but_can_be_stopped() {
        let mut timer = Timer::countdown(1.0);
        timer.start(None);
        assert!(timer.pause());
        assert_eq!(timer.tick(5.0), None);
        assert_eq!(timer.time(), 1.0);
        assert!(timer.resume());
        assert!(!timer.resume());
        timer.pause();
        assert_eq!(timer.stop(), Some(TimerSignal::Stopped));
    }

    #[test]
    fn idle_timer_cannot_be_paused() {
        let mut timer = Timer::countdown(1.0);
        assert!(!timer.pause());
        assert_eq!(timer.tick(1.0), None);
        assert_eq!(timer.state(), TimerState::Idle);
    }

    //--- Stopwatch --------------------------------------------------------

    #[test]
    fn stopwatch_counts_up_until_stopped() {
        let mut watch = Timer::stopwatch();
        watch.start(None);
        for _ in 0..4 {
            assert_eq!(watch.tick(0.25), None);
        }
        assert_eq!(watch.elapsed(), 1.0);
        assert!(!watch.is_finished());

        watch.reset();
        assert_eq!(watch.time(), 0.0);
        assert!(watch.is_running());
    }
}
