//=========================================================================
// Timers
//=========================================================================
//
// Cooperative, frame-driven timers.
//
// Architecture:
//   Engine::advance(dt) ──> TimerScheduler::advance(dt)
//                                │
//                                ├─ Pool<Countdown timers> ─┐
//                                └─ Pool<Stopwatch timers> ─┴─> Timer::tick(dt)
//                                                                   │
//                                            TimerSignal::Stopped ──┘
//                                                   │
//                                                   └─> on_stop callbacks
//
// `Timer` is a pure state machine that reports signals. The scheduler owns
// callbacks and turns signals into invocations, always with its own borrow
// released so callbacks may create, start, stop or release timers.
//
//=========================================================================

//=== Module Declarations =================================================

mod clock;
mod scheduler;

//=== Public API ==========================================================

pub use clock::Timer;
pub use scheduler::TimerScheduler;

use super::pool::{PoolError, PoolHandle};

//=== TimerVariant ========================================================

/// Timer flavour. Each variant is served by its own pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerVariant {
    /// Counts down from its initial value and stops itself at zero.
    Countdown,

    /// Counts up without bound until stopped.
    Stopwatch,
}

//=== TimerState ==========================================================

/// Run state of a [`Timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    /// Configured but never started.
    #[default]
    Idle,
    Running,
    /// Started and frozen; still inside its run.
    Paused,
    /// Run finished, either explicitly or by expiry.
    Stopped,
}

//=== TimerSignal =========================================================

/// Edge reported by a [`Timer`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    Started,
    Stopped,
}

//=== Handles =============================================================

/// Key to a timer owned by a [`TimerScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    variant: TimerVariant,
    slot: PoolHandle,
}

impl TimerHandle {
    pub(crate) fn new(variant: TimerVariant, slot: PoolHandle) -> Self {
        Self { variant, slot }
    }

    pub fn variant(self) -> TimerVariant {
        self.variant
    }

    pub(crate) fn slot(self) -> PoolHandle {
        self.slot
    }
}

/// Identity of a registered start/stop callback, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

//=== TimerError ==========================================================

/// Timer scheduling errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// No pool was registered for the requested variant.
    UnknownVariant(TimerVariant),

    /// The handle's timer has already been released.
    InvalidHandle,

    /// The variant's pool refused the allocation.
    Pool(PoolError),
}

impl std::fmt::Display for TimerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownVariant(variant) => write!(f, "Unknown timer variant: {:?}", variant),
            Self::InvalidHandle => write!(f, "Timer handle no longer refers to a live timer"),
            Self::Pool(e) => write!(f, "Timer pool error: {}", e),
        }
    }
}

impl std::error::Error for TimerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for TimerError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}
