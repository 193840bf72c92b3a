//=========================================================================
// Object Pool
//=========================================================================
//
// Fixed-capacity recycler for frequently churned entities.
//
// Architecture:
//   acquire() ──> free list? ──yes──> reuse slot (on_acquire)
//                     │
//                     no ──> under capacity / Grow? ──> factory() (on_acquire)
//                                   │
//                                   no ──> PoolError::Exhausted
//
//   release(handle) ──> on_release ──> over capacity? ──> evict (on_evict)
//                                            │
//                                            no ──> free list
//
// Handles are generational: every release bumps the slot generation, so a
// handle can release its slot at most once.
//
//=========================================================================

//=== Module Declarations =================================================

mod object_pool;

//=== Public API ==========================================================

pub use object_pool::{Overflow, Pool, PoolConfig};

//=== Poolable Trait ======================================================

/// Lifecycle contract for anything stored in a [`Pool`].
///
/// The pool activates an item when it is handed out and deactivates it when
/// it comes back, so an item sitting on the free list is never active.
pub trait Poolable {
    /// Flips the item's active flag.
    fn set_active(&mut self, active: bool);

    /// Returns the item's active flag.
    fn is_active(&self) -> bool;
}

//=== PoolHandle ==========================================================

/// Non-owning key to a pooled item.
///
/// The pool owns the storage; holders of a handle only look the item up.
/// A handle stops resolving as soon as its item is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Storage slot index.
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation the slot had when this handle was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

//=== PoolError ===========================================================

/// Entity-lifecycle errors raised by [`Pool`].
///
/// All of these are locally recoverable: the caller skips the spawn or the
/// release and the frame continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Acquire requested beyond a hard capacity.
    Exhausted { capacity: usize },

    /// The handle's item was already returned to the pool.
    DoubleRelease { index: usize },

    /// The handle does not belong to this pool.
    ForeignHandle { index: usize },
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted { capacity } => {
                write!(f, "Pool exhausted (hard capacity {})", capacity)
            }
            Self::DoubleRelease { index } => {
                write!(f, "Pool slot {} released twice", index)
            }
            Self::ForeignHandle { index } => {
                write!(f, "Handle to slot {} does not belong to this pool", index)
            }
        }
    }
}

impl std::error::Error for PoolError {}
