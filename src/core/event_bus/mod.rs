//=========================================================================
// Event Bus
//=========================================================================
//
// Synchronous, typed publish/subscribe between game components.
//
// Architecture:
//   subscribe::<E>(handler) ──> HashMap<EventKind, Vec<Registration<E>>>
//                                              │
//   publish(E) ──> snapshot handlers ──────────┘
//                       │
//                       └─> handler(&E) in registration order
//
// The registry is type-erased behind `HandlerList`; each kind's list is
// downcast back to its concrete payload type at the call site.
//
//=========================================================================

//=== Module Declarations =================================================

mod bus;
mod handler_list;

//=== Public API ==========================================================

pub use bus::{EventBus, Subscription};

//=== Event Trait =========================================================

/// Marker trait for payloads that can travel over the [`EventBus`].
///
/// Opt in with `impl Event for MyEvent {}`. The event kind defaults to the
/// payload's type name; overriding [`Event::kind`] lets several payload
/// types claim the same kind, which the bus then reports as a mismatch.
pub trait Event: 'static {
    fn kind() -> EventKind
    where
        Self: Sized,
    {
        EventKind::of::<Self>()
    }
}

//=== EventKind ===========================================================

/// Type-level key identifying a category of published notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKind(&'static str);

impl EventKind {
    /// Kind named after the payload's type.
    pub fn of<E: 'static>() -> Self {
        Self(std::any::type_name::<E>())
    }

    /// Explicitly named kind.
    pub const fn named(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

//=== EventError ==========================================================

/// Wiring errors raised by the [`EventBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// A payload type does not match the handlers registered for its kind.
    TypeMismatch {
        kind: EventKind,
        expected: &'static str,
        found: &'static str,
    },
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeMismatch { kind, expected, found } => write!(
                f,
                "Event type mismatch for kind '{}': handlers expect {}, got {}",
                kind, expected, found
            ),
        }
    }
}

impl std::error::Error for EventError {}
