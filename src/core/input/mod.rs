//=========================================================================
// Input Surface
//
// Abstract per-frame controls the core polls from the host.
//
// Responsibilities:
// - Define the frame snapshot the player controller consumes
// - Define the `InputSource` contract hosts implement
// - Provide `SharedInput`, a settable source for hosts that push state
//
// Notes:
// Device specifics (keyboard, touch joystick, gamepad) stay in the host.
// The core only ever sees the five values in `InputSnapshot`.
//
//=========================================================================

//=== Standard Library Imports ============================================
use std::cell::Cell;

//=== InputSnapshot =======================================================
//
// Controls sampled once per frame.
//
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSnapshot {
    /// Signed turn magnitude in `[-1, 1]`; positive turns counter-clockwise.
    pub rotation: f32,
    pub thrust: bool,
    pub fire: bool,
    pub hyperspace: bool,
    /// Any control touched this frame.
    pub any_input: bool,
}

impl InputSnapshot {
    /// Snapshot with `any_input` derived from the other fields.
    pub fn new(rotation: f32, thrust: bool, fire: bool, hyperspace: bool) -> Self {
        Self {
            rotation,
            thrust,
            fire,
            hyperspace,
            any_input: rotation != 0.0 || thrust || fire || hyperspace,
        }
    }
}

//=== InputSource =========================================================
//
// Host-side provider polled by the engine once per frame.
//
pub trait InputSource {
    fn poll(&self) -> InputSnapshot;
}

//=== SharedInput =========================================================
//
// Input source whose snapshot the host overwrites between frames.
// The snapshot persists until replaced, like a held key.
//
#[derive(Debug, Default)]
pub struct SharedInput {
    snapshot: Cell<InputSnapshot>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, snapshot: InputSnapshot) {
        self.snapshot.set(snapshot);
    }

    pub fn clear(&self) {
        self.snapshot.set(InputSnapshot::default());
    }
}

impl InputSource for SharedInput {
    fn poll(&self) -> InputSnapshot {
        self.snapshot.get()
    }
}

//=========================================================================
// Tests
//=========================================================================
