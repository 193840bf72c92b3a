//=========================================================================
// Platform Bridge Interface
//=========================================================================
//
// Host-to-core contract: the events a host pushes in and the collaborator
// traits the core calls out through.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashMap;

use glam::Vec2;

//=== Internal Dependencies ===============================================

use crate::game::EntityId;

//=== HostEvent ===========================================================

/// Events sent from the host (physics, UI, window) to the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// The physics collaborator detected contact between two entities.
    Collision(EntityId, EntityId),

    /// Restart button pressed.
    Restart,

    Pause,
    Resume,

    /// Host is shutting down; the next tick returns `TickControl::Exit`.
    Shutdown,
}

/// Commands extracted from a frame's host events, applied in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostCommand {
    Restart,
    Pause,
    Resume,
}

//=== Collaborators =======================================================

/// Rendering/physics side of an entity.
pub trait Presenter {
    /// Shows or hides an entity and enables or disables its collider.
    fn set_active(&self, entity: EntityId, active: bool);

    /// Moves an entity. `rotation` is in degrees.
    fn set_transform(&self, entity: EntityId, position: Vec2, rotation: f32);
}

/// Fire-and-forget sound playback.
pub trait AudioSink {
    fn play_clip(&self, name: &str);
}

/// Key/value persistence. Only the high score goes through here.
pub trait SettingsStore {
    fn get_i64(&self, key: &str, default: i64) -> i64;
    fn set_i64(&self, key: &str, value: i64);
}

//=== Default Collaborators ===============================================

/// Presenter that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn set_active(&self, _entity: EntityId, _active: bool) {}
    fn set_transform(&self, _entity: EntityId, _position: Vec2, _rotation: f32) {}
}

/// Audio sink that plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play_clip(&self, _name: &str) {}
}

/// Settings kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RefCell<HashMap<String, i64>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.values.borrow().get(key).copied().unwrap_or(default)
    }

    fn set_i64(&self, key: &str, value: i64) {
        self.values.borrow_mut().insert(key.to_owned(), value);
    }
}

//=========================================================================
// Tests
//=========================================================================
