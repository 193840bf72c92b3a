//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use arcade_runtime::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder};

// Global systems and context
pub use crate::core::globals::{GlobalContext, GlobalSystems};

// Configuration and errors
pub use crate::core::config::GameConfig;
pub use crate::core::error::CoreError;

// Host integration
pub use crate::core::input::{InputSnapshot, InputSource, SharedInput};
pub use crate::core::platform_bridge::{
    AudioSink, HostEvent, HostSender, Presenter, SettingsStore, TickControl,
};

// Game layer
pub use crate::game::events::*;
pub use crate::game::{EntityId, GameState};
