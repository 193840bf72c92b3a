//=========================================================================
// Global Runtime State
//=========================================================================
//
// Separates systems (logic components) from context (shared services).
//
// Architecture:
//   GlobalSystems: round state machine + player + spawners (owned by Engine)
//   GlobalContext: bus + timers + config + collaborators (cloned into each)
//
//=========================================================================

//=== Module Declarations =================================================

mod global_context;
mod global_systems;

//=== Public API ==========================================================

pub use global_context::GlobalContext;
pub use global_systems::GlobalSystems;
