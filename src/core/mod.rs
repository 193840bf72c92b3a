//=========================================================================
// Core Systems
//
// Game-agnostic building blocks the arcade components are made of.
//
// Responsibilities:
// - Recycle entity and timer storage through generational pools
// - Advance cooperative timers from the host's frame clock
// - Deliver typed notifications between decoupled components
// - Carry configuration, viewport geometry and host collaborators
//
// Notes:
// Everything here is single-threaded and frame driven. The only
// cross-thread seam is the host event channel in `platform_bridge`,
// drained once at the start of every frame.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod config;
pub mod error;
pub mod event_bus;
pub mod globals;
pub mod input;
pub mod platform_bridge;
pub mod pool;
pub mod timer;
pub mod viewport;
