//=========================================================================
// Arcade Runtime Library Root
//
// This crate defines the public API surface of the arcade runtime.
//
// Responsibilities:
// - Expose the frame-driven engine facade (`Engine`, `EngineBuilder`)
// - Expose the core building blocks (pools, timers, event bus) for reuse
// - Keep rendering, physics, audio and storage behind collaborator traits
//
// Typical usage:
// ```no_run
// use arcade_runtime::prelude::*;
//
// fn main() -> Result<(), CoreError> {
//     let mut engine = EngineBuilder::new().build()?;
//     engine.start()?;
//     while engine.advance(1.0 / 60.0)? == TickControl::Continue {}
//     Ok(())
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the game-agnostic systems; `game` holds the arcade rules
// built on them. Both are public for hosts that wire components by hand,
// but most applications only need the `Engine` facade.
//
pub mod core;
pub mod game;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `engine` defines the main entry point and the per-frame driver.
//
mod engine;

#[cfg(test)]
mod testing;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder};
