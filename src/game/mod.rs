//=========================================================================
// Arcade Game Layer
//=========================================================================
//
// Asteroid-field rules built on the core systems.
//
//   RoundStateMachine ──GameStateChanged──> player, spawners
//          ▲                                      │
//          └── AsteroidDestroyed / PlayerShipDestroyed / ... ◄─┘
//
// Components never call each other directly: every interaction goes
// through the event bus or a timer callback.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod entity;
pub mod events;
pub mod player;
pub mod round;
pub mod spawners;

pub(crate) mod wiring;

//=== Public API ==========================================================

pub use entity::{AsteroidSize, BulletOwner, EnemyShipClass, EntityId, GhostTemplate};
pub use player::PlayerController;
pub use round::{GameState, RoundStateMachine};
