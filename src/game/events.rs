//=========================================================================
// Game Events
//=========================================================================
//
// Payloads exchanged over the event bus. Components never call each other
// directly; they publish these and subscribe to the ones they react to.
//
//   RoundStateMachine ── GameStateChanged ──> spawners, player, UI
//   spawners/player   ── AsteroidDestroyed, EnemyShipDestroyed ──> scoring
//   anyone            ── ExplosionRequested ──> ExplosionSpawner
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::Vec2;

//=== Internal Dependencies ===============================================

use super::entity::{AsteroidSize, BulletOwner, EnemyShipClass, EntityId};
use super::round::GameState;
use crate::core::event_bus::Event;
use crate::core::pool::PoolHandle;

//=== Round ===============================================================

/// Published after every committed state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStateChanged {
    pub state: GameState,
    pub round: u32,
}
impl Event for GameStateChanged {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreChanged {
    pub score: u64,
    pub high_score: u64,
}
impl Event for ScoreChanged {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivesChanged {
    pub lives: u32,
}
impl Event for LivesChanged {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseChanged {
    pub paused: bool,
}
impl Event for PauseChanged {}

//=== Entities ============================================================

/// An asteroid was destroyed. `points` is zero unless the player caused it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsteroidDestroyed {
    pub size: AsteroidSize,
    pub position: Vec2,
    pub points: u64,
}
impl Event for AsteroidDestroyed {}

/// The last active asteroid of the round was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsteroidFieldCleared;
impl Event for AsteroidFieldCleared {}

/// An enemy ship was destroyed. `points` is zero unless the player caused it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyShipDestroyed {
    pub class: EnemyShipClass,
    pub position: Vec2,
    pub points: u64,
}
impl Event for EnemyShipDestroyed {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerShipDestroyed {
    pub position: Vec2,
}
impl Event for PlayerShipDestroyed {}

/// Player ship position, published once per frame while it is alive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipMoved {
    pub position: Vec2,
}
impl Event for ShipMoved {}

/// Someone wants a bullet. `direction` is a unit vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireRequested {
    pub owner: BulletOwner,
    pub position: Vec2,
    pub direction: Vec2,
}
impl Event for FireRequested {}

//=== Effects =============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosionRequested {
    pub position: Vec2,
}
impl Event for ExplosionRequested {}

/// An explosion's lifetime ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplosionCompleted {
    pub explosion: PoolHandle,
}
impl Event for ExplosionCompleted {}

/// Ghosts of `parent` should (not) take part in collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostsEnabled {
    pub parent: EntityId,
    pub enabled: bool,
}
impl Event for GhostsEnabled {}

//=== Collisions ==========================================================

/// `entity` touched `other`. Published once for each side of a contact,
/// with ghosts already resolved to their parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub entity: EntityId,
    pub other: EntityId,
}
impl Event for Collision {}
