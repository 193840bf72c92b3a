//=========================================================================
// Entity Spawners
//=========================================================================
//
// Every spawner follows the same shape:
//
//   pools keyed by a variant enum ──> acquire on demand (exhaustion skips)
//            ▲                                  │
//            └── release on retire ◄────────────┘
//
//   GameStateChanged ──> enable / disable / drain
//   Collision        ──> retire + publish derived events
//
// Spawner state lives behind an `Rc`; bus handlers and timer callbacks hold
// only `Weak` references to it.
//
//=========================================================================

//=== Module Declarations =================================================

mod asteroid;
mod enemy;
mod explosion;
mod ghost;
mod projectile;

//=== Public API ==========================================================

pub use asteroid::AsteroidSpawner;
pub use enemy::EnemyShipSpawner;
pub use explosion::ExplosionSpawner;
pub use ghost::{GhostPosition, GhostSpawner, WrapSubject, WrapTarget};
pub use projectile::ProjectileSpawner;

//=== EntitySpawner Trait =================================================

/// Per-frame hooks the systems pipeline drives on every spawner.
pub trait EntitySpawner {
    /// Moves live entities by `dt` seconds and retires the ones that expire.
    fn update(&self, _dt: f32) {}

    /// Pushes every live entity's transform to the presenter.
    fn sync_presenter(&self) {}

    /// Number of live entities across all of the spawner's pools.
    fn active_count(&self) -> usize;
}
