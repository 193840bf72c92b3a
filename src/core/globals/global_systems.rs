//=========================================================================
// Global Systems
//=========================================================================
//
// Container for the game components and the per-frame pipeline.
//
// Contains the round state machine, the player controller and every
// spawner. Components coordinate over the bus in GlobalContext; this
// container only owns them and decides what runs when.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::trace;

//=== Internal Dependencies ===============================================

use super::GlobalContext;
use crate::core::error::CoreError;
use crate::game::events::Collision;
use crate::game::player::PlayerController;
use crate::game::round::RoundStateMachine;
use crate::game::spawners::{
    AsteroidSpawner, EnemyShipSpawner, EntitySpawner, ExplosionSpawner, GhostSpawner,
    ProjectileSpawner, WrapTarget,
};
use crate::game::EntityId;

//=== GlobalSystems =======================================================

/// Owner of every game component.
///
/// Construction order is subscription order: the round state machine sees
/// each event before the entities react to it.
pub struct GlobalSystems {
    /// Round, score and lives bookkeeping.
    pub round: RoundStateMachine,

    pub player: PlayerController,
    pub asteroids: AsteroidSpawner,
    pub enemies: EnemyShipSpawner,
    pub projectiles: ProjectileSpawner,
    pub explosions: ExplosionSpawner,

    /// Screen-wrap ghosts of the player ship and the asteroids.
    pub ghosts: GhostSpawner,
}

impl GlobalSystems {
    /// Creates and wires every component. Wiring errors abort construction.
    pub(crate) fn new(ctx: &GlobalContext) -> Result<Self, CoreError> {
        Ok(Self {
            round: RoundStateMachine::new(ctx)?,
            player: PlayerController::new(ctx)?,
            asteroids: AsteroidSpawner::new(ctx)?,
            enemies: EnemyShipSpawner::new(ctx)?,
            projectiles: ProjectileSpawner::new(ctx)?,
            explosions: ExplosionSpawner::new(ctx)?,
            ghosts: GhostSpawner::new(ctx)?,
        })
    }

    //--- Update Loop ------------------------------------------------------

    /// Runs one frame of game logic.
    ///
    /// # Processing Pipeline
    ///
    /// 1. **Timers**: advance every timer; stop callbacks run to completion
    /// 2. **Collisions**: resolve ghosts, publish one `Collision` per side
    /// 3. **Player**: apply this frame's input
    /// 4. **Movement**: spawners move and expire their entities
    /// 5. **Screen Wrap**: swap wrapping entities with their ghosts
    /// 6. **Presentation**: push every live transform to the presenter
    pub(crate) fn update(&self, ctx: &GlobalContext, dt: f32, collisions: &[(EntityId, EntityId)]) {
        // 1. Timers and their callbacks
        ctx.timers.advance(dt);

        // 2. Collisions reported by the host since the last frame
        for (a, b) in collisions {
            self.route_collision(ctx, *a, *b);
        }

        // 3. Player input
        self.player.update(dt);

        // 4. Entity movement
        for spawner in self.spawners() {
            spawner.update(dt);
        }

        // 5. Screen wrap
        let targets: [&dyn WrapTarget; 2] = [&self.player, &self.asteroids];
        self.ghosts.wrap(&targets);

        // 6. Presenter sync
        self.player.sync_presenter();
        for spawner in self.spawners() {
            spawner.sync_presenter();
        }
        self.ghosts.sync_presenter();
    }

    /// Publishes a host contact to both parties, ghosts resolved to their
    /// parents. Contacts with hidden ghosts and self contacts are dropped.
    ///
    /// The player ship always hears about a contact last, so points for
    /// whatever it rammed are scored before its death is processed.
    pub(crate) fn route_collision(&self, ctx: &GlobalContext, a: EntityId, b: EntityId) {
        let (Some(mut entity), Some(mut other)) = (self.ghosts.resolve(a), self.ghosts.resolve(b))
        else {
            trace!("Dropped contact {:?} / {:?}", a, b);
            return;
        };
        if entity == other {
            return;
        }
        if entity == EntityId::Ship {
            std::mem::swap(&mut entity, &mut other);
        }
        ctx.bus.publish(Collision { entity, other });
        ctx.bus.publish(Collision {
            entity: other,
            other: entity,
        });
    }

    fn spawners(&self) -> [&dyn EntitySpawner; 4] {
        [
            &self.asteroids,
            &self.enemies,
            &self.projectiles,
            &self.explosions,
        ]
    }
}

//=========================================================================
// Tests
//=========================================================================
