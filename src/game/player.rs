//=========================================================================
// Player Controller
//=========================================================================
//
// Drives the single player ship from the per-frame input snapshot.
//
//   ShipSpawned ──> revive at origin ──> invulnerable (3 s or first input)
//                                   └──> hyperspace locked (5 s)
//   input ──> rotate / thrust / fire (0.15 s cooldown) / hyperspace
//   hazard collision ──> ExplosionRequested ──> PlayerShipDestroyed
//
// The ship wraps around the screen; its ghosts are hidden while it is
// invulnerable.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use log::{debug, info};

//=== Internal Dependencies ===============================================

use crate::core::config::PlayerConfig;
use crate::core::error::CoreError;
use crate::core::event_bus::Subscription;
use crate::core::globals::GlobalContext;
use crate::core::input::InputSnapshot;
use crate::core::timer::TimerVariant;
use crate::game::entity::{BulletOwner, EntityId};
use crate::game::events::{
    Collision, ExplosionRequested, FireRequested, GameStateChanged, GhostsEnabled,
    PlayerShipDestroyed, ShipMoved,
};
use crate::game::round::GameState;
use crate::game::spawners::{WrapSubject, WrapTarget};
use crate::game::wiring::{on_stop_weak, subscribe_weak, OwnedTimer};

/// Unit vector the ship's nose points along, zero degrees pointing up.
fn heading(rotation: f32) -> Vec2 {
    let (sin, cos) = rotation.to_radians().sin_cos();
    Vec2::new(-sin, cos)
}

//=== Ship ================================================================

#[derive(Debug, Default)]
struct Ship {
    alive: bool,
    position: Vec2,
    velocity: Vec2,
    /// Degrees, counter-clockwise.
    rotation: f32,
    invulnerable: bool,
    fire_ready: bool,
    hyperspace_ready: bool,
}

impl Ship {
    fn steer(&mut self, input: &InputSnapshot, config: &PlayerConfig, dt: f32) {
        self.rotation = (self.rotation + input.rotation * config.turn_speed * dt) % 360.0;

        if input.thrust {
            self.velocity += heading(self.rotation) * config.thrust * dt;
        }
        self.velocity *= (1.0 - config.drag * dt).max(0.0);
        self.velocity = self.velocity.clamp_length_max(config.max_speed);
        self.position += self.velocity * dt;
    }
}

/// Cooldown timers owned by the controller.
#[derive(Debug, Clone, Copy)]
struct ShipTimers {
    invulnerability: OwnedTimer,
    fire: OwnedTimer,
    hyperspace: OwnedTimer,
}

//=== PlayerController ====================================================

struct PlayerShared {
    ctx: GlobalContext,
    ship: RefCell<Ship>,
    timers: Cell<Option<ShipTimers>>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// The player's ship: kinematics, weapons, invulnerability and death.
pub struct PlayerController {
    shared: Rc<PlayerShared>,
}

impl PlayerController {
    pub fn new(ctx: &GlobalContext) -> Result<Self, CoreError> {
        let shared = Rc::new(PlayerShared {
            ctx: ctx.clone(),
            ship: RefCell::new(Ship::default()),
            timers: Cell::new(None),
            subscriptions: RefCell::new(Vec::new()),
        });

        let config = &ctx.config.player;
        let timers = ShipTimers {
            invulnerability: shared.create_timer(config.invulnerability, |player| {
                player.cancel_invulnerability();
            })?,
            fire: shared.create_timer(config.fire_cooldown, |player| {
                player.ship.borrow_mut().fire_ready = true;
            })?,
            hyperspace: shared.create_timer(config.hyperspace_cooldown, |player| {
                player.ship.borrow_mut().hyperspace_ready = true;
            })?,
        };
        shared.timers.set(Some(timers));

        let bus = &ctx.bus;
        let subscriptions = vec![
            subscribe_weak(bus, &shared, |player, e: &GameStateChanged| match e.state {
                GameState::ShipSpawned => player.revive(),
                GameState::StartFirstRound | GameState::PlayerDied | GameState::GameOver => {
                    player.disable();
                }
                _ => {}
            })?,
            subscribe_weak(bus, &shared, |player, e: &Collision| {
                if e.entity == EntityId::Ship && e.other.is_hazard_to_player() {
                    player.hit();
                }
            })?,
        ];
        *shared.subscriptions.borrow_mut() = subscriptions;

        Ok(Self { shared })
    }

    /// Applies this frame's input to the ship. No-op while it is dead.
    pub fn update(&self, dt: f32) {
        let input = self.shared.ctx.input.poll();
        self.shared.update(&input, dt);
    }

    pub fn sync_presenter(&self) {
        let ship = self.shared.ship.borrow();
        if ship.alive {
            self.shared
                .ctx
                .presenter
                .set_transform(EntityId::Ship, ship.position, ship.rotation);
        }
    }

    pub fn is_alive(&self) -> bool {
        self.shared.ship.borrow().alive
    }

    pub fn is_invulnerable(&self) -> bool {
        self.shared.ship.borrow().invulnerable
    }

    pub fn can_fire(&self) -> bool {
        self.shared.ship.borrow().fire_ready
    }

    pub fn can_hyperspace(&self) -> bool {
        self.shared.ship.borrow().hyperspace_ready
    }

    pub fn position(&self) -> Vec2 {
        self.shared.ship.borrow().position
    }

    pub fn velocity(&self) -> Vec2 {
        self.shared.ship.borrow().velocity
    }

    pub fn rotation(&self) -> f32 {
        self.shared.ship.borrow().rotation
    }
}

impl WrapTarget for PlayerController {
    fn wrap_subjects(&self, out: &mut Vec<WrapSubject>) {
        let ship = self.shared.ship.borrow();
        if ship.alive {
            out.push(WrapSubject {
                id: EntityId::Ship,
                position: ship.position,
                rotation: ship.rotation,
            });
        }
    }

    fn teleport(&self, id: EntityId, position: Vec2) {
        if id == EntityId::Ship {
            self.shared.ship.borrow_mut().position = position;
        }
    }
}

impl PlayerShared {
    fn create_timer<F>(self: &Rc<Self>, duration: f32, on_stop: F) -> Result<OwnedTimer, CoreError>
    where
        F: Fn(&Rc<Self>) + 'static,
    {
        let timers = &self.ctx.timers;
        let handle = timers.create(TimerVariant::Countdown, duration)?;
        let callback = on_stop_weak(timers, handle, self, on_stop)?;
        Ok(OwnedTimer { handle, callback })
    }

    fn start_timer(&self, pick: impl Fn(&ShipTimers) -> OwnedTimer) {
        if let Some(timers) = self.timers.get() {
            let _ = self.ctx.timers.start(pick(&timers).handle, None);
        }
    }

    //--- Per Frame --------------------------------------------------------

    fn update(&self, input: &InputSnapshot, dt: f32) {
        if !self.ship.borrow().alive {
            return;
        }
        if input.any_input && self.ship.borrow().invulnerable {
            self.cancel_invulnerability();
        }

        let config = &self.ctx.config.player;
        let (fire, jump) = {
            let mut ship = self.ship.borrow_mut();
            ship.steer(input, config, dt);

            let fire = input.fire && ship.fire_ready;
            let jump = input.hyperspace && ship.hyperspace_ready;
            if fire {
                ship.fire_ready = false;
            }
            if jump {
                ship.hyperspace_ready = false;
            }
            (fire, jump)
        };

        if fire {
            let (position, rotation) = {
                let ship = self.ship.borrow();
                (ship.position, ship.rotation)
            };
            self.ctx.bus.publish(FireRequested {
                owner: BulletOwner::Player,
                position,
                direction: heading(rotation),
            });
            self.start_timer(|t| t.fire);
        }

        if jump {
            let destination = self.ctx.random_visible_position();
            self.ship.borrow_mut().position = destination;
            self.start_timer(|t| t.hyperspace);
            debug!("Hyperspace to {}", destination);
        }

        let position = self.ship.borrow().position;
        self.ctx.bus.publish(ShipMoved { position });
    }

    //--- Life Cycle -------------------------------------------------------

    fn revive(&self) {
        {
            let mut ship = self.ship.borrow_mut();
            *ship = Ship {
                alive: true,
                fire_ready: true,
                ..Ship::default()
            };
        }
        self.ctx.presenter.set_transform(EntityId::Ship, Vec2::ZERO, 0.0);
        self.ctx.presenter.set_active(EntityId::Ship, true);

        self.enable_invulnerability();
        self.start_timer(|t| t.hyperspace);
        self.ctx.bus.publish(ShipMoved { position: Vec2::ZERO });
        info!("Ship spawned");
    }

    fn disable(&self) {
        let was_alive = std::mem::replace(&mut self.ship.borrow_mut().alive, false);
        if was_alive {
            self.ctx.presenter.set_active(EntityId::Ship, false);
            debug!("Ship disabled");
        }
    }

    fn hit(&self) {
        let position = {
            let ship = self.ship.borrow();
            if !ship.alive || ship.invulnerable {
                return;
            }
            ship.position
        };

        self.ctx.bus.publish(ExplosionRequested { position });
        self.disable();
        self.ctx.bus.publish(PlayerShipDestroyed { position });
        info!("Ship destroyed at {}", position);
    }

    //--- Invulnerability --------------------------------------------------

    fn enable_invulnerability(&self) {
        if std::mem::replace(&mut self.ship.borrow_mut().invulnerable, true) {
            return;
        }
        self.start_timer(|t| t.invulnerability);
        self.ctx.bus.publish(GhostsEnabled {
            parent: EntityId::Ship,
            enabled: false,
        });
    }

    fn cancel_invulnerability(&self) {
        if !std::mem::replace(&mut self.ship.borrow_mut().invulnerable, false) {
            return;
        }
        if let Some(timers) = self.timers.get() {
            // Re-entry from the stop callback sees the flag already cleared.
            let _ = self.ctx.timers.stop(timers.invulnerability.handle);
        }
        self.ctx.bus.publish(GhostsEnabled {
            parent: EntityId::Ship,
            enabled: true,
        });
    }
}

impl Drop for PlayerShared {
    fn drop(&mut self) {
        for subscription in self.subscriptions.take() {
            self.ctx.bus.unsubscribe(subscription);
        }
        if let Some(timers) = self.timers.take() {
            for timer in [timers.invulnerability, timers.fire, timers.hyperspace] {
                timer.release(&self.ctx.timers);
            }
        }
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::PoolHandle;
    use crate::game::entity::AsteroidSize;
    use crate::testing::{record, TestWorld};

    fn spawned(world: &TestWorld) -> PlayerController {
        let player = PlayerController::new(&world.ctx).unwrap();
        world.ctx.bus.publish(GameStateChanged { state: GameState::ShipSpawned, round: 1 });
        player
    }

    fn rock() -> EntityId {
        EntityId::Asteroid(AsteroidSize::Large, PoolHandle::default())
    }

    #[test]
    fn spawn_starts_invulnerable_with_hidden_ghosts() {
        let world = TestWorld::new();
        let ghosts = record::<GhostsEnabled>(&world.ctx.bus);
        let player = spawned(&world);

        assert!(player.is_alive());
        assert!(player.is_invulnerable());
        assert!(player.can_fire());
        assert!(!player.can_hyperspace());
        assert_eq!(player.position(), Vec2::ZERO);
        assert_eq!(world.presenter.is_active(EntityId::Ship), Some(true));

        world.ctx.timers.advance(3.0);
        assert!(!player.is_invulnerable());
        let enabled: Vec<bool> = ghosts.borrow().iter().map(|e| e.enabled).collect();
        assert_eq!(enabled, vec![false, true]);
    }

    #[test]
    fn any_input_ends_invulnerability_early() {
        let world = TestWorld::new();
        let player = spawned(&world);

        world.input.set(InputSnapshot::new(0.5, false, false, false));
        player.update(0.1);

        assert!(!player.is_invulnerable());
        assert!((player.rotation() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn thrust_pushes_along_the_nose() {
        let world = TestWorld::new();
        let player = spawned(&world);

        world.input.set(InputSnapshot::new(0.0, true, false, false));
        for _ in 0..10 {
            player.update(0.1);
        }

        let position = player.position();
        assert!(position.y > 0.0);
        assert!(position.x.abs() < 1e-5);
        assert!(player.velocity().length() <= world.ctx.config.player.max_speed);
    }

    #[test]
    fn fire_respects_the_cooldown() {
        let world = TestWorld::new();
        let shots = record::<FireRequested>(&world.ctx.bus);
        let player = spawned(&world);

        world.input.set(InputSnapshot::new(0.0, false, true, false));
        player.update(0.016);
        player.update(0.016);
        assert_eq!(shots.borrow().len(), 1);
        assert_eq!(shots.borrow()[0].direction, Vec2::new(-0.0, 1.0));

        world.ctx.timers.advance(0.15);
        player.update(0.016);
        assert_eq!(shots.borrow().len(), 2);
    }

    #[test]
    fn hyperspace_unlocks_after_cooldown() {
        let world = TestWorld::new();
        let player = spawned(&world);
        world.input.set(InputSnapshot::new(0.0, false, false, true));

        player.update(0.016);
        assert_eq!(player.position(), Vec2::ZERO);

        world.ctx.timers.advance(5.0);
        player.update(0.016);
        assert_ne!(player.position(), Vec2::ZERO);
        assert!(world.ctx.viewport.is_on_screen(player.position()));
        assert!(!player.can_hyperspace());
    }

    #[test]
    fn hazard_kills_only_a_vulnerable_ship() {
        let world = TestWorld::new();
        let deaths = record::<PlayerShipDestroyed>(&world.ctx.bus);
        let explosions = record::<ExplosionRequested>(&world.ctx.bus);
        let player = spawned(&world);

        world.ctx.bus.publish(Collision { entity: EntityId::Ship, other: rock() });
        assert!(player.is_alive());

        world.ctx.timers.advance(3.0);
        let own_bullet = EntityId::Bullet(BulletOwner::Player, PoolHandle::default());
        world.ctx.bus.publish(Collision { entity: EntityId::Ship, other: own_bullet });
        assert!(player.is_alive());

        world.ctx.bus.publish(Collision { entity: EntityId::Ship, other: rock() });
        assert!(!player.is_alive());
        assert_eq!(deaths.borrow().len(), 1);
        assert_eq!(explosions.borrow().len(), 1);
        assert_eq!(world.presenter.is_active(EntityId::Ship), Some(false));

        // Dead ships ignore input.
        world.input.set(InputSnapshot::new(1.0, true, true, false));
        player.update(0.1);
        assert_eq!(player.rotation(), 0.0);
    }

    #[test]
    fn dead_ship_is_not_a_wrap_subject() {
        let world = TestWorld::new();
        let player = spawned(&world);
        let mut subjects = Vec::new();
        player.wrap_subjects(&mut subjects);
        assert_eq!(subjects.len(), 1);

        world.ctx.bus.publish(GameStateChanged { state: GameState::PlayerDied, round: 1 });
        subjects.clear();
        player.wrap_subjects(&mut subjects);
        assert!(subjects.is_empty());
    }
}
