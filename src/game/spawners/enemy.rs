//=========================================================================
// Enemy Ship Spawner
//=========================================================================
//
//   spawn countdown ──> spawn_tick ──> pick class ──> acquire ──> fly path
//        ▲                  │                                     │
//        └── restart (delay shrinks, fast chance grows)           │
//                                                                 ▼
//   fire countdown (3 s, then 1.5 s) ──> FireRequested    off-screen after
//                                                         first waypoint
//                                                             ──> despawn
//
// One ship per class can be on screen at a time.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::rc::Rc;

use glam::Vec2;
use log::{debug, info, warn};
use rand::Rng;

//=== Internal Dependencies ===============================================

use crate::core::error::CoreError;
use crate::core::event_bus::Subscription;
use crate::core::globals::GlobalContext;
use crate::core::pool::{Pool, PoolConfig, PoolHandle, Poolable};
use crate::core::timer::TimerVariant;
use crate::core::viewport::Viewport;
use crate::game::entity::{BulletOwner, EnemyShipClass, EntityId};
use crate::game::events::{
    Collision, EnemyShipDestroyed, ExplosionRequested, FireRequested, GameStateChanged, ShipMoved,
};
use crate::game::round::GameState;
use crate::game::wiring::{on_stop_weak, subscribe_weak, OwnedTimer};

use super::EntitySpawner;

/// Lane positions as fractions of the half extents.
const LANES: [f32; 3] = [-0.6, 0.0, 0.6];

/// Distance beyond the screen edge where paths begin and end.
const EDGE_MARGIN: f32 = 1.0;

//=== Flight Path =========================================================

/// Entry point and waypoints of a crossing from one side to the other.
fn random_path<R: Rng>(viewport: &Viewport, rng: &mut R) -> (Vec2, Vec<Vec2>) {
    let from_left = rng.gen_bool(0.5);
    let half = Vec2::new(viewport.right(), viewport.top());
    let row = |rng: &mut R| LANES[rng.gen_range(0..LANES.len())] * half.y;

    let mut columns = LANES.map(|lane| lane * half.x);
    let (entry_x, exit_x) = if from_left {
        (viewport.left() - EDGE_MARGIN, viewport.right() + EDGE_MARGIN)
    } else {
        columns.reverse();
        (viewport.right() + EDGE_MARGIN, viewport.left() - EDGE_MARGIN)
    };

    let entry_row = row(rng);
    let mut waypoints = vec![Vec2::new(columns[0], entry_row)];
    let mut last_row = entry_row;
    for column in &columns[1..] {
        last_row = row(rng);
        waypoints.push(Vec2::new(*column, last_row));
    }
    waypoints.push(Vec2::new(exit_x, last_row));

    (Vec2::new(entry_x, entry_row), waypoints)
}

//=== EnemyShip ===========================================================

#[derive(Debug, Default)]
struct EnemyShip {
    active: bool,
    position: Vec2,
    waypoints: Vec<Vec2>,
    next_waypoint: usize,
    eligible_for_despawn: bool,
    fire_timer: Option<OwnedTimer>,
}

impl Poolable for EnemyShip {
    fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.waypoints.clear();
            self.next_waypoint = 0;
            self.eligible_for_despawn = false;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl EnemyShip {
    /// Advances along the path by `step` world units.
    fn fly(&mut self, step: f32) {
        let Some(target) = self.waypoints.get(self.next_waypoint).copied() else {
            return;
        };
        let to_target = target - self.position;
        let distance = to_target.length();

        if distance <= step {
            self.position = target;
            if self.next_waypoint + 1 < self.waypoints.len() {
                self.next_waypoint += 1;
                self.eligible_for_despawn = true;
            }
        } else {
            self.position += to_target / distance * step;
        }
    }
}

//=== EnemyShipSpawner ====================================================

struct EnemyShared {
    ctx: GlobalContext,
    pools: RefCell<HashMap<EnemyShipClass, Pool<EnemyShip>>>,
    spawn_timer: Cell<Option<OwnedTimer>>,
    spawning: Cell<bool>,
    spawn_delay: Cell<f32>,
    fast_chance: Cell<f32>,
    ship_position: Cell<Vec2>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Enemy saucers crossing the screen and shooting at the player.
pub struct EnemyShipSpawner {
    shared: Rc<EnemyShared>,
}

impl EnemyShipSpawner {
    pub fn new(ctx: &GlobalContext) -> Result<Self, CoreError> {
        let config = &ctx.config.enemies;
        let pools = [EnemyShipClass::Slow, EnemyShipClass::Fast]
            .into_iter()
            .map(|class| (class, Pool::new(PoolConfig::hard(1), EnemyShip::default)))
            .collect();

        let shared = Rc::new(EnemyShared {
            ctx: ctx.clone(),
            pools: RefCell::new(pools),
            spawn_timer: Cell::new(None),
            spawning: Cell::new(false),
            spawn_delay: Cell::new(config.initial_spawn_delay),
            fast_chance: Cell::new(config.base_fast_chance),
            ship_position: Cell::new(Vec2::ZERO),
            subscriptions: RefCell::new(Vec::new()),
        });

        let timers = &ctx.timers;
        let handle = timers.create(TimerVariant::Countdown, config.initial_spawn_delay)?;
        let callback = on_stop_weak(timers, handle, &shared, |spawner| spawner.spawn_tick())?;
        shared.spawn_timer.set(Some(OwnedTimer { handle, callback }));

        let bus = &ctx.bus;
        let subscriptions = vec![
            subscribe_weak(bus, &shared, |spawner, e: &GameStateChanged| {
                spawner.on_state_changed(e.state);
            })?,
            subscribe_weak(bus, &shared, |spawner, e: &ShipMoved| {
                spawner.ship_position.set(e.position);
            })?,
            subscribe_weak(bus, &shared, |spawner, e: &Collision| {
                spawner.on_collision(e);
            })?,
        ];
        *shared.subscriptions.borrow_mut() = subscriptions;

        Ok(Self { shared })
    }

    /// Launches a ship right away, without touching the spawn cadence.
    pub fn spawn_ship(&self) -> Option<EntityId> {
        self.shared.spawn_ship()
    }

    /// Explodes and despawns a ship. Returns false if it is not flying.
    pub fn destroy(&self, ship: EntityId, player_caused: bool) -> bool {
        self.shared.destroy(ship, player_caused)
    }

    pub fn ships(&self) -> Vec<EntityId> {
        self.shared.ships()
    }

    pub fn position(&self, ship: EntityId) -> Option<Vec2> {
        let EntityId::EnemyShip(class, handle) = ship else {
            return None;
        };
        let pools = self.shared.pools.borrow();
        pools.get(&class)?.get(handle).map(|s| s.position)
    }

    pub fn is_spawning(&self) -> bool {
        self.shared.spawning.get()
    }

    pub fn spawn_delay(&self) -> f32 {
        self.shared.spawn_delay.get()
    }

    pub fn fast_chance(&self) -> f32 {
        self.shared.fast_chance.get()
    }
}

impl EntitySpawner for EnemyShipSpawner {
    fn update(&self, dt: f32) {
        let config = &self.shared.ctx.config.enemies;
        let viewport = &self.shared.ctx.viewport;
        let mut leaving = Vec::new();
        {
            let mut pools = self.shared.pools.borrow_mut();
            for (class, pool) in pools.iter_mut() {
                let speed = match class {
                    EnemyShipClass::Slow => config.slow_speed,
                    EnemyShipClass::Fast => config.fast_speed,
                };
                for (handle, ship) in pool.iter_mut() {
                    ship.fly(speed * dt);
                    if ship.eligible_for_despawn && !viewport.is_on_screen(ship.position) {
                        leaving.push(EntityId::EnemyShip(*class, handle));
                    }
                }
            }
        }
        for ship in leaving {
            debug!("{:?} left the screen", ship);
            self.shared.despawn(ship);
        }
    }

    fn sync_presenter(&self) {
        let pools = self.shared.pools.borrow();
        for (class, pool) in pools.iter() {
            for (handle, ship) in pool.iter() {
                let id = EntityId::EnemyShip(*class, handle);
                self.shared.ctx.presenter.set_transform(id, ship.position, 0.0);
            }
        }
    }

    fn active_count(&self) -> usize {
        self.shared.pools.borrow().values().map(Pool::live_count).sum()
    }
}

impl EnemyShared {
    //--- Spawn Cadence ----------------------------------------------------

    fn on_state_changed(&self, state: GameState) {
        match state {
            GameState::GameOver => {
                self.set_spawning(false);
                self.despawn_all();
            }
            GameState::StartGame => {
                let config = &self.ctx.config.enemies;
                // A new game always waits out the full initial delay.
                self.set_spawning(false);
                self.despawn_all();
                self.spawn_delay.set(config.initial_spawn_delay);
                self.fast_chance.set(config.base_fast_chance);
                self.set_spawning(true);
            }
            _ => self.set_spawning(true),
        }
    }

    fn set_spawning(&self, enable: bool) {
        if self.spawning.replace(enable) == enable {
            return;
        }
        let Some(timer) = self.spawn_timer.get() else {
            return;
        };
        if enable {
            let _ = self.ctx.timers.start(timer.handle, Some(self.spawn_delay.get()));
        } else {
            // The guard in spawn_tick swallows the stop signal.
            let _ = self.ctx.timers.stop(timer.handle);
        }
    }

    fn spawn_tick(self: &Rc<Self>) {
        if !self.spawning.get() {
            return;
        }
        self.spawn_ship();

        let config = &self.ctx.config.enemies;
        self.fast_chance
            .set((self.fast_chance.get() + config.fast_chance_step).min(config.max_fast_chance));
        self.spawn_delay
            .set((self.spawn_delay.get() - config.spawn_delay_step).max(config.min_spawn_delay));

        if let Some(timer) = self.spawn_timer.get() {
            let _ = self.ctx.timers.start(timer.handle, Some(self.spawn_delay.get()));
        }
    }

    //--- Spawning ---------------------------------------------------------

    fn spawn_ship(self: &Rc<Self>) -> Option<EntityId> {
        let fast_chance = self.fast_chance.get();
        let (class, (start, waypoints)) = self.ctx.with_rng(|rng| {
            let class = if rng.gen::<f32>() < fast_chance {
                EnemyShipClass::Fast
            } else {
                EnemyShipClass::Slow
            };
            (class, random_path(&self.ctx.viewport, rng))
        });

        let acquired = self
            .pools
            .borrow_mut()
            .get_mut(&class)
            .map(|pool| pool.acquire());
        let handle = match acquired {
            Some(Ok(handle)) => handle,
            Some(Err(e)) => {
                debug!("{:?} enemy ship skipped: {}", class, e);
                return None;
            }
            None => return None,
        };

        let fire_timer = match self.create_fire_timer(class, handle) {
            Ok(timer) => timer,
            Err(e) => {
                warn!("Enemy ship skipped: {}", e);
                if let Some(pool) = self.pools.borrow_mut().get_mut(&class) {
                    let _ = pool.release(handle);
                }
                return None;
            }
        };

        if let Some(ship) = self
            .pools
            .borrow_mut()
            .get_mut(&class)
            .and_then(|pool| pool.get_mut(handle))
        {
            ship.position = start;
            ship.waypoints = waypoints;
            ship.fire_timer = Some(fire_timer);
        }

        let id = EntityId::EnemyShip(class, handle);
        self.ctx.presenter.set_transform(id, start, 0.0);
        self.ctx.presenter.set_active(id, true);
        let _ = self.ctx.timers.start(fire_timer.handle, None);

        info!("{:?} enemy ship spawned at {}", class, start);
        Some(id)
    }

    fn create_fire_timer(
        self: &Rc<Self>,
        class: EnemyShipClass,
        ship: PoolHandle,
    ) -> Result<OwnedTimer, CoreError> {
        let timers = &self.ctx.timers;
        let delay = self.ctx.config.enemies.initial_fire_delay;
        let handle = timers.create(TimerVariant::Countdown, delay)?;
        let callback = on_stop_weak(timers, handle, self, move |spawner| {
            spawner.fire(class, ship);
        })?;
        Ok(OwnedTimer { handle, callback })
    }

    //--- Firing -----------------------------------------------------------

    fn fire(&self, class: EnemyShipClass, ship: PoolHandle) {
        let Some((position, timer)) = self
            .pools
            .borrow()
            .get(&class)
            .and_then(|pool| pool.get(ship))
            .map(|s| (s.position, s.fire_timer))
        else {
            return;
        };

        let aim = match class {
            EnemyShipClass::Fast => (self.ship_position.get() - position).try_normalize(),
            EnemyShipClass::Slow => None,
        };
        let direction = aim.unwrap_or_else(|| {
            self.ctx
                .with_rng(|rng| Vec2::from_angle(rng.gen_range(0.0..TAU)))
        });

        self.ctx.bus.publish(FireRequested {
            owner: BulletOwner::Enemy,
            position,
            direction,
        });

        if let Some(timer) = timer {
            let delay = self.ctx.config.enemies.subsequent_fire_delay;
            let _ = self.ctx.timers.start(timer.handle, Some(delay));
        }
    }

    //--- Destruction ------------------------------------------------------

    fn on_collision(&self, collision: &Collision) {
        if !matches!(collision.entity, EntityId::EnemyShip(..)) {
            return;
        }
        let player_caused = match collision.other {
            EntityId::Bullet(BulletOwner::Enemy, _)
            | EntityId::EnemyShip(..)
            | EntityId::Explosion(_) => return,
            EntityId::Ship | EntityId::Bullet(BulletOwner::Player, _) => true,
            _ => false,
        };
        self.destroy(collision.entity, player_caused);
    }

    fn destroy(&self, ship: EntityId, player_caused: bool) -> bool {
        let EntityId::EnemyShip(class, _) = ship else {
            return false;
        };
        let Some(position) = self.despawn(ship) else {
            return false;
        };

        self.ctx.bus.publish(ExplosionRequested { position });
        let points = if player_caused {
            self.ctx.config.enemies.points
        } else {
            0
        };
        self.ctx.bus.publish(EnemyShipDestroyed {
            class,
            position,
            points,
        });
        true
    }

    //--- Release ----------------------------------------------------------

    /// Returns the ship to its pool, detaching its fire callback before
    /// releasing the timer. Yields the last position of a live ship.
    fn despawn(&self, ship: EntityId) -> Option<Vec2> {
        let EntityId::EnemyShip(class, handle) = ship else {
            return None;
        };
        let (position, timer) = {
            let mut pools = self.pools.borrow_mut();
            let pool = pools.get_mut(&class)?;
            let (position, timer) = pool
                .get_mut(handle)
                .map(|s| (s.position, s.fire_timer.take()))?;
            if let Err(e) = pool.release(handle) {
                warn!("Enemy ship release failed: {}", e);
                return None;
            }
            (position, timer)
        };

        if let Some(timer) = timer {
            timer.release(&self.ctx.timers);
        }
        self.ctx.presenter.set_active(ship, false);
        Some(position)
    }

    fn despawn_all(&self) {
        for ship in self.ships() {
            self.despawn(ship);
        }
    }

    fn ships(&self) -> Vec<EntityId> {
        let pools = self.pools.borrow();
        pools
            .iter()
            .flat_map(|(class, pool)| {
                pool.handles()
                    .into_iter()
                    .map(move |handle| EntityId::EnemyShip(*class, handle))
            })
            .collect()
    }
}

impl Drop for EnemyShared {
    fn drop(&mut self) {
        for subscription in self.subscriptions.take() {
            self.ctx.bus.unsubscribe(subscription);
        }
        self.despawn_all();
        if let Some(timer) = self.spawn_timer.take() {
            timer.release(&self.ctx.timers);
        }
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GameConfig;
    use crate::testing::{record, TestWorld};

    fn world_with_fast_chance(chance: f32) -> TestWorld {
        let mut config = GameConfig::default();
        config.enemies.base_fast_chance = chance;
        TestWorld::with_config(config)
    }

    fn publish_state(world: &TestWorld, state: GameState) {
        world.ctx.bus.publish(GameStateChanged { state, round: 1 });
    }

    #[test]
    fn countdown_spawns_and_ramps_difficulty() {
        let world = TestWorld::new();
        let spawner = EnemyShipSpawner::new(&world.ctx).unwrap();
        assert!(!spawner.is_spawning());

        publish_state(&world, GameState::StartFirstRound);
        assert!(spawner.is_spawning());
        world.ctx.timers.advance(9.0);
        assert_eq!(spawner.active_count(), 0);
        world.ctx.timers.advance(1.0);

        assert_eq!(spawner.active_count(), 1);
        assert!((spawner.spawn_delay() - 9.9).abs() < 1e-5);
        assert!((spawner.fast_chance() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn game_over_stops_spawning_and_clears_ships() {
        let world = TestWorld::new();
        let spawner = EnemyShipSpawner::new(&world.ctx).unwrap();
        publish_state(&world, GameState::ShipSpawned);
        spawner.spawn_ship().unwrap();

        publish_state(&world, GameState::GameOver);
        assert!(!spawner.is_spawning());
        assert_eq!(spawner.active_count(), 0);

        world.ctx.timers.advance(20.0);
        assert_eq!(spawner.active_count(), 0);
        // Only the spawn countdown is left.
        assert_eq!(world.ctx.timers.live_count(), 1);
    }

    #[test]
    fn new_game_restarts_the_spawn_countdown() {
        let world = TestWorld::new();
        let spawner = EnemyShipSpawner::new(&world.ctx).unwrap();
        publish_state(&world, GameState::StartFirstRound);
        world.ctx.timers.advance(9.9);

        publish_state(&world, GameState::StartGame);
        assert!(spawner.is_spawning());
        world.ctx.timers.advance(0.5);
        assert_eq!(spawner.active_count(), 0);
        assert_eq!(spawner.spawn_delay(), 10.0);

        world.ctx.timers.advance(9.4);
        assert_eq!(spawner.active_count(), 0);
        world.ctx.timers.advance(0.1);
        assert_eq!(spawner.active_count(), 1);
    }

    #[test]
    fn busy_class_skips_the_spawn() {
        let world = world_with_fast_chance(0.0);
        let spawner = EnemyShipSpawner::new(&world.ctx).unwrap();

        let ship = spawner.spawn_ship().unwrap();
        assert!(matches!(ship, EntityId::EnemyShip(EnemyShipClass::Slow, _)));
        assert!(spawner.spawn_ship().is_none());
        assert_eq!(spawner.active_count(), 1);
    }

    #[test]
    fn fast_ship_aims_at_the_player_and_keeps_firing() {
        let world = world_with_fast_chance(1.0);
        let spawner = EnemyShipSpawner::new(&world.ctx).unwrap();
        let shots = record::<FireRequested>(&world.ctx.bus);
        let ship = spawner.spawn_ship().unwrap();
        world.ctx.bus.publish(ShipMoved { position: Vec2::new(0.0, 4.0) });

        world.ctx.timers.advance(3.0);
        assert_eq!(shots.borrow().len(), 1);
        let shot = shots.borrow()[0];
        let start = spawner.position(ship).unwrap();
        let expected = (Vec2::new(0.0, 4.0) - start).normalize();
        assert_eq!(shot.owner, BulletOwner::Enemy);
        assert!((shot.direction - expected).length() < 1e-5);

        world.ctx.timers.advance(1.5);
        assert_eq!(shots.borrow().len(), 2);
    }

    #[test]
    fn ship_crosses_the_screen_then_despawns() {
        let world = TestWorld::new();
        let spawner = EnemyShipSpawner::new(&world.ctx).unwrap();
        let ship = spawner.spawn_ship().unwrap();
        assert!(!world.ctx.viewport.is_on_screen(spawner.position(ship).unwrap()));

        let mut steps = 0;
        while spawner.active_count() > 0 && steps < 1_000 {
            spawner.update(0.1);
            steps += 1;
        }

        assert_eq!(spawner.active_count(), 0);
        assert!(steps > 10);
        assert_eq!(world.presenter.is_active(ship), Some(false));
        assert_eq!(world.ctx.timers.live_count(), 1);
    }

    #[test]
    fn player_kill_scores_but_enemy_fire_is_ignored() {
        let world = TestWorld::new();
        let spawner = EnemyShipSpawner::new(&world.ctx).unwrap();
        let destroyed = record::<EnemyShipDestroyed>(&world.ctx.bus);
        let explosions = record::<ExplosionRequested>(&world.ctx.bus);
        let ship = spawner.spawn_ship().unwrap();

        let enemy_bullet = EntityId::Bullet(BulletOwner::Enemy, PoolHandle::default());
        world.ctx.bus.publish(Collision { entity: ship, other: enemy_bullet });
        assert_eq!(spawner.active_count(), 1);

        let player_bullet = EntityId::Bullet(BulletOwner::Player, PoolHandle::default());
        world.ctx.bus.publish(Collision { entity: ship, other: player_bullet });
        assert_eq!(spawner.active_count(), 0);
        assert_eq!(destroyed.borrow()[0].points, 50);
        assert_eq!(explosions.borrow().len(), 1);
    }
}
