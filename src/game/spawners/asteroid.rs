//=========================================================================
// Asteroid Spawner
//=========================================================================
//
// StartFirstRound / StartRound ──> wave of Large asteroids
// GameOver / StartGame         ──> retire everything
//
// destroy():
//   ExplosionRequested ──> split (2 × smaller) ──> release
//        ──> AsteroidDestroyed ──> AsteroidFieldCleared (last one gone)
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

use crate::core::config::AsteroidConfig;
use crate::core::error::CoreError;
use crate::core::event_bus::Subscription;
use crate::core::globals::GlobalContext;
use crate::core::pool::{Pool, PoolConfig, PoolHandle, Poolable};
use crate::game::entity::{AsteroidSize, BulletOwner, EntityId};
use crate::game::events::{
    AsteroidDestroyed, AsteroidFieldCleared, Collision, ExplosionRequested, GameStateChanged,
    ShipMoved,
};
use crate::game::round::GameState;
use crate::game::wiring::subscribe_weak;

use super::{EntitySpawner, WrapSubject, WrapTarget};

/// Random spawn points tried before settling for one too close to the ship.
const SPAWN_ATTEMPTS: usize = 32;

/// Upper bound of the spin speed, degrees per second.
const MAX_SPIN: f32 = 90.0;

fn speed(config: &AsteroidConfig, size: AsteroidSize) -> f32 {
    match size {
        AsteroidSize::Large => config.large_speed,
        AsteroidSize::Medium => config.medium_speed,
        AsteroidSize::Small => config.small_speed,
    }
}

fn points(config: &AsteroidConfig, size: AsteroidSize) -> u64 {
    match size {
        AsteroidSize::Large => config.large_points,
        AsteroidSize::Medium => config.medium_points,
        AsteroidSize::Small => config.small_points,
    }
}

//=== Asteroid ============================================================

#[derive(Debug, Default)]
struct Asteroid {
    active: bool,
    position: Vec2,
    velocity: Vec2,
    rotation: f32,
    spin: f32,
}

impl Poolable for Asteroid {
    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

//=== AsteroidSpawner =====================================================

struct AsteroidShared {
    ctx: GlobalContext,
    pools: RefCell<HashMap<AsteroidSize, Pool<Asteroid>>>,
    ship_position: Cell<Vec2>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Asteroid waves, splitting and the round-over trigger.
pub struct AsteroidSpawner {
    shared: Rc<AsteroidShared>,
}

impl AsteroidSpawner {
    pub fn new(ctx: &GlobalContext) -> Result<Self, CoreError> {
        let capacity = ctx.config.asteroids.pool_capacity;
        let pools = AsteroidSize::ALL
            .into_iter()
            .map(|size| (size, Pool::new(PoolConfig::hard(capacity), Asteroid::default)))
            .collect();

        let shared = Rc::new(AsteroidShared {
            ctx: ctx.clone(),
            pools: RefCell::new(pools),
            ship_position: Cell::new(Vec2::ZERO),
            subscriptions: RefCell::new(Vec::new()),
        });

        let bus = &ctx.bus;
        let subscriptions = vec![
            subscribe_weak(bus, &shared, |spawner, e: &GameStateChanged| match e.state {
                GameState::StartFirstRound | GameState::StartRound => spawner.spawn_wave(e.round),
                GameState::GameOver | GameState::StartGame => spawner.release_all(),
                _ => {}
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

    /// Spawns one asteroid drifting away from `position`.
    pub fn spawn(&self, size: AsteroidSize, position: Vec2) -> Option<EntityId> {
        self.shared.spawn(size, position)
    }

    /// Destroys an asteroid; see the module header for the event order.
    /// Returns false if `asteroid` is not live.
    pub fn destroy(&self, asteroid: EntityId, player_caused: bool) -> bool {
        self.shared.destroy(asteroid, player_caused)
    }

    pub fn count(&self, size: AsteroidSize) -> usize {
        self.shared.pools.borrow().get(&size).map_or(0, Pool::live_count)
    }

    pub fn asteroids(&self) -> Vec<EntityId> {
        let pools = self.shared.pools.borrow();
        AsteroidSize::ALL
            .into_iter()
            .flat_map(|size| {
                pools
                    .get(&size)
                    .map(Pool::handles)
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |handle| EntityId::Asteroid(size, handle))
            })
            .collect()
    }

    pub fn position(&self, asteroid: EntityId) -> Option<Vec2> {
        let EntityId::Asteroid(size, handle) = asteroid else {
            return None;
        };
        let pools = self.shared.pools.borrow();
        pools.get(&size)?.get(handle).map(|a| a.position)
    }
}

impl EntitySpawner for AsteroidSpawner {
    fn update(&self, dt: f32) {
        let mut pools = self.shared.pools.borrow_mut();
        for pool in pools.values_mut() {
            for (_, asteroid) in pool.iter_mut() {
                asteroid.position += asteroid.velocity * dt;
                asteroid.rotation = (asteroid.rotation + asteroid.spin * dt) % 360.0;
            }
        }
    }

    fn sync_presenter(&self) {
        let pools = self.shared.pools.borrow();
        for (size, pool) in pools.iter() {
            for (handle, asteroid) in pool.iter() {
                let id = EntityId::Asteroid(*size, handle);
                self.shared
                    .ctx
                    .presenter
                    .set_transform(id, asteroid.position, asteroid.rotation);
            }
        }
    }

    fn active_count(&self) -> usize {
        self.shared.active_count()
    }
}

impl WrapTarget for AsteroidSpawner {
    fn wrap_subjects(&self, out: &mut Vec<WrapSubject>) {
        let pools = self.shared.pools.borrow();
        for (size, pool) in pools.iter() {
            out.extend(pool.iter().map(|(handle, asteroid)| WrapSubject {
                id: EntityId::Asteroid(*size, handle),
                position: asteroid.position,
                rotation: asteroid.rotation,
            }));
        }
    }

    fn teleport(&self, id: EntityId, position: Vec2) {
        let EntityId::Asteroid(size, handle) = id else {
            return;
        };
        let mut pools = self.shared.pools.borrow_mut();
        if let Some(asteroid) = pools.get_mut(&size).and_then(|pool| pool.get_mut(handle)) {
            asteroid.position = position;
        }
    }
}

impl AsteroidShared {
    fn active_count(&self) -> usize {
        self.pools.borrow().values().map(Pool::live_count).sum()
    }

    //--- Spawning ---------------------------------------------------------

    fn spawn(&self, size: AsteroidSize, position: Vec2) -> Option<EntityId> {
        let handle = match self.acquire(size) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("{:?} asteroid skipped: {}", size, e);
                return None;
            }
        };

        let speed = speed(&self.ctx.config.asteroids, size);
        let (velocity, rotation, spin) = self.ctx.with_rng(|rng| {
            let heading = rng.gen_range(0.0..TAU);
            (
                Vec2::from_angle(heading) * speed,
                rng.gen_range(0.0f32..360.0),
                rng.gen_range(-MAX_SPIN..=MAX_SPIN),
            )
        });

        if let Some(asteroid) = self
            .pools
            .borrow_mut()
            .get_mut(&size)
            .and_then(|pool| pool.get_mut(handle))
        {
            asteroid.position = position;
            asteroid.velocity = velocity;
            asteroid.rotation = rotation;
            asteroid.spin = spin;
        }

        let id = EntityId::Asteroid(size, handle);
        self.ctx.presenter.set_transform(id, position, rotation);
        self.ctx.presenter.set_active(id, true);
        Some(id)
    }

    fn acquire(&self, size: AsteroidSize) -> Result<PoolHandle, CoreError> {
        let mut pools = self.pools.borrow_mut();
        let pool = pools
            .entry(size)
            .or_insert_with(|| {
                let capacity = self.ctx.config.asteroids.pool_capacity;
                Pool::new(PoolConfig::hard(capacity), Asteroid::default)
            });
        Ok(pool.acquire()?)
    }

    fn spawn_wave(&self, round: u32) {
        let config = &self.ctx.config.asteroids;
        let count = config
            .base_count
            .saturating_add(round.saturating_sub(1))
            .min(config.max_count);

        for _ in 0..count {
            let position = self.spawn_point();
            self.spawn(AsteroidSize::Large, position);
        }
        info!("Round {}: spawned {} asteroids", round, count);
    }

    /// Random visible point away from the last known ship position.
    fn spawn_point(&self) -> Vec2 {
        let ship = self.ship_position.get();
        let min_distance = self.ctx.config.asteroids.min_spawn_distance;

        let mut candidate = self.ctx.random_visible_position();
        for _ in 1..SPAWN_ATTEMPTS {
            if candidate.distance(ship) >= min_distance {
                break;
            }
            candidate = self.ctx.random_visible_position();
        }
        candidate
    }

    //--- Destruction ------------------------------------------------------

    fn on_collision(&self, collision: &Collision) {
        if !matches!(collision.entity, EntityId::Asteroid(..)) {
            return;
        }
        let player_caused = match collision.other {
            EntityId::Ship | EntityId::Bullet(BulletOwner::Player, _) => true,
            EntityId::Bullet(BulletOwner::Enemy, _) | EntityId::EnemyShip(..) => false,
            _ => return,
        };
        self.destroy(collision.entity, player_caused);
    }

    fn destroy(&self, asteroid: EntityId, player_caused: bool) -> bool {
        let EntityId::Asteroid(size, handle) = asteroid else {
            return false;
        };
        let Some(position) = self
            .pools
            .borrow()
            .get(&size)
            .and_then(|pool| pool.get(handle))
            .map(|a| a.position)
        else {
            return false;
        };

        self.ctx.bus.publish(ExplosionRequested { position });

        if let Some(fragment) = size.smaller() {
            for _ in 0..2 {
                self.spawn(fragment, position);
            }
        }

        self.release(asteroid);

        let points = if player_caused {
            points(&self.ctx.config.asteroids, size)
        } else {
            0
        };
        self.ctx.bus.publish(AsteroidDestroyed {
            size,
            position,
            points,
        });
        debug!("{:?} asteroid destroyed at {}", size, position);

        if self.active_count() == 0 {
            self.ctx.bus.publish(AsteroidFieldCleared);
        }
        true
    }

    //--- Release ----------------------------------------------------------

    fn release(&self, asteroid: EntityId) {
        let EntityId::Asteroid(size, handle) = asteroid else {
            return;
        };
        let released = self
            .pools
            .borrow_mut()
            .get_mut(&size)
            .map(|pool| pool.release(handle));
        match released {
            Some(Ok(())) => self.ctx.presenter.set_active(asteroid, false),
            Some(Err(e)) => warn!("Asteroid release failed: {}", e),
            None => {}
        }
    }

    fn release_all(&self) {
        let mut released = 0;
        for size in AsteroidSize::ALL {
            let handles = self.pools.borrow().get(&size).map(Pool::handles).unwrap_or_default();
            for handle in handles {
                self.release(EntityId::Asteroid(size, handle));
                released += 1;
            }
        }
        if released > 0 {
            debug!("Released {} asteroids", released);
        }
    }
}

impl Drop for AsteroidShared {
    fn drop(&mut self) {
        for subscription in self.subscriptions.take() {
            self.ctx.bus.unsubscribe(subscription);
        }
    }
}

//=========================================================================
// Tests
//=========================================================================
