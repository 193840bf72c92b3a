//=========================================================================
// Projectile Spawner
//=========================================================================
//
// FireRequested ──> acquire from the owner's pool ──> fly
//                                                      │
//        release <── lifetime spent | off-screen | collision
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::CoreError;
use crate::core::event_bus::Subscription;
use crate::core::globals::GlobalContext;
use crate::core::pool::{Pool, PoolConfig, Poolable};
use crate::game::entity::{BulletOwner, EntityId};
use crate::game::events::{Collision, FireRequested, GameStateChanged};
use crate::game::round::GameState;
use crate::game::wiring::subscribe_weak;

use super::EntitySpawner;

//=== Bullet ==============================================================

#[derive(Debug, Default)]
struct Bullet {
    active: bool,
    position: Vec2,
    velocity: Vec2,
    /// Seconds left before the bullet expires.
    ttl: f32,
}

impl Poolable for Bullet {
    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Heading in degrees for a unit direction, zero pointing up.
fn heading(direction: Vec2) -> f32 {
    (-direction.x).atan2(direction.y).to_degrees()
}

//=== ProjectileSpawner ===================================================

struct ProjectileShared {
    ctx: GlobalContext,
    pools: RefCell<HashMap<BulletOwner, Pool<Bullet>>>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Player and enemy bullets.
pub struct ProjectileSpawner {
    shared: Rc<ProjectileShared>,
}

impl ProjectileSpawner {
    pub fn new(ctx: &GlobalContext) -> Result<Self, CoreError> {
        let config = &ctx.config.projectiles;
        let pools = HashMap::from([
            (
                BulletOwner::Player,
                Pool::new(PoolConfig::hard(config.player_capacity), Bullet::default),
            ),
            (
                BulletOwner::Enemy,
                Pool::new(PoolConfig::hard(config.enemy_capacity), Bullet::default),
            ),
        ]);

        let shared = Rc::new(ProjectileShared {
            ctx: ctx.clone(),
            pools: RefCell::new(pools),
            subscriptions: RefCell::new(Vec::new()),
        });

        let bus = &ctx.bus;
        let subscriptions = vec![
            subscribe_weak(bus, &shared, |spawner, e: &FireRequested| {
                spawner.fire(e.owner, e.position, e.direction);
            })?,
            subscribe_weak(bus, &shared, |spawner, e: &Collision| {
                spawner.on_collision(e);
            })?,
            subscribe_weak(bus, &shared, |spawner, e: &GameStateChanged| {
                if matches!(e.state, GameState::StartGame | GameState::GameOver) {
                    spawner.retire_all();
                }
            })?,
        ];
        *shared.subscriptions.borrow_mut() = subscriptions;

        Ok(Self { shared })
    }

    /// Fires a bullet directly. Returns `None` if the owner's pool is full.
    pub fn fire(&self, owner: BulletOwner, position: Vec2, direction: Vec2) -> Option<EntityId> {
        self.shared.fire(owner, position, direction)
    }

    pub fn count(&self, owner: BulletOwner) -> usize {
        self.shared.pools.borrow().get(&owner).map_or(0, Pool::live_count)
    }

    pub fn position(&self, bullet: EntityId) -> Option<Vec2> {
        let EntityId::Bullet(owner, handle) = bullet else {
            return None;
        };
        let pools = self.shared.pools.borrow();
        pools.get(&owner)?.get(handle).map(|b| b.position)
    }
}

impl EntitySpawner for ProjectileSpawner {
    fn update(&self, dt: f32) {
        let viewport = &self.shared.ctx.viewport;
        let mut expired = Vec::new();
        {
            let mut pools = self.shared.pools.borrow_mut();
            for (owner, pool) in pools.iter_mut() {
                for (handle, bullet) in pool.iter_mut() {
                    bullet.position += bullet.velocity * dt;
                    bullet.ttl -= dt;
                    if bullet.ttl <= 0.0 || !viewport.is_on_screen(bullet.position) {
                        expired.push(EntityId::Bullet(*owner, handle));
                    }
                }
            }
        }
        for bullet in expired {
            self.shared.retire(bullet);
        }
    }

    fn sync_presenter(&self) {
        let pools = self.shared.pools.borrow();
        for (owner, pool) in pools.iter() {
            for (handle, bullet) in pool.iter() {
                let id = EntityId::Bullet(*owner, handle);
                let rotation = heading(bullet.velocity.normalize_or_zero());
                self.shared.ctx.presenter.set_transform(id, bullet.position, rotation);
            }
        }
    }

    fn active_count(&self) -> usize {
        self.shared.pools.borrow().values().map(Pool::live_count).sum()
    }
}

impl ProjectileShared {
    fn fire(&self, owner: BulletOwner, position: Vec2, direction: Vec2) -> Option<EntityId> {
        let config = &self.ctx.config.projectiles;
        let speed = match owner {
            BulletOwner::Player => config.player_speed,
            BulletOwner::Enemy => config.enemy_speed,
        };

        let handle = {
            let mut pools = self.pools.borrow_mut();
            let pool = pools.get_mut(&owner)?;
            let handle = match pool.acquire() {
                Ok(handle) => handle,
                Err(e) => {
                    debug!("{:?} bullet skipped: {}", owner, e);
                    return None;
                }
            };
            if let Some(bullet) = pool.get_mut(handle) {
                bullet.position = position;
                bullet.velocity = direction.normalize_or_zero() * speed;
                bullet.ttl = config.lifetime;
            }
            handle
        };

        let id = EntityId::Bullet(owner, handle);
        self.ctx.presenter.set_transform(id, position, heading(direction));
        self.ctx.presenter.set_active(id, true);
        Some(id)
    }

    fn on_collision(&self, collision: &Collision) {
        let EntityId::Bullet(owner, _) = collision.entity else {
            return;
        };
        let friendly = match (owner, collision.other) {
            (_, EntityId::Bullet(..)) | (_, EntityId::Explosion(_)) => true,
            (BulletOwner::Player, EntityId::Ship) => true,
            (BulletOwner::Enemy, EntityId::EnemyShip(..)) => true,
            _ => false,
        };
        if !friendly {
            self.retire(collision.entity);
        }
    }

    fn retire(&self, bullet: EntityId) {
        let EntityId::Bullet(owner, handle) = bullet else {
            return;
        };
        let released = {
            let mut pools = self.pools.borrow_mut();
            match pools.get_mut(&owner) {
                // Already retired by an earlier contact this frame.
                Some(pool) if !pool.contains(handle) => return,
                Some(pool) => pool.release(handle),
                None => return,
            }
        };
        match released {
            Ok(()) => self.ctx.presenter.set_active(bullet, false),
            Err(e) => warn!("Bullet release failed: {}", e),
        }
    }

    fn retire_all(&self) {
        let bullets: Vec<EntityId> = {
            let pools = self.pools.borrow();
            pools
                .iter()
                .flat_map(|(owner, pool)| {
                    pool.handles()
                        .into_iter()
                        .map(move |handle| EntityId::Bullet(*owner, handle))
                })
                .collect()
        };
        for bullet in bullets {
            self.retire(bullet);
        }
    }
}

impl Drop for ProjectileShared {
    fn drop(&mut self) {
        for subscription in self.subscriptions.take() {
            self.ctx.bus.unsubscribe(subscription);
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
    use crate::testing::TestWorld;

    fn fire_player(world: &TestWorld) {
        world.ctx.bus.publish(FireRequested {
            owner: BulletOwner::Player,
            position: Vec2::ZERO,
            direction: Vec2::Y,
        });
    }

    #[test]
    fn player_bullets_are_capped_at_four() {
        let world = TestWorld::new();
        let spawner = ProjectileSpawner::new(&world.ctx).unwrap();

        for _ in 0..6 {
            fire_player(&world);
        }
        assert_eq!(spawner.count(BulletOwner::Player), 4);
        assert!(spawner.fire(BulletOwner::Enemy, Vec2::ZERO, Vec2::X).is_some());
    }

    #[test]
    fn bullets_fly_then_expire() {
        let world = TestWorld::new();
        let spawner = ProjectileSpawner::new(&world.ctx).unwrap();
        let bullet = spawner.fire(BulletOwner::Player, Vec2::ZERO, Vec2::Y).unwrap();

        spawner.update(0.1);
        assert!((spawner.position(bullet).unwrap().y - 1.0).abs() < 1e-5);

        // Off the top edge before the lifetime runs out.
        for _ in 0..5 {
            spawner.update(0.1);
        }
        assert_eq!(spawner.active_count(), 0);
        assert_eq!(world.presenter.is_active(bullet), Some(false));
    }

    #[test]
    fn slow_bullets_expire_by_lifetime() {
        let world = TestWorld::new();
        let spawner = ProjectileSpawner::new(&world.ctx).unwrap();
        spawner.fire(BulletOwner::Enemy, Vec2::new(-8.0, 0.0), Vec2::X).unwrap();

        spawner.update(1.0);
        assert_eq!(spawner.active_count(), 1);
        spawner.update(0.25);
        assert_eq!(spawner.active_count(), 0);
    }

    #[test]
    fn collisions_retire_except_with_friends() {
        let world = TestWorld::new();
        let spawner = ProjectileSpawner::new(&world.ctx).unwrap();
        let bullet = spawner.fire(BulletOwner::Player, Vec2::ZERO, Vec2::Y).unwrap();

        world.ctx.bus.publish(Collision { entity: bullet, other: EntityId::Ship });
        assert_eq!(spawner.active_count(), 1);

        let rock = EntityId::Asteroid(AsteroidSize::Small, PoolHandle::default());
        world.ctx.bus.publish(Collision { entity: bullet, other: rock });
        assert_eq!(spawner.active_count(), 0);
    }

    #[test]
    fn new_game_clears_bullets() {
        let world = TestWorld::new();
        let spawner = ProjectileSpawner::new(&world.ctx).unwrap();
        fire_player(&world);
        spawner.fire(BulletOwner::Enemy, Vec2::ZERO, Vec2::X).unwrap();

        world.ctx.bus.publish(GameStateChanged { state: GameState::StartGame, round: 0 });
        assert_eq!(spawner.active_count(), 0);
    }
}
