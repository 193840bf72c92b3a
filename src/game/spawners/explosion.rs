//=========================================================================
// Explosion Spawner
//=========================================================================
//
// ExplosionRequested ──> acquire ──> play clip ──> countdown(duration)
//                                                        │ on stop
//              release explosion + timer <── ExplosionCompleted
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::CoreError;
use crate::core::event_bus::Subscription;
use crate::core::globals::GlobalContext;
use crate::core::pool::{Pool, PoolConfig, PoolHandle, Poolable};
use crate::core::timer::TimerVariant;
use crate::game::entity::EntityId;
use crate::game::events::{ExplosionCompleted, ExplosionRequested, GameStateChanged};
use crate::game::round::GameState;
use crate::game::wiring::{on_stop_weak, subscribe_weak, OwnedTimer};

use super::EntitySpawner;

//=== Explosion ===========================================================

#[derive(Debug, Default)]
struct Explosion {
    active: bool,
    position: Vec2,
    timer: Option<OwnedTimer>,
}

impl Poolable for Explosion {
    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

//=== ExplosionSpawner ====================================================

struct ExplosionShared {
    ctx: GlobalContext,
    pool: RefCell<Pool<Explosion>>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Short-lived explosion effects, each retired by its own countdown.
pub struct ExplosionSpawner {
    shared: Rc<ExplosionShared>,
}

impl ExplosionSpawner {
    pub fn new(ctx: &GlobalContext) -> Result<Self, CoreError> {
        let pool = Pool::new(
            PoolConfig::hard(ctx.config.explosion.pool_capacity),
            Explosion::default,
        );
        let shared = Rc::new(ExplosionShared {
            ctx: ctx.clone(),
            pool: RefCell::new(pool),
            subscriptions: RefCell::new(Vec::new()),
        });

        let bus = &ctx.bus;
        let subscriptions = vec![
            subscribe_weak(bus, &shared, |spawner, e: &ExplosionRequested| {
                spawner.spawn(e.position);
            })?,
            subscribe_weak(bus, &shared, |spawner, e: &ExplosionCompleted| {
                spawner.retire(e.explosion);
            })?,
            subscribe_weak(bus, &shared, |spawner, e: &GameStateChanged| {
                if e.state == GameState::StartGame {
                    spawner.retire_all();
                }
            })?,
        ];
        *shared.subscriptions.borrow_mut() = subscriptions;

        Ok(Self { shared })
    }

    /// Spawns an explosion directly. Returns `None` if the pool is exhausted.
    pub fn spawn(&self, position: Vec2) -> Option<PoolHandle> {
        self.shared.spawn(position)
    }

    pub fn position(&self, explosion: PoolHandle) -> Option<Vec2> {
        self.shared.pool.borrow().get(explosion).map(|e| e.position)
    }
}

impl EntitySpawner for ExplosionSpawner {
    fn active_count(&self) -> usize {
        self.shared.pool.borrow().live_count()
    }
}

impl ExplosionShared {
    fn spawn(self: &Rc<Self>, position: Vec2) -> Option<PoolHandle> {
        let handle = match self.pool.borrow_mut().acquire() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Explosion skipped: {}", e);
                return None;
            }
        };

        let timer = match self.create_timer(handle) {
            Ok(timer) => timer,
            Err(e) => {
                warn!("Explosion skipped: {}", e);
                let _ = self.pool.borrow_mut().release(handle);
                return None;
            }
        };

        if let Some(explosion) = self.pool.borrow_mut().get_mut(handle) {
            explosion.position = position;
            explosion.timer = Some(timer);
        }

        let id = EntityId::Explosion(handle);
        self.ctx.presenter.set_transform(id, position, 0.0);
        self.ctx.presenter.set_active(id, true);
        self.ctx.play_clip(&self.ctx.config.audio.explosion);
        let _ = self.ctx.timers.start(timer.handle, None);

        debug!("Explosion spawned at {}", position);
        Some(handle)
    }

    fn create_timer(self: &Rc<Self>, explosion: PoolHandle) -> Result<OwnedTimer, CoreError> {
        let timers = &self.ctx.timers;
        let handle = timers.create(TimerVariant::Countdown, self.ctx.config.explosion.duration)?;
        let callback = on_stop_weak(timers, handle, self, move |spawner| {
            spawner.ctx.bus.publish(ExplosionCompleted { explosion });
        })?;
        Ok(OwnedTimer { handle, callback })
    }

    fn retire(&self, explosion: PoolHandle) {
        let timer = {
            let mut pool = self.pool.borrow_mut();
            let Some(timer) = pool.get_mut(explosion).map(|e| e.timer.take()) else {
                return;
            };
            if pool.release(explosion).is_err() {
                return;
            }
            timer
        };

        self.ctx.presenter.set_active(EntityId::Explosion(explosion), false);
        if let Some(timer) = timer {
            timer.release(&self.ctx.timers);
        }
    }

    fn retire_all(&self) {
        let handles = self.pool.borrow().handles();
        for handle in handles {
            self.retire(handle);
        }
    }
}

impl Drop for ExplosionShared {
    fn drop(&mut self) {
        for subscription in self.subscriptions.take() {
            self.ctx.bus.unsubscribe(subscription);
        }
        self.retire_all();
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

    #[test]
    fn request_spawns_and_countdown_retires() {
        let world = TestWorld::new();
        let spawner = ExplosionSpawner::new(&world.ctx).unwrap();
        let done = record::<ExplosionCompleted>(&world.ctx.bus);

        world.ctx.bus.publish(ExplosionRequested { position: Vec2::new(1.0, 2.0) });
        assert_eq!(spawner.active_count(), 1);
        assert_eq!(world.audio.count("Explosion"), 1);
        assert_eq!(world.ctx.timers.live_count(), 1);

        world.ctx.timers.advance(0.5);
        assert_eq!(spawner.active_count(), 1);
        world.ctx.timers.advance(0.5);

        assert_eq!(done.borrow().len(), 1);
        assert_eq!(spawner.active_count(), 0);
        assert_eq!(world.ctx.timers.live_count(), 0);
        let id = EntityId::Explosion(done.borrow()[0].explosion);
        assert_eq!(world.presenter.is_active(id), Some(false));
    }

    #[test]
    fn exhausted_pool_skips_the_explosion() {
        let mut config = GameConfig::default();
        config.explosion.pool_capacity = 2;
        let world = TestWorld::with_config(config);
        let spawner = ExplosionSpawner::new(&world.ctx).unwrap();

        for _ in 0..3 {
            world.ctx.bus.publish(ExplosionRequested { position: Vec2::ZERO });
        }
        assert_eq!(spawner.active_count(), 2);
        assert_eq!(world.audio.count("Explosion"), 2);

        world.ctx.timers.advance(1.0);
        assert!(spawner.spawn(Vec2::ONE).is_some());
    }

    #[test]
    fn new_game_clears_lingering_explosions() {
        let world = TestWorld::new();
        let spawner = ExplosionSpawner::new(&world.ctx).unwrap();
        let handle = spawner.spawn(Vec2::new(3.0, 0.0)).unwrap();
        assert_eq!(spawner.position(handle), Some(Vec2::new(3.0, 0.0)));

        world.ctx.bus.publish(GameStateChanged { state: GameState::StartGame, round: 0 });
        assert_eq!(spawner.active_count(), 0);
        assert_eq!(world.ctx.timers.live_count(), 0);
    }
}
