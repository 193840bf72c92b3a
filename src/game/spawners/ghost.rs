//=========================================================================
// Ghost Spawner (screen wrap)
//=========================================================================
//
// Every wrapping entity (ship, asteroids) is mirrored by eight ghosts on the
// neighbouring screen tiles, so anything crossing an edge is already visible
// and collidable on the opposite side.
//
//   UpperLeft  │ UpperMiddle │ UpperRight
//   ───────────┼─────────────┼───────────
//   MiddleLeft │   subject   │ MiddleRight
//   ───────────┼─────────────┼───────────
//   LowerLeft  │ LowerMiddle │ LowerRight
//
// Once the subject leaves the screen on an axis it swaps places with the
// ghost on the opposite side, and that axis stays locked for `swap_delay`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use glam::Vec2;
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::CoreError;
use crate::core::event_bus::Subscription;
use crate::core::globals::GlobalContext;
use crate::core::pool::{Pool, PoolConfig, PoolHandle, Poolable};
use crate::core::timer::{TimerHandle, TimerVariant};
use crate::core::viewport::Viewport;
use crate::game::entity::{EntityId, GhostTemplate};
use crate::game::events::GhostsEnabled;
use crate::game::wiring::subscribe_weak;

use super::EntitySpawner;

//=== Wrap Subjects =======================================================

/// Snapshot of one wrapping entity, reported by its owner each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapSubject {
    pub id: EntityId,
    pub position: Vec2,
    pub rotation: f32,
}

/// Owner of entities that wrap around the screen edges.
pub trait WrapTarget {
    /// Appends every live wrapping entity to `out`.
    fn wrap_subjects(&self, out: &mut Vec<WrapSubject>);

    /// Moves `id` to `position` as part of a wrap swap.
    fn teleport(&self, id: EntityId, position: Vec2);
}

//=== GhostPosition =======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GhostPosition {
    UpperRight,
    MiddleRight,
    LowerRight,
    LowerMiddle,
    LowerLeft,
    MiddleLeft,
    UpperLeft,
    UpperMiddle,
}

impl GhostPosition {
    pub const ALL: [GhostPosition; 8] = [
        Self::UpperRight,
        Self::MiddleRight,
        Self::LowerRight,
        Self::LowerMiddle,
        Self::LowerLeft,
        Self::MiddleLeft,
        Self::UpperLeft,
        Self::UpperMiddle,
    ];

    /// Tile this ghost sits on, in whole screens `(columns, rows)`.
    fn tile(self) -> (i32, i32) {
        match self {
            Self::UpperRight => (1, 1),
            Self::MiddleRight => (1, 0),
            Self::LowerRight => (1, -1),
            Self::LowerMiddle => (0, -1),
            Self::LowerLeft => (-1, -1),
            Self::MiddleLeft => (-1, 0),
            Self::UpperLeft => (-1, 1),
            Self::UpperMiddle => (0, 1),
        }
    }

    /// Displacement from the subject to this ghost.
    pub fn offset(self, viewport: &Viewport) -> Vec2 {
        let (columns, rows) = self.tile();
        viewport.tile_offset(columns, rows)
    }
}

//=== Ghost ===============================================================

#[derive(Debug)]
struct Ghost {
    active: bool,
    slot: GhostPosition,
    position: Vec2,
    rotation: f32,
}

impl Default for Ghost {
    fn default() -> Self {
        Self {
            active: false,
            slot: GhostPosition::UpperRight,
            position: Vec2::ZERO,
            rotation: 0.0,
        }
    }
}

impl Poolable for Ghost {
    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Ghosts and swap locks of one subject.
struct GhostSet {
    template: GhostTemplate,
    ghosts: Vec<PoolHandle>,
    swap_x: Option<TimerHandle>,
    swap_y: Option<TimerHandle>,
}

//=== GhostSpawner ========================================================

struct GhostShared {
    ctx: GlobalContext,
    pools: RefCell<HashMap<GhostTemplate, Pool<Ghost>>>,
    sets: RefCell<HashMap<EntityId, GhostSet>>,
    parents: RefCell<HashMap<EntityId, EntityId>>,
    disabled: RefCell<HashSet<EntityId>>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Screen-wrap ghosts for every subject reported by the wrap targets.
pub struct GhostSpawner {
    shared: Rc<GhostShared>,
}

impl GhostSpawner {
    pub fn new(ctx: &GlobalContext) -> Result<Self, CoreError> {
        let shared = Rc::new(GhostShared {
            ctx: ctx.clone(),
            pools: RefCell::new(HashMap::new()),
            sets: RefCell::new(HashMap::new()),
            parents: RefCell::new(HashMap::new()),
            disabled: RefCell::new(HashSet::new()),
            subscriptions: RefCell::new(Vec::new()),
        });

        let subscription = subscribe_weak(&ctx.bus, &shared, |spawner, e: &GhostsEnabled| {
            spawner.set_enabled(e.parent, e.enabled);
        })?;
        shared.subscriptions.borrow_mut().push(subscription);

        Ok(Self { shared })
    }

    /// Attaches and detaches ghost sets, performs wrap swaps and moves
    /// every ghost next to its subject.
    pub fn wrap(&self, targets: &[&dyn WrapTarget]) {
        let mut subjects = Vec::new();
        let mut seen = HashSet::new();

        for target in targets {
            subjects.clear();
            target.wrap_subjects(&mut subjects);

            for subject in &subjects {
                seen.insert(subject.id);
                self.shared.attach(subject.id);

                let position = match self.shared.swapped_position(subject) {
                    Some(position) => {
                        target.teleport(subject.id, position);
                        position
                    }
                    None => subject.position,
                };
                self.shared.reposition(subject.id, position, subject.rotation);
            }
        }

        let stale: Vec<EntityId> = self
            .shared
            .sets
            .borrow()
            .keys()
            .filter(|parent| !seen.contains(*parent))
            .copied()
            .collect();
        for parent in stale {
            self.shared.detach(parent);
        }
    }

    /// Maps a ghost to the entity it mirrors. Other ids map to themselves.
    /// Returns `None` for unknown ghosts and ghosts of a disabled parent.
    pub fn resolve(&self, entity: EntityId) -> Option<EntityId> {
        if !matches!(entity, EntityId::Ghost(..)) {
            return Some(entity);
        }
        let parent = self.shared.parents.borrow().get(&entity).copied()?;
        if self.shared.disabled.borrow().contains(&parent) {
            None
        } else {
            Some(parent)
        }
    }

    /// Ghosts currently mirroring `parent`.
    pub fn ghosts_of(&self, parent: EntityId) -> Vec<EntityId> {
        self.shared
            .sets
            .borrow()
            .get(&parent)
            .map(|set| {
                set.ghosts
                    .iter()
                    .map(|handle| EntityId::Ghost(set.template, *handle))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn position(&self, ghost: EntityId) -> Option<Vec2> {
        let EntityId::Ghost(template, handle) = ghost else {
            return None;
        };
        let pools = self.shared.pools.borrow();
        pools.get(&template)?.get(handle).map(|g| g.position)
    }
}

impl EntitySpawner for GhostSpawner {
    fn sync_presenter(&self) {
        let pools = self.shared.pools.borrow();
        for (template, pool) in pools.iter() {
            for (handle, ghost) in pool.iter() {
                let id = EntityId::Ghost(*template, handle);
                self.shared.ctx.presenter.set_transform(id, ghost.position, ghost.rotation);
            }
        }
    }

    fn active_count(&self) -> usize {
        self.shared.parents.borrow().len()
    }
}

impl GhostShared {
    //--- Attach / Detach --------------------------------------------------

    fn attach(&self, parent: EntityId) {
        if self.sets.borrow().contains_key(&parent) {
            return;
        }
        let Some(template) = parent.ghost_template() else {
            warn!("{:?} cannot have ghosts", parent);
            return;
        };

        let capacity = self.ctx.config.wrap.ghost_pool_capacity;
        let visible = !self.disabled.borrow().contains(&parent);
        let mut ghosts = Vec::with_capacity(GhostPosition::ALL.len());
        {
            let mut pools = self.pools.borrow_mut();
            let pool = pools
                .entry(template)
                .or_insert_with(|| Pool::new(PoolConfig::soft(capacity), Ghost::default));
            let mut parents = self.parents.borrow_mut();

            for slot in GhostPosition::ALL {
                let handle = match pool.acquire() {
                    Ok(handle) => handle,
                    Err(e) => {
                        warn!("Ghost skipped for {:?}: {}", parent, e);
                        continue;
                    }
                };
                if let Some(ghost) = pool.get_mut(handle) {
                    ghost.slot = slot;
                }
                let id = EntityId::Ghost(template, handle);
                parents.insert(id, parent);
                self.ctx.presenter.set_active(id, visible);
                ghosts.push(handle);
            }
        }

        let swap_x = self.create_lock();
        let swap_y = self.create_lock();
        self.sets.borrow_mut().insert(
            parent,
            GhostSet {
                template,
                ghosts,
                swap_x,
                swap_y,
            },
        );
        debug!("Ghosts attached to {:?}", parent);
    }

    fn create_lock(&self) -> Option<TimerHandle> {
        let delay = self.ctx.config.wrap.swap_delay;
        match self.ctx.timers.create(TimerVariant::Countdown, delay) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Wrap lock unavailable: {}", e);
                None
            }
        }
    }

    fn detach(&self, parent: EntityId) {
        let Some(set) = self.sets.borrow_mut().remove(&parent) else {
            return;
        };

        {
            let mut pools = self.pools.borrow_mut();
            let mut parents = self.parents.borrow_mut();
            if let Some(pool) = pools.get_mut(&set.template) {
                for handle in &set.ghosts {
                    let id = EntityId::Ghost(set.template, *handle);
                    parents.remove(&id);
                    self.ctx.presenter.set_active(id, false);
                    if let Err(e) = pool.release(*handle) {
                        warn!("Ghost release failed: {}", e);
                    }
                }
            }
        }

        for lock in [set.swap_x, set.swap_y].into_iter().flatten() {
            let _ = self.ctx.timers.release(lock);
        }
        self.disabled.borrow_mut().remove(&parent);
        debug!("Ghosts detached from {:?}", parent);
    }

    //--- Per Frame --------------------------------------------------------

    /// New position of a subject that left the screen, if a swap is due.
    /// Starts the lock of every axis that swapped.
    fn swapped_position(&self, subject: &WrapSubject) -> Option<Vec2> {
        let viewport = &self.ctx.viewport;
        let (off_x, off_y) = viewport.off_screen_axes(subject.position);
        if !off_x && !off_y {
            return None;
        }

        let (swap_x, swap_y) = {
            let sets = self.sets.borrow();
            let set = sets.get(&subject.id)?;
            (set.swap_x, set.swap_y)
        };

        let mut position = subject.position;
        let mut swapped = false;

        if off_x && self.unlocked(swap_x) {
            let ghost = if position.x > viewport.right() {
                GhostPosition::MiddleLeft
            } else {
                GhostPosition::MiddleRight
            };
            position.x += ghost.offset(viewport).x;
            self.lock(swap_x);
            swapped = true;
        }

        if off_y && self.unlocked(swap_y) {
            let ghost = if position.y > viewport.top() {
                GhostPosition::LowerMiddle
            } else {
                GhostPosition::UpperMiddle
            };
            position.y += ghost.offset(viewport).y;
            self.lock(swap_y);
            swapped = true;
        }

        swapped.then_some(position)
    }

    fn unlocked(&self, lock: Option<TimerHandle>) -> bool {
        lock.map_or(true, |handle| !self.ctx.timers.is_running(handle))
    }

    fn lock(&self, lock: Option<TimerHandle>) {
        if let Some(handle) = lock {
            let _ = self.ctx.timers.start(handle, Some(self.ctx.config.wrap.swap_delay));
        }
    }

    fn reposition(&self, parent: EntityId, position: Vec2, rotation: f32) {
        let sets = self.sets.borrow();
        let Some(set) = sets.get(&parent) else {
            return;
        };
        let mut pools = self.pools.borrow_mut();
        let Some(pool) = pools.get_mut(&set.template) else {
            return;
        };
        for handle in &set.ghosts {
            if let Some(ghost) = pool.get_mut(*handle) {
                ghost.position = position + ghost.slot.offset(&self.ctx.viewport);
                ghost.rotation = rotation;
            }
        }
    }

    //--- Visibility -------------------------------------------------------

    fn set_enabled(&self, parent: EntityId, enabled: bool) {
        if enabled {
            self.disabled.borrow_mut().remove(&parent);
        } else {
            self.disabled.borrow_mut().insert(parent);
        }

        let sets = self.sets.borrow();
        if let Some(set) = sets.get(&parent) {
            for handle in &set.ghosts {
                self.ctx
                    .presenter
                    .set_active(EntityId::Ghost(set.template, *handle), enabled);
            }
        }
    }
}

impl Drop for GhostShared {
    fn drop(&mut self) {
        for subscription in self.subscriptions.take() {
            self.ctx.bus.unsubscribe(subscription);
        }
        for set in self.sets.take().into_values() {
            for lock in [set.swap_x, set.swap_y].into_iter().flatten() {
                let _ = self.ctx.timers.release(lock);
            }
        }
    }
}

//=========================================================================
// Tests
//=========================================================================
