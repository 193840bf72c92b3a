//=========================================================================
// Pool<T>
//=========================================================================
//
// Slot storage with a free list of recycled instances and a vacant list of
// evicted slots whose storage index can be reused by the factory.
//
// Slot states:
//   in_use = true,  value = Some  → handed out
//   in_use = false, value = Some  → on the free list
//   in_use = false, value = None  → vacant (evicted)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::{PoolError, PoolHandle, Poolable};

//=== Overflow Policy =====================================================

/// What a pool does once `capacity` instances exist and none are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Soft cap: construct anyway. Instances released while the pool is over
    /// capacity are evicted instead of retained.
    Grow,

    /// Hard cap: `acquire` fails with [`PoolError::Exhausted`].
    Fail,
}

//=== PoolConfig ==========================================================

/// Capacity and overflow policy of a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub capacity: usize,
    pub overflow: Overflow,
}

impl PoolConfig {
    /// Hard-capped pool.
    pub fn hard(capacity: usize) -> Self {
        Self {
            capacity,
            overflow: Overflow::Fail,
        }
    }

    /// Soft-capped pool that grows on demand and trims back on release.
    pub fn soft(capacity: usize) -> Self {
        Self {
            capacity,
            overflow: Overflow::Grow,
        }
    }
}

//=== Slot ================================================================

struct Slot<T> {
    generation: u32,
    in_use: bool,
    value: Option<T>,
}

type Factory<T> = Box<dyn FnMut() -> T>;
type Hook<T> = Box<dyn FnMut(&mut T)>;

//=== Pool ================================================================

/// Bounded recycler of reusable instances.
///
/// Instances are constructed lazily by the factory the first time the free
/// list runs dry, handed out as [`PoolHandle`]s and looked up through
/// [`Pool::get`] / [`Pool::get_mut`].
///
/// # Example
///
/// ```
/// use arcade_runtime::core::pool::{Pool, PoolConfig, Poolable};
///
/// #[derive(Default)]
/// struct Shard { active: bool }
///
/// impl Poolable for Shard {
///     fn set_active(&mut self, active: bool) { self.active = active; }
///     fn is_active(&self) -> bool { self.active }
/// }
///
/// let mut pool = Pool::new(PoolConfig::hard(2), Shard::default);
/// let handle = pool.acquire().unwrap();
/// assert!(pool.get(handle).unwrap().is_active());
/// pool.release(handle).unwrap();
/// assert_eq!(pool.free_count(), 1);
/// ```
pub struct Pool<T: Poolable> {
    config: PoolConfig,
    factory: Factory<T>,
    on_acquire: Option<Hook<T>>,
    on_release: Option<Hook<T>>,
    on_evict: Option<Hook<T>>,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    vacant: Vec<usize>,
    live: usize,
    constructed: usize,
}

impl<T: Poolable> Pool<T> {
    //--- Construction -----------------------------------------------------

    /// Creates an empty pool. Nothing is constructed until the first acquire.
    pub fn new<F>(config: PoolConfig, factory: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        Self {
            config,
            factory: Box::new(factory),
            on_acquire: None,
            on_release: None,
            on_evict: None,
            slots: Vec::new(),
            free: Vec::new(),
            vacant: Vec::new(),
            live: 0,
            constructed: 0,
        }
    }

    /// Hook run on every instance handed out, after it is activated.
    pub fn on_acquire<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut T) + 'static,
    {
        self.on_acquire = Some(Box::new(hook));
        self
    }

    /// Hook run on every instance returned, after it is deactivated.
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut T) + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Hook run on every instance destroyed by the pool (over-capacity
    /// release or teardown).
    pub fn on_evict<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut T) + 'static,
    {
        self.on_evict = Some(Box::new(hook));
        self
    }

    //--- Lifecycle --------------------------------------------------------

    /// Hands out a ready-to-use instance.
    ///
    /// Reuses a released instance when one exists, otherwise constructs a new
    /// one subject to the overflow policy.
    pub fn acquire(&mut self) -> Result<PoolHandle, PoolError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => self.construct()?,
        };

        let slot = &mut self.slots[index];
        slot.in_use = true;
        let generation = slot.generation;

        if let Some(item) = slot.value.as_mut() {
            debug_assert!(!item.is_active(), "free pool item was active");
            item.set_active(true);
            if let Some(hook) = self.on_acquire.as_mut() {
                hook(item);
            }
        }

        self.live += 1;
        Ok(PoolHandle::new(index as u32, generation))
    }

    /// Returns an instance to the pool.
    ///
    /// Releasing a handle whose item is already free is reported as
    /// [`PoolError::DoubleRelease`] and leaves the pool untouched.
    pub fn release(&mut self, handle: PoolHandle) -> Result<(), PoolError> {
        let index = handle.index();
        let Some(slot) = self.slots.get_mut(index) else {
            warn!("Release of foreign pool handle (slot {})", index);
            return Err(PoolError::ForeignHandle { index });
        };

        if !slot.in_use || slot.generation != handle.generation() {
            warn!("Double release of pool slot {} ignored", index);
            return Err(PoolError::DoubleRelease { index });
        }

        slot.in_use = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;

        if let Some(item) = slot.value.as_mut() {
            item.set_active(false);
            if let Some(hook) = self.on_release.as_mut() {
                hook(item);
            }
        }

        if self.constructed > self.config.capacity {
            if let Some(mut item) = slot.value.take() {
                if let Some(hook) = self.on_evict.as_mut() {
                    hook(&mut item);
                }
            }
            self.constructed -= 1;
            self.vacant.push(index);
            debug!("Evicted pool slot {} (over capacity {})", index, self.config.capacity);
        } else {
            self.free.push(index);
        }

        Ok(())
    }

    /// Releases every in-use instance. Returns how many were released.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        for handle in self.handles() {
            if self.release(handle).is_ok() {
                drained += 1;
            }
        }
        drained
    }

    //--- Queries ----------------------------------------------------------

    /// Looks up an in-use instance.
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.in_use && slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    /// Looks up an in-use instance mutably.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.in_use && slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Returns true if the handle still refers to an in-use instance.
    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Handles of every in-use instance, in slot order.
    pub fn handles(&self) -> Vec<PoolHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Iterates in-use instances in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            if !slot.in_use {
                return None;
            }
            slot.value
                .as_ref()
                .map(|item| (PoolHandle::new(index as u32, slot.generation), item))
        })
    }

    /// Iterates in-use instances mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            if !slot.in_use {
                return None;
            }
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|item| (PoolHandle::new(index as u32, generation), item))
        })
    }

    /// Number of instances currently handed out.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of constructed instances waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of instances the pool currently owns (live + free).
    pub fn constructed_count(&self) -> usize {
        self.constructed
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    //--- Internal Helpers -------------------------------------------------

    fn construct(&mut self) -> Result<usize, PoolError> {
        if self.constructed >= self.config.capacity && self.config.overflow == Overflow::Fail {
            return Err(PoolError::Exhausted {
                capacity: self.config.capacity,
            });
        }

        let mut item = (self.factory)();
        item.set_active(false);
        self.constructed += 1;

        let index = match self.vacant.pop() {
            Some(index) => {
                self.slots[index].value = Some(item);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    in_use: false,
                    value: Some(item),
                });
                self.slots.len() - 1
            }
        };

        Ok(index)
    }
}

//=== Teardown ============================================================
//
// Every constructed instance leaves through the eviction hook.
//
impl<T: Poolable> Drop for Pool<T> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let Some(mut item) = slot.value.take() {
                item.set_active(false);
                if let Some(hook) = self.on_evict.as_mut() {
                    hook(&mut item);
                }
            }
        }
    }
}

//=== Debug Trait =========================================================
//
// Factories and hooks are opaque, so only the bookkeeping is printed.
//
impl<T: Poolable> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("live", &self.live)
            .field("free", &self.free.len())
            .field("constructed", &self.constructed)
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Rock {
        active: bool,
        serial: u32,
    }

    impl Poolable for Rock {
        fn set_active(&mut self, active: bool) {
            self.active = active;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn counting_pool(config: PoolConfig) -> (Pool<Rock>, Rc<Cell<u32>>) {
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();
        let pool = Pool::new(config, move || {
            counter.set(counter.get() + 1);
            Rock {
                active: false,
                serial: counter.get(),
            }
        });
        (pool, built)
    }

    //--- Round Trip -------------------------------------------------------

    #[test]
    fn released_instance_is_reused_with_hooks_once_each() {
        let acquired = Rc::new(Cell::new(0));
        let released = Rc::new(Cell::new(0));
        let (a, r) = (acquired.clone(), released.clone());

        let (pool, built) = counting_pool(PoolConfig::hard(4));
        let mut pool = pool
            .on_acquire(move |_| a.set(a.get() + 1))
            .on_release(move |_| r.set(r.get() + 1));

        let first = pool.acquire().unwrap();
        let serial = pool.get(first).unwrap().serial;
        pool.release(first).unwrap();

        let second = pool.acquire().unwrap();
        assert_eq!(pool.get(second).unwrap().serial, serial);
        assert_eq!(built.get(), 1);
        assert_eq!(acquired.get(), 2);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn acquired_items_are_active_and_released_items_are_not() {
        let (mut pool, _) = counting_pool(PoolConfig::hard(2));
        let handle = pool.acquire().unwrap();
        assert!(pool.get(handle).unwrap().is_active());

        pool.release(handle).unwrap();
        assert!(pool.get(handle).is_none());
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn simultaneous_acquires_never_share_a_slot() {
        let (mut pool, _) = counting_pool(PoolConfig::hard(8));
        let mut handles: Vec<_> = (0..5).map(|_| pool.acquire().unwrap()).collect();
        pool.release(handles.remove(1)).unwrap();
        pool.release(handles.remove(2)).unwrap();
        handles.push(pool.acquire().unwrap());
        handles.push(pool.acquire().unwrap());
        handles.push(pool.acquire().unwrap());

        let slots: HashSet<_> = handles.iter().map(|h| h.index()).collect();
        assert_eq!(slots.len(), handles.len());
        assert_eq!(pool.live_count(), 6);
    }

    //--- Capacity ---------------------------------------------------------

    #[test]
    fn hard_cap_reports_exhaustion() {
        let (mut pool, _) = counting_pool(PoolConfig::hard(2));
        pool.acquire().unwrap();
        pool.acquire().unwrap();
        assert_eq!(pool.acquire(), Err(PoolError::Exhausted { capacity: 2 }));
        assert_eq!(pool.live_count(), 2);
    }

    #[test]
    fn soft_cap_grows_then_evicts_surplus_on_release() {
        let evicted = Rc::new(Cell::new(0));
        let e = evicted.clone();
        let (pool, built) = counting_pool(PoolConfig::soft(2));
        let mut pool = pool.on_evict(move |_| e.set(e.get() + 1));

        let handles: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(built.get(), 3);
        assert_eq!(pool.constructed_count(), 3);

        for handle in handles {
            pool.release(handle).unwrap();
        }
        assert_eq!(evicted.get(), 1);
        assert_eq!(pool.constructed_count(), 2);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn evicted_slot_storage_is_reused() {
        let (mut pool, built) = counting_pool(PoolConfig::soft(1));
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(b).unwrap();
        pool.release(a).unwrap();

        let c = pool.acquire().unwrap();
        let d = pool.acquire().unwrap();
        assert_eq!(built.get(), 3);
        assert_ne!(c.index(), d.index());
        assert!(pool.get(c).is_some() && pool.get(d).is_some());
    }

    //--- Release Errors ---------------------------------------------------

    #[test]
    fn double_release_is_reported_and_harmless() {
        let (mut pool, _) = counting_pool(PoolConfig::hard(2));
        let handle = pool.acquire().unwrap();
        pool.release(handle).unwrap();

        assert_eq!(
            pool.release(handle),
            Err(PoolError::DoubleRelease { index: handle.index() })
        );
        assert_eq!(pool.free_count(), 1);

        let again = pool.acquire().unwrap();
        assert_eq!(pool.release(handle), Err(PoolError::DoubleRelease { index: 0 }));
        assert!(pool.contains(again));
    }

    #[test]
    fn out_of_range_handle_is_foreign() {
        let (mut pool, _) = counting_pool(PoolConfig::hard(2));
        let bogus = PoolHandle::new(7, 0);
        assert_eq!(pool.release(bogus), Err(PoolError::ForeignHandle { index: 7 }));
    }

    //--- Drain & Teardown -------------------------------------------------

    #[test]
    fn drain_releases_everything_in_use() {
        let (mut pool, _) = counting_pool(PoolConfig::hard(4));
        for _ in 0..3 {
            pool.acquire().unwrap();
        }
        assert_eq!(pool.drain(), 3);
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.free_count(), 3);
        assert!(pool.iter().next().is_none());
    }

    #[test]
    fn dropping_the_pool_evicts_every_instance() {
        let evicted = Rc::new(Cell::new(0));
        let e = evicted.clone();
        let (pool, _) = counting_pool(PoolConfig::hard(4));
        let mut pool = pool.on_evict(move |_| e.set(e.get() + 1));
        let keep = pool.acquire().unwrap();
        let spare = pool.acquire().unwrap();
        pool.release(spare).unwrap();
        assert!(pool.contains(keep));

        drop(pool);
        assert_eq!(evicted.get(), 2);
    }

    #[test]
    fn iter_mut_reaches_only_live_items() {
        let (mut pool, _) = counting_pool(PoolConfig::hard(4));
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(a).unwrap();

        for (_, rock) in pool.iter_mut() {
            rock.serial = 99;
        }
        assert_eq!(pool.get(b).unwrap().serial, 99);
        assert_eq!(pool.handles(), vec![b]);
    }
}
