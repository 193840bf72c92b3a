//=========================================================================
// Handler List Trait
//=========================================================================
//
// Type-erased view of one kind's registrations so that lists for different
// payload types can share a single HashMap.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use super::Event;

//=== Registration ========================================================

pub(super) type Handler<E> = Rc<dyn Fn(&E)>;

/// One subscribed handler and the id it was registered under.
pub(super) struct Registration<E: Event> {
    pub(super) id: u64,
    pub(super) handler: Handler<E>,
}

//=== HandlerList =========================================================

/// Operations on a kind's registrations that need no payload type.
pub(super) trait HandlerList {
    /// Removes the registration with `id`. Returns false if none matched.
    fn remove(&mut self, id: u64) -> bool;

    /// Number of registrations.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type name of the payload the handlers accept.
    fn payload_type(&self) -> &'static str;

    /// Downcasts to `&dyn Any` for type-specific operations.
    fn as_any(&self) -> &dyn Any;

    /// Downcasts to `&mut dyn Any` for type-specific operations.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> HandlerList for Vec<Registration<E>> {
    fn remove(&mut self, id: u64) -> bool {
        match self.iter().position(|registration| registration.id == id) {
            Some(index) => {
                // `Vec::remove` keeps the remaining registrations in order.
                Vec::remove(self, index);
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn payload_type(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Event for Ping {}

    struct Pong;
    impl Event for Pong {}

    fn list_of(ids: &[u64]) -> Vec<Registration<Ping>> {
        ids.iter()
            .map(|&id| Registration {
                id,
                handler: Rc::new(|_: &Ping| {}),
            })
            .collect()
    }

    #[test]
    fn remove_by_id_preserves_order() {
        let mut list = list_of(&[1, 2, 3]);
        let erased: &mut dyn HandlerList = &mut list;

        assert!(erased.remove(2));
        assert!(!erased.remove(2));
        assert_eq!(erased.len(), 2);

        let ids: Vec<_> = list.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn downcast_and_payload_type_work() {
        let mut list = list_of(&[7]);
        let erased: &mut dyn HandlerList = &mut list;

        assert!(erased.payload_type().ends_with("Ping"));
        assert!(erased.as_any().downcast_ref::<Vec<Registration<Ping>>>().is_some());
        assert!(erased.as_any_mut().downcast_mut::<Vec<Registration<Pong>>>().is_none());
        assert!(!erased.is_empty());
    }
}
