//=========================================================================
// Entity Identity
//=========================================================================
//
// Every entity the runtime manages is named by an `EntityId`. The variant
// says which spawner owns it; the payload is the key into that spawner's
// pools. Ids are plain values and never keep an entity alive.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::pool::PoolHandle;

//=== Variant Keys ========================================================

/// Asteroid size. Destroying one splits it into two of the next size down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AsteroidSize {
    Small,
    Medium,
    Large,
}

impl AsteroidSize {
    pub const ALL: [AsteroidSize; 3] = [Self::Small, Self::Medium, Self::Large];

    /// Size of the fragments this asteroid splits into, if any.
    pub fn smaller(self) -> Option<Self> {
        match self {
            Self::Large => Some(Self::Medium),
            Self::Medium => Some(Self::Small),
            Self::Small => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyShipClass {
    /// Fires in random directions.
    Slow,
    /// Aims at the player.
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulletOwner {
    Player,
    Enemy,
}

/// Shape a ghost mirrors; one ghost pool per template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GhostTemplate {
    Ship,
    Asteroid(AsteroidSize),
}

//=== EntityId ============================================================

/// Non-owning name of a live entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// The single player ship.
    Ship,
    Asteroid(AsteroidSize, PoolHandle),
    EnemyShip(EnemyShipClass, PoolHandle),
    Bullet(BulletOwner, PoolHandle),
    Explosion(PoolHandle),
    Ghost(GhostTemplate, PoolHandle),
}

impl EntityId {
    /// True for anything that destroys the player ship on contact.
    pub fn is_hazard_to_player(self) -> bool {
        matches!(
            self,
            Self::Asteroid(..) | Self::EnemyShip(..) | Self::Bullet(BulletOwner::Enemy, _)
        )
    }

    /// Ghost template for entities that wrap around the screen.
    pub fn ghost_template(self) -> Option<GhostTemplate> {
        match self {
            Self::Ship => Some(GhostTemplate::Ship),
            Self::Asteroid(size, _) => Some(GhostTemplate::Asteroid(size)),
            _ => None,
        }
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asteroids_split_down_to_nothing() {
        assert_eq!(AsteroidSize::Large.smaller(), Some(AsteroidSize::Medium));
        assert_eq!(AsteroidSize::Medium.smaller(), Some(AsteroidSize::Small));
        assert_eq!(AsteroidSize::Small.smaller(), None);
    }

    #[test]
    fn hazards_exclude_player_bullets_and_effects() {
        let handle = PoolHandle::default();
        assert!(EntityId::Asteroid(AsteroidSize::Small, handle).is_hazard_to_player());
        assert!(EntityId::Bullet(BulletOwner::Enemy, handle).is_hazard_to_player());
        assert!(!EntityId::Bullet(BulletOwner::Player, handle).is_hazard_to_player());
        assert!(!EntityId::Explosion(handle).is_hazard_to_player());
    }

    #[test]
    fn only_ship_and_asteroids_wrap() {
        let handle = PoolHandle::default();
        assert_eq!(EntityId::Ship.ghost_template(), Some(GhostTemplate::Ship));
        assert_eq!(
            EntityId::Asteroid(AsteroidSize::Large, handle).ghost_template(),
            Some(GhostTemplate::Asteroid(AsteroidSize::Large))
        );
        assert_eq!(EntityId::EnemyShip(EnemyShipClass::Fast, handle).ghost_template(), None);
    }
}
