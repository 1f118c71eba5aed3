//! The world as seen by an agent during its tick.
//!
//! Agents never hold references to other entities. They ask the world for
//! bodies near a point, look a remembered [`EntityId`] up again each tick, and
//! reach another entity's health only through [`Damageable`].

use chimera_common::{EntityId, Vec2};
use serde::{Deserialize, Serialize};

use crate::health::Damageable;

/// Allegiance used to decide who may hurt whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// The player and anything fighting for them
    Player,
    /// Hostile agents
    Hostile,
}

impl Team {
    /// Whether members of `self` may damage members of `other`.
    #[must_use]
    pub fn is_hostile_to(self, other: Team) -> bool {
        self != other
    }
}

/// Snapshot of a body returned by world queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyInfo {
    /// Entity ID
    pub id: EntityId,
    /// Allegiance
    pub team: Team,
    /// World position
    pub position: Vec2,
    /// Current velocity
    pub velocity: Vec2,
    /// Whether the body still has health left
    pub alive: bool,
}

/// Target acquisition and damage routing boundary.
pub trait CombatWorld {
    /// All bodies whose position lies within `radius` of `center`.
    fn bodies_within(&self, center: Vec2, radius: f32) -> Vec<BodyInfo>;

    /// Looks a body up by ID. `None` means the entity no longer exists.
    fn body(&self, id: EntityId) -> Option<BodyInfo>;

    /// Whether level geometry blocks the segment between two points.
    fn is_obstructed(&self, from: Vec2, to: Vec2) -> bool;

    /// Short forward wall check for walls.
    fn wall_ahead(&self, origin: Vec2, direction: Vec2, distance: f32) -> bool;

    /// Mutable access to an entity's damage contract.
    fn damageable_mut(&mut self, id: EntityId) -> Option<&mut dyn Damageable>;

    /// Nearest living hostile body within `radius`, optionally requiring an
    /// unobstructed line from `center`.
    fn nearest_hostile(
        &self,
        center: Vec2,
        radius: f32,
        team: Team,
        line_of_sight: bool,
    ) -> Option<BodyInfo> {
        self.bodies_within(center, radius)
            .into_iter()
            .filter(|b| b.alive && team.is_hostile_to(b.team))
            .filter(|b| !line_of_sight || !self.is_obstructed(center, b.position))
            .min_by(|a, b| {
                let da = a.position.distance_squared(center);
                let db = b.position.distance_squared(center);
                da.total_cmp(&db).then(a.id.cmp(&b.id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_hostility() {
        assert!(Team::Hostile.is_hostile_to(Team::Player));
        assert!(!Team::Hostile.is_hostile_to(Team::Hostile));
    }
}
