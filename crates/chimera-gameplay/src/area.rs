//! Area damage resolution.
//!
//! One call resolves one strike: query the world around a center, drop the
//! attacker and its allies, apply damage once per remaining body, and push
//! the bodies that actually lost health.

use chimera_common::{EntityId, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attack::{AttackDescriptor, Knockback};
use crate::world::{CombatWorld, Team};

/// A single strike to resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaStrike {
    /// Attacking entity (never hit by its own strike)
    pub attacker: EntityId,
    /// Attacker allegiance
    pub team: Team,
    /// Center of the damage circle
    pub center: Vec2,
    /// Radius of the damage circle
    pub radius: f32,
    /// Damage per body
    pub damage: f32,
    /// Knockback and the point it pushes away from
    pub knockback: Option<(Knockback, Vec2)>,
    /// Hit only the body nearest the center
    pub single_target: bool,
    /// Simulation time of the strike
    pub now: f32,
}

impl AreaStrike {
    /// Creates a multi-target strike without knockback.
    #[must_use]
    pub fn new(
        attacker: EntityId,
        team: Team,
        center: Vec2,
        radius: f32,
        damage: f32,
        now: f32,
    ) -> Self {
        Self {
            attacker,
            team,
            center,
            radius,
            damage,
            knockback: None,
            single_target: false,
            now,
        }
    }

    /// Strike described by `descriptor`, centered at `center`, launched by an
    /// attacker standing at `origin`.
    #[must_use]
    pub fn from_descriptor(
        attacker: EntityId,
        team: Team,
        origin: Vec2,
        center: Vec2,
        descriptor: &AttackDescriptor,
        now: f32,
    ) -> Self {
        let mut strike = Self::new(
            attacker,
            team,
            center,
            descriptor.shape.radius() + descriptor.reach_slack,
            descriptor.damage,
            now,
        );
        strike.knockback = descriptor.knockback.map(|k| (k, origin));
        strike.single_target = descriptor.single_target;
        strike
    }

    /// Adds knockback pushing away from `origin`.
    #[must_use]
    pub fn with_knockback(mut self, knockback: Knockback, origin: Vec2) -> Self {
        self.knockback = Some((knockback, origin));
        self
    }

    /// Restricts the strike to the nearest body.
    #[must_use]
    pub fn single_target(mut self) -> Self {
        self.single_target = true;
        self
    }
}

/// Outcome for one body that lost health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitReport {
    /// Body that was hit
    pub target: EntityId,
    /// Health actually removed
    pub damage: f32,
    /// Impulse applied, if any
    pub knockback: Option<Vec2>,
    /// Whether the hit emptied the body's health
    pub killed: bool,
}

/// Resolves `strike` against the world.
///
/// Bodies inside an invulnerability window are passed over silently and
/// receive no knockback.
pub fn resolve(world: &mut dyn CombatWorld, strike: &AreaStrike) -> Vec<HitReport> {
    if strike.damage <= 0.0 || strike.radius <= 0.0 {
        return Vec::new();
    }

    let mut candidates: Vec<_> = world
        .bodies_within(strike.center, strike.radius)
        .into_iter()
        .filter(|b| b.id != strike.attacker && b.alive && strike.team.is_hostile_to(b.team))
        .collect();
    candidates.sort_by(|a, b| {
        let da = a.position.distance_squared(strike.center);
        let db = b.position.distance_squared(strike.center);
        da.total_cmp(&db).then(a.id.cmp(&b.id))
    });
    if strike.single_target {
        candidates.truncate(1);
    }

    let mut reports = Vec::with_capacity(candidates.len());
    for body in candidates {
        let Some(target) = world.damageable_mut(body.id) else {
            continue;
        };
        let before = target.current_health();
        target.take_damage(strike.damage, strike.now);
        let after = target.current_health();
        if after >= before {
            continue;
        }

        let knockback = strike.knockback.map(|(kb, origin)| kb.impulse(origin, body.position));
        if let Some(impulse) = knockback {
            target.apply_impulse(impulse);
        }
        debug!(
            "{} hit {} for {:.1} ({:.1} left)",
            strike.attacker,
            body.id,
            before - after,
            after
        );
        reports.push(HitReport {
            target: body.id,
            damage: before - after,
            knockback,
            killed: after <= 0.0,
        });
    }
    reports
}

#[cfg(test)]
pub(crate) mod test_world {
    //! Minimal in-memory world for unit tests.

    use super::*;
    use crate::health::{Damageable, HealthPool};
    use crate::world::BodyInfo;

    #[derive(Debug)]
    pub struct TestBody {
        pub info: BodyInfo,
        pub pool: HealthPool,
        pub impulses: Vec<Vec2>,
    }

    impl Damageable for TestBody {
        fn take_damage(&mut self, amount: f32, now: f32) {
            self.pool.take_damage(amount, now);
        }
        fn heal(&mut self, amount: f32) {
            self.pool.heal(amount);
        }
        fn current_health(&self) -> f32 {
            self.pool.current()
        }
        fn apply_impulse(&mut self, impulse: Vec2) {
            self.impulses.push(impulse);
        }
    }

    #[derive(Debug, Default)]
    pub struct TestWorld {
        pub bodies: Vec<TestBody>,
        pub walls: crate::physics::CollisionGrid,
    }

    impl TestWorld {
        pub fn add(&mut self, id: u64, team: Team, position: Vec2, pool: HealthPool) {
            self.bodies.push(TestBody {
                info: BodyInfo {
                    id: EntityId::from_raw(id),
                    team,
                    position,
                    velocity: Vec2::ZERO,
                    alive: true,
                },
                pool,
                impulses: Vec::new(),
            });
        }

        pub fn get(&self, id: u64) -> &TestBody {
            self.bodies
                .iter()
                .find(|b| b.info.id.raw() == id)
                .expect("test body exists")
        }

        pub fn set_position(&mut self, id: u64, position: Vec2) {
            if let Some(b) = self.bodies.iter_mut().find(|b| b.info.id.raw() == id) {
                b.info.position = position;
            }
        }

        pub fn remove(&mut self, id: u64) {
            self.bodies.retain(|b| b.info.id.raw() != id);
        }
    }

    impl CombatWorld for TestWorld {
        fn bodies_within(&self, center: Vec2, radius: f32) -> Vec<BodyInfo> {
            self.bodies
                .iter()
                .map(|b| BodyInfo {
                    alive: !b.pool.is_dead(),
                    ..b.info
                })
                .filter(|b| b.position.distance(center) <= radius)
                .collect()
        }

        fn body(&self, id: EntityId) -> Option<BodyInfo> {
            self.bodies.iter().find(|b| b.info.id == id).map(|b| BodyInfo {
                alive: !b.pool.is_dead(),
                ..b.info
            })
        }

        fn is_obstructed(&self, from: Vec2, to: Vec2) -> bool {
            crate::physics::is_obstructed(&self.walls, from, to)
        }

        fn wall_ahead(&self, origin: Vec2, direction: Vec2, distance: f32) -> bool {
            crate::physics::wall_ahead(&self.walls, origin, direction, distance)
        }

        fn damageable_mut(&mut self, id: EntityId) -> Option<&mut dyn Damageable> {
            self.bodies
                .iter_mut()
                .find(|b| b.info.id == id)
                .map(|b| b as &mut dyn Damageable)
        }
    }
}
