//! Ground movement: horizontal patrol routes and direct chase.

use chimera_common::math::sign;
use chimera_common::Vec2;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentCore, AgentState};
use crate::hostile::{AttackSlot, TickContext};
use crate::world::{BodyInfo, CombatWorld};

/// Distance at which a waypoint counts as reached.
const WAYPOINT_TOLERANCE: f32 = 0.2;

/// How a ground agent patrols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatrolRoute {
    /// Walk until a wall check hits, then turn around.
    Bounce,
    /// Stay within `start_x ± radius`; walls inside the bounds also turn.
    Radius {
        /// Patrol center (set from the spawn position)
        start_x: f32,
        /// Half-width of the patrol band
        radius: f32,
    },
    /// Cycle through patrol points by their x coordinate.
    Waypoints {
        /// Patrol points
        points: Vec<Vec2>,
        /// Index of the point being walked to
        index: usize,
    },
}

/// Ground patrol and chase steering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundMover {
    route: PatrolRoute,
    /// Current horizontal direction, -1 or 1
    move_dir: f32,
    /// Patrol speed (falls back to the walk speed when not positive)
    patrol_speed: f32,
    /// Forward wall check length
    wall_check: f32,
}

impl GroundMover {
    /// Creates a mover on `route`.
    #[must_use]
    pub fn new(route: PatrolRoute) -> Self {
        Self {
            route,
            move_dir: 1.0,
            patrol_speed: 2.0,
            wall_check: 0.2,
        }
    }

    /// Set the patrol speed.
    #[must_use]
    pub fn with_patrol_speed(mut self, speed: f32) -> Self {
        self.patrol_speed = speed;
        self
    }

    /// Set the wall check length.
    #[must_use]
    pub fn with_wall_check(mut self, distance: f32) -> Self {
        self.wall_check = distance.max(0.0);
        self
    }

    /// Set the walking direction.
    #[must_use]
    pub fn facing(mut self, dir: f32) -> Self {
        self.move_dir = sign(dir);
        self
    }

    /// Get the patrol route.
    #[must_use]
    pub fn route(&self) -> &PatrolRoute {
        &self.route
    }

    /// Current horizontal direction.
    #[must_use]
    pub fn move_dir(&self) -> f32 {
        self.move_dir
    }

    /// Picks a random initial direction.
    pub fn on_spawn(&mut self, rng: &mut fastrand::Rng) {
        self.move_dir = if rng.f32() < 0.5 { -1.0 } else { 1.0 };
    }

    /// Sets the patrol velocity for this tick.
    pub fn patrol(&mut self, core: &mut AgentCore, world: &dyn CombatWorld) {
        let speed = if self.patrol_speed > 0.0 {
            self.patrol_speed
        } else {
            core.stats().walk_speed
        };
        let x = core.position.x;

        match &mut self.route {
            PatrolRoute::Bounce => {
                if world.wall_ahead(core.position, Vec2::new(self.move_dir, 0.0), self.wall_check) {
                    self.move_dir = -self.move_dir;
                }
            }
            PatrolRoute::Radius { start_x, radius } => {
                if x <= *start_x - *radius {
                    self.move_dir = 1.0;
                } else if x >= *start_x + *radius {
                    self.move_dir = -1.0;
                } else if world.wall_ahead(
                    core.position,
                    Vec2::new(self.move_dir, 0.0),
                    self.wall_check,
                ) {
                    self.move_dir = -self.move_dir;
                }
            }
            PatrolRoute::Waypoints { points, index } => {
                let Some(point) = points.get(*index).copied() else {
                    core.velocity = Vec2::ZERO;
                    return;
                };
                self.move_dir = sign(point.x - x);
                if (point.x - x).abs() < WAYPOINT_TOLERANCE {
                    *index = (*index + 1) % points.len();
                }
            }
        }

        core.velocity = Vec2::new(self.move_dir * speed, 0.0);
    }

    /// Steers straight at the target's horizontal position.
    pub fn chase(&mut self, core: &mut AgentCore, target: &BodyInfo) {
        self.move_dir = sign(target.position.x - core.position.x);
        core.velocity = Vec2::new(self.move_dir * core.chase_speed(), 0.0);
    }
}

/// Full tick for a ground agent.
pub fn tick(
    mover: &mut GroundMover,
    core: &mut AgentCore,
    slot: &mut AttackSlot,
    world: &mut dyn CombatWorld,
    ctx: &mut TickContext<'_>,
) {
    core.detect(world, ctx.now, true);
    let target = core.refresh_target(world);

    match core.state() {
        AgentState::Patrol => mover.patrol(core, world),
        AgentState::Chase => match target {
            Some(target) => {
                mover.chase(core, &target);
                slot.try_begin(core, &target, ctx.now);
            }
            None => {
                core.lose_target();
                mover.patrol(core, world);
            }
        },
        AgentState::Attack => slot.run_melee_cycle(core, target, world, ctx),
        AgentState::Dead => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStats;
    use crate::area::test_world::TestWorld;
    use chimera_common::EntityId;

    fn core_at(x: f32) -> AgentCore {
        AgentCore::new(EntityId::from_raw(7), "grunt", Vec2::new(x, 0.5), AgentStats::default())
    }

    #[test]
    fn test_radius_patrol_reverses_at_bound() {
        let world = TestWorld::default();
        let mut mover = GroundMover::new(PatrolRoute::Radius {
            start_x: 0.0,
            radius: 5.0,
        })
        .facing(1.0);
        let mut core = core_at(4.0);

        mover.patrol(&mut core, &world);
        assert_eq!(mover.move_dir(), 1.0);

        core.position.x = 5.0;
        mover.patrol(&mut core, &world);
        assert_eq!(mover.move_dir(), -1.0);
        assert!(core.velocity.x < 0.0);

        core.position.x = -5.0;
        mover.patrol(&mut core, &world);
        assert_eq!(mover.move_dir(), 1.0);
    }

    #[test]
    fn test_wall_check_reverses_inside_bounds() {
        let mut world = TestWorld::default();
        world.walls.add_wall(2, 0, 2);
        let mut mover = GroundMover::new(PatrolRoute::Radius {
            start_x: 0.0,
            radius: 5.0,
        })
        .facing(1.0);
        let mut core = core_at(1.9);

        mover.patrol(&mut core, &world);
        assert_eq!(mover.move_dir(), -1.0);
        assert_eq!(core.velocity, Vec2::new(-2.0, 0.0));
    }

    #[test]
    fn test_bounce_patrol_walks_until_wall() {
        let mut world = TestWorld::default();
        world.walls.add_wall(3, 0, 2);
        let mut mover = GroundMover::new(PatrolRoute::Bounce).facing(1.0);
        let mut core = core_at(0.0);
        for _ in 0..200 {
            mover.patrol(&mut core, &world);
            core.integrate(0.02);
        }
        assert!(core.position.x < 3.0);
        assert_eq!(mover.move_dir(), -1.0);
    }

    #[test]
    fn test_waypoints_cycle() {
        let world = TestWorld::default();
        let mut mover = GroundMover::new(PatrolRoute::Waypoints {
            points: vec![Vec2::new(2.0, 0.0), Vec2::new(-2.0, 0.0)],
            index: 0,
        });
        let mut core = core_at(1.9);
        mover.patrol(&mut core, &world);
        assert!(matches!(mover.route(), PatrolRoute::Waypoints { index: 1, .. }));

        mover.patrol(&mut core, &world);
        assert_eq!(mover.move_dir(), -1.0);
    }

    #[test]
    fn test_chase_uses_chase_speed() {
        let mut mover = GroundMover::new(PatrolRoute::Bounce);
        let mut core = core_at(0.0);
        let target = BodyInfo {
            id: EntityId::from_raw(1),
            team: crate::world::Team::Player,
            position: Vec2::new(-3.0, 0.0),
            velocity: Vec2::ZERO,
            alive: true,
        };
        mover.chase(&mut core, &target);
        assert_eq!(core.velocity, Vec2::new(-4.0, 0.0));
    }
}
