//! Dormant rolling hazard.
//!
//! Sits still until a hostile body comes within `activation_distance`, then
//! rolls at a constant speed, reversing on walls. It never attacks; all of its
//! damage comes from its contact profile.

use chimera_common::Vec2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::AgentCore;
use crate::hostile::TickContext;
use crate::world::CombatWorld;

/// Rolling hazard state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingHazard {
    activation_distance: f32,
    roll_speed: f32,
    direction: f32,
    wall_check: f32,
    active: bool,
}

impl Default for RollingHazard {
    fn default() -> Self {
        Self {
            activation_distance: 4.0,
            roll_speed: 5.0,
            direction: -1.0,
            wall_check: 0.3,
            active: false,
        }
    }
}

impl RollingHazard {
    /// Creates a dormant hazard.
    #[must_use]
    pub fn new(activation_distance: f32, roll_speed: f32) -> Self {
        Self {
            activation_distance,
            roll_speed,
            ..Self::default()
        }
    }

    /// Set the initial roll direction (sign only).
    #[must_use]
    pub fn rolling_right(mut self, right: bool) -> Self {
        self.direction = if right { 1.0 } else { -1.0 };
        self
    }

    /// Set the wall check distance.
    #[must_use]
    pub fn with_wall_check(mut self, distance: f32) -> Self {
        self.wall_check = distance;
        self
    }

    /// Checks if rolling.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current roll direction.
    #[must_use]
    pub fn direction(&self) -> f32 {
        self.direction
    }

    /// Activation distance.
    #[must_use]
    pub fn activation_distance(&self) -> f32 {
        self.activation_distance
    }
}

/// Full tick for a rolling hazard.
pub fn tick(
    hazard: &mut RollingHazard,
    core: &mut AgentCore,
    world: &mut dyn CombatWorld,
    ctx: &mut TickContext<'_>,
) {
    if !hazard.active {
        core.velocity = Vec2::ZERO;
        let nearest =
            world.nearest_hostile(core.position, hazard.activation_distance, core.team(), false);
        let Some(body) = nearest else {
            return;
        };
        hazard.active = true;
        core.force_chase(Some(body.id), ctx.now);
        info!("{} ({}) starts rolling toward {}", core.id(), core.blueprint(), body.id);
    }

    let heading = Vec2::new(hazard.direction, 0.0);
    if world.wall_ahead(core.position, heading, hazard.wall_check) {
        hazard.direction = -hazard.direction;
    }
    core.velocity = Vec2::new(hazard.direction * hazard.roll_speed, 0.0);
}
