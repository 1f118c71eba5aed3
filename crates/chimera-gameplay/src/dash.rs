//! Aerial rise-and-dash.
//!
//! The flyer hovers in a small loop until it has a target, rises to a fixed
//! offset above it, lines up horizontally and dashes, re-aiming every tick.
//! After the dash it recovers, pauses and starts over.

use chimera_common::math::{direction, sign};
use chimera_common::Vec2;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentCore, AgentState};
use crate::attack::AttackPhase;
use crate::hostile::{AttackSlot, TickContext};
use crate::world::CombatWorld;

/// Dash tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashTuning {
    /// Radius of the idle hover loop
    pub hover_radius: f32,
    /// Angular speed of the hover loop (radians per second)
    pub hover_rate: f32,
    /// Height above the target to rise to before dashing
    pub rise_offset: f32,
    /// Vertical speed while rising
    pub rise_speed: f32,
    /// Horizontal error accepted before the dash starts
    pub align_tolerance: f32,
    /// Dash speed
    pub dash_speed: f32,
    /// Velocity decay rate while recovering
    pub recover_damping: f32,
    /// Pause between dashes
    pub pause_time: f32,
    /// Lowest allowed height above the target
    pub min_height: f32,
    /// Target is dropped beyond `detect_radius` times this
    pub lose_distance_factor: f32,
}

impl Default for DashTuning {
    fn default() -> Self {
        Self {
            hover_radius: 0.5,
            hover_rate: 2.0,
            rise_offset: 3.0,
            rise_speed: 5.0,
            align_tolerance: 0.3,
            dash_speed: 9.0,
            recover_damping: 4.0,
            pause_time: 0.8,
            min_height: 0.5,
            lose_distance_factor: 1.6,
        }
    }
}

/// Dash cycle step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DashMode {
    /// Idle hover loop
    #[default]
    Hover,
    /// Climbing above the target
    Rise,
    /// Lining up horizontally
    Align,
    /// Dashing (the attack sequence runs)
    Dash,
    /// Waiting before the next rise
    Pause,
}

/// Rise/dash flyer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashFlyer {
    tuning: DashTuning,
    mode: DashMode,
    mode_time: f32,
    anchor: Vec2,
    hover_angle: f32,
}

impl DashFlyer {
    /// Creates a hovering flyer.
    #[must_use]
    pub fn new(tuning: DashTuning) -> Self {
        Self {
            tuning,
            mode: DashMode::Hover,
            mode_time: 0.0,
            anchor: Vec2::ZERO,
            hover_angle: 0.0,
        }
    }

    /// Get tuning.
    #[must_use]
    pub fn tuning(&self) -> &DashTuning {
        &self.tuning
    }

    /// Get the dash mode.
    #[must_use]
    pub fn mode(&self) -> DashMode {
        self.mode
    }

    /// Anchors the hover loop at the spawn point.
    pub fn on_spawn(&mut self, core: &AgentCore) {
        self.anchor = core.position;
    }

    fn set_mode(&mut self, mode: DashMode) {
        self.mode = mode;
        self.mode_time = 0.0;
    }

    fn hover(&mut self, core: &mut AgentCore, dt: f32) {
        self.hover_angle = (self.hover_angle + self.tuning.hover_rate * dt) % std::f32::consts::TAU;
        let offset = Vec2::new(self.hover_angle.cos(), self.hover_angle.sin());
        let goal = self.anchor + offset * self.tuning.hover_radius;
        core.velocity = (goal - core.position) * 4.0;
    }

    fn go_hover(&mut self, core: &mut AgentCore, slot: &mut AttackSlot) {
        slot.cancel();
        core.lose_target();
        core.velocity = Vec2::ZERO;
        self.anchor = core.position;
        self.set_mode(DashMode::Hover);
    }

    /// Vertical speed toward `goal_y` without overshooting in one tick.
    fn climb(&self, from_y: f32, goal_y: f32, dt: f32) -> f32 {
        let dy = goal_y - from_y;
        let max_step = if dt > 0.0 { dy.abs() / dt } else { 0.0 };
        sign(dy) * self.tuning.rise_speed.min(max_step)
    }
}

/// Full tick for a rise/dash flyer.
pub fn tick(
    flyer: &mut DashFlyer,
    core: &mut AgentCore,
    slot: &mut AttackSlot,
    world: &mut dyn CombatWorld,
    ctx: &mut TickContext<'_>,
) {
    let (now, dt) = (ctx.now, ctx.dt);
    flyer.mode_time += dt;

    core.detect(world, now, true);
    if core.state() == AgentState::Patrol {
        if flyer.mode != DashMode::Hover {
            flyer.go_hover(core, slot);
        }
        flyer.hover(core, dt);
        return;
    }

    let Some(target) = core.refresh_target(world) else {
        flyer.go_hover(core, slot);
        return;
    };
    let lose_distance = core.stats().detect_radius * flyer.tuning.lose_distance_factor;
    if core.position.distance(target.position) > lose_distance {
        flyer.go_hover(core, slot);
        return;
    }

    let goal_y = target.position.y + flyer.tuning.rise_offset;
    match flyer.mode {
        DashMode::Hover => {
            flyer.set_mode(DashMode::Rise);
            core.velocity = Vec2::new(0.0, flyer.climb(core.position.y, goal_y, dt));
        }
        DashMode::Rise => {
            if (goal_y - core.position.y).abs() <= 0.2 {
                flyer.set_mode(DashMode::Align);
            }
            core.velocity = Vec2::new(0.0, flyer.climb(core.position.y, goal_y, dt));
        }
        DashMode::Align => {
            let dx = target.position.x - core.position.x;
            let vy = flyer.climb(core.position.y, goal_y, dt);
            if dx.abs() <= flyer.tuning.align_tolerance {
                let ready = core.cooldown_ready(now, core.stats().attack_cooldown);
                let launched = match slot.descriptor().cloned() {
                    Some(descriptor) if ready => slot.launch(core, descriptor, Some(&target), now),
                    _ => false,
                };
                if launched {
                    flyer.set_mode(DashMode::Dash);
                    let aim = direction(core.position, target.position);
                    core.velocity = aim * flyer.tuning.dash_speed;
                } else {
                    core.velocity = Vec2::new(0.0, vy);
                }
            } else {
                let max_step = if dt > 0.0 { dx.abs() / dt } else { 0.0 };
                core.velocity = Vec2::new(sign(dx) * core.chase_speed().min(max_step), vy);
            }
        }
        DashMode::Dash => {
            let step = slot.advance(core, world, ctx);
            if step.finished || !slot.is_running() {
                core.end_attack();
                core.velocity = Vec2::ZERO;
                flyer.set_mode(DashMode::Pause);
            } else if slot.sequence().is_some_and(|s| s.phase() == AttackPhase::Recovery) {
                let damping = (flyer.tuning.recover_damping * dt).min(1.0);
                core.velocity = core.velocity.lerp(Vec2::ZERO, damping);
            } else {
                let aim = direction(core.position, target.position);
                core.velocity = aim * flyer.tuning.dash_speed;
            }
        }
        DashMode::Pause => {
            core.velocity = Vec2::ZERO;
            if flyer.mode_time >= flyer.tuning.pause_time {
                flyer.set_mode(DashMode::Rise);
            }
        }
    }

    core.hold_above(target.position.y + flyer.tuning.min_height, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStats;
    use crate::area::test_world::TestWorld;
    use crate::attack::AttackDescriptor;
    use crate::health::HealthPool;
    use crate::world::Team;
    use chimera_common::EntityId;

    fn drone_at(y: f32) -> AgentCore {
        AgentCore::new(EntityId::from_raw(30), "drone", Vec2::new(0.0, y), AgentStats::default())
    }

    fn run(
        world: &mut TestWorld,
        core: &mut AgentCore,
        flyer: &mut DashFlyer,
        slot: &mut AttackSlot,
        ticks: usize,
        now: &mut f32,
    ) -> Vec<DashMode> {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut modes = Vec::new();
        for _ in 0..ticks {
            let mut spawns = Vec::new();
            let mut ctx = TickContext {
                now: *now,
                dt: 0.02,
                rng: &mut rng,
                spawns: &mut spawns,
            };
            tick(flyer, core, slot, world, &mut ctx);
            core.integrate(0.02);
            *now += 0.02;
            modes.push(flyer.mode());
        }
        modes
    }

    #[test]
    fn test_hovers_without_target() {
        let mut world = TestWorld::default();
        let mut core = drone_at(5.0);
        let mut flyer = DashFlyer::new(DashTuning::default());
        flyer.on_spawn(&core);
        let mut slot = AttackSlot::new(Some(AttackDescriptor::dash(10.0, 0.8)));
        let mut now = 0.0;
        let modes = run(&mut world, &mut core, &mut flyer, &mut slot, 100, &mut now);
        assert!(modes.iter().all(|m| *m == DashMode::Hover));
        assert!(core.position.distance(Vec2::new(0.0, 5.0)) < 1.0);
    }

    #[test]
    fn test_full_dash_cycle_hits_target() {
        let mut world = TestWorld::default();
        let pool = HealthPool::new(100.0).with_invulnerability(0.5);
        world.add(1, Team::Player, Vec2::new(3.0, 0.0), pool);
        let mut core = drone_at(1.0);
        let mut flyer = DashFlyer::new(DashTuning::default());
        flyer.on_spawn(&core);
        let mut slot = AttackSlot::new(Some(AttackDescriptor::dash(10.0, 0.8)));
        let mut now = 0.0;

        let modes = run(&mut world, &mut core, &mut flyer, &mut slot, 300, &mut now);
        for expected in [DashMode::Rise, DashMode::Align, DashMode::Dash, DashMode::Pause] {
            assert!(modes.contains(&expected), "never entered {expected:?}");
        }
        assert!(world.get(1).pool.current() < 100.0);
    }

    #[test]
    fn test_never_drops_below_min_height() {
        let mut world = TestWorld::default();
        world.add(1, Team::Player, Vec2::new(0.5, 0.0), HealthPool::new(1000.0));
        let mut core = drone_at(4.0);
        let mut flyer = DashFlyer::new(DashTuning::default());
        flyer.on_spawn(&core);
        let mut slot = AttackSlot::new(Some(AttackDescriptor::dash(1.0, 0.8)));
        let mut now = 0.0;
        for _ in 0..20 {
            run(&mut world, &mut core, &mut flyer, &mut slot, 10, &mut now);
            assert!(core.position.y >= 0.5 - 1e-3);
        }
    }
}
