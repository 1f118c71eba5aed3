//! Aerial circling and diving.
//!
//! The flyer orbits a point above its target, breaks orbit at random to dive,
//! strikes at strike height, flees, calms down and returns to the orbit.
//! Gravity never applies; the flyer is steered by velocity alone.

use chimera_common::math::{direction, perpendicular, smooth_damp};
use chimera_common::Vec2;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{AgentCore, AgentState};
use crate::hostile::{AttackSlot, TickContext};
use crate::world::{BodyInfo, CombatWorld};

/// Flight tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CirclingTuning {
    /// Orbit speed
    pub flight_speed: f32,
    /// Orbit height above the target
    pub circling_height: f32,
    /// Lowest comfortable height above the target
    pub min_height: f32,
    /// Spring strength pulling toward the orbit point
    pub height_restore: f32,
    /// Noise amplitude
    pub noise_strength: f32,
    /// Velocity smoothing time
    pub smooth_time: f32,
    /// Dive speed as a multiple of the orbit speed
    pub dive_multiplier: f32,
    /// Flee speed
    pub flee_speed: f32,
    /// Flee duration
    pub flee_duration: f32,
    /// Calm-down duration
    pub calm_time: f32,
    /// Dive probability per second once the cooldown has elapsed
    pub attack_chance_per_sec: f32,
    /// Seconds between orbit direction flips
    pub direction_change_interval: f32,
    /// Hover time before engaging after spawn or losing a target
    pub initial_idle: f32,
    /// Target is dropped beyond `detect_radius` times this
    pub lose_distance_factor: f32,
}

impl Default for CirclingTuning {
    fn default() -> Self {
        Self {
            flight_speed: 4.5,
            circling_height: 3.2,
            min_height: 1.8,
            height_restore: 7.0,
            noise_strength: 0.9,
            smooth_time: 0.15,
            dive_multiplier: 3.2,
            flee_speed: 11.0,
            flee_duration: 0.9,
            calm_time: 2.5,
            attack_chance_per_sec: 0.1,
            direction_change_interval: 6.0,
            initial_idle: 2.0,
            lose_distance_factor: 1.6,
        }
    }
}

/// What the flyer is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightMode {
    /// Hovering in place
    #[default]
    Idle,
    /// Orbiting above the target
    Circling,
    /// Diving at the target
    Diving,
    /// Escaping after a strike
    Fleeing,
    /// Slowing down
    Calming,
    /// Flying back to the orbit
    Returning,
}

/// Perlin field rebuilt from its seed after deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NoiseField {
    seed: u32,
    #[serde(skip)]
    perlin: Option<Perlin>,
}

impl NoiseField {
    fn new(seed: u32) -> Self {
        Self {
            seed,
            perlin: Some(Perlin::new(seed)),
        }
    }

    /// Sample in `[-0.5, 0.5]`.
    fn sample(&mut self, x: f64, y: f64) -> f32 {
        let seed = self.seed;
        let perlin = self.perlin.get_or_insert_with(|| Perlin::new(seed));
        (perlin.get([x, y]) * 0.5) as f32
    }
}

impl PartialEq for NoiseField {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
    }
}

/// Circling/diving flyer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CirclingFlyer {
    tuning: CirclingTuning,
    mode: FlightMode,
    mode_time: f32,
    /// 1 or -1
    circle_direction: f32,
    direction_timer: f32,
    smooth_velocity: Vec2,
    return_offset: Vec2,
    noise: NoiseField,
}

impl CirclingFlyer {
    /// Creates an idle flyer.
    #[must_use]
    pub fn new(tuning: CirclingTuning) -> Self {
        Self {
            tuning,
            mode: FlightMode::Idle,
            mode_time: 0.0,
            circle_direction: 1.0,
            direction_timer: 0.0,
            smooth_velocity: Vec2::ZERO,
            return_offset: Vec2::ZERO,
            noise: NoiseField::new(0),
        }
    }

    /// Get tuning.
    #[must_use]
    pub fn tuning(&self) -> &CirclingTuning {
        &self.tuning
    }

    /// Get the flight mode.
    #[must_use]
    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    /// Current orbit direction.
    #[must_use]
    pub fn circle_direction(&self) -> f32 {
        self.circle_direction
    }

    /// Picks the orbit direction and noise seed.
    pub fn on_spawn(&mut self, rng: &mut fastrand::Rng) {
        self.circle_direction = if rng.f32() > 0.5 { 1.0 } else { -1.0 };
        self.noise = NoiseField::new(rng.u32(..));
    }

    fn set_mode(&mut self, mode: FlightMode) {
        self.mode = mode;
        self.mode_time = 0.0;
    }

    fn go_idle(&mut self, core: &mut AgentCore, slot: &mut AttackSlot) {
        slot.cancel();
        core.lose_target();
        core.velocity = Vec2::ZERO;
        self.set_mode(FlightMode::Idle);
    }

    fn circle(&mut self, core: &mut AgentCore, target: &BodyInfo, now: f32, dt: f32) {
        let t = &self.tuning;
        let desired_pos = target.position + Vec2::new(0.0, t.circling_height);
        let to_desired = desired_pos - core.position;

        let height_force = to_desired * t.height_restore;
        let tangent = perpendicular(to_desired).normalize_or_zero();
        let circle_velocity = tangent * t.flight_speed * self.circle_direction;

        let phase = f64::from(now) * 0.8;
        let noise = Vec2::new(
            self.noise.sample(phase + 100.0, 0.0),
            self.noise.sample(0.0, phase + 200.0),
        )
            * self.tuning.noise_strength;

        let desired_velocity = circle_velocity + height_force + noise;
        core.velocity = smooth_damp(
            core.velocity,
            desired_velocity,
            &mut self.smooth_velocity,
            self.tuning.smooth_time,
            dt,
        );
    }

    fn update_direction_change(&mut self, dt: f32) {
        self.direction_timer += dt;
        if self.direction_timer >= self.tuning.direction_change_interval {
            self.direction_timer = 0.0;
            self.circle_direction = -self.circle_direction;
        }
    }

    fn try_dive(
        &mut self,
        core: &mut AgentCore,
        slot: &mut AttackSlot,
        target: &BodyInfo,
        ctx: &mut TickContext<'_>,
    ) {
        if !core.cooldown_ready(ctx.now, core.stats().attack_cooldown) {
            return;
        }
        if ctx.rng.f32() >= self.tuning.attack_chance_per_sec * ctx.dt {
            return;
        }
        let Some(descriptor) = slot.descriptor().cloned() else {
            return;
        };
        if slot.launch(core, descriptor, Some(target), ctx.now) {
            let speed = self.tuning.flight_speed * self.tuning.dive_multiplier;
            core.velocity = direction(core.position, target.position) * speed;
            self.set_mode(FlightMode::Diving);
        }
    }

    fn start_flee(&mut self, core: &mut AgentCore, target: &BodyInfo) {
        let mut away = direction(target.position, core.position);
        away.y = away.y.max(0.7);
        core.velocity = away.normalize_or_zero() * self.tuning.flee_speed;
        self.set_mode(FlightMode::Fleeing);
        debug!("{} flees", core.id());
    }
}

fn random_in_unit_circle(rng: &mut fastrand::Rng) -> Vec2 {
    let angle = rng.f32() * std::f32::consts::TAU;
    let radius = rng.f32().sqrt();
    Vec2::new(angle.cos(), angle.sin()) * radius
}

/// Full tick for a circling flyer.
pub fn tick(
    flyer: &mut CirclingFlyer,
    core: &mut AgentCore,
    slot: &mut AttackSlot,
    world: &mut dyn CombatWorld,
    ctx: &mut TickContext<'_>,
) {
    let (now, dt) = (ctx.now, ctx.dt);
    flyer.mode_time += dt;

    let engage = flyer.mode != FlightMode::Idle || flyer.mode_time >= flyer.tuning.initial_idle;
    core.detect(world, now, engage);
    if core.state() == AgentState::Patrol {
        if flyer.mode != FlightMode::Idle {
            flyer.go_idle(core, slot);
        }
        core.velocity = Vec2::ZERO;
        return;
    }
    if flyer.mode == FlightMode::Idle {
        flyer.set_mode(FlightMode::Circling);
    }

    let Some(target) = core.refresh_target(world) else {
        flyer.go_idle(core, slot);
        return;
    };
    let lose_distance = core.stats().detect_radius * flyer.tuning.lose_distance_factor;
    if core.position.distance(target.position) > lose_distance {
        flyer.go_idle(core, slot);
        return;
    }

    let height = core.position.y - target.position.y;
    if height < flyer.tuning.min_height - 0.4 {
        core.velocity = Vec2::new(core.velocity.x * 0.7, flyer.tuning.height_restore * 2.0);
    }

    match flyer.mode {
        FlightMode::Idle => {}
        FlightMode::Circling => {
            flyer.circle(core, &target, now, dt);
            flyer.try_dive(core, slot, &target, ctx);
            flyer.update_direction_change(dt);
        }
        FlightMode::Diving => {
            if core.position.y <= target.position.y + flyer.tuning.min_height + 0.2 {
                slot.skip_windup();
            }
            let velocity = core.velocity;
            let step = slot.advance(core, world, ctx);
            core.velocity = velocity;
            if step.finished || !slot.is_running() {
                core.end_attack();
                flyer.start_flee(core, &target);
            }
        }
        FlightMode::Fleeing => {
            core.velocity += random_in_unit_circle(ctx.rng) * 0.7;
            if flyer.mode_time >= flyer.tuning.flee_duration {
                flyer.set_mode(FlightMode::Calming);
            }
        }
        FlightMode::Calming => {
            core.velocity = core.velocity.lerp(Vec2::ZERO, (dt * 2.0).min(1.0));
            core.velocity += random_in_unit_circle(ctx.rng) * 0.3;
            if flyer.mode_time >= flyer.tuning.calm_time {
                flyer.return_offset = Vec2::new(
                    ctx.rng.f32() * 2.4 - 1.2,
                    flyer.tuning.circling_height + ctx.rng.f32() * 0.6,
                );
                flyer.set_mode(FlightMode::Returning);
            }
        }
        FlightMode::Returning => {
            let to_return = target.position + flyer.return_offset - core.position;
            if to_return.length_squared() < 1.0 {
                flyer.set_mode(FlightMode::Circling);
            } else {
                core.velocity = to_return.normalize_or_zero() * flyer.tuning.flight_speed * 1.3;
                if core.position.y < target.position.y + flyer.tuning.circling_height - 0.5 {
                    core.velocity.y += flyer.tuning.height_restore * 0.8;
                }
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

    struct Rig {
        world: TestWorld,
        core: AgentCore,
        flyer: CirclingFlyer,
        slot: AttackSlot,
        rng: fastrand::Rng,
        now: f32,
    }

    impl Rig {
        fn new(tuning: CirclingTuning) -> Self {
            let mut world = TestWorld::default();
            let pool = HealthPool::new(100.0).with_invulnerability(0.5);
            world.add(1, Team::Player, Vec2::ZERO, pool);
            let core = AgentCore::new(
                EntityId::from_raw(20),
                "bat",
                Vec2::new(1.0, 3.0),
                AgentStats::default(),
            );
            let mut rng = fastrand::Rng::with_seed(7);
            let mut flyer = CirclingFlyer::new(tuning);
            flyer.on_spawn(&mut rng);
            Self {
                world,
                core,
                flyer,
                slot: AttackSlot::new(Some(AttackDescriptor::dive(20.0))),
                rng,
                now: 0.0,
            }
        }

        fn step(&mut self, dt: f32) {
            let mut spawns = Vec::new();
            let mut ctx = TickContext {
                now: self.now,
                dt,
                rng: &mut self.rng,
                spawns: &mut spawns,
            };
            tick(&mut self.flyer, &mut self.core, &mut self.slot, &mut self.world, &mut ctx);
            self.core.integrate(dt);
            self.now += dt;
        }
    }

    #[test]
    fn test_idles_before_engaging() {
        let mut rig = Rig::new(CirclingTuning {
            attack_chance_per_sec: 0.0,
            ..CirclingTuning::default()
        });
        rig.step(0.1);
        assert_eq!(rig.core.state(), AgentState::Patrol);
        assert_eq!(rig.core.velocity, Vec2::ZERO);

        for _ in 0..25 {
            rig.step(0.1);
        }
        assert_eq!(rig.core.state(), AgentState::Chase);
        assert_eq!(rig.flyer.mode(), FlightMode::Circling);
    }

    #[test]
    fn test_dive_strikes_then_flees() {
        let tuning = CirclingTuning {
            attack_chance_per_sec: 1000.0,
            initial_idle: 0.0,
            ..CirclingTuning::default()
        };
        let mut rig = Rig::new(tuning);
        let mut saw_dive = false;
        for _ in 0..200 {
            rig.step(0.02);
            saw_dive |= rig.flyer.mode() == FlightMode::Diving;
            if rig.flyer.mode() == FlightMode::Fleeing {
                break;
            }
        }
        assert!(saw_dive);
        assert_eq!(rig.flyer.mode(), FlightMode::Fleeing);
        assert_eq!(rig.core.state(), AgentState::Chase);
        assert!(rig.core.velocity.y > 0.0);
        assert_eq!(rig.world.get(1).pool.current(), 80.0);
    }

    #[test]
    fn test_dive_stays_above_min_height_at_coarse_steps() {
        for dt in [1.0 / 60.0, 0.05, 0.1] {
            let tuning = CirclingTuning {
                attack_chance_per_sec: 1000.0,
                initial_idle: 0.0,
                ..CirclingTuning::default()
            };
            let min_height = tuning.min_height;
            let mut rig = Rig::new(tuning);
            let mut saw_dive = false;
            for _ in 0..400 {
                rig.step(dt);
                saw_dive |= rig.flyer.mode() == FlightMode::Diving;
                assert!(
                    rig.core.position.y >= min_height - 1e-3,
                    "dt={dt} dipped to {}",
                    rig.core.position.y
                );
            }
            assert!(saw_dive, "dt={dt} never dived");
        }
    }

    #[test]
    fn test_emergency_lift_below_min_height() {
        let tuning = CirclingTuning {
            initial_idle: 0.0,
            attack_chance_per_sec: 0.0,
            ..CirclingTuning::default()
        };
        let mut rig = Rig::new(tuning);
        rig.step(0.02);
        rig.core.position = Vec2::new(0.5, 0.5);
        rig.step(0.02);
        assert!(rig.core.velocity.y > 0.0);
    }

    #[test]
    fn test_loses_target_far_away() {
        let tuning = CirclingTuning {
            initial_idle: 0.0,
            attack_chance_per_sec: 0.0,
            ..CirclingTuning::default()
        };
        let mut rig = Rig::new(tuning);
        rig.step(0.02);
        assert_eq!(rig.core.state(), AgentState::Chase);

        rig.world.set_position(1, Vec2::new(40.0, 0.0));
        rig.step(0.02);
        assert_eq!(rig.core.state(), AgentState::Patrol);
        assert_eq!(rig.flyer.mode(), FlightMode::Idle);
        assert_eq!(rig.core.target(), None);
    }

    #[test]
    fn test_orbit_direction_flips() {
        let tuning = CirclingTuning {
            initial_idle: 0.0,
            attack_chance_per_sec: 0.0,
            direction_change_interval: 0.5,
            ..CirclingTuning::default()
        };
        let mut rig = Rig::new(tuning);
        rig.step(0.02);
        let first = rig.flyer.circle_direction();
        for _ in 0..30 {
            rig.step(0.02);
        }
        assert_eq!(rig.flyer.circle_direction(), -first);
    }
}
