//! Multi-phase boss controller.
//!
//! The boss sleeps until its target comes close or the sleep timer runs out,
//! then climbs a phase ladder driven by its health fraction. Each phase has
//! its own speed, attack cooldown and weighted attack table. The ladder only
//! moves forward; healing never returns the boss to an earlier phase.

use chimera_common::math::horizontal_sign;
use chimera_common::{EntityId, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::AgentCore;
use crate::attack::{AttackDescriptor, AttackKind};
use crate::error::{CombatError, CombatResult};
use crate::events::CombatEvent;
use crate::health::HealthPool;
use crate::hostile::{AttackSlot, TickContext};
use crate::world::{BodyInfo, CombatWorld};

// ============================================================================
// Phases
// ============================================================================

/// Boss phase, ordered from calmest to most desperate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BossPhase {
    /// Dormant; projects the slow aura
    #[default]
    Sleep,
    /// First awake phase
    Hunt,
    /// Faster, shorter cooldowns, adds drones
    Rage,
    /// Reserved final phase
    Despair,
}

impl BossPhase {
    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Sleep => "Sleep",
            Self::Hunt => "Hunt",
            Self::Rage => "Rage",
            Self::Despair => "Despair",
        }
    }
}

/// Attack table walked with a uniform roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedTable {
    entries: Vec<(AttackKind, f32)>,
}

impl WeightedTable {
    /// Creates a table. Entries are walked in the given order.
    #[must_use]
    pub fn new(entries: Vec<(AttackKind, f32)>) -> Self {
        Self { entries }
    }

    /// Get entries.
    #[must_use]
    pub fn entries(&self) -> &[(AttackKind, f32)] {
        &self.entries
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w.max(0.0)).sum()
    }

    /// Picks an entry for `roll` in `[0, 1)`.
    ///
    /// The roll is scaled by the total weight and the first entry whose
    /// cumulative weight exceeds it wins. Rounding past the end falls back
    /// to the last entry.
    #[must_use]
    pub fn pick(&self, roll: f32) -> Option<AttackKind> {
        let point = roll.clamp(0.0, 1.0) * self.total_weight();
        let mut cumulative = 0.0;
        for (kind, weight) in &self.entries {
            cumulative += weight.max(0.0);
            if point < cumulative {
                return Some(*kind);
            }
        }
        self.entries.last().map(|(kind, _)| *kind)
    }
}

/// Tuning for one awake phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Phase this entry describes
    pub phase: BossPhase,
    /// Health fraction at or below which the next phase starts
    pub threshold: Option<f32>,
    /// Multiplier on chase speed
    pub speed_multiplier: f32,
    /// Seconds between attack selections
    pub cooldown: f32,
    /// Attack selection table
    pub table: WeightedTable,
}

/// Boss tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    /// Target distance that ends the sleep
    pub wake_distance: f32,
    /// Seconds of sleep (with a target present) before waking anyway
    pub sleep_duration: f32,
    /// Velocity scale applied to a moving target while asleep
    pub sleep_slow_factor: f32,
    /// Awake phases in ladder order
    pub phases: Vec<PhaseConfig>,
    /// Attacks the tables refer to
    pub attacks: Vec<AttackDescriptor>,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            wake_distance: 3.0,
            sleep_duration: 5.0,
            sleep_slow_factor: 0.5,
            phases: vec![
                PhaseConfig {
                    phase: BossPhase::Hunt,
                    threshold: Some(0.6),
                    speed_multiplier: 1.0,
                    cooldown: 4.0,
                    table: WeightedTable::new(vec![
                        (AttackKind::TailSwipe, 0.4),
                        (AttackKind::Bite, 0.6),
                    ]),
                },
                PhaseConfig {
                    phase: BossPhase::Rage,
                    threshold: None,
                    speed_multiplier: 1.5,
                    cooldown: 2.4,
                    table: WeightedTable::new(vec![
                        (AttackKind::DroneSwarm, 0.35),
                        (AttackKind::ChargedTail, 0.35),
                        (AttackKind::Bite, 0.3),
                    ]),
                },
            ],
            attacks: vec![
                AttackDescriptor::bite(),
                AttackDescriptor::tail_swipe(),
                AttackDescriptor::charged_tail(),
                AttackDescriptor::drone_swarm(
                    "drone",
                    vec![Vec2::new(-2.0, 2.0), Vec2::new(0.0, 3.0), Vec2::new(2.0, 2.0)],
                ),
            ],
        }
    }
}

impl BossConfig {
    /// Descriptor for `kind`.
    #[must_use]
    pub fn attack(&self, kind: AttackKind) -> Option<&AttackDescriptor> {
        self.attacks.iter().find(|a| a.kind == kind)
    }

    /// Index of `phase` in the ladder.
    #[must_use]
    pub fn phase_index(&self, phase: BossPhase) -> Option<usize> {
        self.phases.iter().position(|p| p.phase == phase)
    }

    /// Checks the ladder and tables for consistency.
    pub fn validate(&self) -> CombatResult<()> {
        if self.phases.is_empty() {
            return Err(CombatError::InvalidTuning("boss needs at least one awake phase".into()));
        }
        if self.wake_distance < 0.0 || self.sleep_duration < 0.0 {
            return Err(CombatError::InvalidTuning(
                "negative wake distance or sleep duration".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sleep_slow_factor) {
            return Err(CombatError::InvalidTuning(format!(
                "sleep slow factor {} outside [0, 1]",
                self.sleep_slow_factor
            )));
        }

        let mut previous = BossPhase::Sleep;
        for config in &self.phases {
            let name = config.phase.display_name();
            if config.phase <= previous {
                return Err(CombatError::InvalidTuning(format!(
                    "phase {name} is out of order"
                )));
            }
            previous = config.phase;
            if let Some(threshold) = config.threshold {
                if !(threshold > 0.0 && threshold <= 1.0) {
                    return Err(CombatError::InvalidTuning(format!(
                        "phase {name} threshold {threshold} outside (0, 1]"
                    )));
                }
            }
            if config.speed_multiplier <= 0.0 || config.cooldown < 0.0 {
                return Err(CombatError::InvalidTuning(format!(
                    "phase {name} has a non-positive speed or negative cooldown"
                )));
            }
            if config.table.total_weight() <= 0.0 {
                return Err(CombatError::InvalidTuning(format!(
                    "phase {name} has an empty attack table"
                )));
            }
            for (kind, _) in config.table.entries() {
                if self.attack(*kind).is_none() {
                    return Err(CombatError::InvalidTuning(format!(
                        "phase {name} refers to {} which has no descriptor",
                        kind.display_name()
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Slow effect on the boss's target while the boss sleeps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlowAura {
    /// Slowed body
    pub target: EntityId,
    /// Velocity scale
    pub factor: f32,
}

/// Boss phase machine layered on top of the agent core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossController {
    config: BossConfig,
    phase: BossPhase,
    sleep_timer: f32,
    next_attack_time: Option<f32>,
}

impl BossController {
    /// Creates a sleeping boss.
    #[must_use]
    pub fn new(config: BossConfig) -> Self {
        Self {
            config,
            phase: BossPhase::Sleep,
            sleep_timer: 0.0,
            next_attack_time: None,
        }
    }

    /// Get the config.
    #[must_use]
    pub fn config(&self) -> &BossConfig {
        &self.config
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> BossPhase {
        self.phase
    }

    /// Checks if awake.
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.phase != BossPhase::Sleep
    }

    /// Seconds slept with a target present.
    #[must_use]
    pub fn sleep_timer(&self) -> f32 {
        self.sleep_timer
    }

    /// Earliest time of the next attack selection.
    #[must_use]
    pub fn next_attack_time(&self) -> Option<f32> {
        self.next_attack_time
    }

    /// Slow aura on the target while asleep.
    #[must_use]
    pub fn aura(&self, core: &AgentCore) -> Option<SlowAura> {
        if self.is_awake() {
            return None;
        }
        core.target().map(|target| SlowAura {
            target,
            factor: self.config.sleep_slow_factor,
        })
    }

    fn current_config(&self) -> Option<&PhaseConfig> {
        self.config.phases.iter().find(|p| p.phase == self.phase)
    }

    fn enter_phase(&mut self, core: &mut AgentCore, index: usize) -> Option<BossPhase> {
        let config = self.config.phases.get(index)?;
        let (from, to) = (self.phase, config.phase);
        self.phase = to;
        core.set_speed_multiplier(config.speed_multiplier);
        core.emit(CombatEvent::PhaseChanged {
            entity_id: core.id(),
            from,
            to,
        });
        info!("{} ({}) enters {}", core.id(), core.blueprint(), to.display_name());
        Some(to)
    }

    fn wake(&mut self, core: &mut AgentCore, target: EntityId, now: f32) {
        if self.enter_phase(core, 0).is_none() {
            return;
        }
        core.force_chase(Some(target), now);
        self.next_attack_time = self.current_config().map(|c| now + c.cooldown);
    }

    /// Advances at most one phase when health has dropped to the current
    /// phase's threshold. Returns the phase entered.
    pub fn check_phase(&mut self, core: &mut AgentCore) -> Option<BossPhase> {
        if !self.is_awake() || core.is_dead() {
            return None;
        }
        let fraction = core.health().map(HealthPool::fraction)?;
        let index = self.config.phase_index(self.phase)?;
        let threshold = self.config.phases[index].threshold?;
        if fraction > threshold {
            return None;
        }
        self.enter_phase(core, index + 1)
    }

    /// Current target, or the nearest hostile in detection range.
    fn find_target(core: &mut AgentCore, world: &dyn CombatWorld, now: f32) -> Option<BodyInfo> {
        if let Some(body) = core.refresh_target(world) {
            return Some(body);
        }
        let stats = core.stats();
        let body = world.nearest_hostile(
            core.position,
            stats.detect_radius,
            core.team(),
            stats.line_of_sight,
        )?;
        core.acquire(&body, now);
        Some(body)
    }

    /// Full tick for the boss.
    pub fn tick(
        &mut self,
        core: &mut AgentCore,
        slot: &mut AttackSlot,
        world: &mut dyn CombatWorld,
        ctx: &mut TickContext<'_>,
    ) {
        let now = ctx.now;

        if !self.is_awake() {
            core.velocity = Vec2::ZERO;
            let Some(target) = Self::find_target(core, world, now) else {
                return;
            };
            self.sleep_timer += ctx.dt;
            let distance = core.position.distance(target.position);
            let overslept = self.sleep_timer > self.config.sleep_duration;
            if distance < self.config.wake_distance || overslept {
                self.wake(core, target.id, now);
            }
            return;
        }

        self.check_phase(core);

        if slot.is_running() {
            core.velocity = Vec2::ZERO;
            if core.refresh_target(world).is_none() {
                slot.cancel();
                core.end_attack();
                return;
            }
            let step = slot.advance(core, world, ctx);
            if step.finished {
                core.end_attack();
            }
            return;
        }
        core.end_attack();

        let Some(target) = Self::find_target(core, world, now) else {
            core.velocity = Vec2::ZERO;
            return;
        };

        if core.position.distance(target.position) > core.stats().attack_range {
            let dir = horizontal_sign(core.position, target.position);
            core.velocity = Vec2::new(dir * core.chase_speed(), 0.0);
            return;
        }
        core.velocity = Vec2::ZERO;

        if self.next_attack_time.is_some_and(|t| now < t) {
            return;
        }
        let Some(config) = self.current_config() else {
            return;
        };
        let cooldown = config.cooldown;
        let picked = config.table.pick(ctx.rng.f32());
        self.next_attack_time = Some(now + cooldown);

        let Some(kind) = picked else {
            return;
        };
        match self.config.attack(kind).cloned() {
            Some(descriptor) => {
                slot.launch(core, descriptor, Some(&target), now);
            }
            None => warn!("{} has no descriptor for {}", core.id(), kind.display_name()),
        }
    }
}
