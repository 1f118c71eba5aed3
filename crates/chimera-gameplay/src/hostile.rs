//! Hostile agents: the agent core plus a behavior variant and an attack slot.
//!
//! [`Agent`] is what the simulation stores and ticks. Each behavior variant
//! lives in its own module and drives the shared [`AgentCore`] and
//! [`AttackSlot`] through the same per-tick flow: detect, update state, set
//! velocity, advance the running sequence.

use chimera_common::math::horizontal_sign;
use chimera_common::{EntityId, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::{AgentCore, AgentState, ContactProfile};
use crate::area::{self, AreaStrike};
use crate::attack::{AttackDescriptor, AttackSequence, SequenceStep};
use crate::boss::{BossController, SlowAura};
use crate::circling::CirclingFlyer;
use crate::dash::DashFlyer;
use crate::events::CombatEvent;
use crate::ground::{self, GroundMover};
use crate::health::Damageable;
use crate::rolling::RollingHazard;
use crate::spawn::SpawnRequest;
use crate::world::{BodyInfo, CombatWorld};
use crate::{circling, dash, rolling};

/// Per-tick inputs shared by every agent.
#[derive(Debug)]
pub struct TickContext<'a> {
    /// Simulation time at the start of the tick
    pub now: f32,
    /// Tick length
    pub dt: f32,
    /// Simulation random source
    pub rng: &'a mut fastrand::Rng,
    /// Sub-agent spawn requests collected during the tick
    pub spawns: &'a mut Vec<SpawnRequest>,
}

// ============================================================================
// Attack Slot
// ============================================================================

/// An agent's attack and the sequence currently running, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackSlot {
    descriptor: Option<AttackDescriptor>,
    sequence: Option<AttackSequence>,
}

impl AttackSlot {
    /// Creates a slot for `descriptor`.
    #[must_use]
    pub fn new(descriptor: Option<AttackDescriptor>) -> Self {
        Self {
            descriptor,
            sequence: None,
        }
    }

    /// The agent's own attack.
    #[must_use]
    pub fn descriptor(&self) -> Option<&AttackDescriptor> {
        self.descriptor.as_ref()
    }

    /// The running sequence.
    #[must_use]
    pub fn sequence(&self) -> Option<&AttackSequence> {
        self.sequence.as_ref()
    }

    /// Checks if a sequence is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sequence.as_ref().is_some_and(|s| !s.is_finished())
    }

    /// Ends the running sequence's windup early.
    pub fn skip_windup(&mut self) {
        if let Some(seq) = self.sequence.as_mut() {
            seq.skip_windup();
        }
    }

    /// Starts the agent's own attack when the target is in range and the
    /// cooldown has elapsed.
    pub fn try_begin(&mut self, core: &mut AgentCore, target: &BodyInfo, now: f32) -> bool {
        let Some(descriptor) = self.descriptor.clone() else {
            return false;
        };
        let distance = core.position.distance(target.position);
        let ready = core.cooldown_ready(now, core.stats().attack_cooldown);
        if distance > core.stats().attack_range || !ready {
            return false;
        }
        self.launch(core, descriptor, Some(target), now)
    }

    /// Starts `descriptor` now. The sequence is first advanced next tick.
    pub fn launch(
        &mut self,
        core: &mut AgentCore,
        descriptor: AttackDescriptor,
        target: Option<&BodyInfo>,
        now: f32,
    ) -> bool {
        if !core.begin_attack(now) {
            return false;
        }
        let kind = descriptor.kind;
        let lunge = descriptor.shape.lunge_distance();
        let mut sequence = AttackSequence::start(descriptor);
        if lunge > 0.0 {
            let facing = target.map_or(1.0, |t| horizontal_sign(core.position, t.position));
            let end = core.position + Vec2::new(facing * lunge, 0.0);
            sequence = sequence.with_lunge(core.position, end);
        }
        debug!("{} starts {:?}", core.id(), kind);
        core.emit(CombatEvent::AttackTriggered {
            entity_id: core.id(),
            attack: kind,
        });
        self.sequence = Some(sequence);
        true
    }

    /// Aborts the running sequence.
    pub fn cancel(&mut self) {
        if let Some(mut seq) = self.sequence.take() {
            seq.cancel();
            debug!("{:?} cancelled in {:?}", seq.kind(), seq.phase());
        }
    }

    /// Advances the running sequence and resolves its strikes.
    pub fn advance(
        &mut self,
        core: &mut AgentCore,
        world: &mut dyn CombatWorld,
        ctx: &mut TickContext<'_>,
    ) -> SequenceStep {
        let Some(seq) = self.sequence.as_mut() else {
            return SequenceStep::default();
        };
        let step = seq.advance(ctx.dt);
        if let Some(position) = step.position {
            core.position = position;
            core.velocity = Vec2::ZERO;
        }
        if step.strikes > 0 {
            let descriptor = seq.descriptor().clone();
            for _ in 0..step.strikes {
                strike(core, &descriptor, world, ctx);
            }
        }
        if step.finished {
            self.sequence = None;
        }
        step
    }

    /// Attack state of the generic melee cycle: advance, then restart while
    /// the target stays within reach or fall back to Chase.
    pub fn run_melee_cycle(
        &mut self,
        core: &mut AgentCore,
        target: Option<BodyInfo>,
        world: &mut dyn CombatWorld,
        ctx: &mut TickContext<'_>,
    ) {
        let Some(target) = target else {
            self.cancel();
            core.end_attack();
            return;
        };
        if !self.is_running() {
            core.end_attack();
            return;
        }

        core.velocity = Vec2::ZERO;
        let step = self.advance(core, world, ctx);
        if !step.finished {
            return;
        }

        let slack = self.descriptor.as_ref().map_or(0.0, |d| d.reach_slack);
        let reach = core.stats().attack_range + slack;
        let in_reach = core.position.distance(target.position) <= reach;
        let ready = in_reach && core.cooldown_ready(ctx.now, core.stats().attack_cooldown);
        let restarted = match self.descriptor.clone() {
            Some(descriptor) if ready => {
                self.launch(core, descriptor, Some(&target), ctx.now)
            }
            _ => false,
        };
        if !restarted {
            core.end_attack();
        }
    }
}

/// Resolves one strike of `descriptor` at the agent's position.
fn strike(
    core: &mut AgentCore,
    descriptor: &AttackDescriptor,
    world: &mut dyn CombatWorld,
    ctx: &mut TickContext<'_>,
) {
    if descriptor.damage > 0.0 {
        let strike = AreaStrike::from_descriptor(
            core.id(),
            core.team(),
            core.position,
            core.position,
            descriptor,
            ctx.now,
        );
        let reports = area::resolve(world, &strike);
        core.record_hits(&reports);
    }
    if let Some(spawn) = &descriptor.spawn {
        ctx.spawns.push(SpawnRequest {
            spawner: core.id(),
            blueprint: spawn.blueprint.clone(),
            positions: spawn.offsets.iter().map(|o| core.position + *o).collect(),
        });
    }
}

// ============================================================================
// Agent
// ============================================================================

/// Movement and decision variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    /// Ground patrol and chase
    Ground(GroundMover),
    /// Aerial circling and diving
    Circling(CirclingFlyer),
    /// Aerial rise and dash
    Dash(DashFlyer),
    /// Dormant rolling hazard
    Rolling(RollingHazard),
    /// Multi-phase boss
    Boss(BossController),
}

impl Behavior {
    /// Whether this variant attacks through its own attack slot.
    #[must_use]
    pub fn uses_attack_slot(&self) -> bool {
        matches!(self, Self::Ground(_) | Self::Circling(_) | Self::Dash(_))
    }
}

/// A hostile agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    core: AgentCore,
    behavior: Behavior,
    attack: AttackSlot,
    contact: Option<ContactProfile>,
}

impl Agent {
    /// Creates an agent without an attack or contact damage.
    #[must_use]
    pub fn new(core: AgentCore, behavior: Behavior) -> Self {
        Self {
            core,
            behavior,
            attack: AttackSlot::default(),
            contact: None,
        }
    }

    /// Set the attack.
    #[must_use]
    pub fn with_attack(mut self, descriptor: AttackDescriptor) -> Self {
        self.attack = AttackSlot::new(Some(descriptor));
        self
    }

    /// Set contact damage.
    #[must_use]
    pub fn with_contact(mut self, contact: ContactProfile) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Get entity ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.core.id()
    }

    /// Get the agent core.
    #[must_use]
    pub fn core(&self) -> &AgentCore {
        &self.core
    }

    /// Get the agent core mutably.
    pub fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    /// Get the behavior variant.
    #[must_use]
    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Get the attack slot.
    #[must_use]
    pub fn attack_slot(&self) -> &AttackSlot {
        &self.attack
    }

    /// Get the contact profile.
    #[must_use]
    pub fn contact(&self) -> Option<&ContactProfile> {
        self.contact.as_ref()
    }

    /// Get current state.
    #[must_use]
    pub fn state(&self) -> AgentState {
        self.core.state()
    }

    /// Get position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.core.position
    }

    /// Boss controller, for boss agents.
    #[must_use]
    pub fn boss(&self) -> Option<&BossController> {
        match &self.behavior {
            Behavior::Boss(boss) => Some(boss),
            _ => None,
        }
    }

    /// Slow aura projected this tick, if any.
    #[must_use]
    pub fn aura(&self) -> Option<SlowAura> {
        match &self.behavior {
            Behavior::Boss(boss) if !self.core.is_dead() => boss.aura(&self.core),
            _ => None,
        }
    }

    /// Body info for world queries.
    #[must_use]
    pub fn body_info(&self) -> BodyInfo {
        self.core.body_info()
    }

    /// Called once when the agent enters the simulation.
    pub fn on_spawn(&mut self, rng: &mut fastrand::Rng) {
        if self.core.health().is_none() {
            warn!(
                "{} ({}) has no health pool; it cannot be damaged",
                self.core.id(),
                self.core.blueprint()
            );
        }
        if self.behavior.uses_attack_slot() && self.attack.descriptor().is_none() {
            warn!(
                "{} ({}) has no attack; it will never enter Attack",
                self.core.id(),
                self.core.blueprint()
            );
        }
        match &mut self.behavior {
            Behavior::Ground(mover) => mover.on_spawn(rng),
            Behavior::Circling(flyer) => flyer.on_spawn(rng),
            Behavior::Dash(flyer) => flyer.on_spawn(&self.core),
            Behavior::Rolling(_) | Behavior::Boss(_) => {}
        }
    }

    fn contact_enabled(&self) -> bool {
        if self.core.is_dead() {
            return false;
        }
        match &self.behavior {
            Behavior::Boss(boss) => boss.is_awake(),
            Behavior::Rolling(hazard) => hazard.is_active(),
            _ => true,
        }
    }

    /// Advances the agent by one tick.
    pub fn tick(&mut self, world: &mut dyn CombatWorld, ctx: &mut TickContext<'_>) {
        if self.core.is_dead() {
            return;
        }

        match &mut self.behavior {
            Behavior::Ground(mover) => {
                ground::tick(mover, &mut self.core, &mut self.attack, world, ctx)
            }
            Behavior::Circling(flyer) => {
                circling::tick(flyer, &mut self.core, &mut self.attack, world, ctx)
            }
            Behavior::Dash(flyer) => {
                dash::tick(flyer, &mut self.core, &mut self.attack, world, ctx)
            }
            Behavior::Rolling(hazard) => rolling::tick(hazard, &mut self.core, world, ctx),
            Behavior::Boss(boss) => boss.tick(&mut self.core, &mut self.attack, world, ctx),
        }

        self.core.integrate(ctx.dt);

        if let Some(contact) = self.contact {
            if self.contact_enabled() {
                let mut strike = AreaStrike::new(
                    self.core.id(),
                    self.core.team(),
                    self.core.position,
                    contact.radius,
                    contact.damage,
                    ctx.now,
                );
                if let Some(knockback) = contact.knockback {
                    strike = strike.with_knockback(knockback, self.core.position);
                }
                let reports = area::resolve(world, &strike);
                self.core.record_hits(&reports);
            }
        }
    }
}

impl Damageable for Agent {
    fn take_damage(&mut self, amount: f32, now: f32) {
        if self.core.is_dead() {
            return;
        }
        let Some(pool) = self.core.health_mut() else {
            return;
        };
        pool.take_damage(amount, now);
        if self.core.absorb_health_notifications(now) {
            self.attack.cancel();
        }
        if let Behavior::Boss(boss) = &mut self.behavior {
            boss.check_phase(&mut self.core);
        }
    }

    fn heal(&mut self, amount: f32) {
        if let Some(pool) = self.core.health_mut() {
            pool.heal(amount);
            // Healing never reports death, so the time is unused.
            self.core.absorb_health_notifications(0.0);
        }
    }

    fn current_health(&self) -> f32 {
        self.core.health().map_or(0.0, |pool| pool.current())
    }
}
