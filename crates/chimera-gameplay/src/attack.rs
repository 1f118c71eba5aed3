//! Timed attack sequences.
//!
//! This module provides:
//! - Attack descriptors (timing, shape, damage, knockback, spawn effect)
//! - The resumable windup → active → recovery sequence
//! - Reference descriptors for the attacks used by the bestiary
//!
//! A sequence is a plain record advanced once per tick. It never reads the
//! clock itself and never touches the world; it reports what happened during
//! the advance and leaves damage resolution to its owner.

use chimera_common::Vec2;
use serde::{Deserialize, Serialize};

// ============================================================================
// Attack Phases
// ============================================================================

/// Phase of an attack sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Telegraph; the agent is locked.
    Windup,
    /// Damage window.
    Active,
    /// Lockout before the sequence may be reused.
    Recovery,
    /// Sequence ran to the end.
    Complete,
    /// Sequence was aborted.
    Cancelled,
}

impl AttackPhase {
    /// Check if the phase can deal damage.
    #[must_use]
    pub fn can_damage(self) -> bool {
        self == Self::Active
    }

    /// Check if the sequence is finished.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }
}

// ============================================================================
// Attack Descriptors
// ============================================================================

/// Identifier of an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackKind {
    /// Generic melee swing.
    Strike,
    /// Lunging bite.
    Bite,
    /// Close tail sweep with knockback.
    TailSwipe,
    /// Long continuous area pulse.
    ChargedTail,
    /// Releases independent drones.
    DroneSwarm,
    /// Aerial dive.
    Dive,
    /// Aerial dash with contact damage.
    Dash,
}

impl AttackKind {
    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Strike => "Strike",
            Self::Bite => "Bite",
            Self::TailSwipe => "Tail Swipe",
            Self::ChargedTail => "Charged Tail",
            Self::DroneSwarm => "Drone Swarm",
            Self::Dive => "Dive",
            Self::Dash => "Dash",
        }
    }
}

/// Where an attack deals damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackShape {
    /// Circle around the attacker.
    Radius {
        /// Circle radius
        radius: f32,
    },
    /// Forward lunge; damage lands in a circle at the lunge end.
    Lunge {
        /// Horizontal lunge distance
        distance: f32,
        /// Circle radius at the end point
        radius: f32,
    },
    /// Touching bodies only.
    Contact {
        /// Contact radius
        radius: f32,
    },
}

impl AttackShape {
    /// Radius of the damage circle.
    #[must_use]
    pub fn radius(&self) -> f32 {
        match *self {
            Self::Radius { radius }
            | Self::Lunge { radius, .. }
            | Self::Contact { radius } => radius,
        }
    }

    /// Lunge distance, zero for non-lunging shapes.
    #[must_use]
    pub fn lunge_distance(&self) -> f32 {
        match *self {
            Self::Lunge { distance, .. } => distance,
            _ => 0.0,
        }
    }
}

/// Knockback impulse applied to a body that took the hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knockback {
    /// Impulse strength
    pub force: f32,
    /// When set, the impulse is split into `sign(dx) * force` horizontally
    /// and this fixed upward component. Otherwise it is radial.
    pub lift: Option<f32>,
}

impl Knockback {
    /// Radial knockback along the attacker → target direction.
    #[must_use]
    pub fn radial(force: f32) -> Self {
        Self { force, lift: None }
    }

    /// Horizontal push plus a fixed upward component.
    #[must_use]
    pub fn split(force: f32, lift: f32) -> Self {
        Self {
            force,
            lift: Some(lift),
        }
    }

    /// Impulse for a target at `target` hit from `source`.
    #[must_use]
    pub fn impulse(&self, source: Vec2, target: Vec2) -> Vec2 {
        match self.lift {
            Some(lift) => {
                let sign = chimera_common::math::horizontal_sign(source, target);
                Vec2::new(sign * self.force, lift)
            }
            None => chimera_common::math::direction(source, target) * self.force,
        }
    }
}

/// Sub-agents released when the attack's active phase begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSpec {
    /// Bestiary blueprint to instantiate
    pub blueprint: String,
    /// Spawn points relative to the attacker
    pub offsets: Vec<Vec2>,
}

/// Full description of an attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDescriptor {
    /// Identifier
    pub kind: AttackKind,
    /// Damage per strike
    pub damage: f32,
    /// Windup duration (seconds)
    pub windup: f32,
    /// Active duration (seconds, zero for instantaneous)
    pub active: f32,
    /// Recovery duration (seconds)
    pub recovery: f32,
    /// Damage area
    pub shape: AttackShape,
    /// Minimum time between attack starts
    pub cooldown: f32,
    /// Strike interval for continuous attacks
    #[serde(default)]
    pub strike_interval: Option<f32>,
    /// Knockback on hit
    #[serde(default)]
    pub knockback: Option<Knockback>,
    /// Only the nearest qualifying body is hit
    #[serde(default)]
    pub single_target: bool,
    /// Sub-agents spawned on the strike
    #[serde(default)]
    pub spawn: Option<SpawnSpec>,
    /// Extra reach tolerated when checking whether to strike or restart
    #[serde(default)]
    pub reach_slack: f32,
}

impl AttackDescriptor {
    /// Creates an instantaneous radius attack with no windup or recovery.
    #[must_use]
    pub fn new(kind: AttackKind, damage: f32, radius: f32) -> Self {
        Self {
            kind,
            damage,
            windup: 0.0,
            active: 0.0,
            recovery: 0.0,
            shape: AttackShape::Radius { radius },
            cooldown: 0.0,
            strike_interval: None,
            knockback: None,
            single_target: false,
            spawn: None,
            reach_slack: 0.0,
        }
    }

    /// Set sub-phase durations. Negative values become zero.
    #[must_use]
    pub fn with_timing(mut self, windup: f32, active: f32, recovery: f32) -> Self {
        self.windup = windup.max(0.0);
        self.active = active.max(0.0);
        self.recovery = recovery.max(0.0);
        self
    }

    /// Set the damage shape.
    #[must_use]
    pub fn with_shape(mut self, shape: AttackShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: f32) -> Self {
        self.cooldown = cooldown.max(0.0);
        self
    }

    /// Make the attack strike every `interval` seconds during its active window.
    #[must_use]
    pub fn with_strike_interval(mut self, interval: f32) -> Self {
        self.strike_interval = (interval > 0.0).then_some(interval);
        self
    }

    /// Set the knockback.
    #[must_use]
    pub fn with_knockback(mut self, knockback: Knockback) -> Self {
        self.knockback = Some(knockback);
        self
    }

    /// Restrict hits to one body.
    #[must_use]
    pub fn single_target(mut self) -> Self {
        self.single_target = true;
        self
    }

    /// Spawn sub-agents on the strike.
    #[must_use]
    pub fn with_spawn(mut self, spawn: SpawnSpec) -> Self {
        self.spawn = Some(spawn);
        self
    }

    /// Set the reach slack.
    #[must_use]
    pub fn with_reach_slack(mut self, slack: f32) -> Self {
        self.reach_slack = slack.max(0.0);
        self
    }

    /// Get total sequence duration.
    #[must_use]
    pub fn total_duration(&self) -> f32 {
        self.windup + self.active + self.recovery
    }

    /// Whether the attack strikes repeatedly.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        self.strike_interval.is_some() && self.active > 0.0
    }

    /// Generic melee swing: one strike after the windup, recovery filling
    /// the rest of the cooldown.
    #[must_use]
    pub fn melee_strike(damage: f32, windup: f32, cooldown: f32, reach: f32) -> Self {
        Self::new(AttackKind::Strike, damage, reach)
            .with_timing(windup, 0.0, (cooldown - windup).max(0.0))
            .with_cooldown(cooldown)
            .with_reach_slack(0.5)
            .single_target()
    }

    /// Lunging bite.
    #[must_use]
    pub fn bite() -> Self {
        Self::new(AttackKind::Bite, 16.0, 2.5)
            .with_timing(0.25, 0.0, 0.35)
            .with_shape(AttackShape::Lunge {
                distance: 4.0,
                radius: 2.5,
            })
    }

    /// Tail sweep around the attacker.
    #[must_use]
    pub fn tail_swipe() -> Self {
        Self::new(AttackKind::TailSwipe, 12.0, 2.0)
            .with_timing(0.25, 0.0, 0.35)
            .with_knockback(Knockback::radial(3.0))
    }

    /// Three second pulse hitting every half second.
    #[must_use]
    pub fn charged_tail() -> Self {
        Self::new(AttackKind::ChargedTail, 4.0, 3.0)
            .with_timing(0.0, 3.0, 0.0)
            .with_strike_interval(0.5)
    }

    /// Aerial dive. The windup is a cap; the flyer ends it early once it
    /// reaches strike height.
    #[must_use]
    pub fn dive(damage: f32) -> Self {
        Self::new(AttackKind::Dive, damage, 2.5)
            .with_timing(2.0, 0.0, 0.0)
            .single_target()
    }

    /// Fixed-duration dash dealing contact damage every tenth of a second.
    #[must_use]
    pub fn dash(damage: f32, duration: f32) -> Self {
        Self::new(AttackKind::Dash, damage, 0.8)
            .with_shape(AttackShape::Contact { radius: 0.8 })
            .with_timing(0.0, duration, 0.4)
            .with_strike_interval(0.1)
    }

    /// Drone release at `offsets` relative to the attacker.
    #[must_use]
    pub fn drone_swarm(blueprint: impl Into<String>, offsets: Vec<Vec2>) -> Self {
        Self::new(AttackKind::DroneSwarm, 0.0, 0.0)
            .with_timing(0.7, 0.0, 0.5)
            .with_spawn(SpawnSpec {
                blueprint: blueprint.into(),
                offsets,
            })
    }
}

// ============================================================================
// Attack Sequence
// ============================================================================

/// Straight-line lunge interpolated over the windup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lunge {
    /// Position when the sequence started
    pub from: Vec2,
    /// Position at the end of the windup
    pub to: Vec2,
}

/// What happened during one [`AttackSequence::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SequenceStep {
    /// Number of strikes that fired
    pub strikes: u32,
    /// Lunge position the owner should move to
    pub position: Option<Vec2>,
    /// Whether the sequence finished during this advance
    pub finished: bool,
}

/// Resumable attack in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSequence {
    descriptor: AttackDescriptor,
    phase: AttackPhase,
    /// Time spent in the current phase
    phase_time: f32,
    /// Strikes fired so far
    strikes: u32,
    lunge: Option<Lunge>,
}

impl AttackSequence {
    /// Starts a sequence in windup. It does nothing until first advanced.
    #[must_use]
    pub fn start(descriptor: AttackDescriptor) -> Self {
        Self {
            descriptor,
            phase: AttackPhase::Windup,
            phase_time: 0.0,
            strikes: 0,
            lunge: None,
        }
    }

    /// Attach a lunge interpolated over the windup.
    #[must_use]
    pub fn with_lunge(mut self, from: Vec2, to: Vec2) -> Self {
        self.lunge = Some(Lunge { from, to });
        self
    }

    /// Get the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &AttackDescriptor {
        &self.descriptor
    }

    /// Get the attack identifier.
    #[must_use]
    pub fn kind(&self) -> AttackKind {
        self.descriptor.kind
    }

    /// Get the current phase.
    #[must_use]
    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// Time spent in the current phase.
    #[must_use]
    pub fn phase_time(&self) -> f32 {
        self.phase_time
    }

    /// Strikes fired so far.
    #[must_use]
    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    /// Check if finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    /// Aborts the sequence. A cancelled sequence never strikes again.
    pub fn cancel(&mut self) {
        if !self.phase.is_finished() {
            self.phase = AttackPhase::Cancelled;
        }
    }

    /// Ends the windup early; the next advance enters the active phase.
    pub fn skip_windup(&mut self) {
        if self.phase == AttackPhase::Windup {
            self.phase_time = self.descriptor.windup;
        }
    }

    /// Advances the sequence by `dt`, possibly crossing several phases.
    pub fn advance(&mut self, dt: f32) -> SequenceStep {
        let mut step = SequenceStep::default();
        if self.phase.is_finished() {
            return step;
        }
        let mut remaining = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        loop {
            match self.phase {
                AttackPhase::Windup => {
                    let left = self.descriptor.windup - self.phase_time;
                    if remaining < left {
                        self.phase_time += remaining;
                        if let Some(lunge) = self.lunge {
                            let t = self.phase_time / self.descriptor.windup;
                            step.position = Some(lunge.from.lerp(lunge.to, t));
                        }
                        return step;
                    }
                    remaining -= left.max(0.0);
                    if let Some(lunge) = self.lunge {
                        step.position = Some(lunge.to);
                    }
                    self.phase = AttackPhase::Active;
                    self.phase_time = 0.0;
                    self.strike(&mut step);
                }
                AttackPhase::Active => {
                    let end = self.phase_time + remaining;
                    if let Some(interval) = self.descriptor.strike_interval {
                        loop {
                            let next = self.strikes as f32 * interval;
                            if next > end || next >= self.descriptor.active {
                                break;
                            }
                            self.strike(&mut step);
                        }
                    }
                    if end < self.descriptor.active {
                        self.phase_time = end;
                        return step;
                    }
                    remaining = end - self.descriptor.active;
                    self.phase = AttackPhase::Recovery;
                    self.phase_time = 0.0;
                }
                AttackPhase::Recovery => {
                    let left = self.descriptor.recovery - self.phase_time;
                    if remaining < left {
                        self.phase_time += remaining;
                        return step;
                    }
                    self.phase = AttackPhase::Complete;
                    self.phase_time = 0.0;
                    step.finished = true;
                    return step;
                }
                AttackPhase::Complete | AttackPhase::Cancelled => return step,
            }
        }
    }

    fn strike(&mut self, step: &mut SequenceStep) {
        self.strikes += 1;
        step.strikes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_active_until_windup_elapses() {
        let mut seq = AttackSequence::start(AttackDescriptor::bite());
        let step = seq.advance(0.2);
        assert_eq!(step.strikes, 0);
        assert_eq!(seq.phase(), AttackPhase::Windup);

        let step = seq.advance(0.05);
        assert_eq!(step.strikes, 1);
        assert_eq!(seq.phase(), AttackPhase::Recovery);
    }

    #[test]
    fn test_instant_active_strikes_once() {
        let mut seq = AttackSequence::start(AttackDescriptor::tail_swipe());
        let mut total = 0;
        for _ in 0..60 {
            total += seq.advance(1.0 / 60.0).strikes;
        }
        assert_eq!(total, 1);
        assert!(seq.is_finished());
    }

    #[test]
    fn test_large_dt_crosses_every_phase() {
        let mut seq = AttackSequence::start(AttackDescriptor::bite());
        let step = seq.advance(5.0);
        assert_eq!(step.strikes, 1);
        assert!(step.finished);
        assert_eq!(seq.phase(), AttackPhase::Complete);
    }

    #[test]
    fn test_continuous_strikes_per_interval() {
        let mut seq = AttackSequence::start(AttackDescriptor::charged_tail());
        let mut total = 0;
        for _ in 0..200 {
            total += seq.advance(0.02).strikes;
        }
        assert_eq!(total, 6);
        assert!(seq.is_finished());

        let mut seq = AttackSequence::start(AttackDescriptor::charged_tail());
        assert_eq!(seq.advance(10.0).strikes, 6);
    }

    #[test]
    fn test_cancelled_sequence_never_strikes() {
        let mut seq = AttackSequence::start(AttackDescriptor::bite());
        seq.advance(0.1);
        seq.cancel();
        let step = seq.advance(1.0);
        assert_eq!(step.strikes, 0);
        assert!(!step.finished);
        assert_eq!(seq.phase(), AttackPhase::Cancelled);
    }

    #[test]
    fn test_lunge_interpolates_over_windup() {
        let mut seq = AttackSequence::start(AttackDescriptor::bite())
            .with_lunge(Vec2::ZERO, Vec2::new(4.0, 0.0));
        let step = seq.advance(0.125);
        let pos = step.position.expect("lunge position during windup");
        assert!((pos.x - 2.0).abs() < 1e-4);

        let step = seq.advance(0.2);
        assert_eq!(step.position, Some(Vec2::new(4.0, 0.0)));
    }

    #[test]
    fn test_skip_windup() {
        let mut seq = AttackSequence::start(AttackDescriptor::melee_strike(20.0, 0.5, 1.4, 1.8));
        seq.skip_windup();
        assert_eq!(seq.advance(0.0).strikes, 1);
    }

    #[test]
    fn test_melee_strike_fills_cooldown() {
        let strike = AttackDescriptor::melee_strike(20.0, 0.5, 1.4, 1.8);
        assert!((strike.total_duration() - 1.4).abs() < 1e-6);
        assert!(strike.single_target);
        assert_eq!(strike.reach_slack, 0.5);
    }

    #[test]
    fn test_knockback_split_and_radial() {
        let split = Knockback::split(8.0, 4.0);
        assert_eq!(split.impulse(Vec2::new(5.0, 0.0), Vec2::new(2.0, 3.0)), Vec2::new(-8.0, 4.0));

        let radial = Knockback::radial(5.0);
        let impulse = radial.impulse(Vec2::ZERO, Vec2::new(0.0, 2.0));
        assert!((impulse - Vec2::new(0.0, 5.0)).length() < 1e-5);
    }
}
