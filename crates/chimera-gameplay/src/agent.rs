//! Agent core shared by every hostile agent.
//!
//! This module provides:
//! - The Patrol → Chase → Attack → Dead state machine and its legal edges
//! - Target detection and stale-target handling
//! - Per-agent stats with the generic enemy tuning as defaults
//! - Hit blink and corpse fade for the presentation layer
//! - An event outbox flushed to the bus by the simulation

use chimera_common::{EntityId, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::area::HitReport;
use crate::attack::Knockback;
use crate::events::{CombatEvent, EventSource};
use crate::health::{HealthNotification, HealthPool};
use crate::world::{BodyInfo, CombatWorld, Team};

/// Blink frequency while invulnerable (visibility toggles per half period).
const BLINK_HZ: f32 = 20.0;

// ============================================================================
// Agent State
// ============================================================================

/// High-level agent state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Idle movement, no target engaged
    #[default]
    Patrol,
    /// Pursuing a target
    Chase,
    /// Running an attack sequence
    Attack,
    /// Terminal
    Dead,
}

impl AgentState {
    /// Whether the edge `self → next` is legal.
    ///
    /// Legal edges are Patrol↔Chase, Chase↔Attack and anything → Dead
    /// except Dead itself.
    #[must_use]
    pub fn can_transition_to(self, next: AgentState) -> bool {
        use AgentState::{Attack, Chase, Dead, Patrol};
        matches!(
            (self, next),
            (Patrol, Chase)
                | (Chase, Patrol)
                | (Chase, Attack)
                | (Attack, Chase)
                | (Patrol | Chase | Attack, Dead)
        )
    }

    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Patrol => "Patrol",
            Self::Chase => "Chase",
            Self::Attack => "Attack",
            Self::Dead => "Dead",
        }
    }
}

// ============================================================================
// Agent Stats
// ============================================================================

/// Tuning shared by every agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentStats {
    /// Maximum health
    pub max_health: f32,
    /// Patrol speed
    pub walk_speed: f32,
    /// Chase speed
    pub chase_speed: f32,
    /// Detection radius
    pub detect_radius: f32,
    /// Distance at which an attack may start
    pub attack_range: f32,
    /// Minimum time between attack starts
    pub attack_cooldown: f32,
    /// Invulnerability after a hit (seconds)
    pub invulnerability: f32,
    /// Time without sight before a chase is abandoned
    pub lose_target_time: f32,
    /// Time the corpse lingers before removal
    pub corpse_linger: f32,
    /// Require an unobstructed line to detect a target
    pub line_of_sight: bool,
}

impl Default for AgentStats {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            walk_speed: 2.0,
            chase_speed: 4.0,
            detect_radius: 8.0,
            attack_range: 1.8,
            attack_cooldown: 1.4,
            invulnerability: 0.2,
            lose_target_time: 3.0,
            corpse_linger: 1.5,
            line_of_sight: false,
        }
    }
}

/// Damage dealt to hostile bodies touching the agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactProfile {
    /// Damage per touch
    pub damage: f32,
    /// Touch radius
    pub radius: f32,
    /// Push applied to the touched body
    #[serde(default)]
    pub knockback: Option<Knockback>,
}

// ============================================================================
// Agent Core
// ============================================================================

/// State shared by every agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCore {
    id: EntityId,
    team: Team,
    blueprint: String,
    /// World position
    pub position: Vec2,
    /// Velocity applied on integration
    pub velocity: Vec2,
    state: AgentState,
    stats: AgentStats,
    health: Option<HealthPool>,
    target: Option<EntityId>,
    last_attack_time: Option<f32>,
    last_seen_time: Option<f32>,
    died_at: Option<f32>,
    /// Multiplier on chase speed (boss phases)
    speed_multiplier: f32,
    #[serde(skip)]
    outbox: Vec<CombatEvent>,
}

impl AgentCore {
    /// Creates a hostile agent core with a full health pool.
    #[must_use]
    pub fn new(
        id: EntityId,
        blueprint: impl Into<String>,
        position: Vec2,
        stats: AgentStats,
    ) -> Self {
        let health = HealthPool::new(stats.max_health).with_invulnerability(stats.invulnerability);
        Self {
            id,
            team: Team::Hostile,
            blueprint: blueprint.into(),
            position,
            velocity: Vec2::ZERO,
            state: AgentState::Patrol,
            stats,
            health: Some(health),
            target: None,
            last_attack_time: None,
            last_seen_time: None,
            died_at: None,
            speed_multiplier: 1.0,
            outbox: Vec::new(),
        }
    }

    /// Removes the health pool; the agent can no longer be damaged.
    #[must_use]
    pub fn without_health(mut self) -> Self {
        self.health = None;
        self
    }

    /// Get entity ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Get team.
    #[must_use]
    pub fn team(&self) -> Team {
        self.team
    }

    /// Blueprint the agent was built from.
    #[must_use]
    pub fn blueprint(&self) -> &str {
        &self.blueprint
    }

    /// Get current state.
    #[must_use]
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Get stats.
    #[must_use]
    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    /// Get the health pool, if any.
    #[must_use]
    pub fn health(&self) -> Option<&HealthPool> {
        self.health.as_ref()
    }

    /// Get the health pool mutably, if any.
    pub fn health_mut(&mut self) -> Option<&mut HealthPool> {
        self.health.as_mut()
    }

    /// Current target, if any.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Time the last attack started.
    #[must_use]
    pub fn last_attack_time(&self) -> Option<f32> {
        self.last_attack_time
    }

    /// Time the target was last detected.
    #[must_use]
    pub fn last_seen_time(&self) -> Option<f32> {
        self.last_seen_time
    }

    /// Time the last damage got through.
    #[must_use]
    pub fn last_hit_time(&self) -> Option<f32> {
        self.health.as_ref().and_then(HealthPool::last_damage_time)
    }

    /// Checks if dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == AgentState::Dead
    }

    /// Chase speed including the current multiplier.
    #[must_use]
    pub fn chase_speed(&self) -> f32 {
        self.stats.chase_speed * self.speed_multiplier
    }

    /// Current chase speed multiplier.
    #[must_use]
    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Set the chase speed multiplier.
    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier.max(0.0);
    }

    /// Body info for world queries.
    #[must_use]
    pub fn body_info(&self) -> BodyInfo {
        BodyInfo {
            id: self.id,
            team: self.team,
            position: self.position,
            velocity: self.velocity,
            alive: !self.is_dead(),
        }
    }

    /// Queues an event for the bus.
    pub fn emit(&mut self, event: CombatEvent) {
        self.outbox.push(event);
    }

    /// Takes every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Moves along a legal edge. Illegal edges are refused and logged.
    pub fn transition(&mut self, next: AgentState) -> bool {
        if self.state == next {
            return true;
        }
        if !self.state.can_transition_to(next) {
            debug!("{} refused {:?} -> {:?}", self.id, self.state, next);
            return false;
        }
        debug!("{} {:?} -> {:?}", self.id, self.state, next);
        let from = self.state;
        self.state = next;
        self.emit(CombatEvent::StateChanged {
            entity_id: self.id,
            from,
            to: next,
        });
        true
    }

    /// Records `body` as the target without a state change.
    pub fn acquire(&mut self, body: &BodyInfo, now: f32) {
        self.target = Some(body.id);
        self.last_seen_time = Some(now);
    }

    /// Forces the core into Chase (boss wake).
    pub fn force_chase(&mut self, target: Option<EntityId>, now: f32) {
        if self.is_dead() {
            return;
        }
        if target.is_some() {
            self.target = target;
            self.last_seen_time = Some(now);
        }
        match self.state {
            AgentState::Patrol | AgentState::Attack => {
                self.transition(AgentState::Chase);
            }
            AgentState::Chase | AgentState::Dead => {}
        }
    }

    /// Runs the per-tick detection query.
    ///
    /// A detected target refreshes the last-seen time and pulls a patrolling
    /// agent into Chase when `engage` is set. A chase with no detection for
    /// longer than `lose_target_time` falls back to Patrol.
    pub fn detect(&mut self, world: &dyn CombatWorld, now: f32, engage: bool) -> Option<BodyInfo> {
        if self.is_dead() {
            return None;
        }
        let found = world.nearest_hostile(
            self.position,
            self.stats.detect_radius,
            self.team,
            self.stats.line_of_sight,
        );
        match found {
            Some(body) => {
                self.target = Some(body.id);
                self.last_seen_time = Some(now);
                if engage && self.state == AgentState::Patrol {
                    self.transition(AgentState::Chase);
                }
            }
            None => {
                let lost = self
                    .last_seen_time
                    .map_or(true, |seen| now - seen > self.stats.lose_target_time);
                if self.state == AgentState::Chase && lost {
                    self.lose_target();
                }
            }
        }
        found
    }

    /// Looks the current target up again.
    ///
    /// A target the world no longer knows, or one that died, is dropped.
    /// Returns `None` in that case and the caller handles the state change.
    pub fn refresh_target(&mut self, world: &dyn CombatWorld) -> Option<BodyInfo> {
        let id = self.target?;
        match world.body(id) {
            Some(body) if body.alive => Some(body),
            _ => {
                debug!("{} lost stale target {}", self.id, id);
                self.target = None;
                None
            }
        }
    }

    /// Drops the target and returns to Patrol.
    pub fn lose_target(&mut self) {
        self.target = None;
        if self.state == AgentState::Attack {
            self.transition(AgentState::Chase);
        }
        self.transition(AgentState::Patrol);
    }

    /// Whether an attack with `cooldown` may start at `now`.
    #[must_use]
    pub fn cooldown_ready(&self, now: f32, cooldown: f32) -> bool {
        self.last_attack_time.map_or(true, |last| now - last >= cooldown)
    }

    /// Enters Attack and latches the attack time.
    pub fn begin_attack(&mut self, now: f32) -> bool {
        if !self.transition(AgentState::Attack) {
            return false;
        }
        self.last_attack_time = Some(now);
        self.velocity = Vec2::ZERO;
        true
    }

    /// Latches the attack time without a state change (restart in place).
    pub fn latch_attack_time(&mut self, now: f32) {
        self.last_attack_time = Some(now);
    }

    /// Leaves Attack for Chase.
    pub fn end_attack(&mut self) {
        if self.state == AgentState::Attack {
            self.transition(AgentState::Chase);
        }
    }

    /// Enters Dead: zero velocity, no target, corpse timer started.
    pub fn die(&mut self, now: f32) {
        if self.is_dead() {
            return;
        }
        self.transition(AgentState::Dead);
        self.velocity = Vec2::ZERO;
        self.target = None;
        self.died_at = Some(now);
        info!("{} ({}) died", self.id, self.blueprint);
    }

    /// Forwards health notifications to the outbox. Returns `true` when the
    /// pool reported death.
    pub fn absorb_health_notifications(&mut self, now: f32) -> bool {
        let Some(pool) = self.health.as_mut() else {
            return false;
        };
        let mut died = false;
        for note in pool.drain_notifications() {
            died |= note == HealthNotification::Died;
            self.outbox.push(CombatEvent::from_health(self.id, note));
        }
        if died {
            self.die(now);
        }
        died
    }

    /// Records hit reports as events.
    pub fn record_hits(&mut self, reports: &[HitReport]) {
        for report in reports {
            self.emit(CombatEvent::Hit {
                attacker: self.id,
                target: report.target,
                damage: report.damage,
                knockback: report.knockback,
            });
        }
    }

    /// Whether the sprite is hidden this frame by the hit blink.
    #[must_use]
    pub fn is_blink_hidden(&self, now: f32) -> bool {
        match &self.health {
            Some(pool) if !self.is_dead() && pool.is_invulnerable(now) => {
                (now * BLINK_HZ) as i32 % 2 == 0
            }
            _ => false,
        }
    }

    /// Corpse opacity: 1 while alive, fading to 0 over the linger time.
    #[must_use]
    pub fn fade_alpha(&self, now: f32) -> f32 {
        match self.died_at {
            None => 1.0,
            Some(_) if self.stats.corpse_linger <= 0.0 => 0.0,
            Some(at) => (1.0 - (now - at) / self.stats.corpse_linger).clamp(0.0, 1.0),
        }
    }

    /// Whether the corpse has finished lingering.
    #[must_use]
    pub fn should_despawn(&self, now: f32) -> bool {
        self.died_at.is_some_and(|at| now - at >= self.stats.corpse_linger)
    }

    /// Position integration.
    pub fn integrate(&mut self, dt: f32) {
        if !self.is_dead() {
            self.position += self.velocity * dt;
        }
    }

    /// Limits vertical velocity so the next [`integrate`](Self::integrate)
    /// step does not end below `floor`. A body already under the floor may
    /// not sink further.
    pub fn hold_above(&mut self, floor: f32, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let floor = floor.min(self.position.y);
        if self.position.y + self.velocity.y * dt < floor {
            self.velocity.y = (floor - self.position.y) / dt;
        }
    }
}

impl EventSource for AgentCore {
    fn take_events(&mut self) -> Vec<CombatEvent> {
        self.drain_events()
    }
}
