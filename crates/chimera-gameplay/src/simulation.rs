//! Simulation arena and tick driver.
//!
//! The [`Arena`] owns every body and implements [`CombatWorld`]. During an
//! agent's tick that agent is lifted out of the arena so the rest of the
//! arena can be lent to it mutably. Agents tick in ID order, which is also
//! spawn order.

use std::collections::BTreeMap;

use chimera_common::{EntityId, IdAllocator, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::area::{self, AreaStrike, HitReport};
use crate::attack::Knockback;
use crate::bestiary::Bestiary;
use crate::boss::SlowAura;
use crate::error::CombatResult;
use crate::events::{CombatEvent, EventBus, EventSource};
use crate::health::{Damageable, HealthPool};
use crate::hostile::{Agent, TickContext};
use crate::physics::{self, CollisionGrid};
use crate::spawn::{AgentFactory, SpawnRequest, SubAgentSpawner};
use crate::world::{BodyInfo, CombatWorld, Team};

/// Knockback velocity lost per second.
const KNOCKBACK_DECAY: f32 = 6.0;

/// Speed below which a body counts as standing still for the slow aura.
const SLOW_MIN_SPEED: f32 = 0.1;

// ============================================================================
// Player Body
// ============================================================================

/// A player-controlled body: movement intent, knockback and health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBody {
    id: EntityId,
    /// World position
    pub position: Vec2,
    intent: Vec2,
    knockback: Vec2,
    pool: HealthPool,
}

impl PlayerBody {
    /// Creates a player body with a full pool.
    #[must_use]
    pub fn new(id: EntityId, position: Vec2, max_health: f32, invulnerability: f32) -> Self {
        Self {
            id,
            position,
            intent: Vec2::ZERO,
            knockback: Vec2::ZERO,
            pool: HealthPool::new(max_health).with_invulnerability(invulnerability),
        }
    }

    /// Get entity ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Get the health pool.
    #[must_use]
    pub fn pool(&self) -> &HealthPool {
        &self.pool
    }

    /// Checks if dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.pool.is_dead()
    }

    /// Set the movement intent.
    pub fn set_intent(&mut self, velocity: Vec2) {
        self.intent = velocity;
    }

    /// Intent plus remaining knockback.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        if self.is_dead() {
            Vec2::ZERO
        } else {
            self.intent + self.knockback
        }
    }

    /// Body info for world queries.
    #[must_use]
    pub fn body_info(&self) -> BodyInfo {
        BodyInfo {
            id: self.id,
            team: Team::Player,
            position: self.position,
            velocity: self.velocity(),
            alive: !self.is_dead(),
        }
    }

    /// Moves the body; `slow` scales the velocity while it is moving.
    pub fn integrate(&mut self, dt: f32, slow: f32) {
        if self.is_dead() {
            return;
        }
        let mut velocity = self.velocity();
        if slow < 1.0 && velocity.length() > SLOW_MIN_SPEED {
            velocity *= slow;
        }
        self.position += velocity * dt;
        self.knockback *= (1.0 - KNOCKBACK_DECAY * dt).max(0.0);
    }

    /// Health notifications as bus events.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        let id = self.id;
        self.pool
            .drain_notifications()
            .into_iter()
            .map(|note| CombatEvent::from_health(id, note))
            .collect()
    }
}

impl EventSource for PlayerBody {
    fn take_events(&mut self) -> Vec<CombatEvent> {
        self.drain_events()
    }
}

impl Damageable for PlayerBody {
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
        if !self.is_dead() {
            self.knockback += impulse;
        }
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Every body in the simulation plus level collision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub(crate) agents: BTreeMap<EntityId, Agent>,
    pub(crate) players: Vec<PlayerBody>,
    pub(crate) collision: CollisionGrid,
}

impl Arena {
    /// Creates an empty arena with `collision`.
    #[must_use]
    pub fn new(collision: CollisionGrid) -> Self {
        Self {
            collision,
            ..Self::default()
        }
    }

    /// Get an agent.
    #[must_use]
    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Get a player.
    #[must_use]
    pub fn player(&self, id: EntityId) -> Option<&PlayerBody> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: EntityId) -> Option<&mut PlayerBody> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Agents in tick order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Players.
    #[must_use]
    pub fn players(&self) -> &[PlayerBody] {
        &self.players
    }

    /// Level collision.
    #[must_use]
    pub fn collision(&self) -> &CollisionGrid {
        &self.collision
    }

    fn bodies(&self) -> impl Iterator<Item = BodyInfo> + '_ {
        self.players
            .iter()
            .map(PlayerBody::body_info)
            .chain(self.agents.values().map(Agent::body_info))
    }
}

impl CombatWorld for Arena {
    fn bodies_within(&self, center: Vec2, radius: f32) -> Vec<BodyInfo> {
        self.bodies()
            .filter(|b| b.position.distance(center) <= radius)
            .collect()
    }

    fn body(&self, id: EntityId) -> Option<BodyInfo> {
        self.player(id)
            .map(PlayerBody::body_info)
            .or_else(|| self.agents.get(&id).map(Agent::body_info))
    }

    fn is_obstructed(&self, from: Vec2, to: Vec2) -> bool {
        physics::is_obstructed(&self.collision, from, to)
    }

    fn wall_ahead(&self, origin: Vec2, direction: Vec2, distance: f32) -> bool {
        physics::wall_ahead(&self.collision, origin, direction, distance)
    }

    fn damageable_mut(&mut self, id: EntityId) -> Option<&mut dyn Damageable> {
        if let Some(index) = self.players.iter().position(|p| p.id == id) {
            return Some(&mut self.players[index] as &mut dyn Damageable);
        }
        self.agents.get_mut(&id).map(|a| a as &mut dyn Damageable)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Deterministic combat simulation.
#[derive(Debug)]
pub struct Simulation {
    pub(crate) arena: Arena,
    pub(crate) bestiary: Bestiary,
    pub(crate) rng: fastrand::Rng,
    pub(crate) ids: IdAllocator,
    pub(crate) now: f32,
    pub(crate) tick_count: u64,
    pub(crate) bus: EventBus,
}

impl Simulation {
    /// Creates an empty simulation.
    #[must_use]
    pub fn new(bestiary: Bestiary, seed: u64) -> Self {
        Self {
            arena: Arena::default(),
            bestiary,
            rng: fastrand::Rng::with_seed(seed),
            ids: IdAllocator::new(),
            now: 0.0,
            tick_count: 0,
            bus: EventBus::default(),
        }
    }

    /// Set level collision.
    #[must_use]
    pub fn with_collision(mut self, collision: CollisionGrid) -> Self {
        self.arena.collision = collision;
        self
    }

    /// Set the event bus.
    #[must_use]
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// Simulation time.
    #[must_use]
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Get the arena.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Get the bestiary.
    #[must_use]
    pub fn bestiary(&self) -> &Bestiary {
        &self.bestiary
    }

    /// Get the event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Takes every event published so far.
    pub fn drain_events(&self) -> Vec<CombatEvent> {
        self.bus.drain()
    }

    /// Get an agent.
    #[must_use]
    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.arena.agent(id)
    }

    /// Get a player.
    #[must_use]
    pub fn player(&self, id: EntityId) -> Option<&PlayerBody> {
        self.arena.player(id)
    }

    /// Number of agents still in the arena (corpses included).
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.arena.agents.len()
    }

    /// Adds a player body.
    pub fn spawn_player(
        &mut self,
        position: Vec2,
        max_health: f32,
        invulnerability: f32,
    ) -> EntityId {
        let id = self.ids.allocate();
        self.arena
            .players
            .push(PlayerBody::new(id, position, max_health, invulnerability));
        self.bus.publish(CombatEvent::Spawned {
            entity_id: id,
            blueprint: String::new(),
            position,
        });
        info!("Player {} joined at {:?}", id, position);
        id
    }

    /// Adds an agent from the bestiary.
    pub fn spawn(&mut self, blueprint: &str, position: Vec2) -> CombatResult<EntityId> {
        let id = self.ids.allocate();
        let agent = self.bestiary.build(blueprint, id, position)?;
        self.insert_agent(agent);
        Ok(id)
    }

    fn insert_agent(&mut self, mut agent: Agent) {
        agent.on_spawn(&mut self.rng);
        let id = agent.id();
        self.bus.publish(CombatEvent::Spawned {
            entity_id: id,
            blueprint: agent.core().blueprint().to_string(),
            position: agent.position(),
        });
        debug!("Spawned {} ({}) at {:?}", id, agent.core().blueprint(), agent.position());
        self.arena.agents.insert(id, agent);
    }

    /// Set a player's movement intent.
    pub fn set_player_intent(&mut self, id: EntityId, velocity: Vec2) {
        if let Some(player) = self.arena.player_mut(id) {
            player.set_intent(velocity);
        }
    }

    /// Teleports a player.
    pub fn set_player_position(&mut self, id: EntityId, position: Vec2) {
        if let Some(player) = self.arena.player_mut(id) {
            player.position = position;
        }
    }

    /// Area strike centered on a player, hitting agents around it.
    pub fn player_strike(
        &mut self,
        id: EntityId,
        radius: f32,
        damage: f32,
        knockback: Option<Knockback>,
    ) -> Vec<HitReport> {
        let Some(center) = self.arena.player(id).filter(|p| !p.is_dead()).map(|p| p.position) else {
            return Vec::new();
        };
        let mut strike = AreaStrike::new(id, Team::Player, center, radius, damage, self.now);
        if let Some(knockback) = knockback {
            strike = strike.with_knockback(knockback, center);
        }
        let reports = area::resolve(&mut self.arena, &strike);
        for report in &reports {
            self.bus.publish(CombatEvent::Hit {
                attacker: id,
                target: report.target,
                damage: report.damage,
                knockback: report.knockback,
            });
        }
        self.flush_events();
        reports
    }

    /// Direct damage to any body, e.g. from level hazards.
    pub fn damage(&mut self, id: EntityId, amount: f32) {
        let now = self.now;
        if let Some(target) = self.arena.damageable_mut(id) {
            target.take_damage(amount, now);
        }
        self.flush_events();
    }

    /// Direct healing of any body.
    pub fn heal(&mut self, id: EntityId, amount: f32) {
        if let Some(target) = self.arena.damageable_mut(id) {
            target.heal(amount);
        }
        self.flush_events();
    }

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if dt <= 0.0 || dt.is_nan() {
            return;
        }
        let now = self.now;
        let mut spawns: Vec<SpawnRequest> = Vec::new();

        let order: Vec<EntityId> = self.arena.agents.keys().copied().collect();
        for id in order {
            let Some(mut agent) = self.arena.agents.remove(&id) else {
                continue;
            };
            let mut ctx = TickContext {
                now,
                dt,
                rng: &mut self.rng,
                spawns: &mut spawns,
            };
            agent.tick(&mut self.arena, &mut ctx);
            self.arena.agents.insert(id, agent);
        }

        let auras: Vec<SlowAura> = self.arena.agents.values().filter_map(Agent::aura).collect();
        for player in &mut self.arena.players {
            let slow = auras
                .iter()
                .filter(|a| a.target == player.id)
                .fold(1.0, |acc, a| acc * a.factor);
            player.integrate(dt, slow);
        }

        self.fulfil_spawns(&spawns);

        self.now += dt;
        self.tick_count += 1;

        let expired: Vec<EntityId> = self
            .arena
            .agents
            .values()
            .filter(|a| a.core().should_despawn(self.now))
            .map(Agent::id)
            .collect();
        for id in expired {
            if let Some(mut agent) = self.arena.agents.remove(&id) {
                self.bus.collect(agent.core_mut());
                self.bus.publish(CombatEvent::Despawned { entity_id: id });
                debug!("Despawned {}", id);
            }
        }

        self.flush_events();
    }

    fn fulfil_spawns(&mut self, requests: &[SpawnRequest]) {
        for request in requests {
            let created = {
                let spawner = SubAgentSpawner::new(&self.bestiary);
                spawner.fulfil(request, &mut self.ids)
            };
            let count = created.len();
            for agent in created {
                self.insert_agent(agent);
            }
            self.bus.publish(CombatEvent::SubAgentsSpawned {
                spawner: request.spawner,
                count,
            });
        }
    }

    fn flush_events(&mut self) {
        for agent in self.arena.agents.values_mut() {
            self.bus.collect(agent.core_mut());
        }
        for player in &mut self.arena.players {
            self.bus.collect(player);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentState;

    fn sim() -> Simulation {
        Simulation::new(Bestiary::builtin(), 42)
    }

    #[test]
    fn test_player_damage_and_knockback() {
        let mut player = PlayerBody::new(EntityId::from_raw(1), Vec2::ZERO, 100.0, 0.5);
        player.take_damage(20.0, 0.0);
        player.take_damage(20.0, 0.1);
        assert_eq!(player.current_health(), 80.0);

        player.apply_impulse(Vec2::new(8.0, 4.0));
        player.integrate(0.1, 1.0);
        assert!(player.position.x > 0.0 && player.position.y > 0.0);

        let events = player.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], CombatEvent::Damaged { amount, .. } if amount == 20.0));
    }

    #[test]
    fn test_slow_only_applies_while_moving() {
        let mut player = PlayerBody::new(EntityId::from_raw(1), Vec2::ZERO, 100.0, 0.5);
        player.integrate(1.0, 0.5);
        assert_eq!(player.position, Vec2::ZERO);
        player.set_intent(Vec2::new(4.0, 0.0));
        player.integrate(1.0, 0.5);
        assert!((player.position.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_spawn_publishes_and_ticks_in_order() {
        let mut sim = sim();
        let player = sim.spawn_player(Vec2::new(100.0, 0.0), 100.0, 0.5);
        let a = sim.spawn("grunt", Vec2::ZERO).expect("grunt");
        let b = sim.spawn("stalker", Vec2::new(20.0, 0.0)).expect("stalker");
        assert!(a < b);
        assert!(sim.spawn("wyrm", Vec2::ZERO).is_err());

        let events = sim.drain_events();
        let spawned = events
            .iter()
            .filter(|e| matches!(e, CombatEvent::Spawned { .. }))
            .count();
        assert_eq!(spawned, 3);

        for _ in 0..10 {
            sim.tick(0.05);
        }
        assert_eq!(sim.agent(a).map(Agent::state), Some(AgentState::Patrol));
        assert!(sim.player(player).is_some());
        assert!((sim.now() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_corpse_lingers_then_despawns() {
        let mut sim = sim();
        let player = sim.spawn_player(Vec2::new(1.0, 0.0), 100.0, 0.5);
        let grunt = sim.spawn("grunt", Vec2::new(20.0, 0.0)).expect("grunt");
        sim.damage(grunt, 500.0);
        assert_eq!(sim.agent(grunt).map(Agent::state), Some(AgentState::Dead));

        for _ in 0..10 {
            sim.tick(0.1);
        }
        assert!(sim.agent(grunt).is_some());
        let alpha = sim.agent(grunt).map(|a| a.core().fade_alpha(sim.now()));
        assert!(alpha.is_some_and(|a| a > 0.0 && a < 1.0));

        for _ in 0..6 {
            sim.tick(0.1);
        }
        assert!(sim.agent(grunt).is_none());
        let events = sim.drain_events();
        assert!(events.contains(&CombatEvent::Despawned { entity_id: grunt }));
        assert!(events.contains(&CombatEvent::Death { entity_id: grunt }));
        assert_eq!(sim.player(player).map(|p| p.pool().current()), Some(100.0));
    }

    #[test]
    fn test_player_strike_hits_agents_only() {
        let mut sim = sim();
        let player = sim.spawn_player(Vec2::ZERO, 100.0, 0.5);
        let other = sim.spawn_player(Vec2::new(0.5, 0.0), 100.0, 0.5);
        let grunt = sim.spawn("grunt", Vec2::new(1.0, 0.0)).expect("grunt");

        let reports = sim.player_strike(player, 2.0, 30.0, Some(Knockback::radial(2.0)));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].target, grunt);
        assert_eq!(sim.agent(grunt).map(Agent::current_health), Some(70.0));
        assert_eq!(sim.player(other).map(|p| p.pool().current()), Some(100.0));
    }

    #[test]
    fn test_small_bus_counts_lost_events() {
        let mut sim = Simulation::new(Bestiary::builtin(), 3).with_bus(EventBus::new(2));
        for x in [0.0, 10.0, 20.0] {
            sim.spawn("grunt", Vec2::new(x, 0.0)).expect("grunt");
        }
        assert_eq!(sim.bus().pending_count(), 2);
        assert_eq!(sim.bus().dropped(), 1);
        assert_eq!(sim.drain_events().len(), 2);
        assert_eq!(sim.agent_count(), 3, "a full bus never blocks the simulation");
    }
}
