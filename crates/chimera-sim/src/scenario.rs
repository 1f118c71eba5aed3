//! Scenario setup and the fixed-step run loop.

use std::fmt;

use chimera_common::EntityId;
use chimera_gameplay::{Bestiary, CombatEvent, CombatResult, Simulation};
use tracing::{debug, info, warn};

use crate::config::SimConfig;

/// Tallies of everything observed on the event bus during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Ticks executed
    pub ticks: u64,
    /// Simulated seconds
    pub elapsed: f32,
    /// Agents spawned, sub-agents included
    pub spawned: u32,
    /// Attacks started
    pub attacks: u32,
    /// Hits landed on the player
    pub hits_taken: u32,
    /// Hits landed by the player
    pub hits_dealt: u32,
    /// Damage the player took
    pub damage_taken: f32,
    /// Damage the player dealt
    pub damage_dealt: f32,
    /// Death events, player included
    pub deaths: u32,
    /// Boss phase transitions
    pub phase_changes: u32,
    /// Corpses removed
    pub despawned: u32,
    /// Player health at the end
    pub player_health: f32,
    /// Agents still present at the end
    pub agents_left: usize,
}

impl RunSummary {
    /// Folds one event into the tallies.
    pub fn record(&mut self, player: EntityId, event: &CombatEvent) {
        match event {
            CombatEvent::Spawned { entity_id, .. } if *entity_id != player => self.spawned += 1,
            CombatEvent::AttackTriggered { .. } => self.attacks += 1,
            CombatEvent::Hit {
                attacker,
                target,
                damage,
                ..
            } => {
                if *target == player {
                    self.hits_taken += 1;
                    self.damage_taken += damage;
                } else if *attacker == player {
                    self.hits_dealt += 1;
                    self.damage_dealt += damage;
                }
            },
            CombatEvent::Death { .. } => self.deaths += 1,
            CombatEvent::PhaseChanged { .. } => self.phase_changes += 1,
            CombatEvent::Despawned { .. } => self.despawned += 1,
            _ => {},
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks / {:.2}s: {} spawned, {} attacks, \
             player took {} hits ({:.1} dmg) and landed {} ({:.1} dmg), \
             {} deaths, {} phase changes, {} despawned, \
             player health {:.1}, {} agents left",
            self.ticks,
            self.elapsed,
            self.spawned,
            self.attacks,
            self.hits_taken,
            self.damage_taken,
            self.hits_dealt,
            self.damage_dealt,
            self.deaths,
            self.phase_changes,
            self.despawned,
            self.player_health,
            self.agents_left,
        )
    }
}

/// A configured simulation with its scripted player dummy.
pub struct Scenario {
    config: SimConfig,
    sim: Simulation,
    player: EntityId,
    next_strike: f32,
    summary: RunSummary,
}

impl Scenario {
    /// Builds the arena: player first, then the roster in order.
    ///
    /// Roster entries naming unknown blueprints are skipped with a warning.
    pub fn new(config: SimConfig, bestiary: Bestiary) -> Self {
        let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
        info!("Scenario seed {seed}");

        let mut sim = Simulation::new(bestiary, seed);
        let p = &config.player;
        let player = sim.spawn_player(p.position, p.max_health, p.invulnerability);
        sim.set_player_intent(player, p.intent);

        for entry in &config.roster {
            match sim.spawn(&entry.blueprint, entry.position) {
                Ok(id) => debug!("Roster: {} {} at {}", entry.blueprint, id, entry.position),
                Err(e) => warn!("Roster entry {} skipped: {e}", entry.blueprint),
            }
        }

        let next_strike = config.player.strike_interval;
        let mut scenario = Self {
            config,
            sim,
            player,
            next_strike,
            summary: RunSummary::default(),
        };
        scenario.collect_events();
        scenario
    }

    /// The player dummy's ID.
    pub fn player(&self) -> EntityId {
        self.player
    }

    /// The running simulation.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Tallies so far.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Runs one fixed step: the dummy's counter-strike, then the simulation.
    pub fn step(&mut self) {
        let interval = self.config.player.strike_interval;
        if interval > 0.0 && self.sim.now() >= self.next_strike {
            let p = &self.config.player;
            let hits = self.sim.player_strike(self.player, p.strike_radius, p.strike_damage, None);
            if !hits.is_empty() {
                debug!("Player strike hit {} agents", hits.len());
            }
            self.next_strike += interval;
        }

        self.sim.tick(self.config.dt());
        self.collect_events();
    }

    /// Runs every configured tick, stopping early if the player dies.
    pub fn run(&mut self) -> &RunSummary {
        let total = self.config.total_ticks();
        for _ in 0..total {
            self.step();
            if self.sim.player(self.player).map_or(true, |p| p.is_dead()) {
                info!("Player died at t={:.2}", self.sim.now());
                break;
            }
        }
        &self.summary
    }

    /// Writes the final snapshot if one is configured.
    pub fn write_snapshot(&self) -> CombatResult<()> {
        if let Some(path) = &self.config.snapshot_path {
            self.sim.snapshot().save(path)?;
        }
        Ok(())
    }

    fn collect_events(&mut self) {
        for event in self.sim.drain_events() {
            debug!(?event, "event");
            self.summary.record(self.player, &event);
        }
        self.summary.ticks = self.sim.tick_count();
        self.summary.elapsed = self.sim.now();
        self.summary.player_health = self
            .sim
            .player(self.player)
            .map_or(0.0, |p| p.pool().current());
        self.summary.agents_left = self.sim.agent_count();
    }
}
