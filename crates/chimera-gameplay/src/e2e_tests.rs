//! End-to-end tests for the Chimera combat simulation.
//!
//! These drive whole scenarios through [`Simulation`] with the builtin
//! bestiary and check what the presentation layer would observe on the bus.

#![cfg(test)]

use chimera_common::{EntityId, Vec2};

use crate::agent::AgentState;
use crate::attack::AttackKind;
use crate::bestiary::{Bestiary, BlueprintKind};
use crate::boss::{BossController, BossPhase, WeightedTable};
use crate::events::CombatEvent;
use crate::hostile::Agent;
use crate::simulation::Simulation;
use crate::snapshot::SimulationSnapshot;

const DT: f32 = 0.05;

/// Builtin bestiary with the boss limited to one attack and no contact damage.
fn bestiary_with_boss_attack(kind: AttackKind) -> Bestiary {
    let mut bestiary = Bestiary::builtin();
    for blueprint in &mut bestiary.blueprints {
        if let BlueprintKind::Boss(config) = &mut blueprint.kind {
            config.phases[0].table = WeightedTable::new(vec![(kind, 1.0)]);
            blueprint.contact = None;
        }
    }
    bestiary
}

fn health(sim: &Simulation, player: EntityId) -> f32 {
    sim.player(player).map_or(0.0, |p| p.pool().current())
}

fn boss_phase(sim: &Simulation, boss: EntityId) -> Option<BossPhase> {
    sim.agent(boss).and_then(Agent::boss).map(BossController::phase)
}

/// Ticks until `until`, returning every event with the time it was published.
fn run_until(sim: &mut Simulation, until: f32) -> Vec<(f32, CombatEvent)> {
    let mut log = Vec::new();
    while sim.now() < until {
        let at = sim.now();
        sim.tick(DT);
        log.extend(sim.drain_events().into_iter().map(|e| (at, e)));
    }
    log
}

mod melee_tests {
    use super::*;

    #[test]
    fn e2e_ground_agent_strikes_once_per_cycle() {
        let mut sim = Simulation::new(Bestiary::builtin(), 1);
        let player = sim.spawn_player(Vec2::new(1.5, 0.0), 100.0, 0.5);
        let stalker = sim.spawn("stalker", Vec2::ZERO).expect("stalker");

        run_until(&mut sim, 0.4);
        assert_eq!(sim.agent(stalker).map(Agent::state), Some(AgentState::Attack));
        assert_eq!(health(&sim, player), 100.0, "windup must not deal damage");

        let log = run_until(&mut sim, 1.2);
        assert_eq!(health(&sim, player), 80.0);
        let hits = log
            .iter()
            .filter(|(_, e)| matches!(e, CombatEvent::Hit { attacker, .. } if *attacker == stalker))
            .count();
        assert_eq!(hits, 1);

        run_until(&mut sim, 2.2);
        assert_eq!(health(&sim, player), 60.0, "second cycle restarts in place");
    }

    #[test]
    fn e2e_dead_target_sends_agent_back_to_patrol() {
        let mut sim = Simulation::new(Bestiary::builtin(), 2);
        let player = sim.spawn_player(Vec2::new(4.0, 0.0), 100.0, 0.5);
        let stalker = sim.spawn("stalker", Vec2::ZERO).expect("stalker");
        run_until(&mut sim, 0.2);
        assert_eq!(sim.agent(stalker).and_then(|a| a.core().target()), Some(player));

        sim.damage(player, 1000.0);
        run_until(&mut sim, 0.4);
        let agent = sim.agent(stalker).expect("stalker alive");
        assert_eq!(agent.state(), AgentState::Patrol);
        assert!(agent.core().target().is_none());
    }

    #[test]
    fn e2e_radius_patrol_turns_at_bound() {
        let mut sim = Simulation::new(Bestiary::builtin(), 3);
        let stalker = sim.spawn("stalker", Vec2::ZERO).expect("stalker");
        let x = |sim: &Simulation| sim.agent(stalker).map_or(0.0, |a| a.position().x);

        let mut furthest: f32 = 0.0;
        for _ in 0..200 {
            sim.tick(DT);
            furthest = furthest.max(x(&sim).abs());
        }
        assert!(furthest >= 5.0 - 0.2);
        assert!(furthest <= 5.0 + 0.2);
    }
}

mod boss_tests {
    use super::*;

    #[test]
    fn e2e_boss_wakes_and_waits_for_hunt_cooldown() {
        let mut sim = Simulation::new(bestiary_with_boss_attack(AttackKind::Bite), 4);
        let player = sim.spawn_player(Vec2::new(2.0, 0.0), 100.0, 0.5);
        let boss = sim.spawn("chimera", Vec2::ZERO).expect("boss");

        sim.tick(DT);
        assert_eq!(boss_phase(&sim, boss), Some(BossPhase::Hunt));
        let woke = sim.drain_events();
        assert!(woke.contains(&CombatEvent::PhaseChanged {
            entity_id: boss,
            from: BossPhase::Sleep,
            to: BossPhase::Hunt,
        }));

        let log = run_until(&mut sim, 5.0);
        let first_attack = log
            .iter()
            .find(|(_, e)| {
                matches!(
                    e,
                    CombatEvent::AttackTriggered {
                        attack: AttackKind::Bite,
                        ..
                    }
                )
            })
            .map(|(at, _)| *at);
        assert!(first_attack.is_some_and(|at| at >= 4.0 - 1e-3));
        assert_eq!(health(&sim, player), 84.0);
    }

    #[test]
    fn e2e_boss_enters_rage_and_stays() {
        let mut sim = Simulation::new(Bestiary::builtin(), 5);
        sim.spawn_player(Vec2::new(2.0, 0.0), 100.0, 0.5);
        let boss = sim.spawn("chimera", Vec2::ZERO).expect("boss");
        sim.tick(DT);
        sim.drain_events();

        sim.damage(boss, 90.0);
        assert_eq!(boss_phase(&sim, boss), Some(BossPhase::Rage));
        let events = sim.drain_events();
        assert!(events.contains(&CombatEvent::PhaseChanged {
            entity_id: boss,
            from: BossPhase::Hunt,
            to: BossPhase::Rage,
        }));

        sim.heal(boss, 200.0);
        run_until(&mut sim, 1.0);
        assert_eq!(boss_phase(&sim, boss), Some(BossPhase::Rage));
    }

    #[test]
    fn e2e_sleeping_boss_slows_moving_target() {
        let mut sim = Simulation::new(Bestiary::builtin(), 6);
        let player = sim.spawn_player(Vec2::new(5.0, 0.0), 100.0, 0.5);
        let boss = sim.spawn("chimera", Vec2::ZERO).expect("boss");
        sim.set_player_intent(player, Vec2::new(2.0, 0.0));

        run_until(&mut sim, 1.0);
        assert_eq!(boss_phase(&sim, boss), Some(BossPhase::Sleep));
        let x = sim.player(player).map_or(0.0, |p| p.position.x);
        assert!((x - 6.0).abs() < 0.1, "expected half speed, got x = {x}");
    }

    #[test]
    fn e2e_drone_swarm_outlives_the_boss() {
        let mut sim = Simulation::new(bestiary_with_boss_attack(AttackKind::DroneSwarm), 7);
        sim.spawn_player(Vec2::new(2.0, 0.0), 1000.0, 0.5);
        let boss = sim.spawn("chimera", Vec2::ZERO).expect("boss");

        let log = run_until(&mut sim, 5.5);
        let spawned = log.iter().find_map(|(_, e)| match e {
            CombatEvent::SubAgentsSpawned { spawner, count } if *spawner == boss => Some(*count),
            _ => None,
        });
        assert_eq!(spawned, Some(3));

        let drones: Vec<EntityId> = sim
            .arena()
            .agents()
            .filter(|a| a.core().blueprint() == "drone")
            .map(Agent::id)
            .collect();
        assert_eq!(drones.len(), 3);

        sim.damage(boss, 10_000.0);
        run_until(&mut sim, 8.0);
        assert!(sim.agent(boss).is_none(), "boss corpse despawned");
        for drone in drones {
            assert!(sim.agent(drone).is_some_and(|a| a.state() != AgentState::Dead));
        }
    }
}

mod snapshot_tests {
    use super::*;

    fn busy_arena() -> Simulation {
        let mut sim = Simulation::new(Bestiary::builtin(), 77);
        let player = sim.spawn_player(Vec2::new(3.0, 0.0), 500.0, 0.5);
        sim.set_player_intent(player, Vec2::new(-0.5, 0.0));
        let roster = [
            ("grunt", -3.0, 0.0),
            ("bat", 1.0, 3.0),
            ("drone", 6.0, 2.0),
            ("chimera", 8.0, 0.0),
        ];
        for (name, x, y) in roster {
            sim.spawn(name, Vec2::new(x, y)).expect("builtin blueprint");
        }
        sim
    }

    #[test]
    fn e2e_restored_snapshot_continues_identically() {
        let mut original = busy_arena();
        for _ in 0..60 {
            original.tick(DT);
        }

        let bytes = original.snapshot().to_bytes().expect("encode");
        let snapshot = SimulationSnapshot::from_bytes(&bytes).expect("decode");
        let mut restored = Simulation::restore(snapshot, Bestiary::builtin()).expect("restore");

        for step in 0..200 {
            original.tick(DT);
            restored.tick(DT);
            assert_eq!(original.arena(), restored.arena(), "diverged at step {step}");
        }
        assert_eq!(original.snapshot(), restored.snapshot());
    }
}
