//! Sub-agent spawning.
//!
//! Attacks that release other agents (the boss's drone swarm) only push a
//! [`SpawnRequest`] during their tick. The simulation turns requests into
//! agents through a [`SubAgentSpawner`] once the tick is over. The spawning
//! agent keeps no reference to what it created.

use chimera_common::{EntityId, IdAllocator, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CombatResult;
use crate::hostile::Agent;

/// Request to create agents from a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Agent whose attack produced the request
    pub spawner: EntityId,
    /// Blueprint to instantiate
    pub blueprint: String,
    /// World positions, one agent each
    pub positions: Vec<Vec2>,
}

/// Builds agents from blueprint names.
pub trait AgentFactory {
    /// Creates an independent agent from `blueprint` at `position`.
    fn build(&self, blueprint: &str, id: EntityId, position: Vec2) -> CombatResult<Agent>;
}

/// Creates sub-agents through a factory.
pub struct SubAgentSpawner<'a> {
    factory: &'a dyn AgentFactory,
}

impl<'a> SubAgentSpawner<'a> {
    /// Creates a spawner backed by `factory`.
    #[must_use]
    pub fn new(factory: &'a dyn AgentFactory) -> Self {
        Self { factory }
    }

    /// Builds one agent per position. Positions the factory rejects are
    /// logged and skipped.
    pub fn spawn(&self, blueprint: &str, positions: &[Vec2], ids: &mut IdAllocator) -> Vec<Agent> {
        let mut agents = Vec::with_capacity(positions.len());
        for position in positions {
            let id = ids.allocate();
            match self.factory.build(blueprint, id, *position) {
                Ok(agent) => agents.push(agent),
                Err(e) => warn!("Failed to spawn {} at {:?}: {}", blueprint, position, e),
            }
        }
        if !agents.is_empty() {
            info!("Spawned {} x {}", agents.len(), blueprint);
        }
        agents
    }

    /// Serves a request produced during a tick.
    pub fn fulfil(&self, request: &SpawnRequest, ids: &mut IdAllocator) -> Vec<Agent> {
        self.spawn(&request.blueprint, &request.positions, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentCore, AgentStats};
    use crate::error::CombatError;
    use crate::ground::{GroundMover, PatrolRoute};
    use crate::hostile::Behavior;

    struct OnlyDrones;

    impl AgentFactory for OnlyDrones {
        fn build(&self, blueprint: &str, id: EntityId, position: Vec2) -> CombatResult<Agent> {
            if blueprint != "drone" {
                return Err(CombatError::UnknownBlueprint(blueprint.to_string()));
            }
            let core = AgentCore::new(id, blueprint, position, AgentStats::default());
            Ok(Agent::new(core, Behavior::Ground(GroundMover::new(PatrolRoute::Bounce))))
        }
    }

    #[test]
    fn test_spawns_one_agent_per_position() {
        let factory = OnlyDrones;
        let spawner = SubAgentSpawner::new(&factory);
        let mut ids = IdAllocator::new();
        let request = SpawnRequest {
            spawner: EntityId::from_raw(99),
            blueprint: "drone".into(),
            positions: vec![Vec2::new(-2.0, 2.0), Vec2::new(0.0, 3.0), Vec2::new(2.0, 2.0)],
        };

        let agents = spawner.fulfil(&request, &mut ids);
        assert_eq!(agents.len(), 3);
        assert_eq!(agents[1].position(), Vec2::new(0.0, 3.0));
        let mut raw: Vec<u64> = agents.iter().map(|a| a.id().raw()).collect();
        raw.dedup();
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn test_unknown_blueprint_is_skipped() {
        let factory = OnlyDrones;
        let spawner = SubAgentSpawner::new(&factory);
        let mut ids = IdAllocator::new();
        let agents = spawner.spawn("wyrm", &[Vec2::ZERO], &mut ids);
        assert!(agents.is_empty());
    }
}
