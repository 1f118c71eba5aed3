//! Simulation snapshots.
//!
//! Binary snapshots are `CHSN` magic bytes followed by a bincode payload
//! whose first field is the schema version, so the version can be checked
//! before the rest is decoded. JSON snapshots carry the same struct.

use std::fs;
use std::path::Path;

use chimera_common::{IdAllocator, MagicBytes, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bestiary::Bestiary;
use crate::error::{CombatError, CombatResult};
use crate::events::EventBus;
use crate::hostile::Agent;
use crate::physics::CollisionGrid;
use crate::simulation::{Arena, PlayerBody, Simulation};

/// Complete simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Snapshot schema version (must stay the first field)
    pub version: SchemaVersion,
    /// Simulation time
    pub now: f32,
    /// Ticks run
    pub tick_count: u64,
    /// Random generator state
    pub rng_seed: u64,
    /// Next entity ID
    pub ids: IdAllocator,
    /// Agents in tick order
    pub agents: Vec<Agent>,
    /// Player bodies
    pub players: Vec<PlayerBody>,
    /// Level collision
    pub collision: CollisionGrid,
}

impl SimulationSnapshot {
    /// Encodes as magic bytes plus bincode.
    pub fn to_bytes(&self) -> CombatResult<Vec<u8>> {
        let payload = bincode::serialize(self).map_err(|e| CombatError::Snapshot(e.to_string()))?;
        let mut bytes = Vec::with_capacity(payload.len() + 4);
        bytes.extend_from_slice(&MagicBytes::SNAPSHOT.0);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decodes bytes written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> CombatResult<Self> {
        let payload = MagicBytes::SNAPSHOT.strip(bytes)?;
        let version: SchemaVersion =
            bincode::deserialize(payload).map_err(|e| CombatError::Snapshot(e.to_string()))?;
        SchemaVersion::SNAPSHOT.ensure_can_read(version)?;
        bincode::deserialize(payload).map_err(|e| CombatError::Snapshot(e.to_string()))
    }

    /// Encodes as pretty JSON.
    pub fn to_json(&self) -> CombatResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CombatError::Snapshot(e.to_string()))
    }

    /// Decodes JSON written by [`to_json`](Self::to_json).
    pub fn from_json(source: &str) -> CombatResult<Self> {
        let snapshot: Self =
            serde_json::from_str(source).map_err(|e| CombatError::Snapshot(e.to_string()))?;
        SchemaVersion::SNAPSHOT.ensure_can_read(snapshot.version)?;
        Ok(snapshot)
    }

    /// Writes a binary snapshot file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CombatResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()?)?;
        info!("Saved snapshot at t={:.2} to {:?}", self.now, path);
        Ok(())
    }

    /// Reads a binary snapshot file.
    pub fn load<P: AsRef<Path>>(path: P) -> CombatResult<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl Simulation {
    /// Captures the full state. Pending bus events are not included.
    #[must_use]
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            version: SchemaVersion::SNAPSHOT,
            now: self.now,
            tick_count: self.tick_count,
            rng_seed: self.rng.get_seed(),
            ids: self.ids.clone(),
            agents: self.arena.agents.values().cloned().collect(),
            players: self.arena.players.clone(),
            collision: self.arena.collision.clone(),
        }
    }

    /// Rebuilds a simulation from `snapshot` with a fresh event bus.
    pub fn restore(snapshot: SimulationSnapshot, bestiary: Bestiary) -> CombatResult<Self> {
        SchemaVersion::SNAPSHOT.ensure_can_read(snapshot.version)?;
        let arena = Arena {
            agents: snapshot.agents.into_iter().map(|a| (a.id(), a)).collect(),
            players: snapshot.players,
            collision: snapshot.collision,
        };
        Ok(Self {
            arena,
            bestiary,
            rng: fastrand::Rng::with_seed(snapshot.rng_seed),
            ids: snapshot.ids,
            now: snapshot.now,
            tick_count: snapshot.tick_count,
            bus: EventBus::default(),
        })
    }
}
