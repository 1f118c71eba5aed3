//! Event bus carrying presentation notifications out of the simulation.
//!
//! Events are fire-and-forget: a full or unobserved bus drops them, and the
//! simulation never waits on a listener.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::debug;

use chimera_common::{EntityId, Vec2};

use crate::agent::AgentState;
use crate::attack::AttackKind;
use crate::boss::BossPhase;
use crate::health::HealthNotification;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Entity joined the simulation
    Spawned {
        /// Entity ID
        entity_id: EntityId,
        /// Blueprint name, empty for player bodies
        blueprint: String,
        /// Spawn position
        position: Vec2,
    },
    /// Agent FSM moved to a new state
    StateChanged {
        /// Entity ID
        entity_id: EntityId,
        /// Previous state
        from: AgentState,
        /// New state
        to: AgentState,
    },
    /// Attack sequence started
    AttackTriggered {
        /// Attacking entity
        entity_id: EntityId,
        /// Which attack
        attack: AttackKind,
    },
    /// A strike or contact landed on a target
    Hit {
        /// Attacking entity
        attacker: EntityId,
        /// Entity that was hit
        target: EntityId,
        /// Health removed
        damage: f32,
        /// Knockback applied (if any)
        knockback: Option<Vec2>,
    },
    /// Entity lost health
    Damaged {
        /// Entity ID
        entity_id: EntityId,
        /// Health removed
        amount: f32,
        /// Health left
        remaining: f32,
    },
    /// Entity regained health
    Healed {
        /// Entity ID
        entity_id: EntityId,
        /// Health restored
        amount: f32,
        /// Health after healing
        current: f32,
    },
    /// Entity health reached zero
    Death {
        /// Entity ID
        entity_id: EntityId,
    },
    /// Boss moved to another phase
    PhaseChanged {
        /// Boss entity
        entity_id: EntityId,
        /// Previous phase
        from: BossPhase,
        /// New phase
        to: BossPhase,
    },
    /// Spawner created independent sub-agents
    SubAgentsSpawned {
        /// Spawning entity
        spawner: EntityId,
        /// Number of agents created
        count: usize,
    },
    /// Entity removed from the simulation
    Despawned {
        /// Entity ID
        entity_id: EntityId,
    },
}

impl CombatEvent {
    /// Event for a health notification raised by `entity_id`'s pool.
    #[must_use]
    pub fn from_health(entity_id: EntityId, note: HealthNotification) -> Self {
        match note {
            HealthNotification::Damaged { amount, remaining } => Self::Damaged {
                entity_id,
                amount,
                remaining,
            },
            HealthNotification::Healed { amount, current } => Self::Healed {
                entity_id,
                amount,
                current,
            },
            HealthNotification::Died => Self::Death { entity_id },
        }
    }

    /// Entity the event is primarily about.
    #[must_use]
    pub fn subject(&self) -> EntityId {
        match self {
            Self::Spawned { entity_id, .. }
            | Self::StateChanged { entity_id, .. }
            | Self::AttackTriggered { entity_id, .. }
            | Self::Damaged { entity_id, .. }
            | Self::Healed { entity_id, .. }
            | Self::Death { entity_id }
            | Self::PhaseChanged { entity_id, .. }
            | Self::Despawned { entity_id } => *entity_id,
            Self::Hit { target, .. } => *target,
            Self::SubAgentsSpawned { spawner, .. } => *spawner,
        }
    }
}

/// Bus capacity used by [`EventBus::default`].
pub const DEFAULT_BUS_CAPACITY: usize = 4096;

/// A body that queues combat events between bus flushes.
pub trait EventSource {
    /// Takes the queued events, oldest first.
    fn take_events(&mut self) -> Vec<CombatEvent>;
}

/// Bounded bus carrying combat events to the presentation layer.
///
/// Publishing never blocks. Events that do not fit are counted and dropped.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<CombatEvent>,
    receiver: Receiver<CombatEvent>,
    dropped: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            dropped: 0,
        }
    }

    /// Queues `event`, returning `false` if the bus was full.
    pub fn publish(&mut self, event: CombatEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                self.dropped += 1;
                debug!("Event bus full, dropped event about {}", e.into_inner().subject());
                false
            },
        }
    }

    /// Moves everything `source` has queued onto the bus, keeping order.
    /// Returns how many events fit.
    pub fn collect<S: EventSource + ?Sized>(&mut self, source: &mut S) -> usize {
        let mut delivered = 0;
        for event in source.take_events() {
            if self.publish(event) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Takes every undelivered event.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Undelivered events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Events lost to a full bus since creation.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// A listener handle for another thread. Listeners compete: each event
    /// reaches exactly one of them or [`drain`](Self::drain).
    #[must_use]
    pub fn subscribe(&self) -> Receiver<CombatEvent> {
        self.receiver.clone()
    }
}
