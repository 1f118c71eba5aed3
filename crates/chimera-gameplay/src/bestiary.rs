//! Agent blueprints and the bestiary that instantiates them.
//!
//! A bestiary is a RON document listing named [`AgentBlueprint`]s. The
//! simulation builds every agent, sub-agents included, through the bestiary's
//! [`AgentFactory`] implementation.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chimera_common::{EntityId, SchemaVersion, Vec2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{AgentCore, AgentStats, ContactProfile};
use crate::attack::{AttackDescriptor, Knockback};
use crate::boss::{BossConfig, BossController};
use crate::circling::{CirclingFlyer, CirclingTuning};
use crate::dash::{DashFlyer, DashTuning};
use crate::error::{CombatError, CombatResult};
use crate::ground::{GroundMover, PatrolRoute};
use crate::hostile::{Agent, Behavior};
use crate::rolling::RollingHazard;
use crate::spawn::AgentFactory;

/// Patrol route as written in data; positions are relative to the spawn point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RouteSpec {
    /// Turn at walls
    Bounce,
    /// Stay within `radius` of the spawn x
    Radius {
        /// Half-width of the patrol band
        radius: f32,
    },
    /// Cycle through points offset from the spawn point
    Waypoints {
        /// Offsets from the spawn point
        points: Vec<Vec2>,
    },
}

impl RouteSpec {
    fn resolve(&self, spawn: Vec2) -> PatrolRoute {
        match self {
            Self::Bounce => PatrolRoute::Bounce,
            Self::Radius { radius } => PatrolRoute::Radius {
                start_x: spawn.x,
                radius: *radius,
            },
            Self::Waypoints { points } => PatrolRoute::Waypoints {
                points: points.iter().map(|p| spawn + *p).collect(),
                index: 0,
            },
        }
    }
}

/// Movement variant and its tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlueprintKind {
    /// Ground patrol and chase
    Ground {
        /// Patrol route
        route: RouteSpec,
        /// Patrol speed
        patrol_speed: f32,
        /// Forward wall check length
        wall_check: f32,
    },
    /// Aerial circling and diving
    Circling(CirclingTuning),
    /// Aerial rise and dash
    Dash(DashTuning),
    /// Dormant rolling hazard
    Rolling {
        /// Distance that wakes the hazard
        activation_distance: f32,
        /// Rolling speed
        roll_speed: f32,
        /// Forward wall check length
        wall_check: f32,
    },
    /// Multi-phase boss
    Boss(BossConfig),
}

impl BlueprintKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Ground { .. } => "ground",
            Self::Circling(_) => "circling",
            Self::Dash(_) => "dash",
            Self::Rolling { .. } => "rolling",
            Self::Boss(_) => "boss",
        }
    }
}

fn default_true() -> bool {
    true
}

/// Everything needed to build one kind of agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBlueprint {
    /// Unique name
    pub name: String,
    /// Shared stats
    #[serde(default)]
    pub stats: AgentStats,
    /// Whether the agent gets a health pool
    #[serde(default = "default_true")]
    pub has_health: bool,
    /// Movement variant
    pub kind: BlueprintKind,
    /// The agent's own attack
    #[serde(default)]
    pub attack: Option<AttackDescriptor>,
    /// Contact damage
    #[serde(default)]
    pub contact: Option<ContactProfile>,
}

impl AgentBlueprint {
    /// Creates the agent `id` at `position`.
    #[must_use]
    pub fn instantiate(&self, id: EntityId, position: Vec2) -> Agent {
        let mut core = AgentCore::new(id, self.name.clone(), position, self.stats.clone());
        if !self.has_health {
            core = core.without_health();
        }
        let behavior = match &self.kind {
            BlueprintKind::Ground {
                route,
                patrol_speed,
                wall_check,
            } => Behavior::Ground(
                GroundMover::new(route.resolve(position))
                    .with_patrol_speed(*patrol_speed)
                    .with_wall_check(*wall_check),
            ),
            BlueprintKind::Circling(tuning) => {
                Behavior::Circling(CirclingFlyer::new(tuning.clone()))
            }
            BlueprintKind::Dash(tuning) => Behavior::Dash(DashFlyer::new(tuning.clone())),
            BlueprintKind::Rolling {
                activation_distance,
                roll_speed,
                wall_check,
            } => Behavior::Rolling(
                RollingHazard::new(*activation_distance, *roll_speed).with_wall_check(*wall_check),
            ),
            BlueprintKind::Boss(config) => Behavior::Boss(BossController::new(config.clone())),
        };
        let mut agent = Agent::new(core, behavior);
        if let Some(attack) = &self.attack {
            agent = agent.with_attack(attack.clone());
        }
        if let Some(contact) = self.contact {
            agent = agent.with_contact(contact);
        }
        agent
    }

    fn invalid(&self, reason: impl Into<String>) -> CombatError {
        CombatError::InvalidBlueprint {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Checks the blueprint on its own. Cross-references are checked by
    /// [`Bestiary::validate`].
    pub fn validate(&self) -> CombatResult<()> {
        let stats = &self.stats;
        if self.name.is_empty() {
            return Err(self.invalid("empty name"));
        }
        if stats.max_health <= 0.0 {
            return Err(self.invalid("max_health must be positive"));
        }
        let non_negative = [
            ("walk_speed", stats.walk_speed),
            ("chase_speed", stats.chase_speed),
            ("detect_radius", stats.detect_radius),
            ("attack_range", stats.attack_range),
            ("attack_cooldown", stats.attack_cooldown),
            ("invulnerability", stats.invulnerability),
            ("lose_target_time", stats.lose_target_time),
            ("corpse_linger", stats.corpse_linger),
        ];
        if let Some((field, value)) = non_negative.iter().find(|(_, v)| *v < 0.0 || v.is_nan()) {
            return Err(self.invalid(format!("{field} is {value}")));
        }

        match &self.kind {
            BlueprintKind::Ground {
                route: RouteSpec::Waypoints { points },
                ..
            } if points.is_empty() => return Err(self.invalid("waypoint route without points")),
            BlueprintKind::Boss(config) => {
                if !self.has_health {
                    return Err(self.invalid("boss phases need a health pool"));
                }
                config.validate().map_err(|e| self.invalid(e.to_string()))?;
            }
            _ => {}
        }

        if let Some(attack) = &self.attack {
            if attack.windup < 0.0 || attack.active < 0.0 || attack.recovery < 0.0 {
                return Err(self.invalid("negative attack timing"));
            }
        }
        if let Some(contact) = &self.contact {
            if contact.radius <= 0.0 {
                return Err(self.invalid("contact radius must be positive"));
            }
        }
        Ok(())
    }

    /// Blueprints this one can spawn.
    fn spawned_blueprints(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attack
            .iter()
            .filter_map(|a| a.spawn.as_ref())
            .map(|s| s.blueprint.as_str())
            .collect();
        if let BlueprintKind::Boss(config) = &self.kind {
            names.extend(
                config
                    .attacks
                    .iter()
                    .filter_map(|a| a.spawn.as_ref())
                    .map(|s| s.blueprint.as_str()),
            );
        }
        names
    }
}

// ============================================================================
// Bestiary
// ============================================================================

fn bestiary_version() -> SchemaVersion {
    SchemaVersion::BESTIARY
}

/// Named blueprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bestiary {
    /// Data version
    #[serde(default = "bestiary_version")]
    pub version: SchemaVersion,
    /// Blueprints
    pub blueprints: Vec<AgentBlueprint>,
}

impl Default for Bestiary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Bestiary {
    /// Creates a bestiary from blueprints.
    #[must_use]
    pub fn new(blueprints: Vec<AgentBlueprint>) -> Self {
        Self {
            version: SchemaVersion::BESTIARY,
            blueprints,
        }
    }

    /// Reference roster.
    #[must_use]
    pub fn builtin() -> Self {
        let melee = AttackDescriptor::melee_strike(20.0, 0.5, 1.4, 1.8);
        let body_slam = ContactProfile {
            damage: 20.0,
            radius: 0.6,
            knockback: Some(Knockback::split(8.0, 4.0)),
        };

        Self::new(vec![
            AgentBlueprint {
                name: "grunt".into(),
                stats: AgentStats::default(),
                has_health: true,
                kind: BlueprintKind::Ground {
                    route: RouteSpec::Bounce,
                    patrol_speed: 2.0,
                    wall_check: 0.2,
                },
                attack: Some(melee.clone()),
                contact: Some(body_slam),
            },
            AgentBlueprint {
                name: "stalker".into(),
                stats: AgentStats::default(),
                has_health: true,
                kind: BlueprintKind::Ground {
                    route: RouteSpec::Radius { radius: 5.0 },
                    patrol_speed: 2.0,
                    wall_check: 0.3,
                },
                attack: Some(melee.clone()),
                contact: None,
            },
            AgentBlueprint {
                name: "warden".into(),
                stats: AgentStats {
                    line_of_sight: true,
                    ..AgentStats::default()
                },
                has_health: true,
                kind: BlueprintKind::Ground {
                    route: RouteSpec::Waypoints {
                        points: vec![Vec2::new(-4.0, 0.0), Vec2::new(4.0, 0.0)],
                    },
                    patrol_speed: 2.0,
                    wall_check: 0.2,
                },
                attack: Some(melee),
                contact: None,
            },
            AgentBlueprint {
                name: "bat".into(),
                stats: AgentStats {
                    max_health: 40.0,
                    ..AgentStats::default()
                },
                has_health: true,
                kind: BlueprintKind::Circling(CirclingTuning::default()),
                attack: Some(AttackDescriptor::dive(20.0)),
                contact: None,
            },
            AgentBlueprint {
                name: "drone".into(),
                stats: AgentStats {
                    max_health: 30.0,
                    detect_radius: 10.0,
                    ..AgentStats::default()
                },
                has_health: true,
                kind: BlueprintKind::Dash(DashTuning::default()),
                attack: Some(AttackDescriptor::dash(10.0, 0.8)),
                contact: None,
            },
            AgentBlueprint {
                name: "barrel".into(),
                stats: AgentStats::default(),
                has_health: false,
                kind: BlueprintKind::Rolling {
                    activation_distance: 4.0,
                    roll_speed: 5.0,
                    wall_check: 0.3,
                },
                attack: None,
                contact: Some(body_slam),
            },
            AgentBlueprint {
                name: "chimera".into(),
                stats: AgentStats {
                    max_health: 200.0,
                    detect_radius: 20.0,
                    attack_range: 2.5,
                    ..AgentStats::default()
                },
                has_health: true,
                kind: BlueprintKind::Boss(BossConfig::default()),
                attack: None,
                contact: Some(ContactProfile {
                    damage: 20.0,
                    radius: 1.2,
                    knockback: Some(Knockback::radial(5.0)),
                }),
            },
        ])
    }

    /// Parses and validates a RON document.
    pub fn from_ron_str(source: &str) -> CombatResult<Self> {
        let bestiary: Self = ron::from_str(source).map_err(|e| CombatError::Parse(e.to_string()))?;
        SchemaVersion::BESTIARY.ensure_can_read(bestiary.version)?;
        bestiary.validate()?;
        Ok(bestiary)
    }

    /// Loads a bestiary file.
    pub fn load<P: AsRef<Path>>(path: P) -> CombatResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let bestiary = Self::from_ron_str(&source)?;
        info!("Loaded {} blueprints from {:?}", bestiary.blueprints.len(), path);
        Ok(bestiary)
    }

    /// Writes the bestiary as pretty RON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CombatResult<()> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CombatError::Parse(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Checks every blueprint, name uniqueness and spawn references.
    pub fn validate(&self) -> CombatResult<()> {
        let mut seen = HashSet::new();
        for blueprint in &self.blueprints {
            blueprint.validate()?;
            if !seen.insert(blueprint.name.as_str()) {
                return Err(blueprint.invalid("duplicate name"));
            }
        }
        for blueprint in &self.blueprints {
            let spawned = blueprint.spawned_blueprints();
            if let Some(missing) = spawned.into_iter().find(|n| !seen.contains(n)) {
                return Err(blueprint.invalid(format!("spawns unknown blueprint {missing}")));
            }
        }
        Ok(())
    }

    /// Blueprint by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AgentBlueprint> {
        self.blueprints.iter().find(|b| b.name == name)
    }

    /// Blueprint names, in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blueprints.iter().map(|b| b.name.as_str())
    }

    /// Short listing of blueprint names and kinds.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        self.blueprints
            .iter()
            .map(|b| format!("{} ({})", b.name, b.kind.label()))
            .collect()
    }
}

impl AgentFactory for Bestiary {
    fn build(&self, blueprint: &str, id: EntityId, position: Vec2) -> CombatResult<Agent> {
        self.get(blueprint)
            .map(|b| b.instantiate(id, position))
            .ok_or_else(|| CombatError::UnknownBlueprint(blueprint.to_string()))
    }
}
