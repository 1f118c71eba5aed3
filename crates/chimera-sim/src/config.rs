//! Runner configuration.
//!
//! Describes one headless scenario: timing, seed, which bestiary to use,
//! the agent roster and the scripted player dummy. Loaded from TOML.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chimera_common::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "chimera.toml";

/// One agent placed at scenario start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Bestiary blueprint name
    pub blueprint: String,
    /// Spawn position
    pub position: Vec2,
}

impl RosterEntry {
    /// Entry for `blueprint` at `(x, y)`.
    pub fn new(blueprint: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            blueprint: blueprint.into(),
            position: Vec2::new(x, y),
        }
    }
}

/// The scripted player dummy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Maximum health
    pub max_health: f32,
    /// Invulnerability window after a hit, in seconds
    pub invulnerability: f32,
    /// Start position
    pub position: Vec2,
    /// Constant walking velocity
    pub intent: Vec2,
    /// Seconds between counter-strikes (0 = never strikes)
    pub strike_interval: f32,
    /// Counter-strike radius
    pub strike_radius: f32,
    /// Counter-strike damage
    pub strike_damage: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            invulnerability: 0.5,
            position: Vec2::ZERO,
            intent: Vec2::ZERO,
            strike_interval: 1.0,
            strike_radius: 1.5,
            strike_damage: 10.0,
        }
    }
}

/// Scenario configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing ===
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Simulated seconds to run
    pub duration: f32,
    /// RNG seed (None = random)
    pub seed: Option<u64>,

    // === Data ===
    /// RON bestiary file (None = builtin bestiary)
    pub bestiary_path: Option<PathBuf>,
    /// Where to write the final snapshot (None = no snapshot)
    pub snapshot_path: Option<PathBuf>,

    // === Diagnostics ===
    /// Tracing filter directive, overridden by `RUST_LOG`
    pub log_filter: String,

    // === Scenario ===
    /// Scripted player dummy
    pub player: PlayerConfig,
    /// Agents spawned at start
    pub roster: Vec<RosterEntry>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            duration: 20.0,
            seed: None,

            bestiary_path: None,
            snapshot_path: None,

            log_filter: "chimera=info".to_string(),

            player: PlayerConfig::default(),
            roster: vec![
                RosterEntry::new("grunt", -6.0, 0.0),
                RosterEntry::new("bat", 4.0, 3.0),
                RosterEntry::new("chimera", 10.0, 0.0),
            ],
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let mut contents = String::new();
        match fs::File::open(path).and_then(|mut file| file.read_to_string(&mut contents)) {
            Ok(_) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(10, 240);
        if !self.duration.is_finite() {
            self.duration = Self::default().duration;
        }
        self.duration = self.duration.clamp(0.1, 3600.0);

        let player = &mut self.player;
        player.max_health = player.max_health.max(1.0);
        player.invulnerability = player.invulnerability.clamp(0.0, 5.0);
        player.strike_interval = player.strike_interval.max(0.0);
        player.strike_radius = player.strike_radius.clamp(0.1, 20.0);
        player.strike_damage = player.strike_damage.max(0.0);

        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }
    }

    /// Fixed tick length in seconds.
    #[must_use]
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Number of ticks needed to cover `duration`.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (self.duration * self.tick_rate as f32).ceil().max(0.0) as u64
    }
}
