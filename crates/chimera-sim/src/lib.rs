//! # Chimera Sim
//!
//! Headless runner for the Chimera combat simulation: loads a TOML scenario,
//! drives the simulation at a fixed tick rate against a scripted player
//! dummy and summarizes what happened on the event bus.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod scenario;


pub use config::{PlayerConfig, RosterEntry, SimConfig, CONFIG_FILE};
pub use scenario::{RunSummary, Scenario};
