//! # Chimera Gameplay
//!
//! Hostile-agent combat behavior for the Chimera simulation.
//!
//! This crate provides the whole behavior engine:
//! - Health pools and the damage contract
//! - The agent state machine with detection and target tracking
//! - Timed attack sequences and area damage resolution
//! - Movement variants (ground, circling flyer, dash flyer, rolling hazard)
//! - The multi-phase boss controller and sub-agent spawning
//! - Blueprint data (bestiary), the simulation arena and snapshots
//! - Event bus for presentation notifications

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod area;
pub mod attack;
pub mod bestiary;
pub mod boss;
pub mod circling;
pub mod dash;
pub mod error;
pub mod events;
pub mod ground;
pub mod health;
pub mod hostile;
pub mod physics;
pub mod rolling;
pub mod simulation;
pub mod snapshot;
pub mod spawn;
pub mod world;

mod e2e_tests;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::area::{resolve, AreaStrike, HitReport};
    pub use crate::attack::*;
    pub use crate::bestiary::*;
    pub use crate::boss::*;
    pub use crate::circling::{CirclingFlyer, CirclingTuning, FlightMode};
    pub use crate::dash::{DashFlyer, DashMode, DashTuning};
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::ground::{GroundMover, PatrolRoute};
    pub use crate::health::*;
    pub use crate::hostile::*;
    pub use crate::physics::*;
    pub use crate::rolling::RollingHazard;
    pub use crate::simulation::*;
    pub use crate::snapshot::*;
    pub use crate::spawn::*;
    pub use crate::world::*;
}

pub use prelude::*;
