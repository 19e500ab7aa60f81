//! Active convoy tracking.
//!
//! This crate handles:
//! - The concurrent convoy registry with per-convoy atomic updates
//! - Live snapshot push to per-convoy observers
//! - Operator commands
//! - Completed mission records

#![warn(missing_docs)]

pub mod commands;
pub mod mission;
pub mod store;
pub mod types;

pub use commands::ConvoyCommand;
pub use mission::{CompletedMission, InMemoryMissionArchive, MissionArchive, MissionId};
pub use store::{ConvoyStore, DEFAULT_OBSERVER_BUFFER};
pub use types::{
    ActiveConvoy, ConvoyId, ConvoyPatch, ConvoyStatus, SensorState, DEFAULT_SPEED_KMPH,
};
