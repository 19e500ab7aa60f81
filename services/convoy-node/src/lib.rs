//! Convoy routing service.
//!
//! Wires the road network, risk scoring, convoy store, and threat pipeline
//! into one role-gated facade, and drives convoy movement on a timer.

#![warn(missing_docs)]

pub mod auth;
pub mod control;
pub mod simulation;

pub use auth::{authorize, Operation, Role};
pub use control::{
    MissionControl, MissionRequest, ResetSummary, RouteRequest, SystemStatus, ThreatReceipt,
};
pub use simulation::{MovementSimulator, TickSummary};
