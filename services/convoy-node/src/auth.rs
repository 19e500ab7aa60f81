//! Role gate for service operations
//!
//! Authentication happens upstream; callers arrive with a role or without
//! one. Every operation is checked before it does any work.

use convoy_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller role supplied by the authentication layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including convoy commands and reset
    Commander,
    /// Route planning, mission start, alerts, convoy status
    Operator,
    /// Threat intake and intelligence views
    Analyst,
}

impl Role {
    /// Role name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Commander => "commander",
            Role::Operator => "operator",
            Role::Analyst => "analyst",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "commander" => Ok(Role::Commander),
            "operator" => Ok(Role::Operator),
            "analyst" => Ok(Role::Analyst),
            other => Err(Error::Validation(format!("unknown role: {}", other))),
        }
    }
}

/// Gated service operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Plan a route
    ComputeRoute,
    /// Start a convoy on a planned route
    StartMission,
    /// Read or acknowledge alerts
    Alerts,
    /// Read convoy state or subscribe to it
    ConvoyStatus,
    /// Record a threat
    SubmitThreat,
    /// List threats
    ListThreats,
    /// Threat density view
    ThreatHeatmap,
    /// Start a randomized demo mission
    SimulateMission,
    /// Mission history
    Missions,
    /// Halt, resume, or complete a convoy
    CommandConvoy,
    /// Re-run a failed threat job
    RetryJob,
    /// Clear operational state
    Reset,
    /// Service health and counters
    SystemStatus,
}

impl Operation {
    /// Roles allowed to run the operation
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Role::*;
        match self {
            Operation::ComputeRoute
            | Operation::StartMission
            | Operation::Alerts
            | Operation::ConvoyStatus => &[Operator, Commander],
            Operation::SubmitThreat
            | Operation::ListThreats
            | Operation::ThreatHeatmap
            | Operation::SimulateMission
            | Operation::Missions => &[Analyst, Commander],
            Operation::CommandConvoy | Operation::RetryJob | Operation::Reset => &[Commander],
            Operation::SystemStatus => &[Commander, Operator, Analyst],
        }
    }

    /// Operation name for error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ComputeRoute => "compute route",
            Operation::StartMission => "start mission",
            Operation::Alerts => "manage alerts",
            Operation::ConvoyStatus => "read convoy status",
            Operation::SubmitThreat => "submit threat",
            Operation::ListThreats => "list threats",
            Operation::ThreatHeatmap => "view threat heatmap",
            Operation::SimulateMission => "simulate mission",
            Operation::Missions => "list missions",
            Operation::CommandConvoy => "command convoy",
            Operation::RetryJob => "retry threat job",
            Operation::Reset => "reset",
            Operation::SystemStatus => "read system status",
        }
    }
}

/// Check a caller before running `operation`.
pub fn authorize(role: Option<Role>, operation: Operation) -> Result<Role> {
    let role = role.ok_or(Error::Unauthorized)?;
    if operation.allowed_roles().contains(&role) {
        Ok(role)
    } else {
        Err(Error::Forbidden {
            role: role.to_string(),
            operation: operation.as_str().to_string(),
        })
    }
}
