//! Operator commands for a single convoy

use crate::types::{ActiveConvoy, ConvoyStatus};
use convoy_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Command issued against one convoy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvoyCommand {
    /// Stop in place
    Halt,
    /// Continue along the current path
    Resume,
    /// Finish the mission
    Complete,
}

impl ConvoyCommand {
    /// Command name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvoyCommand::Halt => "halt",
            ConvoyCommand::Resume => "resume",
            ConvoyCommand::Complete => "complete",
        }
    }

    /// Status a convoy ends in after this command
    pub fn target_status(&self) -> ConvoyStatus {
        match self {
            ConvoyCommand::Halt => ConvoyStatus::Halted,
            ConvoyCommand::Resume => ConvoyStatus::EnRoute,
            ConvoyCommand::Complete => ConvoyStatus::Completed,
        }
    }

    /// Apply to a convoy. Completed is terminal.
    pub fn apply(&self, convoy: &mut ActiveConvoy) -> Result<()> {
        if convoy.status == ConvoyStatus::Completed {
            return Err(Error::Validation(format!(
                "convoy {} is already completed, cannot {}",
                convoy.id,
                self.as_str()
            )));
        }
        convoy.status = self.target_status();
        Ok(())
    }
}

impl FromStr for ConvoyCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "halt" => Ok(ConvoyCommand::Halt),
            "resume" => Ok(ConvoyCommand::Resume),
            "complete" => Ok(ConvoyCommand::Complete),
            other => Err(Error::Validation(format!("unknown convoy command: {}", other))),
        }
    }
}

impl fmt::Display for ConvoyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
