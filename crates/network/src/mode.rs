//! Routing modes
//!
//! A mode selects how heavily danger is weighed against raw distance.

use convoy_core::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Multiplier applied to any mode string the builder does not recognise
pub const DEFAULT_RISK_WEIGHT: f64 = 10.0;

/// Named routing preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Avoid danger at almost any distance cost
    Stealth,
    /// Prefer short routes, tolerate danger
    Speed,
    /// Middle ground
    Balance,
}

impl RoutingMode {
    /// Risk multiplier for edge weights
    pub fn risk_weight(self) -> f64 {
        match self {
            RoutingMode::Stealth => 20.0,
            RoutingMode::Speed => 5.0,
            RoutingMode::Balance => 10.0,
        }
    }

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingMode::Stealth => "stealth",
            RoutingMode::Speed => "speed",
            RoutingMode::Balance => "balance",
        }
    }
}

impl FromStr for RoutingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stealth" => Ok(RoutingMode::Stealth),
            "speed" => Ok(RoutingMode::Speed),
            "balance" => Ok(RoutingMode::Balance),
            other => Err(Error::Validation(format!(
                "unknown routing mode '{}', expected stealth, speed, or balance",
                other
            ))),
        }
    }
}

impl std::fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient lookup used by the graph builder: unrecognised modes weigh like balance.
pub fn risk_weight(mode: &str) -> f64 {
    mode.parse::<RoutingMode>()
        .map(RoutingMode::risk_weight)
        .unwrap_or(DEFAULT_RISK_WEIGHT)
}
