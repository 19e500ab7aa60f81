//! Configuration management for the convoy routing service.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub routing: RoutingConfig,
    pub threat: ThreatConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    pub simulation: SimulationConfig,
    pub fleet: FleetConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub node_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub default_mode: String,
    pub fuel_liters_per_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatConfig {
    pub impact_radius_m: f64,
    pub high_threshold: f64,
    pub critical_threshold: f64,
    /// Mode used when rebuilding the graph for a reroute
    pub reroute_mode: String,
    pub feature_radius_m: f64,
    pub feature_window_hours: i64,
    pub workers: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Trained classifier artifact; fallback scoring when absent
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub base_tick_secs: u64,
    pub time_scale: f64,
    pub default_speed_kmph: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub observer_buffer: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON file of segment records loaded at startup
    pub segments_path: Option<PathBuf>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_mode: "balance".to_string(),
            fuel_liters_per_km: 0.2,
        }
    }
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            impact_radius_m: 15_000.0,
            high_threshold: 0.75,
            critical_threshold: 0.90,
            reroute_mode: "balance".to_string(),
            feature_radius_m: 2_000.0,
            feature_window_hours: 24,
            workers: 4,
            queue_capacity: 256,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_tick_secs: 10,
            time_scale: 1.0,
            default_speed_kmph: 60,
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self { observer_buffer: 64 }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            service: ServiceConfig {
                node_id: "convoy-node-001".to_string(),
            },
            logging: LoggingConfig::default(),
            routing: RoutingConfig::default(),
            threat: ThreatConfig::default(),
            risk: RiskConfig::default(),
            simulation: SimulationConfig::default(),
            fleet: FleetConfig::default(),
            network: NetworkConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.threat;
        let unit = |name: &str, v: f64| {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::Config(format!("{} must be within [0, 1], got {}", name, v)))
            }
        };
        unit("threat.high_threshold", t.high_threshold)?;
        unit("threat.critical_threshold", t.critical_threshold)?;

        if t.critical_threshold < t.high_threshold {
            return Err(Error::Config(
                "threat.critical_threshold must not be below threat.high_threshold".into(),
            ));
        }
        if !(t.impact_radius_m.is_finite() && t.impact_radius_m > 0.0) {
            return Err(Error::Config("threat.impact_radius_m must be positive".into()));
        }
        if !(t.feature_radius_m.is_finite() && t.feature_radius_m > 0.0) {
            return Err(Error::Config("threat.feature_radius_m must be positive".into()));
        }
        if t.workers == 0 || t.queue_capacity == 0 {
            return Err(Error::Config(
                "threat.workers and threat.queue_capacity must be non-zero".into(),
            ));
        }
        if !(self.routing.fuel_liters_per_km.is_finite() && self.routing.fuel_liters_per_km >= 0.0)
        {
            return Err(Error::Config("routing.fuel_liters_per_km must be >= 0".into()));
        }
        let sim = &self.simulation;
        if !(sim.time_scale.is_finite() && sim.time_scale > 0.0) || sim.base_tick_secs == 0 {
            return Err(Error::Config(
                "simulation.time_scale and simulation.base_tick_secs must be positive".into(),
            ));
        }
        if self.fleet.observer_buffer == 0 {
            return Err(Error::Config("fleet.observer_buffer must be non-zero".into()));
        }
        Ok(())
    }
}
