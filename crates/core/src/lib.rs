//! Core functionality for the convoy routing service.
//!
//! This crate provides the error taxonomy, geographic primitives,
//! configuration, and logging setup shared by every other crate.

pub mod config;
pub mod error;
pub mod geo;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
pub use geo::{distance_to_polyline_m, distance_to_segment_m, haversine_m, Coordinate};
