//! Cross-crate scenarios for the convoy routing engine
//!
//! This suite exercises:
//! - Route planning over a seeded road network
//! - Threat response from rescoring through alerting to reroute
//! - Fleet state under concurrent movement, commands and threat work
//! - The assembled service with its work queue

pub mod test_utils;

#[cfg(test)]
mod routing_scenarios;

#[cfg(test)]
mod threat_response_scenarios;

#[cfg(test)]
mod fleet_concurrency;

#[cfg(test)]
mod service_scenarios;
