//! Threat-count heuristic used when no trained classifier is available

use crate::features::SegmentFeatures;
use crate::scorer::{RiskAssessment, RiskScorer};

/// Baseline risk with no nearby threats
pub const BASE_RISK: f64 = 0.05;
/// Added risk per recent nearby threat
pub const RISK_PER_THREAT: f64 = 0.2;

/// Heuristic scorer
///
/// `base = 0.05 + 0.2 x nearby_threats`; class weights are
/// `(1 - base, 0.6 x base, 0.4 x base)` normalised to sum to one. Past
/// roughly five threats the Low weight goes negative; the weights are used
/// as-is and only the final danger score is clamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackScorer;

impl FallbackScorer {
    /// Class weights for a threat count
    pub fn probabilities(nearby_threats: u32) -> [f64; 3] {
        let base = BASE_RISK + RISK_PER_THREAT * f64::from(nearby_threats);
        let weights = [1.0 - base, 0.6 * base, 0.4 * base];
        let total: f64 = weights.iter().sum();
        weights.map(|w| w / total)
    }
}

impl RiskScorer for FallbackScorer {
    fn score(&self, features: &SegmentFeatures) -> RiskAssessment {
        RiskAssessment::from_probabilities(Self::probabilities(
            features.threats_within_2km_last_24h,
        ))
    }

    fn strategy(&self) -> &'static str {
        "fallback"
    }
}
