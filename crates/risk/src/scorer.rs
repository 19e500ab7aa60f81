//! Risk scoring capability
//!
//! Every strategy maps features to class probabilities over
//! (Low, Medium, High) and shares one reduction to category + danger score.

use crate::features::SegmentFeatures;
use convoy_network::RiskCategory;
use serde::{Deserialize, Serialize};

/// Scorer output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Most probable class
    pub category: RiskCategory,
    /// 0.5 x P(Medium) + 1.0 x P(High), clamped to [0, 1]
    pub danger_score: f64,
}

impl RiskAssessment {
    /// Reduce class probabilities (Low, Medium, High) to an assessment.
    ///
    /// The first maximum wins when classes tie.
    pub fn from_probabilities(probabilities: [f64; 3]) -> Self {
        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate().skip(1) {
            if *p > probabilities[best] {
                best = i;
            }
        }

        let raw = 0.5 * probabilities[1] + probabilities[2];
        let danger_score = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };

        Self {
            category: RiskCategory::ALL[best],
            danger_score,
        }
    }
}

/// Features to (category, danger score)
pub trait RiskScorer: Send + Sync {
    /// Score one segment's features
    fn score(&self, features: &SegmentFeatures) -> RiskAssessment;

    /// Strategy name for logs and status reporting
    fn strategy(&self) -> &'static str;
}
