//! Segment risk scoring.
//!
//! Two interchangeable strategies sit behind [`RiskScorer`]: a trained
//! classifier loaded from a model artifact, and a threat-count heuristic.
//! [`select_scorer`] picks one at startup and the choice holds for the life
//! of the process.

#![warn(missing_docs)]

pub mod classifier;
pub mod fallback;
pub mod features;
pub mod scorer;

pub use classifier::{ClassifierError, ClassifierScorer, RiskClassifier, SoftmaxModel};
pub use fallback::{FallbackScorer, BASE_RISK, RISK_PER_THREAT};
pub use features::{SegmentFeatures, ELEVATION_FEATURE, THREAT_COUNT_FEATURE};
pub use scorer::{RiskAssessment, RiskScorer};

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Choose the scoring strategy.
///
/// Loads the model artifact when a path is given. A missing or malformed
/// artifact is logged and the heuristic takes over.
pub fn select_scorer(model_path: Option<&Path>) -> Arc<dyn RiskScorer> {
    let Some(path) = model_path else {
        info!("No risk model configured, using fallback scorer");
        return Arc::new(FallbackScorer);
    };

    match SoftmaxModel::from_file(path) {
        Ok(model) => {
            info!(
                path = %path.display(),
                features = model.feature_names.len(),
                "Loaded risk classifier"
            );
            Arc::new(ClassifierScorer::new(model))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Risk model unavailable, using fallback scorer");
            Arc::new(FallbackScorer)
        }
    }
}
