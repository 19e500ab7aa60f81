//! Trained classifier strategy
//!
//! The classifier is consumed purely through its input/output contract:
//! an ordered list of feature names and a probability for each of
//! (Low, Medium, High). [`SoftmaxModel`] is the artifact format loaded at
//! startup; any other model can plug in through [`RiskClassifier`].

use crate::features::SegmentFeatures;
use crate::scorer::{RiskAssessment, RiskScorer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Classifier loading errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Artifact could not be read
    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact is not valid JSON for the model schema
    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    /// Weight matrix does not match the declared features
    #[error("Model shape mismatch: {0}")]
    Shape(String),
}

impl From<ClassifierError> for convoy_core::Error {
    fn from(err: ClassifierError) -> Self {
        convoy_core::Error::Config(err.to_string())
    }
}

/// Class-probability model
pub trait RiskClassifier: Send + Sync {
    /// Feature names in the order `predict_proba` expects them
    fn feature_names(&self) -> &[String];

    /// Probabilities for (Low, Medium, High)
    fn predict_proba(&self, features: &[f64]) -> [f64; 3];
}

/// Multinomial logistic regression artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxModel {
    /// Input feature order
    pub feature_names: Vec<String>,
    /// One weight row per class (Low, Medium, High)
    pub weights: [Vec<f64>; 3],
    /// Per-class intercept
    pub bias: [f64; 3],
}

impl SoftmaxModel {
    /// Load and shape-check a JSON artifact.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path)?;
        let model: SoftmaxModel = serde_json::from_str(&raw)?;
        model.validate()?;
        Ok(model)
    }

    /// Every weight row must cover every declared feature.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let width = self.feature_names.len();
        for (class, row) in self.weights.iter().enumerate() {
            if row.len() != width {
                return Err(ClassifierError::Shape(format!(
                    "class {} has {} weights for {} features",
                    class,
                    row.len(),
                    width
                )));
            }
        }
        Ok(())
    }
}

impl RiskClassifier for SoftmaxModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, features: &[f64]) -> [f64; 3] {
        let mut logits = [0.0; 3];
        for (class, row) in self.weights.iter().enumerate() {
            logits[class] = self.bias[class]
                + row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>();
        }

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp = logits.map(|l| (l - max).exp());
        let total: f64 = exp.iter().sum();
        exp.map(|e| e / total)
    }
}

/// Scorer backed by a trained classifier
pub struct ClassifierScorer<C> {
    classifier: C,
}

impl<C: RiskClassifier> ClassifierScorer<C> {
    /// Wrap a classifier
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }
}

impl<C: RiskClassifier> RiskScorer for ClassifierScorer<C> {
    fn score(&self, features: &SegmentFeatures) -> RiskAssessment {
        let vector = features.vector(self.classifier.feature_names());
        RiskAssessment::from_probabilities(self.classifier.predict_proba(&vector))
    }

    fn strategy(&self) -> &'static str {
        "classifier"
    }
}
