//! Classifier handle: the black box that turns a feature row into a raw
//! chase-win probability.
//!
//! The shipped implementation is a logistic model over standard-scaled numeric
//! features and one-hot categorical features, with optional Platt calibration.
//! Its parameters live in a JSON model file that is loaded once at startup and
//! shared read-only for the life of the process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::calibration::{apply_platt, PlattCalibration};
use crate::models::FeatureRow;

/// Logistic link from a linear score to a probability.
///
/// Branches on the sign so `exp` only ever sees a non-positive argument.
pub fn logistic(z: f64) -> f64 {
    let e = (-z.abs()).exp();
    if z >= 0.0 {
        1.0 / (1.0 + e)
    } else {
        e / (1.0 + e)
    }
}

/// Placeholder used for empty categorical values.
const UNKNOWN_CATEGORY: &str = "unknown";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model: {0}")]
    Invalid(String),
}

/// Anything that can produce a win probability for the chasing side.
pub trait WinClassifier: Send + Sync {
    /// Probability in [0, 1] that the batting side wins.
    fn predict_proba(&self, features: &FeatureRow) -> Result<f64, ModelError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFeature {
    RunsLeft,
    BallsLeft,
    WicketsLeft,
    Crr,
    Rrr,
    Target,
    OversCompleted,
}

impl NumericFeature {
    pub const ALL: [NumericFeature; 7] = [
        NumericFeature::RunsLeft,
        NumericFeature::BallsLeft,
        NumericFeature::WicketsLeft,
        NumericFeature::Crr,
        NumericFeature::Rrr,
        NumericFeature::Target,
        NumericFeature::OversCompleted,
    ];

    fn value(self, row: &FeatureRow) -> f64 {
        match self {
            NumericFeature::RunsLeft => row.runs_left,
            NumericFeature::BallsLeft => row.balls_left,
            NumericFeature::WicketsLeft => row.wickets_left,
            NumericFeature::Crr => row.crr,
            NumericFeature::Rrr => row.rrr,
            NumericFeature::Target => row.target,
            NumericFeature::OversCompleted => row.overs_completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalFeature {
    BattingTeam,
    BowlingTeam,
    Venue,
}

impl CategoricalFeature {
    fn value(self, row: &FeatureRow) -> &str {
        let raw = match self {
            CategoricalFeature::BattingTeam => &row.batting_team,
            CategoricalFeature::BowlingTeam => &row.bowling_team,
            CategoricalFeature::Venue => &row.venue,
        };
        // Levels match verbatim; only an empty value is imputed.
        if raw.is_empty() {
            UNKNOWN_CATEGORY
        } else {
            raw
        }
    }
}

/// Median imputation + standard scaling + weight for one numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericTerm {
    pub feature: NumericFeature,
    pub median: f64,
    pub mean: f64,
    pub scale: f64,
    pub weight: f64,
}

impl NumericTerm {
    fn contribution(&self, row: &FeatureRow) -> f64 {
        let raw = self.feature.value(row);
        let x = if raw.is_finite() { raw } else { self.median };
        // Zero-variance columns are left unscaled.
        let scale = if self.scale == 0.0 { 1.0 } else { self.scale };
        self.weight * (x - self.mean) / scale
    }
}

/// One-hot weights for one categorical column. Unseen levels contribute nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalTerm {
    pub feature: CategoricalFeature,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

impl CategoricalTerm {
    fn contribution(&self, row: &FeatureRow) -> f64 {
        self.weights
            .get(self.feature.value(row))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Logistic chase-win model read from a JSON model file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub intercept: f64,
    pub numeric: Vec<NumericTerm>,
    #[serde(default)]
    pub categorical: Vec<CategoricalTerm>,
    #[serde(default)]
    pub calibration: Option<PlattCalibration>,
}

impl LogisticModel {
    /// Load and validate a model file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let model: LogisticModel = serde_json::from_str(raw)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelError> {
        for feature in NumericFeature::ALL {
            let count = self.numeric.iter().filter(|t| t.feature == feature).count();
            if count != 1 {
                return Err(ModelError::Invalid(format!(
                    "numeric feature {:?} must appear exactly once, found {}",
                    feature, count
                )));
            }
        }
        if !self.intercept.is_finite() {
            return Err(ModelError::Invalid("intercept is not finite".into()));
        }
        for term in &self.numeric {
            let params = [term.median, term.mean, term.scale, term.weight];
            if params.iter().any(|p| !p.is_finite()) {
                return Err(ModelError::Invalid(format!(
                    "non-finite parameter for {:?}",
                    term.feature
                )));
            }
        }
        for term in &self.categorical {
            if let Some((level, _)) = term.weights.iter().find(|(_, w)| !w.is_finite()) {
                return Err(ModelError::Invalid(format!(
                    "non-finite weight for {:?}={}",
                    term.feature, level
                )));
            }
        }
        if let Some(cal) = &self.calibration {
            if !cal.is_finite() {
                return Err(ModelError::Invalid("calibration is not finite".into()));
            }
        }
        Ok(())
    }

    /// Linear score before the logistic link.
    pub fn decision_function(&self, row: &FeatureRow) -> f64 {
        let numeric: f64 = self.numeric.iter().map(|t| t.contribution(row)).sum();
        let categorical: f64 = self.categorical.iter().map(|t| t.contribution(row)).sum();
        self.intercept + numeric + categorical
    }
}

impl WinClassifier for LogisticModel {
    fn predict_proba(&self, features: &FeatureRow) -> Result<f64, ModelError> {
        let z = self.decision_function(features);
        let raw = logistic(z);
        let p = match self.calibration {
            Some(cal) => apply_platt(raw, cal),
            None => raw,
        };
        debug!("{}: z={:.4} raw={:.4} calibrated={:.4}", self.name, z, raw, p);
        if !p.is_finite() {
            return Err(ModelError::Invalid(format!(
                "non-finite probability for {:?}",
                features
            )));
        }
        Ok(p.clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
