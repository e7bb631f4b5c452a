//! Probability calibration (Platt scaling) applied to classifier output.
//!
//! The model is `p_calibrated = logistic(a * log_odds(p_raw) + b)`.

use serde::{Deserialize, Serialize};

use super::classifier::logistic;

const EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattCalibration {
    pub a: f64,
    pub b: f64,
}

impl PlattCalibration {
    pub const IDENTITY: PlattCalibration = PlattCalibration { a: 1.0, b: 0.0 };

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite()
    }
}

/// Log-odds of `p`, with `p` kept away from 0 and 1 so the result stays finite.
pub fn log_odds(p: f64) -> f64 {
    let p = p.clamp(EPS, 1.0 - EPS);
    p.ln() - (-p).ln_1p()
}

pub fn apply_platt(raw_prob: f64, model: PlattCalibration) -> f64 {
    logistic(model.a * log_odds(raw_prob) + model.b).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_calibration_is_a_no_op() {
        for p in [0.05, 0.3, 0.5, 0.77, 0.95] {
            assert_relative_eq!(apply_platt(p, PlattCalibration::IDENTITY), p, epsilon = 1e-9);
        }
    }

    #[test]
    fn apply_platt_bounds_output() {
        let m = PlattCalibration { a: 1.2, b: -0.1 };
        let p = apply_platt(0.999_999, m);
        assert!((0.0..=1.0).contains(&p));
        let p = apply_platt(0.0, m);
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn shrinking_slope_pulls_toward_half() {
        // a < 1 tempers an overconfident model
        let m = PlattCalibration { a: 0.5, b: 0.0 };
        assert!(apply_platt(0.9, m) < 0.9);
        assert!(apply_platt(0.1, m) > 0.1);
        assert_relative_eq!(apply_platt(0.5, m), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn log_odds_stays_finite_at_the_edges() {
        assert_relative_eq!(log_odds(0.5), 0.0, epsilon = 1e-12);
        assert!(log_odds(0.0).is_finite());
        assert!(log_odds(1.0).is_finite());
        assert!(log_odds(0.9) > 0.0);
    }
}
