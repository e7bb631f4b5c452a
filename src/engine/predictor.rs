use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::adjustments::{adjust, Adjustment};
use super::classifier::{ModelError, WinClassifier};
use crate::models::{
    FeatureRow, MatchInput, MatchState, Outcome, Prediction, INNINGS_BALLS, INNINGS_OVERS,
    TOTAL_WICKETS,
};

/// Lower bound on overs used as the CRR denominator.
const MIN_OVERS_FOR_CRR: f64 = 0.1;
/// Lower bound on balls used as the RRR denominator.
const MIN_BALLS_FOR_RRR: i32 = 1;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid match input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Derive the chase state from the raw scoreboard.
///
/// Callers must have run [`validate_input`] first.
pub fn derive_state(input: &MatchInput) -> MatchState {
    let runs_left = input.target - input.current_score;
    let balls_elapsed = (input.overs_completed * 6.0) as i32;
    let balls_left = (INNINGS_BALLS - balls_elapsed).max(0);
    let wickets_left = TOTAL_WICKETS - input.wickets_out;

    let crr = input.current_score as f64 / input.overs_completed.max(MIN_OVERS_FOR_CRR);
    let rrr = runs_left as f64 * 6.0 / balls_left.max(MIN_BALLS_FOR_RRR) as f64;

    MatchState {
        runs_left,
        balls_left,
        wickets_left,
        current_run_rate: crr,
        required_run_rate: rrr,
        overs_completed: input.overs_completed,
        venue: input.venue.clone(),
    }
}

/// Reject scoreboards the engine cannot make sense of.
pub fn validate_input(input: &MatchInput) -> Result<(), PredictError> {
    if !(0..=TOTAL_WICKETS).contains(&input.wickets_out) {
        return Err(PredictError::InvalidInput(format!(
            "wickets_out must be between 0 and {}, got {}",
            TOTAL_WICKETS, input.wickets_out
        )));
    }
    if !input.overs_completed.is_finite() || !(0.0..=INNINGS_OVERS).contains(&input.overs_completed)
    {
        return Err(PredictError::InvalidInput(format!(
            "overs_completed must be between 0 and {}, got {}",
            INNINGS_OVERS, input.overs_completed
        )));
    }
    if input.current_score < 0 {
        return Err(PredictError::InvalidInput(format!(
            "current_score must be non-negative, got {}",
            input.current_score
        )));
    }
    if input.target < 1 {
        return Err(PredictError::InvalidInput(format!(
            "target must be at least 1, got {}",
            input.target
        )));
    }
    Ok(())
}

/// Outcomes that are settled by the scoreboard alone, checked in order.
pub fn hard_rule(state: &MatchState) -> Option<Outcome> {
    if state.runs_left <= 0 {
        Some(Outcome::ChaseComplete)
    } else if state.wickets_left <= 0 {
        Some(Outcome::AllOut)
    } else if state.balls_left <= 0 {
        Some(Outcome::OversExhausted)
    } else {
        None
    }
}

/// Chase-win predictor: scoreboard → features → classifier → adjustments.
#[derive(Clone)]
pub struct Predictor {
    classifier: Arc<dyn WinClassifier>,
}

impl Predictor {
    pub fn new(classifier: Arc<dyn WinClassifier>) -> Self {
        Self { classifier }
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn predict(&self, input: &MatchInput) -> Result<Prediction, PredictError> {
        validate_input(input)?;
        let state = derive_state(input);

        if let Some(outcome) = hard_rule(&state) {
            let p = if outcome == Outcome::ChaseComplete { 1.0 } else { 0.0 };
            debug!(
                "{} v {}: decided by scoreboard ({:?})",
                input.batting_team, input.bowling_team, outcome
            );
            return Ok(self.finish(input, &state, p, outcome, None, None));
        }

        let features = FeatureRow {
            batting_team: input.batting_team.clone(),
            bowling_team: input.bowling_team.clone(),
            venue: input.venue.clone(),
            runs_left: state.runs_left as f64,
            balls_left: state.balls_left as f64,
            wickets_left: state.wickets_left as f64,
            crr: state.current_run_rate,
            rrr: state.required_run_rate,
            target: input.target as f64,
            overs_completed: input.overs_completed,
        };
        let base = self.classifier.predict_proba(&features)?;
        let adjustment = adjust(base, &state);

        info!(
            "{} chasing {} v {}: {} needed off {} with {} wickets, base {:.3} → {:.3}",
            input.batting_team,
            input.target,
            input.bowling_team,
            state.runs_left,
            state.balls_left,
            state.wickets_left,
            base,
            adjustment.probability
        );

        Ok(self.finish(
            input,
            &state,
            adjustment.probability,
            Outcome::Modelled,
            Some(base),
            Some(adjustment),
        ))
    }

    fn finish(
        &self,
        input: &MatchInput,
        state: &MatchState,
        probability: f64,
        outcome: Outcome,
        base_probability: Option<f64>,
        adjustment: Option<Adjustment>,
    ) -> Prediction {
        Prediction {
            batting_team: input.batting_team.clone(),
            bowling_team: input.bowling_team.clone(),
            batting_team_win_prob: probability * 100.0,
            bowling_team_win_prob: (1.0 - probability) * 100.0,
            crr: state.current_run_rate,
            rrr: state.required_run_rate,
            outcome,
            base_probability,
            adjustment,
            predicted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed probability and counts how often it was asked.
    struct FixedClassifier {
        p: f64,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(p: f64) -> Arc<Self> {
            Arc::new(Self {
                p,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl WinClassifier for FixedClassifier {
        fn predict_proba(&self, _features: &FeatureRow) -> Result<f64, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.p)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingClassifier;

    impl WinClassifier for FailingClassifier {
        fn predict_proba(&self, _features: &FeatureRow) -> Result<f64, ModelError> {
            Err(ModelError::Invalid("boom".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn make_input(target: i32, score: i32, overs: f64, wickets_out: i32) -> MatchInput {
        MatchInput {
            batting_team: "Royal Challengers Bangalore".into(),
            bowling_team: "Kolkata Knight Riders".into(),
            venue: "Generic Ground".into(),
            target,
            current_score: score,
            overs_completed: overs,
            wickets_out,
        }
    }

    #[test]
    fn derive_state_mid_innings() {
        let state = derive_state(&make_input(160, 100, 12.0, 3));
        assert_eq!(state.runs_left, 60);
        assert_eq!(state.balls_left, 48);
        assert_eq!(state.wickets_left, 7);
        assert_relative_eq!(state.current_run_rate, 100.0 / 12.0, epsilon = 1e-12);
        assert_relative_eq!(state.required_run_rate, 7.5, epsilon = 1e-12);
        assert_eq!(state.wickets_lost(), 3);
    }

    #[test]
    fn derive_state_truncates_partial_balls() {
        // 12.5 overs as a decimal = 75 balls elapsed
        let state = derive_state(&make_input(160, 100, 12.5, 3));
        assert_eq!(state.balls_left, 45);
        // 0.15 × 6 = 0.9 → 0 balls elapsed
        let state = derive_state(&make_input(160, 0, 0.15, 0));
        assert_eq!(state.balls_left, 120);
    }

    #[test]
    fn derive_state_floors_denominators() {
        let state = derive_state(&make_input(160, 4, 0.0, 0));
        assert_relative_eq!(state.current_run_rate, 40.0, epsilon = 1e-12);

        let state = derive_state(&make_input(160, 150, 20.0, 5));
        assert_eq!(state.balls_left, 0);
        assert_relative_eq!(state.required_run_rate, 60.0, epsilon = 1e-12);
    }

    #[test]
    fn derive_state_handles_huge_target() {
        let input = make_input(400_000_000, 0, 10.0, 2);
        assert!(validate_input(&input).is_ok());
        let state = derive_state(&input);
        assert_eq!(state.runs_left, 400_000_000);
        assert_relative_eq!(state.required_run_rate, 40_000_000.0, epsilon = 1e-6);

        let predictor = Predictor::new(FixedClassifier::new(0.5));
        let p = predictor.predict(&input).unwrap();
        assert_eq!(p.outcome, Outcome::Modelled);
        let adj = p.adjustment.expect("adjustment present");
        assert_eq!(adj.multipliers.run_rate, 0.55);
    }

    #[test]
    fn chase_complete_short_circuits() {
        let clf = FixedClassifier::new(0.2);
        let predictor = Predictor::new(clf.clone());
        let p = predictor.predict(&make_input(160, 165, 18.0, 0)).unwrap();
        assert_eq!(p.outcome, Outcome::ChaseComplete);
        assert_eq!(p.batting_team_win_prob, 100.0);
        assert_eq!(p.bowling_team_win_prob, 0.0);
        assert!(p.base_probability.is_none());
        assert_eq!(clf.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn chase_complete_beats_all_out() {
        // Winning runs off the last ball with the last wicket also falling
        let predictor = Predictor::new(FixedClassifier::new(0.2));
        let p = predictor.predict(&make_input(160, 160, 20.0, 10)).unwrap();
        assert_eq!(p.outcome, Outcome::ChaseComplete);
    }

    #[test]
    fn all_out_short_circuits() {
        let clf = FixedClassifier::new(0.9);
        let predictor = Predictor::new(clf.clone());
        let p = predictor.predict(&make_input(160, 120, 17.0, 10)).unwrap();
        assert_eq!(p.outcome, Outcome::AllOut);
        assert_eq!(p.batting_team_win_prob, 0.0);
        assert_eq!(p.bowling_team_win_prob, 100.0);
        assert_eq!(clf.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn overs_exhausted_short_circuits() {
        let predictor = Predictor::new(FixedClassifier::new(0.9));
        let p = predictor.predict(&make_input(160, 150, 20.0, 4)).unwrap();
        assert_eq!(p.outcome, Outcome::OversExhausted);
        assert!(p.outcome.is_decided());
        assert_eq!(p.batting_team_win_prob, 0.0);
    }

    #[test]
    fn modelled_prediction_runs_adjustments() {
        // 80 needed off 60 at CRR 8 with all wickets in hand
        let clf = FixedClassifier::new(0.5);
        let predictor = Predictor::new(clf.clone());
        let p = predictor.predict(&make_input(161, 81, 10.0, 0)).unwrap();
        assert_eq!(clf.calls.load(Ordering::SeqCst), 1);
        assert_eq!(p.outcome, Outcome::Modelled);
        assert_eq!(p.base_probability, Some(0.5));
        let adj = p.adjustment.expect("adjustment present");
        // rrr 8.0 just under crr 8.1, mid-innings overs and stage
        assert_relative_eq!(adj.multipliers.overs, 0.98, epsilon = 1e-12);
        assert_relative_eq!(adj.multipliers.stage, 0.99, epsilon = 1e-12);
        assert_relative_eq!(
            p.batting_team_win_prob + p.bowling_team_win_prob,
            100.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(p.batting_team_win_prob, adj.probability * 100.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let predictor = Predictor::new(FixedClassifier::new(0.5));
        for input in [
            make_input(160, 100, 12.0, 11),
            make_input(160, 100, 12.0, -1),
            make_input(160, 100, 21.0, 3),
            make_input(160, 100, f64::NAN, 3),
            make_input(160, -5, 12.0, 3),
            make_input(0, 0, 0.0, 0),
        ] {
            assert!(
                matches!(predictor.predict(&input), Err(PredictError::InvalidInput(_))),
                "{:?}",
                input
            );
        }
    }

    #[test]
    fn classifier_failure_is_propagated() {
        let predictor = Predictor::new(Arc::new(FailingClassifier));
        let err = predictor.predict(&make_input(160, 100, 12.0, 3)).unwrap_err();
        assert!(matches!(err, PredictError::Model(_)));
        assert_eq!(predictor.model_name(), "failing");
    }
}
