use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::adjustments::Adjustment;

/// Balls in a full T20 innings.
pub const INNINGS_BALLS: i32 = 120;
/// Overs in a full T20 innings.
pub const INNINGS_OVERS: f64 = 20.0;
/// Wickets available to the batting side.
pub const TOTAL_WICKETS: i32 = 10;

/// Raw second-innings state as entered by a user or upstream feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInput {
    pub batting_team: String,
    pub bowling_team: String,
    pub venue: String,
    /// First-innings score + 1
    pub target: i32,
    pub current_score: i32,
    /// Overs bowled so far, e.g. 12.0 or 12.5 (decimal overs, not balls)
    pub overs_completed: f64,
    pub wickets_out: i32,
}

/// Derived chase state consumed by the adjustment engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    /// Runs still needed; zero or negative once the chase is complete
    pub runs_left: i32,
    pub balls_left: i32,
    pub wickets_left: i32,
    pub current_run_rate: f64,
    pub required_run_rate: f64,
    pub overs_completed: f64,
    pub venue: String,
}

impl MatchState {
    pub fn wickets_lost(&self) -> i32 {
        TOTAL_WICKETS - self.wickets_left
    }
}

/// Feature row handed to the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub batting_team: String,
    pub bowling_team: String,
    pub venue: String,
    pub runs_left: f64,
    pub balls_left: f64,
    pub wickets_left: f64,
    pub crr: f64,
    pub rrr: f64,
    pub target: f64,
    pub overs_completed: f64,
}

/// How the final probability was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Target already reached
    ChaseComplete,
    /// No wickets remaining
    AllOut,
    /// No balls remaining
    OversExhausted,
    /// Classifier + heuristic adjustments
    Modelled,
}

impl Outcome {
    pub fn is_decided(self) -> bool {
        self != Outcome::Modelled
    }
}

/// Final prediction returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub batting_team: String,
    pub bowling_team: String,
    /// Batting side win probability in percent (0–100)
    pub batting_team_win_prob: f64,
    /// Bowling side win probability in percent (0–100)
    pub bowling_team_win_prob: f64,
    pub crr: f64,
    pub rrr: f64,
    pub outcome: Outcome,
    /// Raw classifier output, present only when the model was consulted
    pub base_probability: Option<f64>,
    pub adjustment: Option<Adjustment>,
    pub predicted_at: DateTime<Utc>,
}
