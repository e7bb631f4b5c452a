//! Heuristic match-state adjustments on top of the classifier probability.
//!
//! The classifier sees the chase as a tabular row and tends to miss how sharply
//! a T20 chase swings on wickets in hand and on the last few overs. This module
//! reshapes its raw probability with five hand-tuned multipliers, a soft venue
//! blend and a wickets-in-hand floor.
//!
//! Pipeline (order matters for bit-for-bit reproducibility):
//! 1. `base × wicket × run-rate × overs × stage`
//! 2. venue blend: `adj + (1 − adj) × (venue − 1)`
//! 3. floor keyed by wickets left (raises only)
//! 4. clip to [0, 1]
//!
//! Every function here is pure and constant-time.

use serde::{Deserialize, Serialize};

use crate::models::MatchState;

// ── Wicket pressure ──────────────────────────────────────────────────────────
//
// Losing the top four barely dents a chase; from the fifth wicket onwards the
// tail is exposed and the curve drops steeply.

/// Multiplier per wickets lost, for 5..=9. Four or fewer is neutral.
const WICKET_PRESSURE: [(i32, f64); 5] = [(5, 0.88), (6, 0.74), (7, 0.55), (8, 0.34), (9, 0.18)];

/// Anything past the table (10+ lost).
const WICKET_PRESSURE_MIN: f64 = 0.10;

/// Damping multiplier for the number of wickets lost. Returns a value in (0, 1].
pub fn wicket_pressure(wickets_lost: i32) -> f64 {
    if wickets_lost <= 4 {
        return 1.0;
    }
    WICKET_PRESSURE
        .iter()
        .find(|(lost, _)| *lost == wickets_lost)
        .map(|(_, mult)| *mult)
        .unwrap_or(WICKET_PRESSURE_MIN)
}

// ── Run-rate pressure ────────────────────────────────────────────────────────
//
// Ahead of the rate: small bounded boost. Behind: discrete bands over the gap.

/// Largest boost granted for being ahead of the required rate.
const RUN_RATE_MAX_BOOST: f64 = 0.12;
/// Boost per run-per-over of cushion.
const RUN_RATE_BOOST_PER_RUN: f64 = 0.02;

/// Multiplier from the required vs current run rate. May exceed 1.0.
pub fn run_rate_pressure(required_run_rate: f64, current_run_rate: f64) -> f64 {
    if required_run_rate <= current_run_rate {
        let cushion = current_run_rate - required_run_rate;
        return 1.0 + RUN_RATE_MAX_BOOST.min(cushion * RUN_RATE_BOOST_PER_RUN);
    }

    let gap = required_run_rate - current_run_rate;
    if gap < 2.0 {
        0.95
    } else if gap < 4.0 {
        0.80
    } else if gap < 6.0 {
        0.65
    } else {
        0.55
    }
}

// ── Venue ────────────────────────────────────────────────────────────────────

/// Venue-name fragments and their chase offsets.
///
/// Order is significant: the first fragment found in the venue name wins, so a
/// name containing both "Wankhede" and "Eden" resolves to Wankhede.
pub const VENUE_OFFSETS: &[(&str, f64)] = &[
    ("Wankhede", 0.05),
    ("Eden", 0.02),
    ("Chinnaswamy", 0.03),
    ("Chepauk", -0.03),
    ("MA Chidambaram", -0.03),
    ("Dubai", 0.02),
    ("Sharjah", 0.03),
    ("Ahmedabad", 0.01),
];

/// Multiplier near 1.0 for the venue. Unknown or empty venues are neutral.
pub fn venue_modifier(venue: &str) -> f64 {
    let venue = venue.to_lowercase();
    let offset = VENUE_OFFSETS
        .iter()
        .find(|(fragment, _)| venue.contains(&fragment.to_lowercase()))
        .map(|(_, offset)| *offset)
        .unwrap_or(0.0);
    1.0 + offset
}

// ── Overs pressure ───────────────────────────────────────────────────────────

/// Late-innings / phase multiplier.
///
/// `overs_left` comes from the balls remaining while `overs_completed` is the
/// elapsed clock; the two are independent inputs and neither is derived from
/// the other here.
pub fn overs_pressure(balls_left: i32, runs_left: i32, overs_completed: f64) -> f64 {
    let overs_left = balls_left as f64 / 6.0;

    // Final over
    if overs_left <= 1.0 {
        return if runs_left > 10 {
            0.45
        } else if runs_left > 5 {
            0.65
        } else {
            0.85
        };
    }

    // Last three overs
    if overs_left <= 3.0 {
        return if runs_left > 20 {
            0.60
        } else if runs_left > 10 {
            0.75
        } else {
            0.90
        };
    }

    if overs_completed <= 6.0 {
        0.92
    } else if overs_completed <= 15.0 {
        0.98
    } else {
        0.95
    }
}

// ── Stage pressure ───────────────────────────────────────────────────────────

/// Phase-collapse multiplier: early wickets in the powerplay hurt the most.
pub fn stage_pressure(overs_completed: f64, wickets_lost: i32) -> f64 {
    if overs_completed <= 6.0 {
        return match wickets_lost {
            w if w >= 4 => 0.40,
            3 => 0.65,
            2 => 0.85,
            _ => 0.97,
        };
    }
    if overs_completed <= 15.0 {
        0.99
    } else {
        0.97
    }
}

// ── Floor ────────────────────────────────────────────────────────────────────

/// Lowest probability allowed for the wickets in hand, if any.
pub fn probability_floor(wickets_left: i32) -> Option<f64> {
    match wickets_left {
        w if w >= 6 => Some(0.25),
        w if w >= 4 => Some(0.20),
        3 => Some(0.15),
        2 => Some(0.10),
        1 => Some(0.05),
        _ => None,
    }
}

// ── Combinator ───────────────────────────────────────────────────────────────

/// The five multipliers computed for one match state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    pub wicket: f64,
    pub run_rate: f64,
    pub venue: f64,
    pub overs: f64,
    pub stage: f64,
}

impl Multipliers {
    pub fn for_state(state: &MatchState) -> Self {
        let wickets_lost = state.wickets_lost();
        Self {
            wicket: wicket_pressure(wickets_lost),
            run_rate: run_rate_pressure(state.required_run_rate, state.current_run_rate),
            venue: venue_modifier(&state.venue),
            overs: overs_pressure(state.balls_left, state.runs_left, state.overs_completed),
            stage: stage_pressure(state.overs_completed, wickets_lost),
        }
    }
}

/// Step-by-step record of one adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub base_probability: f64,
    pub multipliers: Multipliers,
    /// After the four multiplicative factors
    pub scaled: f64,
    /// After the venue blend
    pub venue_blended: f64,
    /// Floor for the wickets in hand, `None` with no wickets left
    pub floor: Option<f64>,
    /// Final clipped probability
    pub probability: f64,
}

/// Run the full adjustment pipeline and keep the intermediate values.
pub fn adjust(base_probability: f64, state: &MatchState) -> Adjustment {
    let m = Multipliers::for_state(state);

    let mut adj = base_probability;
    adj *= m.wicket;
    adj *= m.run_rate;
    adj *= m.overs;
    adj *= m.stage;
    let scaled = adj;

    // Soft additive venue effect: pulls toward 1 for batting-friendly grounds.
    adj += (1.0 - adj) * (m.venue - 1.0);
    let venue_blended = adj;

    let floor = probability_floor(state.wickets_left);
    if let Some(floor) = floor {
        adj = adj.max(floor);
    }

    Adjustment {
        base_probability,
        multipliers: m,
        scaled,
        venue_blended,
        floor,
        probability: adj.clamp(0.0, 1.0),
    }
}

/// Adjusted win probability for the chasing side, in [0, 1].
pub fn combine(base_probability: f64, state: &MatchState) -> f64 {
    adjust(base_probability, state).probability
}

// ── Tests ────────────────────────────────────────────────────────────────────
