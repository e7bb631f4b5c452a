//! Live win probability for the side batting second in a T20 chase.
//!
//! A classifier supplies a raw probability from the scoreboard; the
//! [`engine::adjustments`] layer reshapes it with wicket, run-rate, venue,
//! overs and stage pressure before flooring and clipping.

pub mod api;
pub mod config;
pub mod engine;
pub mod models;
