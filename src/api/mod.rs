use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::engine::adjustments::{adjust, Adjustment, VENUE_OFFSETS};
use crate::engine::{PredictError, Predictor};
use crate::models::{MatchInput, MatchState, Prediction};

#[derive(Clone)]
pub struct AppState {
    pub predictor: Predictor,
}

/// Build the Axum router for the prediction API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/venues", get(venues_handler))
        .route("/api/predict", post(predict_handler))
        .route("/api/adjust", post(adjust_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VenueOffset {
    pub fragment: String,
    pub offset: f64,
}

/// Body for `/api/adjust`: a caller-supplied base probability plus chase state.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustRequest {
    pub base_probability: f64,
    pub state: MatchState,
}

/// GET /api/health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(Health {
        status: "ok".into(),
        model: state.predictor.model_name().to_string(),
    })
}

/// GET /api/venues – the venue table in match order
async fn venues_handler() -> impl IntoResponse {
    let venues: Vec<VenueOffset> = VENUE_OFFSETS
        .iter()
        .map(|(fragment, offset)| VenueOffset {
            fragment: fragment.to_string(),
            offset: *offset,
        })
        .collect();
    Json(venues)
}

/// POST /api/predict
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<MatchInput>,
) -> Result<Json<Prediction>, (StatusCode, String)> {
    state.predictor.predict(&input).map(Json).map_err(|e| match e {
        PredictError::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        PredictError::Model(_) => {
            error!("Prediction failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    })
}

/// POST /api/adjust – run only the heuristic layer on an external probability
async fn adjust_handler(
    Json(req): Json<AdjustRequest>,
) -> Result<Json<Adjustment>, (StatusCode, String)> {
    if !(0.0..=1.0).contains(&req.base_probability) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "base_probability must be within [0, 1], got {}",
                req.base_probability
            ),
        ));
    }
    Ok(Json(adjust(req.base_probability, &req.state)))
}
