//! HTTP surface: one recommendation endpoint plus a liveness route.
//!
//! Geocoding failures are the only fatal path; weather degrades to a sentinel
//! and generator failures are communicated in-band through the fallback
//! itinerary, so a well-formed request always gets a 200 with itinerary JSON.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::error::RecommendError;
use crate::generator::ItineraryGenerator;
use crate::itinerary::Itinerary;
use crate::providers::{VworldGeocoder, WeatherService};

#[derive(Clone)]
pub struct AppState {
    pub geocoder: Arc<VworldGeocoder>,
    pub weather: Arc<WeatherService>,
    pub generator: Arc<ItineraryGenerator>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub location: String,
    pub date: String,
    pub time: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/recommend", post(recommend))
        .route("/health", get(health))
        .with_state(state)
}

async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Itinerary>, RecommendError> {
    let (lat, lon) = state.geocoder.geocode(&request.location).await?;

    let yyyymmdd = request.date.replace('-', "");
    let report = state.weather.report(lat, lon, &yyyymmdd, &request.time).await;
    let weather_text = report.weather_text();

    info!(
        target: "daytrip::http",
        location = %request.location,
        weather = %weather_text,
        "generating recommendation"
    );

    let itinerary = state
        .generator
        .generate(
            &request.location,
            &request.date,
            &request.time,
            Some(&weather_text),
        )
        .await;

    Ok(Json(itinerary))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            RecommendError::NotFound(_) => StatusCode::NOT_FOUND,
            RecommendError::Upstream(_) | RecommendError::Timeout(_) => StatusCode::BAD_GATEWAY,
            RecommendError::Config(_)
            | RecommendError::Parse(_)
            | RecommendError::Validation(_)
            | RecommendError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.to_error_payload())).into_response()
    }
}
