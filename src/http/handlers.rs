//! HTTP request handlers

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
};
use crate::advisor::Recommender;
use crate::sensor::{ReadingCache, SensorReading};
use super::models::{AiResponse, ErrorResponse, STATUS_ERROR, STATUS_SUCCESS};

const INDEX_HTML: &str = "<h1>Agrosense Sensor API is Running</h1>\
<p>Access the data at <a href='/api/v1/sensors'>/api/v1/sensors</a></p>\
<p>Plant suggestions at <a href='/api/v1/ai_response'>/api/v1/ai_response</a></p>\
<p>Check the console for serial reading status.</p>";

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    cache: ReadingCache,
    recommender: Arc<dyn Recommender>,
}

impl AppState {
    pub fn new(cache: ReadingCache, recommender: Arc<dyn Recommender>) -> Self {
        Self { cache, recommender }
    }
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint, with the age of the cached reading
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let updated_at = state
        .cache
        .updated_at()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64());
    Json(serde_json::json!({
        "status": "ok",
        "service": "agrosense",
        "updated_at": updated_at,
        "update_count": state.cache.update_count()
    }))
}

/// Latest reading, as stored
pub async fn sensors(State(state): State<AppState>) -> Json<SensorReading> {
    Json(state.cache.snapshot())
}

/// Plant suggestions for the latest reading
pub async fn ai_response(
    State(state): State<AppState>,
) -> Result<Json<AiResponse>, (StatusCode, Json<ErrorResponse>)> {
    let reading = state.cache.snapshot();

    match state.recommender.recommend(&reading).await {
        Ok(suggestions) => {
            tracing::debug!("AI RESPONSE: {:?}", suggestions);
            Ok(Json(AiResponse {
                status: STATUS_SUCCESS.to_string(),
                timestamp: unix_timestamp(),
                ai_output: suggestions,
            }))
        }
        Err(e) => {
            tracing::error!("Error while calling recommendation service: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: STATUS_ERROR.to_string(),
                    message: e.to_string(),
                    kind: e.kind().as_str().to_string(),
                }),
            ))
        }
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
