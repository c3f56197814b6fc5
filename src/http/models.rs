//! HTTP API response models

use serde::{Deserialize, Serialize};
use crate::advisor::PlantSuggestion;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// Successful recommendation response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AiResponse {
    pub status: String,
    /// Unix time in seconds
    pub timestamp: f64,
    pub ai_output: Vec<PlantSuggestion>,
}

/// Error body returned with status 500
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    /// "unavailable" or "bad_response"
    pub kind: String,
}
