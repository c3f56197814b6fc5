//! Plant recommendations derived from the latest reading
//!
//! The recommendation itself comes from an external language model; this
//! module builds the prompt, calls the service and decodes its answer into
//! ranked [`PlantSuggestion`]s.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use crate::sensor::SensorReading;

pub mod decode;
pub mod errors;
pub mod gemini;
pub mod prompt;

pub use errors::{AdvisorError, FailureKind};
pub use gemini::{GeminiClient, GeminiOptions};

/// One ranked plant suggestion
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlantSuggestion {
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub rank: u32,
    pub suggested_plant_name: String,
    pub key_environmental_needs: EnvironmentalNeeds,
    pub rationale_for_suitability: String,
}

/// Conditions a suggested plant prefers
///
/// Values are kept as the model produced them: usually text ("20-25°C"),
/// sometimes a number or a nested object. Keys the model adds beyond the
/// known ones are kept in `other`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalNeeds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_range: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_range: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<Value>,
    #[serde(rename = "soilPHRange", default, skip_serializing_if = "Option::is_none")]
    pub soil_ph_range: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<Value>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

// Models occasionally quote the rank ("1")
fn number_or_numeric_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Rank {
        Number(u32),
        Text(String),
    }

    match Rank::deserialize(deserializer)? {
        Rank::Number(rank) => Ok(rank),
        Rank::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("rank {:?} is not a number", text))),
    }
}

/// Maps a reading to ranked plant suggestions
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, reading: &SensorReading) -> Result<Vec<PlantSuggestion>, AdvisorError>;
}
