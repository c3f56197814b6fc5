//! Decoding of the model's text output
//!
//! Asked for "a JSON array", models answer with either the array itself or a
//! JSON string whose content is the array, sometimes inside a Markdown fence.

use serde::Deserialize;
use crate::advisor::errors::AdvisorError;
use crate::advisor::PlantSuggestion;

/// Expected number of suggestions; other counts are accepted with a warning
const EXPECTED_SUGGESTIONS: std::ops::RangeInclusive<usize> = 3..=5;

/// Shapes the model text may take, tried in declaration order
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ModelOutput {
    Suggestions(Vec<PlantSuggestion>),
    Wrapped(String),
}

/// Decode model text into suggestions sorted by rank
pub fn decode(text: &str) -> Result<Vec<PlantSuggestion>, AdvisorError> {
    let mut suggestions = match parse(text)? {
        ModelOutput::Suggestions(suggestions) => suggestions,
        ModelOutput::Wrapped(inner) => match parse(&inner)? {
            ModelOutput::Suggestions(suggestions) => suggestions,
            ModelOutput::Wrapped(_) => {
                return Err(AdvisorError::BadResponse("string does not contain a suggestion array".to_string()));
            }
        },
    };

    if suggestions.is_empty() {
        return Err(AdvisorError::BadResponse("no suggestions returned".to_string()));
    }
    if !EXPECTED_SUGGESTIONS.contains(&suggestions.len()) {
        tracing::warn!("Model returned {} suggestions, expected 3 to 5", suggestions.len());
    }

    suggestions.sort_by_key(|s| s.rank);
    Ok(suggestions)
}

fn parse(text: &str) -> Result<ModelOutput, AdvisorError> {
    let text = strip_wrapping(text);
    serde_json::from_str(text).map_err(|_| {
        // untagged errors only say "no variant matched"; report why the array failed
        let cause = match serde_json::from_str::<Vec<PlantSuggestion>>(text) {
            Err(e) => e.to_string(),
            Ok(_) => "unrecognized shape".to_string(),
        };
        AdvisorError::BadResponse(format!("model output is not a suggestion array: {}", cause))
    })
}

/// Remove Markdown code fences and stray `/` padding around the payload
pub(crate) fn strip_wrapping(text: &str) -> &str {
    let mut text = text.trim().trim_matches('/').trim();
    if let Some(fenced) = text.strip_prefix("```") {
        // drop the info string (```json)
        let body = fenced.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        text = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }
    text
}
