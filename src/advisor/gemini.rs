//! Google Gemini `generateContent` client

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use crate::advisor::errors::AdvisorError;
use crate::advisor::{decode, prompt, PlantSuggestion, Recommender};
use crate::sensor::SensorReading;

#[derive(Clone, Debug)]
pub struct GeminiOptions {
    /// API base, e.g. https://generativelanguage.googleapis.com/v1beta
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Upper bound for the whole request, connect to last byte
    pub timeout: Duration,
    pub max_output_tokens: u32,
    pub temperature: f64,
    /// Larger bodies are rejected as bad responses
    pub max_response_bytes: u64,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

/// Recommender backed by a Gemini model.
///
/// One attempt per request; `ureq` is blocking, so the call runs on the
/// blocking pool.
pub struct GeminiClient {
    opts: Arc<GeminiOptions>,
}

impl GeminiClient {
    pub fn new(opts: GeminiOptions) -> Self {
        Self { opts: Arc::new(opts) }
    }

    /// `generateContent` request body for a reading
    pub fn request_body(&self, reading: &SensorReading) -> serde_json::Value {
        json!({
            "systemInstruction": {
                "parts": [{ "text": prompt::SYSTEM_PROMPT }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt::user_prompt(reading) }]
            }],
            "generationConfig": {
                "temperature": self.opts.temperature,
                "maxOutputTokens": self.opts.max_output_tokens,
                "responseMimeType": "application/json"
            }
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.opts.endpoint.trim_end_matches('/'),
            self.opts.model
        )
    }
}

#[async_trait]
impl Recommender for GeminiClient {
    async fn recommend(&self, reading: &SensorReading) -> Result<Vec<PlantSuggestion>, AdvisorError> {
        let api_key = match self.opts.api_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(AdvisorError::MissingApiKey),
        };

        let url = self.url();
        let body = serde_json::to_string(&self.request_body(reading))
            .map_err(|e| AdvisorError::Unavailable(format!("failed to encode request: {}", e)))?;
        let opts = self.opts.clone();

        tracing::debug!("Requesting recommendation from {}", url);
        let call = tokio::task::spawn_blocking(move || post(&url, &api_key, &body, &opts));
        let text = match tokio::time::timeout(self.opts.timeout, call).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(AdvisorError::Unavailable(format!("request task failed: {}", e))),
            Err(_) => return Err(AdvisorError::Timeout(self.opts.timeout)),
        };

        let suggestions = decode::decode(&text)?;
        tracing::info!("Received {} plant suggestions", suggestions.len());
        Ok(suggestions)
    }
}

fn post(url: &str, api_key: &str, body: &str, opts: &GeminiOptions) -> Result<String, AdvisorError> {
    let result = ureq::post(url)
        .timeout(opts.timeout)
        .set("Content-Type", "application/json")
        .set("x-goog-api-key", api_key)
        .send_string(body);

    match result {
        Ok(response) => {
            let body = read_body(response, opts.max_response_bytes)?;
            candidate_text(&body)
        }
        Err(ureq::Error::Status(status, response)) => {
            let body = read_body(response, opts.max_response_bytes).unwrap_or_default();
            Err(AdvisorError::Upstream {
                status,
                message: error_message(&body),
            })
        }
        Err(ureq::Error::Transport(e)) => Err(AdvisorError::Unavailable(e.to_string())),
    }
}

fn read_body(response: ureq::Response, limit: u64) -> Result<String, AdvisorError> {
    let mut buf = Vec::new();
    response
        .into_reader()
        .take(limit.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|e| AdvisorError::Unavailable(format!("failed to read response: {}", e)))?;
    if buf.len() as u64 > limit {
        return Err(AdvisorError::BadResponse(format!("response exceeds {} bytes", limit)));
    }
    String::from_utf8(buf).map_err(|_| AdvisorError::BadResponse("response is not UTF-8".to_string()))
}

/// Text of the first candidate in a `generateContent` response
pub(crate) fn candidate_text(body: &str) -> Result<String, AdvisorError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AdvisorError::BadResponse(format!("unexpected response envelope: {}", e)))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "none given".to_string());
        return Err(AdvisorError::BadResponse(format!("no candidates (block reason: {})", reason)));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(AdvisorError::BadResponse(format!("empty candidate (finish reason: {})", reason)));
    }
    Ok(text)
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "no details".to_string(),
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::errors::FailureKind;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    fn options() -> GeminiOptions {
        GeminiOptions {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            model: "gemini-2.5-pro".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_output_tokens: 500,
            temperature: 0.3,
            max_response_bytes: 1024 * 1024,
        }
    }

    #[test]
    fn test_url() {
        let client = GeminiClient::new(options());
        assert_eq!(
            client.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_request_body() {
        let client = GeminiClient::new(options());
        let body = client.request_body(&SensorReading::default());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("agronomist"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new(options());
        let err = client.recommend(&SensorReading::default()).await.unwrap_err();
        assert!(matches!(err, AdvisorError::MissingApiKey));
    }

    #[test]
    fn test_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"[1,"},{"text":"2]"}],"role":"model"},"finishReason":"STOP"}]}"#;
        assert_eq!(candidate_text(body).unwrap(), "[1,2]");
    }

    #[test]
    fn test_candidate_text_blocked() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = candidate_text(body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let body = r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        let err = candidate_text(body).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));

        assert!(candidate_text("not json").is_err());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid");
        assert_eq!(error_message(""), "no details");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    /// Helper: one-shot HTTP server answering the first request after `delay`
    fn serve_once(status: &'static str, body: String, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind stub server");
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else { return };
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            // consume the request so the client is not reset mid-send
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }
            let mut request_body = vec![0u8; content_length];
            let _ = reader.read_exact(&mut request_body);

            std::thread::sleep(delay);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        });
        format!("http://{}", addr)
    }

    fn stub_client(endpoint: String, timeout: Duration, max_response_bytes: u64) -> GeminiClient {
        GeminiClient::new(GeminiOptions {
            endpoint,
            api_key: Some("test-key".to_string()),
            timeout,
            max_response_bytes,
            ..options()
        })
    }

    fn envelope(text: &str) -> String {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    const SUGGESTION_TEXT: &str = r#"[{"rank":1,"suggestedPlantName":"Tomato","keyEnvironmentalNeeds":{"soilPHRange":"6.0-6.8"},"rationaleForSuitability":"Warm and loamy."}]"#;

    #[tokio::test]
    async fn test_recommend_success() {
        let endpoint = serve_once("200 OK", envelope(SUGGESTION_TEXT), Duration::ZERO);
        let client = stub_client(endpoint, Duration::from_secs(5), 1024 * 1024);

        let suggestions = client.recommend(&SensorReading::default()).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].suggested_plant_name, "Tomato");
    }

    #[tokio::test]
    async fn test_recommend_timeout() {
        let endpoint = serve_once("200 OK", envelope(SUGGESTION_TEXT), Duration::from_secs(3));
        let client = stub_client(endpoint, Duration::from_millis(300), 1024 * 1024);

        let started = std::time::Instant::now();
        let err = client.recommend(&SensorReading::default()).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
        // whichever fires first: our bound or the client's own timeout
        assert!(
            matches!(err, AdvisorError::Timeout(_) | AdvisorError::Unavailable(_)),
            "unexpected error: {}",
            err
        );
        assert_eq!(err.kind(), FailureKind::Unavailable);
    }

    #[tokio::test]
    async fn test_recommend_body_over_cap() {
        let endpoint = serve_once("200 OK", "x".repeat(5000), Duration::ZERO);
        let client = stub_client(endpoint, Duration::from_secs(5), 1000);

        let err = client.recommend(&SensorReading::default()).await.unwrap_err();
        assert!(matches!(err, AdvisorError::BadResponse(_)), "unexpected error: {}", err);
        assert!(err.to_string().contains("exceeds 1000 bytes"));
    }

    #[tokio::test]
    async fn test_recommend_upstream_error() {
        let body = r#"{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}}"#.to_string();
        let endpoint = serve_once("503 Service Unavailable", body, Duration::ZERO);
        let client = stub_client(endpoint, Duration::from_secs(5), 1024 * 1024);

        let err = client.recommend(&SensorReading::default()).await.unwrap_err();
        match &err {
            AdvisorError::Upstream { status, message } => {
                assert_eq!(*status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(err.kind(), FailureKind::Unavailable);
    }

    #[tokio::test]
    async fn test_recommend_invalid_model_text() {
        let endpoint = serve_once("200 OK", envelope("Tomatoes, probably."), Duration::ZERO);
        let client = stub_client(endpoint, Duration::from_secs(5), 1024 * 1024);

        let err = client.recommend(&SensorReading::default()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::BadResponse);
    }

    #[test]
    fn test_read_body_unbounded_limit() {
        let response = ureq::Response::new(200, "OK", "hello").unwrap();
        assert_eq!(read_body(response, u64::MAX).unwrap(), "hello");

        let response = ureq::Response::new(200, "OK", "hello").unwrap();
        assert!(matches!(read_body(response, 4), Err(AdvisorError::BadResponse(_))));

        let response = ureq::Response::new(200, "OK", "hello").unwrap();
        assert_eq!(read_body(response, 5).unwrap(), "hello");
    }
}
