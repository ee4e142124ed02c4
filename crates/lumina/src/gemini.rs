use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Minimal client for Gemini's `generateContent` with JSON responses.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// `None` when no API key is configured or exported.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .resolve_api_key()
            .map(|key| Self::new(key, config.model()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` constrained to `schema` and decode the JSON answer.
    pub fn generate_json<T: DeserializeOwned>(&self, prompt: &str, schema: Value) -> Result<T> {
        let url = format!("{API_BASE}/{}:generateContent?key={}", self.model, self.api_key);
        debug!(model = %self.model, "Calling Gemini");

        let response: Value = ureq::post(&url)
            .header("Content-Type", "application/json")
            .send_json(request_body(prompt, schema))
            .context("Failed to call Gemini API")?
            .body_mut()
            .read_json()
            .context("Failed to parse Gemini response")?;

        let text = response_text(&response)?;
        serde_json::from_str(text).context("Gemini returned malformed JSON")
    }
}

fn request_body(prompt: &str, schema: Value) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema
        }
    })
}

/// Text of the first candidate's first part.
fn response_text(response: &Value) -> Result<&str> {
    response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Empty response from Gemini"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = request_body("Find John 3:16", json!({ "type": "OBJECT" }));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Find John 3:16");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_response_text() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"context\":\"x\"}" }] }
            }]
        });
        assert_eq!(response_text(&response).unwrap(), "{\"context\":\"x\"}");

        assert!(response_text(&json!({ "candidates": [] })).is_err());
        let blank = json!({ "candidates": [{ "content": { "parts": [{ "text": " " }] } }] });
        assert!(response_text(&blank).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let client = GeminiClient::new("secret-key", "gemini-2.5-flash");
        let shown = format!("{client:?}");
        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("gemini-2.5-flash"));
    }
}
