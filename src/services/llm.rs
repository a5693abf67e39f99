use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
}

/// Single-shot text generation. No streaming, no function calling, one
/// attempt per call.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Gemini-backed model client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new() -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        let model = std::env::var("GEMINI_MODEL_NAME")
            .unwrap_or_else(|_| "gemini-1.5-flash-latest".to_string());
        Ok(GeminiClient {
            client: reqwest::Client::new(),
            api_key,
            model,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": 0.2}
        });

        let response = self
            .client
            .post(self.request_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Response(format!("HTTP {}: {}", status, text)));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Response(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LlmError::Response("no content in model response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_embeds_model_and_key() {
        let client = GeminiClient {
            client: reqwest::Client::new(),
            api_key: "test-key".to_string(),
            model: "gemini-1.5-flash-latest".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        };
        let url = client.request_url();
        assert!(url.contains("gemini-1.5-flash-latest:generateContent"));
        assert!(url.contains("key=test-key"));
    }

    #[test]
    fn response_text_is_extracted_from_first_candidate() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text);
        assert_eq!(text.as_deref(), Some("hello"));
    }
}
