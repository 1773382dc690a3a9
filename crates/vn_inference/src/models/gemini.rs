use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use vn_core::{Error, Result};
use crate::{Config, GenerationParams};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL_NAME: &str = "gemini-1.5-flash";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationParams,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    endpoint: Url,
    generation: GenerationParams,
}

impl GeminiModel {
    pub fn new(config: Config) -> Result<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Configuration("Gemini API key is required".to_string()))?;
        let model_name = config
            .model_name
            .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());
        let base_url = config
            .model_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint = Url::parse(&format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model_name
        ))
        .map_err(|e| Error::Configuration(format!("Invalid model url '{}': {}", base_url, e)))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
            endpoint,
            generation: config.generation,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[async_trait]
impl vn_core::InferenceModel for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: &self.generation,
        };

        tracing::debug!("Calling {} at {}", self.model_name, self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini API unreachable: {}", e);
                Error::Upstream(format!("request failed: {}", e))
            })?;

        let status = response.status();
        tracing::info!("Gemini API response status: {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API error response: {}", body);
            return Err(Error::Upstream(format!("model API returned status {}", status)));
        }

        let envelope = response.json::<GenerateContentResponse>().await.map_err(|e| {
            tracing::error!("Malformed Gemini response envelope: {}", e);
            Error::Upstream(format!("malformed response envelope: {}", e))
        })?;

        let text = envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                tracing::error!("No candidates in Gemini response");
                Error::Upstream("no candidate text in model response".to_string())
            })?;

        tracing::debug!("Raw model response: {}", text.chars().take(200).collect::<String>());
        Ok(text)
    }
}
