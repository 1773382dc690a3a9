use serde::Serialize;
use std::fmt;

pub mod models;
pub mod prompt;
pub mod verdict;
pub mod verification;

/// Generation parameters sent with every model call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_k: 32,
            top_p: 1.0,
            max_output_tokens: 2048,
            response_mime_type: "application/json".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    /// Which client to build: `gemini` or `dummy`
    pub model: String,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub model_url: Option<String>,
    pub generation: GenerationParams,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("model_url", &self.model_url)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gemini".to_string(),
            api_key: None,
            model_name: None,
            model_url: None,
            generation: GenerationParams::default(),
        }
    }
}

pub mod prelude {
    pub use super::{Config, GenerationParams};
    pub use super::models::create_model;
    pub use super::verification::Verifier;
    pub use vn_core::{Error, Result, VerificationRecord, VerificationRequest};
}

pub use models::create_model;
pub use verification::Verifier;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_params_wire_names() {
        let value = serde_json::to_value(GenerationParams::default()).unwrap();
        assert_eq!(value["topK"], 32);
        assert_eq!(value["maxOutputTokens"], 2048);
        assert_eq!(value["responseMimeType"], "application/json");
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = Config {
            api_key: Some("secret-key".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }
}
