use std::sync::Arc;
use vn_core::{Error, InferenceModel, Result};
use crate::Config;

pub mod dummy;
pub mod gemini;

pub use dummy::DummyModel;
pub use gemini::GeminiModel;

/// Build the model client named by `config.model`.
pub fn create_model(config: Config) -> Result<Arc<dyn InferenceModel>> {
    match config.model.to_ascii_lowercase().as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Configuration(format!(
            "Unknown model '{}'. Available models: gemini, dummy",
            other
        ))),
    }
}
