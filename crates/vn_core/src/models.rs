use async_trait::async_trait;
use std::fmt;
use crate::Result;

#[async_trait]
pub trait InferenceModel: Send + Sync + fmt::Debug {
    /// Human readable model name, used in logs
    fn name(&self) -> &str;

    /// Send a prompt and return the raw text of the first candidate answer
    async fn generate(&self, prompt: &str) -> Result<String>;
}
