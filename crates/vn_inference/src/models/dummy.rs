use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vn_core::Result;

const CANNED_RESPONSE: &str = r#"{
  "classification": "partial",
  "score": 50,
  "explanation": "Análise offline: nenhum modelo externo foi consultado.",
  "criteria": [
    {"name": "Clareza do conteúdo", "status": true},
    {"name": "Presença em fontes confiáveis", "status": false}
  ],
  "sources": []
}"#;

/// Offline model that answers every prompt with the same text.
pub struct DummyModel {
    response: String,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel")
            .field("calls", &self.calls())
            .finish()
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self::with_response(CANNED_RESPONSE)
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|prompt| prompt.clone())
    }
}

#[async_trait::async_trait]
impl vn_core::InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vn_core::InferenceModel;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();
        assert_eq!(model.calls(), 0);
        assert!(model.last_prompt().is_none());

        let answer = model.generate("Vacinas contêm microchips 5G").await.unwrap();
        assert!(answer.contains("\"classification\": \"partial\""));
        assert_eq!(model.calls(), 1);
        assert_eq!(model.last_prompt().as_deref(), Some("Vacinas contêm microchips 5G"));

        let model = DummyModel::with_response("texto livre");
        assert_eq!(model.generate("x").await.unwrap(), "texto livre");
    }
}
