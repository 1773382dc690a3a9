use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use vn_core::{
    Error, ImageAttachment, ImageStorage, InferenceModel, NewVerification, Result,
    VerificationRecord, VerificationRequest, VerificationStorage,
};
use crate::prompt::{build_prompt, TRUSTED_SOURCES};
use crate::verdict::parse_verdict;

/// Object name for an uploaded image, derived from the upload time.
pub fn image_object_name(image: &ImageAttachment, now: DateTime<Utc>) -> String {
    format!("verification_{}.{}", now.timestamp_millis(), image.extension())
}

/// Runs one claim through the model and stores the resulting verdict.
///
/// Holds no per-request state, so a single instance serves concurrent calls.
pub struct Verifier {
    model: Arc<dyn InferenceModel>,
    records: Arc<dyn VerificationStorage>,
    images: Arc<dyn ImageStorage>,
    trusted_sources: &'static [&'static str],
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("model", &self.model.name())
            .field("records", &"<dyn VerificationStorage>")
            .field("images", &"<dyn ImageStorage>")
            .field("trusted_sources", &self.trusted_sources.len())
            .finish()
    }
}

impl Verifier {
    pub fn new(
        model: Arc<dyn InferenceModel>,
        records: Arc<dyn VerificationStorage>,
        images: Arc<dyn ImageStorage>,
    ) -> Self {
        Self {
            model,
            records,
            images,
            trusted_sources: TRUSTED_SOURCES,
        }
    }

    pub fn with_trusted_sources(mut self, trusted_sources: &'static [&'static str]) -> Self {
        self.trusted_sources = trusted_sources;
        self
    }

    pub async fn verify(&self, request: &VerificationRequest) -> Result<VerificationRecord> {
        if request.is_empty() {
            tracing::warn!("No content, URL, or image provided");
            return Err(Error::MissingInput);
        }

        tracing::info!(
            has_content = request.content().is_some(),
            has_url = request.url().is_some(),
            has_image = request.image().is_some(),
            "🔎 Starting news verification"
        );

        let prompt = build_prompt(request, self.trusted_sources);
        let answer = self.model.generate(&prompt).await.map_err(|e| match e {
            Error::Upstream(_) | Error::Configuration(_) => e,
            other => Error::Upstream(other.to_string()),
        })?;
        let verdict = parse_verdict(&answer);
        tracing::debug!("Parsed verdict: {} ({})", verdict.classification, verdict.score);

        let image_url = match request.image() {
            Some(image) => self.store_image(image).await,
            None => None,
        };

        let verification = NewVerification::from_verdict(request, verdict, image_url);
        let record = self
            .records
            .insert_verification(&verification)
            .await
            .map_err(|e| {
                tracing::error!("Database error: {}", e);
                match e {
                    Error::Persistence(_) => e,
                    other => Error::Persistence(other.to_string()),
                }
            })?;

        tracing::info!("✨ Verification saved successfully: {}", record.id);
        Ok(record.with_normalized_sources())
    }

    async fn store_image(&self, image: &ImageAttachment) -> Option<String> {
        let name = image_object_name(image, Utc::now());
        if let Err(e) = self.images.upload_image(&name, image).await {
            tracing::warn!("⚠️ Failed to upload image {}: {}", name, e);
            return None;
        }
        match self.images.public_url(&name).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("⚠️ Failed to resolve public url for {}: {}", name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use vn_core::{Classification, UNKNOWN_SOURCE_URL};
    use vn_storage::MemoryStorage;

    #[derive(Debug)]
    struct UnreachableModel;

    #[async_trait]
    impl InferenceModel for UnreachableModel {
        fn name(&self) -> &str {
            "Unreachable"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(Error::Upstream("connection refused".to_string()))
        }
    }

    struct BrokenStorage;

    #[async_trait]
    impl VerificationStorage for BrokenStorage {
        async fn insert_verification(&self, _verification: &NewVerification) -> Result<VerificationRecord> {
            Err(Error::Storage("relation does not exist".to_string()))
        }
    }

    #[async_trait]
    impl ImageStorage for BrokenStorage {
        async fn upload_image(&self, _name: &str, _image: &ImageAttachment) -> Result<()> {
            Err(Error::Storage("bucket not found".to_string()))
        }

        async fn public_url(&self, _name: &str) -> Result<String> {
            Err(Error::Storage("bucket not found".to_string()))
        }
    }

    fn verifier_with(model: Arc<dyn InferenceModel>, storage: Arc<MemoryStorage>) -> Verifier {
        Verifier::new(model, storage.clone(), storage)
    }

    fn png() -> ImageAttachment {
        ImageAttachment::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png")
    }

    #[test]
    fn test_image_object_name() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(image_object_name(&png(), now), "verification_1700000000123.png");
        let jpeg = ImageAttachment::new(vec![1], "image/jpeg");
        assert_eq!(image_object_name(&jpeg, now), "verification_1700000000123.jpg");
    }

    #[tokio::test]
    async fn test_missing_input_makes_no_calls() {
        let model = Arc::new(DummyModel::new());
        let storage = Arc::new(MemoryStorage::new());
        let verifier = verifier_with(model.clone(), storage.clone());

        let request = VerificationRequest::new().with_content("   ").with_url("");
        let err = verifier.verify(&request).await.unwrap_err();

        assert!(matches!(err, Error::MissingInput));
        assert_eq!(model.calls(), 0);
        assert!(storage.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_content_claim_is_stored() {
        let model = Arc::new(DummyModel::with_response(
            r#"```json
{"classification": "false", "score": 5, "explanation": "Vacinas não contêm microchips.",
 "criteria": [{"name": "Consistência com dados oficiais", "status": false}],
 "sources": [{"name": "Reuters", "url": "https://reuters.com", "verified": true}, {"name": "Blog", "url": ""}]}
```"#,
        ));
        let storage = Arc::new(MemoryStorage::new());
        let verifier = verifier_with(model.clone(), storage.clone());

        let request = VerificationRequest::new().with_content("Vacinas contêm microchips 5G");
        let record = verifier.verify(&request).await.unwrap();

        assert_eq!(record.classification, Classification::False);
        assert!(record.score <= 100);
        assert!(!record.explanation.is_empty());
        assert!(!record.criteria.is_empty());
        assert_eq!(record.content.as_deref(), Some("Vacinas contêm microchips 5G"));
        assert_eq!(record.sources[0].url, "https://reuters.com");
        assert_eq!(record.sources[1].url, UNKNOWN_SOURCE_URL);
        assert!(record.image_url.is_none());
        assert_eq!(storage.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_prose_answer_uses_fallback_verdict() {
        let model = Arc::new(DummyModel::with_response("Não consigo responder em JSON."));
        let verifier = verifier_with(model, Arc::new(MemoryStorage::new()));

        let record = verifier
            .verify(&VerificationRequest::new().with_content("asdkjh qwe"))
            .await
            .unwrap();

        assert_eq!(record.classification, Classification::Partial);
        assert_eq!(record.score, 50);
        assert_eq!(record.criteria.len(), 1);
        assert!(!record.criteria[0].status);
        assert!(record.sources.is_empty());
    }

    #[tokio::test]
    async fn test_url_only_claim_reaches_the_model() {
        let model = Arc::new(DummyModel::new());
        let verifier = verifier_with(model.clone(), Arc::new(MemoryStorage::new()));

        let request = VerificationRequest::new()
            .with_content("")
            .with_url("https://g1.globo.com/algumanoticia");
        let record = verifier.verify(&request).await.unwrap();

        assert_eq!(model.calls(), 1);
        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("URL: https://g1.globo.com/algumanoticia"));
        assert!(record.content.is_none());
        assert_eq!(record.url.as_deref(), Some("https://g1.globo.com/algumanoticia"));
    }

    #[tokio::test]
    async fn test_image_is_uploaded() {
        let storage = Arc::new(MemoryStorage::new());
        let verifier = verifier_with(Arc::new(DummyModel::new()), storage.clone());

        let record = verifier
            .verify(&VerificationRequest::new().with_image(png()))
            .await
            .unwrap();

        let image_url = record.image_url.unwrap();
        assert!(image_url.starts_with("memory://verification-images/verification_"));
        assert!(image_url.ends_with(".png"));
        assert_eq!(storage.image_count().await, 1);
    }

    #[tokio::test]
    async fn test_image_upload_failure_is_not_fatal() {
        let storage = Arc::new(MemoryStorage::new());
        let verifier = Verifier::new(Arc::new(DummyModel::new()), storage.clone(), Arc::new(BrokenStorage));

        let record = verifier
            .verify(&VerificationRequest::new().with_content("Foto mostra enchente").with_image(png()))
            .await
            .unwrap();

        assert!(record.image_url.is_none());
        assert_eq!(storage.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_fatal() {
        let verifier = Verifier::new(
            Arc::new(DummyModel::new()),
            Arc::new(BrokenStorage),
            Arc::new(MemoryStorage::new()),
        );

        let err = verifier
            .verify(&VerificationRequest::new().with_content("claim"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_stores_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let verifier = verifier_with(Arc::new(UnreachableModel), storage.clone());

        let err = verifier
            .verify(&VerificationRequest::new().with_content("claim"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(storage.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_identical_submissions_produce_distinct_records() {
        let verifier = verifier_with(Arc::new(DummyModel::new()), Arc::new(MemoryStorage::new()));
        let request = VerificationRequest::new().with_content("Vacinas contêm microchips 5G");

        let first = verifier.verify(&request).await.unwrap();
        let second = verifier.verify(&request).await.unwrap();
        assert_ne!(first.id, second.id);
    }
}
