use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::fmt;
use tokio::sync::watch;
use url::Url;
use vn_core::{
    Error, ImageAttachment, ImageStorage, ImpactStats, ImpactStatsSource, NewVerification, Result,
    VerificationRecord, VerificationStorage,
};
use crate::{StorageBackend, StorageConfig};

/// Hosted Postgres (through PostgREST) plus object storage.
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
    table: String,
    stats_table: String,
}

impl fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("table", &self.table)
            .finish()
    }
}

impl SupabaseStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::Configuration("Supabase url is required".to_string()))?;
        let service_key = config
            .service_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Configuration("Supabase service key is required".to_string()))?;
        Url::parse(url)
            .map_err(|e| Error::Configuration(format!("Invalid Supabase url '{}': {}", url, e)))?;

        Ok(Self {
            client: Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            service_key,
            bucket: config.bucket.clone(),
            table: config.table.clone(),
            stats_table: config.stats_table.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name)
    }
}

/// PostgREST may hand back numeric ids; records always carry them as strings.
fn record_from_row(mut row: Value) -> Result<VerificationRecord> {
    if let Some(id) = row.get_mut("id") {
        let numeric = match id {
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        };
        if let Some(numeric) = numeric {
            *id = Value::String(numeric);
        }
    }
    Ok(serde_json::from_value(row)?)
}

#[async_trait]
impl StorageBackend for SupabaseStorage {
    fn backend_name() -> &'static str {
        "supabase"
    }

    async fn connect(config: &StorageConfig) -> Result<Self> {
        Self::new(config)
    }
}

#[async_trait]
impl VerificationStorage for SupabaseStorage {
    async fn insert_verification(&self, verification: &NewVerification) -> Result<VerificationRecord> {
        let response = self
            .authorized(self.client.post(format!("{}/rest/v1/{}", self.base_url, self.table)))
            .header("Prefer", "return=representation")
            .json(verification)
            .send()
            .await
            .map_err(|e| Error::Persistence(format!("insert request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Insert into {} failed with {}: {}", self.table, status, body);
            return Err(Error::Persistence(format!("insert returned status {}", status)));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| Error::Persistence(format!("unreadable insert response: {}", e)))?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::Persistence("insert returned no row".to_string()))?;
        record_from_row(row).map_err(|e| Error::Persistence(e.to_string()))
    }
}

#[async_trait]
impl ImageStorage for SupabaseStorage {
    async fn upload_image(&self, name: &str, image: &ImageAttachment) -> Result<()> {
        let response = self
            .authorized(self.client.post(self.object_url(name)))
            .header(reqwest::header::CONTENT_TYPE, image.content_type.as_str())
            .header("x-upsert", "false")
            .body(image.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Upload of {} failed with {}: {}", name, status, body);
            return Err(Error::Storage(format!("upload returned status {}", status)));
        }
        Ok(())
    }

    async fn public_url(&self, name: &str) -> Result<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        ))
    }
}

#[async_trait]
impl ImpactStatsSource for SupabaseStorage {
    async fn current_stats(&self) -> Result<ImpactStats> {
        let response = self
            .authorized(self.client.get(format!("{}/rest/v1/{}", self.base_url, self.stats_table)))
            .query(&[("select", "*"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Storage(format!("stats query returned status {}", status)));
        }
        let rows: Vec<ImpactStats> = response.json().await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    fn subscribe(&self) -> Option<watch::Receiver<ImpactStats>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use vn_core::{VerificationRequest, Verdict};

    async fn spawn_supabase(router: Router) -> StorageConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        StorageConfig::default()
            .with_url(format!("http://{}/", addr))
            .with_service_key("service-key")
    }

    fn verification() -> NewVerification {
        NewVerification::from_verdict(
            &VerificationRequest::new().with_url("https://g1.globo.com/algumanoticia"),
            Verdict::fallback(),
            None,
        )
    }

    #[test]
    fn test_requires_credentials() {
        assert!(matches!(
            SupabaseStorage::new(&StorageConfig::default().with_url("https://x.supabase.co")),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            SupabaseStorage::new(&StorageConfig::default().with_service_key("key")),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_public_url_layout() {
        let storage = SupabaseStorage::new(
            &StorageConfig::default()
                .with_url("https://project.supabase.co/")
                .with_service_key("key"),
        )
        .unwrap();
        assert_eq!(
            storage.public_url("verification_1.png").await.unwrap(),
            "https://project.supabase.co/storage/v1/object/public/verification-images/verification_1.png"
        );
    }

    #[tokio::test]
    async fn test_insert_returns_stored_row() {
        let router = Router::new().route(
            "/rest/v1/news_verifications",
            post(|headers: HeaderMap, Json(row): Json<Value>| async move {
                assert_eq!(headers["apikey"], "service-key");
                assert_eq!(headers["authorization"], "Bearer service-key");
                assert_eq!(headers["prefer"], "return=representation");
                assert_eq!(row["classification"], "partial");
                let mut stored = row.clone();
                stored["id"] = json!(42);
                stored["created_at"] = json!("2024-05-01T12:00:00.123456+00:00");
                (StatusCode::CREATED, Json(json!([stored])))
            }),
        );
        let storage = SupabaseStorage::new(&spawn_supabase(router).await).unwrap();

        let record = storage.insert_verification(&verification()).await.unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.url.as_deref(), Some("https://g1.globo.com/algumanoticia"));
        assert_eq!(record.score, 50);
    }

    #[tokio::test]
    async fn test_insert_failure_is_persistence_error() {
        let router = Router::new().route(
            "/rest/v1/news_verifications",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid jwt") }),
        );
        let storage = SupabaseStorage::new(&spawn_supabase(router).await).unwrap();

        let err = storage.insert_verification(&verification()).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn test_upload_and_stats() {
        let router = Router::new()
            .route(
                "/storage/v1/object/verification-images/:name",
                post(|Path(name): Path<String>, headers: HeaderMap, body: Bytes| async move {
                    assert_eq!(headers["content-type"], "image/png");
                    if name == "taken.png" {
                        return StatusCode::CONFLICT;
                    }
                    assert_eq!(&body[..], &[1u8, 2, 3][..]);
                    StatusCode::OK
                }),
            )
            .route(
                "/rest/v1/impact_stats",
                get(|| async {
                    Json(json!([{ "id": 1, "total_verifications": 12, "fake_news_detected": 5, "verified_news": 4 }]))
                }),
            );
        let storage = SupabaseStorage::new(&spawn_supabase(router).await).unwrap();
        let image = ImageAttachment::new(vec![1, 2, 3], "image/png");

        storage.upload_image("verification_1.png", &image).await.unwrap();
        assert!(matches!(
            storage.upload_image("taken.png", &image).await,
            Err(Error::Storage(_))
        ));

        let stats = storage.current_stats().await.unwrap();
        assert_eq!(stats.total_verifications, 12);
        assert_eq!(stats.fake_news_detected, 5);
        assert!(storage.subscribe().is_none());
    }
}
