use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use vn_core::{
    Error, ImageAttachment, ImageStorage, ImpactStats, ImpactStatsSource, NewVerification, Result,
    VerificationRecord, VerificationStorage,
};
use crate::{StorageBackend, StorageConfig};

pub struct MemoryStore {
    bucket: String,
    records: Vec<VerificationRecord>,
    images: HashMap<String, ImageAttachment>,
}

impl MemoryStore {
    pub fn new(bucket: String) -> Self {
        Self {
            bucket,
            records: Vec::new(),
            images: HashMap::new(),
        }
    }

    pub fn insert_verification(&mut self, verification: &NewVerification) -> VerificationRecord {
        let record = verification
            .clone()
            .into_record(uuid::Uuid::new_v4().to_string(), Utc::now());
        self.records.push(record.clone());
        record
    }

    pub fn upload_image(&mut self, name: &str, image: &ImageAttachment) -> Result<()> {
        if self.images.contains_key(name) {
            return Err(Error::Storage(format!("image {} already exists", name)));
        }
        self.images.insert(name.to_string(), image.clone());
        Ok(())
    }

    pub fn public_url(&self, name: &str) -> Result<String> {
        if !self.images.contains_key(name) {
            return Err(Error::Storage(format!("image {} not found", name)));
        }
        Ok(format!("memory://{}/{}", self.bucket, name))
    }
}

/// Process-local storage for development and tests.
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
    stats: watch::Sender<ImpactStats>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_config(&StorageConfig::default())
    }

    pub fn with_config(config: &StorageConfig) -> Self {
        let (stats, _) = watch::channel(ImpactStats::default());
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(config.bucket.clone()))),
            stats,
        }
    }

    pub async fn records(&self) -> Vec<VerificationRecord> {
        self.store.read().await.records.clone()
    }

    pub async fn image_count(&self) -> usize {
        self.store.read().await.images.len()
    }

    /// Replace the counters and notify every subscriber.
    pub fn publish_stats(&self, stats: ImpactStats) {
        self.stats.send_replace(stats);
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn backend_name() -> &'static str {
        "memory"
    }

    async fn connect(config: &StorageConfig) -> Result<Self> {
        Ok(Self::with_config(config))
    }
}

#[async_trait]
impl VerificationStorage for MemoryStorage {
    async fn insert_verification(&self, verification: &NewVerification) -> Result<VerificationRecord> {
        let mut store = self.store.write().await;
        Ok(store.insert_verification(verification))
    }
}

#[async_trait]
impl ImageStorage for MemoryStorage {
    async fn upload_image(&self, name: &str, image: &ImageAttachment) -> Result<()> {
        let mut store = self.store.write().await;
        store.upload_image(name, image)
    }

    async fn public_url(&self, name: &str) -> Result<String> {
        let store = self.store.read().await;
        store.public_url(name)
    }
}

#[async_trait]
impl ImpactStatsSource for MemoryStorage {
    async fn current_stats(&self) -> Result<ImpactStats> {
        Ok(*self.stats.borrow())
    }

    fn subscribe(&self) -> Option<watch::Receiver<ImpactStats>> {
        Some(self.stats.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vn_core::{Classification, VerificationRequest, Verdict};

    fn verification() -> NewVerification {
        NewVerification::from_verdict(
            &VerificationRequest::new().with_content("Test claim"),
            Verdict::fallback(),
            None,
        )
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();

        let first = storage.insert_verification(&verification()).await.unwrap();
        let second = storage.insert_verification(&verification()).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.classification, Classification::Partial);
        assert_eq!(first.content.as_deref(), Some("Test claim"));

        let records = storage.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first.id);
    }

    #[tokio::test]
    async fn test_images_are_write_once() {
        let storage = MemoryStorage::new();
        let image = ImageAttachment::new(vec![1, 2, 3], "image/png");

        assert!(storage.public_url("verification_1.png").await.is_err());
        storage.upload_image("verification_1.png", &image).await.unwrap();
        assert_eq!(
            storage.public_url("verification_1.png").await.unwrap(),
            "memory://verification-images/verification_1.png"
        );
        assert!(storage.upload_image("verification_1.png", &image).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_publish_on_write() {
        let storage = MemoryStorage::new();
        let mut updates = storage.subscribe().unwrap();

        let stats = ImpactStats {
            total_verifications: 10,
            fake_news_detected: 4,
            verified_news: 3,
        };
        storage.publish_stats(stats);

        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow(), stats);
        assert_eq!(storage.current_stats().await.unwrap(), stats);
    }
}
