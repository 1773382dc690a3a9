use async_trait::async_trait;
use tokio::sync::watch;
use crate::types::{ImageAttachment, ImpactStats, NewVerification, VerificationRecord};
use crate::Result;

#[async_trait]
pub trait VerificationStorage: Send + Sync {
    /// Insert a verification and return the stored row, with its id and timestamp
    async fn insert_verification(&self, verification: &NewVerification) -> Result<VerificationRecord>;
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Write an image once under `name`
    async fn upload_image(&self, name: &str, image: &ImageAttachment) -> Result<()>;

    /// Resolve the public url of a stored image
    async fn public_url(&self, name: &str) -> Result<String>;
}

/// Read-only access to the aggregate counters. Writers live outside this system.
#[async_trait]
pub trait ImpactStatsSource: Send + Sync {
    async fn current_stats(&self) -> Result<ImpactStats>;

    /// Change feed of the counters, when the backend publishes one
    fn subscribe(&self) -> Option<watch::Receiver<ImpactStats>>;
}
