use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use vn_core::{Error, ImageStorage, ImpactStatsSource, Result, VerificationStorage};

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: VerificationStorage + ImageStorage + ImpactStatsSource + Sized + 'static {
    fn backend_name() -> &'static str;
    async fn connect(config: &StorageConfig) -> Result<Self>;
}

#[derive(Clone)]
pub struct StorageConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub bucket: String,
    pub table: String,
    pub stats_table: String,
    pub path: Option<PathBuf>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("url", &self.url)
            .field("service_key", &self.service_key.as_deref().map(|_| "<redacted>"))
            .field("bucket", &self.bucket)
            .field("table", &self.table)
            .field("stats_table", &self.stats_table)
            .field("path", &self.path)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            bucket: "verification-images".to_string(),
            table: "news_verifications".to_string(),
            stats_table: "impact_stats".to_string(),
            path: None,
        }
    }
}

impl StorageConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(key.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// The three storage seams, usually backed by one backend instance.
#[derive(Clone)]
pub struct Backends {
    pub name: &'static str,
    pub records: Arc<dyn VerificationStorage>,
    pub images: Arc<dyn ImageStorage>,
    pub stats: Arc<dyn ImpactStatsSource>,
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").field("name", &self.name).finish()
    }
}

impl Backends {
    pub fn from_backend<T: StorageBackend>(backend: Arc<T>) -> Self {
        Self {
            name: T::backend_name(),
            records: backend.clone(),
            images: backend.clone(),
            stats: backend,
        }
    }
}

async fn connect<T: StorageBackend>(config: &StorageConfig) -> Result<Backends> {
    let backend = T::connect(config).await?;
    tracing::debug!("Connected {} storage backend", T::backend_name());
    Ok(Backends::from_backend(Arc::new(backend)))
}

/// Build the backend named `kind` (`memory`, `supabase`, `sqlite`).
pub async fn create_backends(kind: &str, config: &StorageConfig) -> Result<Backends> {
    match kind.to_ascii_lowercase().as_str() {
        "memory" => connect::<MemoryStorage>(config).await,
        "supabase" => connect::<SupabaseStorage>(config).await,
        #[cfg(feature = "sqlite")]
        "sqlite" => connect::<SQLiteStorage>(config).await,
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Configuration(
            "SQLite storage requires the `sqlite` feature".to_string(),
        )),
        other => Err(Error::Configuration(format!(
            "Unknown storage '{}'. Available storages: memory, supabase, sqlite",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::{create_backends, Backends, StorageBackend, StorageConfig};
    pub use super::backends::*;
}
