//! SQLite records with images kept in a directory next to the database.
//!
//! Only built with the `sqlite` feature; run its tests with
//! `cargo test -p vn_storage --features sqlite`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use url::Url;
use vn_core::{
    Error, ImageAttachment, ImageStorage, ImpactStats, ImpactStatsSource, NewVerification, Result,
    VerificationRecord, VerificationStorage,
};
use crate::{StorageBackend, StorageConfig};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS news_verifications (
        id TEXT PRIMARY KEY,
        content TEXT,
        url TEXT,
        classification TEXT NOT NULL,
        score INTEGER NOT NULL,
        explanation TEXT NOT NULL,
        criteria TEXT NOT NULL,
        sources TEXT NOT NULL,
        image_url TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS impact_stats (
        id INTEGER PRIMARY KEY,
        total_verifications INTEGER NOT NULL DEFAULT 0,
        fake_news_detected INTEGER NOT NULL DEFAULT 0,
        verified_news INTEGER NOT NULL DEFAULT 0
    )
    "#,
];

/// Local database with images kept in a directory beside it.
pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
    image_dir: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path, bucket: &str) -> Result<Self> {
        let parent = db_path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
            .await
            .map_err(|e| Error::Configuration(format!("Failed to open database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
            image_dir: parent.join(bucket),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Most recent verifications first.
    pub async fn list_verifications(&self, limit: usize) -> Result<Vec<VerificationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM news_verifications
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to list verifications: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let classification: String = row.get("classification");
            let criteria: String = row.get("criteria");
            let sources: String = row.get("sources");
            let created_at: String = row.get("created_at");
            records.push(VerificationRecord {
                id: row.get("id"),
                content: row.get("content"),
                url: row.get("url"),
                classification: classification.parse()?,
                score: row.get::<i64, _>("score").clamp(0, 100) as u8,
                explanation: row.get("explanation"),
                criteria: serde_json::from_str(&criteria)?,
                sources: serde_json::from_str(&sources)?,
                image_url: row.get("image_url"),
                created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| Error::Storage(format!("Failed to parse date: {}", e)))?
                    .with_timezone(&Utc),
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn backend_name() -> &'static str {
        "sqlite"
    }

    async fn connect(config: &StorageConfig) -> Result<Self> {
        let db_path = config
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("verifications.db"));
        Self::new_with_path(&db_path, &config.bucket).await
    }
}

#[async_trait]
impl VerificationStorage for SQLiteStorage {
    async fn insert_verification(&self, verification: &NewVerification) -> Result<VerificationRecord> {
        let criteria = serde_json::to_string(&verification.criteria)?;
        let sources = serde_json::to_string(&verification.sources)?;
        let record = verification
            .clone()
            .into_record(uuid::Uuid::new_v4().to_string(), Utc::now());

        sqlx::query(
            r#"
            INSERT INTO news_verifications
            (id, content, url, classification, score, explanation, criteria, sources, image_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.content.as_deref())
        .bind(record.url.as_deref())
        .bind(record.classification.as_str())
        .bind(record.score as i64)
        .bind(&record.explanation)
        .bind(criteria)
        .bind(sources)
        .bind(record.image_url.as_deref())
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to store verification: {}", e)))?;

        Ok(record)
    }
}

#[async_trait]
impl ImageStorage for SQLiteStorage {
    async fn upload_image(&self, name: &str, image: &ImageAttachment) -> Result<()> {
        tokio::fs::create_dir_all(&self.image_dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.image_dir.join(name))
            .await?;
        file.write_all(&image.bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn public_url(&self, name: &str) -> Result<String> {
        let path = tokio::fs::canonicalize(self.image_dir.join(name)).await?;
        Url::from_file_path(&path)
            .map(String::from)
            .map_err(|_| Error::Storage(format!("No url for {}", path.display())))
    }
}

#[async_trait]
impl ImpactStatsSource for SQLiteStorage {
    async fn current_stats(&self) -> Result<ImpactStats> {
        let row = sqlx::query(
            "SELECT total_verifications, fake_news_detected, verified_news FROM impact_stats LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to read impact stats: {}", e)))?;

        Ok(row
            .map(|row| ImpactStats {
                total_verifications: row.get::<i64, _>("total_verifications").max(0) as u64,
                fake_news_detected: row.get::<i64, _>("fake_news_detected").max(0) as u64,
                verified_news: row.get::<i64, _>("verified_news").max(0) as u64,
            })
            .unwrap_or_default())
    }

    fn subscribe(&self) -> Option<watch::Receiver<ImpactStats>> {
        None
    }
}
