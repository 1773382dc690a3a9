use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Link placed on sources the model returned without a usable url.
pub const UNKNOWN_SOURCE_URL: &str = "#";

/// A claim submitted for verification. Each field counts only when it carries
/// something other than whitespace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(skip)]
    pub image: Option<ImageAttachment>,
}

impl VerificationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    pub fn content(&self) -> Option<&str> {
        non_blank(self.content.as_deref())
    }

    pub fn url(&self) -> Option<&str> {
        non_blank(self.url.as_deref())
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref().filter(|image| !image.bytes.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.content().is_none() && self.url().is_none() && self.image().is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone, Default)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl ImageAttachment {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            file_name: None,
        }
    }

    /// File extension matching the declared content type.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Verified,
    False,
    Partial,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Verified => "verified",
            Classification::False => "false",
            Classification::Partial => "partial",
        }
    }

    /// Label shown to readers.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Verified => "Verdadeira",
            Classification::False => "Falsa",
            Classification::Partial => "Duvidosa",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verified" => Ok(Classification::Verified),
            "false" => Ok(Classification::False),
            "partial" => Ok(Classification::Partial),
            other => Err(crate::Error::InvalidRequest(format!(
                "unknown classification: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    #[serde(default)]
    pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub verified: bool,
}

impl SourceReference {
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Structured verdict produced from the model answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub classification: Classification,
    pub score: u8,
    pub explanation: String,
    pub criteria: Vec<Criterion>,
    pub sources: Vec<SourceReference>,
}

impl Verdict {
    /// Verdict used whenever the model answer cannot be understood.
    pub fn fallback() -> Self {
        Self {
            classification: Classification::Partial,
            score: 50,
            explanation: "Não foi possível analisar completamente a informação. \
                          Recomenda-se verificação manual."
                .to_string(),
            criteria: vec![Criterion {
                name: "Análise automatizada".to_string(),
                status: false,
            }],
            sources: Vec::new(),
        }
    }
}

/// Row handed to a [`VerificationStorage`](crate::storage::VerificationStorage) for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVerification {
    pub content: Option<String>,
    pub url: Option<String>,
    pub classification: Classification,
    pub score: u8,
    pub explanation: String,
    pub criteria: Vec<Criterion>,
    pub sources: Vec<SourceReference>,
    pub image_url: Option<String>,
}

impl NewVerification {
    pub fn from_verdict(request: &VerificationRequest, verdict: Verdict, image_url: Option<String>) -> Self {
        Self {
            content: request.content().map(str::to_string),
            url: request.url().map(str::to_string),
            classification: verdict.classification,
            score: verdict.score,
            explanation: verdict.explanation,
            criteria: verdict.criteria,
            sources: verdict.sources,
            image_url,
        }
    }

    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> VerificationRecord {
        VerificationRecord {
            id,
            content: self.content,
            url: self.url,
            classification: self.classification,
            score: self.score,
            explanation: self.explanation,
            criteria: self.criteria,
            sources: self.sources,
            image_url: self.image_url,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub classification: Classification,
    pub score: u8,
    pub explanation: String,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub sources: Vec<SourceReference>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Replaces every missing source url with [`UNKNOWN_SOURCE_URL`].
    pub fn with_normalized_sources(mut self) -> Self {
        for source in &mut self.sources {
            if !source.has_url() {
                source.url = UNKNOWN_SOURCE_URL.to_string();
            }
        }
        self
    }
}

/// Aggregate counters shown on the landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactStats {
    #[serde(default)]
    pub total_verifications: u64,
    #[serde(default)]
    pub fake_news_detected: u64,
    #[serde(default)]
    pub verified_news: u64,
}
