pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::InferenceModel;
pub use storage::{ImageStorage, ImpactStatsSource, VerificationStorage};
pub use types::{
    Classification, Criterion, ImageAttachment, ImpactStats, NewVerification, SourceReference,
    VerificationRecord, VerificationRequest, Verdict, UNKNOWN_SOURCE_URL,
};
