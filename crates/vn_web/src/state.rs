use std::sync::Arc;
use vn_core::{Error, ImpactStatsSource, Result};
use vn_inference::Verifier;

fn reason(error: Error) -> String {
    match error {
        Error::Configuration(reason) => reason,
        other => other.to_string(),
    }
}

/// Shared handler state. A collaborator that failed to configure is kept as
/// its error message so requests can report it.
pub struct AppState {
    verifier: std::result::Result<Verifier, String>,
    stats: std::result::Result<Arc<dyn ImpactStatsSource>, String>,
}

impl AppState {
    pub fn new(verifier: Verifier, stats: Arc<dyn ImpactStatsSource>) -> Self {
        Self {
            verifier: Ok(verifier),
            stats: Ok(stats),
        }
    }

    pub fn from_parts(verifier: Result<Verifier>, stats: Result<Arc<dyn ImpactStatsSource>>) -> Self {
        Self {
            verifier: verifier.map_err(reason),
            stats: stats.map_err(reason),
        }
    }

    pub fn verifier(&self) -> Result<&Verifier> {
        self.verifier
            .as_ref()
            .map_err(|reason| Error::Configuration(reason.clone()))
    }

    pub fn stats(&self) -> Result<&Arc<dyn ImpactStatsSource>> {
        self.stats
            .as_ref()
            .map_err(|reason| Error::Configuration(reason.clone()))
    }
}
