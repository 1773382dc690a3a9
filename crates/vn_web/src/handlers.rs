use axum::{
    extract::{Request, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream};
use serde::Serialize;
use std::sync::Arc;
use vn_core::{Error, ImpactStats, VerificationRecord};
use crate::error::ApiError;
use crate::extract::read_submission;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub verification: VerificationRecord,
}

pub async fn verify_news(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<VerifyResponse>, ApiError> {
    // Credentials are checked before the body is read.
    let verifier = state.verifier()?;
    let submission = read_submission(request).await?;
    let verification = verifier.verify(&submission).await?;
    Ok(Json(VerifyResponse {
        success: true,
        verification,
    }))
}

pub async fn impact_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImpactStats>, ApiError> {
    let stats = state.stats()?.current_stats().await?;
    Ok(Json(stats))
}

/// Server-sent events: the current counters, then one event per change.
pub async fn impact_stats_stream(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let receiver = state
        .stats()?
        .subscribe()
        .ok_or_else(|| Error::Unsupported("impact stats change feed".to_string()))?;

    let events = stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first {
            receiver.changed().await.ok()?;
        }
        let stats = *receiver.borrow_and_update();
        let event = Event::default().event("impact_stats").json_data(stats);
        Some((event, (receiver, false)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub async fn health() -> &'static str {
    "ok"
}
