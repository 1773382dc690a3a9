use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use state::AppState;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

/// Preflight answers carry no body, so they are sent as 204.
async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/verify-news", post(handlers::verify_news))
        .route("/impact-stats", get(handlers::impact_stats))
        .route("/impact-stats/stream", get(handlers::impact_stats_stream))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(extract::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .layer(middleware::from_fn(preflight_no_content))
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use vn_core::{Error, Result, VerificationRecord};
    pub use crate::{create_app, AppState};
}
