pub mod admin;
pub mod client;
pub mod public;

use std::sync::Arc;

use axum::Router;

use prodtrace_core::ServiceError;

use crate::service::TraceService;

/// Shared application state.
pub type AppState = Arc<TraceService>;

/// Build the trace router: public lookup plus admin ingestion.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(public::routes())
        .merge(admin::routes())
        .with_state(state)
}

/// Report an extractor rejection (bad JSON, form or query) as a JSON
/// validation error instead of axum's plain-text body.
pub(crate) fn rejected(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Validation(err.to_string())
}
