use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};

use prodtrace_core::ServiceError;

use super::AppState;
use super::client::ClientInfo;
use crate::error::TraceError;
use crate::model::TraceRecord;
use crate::trace_id::TraceId;
use crate::web;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/p/{trace_id}", get(lookup_page))
        .route("/trace/v1/lookup/{trace_id}", get(lookup_json))
        .route("/codes/{trace_id}", get(code_image))
}

// ---------------------------------------------------------------------------
// GET /p/{trace_id}: the URL encoded in every code image
// ---------------------------------------------------------------------------

async fn lookup_page(
    State(svc): State<AppState>,
    Path(trace_id): Path<String>,
    client: ClientInfo,
) -> Response {
    match svc.resolve(&trace_id, &client.source_address, &client.client_agent) {
        Ok(record) => Html(web::record_page(&record)).into_response(),
        Err(TraceError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Html(web::not_found_page(&trace_id))).into_response()
        }
        Err(e) => ServiceError::from(e).into_response(),
    }
}

// ---------------------------------------------------------------------------
// GET /trace/v1/lookup/{trace_id}
// ---------------------------------------------------------------------------

async fn lookup_json(
    State(svc): State<AppState>,
    Path(trace_id): Path<String>,
    client: ClientInfo,
) -> Result<Json<TraceRecord>, ServiceError> {
    let record = svc.resolve(&trace_id, &client.source_address, &client.client_agent)?;
    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// GET /codes/{trace_id}
// ---------------------------------------------------------------------------

async fn code_image(
    State(svc): State<AppState>,
    Path(trace_id): Path<String>,
) -> Result<Response, ServiceError> {
    let id = TraceId::parse(&trace_id)
        .ok_or_else(|| TraceError::NotFound(trace_id.clone()))?;
    let bytes = svc.code_image(id.as_str())?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], bytes).into_response())
}
