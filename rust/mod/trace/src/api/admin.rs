use axum::{
    Form, Json, Router,
    extract::rejection::{FormRejection, JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;

use prodtrace_core::{ListParams, ListResult, ServiceError};

use super::{AppState, rejected};
use crate::model::{NewProduct, ScanEvent, TraceRecord};
use crate::store::RecordFilter;
use crate::web;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin_index))
        .route("/admin/products", post(submit_form).get(list_products))
        .route("/admin/products/new", get(product_form))
        .route("/admin/products/{trace_id}", get(get_product))
        .route("/admin/products/{trace_id}/scans", get(list_scans))
        .route("/admin/products/{trace_id}/code", post(regenerate_code))
        .route("/trace/v1/products", post(create_product))
}

/// Paging query. Fields are spelled out rather than flattened so that
/// urlencoded numbers deserialize.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    #[serde(default)]
    pending_image: bool,
}

impl ListQuery {
    fn params(&self) -> ListParams {
        let defaults = ListParams::default();
        ListParams {
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
        }
    }
}

// ---------------------------------------------------------------------------
// GET /admin: operator landing page, all records newest first
// ---------------------------------------------------------------------------

async fn admin_index(State(svc): State<AppState>) -> Result<Html<String>, ServiceError> {
    let records = svc.list_all()?;
    Ok(Html(web::admin_list_page(&records)))
}

// ---------------------------------------------------------------------------
// GET /admin/products/new
// ---------------------------------------------------------------------------

async fn product_form() -> Html<&'static str> {
    Html(web::PRODUCT_FORM)
}

// ---------------------------------------------------------------------------
// POST /admin/products (urlencoded form)
// ---------------------------------------------------------------------------

async fn submit_form(
    State(svc): State<AppState>,
    form: Result<Form<NewProduct>, FormRejection>,
) -> Result<Redirect, ServiceError> {
    let Form(input) = form.map_err(rejected)?;
    svc.create_product(input)?;
    Ok(Redirect::to("/admin"))
}

// ---------------------------------------------------------------------------
// POST /trace/v1/products (JSON)
// ---------------------------------------------------------------------------

async fn create_product(
    State(svc): State<AppState>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<TraceRecord>), ServiceError> {
    let Json(input) = body.map_err(rejected)?;
    let record = svc.create_product(input)?;
    Ok((StatusCode::CREATED, Json(record)))
}

// ---------------------------------------------------------------------------
// GET /admin/products
// ---------------------------------------------------------------------------

async fn list_products(
    State(svc): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResult<TraceRecord>>, ServiceError> {
    let Query(query) = query.map_err(rejected)?;
    let filter = RecordFilter {
        pending_image: query.pending_image,
    };
    Ok(Json(svc.list_records(&query.params(), &filter)?))
}

// ---------------------------------------------------------------------------
// GET /admin/products/{trace_id}
// ---------------------------------------------------------------------------

async fn get_product(
    State(svc): State<AppState>,
    Path(trace_id): Path<String>,
) -> Result<Json<TraceRecord>, ServiceError> {
    Ok(Json(svc.get_record(&trace_id)?))
}

// ---------------------------------------------------------------------------
// GET /admin/products/{trace_id}/scans
// ---------------------------------------------------------------------------

async fn list_scans(
    State(svc): State<AppState>,
    Path(trace_id): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResult<ScanEvent>>, ServiceError> {
    let Query(query) = query.map_err(rejected)?;
    Ok(Json(svc.scan_history(&trace_id, &query.params())?))
}

// ---------------------------------------------------------------------------
// POST /admin/products/{trace_id}/code
// ---------------------------------------------------------------------------

async fn regenerate_code(
    State(svc): State<AppState>,
    Path(trace_id): Path<String>,
) -> Result<Json<TraceRecord>, ServiceError> {
    Ok(Json(svc.regenerate_code(&trace_id)?))
}
