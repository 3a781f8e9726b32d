pub mod api;
pub mod code_image;
pub mod error;
pub mod model;
pub mod scan_log;
pub mod service;
pub mod store;
pub mod trace_id;
pub mod web;

use std::sync::Arc;

use axum::Router;
use prodtrace_core::Module;

pub use error::TraceError;
pub use model::{NewProduct, ScanEvent, TraceRecord};
pub use service::{TraceService, TraceSettings};

/// Product registration, scannable codes and public lookup.
pub struct TraceModule {
    service: Arc<TraceService>,
}

impl TraceModule {
    pub fn new(service: TraceService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn service(&self) -> &Arc<TraceService> {
        &self.service
    }
}

impl Module for TraceModule {
    fn name(&self) -> &str {
        "trace"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
