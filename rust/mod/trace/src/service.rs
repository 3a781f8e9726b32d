use std::sync::Arc;

use prodtrace_blob::BlobStore;
use prodtrace_core::{ListParams, ListResult, now_rfc3339};
use prodtrace_sql::SQLStore;
use tracing::{debug, info, warn};

use crate::code_image::CodeImageEncoder;
use crate::error::TraceError;
use crate::model::{NewProduct, ScanEvent, TraceRecord};
use crate::scan_log::{LookupLogger, ScanLog};
use crate::store::{RecordFilter, TraceStore};
use crate::trace_id::{IdSource, RandomIdSource};

/// Default number of id draws per submission before giving up.
pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 5;

/// Deployment-specific settings of the trace module.
#[derive(Debug, Clone)]
pub struct TraceSettings {
    /// Prefix of the URL encoded into each code image; the trace id is appended.
    pub base_url: String,

    /// Blob key prefix for code images.
    pub code_dir: String,

    /// Bound on generate-and-insert attempts per submission.
    pub max_id_attempts: u32,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/p/".to_string(),
            code_dir: "qrcodes".to_string(),
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
    }
}

/// Owns the record store, scan log, encoder and id source.
pub struct TraceService {
    store: TraceStore,
    scans: Arc<ScanLog>,
    logger: Arc<dyn LookupLogger>,
    encoder: CodeImageEncoder,
    ids: Arc<dyn IdSource>,
    max_id_attempts: u32,
}

impl TraceService {
    pub fn new(
        sql: Arc<dyn SQLStore>,
        blob: Arc<dyn BlobStore>,
        settings: TraceSettings,
    ) -> Result<Self, TraceError> {
        let store = TraceStore::new(Arc::clone(&sql))?;
        let scans = Arc::new(ScanLog::new(sql)?);
        let encoder = CodeImageEncoder::new(blob, &settings.base_url, &settings.code_dir);
        Ok(Self {
            store,
            logger: scans.clone(),
            scans,
            encoder,
            ids: Arc::new(RandomIdSource),
            max_id_attempts: settings.max_id_attempts.max(1),
        })
    }

    /// Replace the id source.
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the sink that public lookups are logged to.
    pub fn with_logger(mut self, logger: Arc<dyn LookupLogger>) -> Self {
        self.logger = logger;
        self
    }

    // ── Admin ingestion ──

    /// Register a product: allocate a trace id, persist the record, then
    /// render its code image.
    ///
    /// Once the insert has committed the record is always returned. If the
    /// image step fails the record keeps an empty `codeImagePath` and can be
    /// repaired with [`regenerate_code`](Self::regenerate_code).
    pub fn create_product(&self, input: NewProduct) -> Result<TraceRecord, TraceError> {
        // Blank names are rejected, but the stored name is the one submitted.
        let product_name = input
            .product_name
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| TraceError::Validation("productName is required".into()))?;

        let record = self.insert_with_fresh_id(input.to_record(product_name))?;
        info!(trace_id = %record.trace_id, product = %record.product_name, "trace record created");

        match self.attach_code_image(&record.trace_id) {
            Ok(updated) => Ok(updated),
            Err(e) => {
                warn!(trace_id = %record.trace_id, error = %e, "code image pending");
                Ok(record)
            }
        }
    }

    /// Draw ids until one inserts, at most `max_id_attempts` times.
    fn insert_with_fresh_id(&self, mut record: TraceRecord) -> Result<TraceRecord, TraceError> {
        for attempt in 1..=self.max_id_attempts {
            record.trace_id = self.ids.next_id().into_string();
            let now = now_rfc3339();
            record.created_at = now.clone();
            record.updated_at = now;

            match self.store.insert(&record) {
                Ok(()) => return Ok(record),
                Err(TraceError::DuplicateKey(id)) => {
                    warn!(trace_id = %id, attempt, "trace id collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(TraceError::Storage(format!(
            "no unique trace id after {} attempts",
            self.max_id_attempts
        )))
    }

    fn attach_code_image(&self, trace_id: &str) -> Result<TraceRecord, TraceError> {
        let path = self.encoder.encode(trace_id)?;
        self.store.update_image_path(trace_id, &path)
    }

    /// Re-render the code image of an existing record.
    pub fn regenerate_code(&self, trace_id: &str) -> Result<TraceRecord, TraceError> {
        if self.store.find_by_trace_id(trace_id)?.is_none() {
            return Err(TraceError::NotFound(trace_id.to_string()));
        }
        let record = self.attach_code_image(trace_id)?;
        info!(trace_id, path = %record.code_image_path, "code image regenerated");
        Ok(record)
    }

    // ── Public lookup ──

    /// Resolve a trace id for a public caller and log the lookup.
    ///
    /// Only found records are logged. A logging failure is reported and
    /// otherwise ignored; it never turns a found record into an error.
    pub fn resolve(
        &self,
        trace_id: &str,
        source_address: &str,
        client_agent: &str,
    ) -> Result<TraceRecord, TraceError> {
        let record = match self.store.find_by_trace_id(trace_id)? {
            Some(r) => r,
            None => {
                debug!(trace_id, "lookup miss");
                return Err(TraceError::NotFound(trace_id.to_string()));
            }
        };

        let event = ScanEvent::new(&record.trace_id, source_address, client_agent);
        if let Err(e) = self.logger.record(&event) {
            warn!(trace_id, error = %e, "failed to log scan event");
        }
        debug!(trace_id, source = source_address, "lookup hit");
        Ok(record)
    }

    // ── Reads (no logging) ──

    pub fn get_record(&self, trace_id: &str) -> Result<TraceRecord, TraceError> {
        self.store
            .find_by_trace_id(trace_id)?
            .ok_or_else(|| TraceError::NotFound(trace_id.to_string()))
    }

    pub fn list_records(
        &self,
        params: &ListParams,
        filter: &RecordFilter,
    ) -> Result<ListResult<TraceRecord>, TraceError> {
        self.store.list(params, filter)
    }

    pub fn list_all(&self) -> Result<Vec<TraceRecord>, TraceError> {
        self.store.list_all()
    }

    /// Lookup history of an existing record, newest first.
    pub fn scan_history(
        &self,
        trace_id: &str,
        params: &ListParams,
    ) -> Result<ListResult<ScanEvent>, TraceError> {
        self.get_record(trace_id)?;
        self.scans.list_by_trace_id(trace_id, params)
    }

    /// Stored code image bytes for a trace id.
    pub fn code_image(&self, trace_id: &str) -> Result<Vec<u8>, TraceError> {
        self.encoder
            .load(trace_id)?
            .ok_or_else(|| TraceError::NotFound(trace_id.to_string()))
    }

    /// URL a scanned code for `trace_id` points at.
    pub fn lookup_url(&self, trace_id: &str) -> String {
        self.encoder.lookup_url(trace_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use prodtrace_blob::{BlobError, FileStore};
    use prodtrace_sql::SqliteStore;

    use super::*;
    use crate::trace_id::TraceId;

    /// Hands out a fixed sequence of ids.
    struct ScriptedIds(Mutex<VecDeque<&'static str>>);

    impl ScriptedIds {
        fn new(ids: &[&'static str]) -> Arc<Self> {
            Arc::new(Self(Mutex::new(ids.iter().copied().collect())))
        }
    }

    impl IdSource for ScriptedIds {
        fn next_id(&self) -> TraceId {
            let id = self.0.lock().unwrap().pop_front().expect("script exhausted");
            TraceId::parse(id).unwrap()
        }
    }

    struct BrokenLogger;

    impl LookupLogger for BrokenLogger {
        fn record(&self, _event: &ScanEvent) -> Result<(), TraceError> {
            Err(TraceError::Storage("disk full".into()))
        }
    }

    /// Blob store that fails writes until switched on.
    struct FlakyBlob {
        inner: FileStore,
        healthy: Mutex<bool>,
    }

    impl BlobStore for FlakyBlob {
        fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError> {
            if !*self.healthy.lock().unwrap() {
                return Err(BlobError::Io("read-only filesystem".into()));
            }
            self.inner.put(key, data)
        }
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
            self.inner.get(key)
        }
    }

    fn service_with_blob(blob: Arc<dyn BlobStore>) -> TraceService {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        TraceService::new(sql, blob, TraceSettings::default()).unwrap()
    }

    fn service() -> (TraceService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FileStore::open(dir.path()).unwrap());
        (service_with_blob(blob), dir)
    }

    fn widget(warranty: serde_json::Value) -> NewProduct {
        NewProduct {
            product_name: Some("Widget".into()),
            warranty_months: Some(warranty),
            ..Default::default()
        }
    }

    #[test]
    fn create_with_blank_warranty() {
        let (svc, dir) = service();
        let record = svc.create_product(widget(serde_json::json!(""))).unwrap();

        assert_eq!(record.warranty_months, 0);
        assert!(TraceId::parse(&record.trace_id).is_some());
        assert_eq!(record.code_image_path, format!("qrcodes/{}.svg", record.trace_id));
        assert!(dir.path().join(&record.code_image_path).is_file());
        assert_eq!(
            svc.lookup_url(&record.trace_id),
            format!("http://localhost:8080/p/{}", record.trace_id)
        );

        let stored = svc.get_record(&record.trace_id).unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn fields_round_trip() {
        let (svc, _dir) = service();
        let input = NewProduct {
            product_name: Some("Valve".into()),
            model: Some("V-200".into()),
            material: Some("316L".into()),
            material_origin: Some("Ningbo".into()),
            material_batch: Some("MB-7".into()),
            standard_code: Some("GB/T 12220".into()),
            function_description: Some("Shut-off".into()),
            key_parameters: Some(r#"{"pn":16}"#.into()),
            production_batch: Some("PB-1".into()),
            production_date: Some("2025-11-26".into()),
            production_line: Some("L3".into()),
            qc_result: Some("PASS".into()),
            qc_inspector: Some("Li".into()),
            warranty_months: Some(serde_json::json!("24")),
        };
        let record = svc.create_product(input.clone()).unwrap();
        let stored = svc.get_record(&record.trace_id).unwrap();

        assert_eq!(stored.model, input.model);
        assert_eq!(stored.material_origin, input.material_origin);
        assert_eq!(stored.key_parameters, input.key_parameters);
        assert_eq!(stored.production_date, input.production_date);
        assert_eq!(stored.qc_inspector, input.qc_inspector);
        assert_eq!(stored.warranty_months, 24);
    }

    #[test]
    fn product_name_is_required() {
        let (svc, _dir) = service();
        for name in [None, Some("   ".to_string())] {
            let input = NewProduct {
                product_name: name,
                ..Default::default()
            };
            assert!(matches!(
                svc.create_product(input),
                Err(TraceError::Validation(_))
            ));
        }
        assert!(svc.list_all().unwrap().is_empty());
    }

    #[test]
    fn product_name_is_stored_as_submitted() {
        let (svc, _dir) = service();
        let input = NewProduct {
            product_name: Some("  Widget Pro ".into()),
            model: Some(" W-2 ".into()),
            ..Default::default()
        };
        let record = svc.create_product(input).unwrap();
        let stored = svc.get_record(&record.trace_id).unwrap();
        assert_eq!(stored.product_name, "  Widget Pro ");
        assert_eq!(stored.model.as_deref(), Some(" W-2 "));
    }

    #[test]
    fn collision_retries_with_new_id() {
        let (svc, _dir) = service();
        let svc = svc.with_id_source(ScriptedIds::new(&[
            "P20250101AAAAAA",
            "P20250101AAAAAA",
            "P20250101BBBBBB",
        ]));

        let first = svc.create_product(widget(serde_json::json!(1))).unwrap();
        let second = svc.create_product(widget(serde_json::json!(2))).unwrap();

        assert_eq!(first.trace_id, "P20250101AAAAAA");
        assert_eq!(second.trace_id, "P20250101BBBBBB");
        let ids: Vec<String> = svc.list_all().unwrap().into_iter().map(|r| r.trace_id).collect();
        assert_eq!(ids, vec!["P20250101BBBBBB", "P20250101AAAAAA"]);
    }

    #[test]
    fn retry_exhaustion_is_storage_error() {
        let (svc, _dir) = service();
        let svc = svc.with_id_source(ScriptedIds::new(&["P20250101AAAAAA"; 6]));
        svc.create_product(widget(serde_json::json!(1))).unwrap();

        let err = svc.create_product(widget(serde_json::json!(1))).unwrap_err();
        assert!(matches!(err, TraceError::Storage(_)));
        assert_eq!(svc.list_all().unwrap().len(), 1);
    }

    #[test]
    fn encode_failure_keeps_record_and_can_be_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FlakyBlob {
            inner: FileStore::open(dir.path()).unwrap(),
            healthy: Mutex::new(false),
        });
        let svc = service_with_blob(blob.clone());

        let record = svc.create_product(widget(serde_json::json!(6))).unwrap();
        assert!(record.is_pending_image());
        assert!(svc.get_record(&record.trace_id).unwrap().is_pending_image());

        let pending = svc
            .list_records(&ListParams::default(), &RecordFilter { pending_image: true })
            .unwrap();
        assert_eq!(pending.total, 1);

        *blob.healthy.lock().unwrap() = true;
        let repaired = svc.regenerate_code(&record.trace_id).unwrap();
        assert!(!repaired.is_pending_image());
        assert!(svc.code_image(&record.trace_id).is_ok());
    }

    #[test]
    fn regenerate_missing_record_is_not_found() {
        let (svc, _dir) = service();
        assert!(matches!(
            svc.regenerate_code("P20250101AAAAAA"),
            Err(TraceError::NotFound(_))
        ));
    }

    #[test]
    fn lookup_miss_logs_nothing() {
        let (svc, _dir) = service();
        let err = svc.resolve("P20250101AAAAAA", "10.0.0.1", "ua").unwrap_err();
        assert!(matches!(err, TraceError::NotFound(_)));
        assert_eq!(svc.scans.count_by_trace_id("P20250101AAAAAA").unwrap(), 0);
    }

    #[test]
    fn lookup_hit_logs_one_event() {
        let (svc, _dir) = service();
        let record = svc.create_product(widget(serde_json::json!(1))).unwrap();

        let found = svc.resolve(&record.trace_id, "10.0.0.1", "Scanner/1.0").unwrap();
        assert_eq!(found.trace_id, record.trace_id);

        let history = svc
            .scan_history(&record.trace_id, &ListParams::default())
            .unwrap();
        assert_eq!(history.total, 1);
        let event = &history.items[0];
        assert_eq!(event.trace_id, record.trace_id);
        assert_eq!(event.source_address, "10.0.0.1");
        assert_eq!(event.client_agent, "Scanner/1.0");
        assert!(event.scanned_at >= record.created_at);
    }

    #[test]
    fn logger_failure_does_not_fail_lookup() {
        let (svc, _dir) = service();
        let svc = svc.with_logger(Arc::new(BrokenLogger));
        let record = svc.create_product(widget(serde_json::json!(1))).unwrap();

        let found = svc.resolve(&record.trace_id, "", "").unwrap();
        assert_eq!(found, record);
    }

    #[test]
    fn admin_reads_do_not_log() {
        let (svc, _dir) = service();
        let record = svc.create_product(widget(serde_json::json!(1))).unwrap();
        svc.get_record(&record.trace_id).unwrap();
        svc.list_all().unwrap();
        assert_eq!(svc.scans.count_by_trace_id(&record.trace_id).unwrap(), 0);
    }

    #[test]
    fn concurrent_submissions_with_same_id() {
        let (svc, _dir) = service();
        let svc = Arc::new(svc.with_id_source(ScriptedIds::new(&[
            "P20250101CCCCCC",
            "P20250101CCCCCC",
            "P20250101DDDDDD",
        ])));

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let svc = Arc::clone(&svc);
                std::thread::spawn(move || svc.create_product(widget(serde_json::json!(i))))
            })
            .collect();
        let mut ids: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap().trace_id)
            .collect();
        ids.sort();

        assert_eq!(ids, vec!["P20250101CCCCCC", "P20250101DDDDDD"]);
        assert_eq!(svc.list_all().unwrap().len(), 2);
    }
}
