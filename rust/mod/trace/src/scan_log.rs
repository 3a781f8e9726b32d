use std::sync::Arc;

use prodtrace_core::{ListParams, ListResult};
use prodtrace_sql::{Row, SQLStore, Value};

use crate::error::TraceError;
use crate::model::ScanEvent;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scan_events (
    id          TEXT PRIMARY KEY,
    data        TEXT NOT NULL,
    trace_id    TEXT NOT NULL,
    scanned_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scan_trace ON scan_events(trace_id);
";

/// Append-only sink for public lookup events.
pub trait LookupLogger: Send + Sync {
    fn record(&self, event: &ScanEvent) -> Result<(), TraceError>;
}

/// SQL-backed scan log. Events are never updated or deleted.
pub struct ScanLog {
    db: Arc<dyn SQLStore>,
}

impl ScanLog {
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, TraceError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| TraceError::Storage(format!("scan schema init: {e}")))?;
        Ok(Self { db })
    }

    /// Events for one trace id, newest first.
    pub fn list_by_trace_id(
        &self,
        trace_id: &str,
        params: &ListParams,
    ) -> Result<ListResult<ScanEvent>, TraceError> {
        let total = self.count_by_trace_id(trace_id)? as usize;

        let rows = self.db.query(
            "SELECT data FROM scan_events WHERE trace_id = ?1 \
             ORDER BY rowid DESC LIMIT ?2 OFFSET ?3",
            &[
                Value::Text(trace_id.to_string()),
                Value::Integer(params.effective_limit() as i64),
                Value::Integer(params.offset as i64),
            ],
        )?;

        let items = rows
            .iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListResult { items, total })
    }

    pub fn count_by_trace_id(&self, trace_id: &str) -> Result<u64, TraceError> {
        let rows = self.db.query(
            "SELECT COUNT(*) as cnt FROM scan_events WHERE trace_id = ?1",
            &[Value::Text(trace_id.to_string())],
        )?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as u64)
    }
}

impl LookupLogger for ScanLog {
    fn record(&self, event: &ScanEvent) -> Result<(), TraceError> {
        let data =
            serde_json::to_string(event).map_err(|e| TraceError::Storage(e.to_string()))?;
        self.db.exec(
            "INSERT INTO scan_events (id, data, trace_id, scanned_at) VALUES (?1, ?2, ?3, ?4)",
            &[
                Value::Text(event.id.clone()),
                Value::Text(data),
                Value::Text(event.trace_id.clone()),
                Value::Text(event.scanned_at.clone()),
            ],
        )?;
        Ok(())
    }
}

fn row_to_event(row: &Row) -> Result<ScanEvent, TraceError> {
    let json = row
        .get_str("data")
        .ok_or_else(|| TraceError::Storage("missing data column".into()))?;
    serde_json::from_str(json).map_err(|e| TraceError::Storage(format!("bad scan json: {e}")))
}
