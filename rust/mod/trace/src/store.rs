use std::sync::Arc;

use prodtrace_core::{ListParams, ListResult, now_rfc3339};
use prodtrace_sql::{Row, SQLStore, Value};

use crate::error::TraceError;
use crate::model::TraceRecord;

/// SQL schema for the trace_records table.
///
/// The full record lives in `data` as JSON; the other columns are extracted
/// for uniqueness and filtering. `rowid` gives insertion order.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trace_records (
    trace_id        TEXT PRIMARY KEY,
    data            TEXT NOT NULL,
    product_name    TEXT NOT NULL,
    code_image_path TEXT NOT NULL DEFAULT '',
    create_at       TEXT NOT NULL,
    update_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trace_image ON trace_records(code_image_path);
";

/// Listing filters.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    /// Only records whose code image is still missing.
    pub pending_image: bool,
}

/// Persistent storage for trace records, backed by SQLStore (SQLite).
pub struct TraceStore {
    db: Arc<dyn SQLStore>,
}

impl TraceStore {
    /// Create a new TraceStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, TraceError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| TraceError::Storage(format!("trace schema init: {e}")))?;
        Ok(Self { db })
    }

    /// Insert a new record. Fails with `DuplicateKey` if the id is taken.
    pub fn insert(&self, record: &TraceRecord) -> Result<(), TraceError> {
        let data =
            serde_json::to_string(record).map_err(|e| TraceError::Storage(e.to_string()))?;

        self.db
            .exec(
                "INSERT INTO trace_records \
                 (trace_id, data, product_name, code_image_path, create_at, update_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                &[
                    Value::Text(record.trace_id.clone()),
                    Value::Text(data),
                    Value::Text(record.product_name.clone()),
                    Value::Text(record.code_image_path.clone()),
                    Value::Text(record.created_at.clone()),
                    Value::Text(record.updated_at.clone()),
                ],
            )
            .map_err(|e| {
                if e.is_constraint() {
                    TraceError::DuplicateKey(record.trace_id.clone())
                } else {
                    TraceError::from(e)
                }
            })?;

        Ok(())
    }

    /// Get a record by trace id.
    pub fn find_by_trace_id(&self, trace_id: &str) -> Result<Option<TraceRecord>, TraceError> {
        let rows = self.db.query(
            "SELECT data FROM trace_records WHERE trace_id = ?1",
            &[Value::Text(trace_id.to_string())],
        )?;

        rows.first().map(row_to_record).transpose()
    }

    /// Set the code image path and refresh `updatedAt`. Returns the updated record.
    pub fn update_image_path(&self, trace_id: &str, path: &str) -> Result<TraceRecord, TraceError> {
        let mut record = self
            .find_by_trace_id(trace_id)?
            .ok_or_else(|| TraceError::NotFound(trace_id.to_string()))?;

        record.code_image_path = path.to_string();
        record.updated_at = now_rfc3339();

        let data =
            serde_json::to_string(&record).map_err(|e| TraceError::Storage(e.to_string()))?;

        let affected = self.db.exec(
            "UPDATE trace_records SET data = ?1, code_image_path = ?2, update_at = ?3 \
             WHERE trace_id = ?4",
            &[
                Value::Text(data),
                Value::Text(record.code_image_path.clone()),
                Value::Text(record.updated_at.clone()),
                Value::Text(record.trace_id.clone()),
            ],
        )?;

        if affected == 0 {
            return Err(TraceError::NotFound(trace_id.to_string()));
        }
        Ok(record)
    }

    /// All records, newest insertion first.
    pub fn list_all(&self) -> Result<Vec<TraceRecord>, TraceError> {
        let rows = self
            .db
            .query("SELECT data FROM trace_records ORDER BY rowid DESC", &[])?;
        rows.iter().map(row_to_record).collect()
    }

    /// One page of records, newest insertion first, with the total count.
    pub fn list(
        &self,
        params: &ListParams,
        filter: &RecordFilter,
    ) -> Result<ListResult<TraceRecord>, TraceError> {
        let where_sql = if filter.pending_image {
            "WHERE code_image_path = ''"
        } else {
            ""
        };

        let count_sql = format!("SELECT COUNT(*) as cnt FROM trace_records {where_sql}");
        let total = self
            .db
            .query(&count_sql, &[])?
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let select_sql = format!(
            "SELECT data FROM trace_records {where_sql} ORDER BY rowid DESC LIMIT ?1 OFFSET ?2"
        );
        let rows = self.db.query(
            &select_sql,
            &[
                Value::Integer(params.effective_limit() as i64),
                Value::Integer(params.offset as i64),
            ],
        )?;

        let items = rows
            .iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListResult { items, total })
    }
}

/// Deserialize a TraceRecord from a row's `data` JSON column.
fn row_to_record(row: &Row) -> Result<TraceRecord, TraceError> {
    let json = row
        .get_str("data")
        .ok_or_else(|| TraceError::Storage("missing data column".into()))?;
    serde_json::from_str(json).map_err(|e| TraceError::Storage(format!("bad record json: {e}")))
}
