use serde::{Deserialize, Serialize};

use prodtrace_core::{new_id, now_rfc3339};

/// Traceability metadata for one manufactured unit or batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    /// Public lookup key (e.g. "P20251126A1B2C3"). Immutable.
    pub trace_id: String,

    pub product_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_origin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_batch: Option<String>,

    /// Applicable product standard (e.g. "GB/T 1234-2020").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_description: Option<String>,

    /// Opaque producer-defined text, often JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_parameters: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_batch: Option<String>,

    /// Free-form; not validated as a date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qc_result: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qc_inspector: Option<String>,

    #[serde(default)]
    pub warranty_months: u32,

    /// Blob key of the code image. Empty while the image is pending.
    #[serde(default)]
    pub code_image_path: String,

    pub created_at: String,

    pub updated_at: String,
}

impl TraceRecord {
    /// True while no code image has been stored for this record.
    pub fn is_pending_image(&self) -> bool {
        self.code_image_path.is_empty()
    }
}

/// One successful public lookup of a trace id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub id: String,

    /// Trace id by value; not a reference to a live record.
    pub trace_id: String,

    #[serde(default)]
    pub source_address: String,

    #[serde(default)]
    pub client_agent: String,

    pub scanned_at: String,
}

impl ScanEvent {
    /// Build a new event stamped with the current time.
    pub fn new(trace_id: &str, source_address: &str, client_agent: &str) -> Self {
        Self {
            id: new_id(),
            trace_id: trace_id.to_string(),
            source_address: source_address.to_string(),
            client_agent: client_agent.to_string(),
            scanned_at: now_rfc3339(),
        }
    }
}

/// Producer-supplied fields of a new product, as submitted by the admin
/// form (urlencoded) or the JSON API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub material_origin: Option<String>,
    #[serde(default)]
    pub material_batch: Option<String>,
    #[serde(default)]
    pub standard_code: Option<String>,
    #[serde(default)]
    pub function_description: Option<String>,
    #[serde(default)]
    pub key_parameters: Option<String>,
    #[serde(default)]
    pub production_batch: Option<String>,
    #[serde(default)]
    pub production_date: Option<String>,
    #[serde(default)]
    pub production_line: Option<String>,
    #[serde(default)]
    pub qc_result: Option<String>,
    #[serde(default)]
    pub qc_inspector: Option<String>,

    /// Raw value: a form string, a JSON number, or anything else.
    #[serde(default)]
    pub warranty_months: Option<serde_json::Value>,
}

impl NewProduct {
    /// Build the record for this submission. The trace id and timestamps
    /// are filled in by the caller for every insert attempt.
    pub fn to_record(&self, product_name: String) -> TraceRecord {
        TraceRecord {
            trace_id: String::new(),
            product_name,
            model: self.model.clone(),
            material: self.material.clone(),
            material_origin: self.material_origin.clone(),
            material_batch: self.material_batch.clone(),
            standard_code: self.standard_code.clone(),
            function_description: self.function_description.clone(),
            key_parameters: self.key_parameters.clone(),
            production_batch: self.production_batch.clone(),
            production_date: self.production_date.clone(),
            production_line: self.production_line.clone(),
            qc_result: self.qc_result.clone(),
            qc_inspector: self.qc_inspector.clone(),
            warranty_months: coerce_warranty_months(self.warranty_months.as_ref()),
            code_image_path: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

/// Coerce a submitted warranty value to months.
///
/// Absent, blank, negative, fractional, out-of-range or non-numeric input
/// all become 0.
pub fn coerce_warranty_months(raw: Option<&serde_json::Value>) -> u32 {
    match raw {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn warranty_coercion() {
        assert_eq!(coerce_warranty_months(None), 0);
        assert_eq!(coerce_warranty_months(Some(&json!(""))), 0);
        assert_eq!(coerce_warranty_months(Some(&json!("abc"))), 0);
        assert_eq!(coerce_warranty_months(Some(&json!("-3"))), 0);
        assert_eq!(coerce_warranty_months(Some(&json!("12.5"))), 0);
        assert_eq!(coerce_warranty_months(Some(&json!(" 24 "))), 24);
        assert_eq!(coerce_warranty_months(Some(&json!(36))), 36);
        assert_eq!(coerce_warranty_months(Some(&json!(-1))), 0);
        assert_eq!(coerce_warranty_months(Some(&json!(1.5))), 0);
        assert_eq!(coerce_warranty_months(Some(&json!(null))), 0);
        assert_eq!(coerce_warranty_months(Some(&json!(u64::MAX))), 0);
    }

    #[test]
    fn new_product_from_json() {
        let input: NewProduct = serde_json::from_value(json!({
            "productName": "Widget",
            "qcResult": "PASS",
            "warrantyMonths": 12,
        }))
        .unwrap();
        let record = input.to_record("Widget".into());
        assert_eq!(record.product_name, "Widget");
        assert_eq!(record.qc_result.as_deref(), Some("PASS"));
        assert_eq!(record.warranty_months, 12);
        assert!(record.model.is_none());
        assert!(record.is_pending_image());
    }

    #[test]
    fn record_json_uses_camel_case() {
        let mut record = NewProduct::default().to_record("Widget".into());
        record.trace_id = "P20250101AAAAAA".into();
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["traceId"], "P20250101AAAAAA");
        assert_eq!(v["codeImagePath"], "");
        assert_eq!(v["warrantyMonths"], 0);
        assert!(v.get("model").is_none());
    }

    #[test]
    fn scan_event_is_stamped() {
        let e = ScanEvent::new("P20250101AAAAAA", "10.0.0.1", "curl/8.0");
        assert_eq!(e.trace_id, "P20250101AAAAAA");
        assert_eq!(e.id.len(), 32);
        assert!(e.scanned_at.ends_with('Z'));
    }
}
