//! Server-rendered pages for the public lookup and the admin screens.

use crate::model::TraceRecord;

/// Admin product registration form.
pub const PRODUCT_FORM: &str = include_str!("product_form.html");

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>
  body { font-family: system-ui, sans-serif; margin: 0; background: #fafafa; color: #18181b; }
  main { max-width: 560px; margin: 1.5rem auto; padding: 0 1rem; }
  table { width: 100%; border-collapse: collapse; }
  th, td { text-align: left; padding: .45rem .3rem; border-bottom: 1px solid #e4e4e7; vertical-align: top; }
  th { color: #71717a; font-weight: 500; width: 40%; }
  .code img { width: 160px; height: 160px; }
  .list { max-width: 960px; }
  .list th { width: auto; }
  .list img { width: 64px; height: 64px; }
</style>
"#;

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Public product page for a resolved record.
pub fn record_page(record: &TraceRecord) -> String {
    let id = escape_html(&record.trace_id);
    let name = escape_html(&record.product_name);

    let mut rows = String::new();
    push_row(&mut rows, "Trace ID", Some(&record.trace_id));
    push_row(&mut rows, "Product", Some(&record.product_name));
    push_row(&mut rows, "Model", record.model.as_deref());
    push_row(&mut rows, "Material", record.material.as_deref());
    push_row(&mut rows, "Material origin", record.material_origin.as_deref());
    push_row(&mut rows, "Material batch", record.material_batch.as_deref());
    push_row(&mut rows, "Standard", record.standard_code.as_deref());
    push_row(&mut rows, "Function", record.function_description.as_deref());
    push_row(&mut rows, "Key parameters", record.key_parameters.as_deref());
    push_row(&mut rows, "Production batch", record.production_batch.as_deref());
    push_row(&mut rows, "Production date", record.production_date.as_deref());
    push_row(&mut rows, "Production line", record.production_line.as_deref());
    push_row(&mut rows, "QC result", record.qc_result.as_deref());
    push_row(&mut rows, "QC inspector", record.qc_inspector.as_deref());
    let warranty = format!("{} months", record.warranty_months);
    push_row(&mut rows, "Warranty", Some(&warranty));

    let code = if record.is_pending_image() {
        String::new()
    } else {
        format!(r#"<p class="code"><img src="/codes/{id}" alt="code for {id}"></p>"#)
    };

    format!(
        "{PAGE_HEAD}<title>{name}</title>\n</head>\n<body>\n<main>\n<h1>{name}</h1>\n\
         <table>\n{rows}</table>\n{code}\n</main>\n</body>\n</html>\n"
    )
}

/// Page shown when a trace id does not resolve.
pub fn not_found_page(trace_id: &str) -> String {
    let id = escape_html(trace_id);
    format!(
        "{PAGE_HEAD}<title>Not found</title>\n</head>\n<body>\n<main>\n\
         <h1>Product not found</h1>\n<p>No product is registered under <code>{id}</code>.</p>\n\
         </main>\n</body>\n</html>\n"
    )
}

/// Admin landing page: every record, newest first, with its code.
pub fn admin_list_page(records: &[TraceRecord]) -> String {
    let mut rows = String::new();
    for record in records {
        let id = escape_html(&record.trace_id);
        let code = if record.is_pending_image() {
            "<em>pending</em>".to_string()
        } else {
            format!(r#"<img src="/codes/{id}" alt="code for {id}">"#)
        };
        rows.push_str(&format!(
            "<tr><td><a href=\"/p/{id}\">{id}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{code}</td></tr>\n",
            escape_html(&record.product_name),
            escape_html(record.model.as_deref().unwrap_or("")),
            escape_html(&record.created_at),
        ));
    }
    if records.is_empty() {
        rows.push_str("<tr><td colspan=\"5\">No products yet.</td></tr>\n");
    }

    format!(
        "{PAGE_HEAD}<title>Products</title>\n</head>\n<body>\n<main class=\"list\">\n\
         <h1>Products</h1>\n<p><a href=\"/admin/products/new\">Register a product</a></p>\n\
         <table>\n<tr><th>Trace ID</th><th>Product</th><th>Model</th><th>Created</th><th>Code</th></tr>\n\
         {rows}</table>\n</main>\n</body>\n</html>\n"
    )
}

fn push_row(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        out.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            label,
            escape_html(v)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewProduct;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn record_page_shows_fields_and_skips_empty() {
        let input = NewProduct {
            material: Some("PA66 <GF30>".into()),
            qc_result: Some(String::new()),
            ..Default::default()
        };
        let mut record = input.to_record("Widget".into());
        record.trace_id = "P20250101A1B2C3".into();

        let html = record_page(&record);
        assert!(html.contains("<h1>Widget</h1>"));
        assert!(html.contains("PA66 &lt;GF30&gt;"));
        assert!(!html.contains("QC result"));
        assert!(!html.contains("/codes/"));

        record.code_image_path = "qrcodes/P20250101A1B2C3.svg".into();
        assert!(record_page(&record).contains(r#"src="/codes/P20250101A1B2C3""#));
    }

    #[test]
    fn not_found_page_escapes_id() {
        let html = not_found_page("<script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn admin_list_links_records_and_marks_pending() {
        let input = NewProduct {
            model: Some("W-1".into()),
            ..Default::default()
        };
        let mut done = input.to_record("Gear & Axle".into());
        done.trace_id = "P20250101AAAAAA".into();
        done.code_image_path = "qrcodes/P20250101AAAAAA.svg".into();
        let mut pending = input.to_record("Spring".into());
        pending.trace_id = "P20250101BBBBBB".into();

        let html = admin_list_page(&[done, pending]);
        assert!(html.contains(r#"<a href="/p/P20250101AAAAAA">P20250101AAAAAA</a>"#));
        assert!(html.contains("Gear &amp; Axle"));
        assert!(html.contains(r#"src="/codes/P20250101AAAAAA""#));
        assert!(!html.contains(r#"src="/codes/P20250101BBBBBB""#));
        assert!(html.contains("<em>pending</em>"));
        assert!(!html.contains("No products yet."));
    }

    #[test]
    fn admin_list_empty() {
        assert!(admin_list_page(&[]).contains("No products yet."));
    }

    #[test]
    fn form_posts_camel_case_fields() {
        assert!(PRODUCT_FORM.contains(r#"action="/admin/products""#));
        assert!(PRODUCT_FORM.contains(r#"name="productName""#));
        assert!(PRODUCT_FORM.contains(r#"name="warrantyMonths""#));
    }
}
