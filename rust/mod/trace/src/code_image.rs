//! Code-image encoder: renders a record's lookup URL as a QR code and stores
//! it under a path derived only from the trace id.

use std::sync::Arc;

use prodtrace_blob::BlobStore;
use qrcode::QrCode;
use qrcode::render::svg;

use crate::error::TraceError;

/// File extension of stored code images.
pub const IMAGE_EXT: &str = "svg";

/// Smallest rendered edge, in pixels.
const MIN_DIMENSION: u32 = 256;

pub struct CodeImageEncoder {
    blob: Arc<dyn BlobStore>,
    base_url: String,
    dir: String,
}

impl CodeImageEncoder {
    /// `base_url` is prefixed verbatim to the trace id; `dir` is the blob key
    /// prefix images are written under.
    pub fn new(blob: Arc<dyn BlobStore>, base_url: &str, dir: &str) -> Self {
        Self {
            blob,
            base_url: base_url.to_string(),
            dir: dir.trim_matches('/').to_string(),
        }
    }

    /// URL encoded into the image. Trace ids are URL-safe, so no escaping.
    pub fn lookup_url(&self, trace_id: &str) -> String {
        format!("{}{}", self.base_url, trace_id)
    }

    /// Blob key of the image for `trace_id`. Depends on nothing else.
    pub fn image_path(&self, trace_id: &str) -> String {
        if self.dir.is_empty() {
            format!("{}.{}", trace_id, IMAGE_EXT)
        } else {
            format!("{}/{}.{}", self.dir, trace_id, IMAGE_EXT)
        }
    }

    /// Render and store the code image, returning its path.
    ///
    /// Re-encoding the same id overwrites the previous image at the same path.
    pub fn encode(&self, trace_id: &str) -> Result<String, TraceError> {
        let svg = render_svg(&self.lookup_url(trace_id))?;
        let path = self.image_path(trace_id);
        self.blob.put(&path, svg.as_bytes())?;
        Ok(path)
    }

    /// Read back a stored image, if any.
    pub fn load(&self, trace_id: &str) -> Result<Option<Vec<u8>>, TraceError> {
        self.blob
            .get(&self.image_path(trace_id))
            .map_err(|e| TraceError::Storage(e.to_string()))
    }
}

fn render_svg(url: &str) -> Result<String, TraceError> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| TraceError::Encoding(format!("qr: {}", e)))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodtrace_blob::FileStore;

    fn encoder(base_url: &str) -> (CodeImageEncoder, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FileStore::open(dir.path()).unwrap());
        (CodeImageEncoder::new(blob, base_url, "qrcodes"), dir)
    }

    #[test]
    fn encode_is_idempotent_on_path() {
        let (enc, dir) = encoder("https://trace.example.com/p/");
        let first = enc.encode("P20250101A1B2C3").unwrap();
        let second = enc.encode("P20250101A1B2C3").unwrap();
        assert_eq!(first, "qrcodes/P20250101A1B2C3.svg");
        assert_eq!(first, second);
        assert!(dir.path().join("qrcodes/P20250101A1B2C3.svg").is_file());
    }

    #[test]
    fn stored_image_is_svg() {
        let (enc, _dir) = encoder("https://trace.example.com/p/");
        enc.encode("P20250101A1B2C3").unwrap();
        let bytes = enc.load("P20250101A1B2C3").unwrap().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("<svg"));
        assert!(enc.load("P20250101FFFFFF").unwrap().is_none());
    }

    #[test]
    fn lookup_url_is_base_plus_id() {
        let (enc, _dir) = encoder("https://trace.example.com/trace_page.html?trace_id=");
        assert_eq!(
            enc.lookup_url("P20250101A1B2C3"),
            "https://trace.example.com/trace_page.html?trace_id=P20250101A1B2C3"
        );
    }

    #[test]
    fn dir_slashes_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FileStore::open(dir.path()).unwrap());
        let enc = CodeImageEncoder::new(blob.clone(), "http://x/", "/codes/");
        assert_eq!(enc.image_path("P1"), "codes/P1.svg");
        let flat = CodeImageEncoder::new(blob, "http://x/", "");
        assert_eq!(flat.image_path("P1"), "P1.svg");
    }

    #[test]
    fn oversized_payload_is_an_encoding_error() {
        let (enc, _dir) = encoder(&"x".repeat(8000));
        assert!(matches!(
            enc.encode("P20250101A1B2C3"),
            Err(TraceError::Encoding(_))
        ));
    }
}
