use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Codes carried in the `code` field of every JSON error body.
///
/// A client branches on these. The `message` next to it is for operators
/// and may be reworded between releases.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const ENCODING_FAILED: &str = "ENCODING_FAILED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Error returned by HTTP handlers.
///
/// Domain crates convert their own errors into this at the route boundary.
/// It renders as `{"code": ..., "message": ...}`, for example
/// `{"code": "NOT_FOUND", "message": "trace record 'P20250101AAAAAA' not found"}`.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// 404: nothing is stored under the requested key.
    #[error("{0}")]
    NotFound(String),

    /// 409: the key is already taken.
    #[error("{0}")]
    Conflict(String),

    /// 400: the request body or query could not be accepted.
    #[error("{0}")]
    Validation(String),

    /// 500: a code image could not be rendered or written.
    #[error("{0}")]
    Encoding(String),

    /// 500: the database rejected or failed the operation.
    #[error("{0}")]
    Storage(String),
}

impl ServiceError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, error_code::NOT_FOUND),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, error_code::ALREADY_EXISTS),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, error_code::VALIDATION_FAILED),
            ServiceError::Encoding(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_code::ENCODING_FAILED)
            }
            ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, error_code::STORAGE_ERROR),
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.parts().1
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let body = serde_json::json!({
            "code": code,
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn variants_map_to_status_and_code() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT, "ALREADY_EXISTS"),
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            (
                ServiceError::Encoding("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "ENCODING_FAILED",
            ),
            (
                ServiceError::Storage("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status, "{err:?}");
            assert_eq!(err.error_code(), code, "{err:?}");
        }
    }

    #[test]
    fn response_is_json_with_matching_status() {
        let resp = ServiceError::Validation("productName is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn display_is_the_bare_message() {
        assert_eq!(ServiceError::NotFound("P1".into()).to_string(), "P1");
        assert_eq!(ServiceError::Encoding("bad image".into()).to_string(), "bad image");
    }
}
