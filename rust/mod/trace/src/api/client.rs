use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Longest header value kept in a scan event.
const MAX_HEADER_LEN: usize = 512;

/// Who performed a public lookup, as far as the request tells.
///
/// Never rejects: missing headers and a missing peer address become empty
/// strings.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub source_address: String,
    pub client_agent: String,
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let source_address = forwarded_for(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_default();

        let client_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| truncate(s.trim(), MAX_HEADER_LEN))
            .unwrap_or_default();

        Ok(Self {
            source_address,
            client_agent,
        })
    }
}

/// First hop of `X-Forwarded-For`, if present and non-empty.
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(truncate(first, MAX_HEADER_LEN))
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
