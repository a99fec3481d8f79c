//! Per-request exchange logging.
//!
//! [`log_exchange`] runs behind [`correlation::propagate`]: it captures the
//! request line and a masked copy of the headers, awaits the rest of the
//! chain exactly once while timing it, and emits one [`RequestLogRecord`]
//! on the channel picked from the path. A panicking downstream is logged
//! with status 500 and then resumed unchanged.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;
use serde::Serialize;
use tracing::Level;

use super::correlation::{self, CorrelationId};
use crate::logging::{ExchangeLogger, LogChannel};

pub const MASK: &str = "*****";

/// Headers whose values never reach a log line.
pub const MASKED_HEADERS: &[&str] = &["authorization", "cookie"];

const UNKNOWN_CORRELATION_ID: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestLogRecord {
    pub path: String,
    pub method: String,
    pub status: u16,
    pub duration_ms: u64,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    pub headers: BTreeMap<String, String>,
}

/// Emitted instead of a [`RequestLogRecord`] when one cannot be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackLogRecord {
    pub path: String,
    pub method: String,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("header '{0}' is not valid text")]
    UnreadableHeader(String),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Copy request headers into a loggable map, masking credentials.
///
/// Repeated headers are joined with `", "`. Keys are the lowercase names
/// hyper hands over; the wire casing is not preserved.
pub fn mask_headers(headers: &HeaderMap) -> Result<BTreeMap<String, String>, RecordError> {
    let mut masked: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let key = name.as_str();
        let value = if MASKED_HEADERS.iter().any(|m| key.eq_ignore_ascii_case(m)) {
            MASK
        } else {
            value
                .to_str()
                .map_err(|_| RecordError::UnreadableHeader(key.to_string()))?
        };
        masked
            .entry(key.to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    Ok(masked)
}

/// What is known about a request before the downstream chain runs.
#[derive(Debug)]
struct Captured {
    path: String,
    method: String,
    channel: LogChannel,
    headers: Result<BTreeMap<String, String>, RecordError>,
}

fn render_line(
    captured: Captured,
    status: u16,
    duration_ms: u64,
    correlation_id: String,
) -> String {
    let Captured {
        path,
        method,
        headers,
        ..
    } = captured;

    let full = headers.and_then(|headers| {
        let record = RequestLogRecord {
            path: path.clone(),
            method: method.clone(),
            status,
            duration_ms,
            correlation_id: correlation_id.clone(),
            headers,
        };
        serde_json::to_string(&record).map_err(RecordError::from)
    });

    full.unwrap_or_else(|e| {
        let fallback = FallbackLogRecord {
            path,
            method,
            correlation_id,
            error: e.to_string(),
        };
        // Plain strings only; rendering through `json!` cannot fail.
        serde_json::json!({
            "path": fallback.path,
            "method": fallback.method,
            "correlationId": fallback.correlation_id,
            "error": fallback.error,
        })
        .to_string()
    })
}

pub async fn log_exchange(
    State(logger): State<Arc<dyn ExchangeLogger>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let captured = Captured {
        channel: LogChannel::for_path(&path),
        method: req.method().to_string(),
        headers: mask_headers(req.headers()),
        path,
    };
    let request_id = req.extensions().get::<CorrelationId>().cloned();

    let start = Instant::now();
    let outcome = AssertUnwindSafe(next.run(req)).catch_unwind().await;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let status = match &outcome {
        Ok(response) => response.status().as_u16(),
        Err(_) => 500,
    };
    let correlation_id = correlation::current()
        .or(request_id)
        .map_or_else(|| UNKNOWN_CORRELATION_ID.to_string(), |id| id.to_string());

    let channel = captured.channel;
    let level = if logger.debug_enabled(channel) {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let line = render_line(captured, status, duration_ms, correlation_id);
    logger.emit(channel, level, &line);

    match outcome {
        Ok(response) => response,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn captured(headers: &HeaderMap) -> Captured {
        Captured {
            path: "/test1".into(),
            method: "GET".into(),
            channel: LogChannel::Internal,
            headers: mask_headers(headers),
        }
    }

    #[test]
    fn masks_credentials_and_keeps_the_rest() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("cookie", HeaderValue::from_static("session=abc"));
        headers.insert("accept", HeaderValue::from_static("application/json"));
        headers.insert("x-request-id", HeaderValue::from_static("correlation-001"));

        let masked = mask_headers(&headers).unwrap();
        assert_eq!(masked["authorization"], MASK);
        assert_eq!(masked["cookie"], MASK);
        assert_eq!(masked["accept"], "application/json");
        assert_eq!(masked["x-request-id"], "correlation-001");
        assert!(!masked.values().any(|v| v.contains("secret")));
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept-language", HeaderValue::from_static("en"));
        headers.append("accept-language", HeaderValue::from_static("fr"));
        headers.append("cookie", HeaderValue::from_static("a=1"));
        headers.append("cookie", HeaderValue::from_static("b=2"));

        let masked = mask_headers(&headers).unwrap();
        assert_eq!(masked["accept-language"], "en, fr");
        assert_eq!(masked["cookie"], format!("{MASK}, {MASK}"));
    }

    #[test]
    fn unreadable_masked_header_is_still_masked() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_bytes(b"s=\xff").unwrap());
        assert_eq!(mask_headers(&headers).unwrap()["cookie"], MASK);
    }

    #[test]
    fn record_uses_wire_field_names() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic xyz"));
        let line = render_line(captured(&headers), 200, 3, "correlation-001".into());

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["path"], "/test1");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["status"], 200);
        assert_eq!(value["duration_ms"], 3);
        assert_eq!(value["correlationId"], "correlation-001");
        assert_eq!(value["headers"]["authorization"], MASK);
    }

    #[test]
    fn unreadable_header_produces_fallback_record() {
        let mut headers = HeaderMap::new();
        headers.insert("x-note", HeaderValue::from_bytes(b"caf\xe9").unwrap());
        let line = render_line(captured(&headers), 200, 1, "correlation-002".into());

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["path"], "/test1");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["correlationId"], "correlation-002");
        assert_eq!(value["error"], "header 'x-note' is not valid text");
        assert!(value.get("headers").is_none());
    }
}
