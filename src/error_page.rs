//! Error page rendering.
//!
//! Handlers and the panic boundary do not build error bodies themselves;
//! they return a bare status carrying an [`ErrorPage`] extension. The
//! [`render`] stage, which knows the request path and what the client
//! accepts, turns that into either an HTML page (browsers) or a JSON
//! document with the same fields: status, error, message, path and
//! timestamp.

use std::any::Any;

use axum::extract::Request;
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Marker asking [`render`] to replace the response body.
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub message: String,
}

impl ErrorPage {
    #[must_use]
    pub fn response(status: StatusCode, message: impl Into<String>) -> Response {
        let mut response = status.into_response();
        response.extensions_mut().insert(Self {
            message: message.into(),
        });
        response
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub timestamp: NaiveDateTime,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

/// Fallback for paths no route matches.
pub async fn not_found() -> Response {
    ErrorPage::response(StatusCode::NOT_FOUND, "No handler found for this path")
}

/// Response for a handler that panicked, used by `CatchPanicLayer`.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = %detail, "request handler panicked");

    ErrorPage::response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[must_use]
pub fn render_html(body: &ErrorBody) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{status} {error}</title></head>\n<body>\n\
         <h1>{status} {error}</h1>\n\
         <p>{message}</p>\n\
         <dl>\n<dt>Path</dt><dd>{path}</dd>\n<dt>Timestamp</dt><dd>{timestamp}</dd>\n</dl>\n\
         </body>\n</html>\n",
        status = body.status,
        error = escape_html(&body.error),
        message = escape_html(&body.message),
        path = escape_html(&body.path),
        timestamp = body.timestamp.format("%Y-%m-%dT%H:%M:%S"),
    )
}

pub async fn render(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let html = accepts_html(req.headers());

    let response = next.run(req).await;
    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let status = response.status();
    let body = ErrorBody {
        timestamp: Local::now().naive_local(),
        status: status.as_u16(),
        error: status.canonical_reason().unwrap_or("Unknown").to_string(),
        message: page.message,
        path,
    };

    if html {
        (status, Html(render_html(&body))).into_response()
    } else {
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn body(path: &str) -> ErrorBody {
        ErrorBody {
            timestamp: Local::now().naive_local(),
            status: 404,
            error: "Not Found".into(),
            message: "No handler found for this path".into(),
            path: path.into(),
        }
    }

    #[test]
    fn html_page_shows_all_fields() {
        let page = render_html(&body("/missing"));
        assert!(page.contains("<h1>404 Not Found</h1>"));
        assert!(page.contains("No handler found for this path"));
        assert!(page.contains("<dd>/missing</dd>"));
        assert!(page.contains("<dt>Timestamp</dt>"));
    }

    #[test]
    fn html_page_escapes_path() {
        let page = render_html(&body("/<script>alert('x')</script>"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    }

    #[test]
    fn browser_accept_header_selects_html() {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        assert!(accepts_html(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!accepts_html(&headers));
        assert!(!accepts_html(&HeaderMap::new()));
    }

    #[test]
    fn panic_payloads_become_500_pages() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ErrorPage>().is_some());

        let response = panic_response(Box::new(String::from("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
