//! Correlation id resolution and request-scoped context.
//!
//! [`propagate`] is the first stage behind the origin check. It reuses a
//! non-empty inbound `X-Request-Id` or generates a UUID v4, stores the
//! value in the request extensions, enters the task-local slot for the
//! rest of the chain and echoes the header on every response.
//!
//! The slot is a `tokio::task_local!`: it lives exactly as long as the
//! scoped future, so a value can never outlive its request or be seen by
//! a concurrent one.

use std::fmt;

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

tokio::task_local! {
    static CURRENT: CorrelationId;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Reuse the inbound header value when usable, otherwise generate.
    #[must_use]
    pub fn resolve(inbound: Option<&HeaderValue>) -> Self {
        inbound
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(Self::generate, |s| Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The correlation id of the request being processed by this task, if any.
#[must_use]
pub fn current() -> Option<CorrelationId> {
    CURRENT.try_with(Clone::clone).ok()
}

/// Run `fut` with `id` as the current correlation id.
pub async fn scope<F>(id: CorrelationId, fut: F) -> F::Output
where
    F: std::future::Future,
{
    CURRENT.scope(id, fut).await
}

pub async fn propagate(mut req: Request, next: Next) -> Response {
    let id = CorrelationId::resolve(req.headers().get(&X_REQUEST_ID));
    req.extensions_mut().insert(id.clone());

    let mut response = scope(id.clone(), next.run(req)).await;

    // Resolved ids are either a uuid or an inbound header value, both valid.
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_inbound_value() {
        let inbound = HeaderValue::from_static("correlation-001");
        assert_eq!(
            CorrelationId::resolve(Some(&inbound)).as_str(),
            "correlation-001"
        );
    }

    #[test]
    fn generates_when_absent() {
        let id = CorrelationId::resolve(None);
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn generates_when_blank() {
        let inbound = HeaderValue::from_static("   ");
        let id = CorrelationId::resolve(Some(&inbound));
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn generates_when_not_text() {
        let inbound = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        let id = CorrelationId::resolve(Some(&inbound));
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
    }

    #[tokio::test]
    async fn slot_is_set_inside_scope_only() {
        assert!(current().is_none());
        let seen = scope(CorrelationId("abc".into()), async { current() }).await;
        assert_eq!(seen.unwrap().as_str(), "abc");
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn concurrent_scopes_are_isolated() {
        let a = tokio::spawn(scope(CorrelationId("a".into()), async {
            tokio::task::yield_now().await;
            current()
        }));
        let b = tokio::spawn(scope(CorrelationId("b".into()), async {
            tokio::task::yield_now().await;
            current()
        }));
        assert_eq!(a.await.unwrap().unwrap().as_str(), "a");
        assert_eq!(b.await.unwrap().unwrap().as_str(), "b");
    }
}
