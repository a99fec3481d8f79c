//! Origin-based access control for browser clients.
//!
//! [`OriginPolicy`] is built once from the active profile and shared
//! read-only. [`enforce`] is the outermost stage of the pipeline:
//!
//! - no `Origin` header: the request passes through untouched;
//! - preflight (`OPTIONS` + `Origin` + `Access-Control-Request-Method`):
//!   answered here, `200` for an allowed origin, `403` otherwise;
//! - any other request with an allowed origin: handled normally, CORS
//!   headers added to the response;
//! - any other request with an unknown origin: `403` before correlation,
//!   logging or routing see it.
//!
//! Origins match exactly (byte-wise, case-sensitive). The response never
//! carries a wildcard, and credentials are always allowed.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::model::CorsSection;
use crate::config::validation::validate_origin;
use crate::error::{TimelabError, ValidationError};

pub const ALLOWED_METHODS: &[&str] = &["GET", "POST", "OPTIONS", "PUT", "DELETE"];

pub const ALLOWED_HEADERS: &[&str] = &["Authorization", "Content-Type", "X-Request-Id"];

pub const EXPOSED_HEADERS: &[&str] = &["X-Request-Id"];

const REJECTION_BODY: &str = "Invalid CORS request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No `Origin` header.
    NotCors,
    Preflight(HeaderValue),
    Allowed(HeaderValue),
    Rejected(HeaderValue),
}

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed_origins: Vec<HeaderValue>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    expose_headers: HeaderValue,
    max_age: HeaderValue,
}

fn invalid(field: &str, message: String) -> TimelabError {
    TimelabError::ConfigValidation {
        errors: vec![ValidationError {
            profile: "(cors)".into(),
            field: field.into(),
            message,
            suggestion: None,
        }],
    }
}

fn joined(items: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl OriginPolicy {
    /// Build the policy, refusing wildcard and malformed origins.
    pub fn from_config(cors: &CorsSection) -> Result<Self, TimelabError> {
        let origins = cors.origins();
        if origins.is_empty() {
            return Err(invalid(
                "cors.allowed-origins",
                "at least one allowed origin must be configured".into(),
            ));
        }

        let allowed_origins = origins
            .iter()
            .map(|origin| {
                validate_origin(origin)
                    .map_err(|(message, _)| invalid("cors.allowed-origins", message))?;
                HeaderValue::from_str(origin).map_err(|_| {
                    invalid(
                        "cors.allowed-origins",
                        format!("'{origin}' is not a valid header value"),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let header = |value: String| {
            HeaderValue::from_str(&value)
                .map_err(|_| invalid("cors", format!("'{value}' is not a valid header value")))
        };

        Ok(Self {
            allowed_origins,
            allow_methods: header(joined(ALLOWED_METHODS))?,
            allow_headers: header(joined(ALLOWED_HEADERS))?,
            expose_headers: header(joined(EXPOSED_HEADERS))?,
            max_age: HeaderValue::from(cors.max_age),
        })
    }

    #[must_use]
    pub fn allowed_origins(&self) -> &[HeaderValue] {
        &self.allowed_origins
    }

    #[must_use]
    pub fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    #[must_use]
    pub fn evaluate(&self, method: &Method, headers: &HeaderMap) -> Decision {
        let Some(origin) = headers.get(ORIGIN).cloned() else {
            return Decision::NotCors;
        };

        let preflight =
            *method == Method::OPTIONS && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD);

        match (self.is_allowed(&origin), preflight) {
            (false, _) => Decision::Rejected(origin),
            (true, true) => Decision::Preflight(origin),
            (true, false) => Decision::Allowed(origin),
        }
    }

    #[must_use]
    pub fn preflight_response(&self, origin: HeaderValue) -> Response {
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        headers.append(VARY, HeaderValue::from_static("Origin"));
        response
    }

    pub fn decorate(&self, origin: HeaderValue, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, self.expose_headers.clone());
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
}

pub async fn enforce(
    State(policy): State<Arc<OriginPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    match policy.evaluate(req.method(), req.headers()) {
        Decision::NotCors => next.run(req).await,
        Decision::Preflight(origin) => policy.preflight_response(origin),
        Decision::Allowed(origin) => {
            let mut response = next.run(req).await;
            policy.decorate(origin, response.headers_mut());
            response
        }
        Decision::Rejected(origin) => {
            tracing::debug!(
                origin = ?origin,
                method = %req.method(),
                path = %req.uri().path(),
                "cross-origin request rejected"
            );
            (StatusCode::FORBIDDEN, REJECTION_BODY).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(origins: &str) -> OriginPolicy {
        OriginPolicy::from_config(&CorsSection::new(origins)).unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn wildcard_is_refused_at_build_time() {
        assert!(OriginPolicy::from_config(&CorsSection::new("*")).is_err());
        assert!(OriginPolicy::from_config(&CorsSection::new("http://a.test, *")).is_err());
    }

    #[test]
    fn empty_allow_list_is_refused() {
        assert!(OriginPolicy::from_config(&CorsSection::new("")).is_err());
    }

    #[test]
    fn allow_list_keeps_configured_order() {
        let policy = policy("http://localhost:3000, http://127.0.0.1:3000");
        assert_eq!(
            policy.allowed_origins(),
            &[
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        );
    }

    #[test]
    fn request_without_origin_is_not_cors() {
        let policy = policy("http://testclient.local");
        assert_eq!(
            policy.evaluate(&Method::GET, &HeaderMap::new()),
            Decision::NotCors
        );
    }

    #[test]
    fn preflight_needs_request_method_header() {
        let policy = policy("http://testclient.local");
        let with = headers(&[
            ("origin", "http://testclient.local"),
            ("access-control-request-method", "GET"),
        ]);
        let without = headers(&[("origin", "http://testclient.local")]);

        assert!(matches!(
            policy.evaluate(&Method::OPTIONS, &with),
            Decision::Preflight(_)
        ));
        assert!(matches!(
            policy.evaluate(&Method::OPTIONS, &without),
            Decision::Allowed(_)
        ));
    }

    #[test]
    fn match_is_exact_and_case_sensitive() {
        let policy = policy("http://testclient.local");
        for origin in [
            "http://TestClient.local",
            "https://testclient.local",
            "http://testclient.local:80",
            "http://testclient.local.evil.com",
        ] {
            let mut map = HeaderMap::new();
            map.insert(ORIGIN, HeaderValue::from_str(origin).unwrap());
            assert!(
                matches!(policy.evaluate(&Method::GET, &map), Decision::Rejected(_)),
                "{origin}"
            );
        }
    }

    #[test]
    fn unknown_origin_preflight_is_rejected() {
        let policy = policy("http://testclient.local");
        let map = headers(&[
            ("origin", "http://malicious.com"),
            ("access-control-request-method", "GET"),
        ]);
        assert!(matches!(
            policy.evaluate(&Method::OPTIONS, &map),
            Decision::Rejected(_)
        ));
    }

    #[test]
    fn preflight_response_carries_policy_headers() {
        let policy = policy("http://testclient.local");
        let response = policy.preflight_response(HeaderValue::from_static("http://testclient.local"));
        let h = response.headers();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h[ACCESS_CONTROL_ALLOW_ORIGIN], "http://testclient.local");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_METHODS], "GET,POST,OPTIONS,PUT,DELETE");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(h[ACCESS_CONTROL_MAX_AGE], "3600");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_HEADERS], "Authorization,Content-Type,X-Request-Id");
    }

    #[test]
    fn decorate_adds_actual_request_headers() {
        let policy = policy("http://localhost:3000");
        let mut map = HeaderMap::new();
        policy.decorate(HeaderValue::from_static("http://localhost:3000"), &mut map);

        assert_eq!(map[ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(map[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(map[ACCESS_CONTROL_EXPOSE_HEADERS], "X-Request-Id");
        assert!(map.get(ACCESS_CONTROL_ALLOW_METHODS).is_none());
    }

    #[test]
    fn configured_max_age_is_used() {
        let mut cors = CorsSection::new("http://a.test");
        cors.max_age = 600;
        let policy = OriginPolicy::from_config(&cors).unwrap();
        let response = policy.preflight_response(HeaderValue::from_static("http://a.test"));
        assert_eq!(response.headers()[ACCESS_CONTROL_MAX_AGE], "600");
    }
}
