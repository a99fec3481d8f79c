//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (profile, config, origin policy and exchange
//! logger, all immutable after startup), [`routes`] for the application
//! endpoints, [`instrument`] which wraps any router in the request
//! pipeline, and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::model::Config;
use crate::error::TimelabError;
use crate::error_page;
use crate::logging::{ExchangeLogger, TracingChannels};
use crate::middleware::{correlation, cors, request_log};
use crate::middleware::cors::OriginPolicy;
use crate::time::time_handler;

pub const DEFAULT_MAX_BODY: usize = 1_048_576;

pub struct AppState {
    pub profile: String,
    pub config: Arc<Config>,
    pub policy: Arc<OriginPolicy>,
    pub exchange_logger: Arc<dyn ExchangeLogger>,
    pub max_body: usize,
}

impl AppState {
    /// Build state for `config`, logging exchanges through the channel targets.
    pub fn new(profile: &str, config: Config, max_body: usize) -> Result<Self, TimelabError> {
        let logger = Arc::new(TracingChannels::new(config.app.name.clone()));
        Self::with_logger(profile, config, max_body, logger)
    }

    pub fn with_logger(
        profile: &str,
        config: Config,
        max_body: usize,
        exchange_logger: Arc<dyn ExchangeLogger>,
    ) -> Result<Self, TimelabError> {
        let policy = OriginPolicy::from_config(&config.cors)?;
        Ok(Self {
            profile: profile.to_string(),
            config: Arc::new(config),
            policy: Arc::new(policy),
            exchange_logger,
            max_body,
        })
    }
}

/// Application endpoints, without the pipeline.
pub fn routes() -> Router {
    Router::new()
        .route("/time", get(time_handler))
        .fallback(error_page::not_found)
}

/// Wrap `router` in the request pipeline.
pub fn instrument(router: Router, state: &AppState) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&state.policy),
                cors::enforce,
            ))
            .layer(axum::middleware::from_fn(correlation::propagate))
            .layer(axum::middleware::from_fn(error_page::render))
            .layer(CatchPanicLayer::custom(error_page::panic_response))
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&state.exchange_logger),
                request_log::log_exchange,
            ))
            .layer(RequestBodyLimitLayer::new(state.max_body)),
    )
}

pub fn build_router(state: &AppState) -> Router {
    instrument(routes(), state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
