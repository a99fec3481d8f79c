//! `timelab run`: start the server.
//!
//! Loads the active profile, installs logging (console plus the two
//! exchange channel files), builds the origin policy and the request
//! pipeline, and serves until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::str::FromStr;

use crate::cli::RunArgs;
use crate::config::{self, ALLOWED_ORIGINS_ENV};
use crate::error::TimelabError;
use crate::logging::{self, LogChannel};
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), TimelabError> {
    let profile = args.selection.profile.as_str();
    let config = config::load_profile(&args.selection.config_dir, profile).await?;

    // Validation already accepted the profile level.
    let level = args.log_level.as_ref().map_or_else(
        || tracing::Level::from_str(&config.logging.level).unwrap_or(tracing::Level::INFO),
        crate::cli::LogLevel::to_tracing_level,
    );
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| config.logging.dir.clone());
    logging::init(level, logging::resolve_format(args.pretty, args.json), &log_dir)?;

    if std::env::var_os(ALLOWED_ORIGINS_ENV).is_some() {
        tracing::info!(
            env = ALLOWED_ORIGINS_ENV,
            "allowed origins overridden from environment"
        );
    }

    let host = args.host.clone().unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let state = AppState::new(profile, config, args.max_body)?;
    let origins = state.policy.allowed_origins().len();
    let router = server::build_router(&state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        profile = %state.profile,
        app = %state.config.app.name,
        level = %level,
        origins,
        internal_log = %logging::sink_path(&log_dir, LogChannel::Internal).display(),
        outbound_log = %logging::sink_path(&log_dir, LogChannel::Outbound).display(),
        "timelab started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("timelab stopped");
    Ok(())
}
