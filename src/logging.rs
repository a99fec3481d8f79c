//! Structured logging setup using the `tracing` ecosystem.
//!
//! Three outputs are configured:
//!
//! - application diagnostics on stdout, either JSON (production) or
//!   pretty-printed (TTY / local dev), auto-detected from the terminal but
//!   forceable via `--json` or `--pretty`;
//! - the `internal` exchange channel, JSON lines appended to
//!   `{dir}/internal.log`;
//! - the `outbound` exchange channel, JSON lines appended to
//!   `{dir}/outbound.log`.
//!
//! Channels are plain `tracing` targets, so a single global [`Targets`]
//! threshold decides which severities are live for all three. Request
//! logging talks to the channels only through [`ExchangeLogger`].

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing::{Level, Subscriber};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::error::TimelabError;

/// Common prefix of the channel targets, excluded from stdout.
pub const CHANNEL_TARGET: &str = "timelab::channel";
pub const INTERNAL_TARGET: &str = "timelab::channel::internal";
pub const OUTBOUND_TARGET: &str = "timelab::channel::outbound";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Destination of an exchange record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannel {
    Internal,
    Outbound,
}

impl LogChannel {
    /// `/time` and everything under `/external` is outbound traffic.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        if path == "/time" || path.starts_with("/external") {
            Self::Outbound
        } else {
            Self::Internal
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Outbound => "outbound",
        }
    }

    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Internal => INTERNAL_TARGET,
            Self::Outbound => OUTBOUND_TARGET,
        }
    }
}

/// Sink for serialized exchange records.
///
/// Implementations decide where a line goes; callers only ask whether
/// debug output is live for a channel and hand over finished lines.
pub trait ExchangeLogger: Send + Sync {
    fn debug_enabled(&self, channel: LogChannel) -> bool;
    fn emit(&self, channel: LogChannel, level: Level, line: &str);
}

/// [`ExchangeLogger`] backed by the channel targets.
#[derive(Debug, Clone)]
pub struct TracingChannels {
    app: String,
}

impl TracingChannels {
    #[must_use]
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into() }
    }
}

// Event targets must be constants, hence one arm per channel and level.
// The serialized record is the event message, kept verbatim.
macro_rules! channel_event {
    ($target:expr, $kind:literal, $level:expr, $app:expr, $line:expr) => {
        if $level == Level::DEBUG {
            tracing::debug!(target: $target, app = %$app, "type" = $kind, "{}", $line);
        } else {
            tracing::info!(target: $target, app = %$app, "type" = $kind, "{}", $line);
        }
    };
}

impl ExchangeLogger for TracingChannels {
    fn debug_enabled(&self, channel: LogChannel) -> bool {
        match channel {
            LogChannel::Internal => tracing::enabled!(target: INTERNAL_TARGET, Level::DEBUG),
            LogChannel::Outbound => tracing::enabled!(target: OUTBOUND_TARGET, Level::DEBUG),
        }
    }

    fn emit(&self, channel: LogChannel, level: Level, line: &str) {
        match channel {
            LogChannel::Internal => {
                channel_event!(INTERNAL_TARGET, "internal", level, self.app, line);
            }
            LogChannel::Outbound => {
                channel_event!(OUTBOUND_TARGET, "outbound", level, self.app, line);
            }
        }
    }
}

#[must_use]
pub fn sink_path(dir: &Path, channel: LogChannel) -> PathBuf {
    dir.join(format!("{}.log", channel.as_str()))
}

fn open_sink(dir: &Path, channel: LogChannel) -> Result<File, TimelabError> {
    let path = sink_path(dir, channel);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| TimelabError::LogSink { path, source })
}

/// JSON-lines layer that only sees events of one channel target.
fn channel_layer<S>(file: File, channel: LogChannel) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(Targets::new().with_target(channel.target(), LevelFilter::TRACE))
}

fn console_filter() -> Targets {
    Targets::new()
        .with_default(LevelFilter::TRACE)
        .with_target(CHANNEL_TARGET, LevelFilter::OFF)
}

/// Install the global subscriber. Creates `dir` if needed.
pub fn init(level: Level, format: LogFormat, dir: &Path) -> Result<(), TimelabError> {
    std::fs::create_dir_all(dir).map_err(|source| TimelabError::LogSink {
        path: dir.to_path_buf(),
        source,
    })?;
    let internal = open_sink(dir, LogChannel::Internal)?;
    let outbound = open_sink(dir, LogChannel::Outbound)?;

    let registry = tracing_subscriber::registry()
        .with(Targets::new().with_default(level))
        .with(channel_layer(internal, LogChannel::Internal))
        .with(channel_layer(outbound, LogChannel::Outbound));

    match format {
        LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(false)
                        .with_filter(console_filter()),
                )
                .init();
        }
        LogFormat::Pretty => {
            registry
                .with(fmt::layer().pretty().with_filter(console_filter()))
                .init();
        }
    }

    Ok(())
}
