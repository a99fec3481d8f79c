//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate), and their associated argument structs.
//! Every flag has an environment variable equivalent for container
//! deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "timelab",
    version,
    about = "Teaching-lab time server",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        timelab run                          Start with profiles/dev.yaml\n  \
        timelab run -P test                  Start with profiles/test.yaml\n  \
        timelab validate -P prod             Check a profile without starting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server
    Run(Box<RunArgs>),

    /// Validate a profile without starting
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ProfileArgs {
    /// Deployment profile; selects `{config-dir}/{profile}.yaml`
    #[arg(short = 'P', long, env = "APP_PROFILE", default_value = "dev")]
    pub profile: String,

    /// Directory holding the profile files
    #[arg(long, env = "CONFIG_DIR", default_value = "profiles")]
    pub config_dir: PathBuf,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        timelab run                                  Dev profile\n  \
        timelab run -P test --pretty                 Test profile, debug logging\n  \
        timelab run -P prod -p 9090 --json           Prod profile on another port")]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: ProfileArgs,

    /// Listen port (overrides the profile)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Listen address (overrides the profile)
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    // -- Logging --
    /// Log level (overrides the profile)
    #[arg(short, long, env = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Directory for the internal/outbound log files (overrides the profile)
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Force pretty (human-readable) console output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON console output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = crate::server::DEFAULT_MAX_BODY,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub selection: ProfileArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
