//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, health), and their associated
//! argument structs. Every `run` flag has an environment variable
//! equivalent so the process can be configured entirely from a unit file
//! or container spec.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::model::FanoutMode;
use crate::listen::ListenOverrides;

#[derive(Parser)]
#[command(
    name = "slackmux",
    version,
    about = "Slack-style webhook fan-out multiplexer",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        slackmux init                        Create a starter config\n  \
        slackmux run                         Start with ./slackmux.yaml\n  \
        slackmux run -c mux.yaml             Start with a specific config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the multiplexer
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        slackmux run                                   Auto-detect config\n  \
        slackmux run -c mux.yaml                       Specific config file\n  \
        slackmux run -c mux.yaml -p 8080 --pretty      Local dev mode\n  \
        slackmux run --socket /run/slackmux.sock       Listen on a unix socket")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "SLACKMUX_CONFIG")]
    pub config: Option<PathBuf>,

    // -- Listening --
    /// Listen port (overrides `port` in the config file)
    #[arg(short, long, env = "SLACKMUX_PORT", help_heading = "Listening")]
    pub port: Option<u16>,

    /// Listen address (overrides `interface` in the config file)
    #[arg(long, env = "SLACKMUX_INTERFACE", help_heading = "Listening")]
    pub interface: Option<String>,

    /// Unix socket path (overrides `unixSocket`; takes precedence over host/port)
    #[arg(long, env = "SLACKMUX_SOCKET", help_heading = "Listening")]
    pub socket: Option<PathBuf>,

    /// Number of sockets passed by the service manager (systemd socket activation)
    #[arg(long, env = "LISTEN_FDS", hide = true)]
    pub listen_fds: Option<u32>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Delivery timeout in milliseconds (overrides `defaults.timeout`)
    #[arg(long, env = "SLACKMUX_TIMEOUT_MS", help_heading = "Tuning")]
    pub timeout: Option<u64>,

    /// Fan-out mode (overrides `defaults.fanout`)
    #[arg(long, env = "SLACKMUX_FANOUT", help_heading = "Tuning")]
    pub fanout: Option<FanoutArg>,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

impl RunArgs {
    #[must_use]
    pub fn listen_overrides(&self) -> ListenOverrides {
        ListenOverrides {
            listen_fds: self.listen_fds,
            socket: self.socket.clone(),
            interface: self.interface.clone(),
            port: self.port,
        }
    }
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        slackmux init                          Minimal config (yaml)\n  \
        slackmux init --full                   Every option, documented\n  \
        slackmux init -f toml -o mux.toml      TOML format")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include full documentation as comments
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "slackmux.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:8080")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
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

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FanoutArg {
    Sequential,
    Concurrent,
}

impl From<FanoutArg> for FanoutMode {
    fn from(arg: FanoutArg) -> Self {
        match arg {
            FanoutArg::Sequential => Self::Sequential,
            FanoutArg::Concurrent => Self::Concurrent,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
