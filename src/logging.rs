//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`. The outbound client's own crates are capped at `warn`
//! unless the requested level is `debug` or lower, so per-delivery
//! events stay readable.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "rustls"];

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

#[must_use]
pub fn build_filter(level: &LogLevel) -> Targets {
    let level = level.to_tracing_level();
    let mut filter = Targets::new().with_default(level);
    if level < Level::DEBUG {
        for target in NOISY_TARGETS {
            filter = filter.with_target(*target, Level::WARN);
        }
    }
    filter
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let filter = build_filter(level);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_forces_json() {
        assert_eq!(resolve_format(false, true), LogFormat::Json);
        assert_eq!(resolve_format(true, false), LogFormat::Pretty);
    }

    #[test]
    fn client_crates_quieted_at_info() {
        let filter = build_filter(&LogLevel::Info);
        assert!(filter.would_enable("slackmux::mux", &Level::INFO));
        assert!(!filter.would_enable("hyper_util::client", &Level::INFO));
        assert!(filter.would_enable("hyper_util::client", &Level::WARN));
    }

    #[test]
    fn client_crates_visible_at_debug() {
        let filter = build_filter(&LogLevel::Debug);
        assert!(filter.would_enable("hyper_util::client", &Level::DEBUG));
        assert!(!filter.would_enable("slackmux::mux", &Level::TRACE));
    }
}
