//! `slackmux run` — start the multiplexer.
//!
//! Loads the configuration once, applies CLI overrides, resolves the
//! listening socket, and serves until SIGTERM / Ctrl+C.

use std::path::Path;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::{self, sources, ConfigSource};
use crate::error::SlackmuxError;
use crate::listen::{self, BoundListener, ListenTarget};
use crate::logging;
use crate::server::{self, AppState, LoadedConfig};

pub async fn execute(args: RunArgs) -> Result<(), SlackmuxError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let source = resolve_config_source(args.config.as_deref()).await?;
    let (mut config, version) = config::load_and_lint(&*source).await?;

    if let Some(timeout) = args.timeout {
        config.defaults.timeout = Some(timeout);
    }
    if let Some(fanout) = args.fanout {
        config.defaults.fanout = fanout.into();
    }

    let target = listen::resolve(&args.listen_overrides(), &config);
    let endpoint_count = config.mux.source_endpoints.len();
    let destination_count = config.mux.destinations.len();
    let fanout = config.defaults.fanout;

    let state = Arc::new(AppState::new(LoadedConfig::new(
        config,
        version,
        source.name(),
    )));
    let router = server::build_router(state, args.max_body);

    let listener = listen::bind(&target).await?;

    tracing::info!(
        listen = %target,
        endpoints = endpoint_count,
        destinations = destination_count,
        fanout = ?fanout,
        "slackmux started"
    );

    match listener {
        BoundListener::Tcp(listener) => {
            axum::serve(listener, router)
                .with_graceful_shutdown(server::shutdown_signal())
                .await?;
        }
        #[cfg(unix)]
        BoundListener::Unix(listener) => {
            axum::serve(listener, router)
                .with_graceful_shutdown(server::shutdown_signal())
                .await?;
        }
    }

    if let ListenTarget::Unix(path) = &target {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove socket file");
        }
    }

    tracing::info!("slackmux stopped");
    Ok(())
}

async fn resolve_config_source(
    explicit: Option<&Path>,
) -> Result<Box<dyn ConfigSource>, SlackmuxError> {
    if let Some(path) = explicit {
        return sources::for_path(path);
    }

    let cwd = std::env::current_dir()?;
    match sources::detect_config_file(&cwd).await {
        Some(path) => {
            tracing::info!(path = %path.display(), "auto-detected config file");
            sources::for_path(&path)
        }
        None => Err(SlackmuxError::NoConfigSource {
            hint: "Provide --config <file> or create ./slackmux.yaml.\n  \
                   Run 'slackmux init' to create a config file."
                .into(),
        }),
    }
}
