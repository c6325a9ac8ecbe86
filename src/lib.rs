//! Slackmux is a webhook fan-out multiplexer.
//!
//! It accepts Slack-style incoming-webhook POSTs on named source endpoints,
//! optionally checks a path token, and re-posts the JSON payload (with
//! per-destination overrides merged in) to every configured destination
//! webhook. The caller gets `200` when every delivery succeeded, or `500`
//! with a JSON map of destination name to error message.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Configuration model, validation, and loading via the
//!   [`ConfigSource`](config::ConfigSource) trait.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`listen`] -- Socket activation, unix socket, and TCP listener selection.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`mux`] -- The multiplexer: inbound decoding, token checks, payload
//!   overrides, delivery to destinations, and response aggregation.
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod listen;
pub mod logging;
pub mod mux;
pub mod server;
