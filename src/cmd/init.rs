//! `slackmux init` — generate a starter configuration file.
//!
//! Writes a YAML, JSON, or TOML config with either a minimal or a fully
//! commented template. Never overwrites an existing file.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::SlackmuxError;

pub fn execute(args: &InitArgs) -> Result<(), SlackmuxError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("slackmux.{}", args.format.extension())));

    if output.exists() {
        return Err(SlackmuxError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# slackmux config

mux:
  sourceEndpoints:
    alerts:
      muxTo:
        - dest: ops

  destinations:
    ops: "https://hooks.slack.com/services/T000/B000/XXXX"
"#;

const YAML_FULL: &str = r##"# slackmux config
#
# Requests arrive at POST /slackmux/<endpoint>/<token> and are forwarded
# to every destination listed under the endpoint's muxTo, in order.

mux:
  sourceEndpoints:
    # Open endpoint: POST /slackmux/alerts
    alerts:
      muxTo:
        - dest: ops
        # Keys under override replace the same keys of the inbound payload
        - dest: dev
          override:
            channel: "#dev-alerts"
            username: "alert-bot"

    # Protected endpoint: POST /slackmux/deploys/<value of deploy-token>
    deploys:
      token: deploy-token       # a name from sourceTokens, not the secret
      muxTo:
        - dest: ops

  sourceTokens:
    deploy-token: "change-me"

  destinations:
    ops: "https://hooks.slack.com/services/T000/B000/XXXX"
    # Long form with a per-delivery timeout in ms
    dev:
      url: "https://hooks.slack.com/services/T000/B001/YYYY"
      timeout: 3000

# Listening. LISTEN_FDS (socket activation) beats unixSocket, which
# beats interface/port. SLACKMUX_SOCKET / SLACKMUX_INTERFACE /
# SLACKMUX_PORT override the values below.
# unixSocket: /run/slackmux/slackmux.sock
# interface: localhost
# port: 8080

# defaults:
#   timeout: 5000             # Delivery timeout in ms (default: none)
#   fanout: sequential        # or "concurrent"
"##;

const JSON_MINIMAL: &str = r#"{
  "mux": {
    "sourceEndpoints": {
      "alerts": {
        "muxTo": [
          { "dest": "ops" }
        ]
      }
    },
    "destinations": {
      "ops": "https://hooks.slack.com/services/T000/B000/XXXX"
    }
  }
}
"#;

const JSON_FULL: &str = r##"{
  "mux": {
    "sourceEndpoints": {
      "alerts": {
        "muxTo": [
          { "dest": "ops" },
          {
            "dest": "dev",
            "override": { "channel": "#dev-alerts", "username": "alert-bot" }
          }
        ]
      },
      "deploys": {
        "token": "deploy-token",
        "muxTo": [
          { "dest": "ops" }
        ]
      }
    },
    "sourceTokens": {
      "deploy-token": "change-me"
    },
    "destinations": {
      "ops": "https://hooks.slack.com/services/T000/B000/XXXX",
      "dev": { "url": "https://hooks.slack.com/services/T000/B001/YYYY", "timeout": 3000 }
    }
  },
  "interface": "localhost",
  "port": 8080,
  "defaults": {
    "timeout": 5000,
    "fanout": "sequential"
  }
}
"##;

const TOML_MINIMAL: &str = r#"# slackmux config

[[mux.sourceEndpoints.alerts.muxTo]]
dest = "ops"

[mux.destinations]
ops = "https://hooks.slack.com/services/T000/B000/XXXX"
"#;

const TOML_FULL: &str = r##"# slackmux config
#
# Requests arrive at POST /slackmux/<endpoint>/<token> and are forwarded
# to every destination listed under the endpoint's muxTo, in order.

# interface = "localhost"
# port = 8080
# unixSocket = "/run/slackmux/slackmux.sock"

# [defaults]
# timeout = 5000
# fanout = "sequential"

[[mux.sourceEndpoints.alerts.muxTo]]
dest = "ops"

[[mux.sourceEndpoints.alerts.muxTo]]
dest = "dev"
override = { channel = "#dev-alerts", username = "alert-bot" }

[mux.sourceEndpoints.deploys]
token = "deploy-token"

[[mux.sourceEndpoints.deploys.muxTo]]
dest = "ops"

[mux.sourceTokens]
deploy-token = "change-me"

[mux.destinations]
ops = "https://hooks.slack.com/services/T000/B000/XXXX"
dev = { url = "https://hooks.slack.com/services/T000/B001/YYYY", timeout = 3000 }
"##;
