//! Configuration validation with detailed error reporting.
//!
//! Two passes over a parsed [`Config`]:
//!
//! - [`validate`] finds structural errors (empty names, malformed
//!   destination URLs, zero timeouts). Any hit rejects the config.
//! - [`lint`] finds dangling references: directives naming a missing
//!   destination and endpoints naming a missing token. These are
//!   reported as warnings only. The dispatch path already answers them
//!   per request (500 and 403 respectively), so loading must not refuse
//!   a config the multiplexer can still partially serve.

use url::Url;

use super::model::Config;
use crate::error::ValidationError;

fn endpoint_scope(name: &str) -> String {
    format!("endpoint '{name}'")
}

fn destination_scope(name: &str) -> String {
    format!("destination '{name}'")
}

/// Validate a single destination URL. Returns `Ok(())` or a human-readable error.
pub fn validate_destination_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.defaults.timeout == Some(0) {
        errors.push(ValidationError {
            scope: "(root)".into(),
            field: "defaults.timeout".into(),
            message: "timeout must be greater than 0".into(),
            suggestion: Some("omit it to wait indefinitely".into()),
        });
    }

    for (name, endpoint) in &config.mux.source_endpoints {
        let scope = endpoint_scope(name);

        if name.is_empty() {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "name".into(),
                message: "endpoint name cannot be empty".into(),
                suggestion: None,
            });
        }

        if endpoint.token.as_deref() == Some("") {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "token".into(),
                message: "token name cannot be empty".into(),
                suggestion: Some("remove the field to disable authentication".into()),
            });
        }

        for (i, directive) in endpoint.mux_to.iter().enumerate() {
            if directive.dest.is_empty() {
                errors.push(ValidationError {
                    scope: scope.clone(),
                    field: format!("muxTo[{i}].dest"),
                    message: "destination name cannot be empty".into(),
                    suggestion: None,
                });
            }
        }
    }

    for (name, destination) in &config.mux.destinations {
        let scope = destination_scope(name);

        if let Err(msg) = validate_destination_url(destination.url()) {
            let url = destination.url();
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "url".into(),
                message: msg,
                suggestion: if !url.is_empty() && !url.contains("://") {
                    Some(format!("did you mean 'https://{url}'?"))
                } else {
                    None
                },
            });
        }

        if destination.timeout_ms() == Some(0) {
            errors.push(ValidationError {
                scope,
                field: "timeout".into(),
                message: "timeout must be greater than 0".into(),
                suggestion: None,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Report references that will fail at request time.
#[must_use]
pub fn lint(config: &Config) -> Vec<ValidationError> {
    let mux = &config.mux;
    let mut warnings = Vec::new();

    for (name, endpoint) in &mux.source_endpoints {
        let scope = endpoint_scope(name);

        if let Some(token) = endpoint.token.as_deref() {
            if !token.is_empty() && mux.token_value(token).is_none() {
                warnings.push(ValidationError {
                    scope: scope.clone(),
                    field: "token".into(),
                    message: format!(
                        "token '{token}' is not defined in sourceTokens, every request will be rejected"
                    ),
                    suggestion: None,
                });
            }
        }

        if endpoint.mux_to.is_empty() {
            warnings.push(ValidationError {
                scope: scope.clone(),
                field: "muxTo".into(),
                message: "endpoint has no destinations".into(),
                suggestion: None,
            });
        }

        for (i, directive) in endpoint.mux_to.iter().enumerate() {
            if !directive.dest.is_empty() && mux.destination(&directive.dest).is_none() {
                warnings.push(ValidationError {
                    scope: scope.clone(),
                    field: format!("muxTo[{i}].dest"),
                    message: format!(
                        "destination '{}' is not defined, requests will fail with 500",
                        directive.dest
                    ),
                    suggestion: suggest_name(&directive.dest, mux.destinations.keys()),
                });
            }
        }
    }

    warnings
}

/// Suggest a configured name differing only by case or surrounding whitespace.
fn suggest_name<'a>(wanted: &str, known: impl Iterator<Item = &'a String>) -> Option<String> {
    let normalized = wanted.trim().to_lowercase();
    known
        .into_iter()
        .find(|k| k.trim().to_lowercase() == normalized)
        .map(|k| format!("did you mean '{k}'?"))
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mux = &config.mux;
    let mut lines = vec![format!(
        "  {} endpoints, {} destinations, {} directives\n",
        mux.source_endpoints.len(),
        mux.destinations.len(),
        config.total_directives()
    )];

    for (name, endpoint) in &mux.source_endpoints {
        let auth = endpoint
            .token
            .as_deref()
            .map_or_else(|| "none".to_string(), |t| format!("token '{t}'"));
        let dests: Vec<String> = endpoint
            .mux_to
            .iter()
            .map(|d| {
                if d.overrides.is_some() {
                    format!("{} (override)", d.dest)
                } else {
                    d.dest.clone()
                }
            })
            .collect();

        lines.push(format!(
            "  /slackmux/{name}  -> {} destinations",
            endpoint.mux_to.len()
        ));
        lines.push(format!("    auth: {auth}"));
        lines.push(format!("    to:   {}", dests.join(", ")));
    }

    let timeout = config
        .defaults
        .timeout
        .map_or_else(|| "none".to_string(), |t| format!("{t}ms"));
    lines.push(format!(
        "  fanout: {:?}, default timeout: {timeout}",
        config.defaults.fanout
    ));

    format!("{} is valid\n{}", path, lines.join("\n"))
}
