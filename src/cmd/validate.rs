//! `slackmux validate` — check a configuration file for errors.
//!
//! Parses and validates the config file, then lists dangling references
//! (destinations or tokens that requests would trip over). Output is
//! human-readable text or machine-readable JSON. Only hard errors make
//! the command fail; warnings are informational.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::sources::parse_config_str;
use crate::config::validation;
use crate::error::{SlackmuxError, ValidationError};

fn to_json(errors: &[ValidationError]) -> Vec<serde_json::Value> {
    errors
        .iter()
        .map(|e| {
            serde_json::json!({
                "scope": e.scope,
                "field": e.field,
                "message": e.message,
                "suggestion": e.suggestion,
            })
        })
        .collect()
}

pub fn execute(args: &ValidateArgs) -> Result<(), SlackmuxError> {
    let path = &args.config;

    if !path.exists() {
        return Err(SlackmuxError::ConfigFileNotFound { path: path.clone() });
    }

    let content = std::fs::read_to_string(path)?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &path.display().to_string())?;

    if let Err(errors) = validation::validate(&config) {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "errors": to_json(&errors),
                    })
                );
            }
        }
        return Err(SlackmuxError::ConfigValidation { errors });
    }

    let warnings = validation::lint(&config);

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&path.display().to_string(), &config)
            );
            if !warnings.is_empty() {
                println!("\n\u{26a0} {} warnings\n", warnings.len());
                for warning in &warnings {
                    println!("{warning}");
                }
            }
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "endpoints": config.mux.source_endpoints.len(),
                    "destinations": config.mux.destinations.len(),
                    "directives": config.total_directives(),
                    "warnings": to_json(&warnings),
                })
            );
        }
    }

    Ok(())
}
