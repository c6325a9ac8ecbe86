//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! File-based sources (YAML, JSON, TOML) gated by feature flags, the
//! [`parse_config_str`] helper for format-specific deserialization, and
//! [`detect_config_file`] for auto-discovery in the working directory.

pub mod file_source;

#[cfg(feature = "yaml")]
pub mod yaml;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "toml")]
pub mod toml_source;

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::ConfigSource;
use crate::config::model::Config;
use crate::error::SlackmuxError;

/// File names tried, in order, when no `--config` is given.
pub const CANDIDATES: &[&str] = &[
    "slackmux.yaml",
    "slackmux.yml",
    "slackmux.json",
    "slackmux.toml",
];

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, SlackmuxError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| SlackmuxError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| SlackmuxError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| SlackmuxError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(SlackmuxError::UnsupportedFormat(other.to_string())),
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// First candidate file present in `dir`.
pub async fn detect_config_file(dir: &Path) -> Option<PathBuf> {
    for name in CANDIDATES {
        let path = dir.join(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }
    }
    None
}

/// Pick the source implementation for a path from its extension.
pub fn for_path(path: &Path) -> Result<Box<dyn ConfigSource>, SlackmuxError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(Box::new(yaml::new(path.to_path_buf()))),

        #[cfg(feature = "json")]
        "json" => Ok(Box::new(json::new(path.to_path_buf()))),

        #[cfg(feature = "toml")]
        "toml" => Ok(Box::new(toml_source::new(path.to_path_buf()))),

        other => Err(SlackmuxError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_stable() {
        assert_eq!(
            sha256_hex(b"slackmux"),
            sha256_hex(b"slackmux"),
        );
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
        assert_eq!(sha256_hex(b"").len(), 64);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = parse_config_str("ini", "", "slackmux.ini").unwrap_err();
        assert!(matches!(err, SlackmuxError::UnsupportedFormat(ref ext) if ext == "ini"));
        assert!(for_path(Path::new("slackmux.ini")).is_err());
    }

    #[tokio::test]
    async fn detects_first_candidate() {
        let dir = tempfile::tempdir().unwrap();
        assert!(detect_config_file(dir.path()).await.is_none());

        std::fs::write(dir.path().join("slackmux.json"), "{}").unwrap();
        std::fs::write(dir.path().join("slackmux.yml"), "").unwrap();
        let found = detect_config_file(dir.path()).await.unwrap();
        assert_eq!(found.file_name().unwrap(), "slackmux.yml");
    }
}
