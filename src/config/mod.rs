//! Configuration loading and validation.
//!
//! Defines the [`ConfigSource`] trait for pluggable config backends and
//! the [`ConfigVersion`] fingerprint reported by `/health`. The config is
//! loaded exactly once at startup; after that it is shared read-only.
//! Submodules provide the data model, validation logic, and concrete
//! source implementations.

pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::SlackmuxError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    /// Abbreviated form for display.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits (Rust 1.75+) does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), SlackmuxError>;
}

/// Load from `source` and log every reference lint as a warning.
pub async fn load_and_lint(
    source: &dyn ConfigSource,
) -> Result<(Config, ConfigVersion), SlackmuxError> {
    let (config, version) = source.load().await?;
    for warning in validation::lint(&config) {
        tracing::warn!(
            source = source.name(),
            scope = %warning.scope,
            field = %warning.field,
            "{}",
            warning.message
        );
    }
    Ok((config, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_version_truncates_hash() {
        let version = ConfigVersion::Hash("0123456789abcdef".into());
        assert_eq!(version.short(), "01234567");
        assert_eq!(ConfigVersion::Hash("abc".into()).short(), "abc");
    }
}
