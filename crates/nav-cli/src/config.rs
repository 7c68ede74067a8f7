//! Navigator configuration file
//!
//! TOML or YAML, chosen by file extension. Every field has a default, so
//! an empty file (or a file naming only one section) is valid.

use nav_cache::{CacheConfig, CacheError};
use nav_preview::{PreviewConfig, PreviewError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Extension is neither TOML nor YAML
    #[error("unsupported config format {}, expected .toml, .yaml or .yml", .0.display())]
    UnsupportedFormat(PathBuf),

    /// TOML syntax or shape error
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML syntax or shape error
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Cache section out of range
    #[error("cache settings: {0}")]
    Cache(#[from] CacheError),

    /// Preview section out of range
    #[error("preview settings: {0}")]
    Preview(#[from] PreviewError),
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.yaml` / `.yml`
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a path's extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Cache registry settings
    pub cache: CacheConfig,
    /// Preview controller settings
    pub preview: PreviewConfig,
}

impl NavigatorConfig {
    /// Parse and validate `contents`
    ///
    /// # Errors
    /// Syntax errors and out-of-range settings
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            match format {
                ConfigFormat::Toml => toml::from_str(contents)?,
                ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the file at `path`
    ///
    /// # Errors
    /// IO failures, unknown extensions, and everything `parse` rejects
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&contents, format)?;
        tracing::debug!(path = %path.display(), ?format, "configuration loaded");
        Ok(config)
    }

    /// Check both sections
    ///
    /// # Errors
    /// The first out-of-range setting found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.preview.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_preview::InputField;
    use std::time::Duration;

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("navigator")), None);
    }

    #[test]
    fn empty_is_default() {
        for format in [ConfigFormat::Toml, ConfigFormat::Yaml] {
            assert_eq!(
                NavigatorConfig::parse("  \n", format).unwrap(),
                NavigatorConfig::default()
            );
        }
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = NavigatorConfig::parse(
            "[preview]\ndebounce_ms = 250\nrequired_fields = [\"marital_status\", \"county\"]\n",
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.preview.debounce(), Duration::from_millis(250));
        assert_eq!(
            config.preview.required_fields,
            vec![InputField::MaritalStatus, InputField::County]
        );
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn yaml_cache_section() {
        let config = NavigatorConfig::parse(
            "cache:\n  default_ttl_secs: 60\n  sweep_interval_secs: 5\n",
            ConfigFormat::Yaml,
        )
        .unwrap();

        assert_eq!(config.cache.default_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.sweep_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn out_of_range_rejected() {
        let err = NavigatorConfig::parse("[cache]\nresponse_window = 0\n", ConfigFormat::Toml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Cache(_)));

        let err = NavigatorConfig::parse("preview:\n  call_timeout_ms: 0\n", ConfigFormat::Yaml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Preview(_)));
    }

    #[test]
    fn syntax_errors_surface() {
        assert!(matches!(
            NavigatorConfig::parse("[cache", ConfigFormat::Toml),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            NavigatorConfig::parse("cache: [1, 2", ConfigFormat::Yaml),
            Err(ConfigError::Yaml(_))
        ));
    }
}
