//! Configuration loader.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ConfigError;
use crate::schema::Config;
use crate::validator::ConfigValidator;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(e),
        })?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load a file, or the defaults when it does not exist, and reject
    /// configurations with validation errors.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        let config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Config::default(),
            Err(e) => return Err(e),
        };

        let result = ConfigValidator::validate(&config)?;
        if let Some(first) = result.errors.into_iter().next() {
            return Err(ConfigError::InvalidValue {
                field: first.path,
                message: first.message,
            });
        }
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        if let Some(missing) = ENV_VAR
            .captures_iter(content)
            .map(|cap| cap[1].to_string())
            .find(|name| std::env::var(name).is_err())
        {
            return Err(ConfigError::EnvVarNotSet(missing));
        }

        let expanded = ENV_VAR.replace_all(content, |cap: &Captures| {
            std::env::var(&cap[1]).unwrap_or_default()
        });
        Ok(expanded.into_owned())
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}
