//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, MAX_WAIT_SECS};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_browser(config, &mut result);
        Self::validate_context(config, &mut result);
        Self::validate_hashing(config, &mut result);

        Ok(result)
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        if let Some(ref url) = config.browser.cdp_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "browser.cdp_url",
                    "cdp_url must start with http:// or https://",
                ));
            }
        }

        if config.browser.debug_port == 0 {
            result.add_error(ValidationError::new(
                "browser.debug_port",
                "Port cannot be 0",
            ));
        }

        if config.browser.request_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "browser.request_timeout_secs",
                "request_timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_context(config: &Config, result: &mut ValidationResult) {
        let ctx = &config.context;

        if ctx.viewport_expansion < -1 {
            result.add_error(ValidationError::new(
                "context.viewport_expansion",
                "viewport_expansion must be -1 (disabled) or greater",
            ));
        }

        if ctx.minimum_wait_page_load_time < 0.0 {
            result.add_error(ValidationError::new(
                "context.minimum_wait_page_load_time",
                "minimum_wait_page_load_time cannot be negative",
            ));
        }

        for (path, secs) in [
            (
                "context.minimum_wait_page_load_time",
                ctx.minimum_wait_page_load_time,
            ),
            (
                "context.maximum_wait_page_load_time",
                ctx.maximum_wait_page_load_time,
            ),
        ] {
            if !secs.is_finite() || secs > MAX_WAIT_SECS {
                result.add_error(ValidationError::new(
                    path,
                    format!("must be a finite number of seconds up to {}", MAX_WAIT_SECS),
                ));
            }
        }

        if ctx.maximum_wait_page_load_time < ctx.minimum_wait_page_load_time {
            result.add_error(ValidationError::new(
                "context.maximum_wait_page_load_time",
                "maximum_wait_page_load_time must not be below minimum_wait_page_load_time",
            ));
        }

        if ctx.maximum_wait_page_load_time > 60.0 {
            result.add_warning(ValidationWarning::new(
                "context.maximum_wait_page_load_time",
                "maximum_wait_page_load_time is very high (>60s), steps may stall",
            ));
        }

        if let Some(ref domains) = ctx.allowed_domains {
            if domains.is_empty() {
                result.add_warning(ValidationWarning::new(
                    "context.allowed_domains",
                    "allowed_domains is empty, every navigation except about:blank will be rejected",
                ));
            }
            for domain in domains {
                if domain.contains("://") || domain.contains('/') {
                    result.add_error(ValidationError::new(
                        "context.allowed_domains",
                        format!("'{}' must be a bare host name, not a URL", domain),
                    ));
                }
            }
        }
    }

    fn validate_hashing(config: &Config, result: &mut ValidationResult) {
        if let Some(ref included) = config.hashing.included_attributes {
            if included.is_empty() {
                result.add_warning(ValidationWarning::new(
                    "hashing.included_attributes",
                    "included_attributes is empty, element hashes will ignore all attributes",
                ));
            }
            for attr in included {
                if config.hashing.excluded_attributes.contains(attr) {
                    result.add_error(ValidationError::new(
                        "hashing",
                        format!("Attribute '{}' is both included and excluded", attr),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
