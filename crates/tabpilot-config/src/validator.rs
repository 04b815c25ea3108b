//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, ReconnectStrategy};

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

    /// Convert the first error into a `ConfigError`.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
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
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_connection(config, &mut result);
        Self::validate_reconnect(config, &mut result);
        Self::validate_tabs(config, &mut result);
        Self::validate_engine(config, &mut result);

        result
    }

    fn validate_connection(config: &Config, result: &mut ValidationResult) {
        match url::Url::parse(&config.connection.endpoint) {
            Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
            Ok(url) => result.add_error(ValidationError::new(
                "connection.endpoint",
                format!("endpoint must use ws:// or wss://, got {}://", url.scheme()),
            )),
            Err(e) => result.add_error(ValidationError::new(
                "connection.endpoint",
                format!("endpoint is not a valid URL: {}", e),
            )),
        }

        match config.connection.token.as_deref() {
            None => result.add_warning(ValidationWarning::new(
                "connection.token",
                "No token configured; pass --token or set TABPILOT_TOKEN to connect",
            )),
            Some("") => result.add_error(ValidationError::new(
                "connection.token",
                "token cannot be empty",
            )),
            Some(_) => {}
        }

        if config.connection.connect_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "connection.connect_timeout_secs",
                "connect_timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_reconnect(config: &Config, result: &mut ValidationResult) {
        let reconnect = &config.connection.reconnect;

        if reconnect.base_delay_ms == 0 {
            result.add_error(ValidationError::new(
                "connection.reconnect.base_delay_ms",
                "base_delay_ms must be greater than 0",
            ));
        }

        if reconnect.max_delay_ms < reconnect.base_delay_ms {
            result.add_error(ValidationError::new(
                "connection.reconnect.max_delay_ms",
                "max_delay_ms must not be smaller than base_delay_ms",
            ));
        }

        if reconnect.strategy == ReconnectStrategy::Exponential && reconnect.multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "connection.reconnect.multiplier",
                "multiplier must be at least 1.0 for exponential backoff",
            ));
        }

        if reconnect.max_attempts == 0 {
            result.add_warning(ValidationWarning::new(
                "connection.reconnect.max_attempts",
                "max_attempts is 0, reconnection will be retried forever",
            ));
        }
    }

    fn validate_tabs(config: &Config, result: &mut ValidationResult) {
        if config.tabs.home_url.trim().is_empty() {
            result.add_error(ValidationError::new(
                "tabs.home_url",
                "home_url cannot be empty",
            ));
        }
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        if config.engine.debug_port == 0 {
            result.add_error(ValidationError::new(
                "engine.debug_port",
                "Port cannot be 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
