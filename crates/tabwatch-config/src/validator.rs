//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

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

    /// Turn the first error into a [`ConfigError`].
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

        Self::validate_peer(config, &mut result);
        Self::validate_tracker(config, &mut result);
        Self::validate_store(config, &mut result);
        Self::validate_host(config, &mut result);
        Self::validate_control(config, &mut result);

        result
    }

    fn validate_url(path: &str, value: &str, schemes: &[&str], result: &mut ValidationResult) {
        match Url::parse(value) {
            Ok(url) if schemes.contains(&url.scheme()) => {}
            Ok(url) => result.add_error(ValidationError::new(
                path,
                format!("unsupported scheme '{}', expected one of {:?}", url.scheme(), schemes),
            )),
            Err(e) => result.add_error(ValidationError::new(path, format!("invalid URL: {}", e))),
        }
    }

    fn validate_peer(config: &Config, result: &mut ValidationResult) {
        let peer = &config.peer;
        Self::validate_url("peer.base_url", &peer.base_url, &["http", "https"], result);
        Self::validate_url("peer.ws_url", &peer.ws_url, &["ws", "wss"], result);

        if peer.request_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "peer.request_timeout_secs",
                "request_timeout_secs must be greater than 0",
            ));
        }

        if peer.reconnect_delay_ms == 0 {
            result.add_error(ValidationError::new(
                "peer.reconnect_delay_ms",
                "reconnect_delay_ms must be greater than 0",
            ));
        } else if peer.reconnect_delay_ms < 500 {
            result.add_warning(ValidationWarning::new(
                "peer.reconnect_delay_ms",
                "reconnect delay below 500ms will hammer an absent peer",
            ));
        }

        if peer.health_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "peer.health_interval_secs",
                "health_interval_secs must be greater than 0",
            ));
        }
    }

    fn validate_tracker(config: &Config, result: &mut ValidationResult) {
        let tracker = &config.tracker;
        if tracker.flush_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "tracker.flush_interval_secs",
                "flush_interval_secs must be greater than 0",
            ));
        } else if tracker.flush_interval_secs > 300 {
            result.add_warning(ValidationWarning::new(
                "tracker.flush_interval_secs",
                "a long flush interval loses more active time if the process dies",
            ));
        }

        if tracker.description_max_words == 0 {
            result.add_error(ValidationError::new(
                "tracker.description_max_words",
                "description_max_words must be greater than 0",
            ));
        }

        if tracker.dwell_threshold_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "tracker.dwell_threshold_ms",
                "a zero dwell threshold captures on every tab switch",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if config.store.path.trim().is_empty() {
            result.add_error(ValidationError::new("store.path", "path cannot be empty"));
        }
    }

    fn validate_host(config: &Config, result: &mut ValidationResult) {
        let host = &config.host;
        Self::validate_url("host.cdp_endpoint", &host.cdp_endpoint, &["http", "https"], result);

        if host.screenshot_quality == 0 || host.screenshot_quality > 100 {
            result.add_error(ValidationError::new(
                "host.screenshot_quality",
                "screenshot_quality must be between 1 and 100",
            ));
        }

        if host.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "host.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }
    }

    fn validate_control(config: &Config, result: &mut ValidationResult) {
        let control = &config.control;
        if !control.enabled {
            return;
        }
        if control.port == 0 {
            result.add_error(ValidationError::new("control.port", "Port cannot be 0"));
        }
        if control.host.is_empty() {
            result.add_error(ValidationError::new("control.host", "Host cannot be empty"));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
