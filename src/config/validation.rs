//! Configuration validation

use super::Config;
use crate::dataplane::COOKIE_CAPACITY;
use tracing::{error, warn};

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Emit every diagnostic through `tracing`
    pub fn log_diagnostics(&self) {
        for warning in &self.warnings {
            warn!("config: {}", warning);
        }
        for err in &self.errors {
            error!("config: {}", err);
        }
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_engine(config, &mut result);
    validate_server(config, &mut result);

    result
}

fn validate_engine(config: &Config, result: &mut ValidationResult) {
    let engine = &config.engine;

    for (name, value) in [
        ("connect_timeout", engine.connect_timeout),
        ("resend_interval", engine.resend_interval),
        ("ring_timeout", engine.ring_timeout),
    ] {
        if value == 0 {
            result.error(format!("engine.{}: must be at least 1 tick", name));
        }
    }

    if engine.max_endpoints == 0 {
        result.error("engine.max_endpoints: must be at least 1");
    }

    if !engine.host_uniq {
        result.warn(
            "engine.host_uniq: disabled, discovery replies cannot be told apart between endpoints",
        );
    }

    if engine.resend_interval >= engine.connect_timeout && engine.connect_timeout > 0 {
        result.warn(format!(
            "engine.resend_interval ({}) >= connect_timeout ({}): discovery packets are never retransmitted",
            engine.resend_interval, engine.connect_timeout
        ));
    }
}

fn validate_server(config: &Config, result: &mut ValidationResult) {
    for (name, value) in [
        ("ac_name", &config.server.ac_name),
        ("service_name", &config.server.service_name),
    ] {
        if value.len() > COOKIE_CAPACITY {
            result.error(format!(
                "server.{}: {} bytes exceeds the {} byte limit",
                name,
                value.len(),
                COOKIE_CAPACITY
            ));
        }
    }
}
