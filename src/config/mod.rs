//! Configuration management
//!
//! Reads config.toml. Every key has a default, so an empty file is a valid
//! configuration.

mod types;
mod validation;

pub use types::*;
pub use validation::{ValidationResult, validate};

use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Load, validate and report.
///
/// Every warning and error is logged; any error fails the load.
pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = load(path)?;

    let validation = validate(&config);
    validation.log_diagnostics();

    if validation.has_errors() {
        return Err(Error::Config(validation.errors.join("; ")));
    }
    Ok(config)
}

/// Parse configuration from TOML text
pub fn parse(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}
