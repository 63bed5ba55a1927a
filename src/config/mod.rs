//! Configuration module for rdp-updates
//!
//! This module provides configuration types and parsing for the decoder.

mod decoder;

pub use decoder::DecoderConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Decoder configuration
    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .decoder
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid decoder configuration: {}", e))?;
    Ok(config)
}
