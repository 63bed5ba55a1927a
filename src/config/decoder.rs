//! Decoder configuration
//!
//! Values negotiated during capability exchange that the decoder consumes
//! but does not own.

use serde::{Deserialize, Serialize};

use crate::orders::PrimaryOrderType;

/// Default desktop width in pixels
fn default_desktop_width() -> u16 {
    1024
}

/// Default desktop height in pixels
fn default_desktop_height() -> u16 {
    768
}

/// Default multi-fragment maximum before capability exchange raises it
fn default_multifrag_max_request_size() -> u32 {
    0xFFFF
}

/// Default supported primary orders
fn default_primary_orders() -> Vec<PrimaryOrderType> {
    PrimaryOrderType::ALL.to_vec()
}

/// Default pointer update handling
fn default_pointer_updates() -> bool {
    true
}

/// Decoder configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DecoderConfig {
    /// Negotiated desktop width; surface bits must fit inside it
    #[serde(default = "default_desktop_width")]
    pub desktop_width: u16,

    /// Negotiated desktop height
    #[serde(default = "default_desktop_height")]
    pub desktop_height: u16,

    /// Upper bound for a reassembled fragmented update
    #[serde(default = "default_multifrag_max_request_size")]
    pub multifrag_max_request_size: u32,

    /// Primary orders the client advertised
    #[serde(default = "default_primary_orders")]
    pub primary_orders: Vec<PrimaryOrderType>,

    /// Cache glyph orders use the revision 2 layout
    #[serde(default)]
    pub glyph_v2: bool,

    /// Process pointer updates instead of ignoring them
    #[serde(default = "default_pointer_updates")]
    pub pointer_updates: bool,

    /// Large pointer support was negotiated
    #[serde(default)]
    pub large_pointer: bool,

    /// Codec ids negotiated for surface bits; 0 is always accepted
    #[serde(default)]
    pub surface_codecs: Vec<u8>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            desktop_width: default_desktop_width(),
            desktop_height: default_desktop_height(),
            multifrag_max_request_size: default_multifrag_max_request_size(),
            primary_orders: default_primary_orders(),
            glyph_v2: false,
            pointer_updates: default_pointer_updates(),
            large_pointer: false,
            surface_codecs: Vec::new(),
        }
    }
}

impl DecoderConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.desktop_width == 0 || self.desktop_height == 0 {
            return Err(format!(
                "Desktop size {}x{} is empty",
                self.desktop_width, self.desktop_height
            ));
        }
        if self.multifrag_max_request_size == 0 {
            return Err("multifrag_max_request_size must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_default() {
        let config = DecoderConfig::default();
        assert_eq!(config.desktop_width, 1024);
        assert_eq!(config.desktop_height, 768);
        assert_eq!(config.multifrag_max_request_size, 0xFFFF);
        assert_eq!(config.primary_orders.len(), 22);
        assert!(config.pointer_updates);
        assert!(!config.large_pointer);
        assert!(!config.glyph_v2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_decoder_config_validate() {
        let config = DecoderConfig {
            desktop_width: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DecoderConfig {
            multifrag_max_request_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
