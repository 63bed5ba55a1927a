//! # rdp-updates - RDP Display Update Decoder
//!
//! rdp-updates turns the fast-path output stream of a remote desktop
//! connection into typed drawing and update records delivered to a renderer.
//! It does no network I/O, rendering, encryption or image decompression;
//! those are supplied by the caller through the traits in [`handler`] and
//! [`fastpath::BulkDecompressor`].
//!
//! ## Features
//!
//! - **Fast-Path Transport**: PDU framing, fragment reassembly, compression gating
//! - **Drawing Orders**: all primary, secondary and alternate secondary orders
//! - **Persistent Field State**: omitted primary order fields keep their last value
//! - **Surface Commands**: surface bits and frame markers, checked against the desktop
//! - **Zero-Copy Payloads**: bitmap, glyph and codec payloads borrow the packet
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rdp_updates::config::DecoderConfig;
//! use rdp_updates::fastpath::FastPath;
//! use rdp_updates::handler::UpdateCounter;
//!
//! let mut fastpath = FastPath::new(&DecoderConfig::default());
//! let mut counter = UpdateCounter::new();
//!
//! let used = fastpath.process_pdu(&pdu, &mut counter)?;
//! println!("{} bytes, {} records", used, counter.total());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! FastPath -> UpdateDispatcher -> OrderDecoder   -> Renderer / CacheManager
//!                              -> SurfaceDecoder -> SurfaceCodec -> Renderer
//!                              -> bitmap / palette / pointer readers
//! ```
//!
//! All state is connection-scoped and owned by [`fastpath::FastPath`]; one
//! instance must not be shared between connections.

#![warn(rust_2018_idioms)]

pub mod config;
pub mod cursor;
pub mod error;
pub mod fastpath;
pub mod handler;
pub mod orders;
pub mod primitives;
pub mod surface;
pub mod update;

// Re-export commonly used items
pub use config::{load_config, Config, DecoderConfig};
pub use cursor::ReadCursor;
pub use error::{DecodeError, Result};
pub use fastpath::{BulkDecompressor, FastPath, FragmentState};
pub use handler::{CacheManager, Renderer, SurfaceCodec, UpdateCounter, UpdateHandler};
pub use orders::OrderDecoder;
pub use surface::SurfaceDecoder;
pub use update::{UpdateCode, UpdateDispatcher};

/// Version of the rdp-updates library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "rdp-updates");
    }
}
