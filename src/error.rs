//! Error types for the update decoder
//!
//! Every decode routine returns [`DecodeError`]. No variant carries partially
//! decoded data: a failed record is never handed to a renderer.

use thiserror::Error;

/// Result type for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors raised while decoding fast-path updates, orders and surface commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A declared field extends past the end of the available input
    #[error("Truncated input reading {field}: need {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        /// Field being read
        field: &'static str,
        /// Bytes required
        needed: usize,
        /// Bytes left in the cursor
        remaining: usize,
    },

    /// A field was read but its value is unacceptable
    #[error("Invalid value for {field}: {reason}")]
    InvalidFieldValue {
        /// Field being validated
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The peer broke the protocol in a way that cannot be skipped
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A negotiated limit was exceeded
    #[error("{what} exceeds limit: {size} > {max}")]
    ResourceLimitExceeded {
        /// Resource being limited
        what: &'static str,
        /// Observed size
        size: usize,
        /// Negotiated maximum
        max: usize,
    },

    /// The bulk decompressor or surface codec rejected its input
    #[error("Decompression failed: {0}")]
    Decompression(String),
}

impl DecodeError {
    /// Shorthand for [`DecodeError::InvalidFieldValue`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidFieldValue {
            field,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`DecodeError::ProtocolViolation`].
    pub fn violation(msg: impl Into<String>) -> Self {
        DecodeError::ProtocolViolation(msg.into())
    }

    /// Whether the connection must be torn down regardless of where the
    /// error surfaced.
    ///
    /// Other variants are fatal for the unit being decoded; whether that
    /// escalates to the connection depends on the caller (primary orders and
    /// fast-path framing escalate, secondary orders resynchronize).
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::ProtocolViolation(_) | DecodeError::ResourceLimitExceeded { .. }
        )
    }
}
