//! Fast-path output transport
//!
//! A fast-path output PDU is a short header followed by a list of update
//! blocks:
//!
//! ```text
//! PDU
//! +-----------+------------------+--------------------------------+
//! | fpHeader  | length (PER 1-2) | update, update, ...            |
//! +-----------+------------------+--------------------------------+
//!
//! update
//! +--------------+--------------------------+--------+-------------+
//! | updateHeader | compressionFlags (opt.)  | size   | updateData  |
//! +--------------+--------------------------+--------+-------------+
//! |      1       |            1             |   2    |    size     |
//! +--------------+--------------------------+--------+-------------+
//! ```
//!
//! `updateHeader` packs the update code (bits 0-3), the fragmentation
//! (bits 4-5) and the compression field (bits 6-7). Large updates are split
//! into FIRST, NEXT.., LAST fragments which are reassembled here before the
//! block is dispatched.

use bytes::{BufMut, BytesMut};
use tracing::{debug, error, trace, warn};

use crate::config::DecoderConfig;
use crate::cursor::ReadCursor;
use crate::error::{DecodeError, Result};
use crate::handler::{Renderer, UpdateHandler};
use crate::update::{UpdateCode, UpdateDispatcher};

/// Action value identifying a fast-path PDU.
pub const FASTPATH_OUTPUT_ACTION_FASTPATH: u8 = 0x0;
/// Encryption flag: the data signature is a salted checksum.
pub const FASTPATH_OUTPUT_SECURE_CHECKSUM: u8 = 0x1;
/// Encryption flag: the payload is encrypted.
pub const FASTPATH_OUTPUT_ENCRYPTED: u8 = 0x2;

/// Compression field value announcing a compression-flags byte.
pub const FASTPATH_OUTPUT_COMPRESSION_USED: u8 = 0x2;

/// Compression flag: the payload is compressed.
pub const PACKET_COMPRESSED: u8 = 0x20;
/// Compression flag: the history buffer was moved to the front.
pub const PACKET_AT_FRONT: u8 = 0x40;
/// Compression flag: the history buffer was flushed.
pub const PACKET_FLUSHED: u8 = 0x80;
/// Mask of the compression type bits.
pub const PACKET_COMPR_TYPE_MASK: u8 = 0x0F;

/// Smallest update: header byte plus size.
const MIN_UPDATE_SIZE: usize = 3;

/// Fast-path PDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastPathHeader {
    /// Encryption flags from the top two bits.
    pub encryption_flags: u8,
    /// Input event count; only meaningful for client-to-server PDUs.
    pub num_events: u8,
    /// Total PDU length including the header.
    pub length: usize,
    /// Bytes taken by the header itself.
    pub header_len: usize,
}

/// Read the fast-path header and PER-encoded length.
pub fn read_header(c: &mut ReadCursor<'_>) -> Result<FastPathHeader> {
    let start = c.position();
    let status = c.read_u8("fpOutputHeader")?;
    let action = status & 0x03;
    if action != FASTPATH_OUTPUT_ACTION_FASTPATH {
        return Err(DecodeError::violation(format!(
            "action {} is not a fast-path PDU",
            action
        )));
    }
    let num_events = (status >> 2) & 0x0F;
    let encryption_flags = (status >> 6) & 0x03;

    let first = c.read_u8("length1")?;
    let length = if first & 0x80 != 0 {
        ((first as usize & 0x7F) << 8) | c.read_u8("length2")? as usize
    } else {
        first as usize
    };
    let header_len = c.position() - start;
    if length < header_len {
        return Err(DecodeError::invalid(
            "length",
            format!("{} is shorter than the {} byte header", length, header_len),
        ));
    }

    Ok(FastPathHeader {
        encryption_flags,
        num_events,
        length,
        header_len,
    })
}

/// Fragmentation of one update block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fragmentation {
    Single = 0,
    Last = 1,
    First = 2,
    Next = 3,
}

impl Fragmentation {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Fragmentation::Single,
            1 => Fragmentation::Last,
            2 => Fragmentation::First,
            _ => Fragmentation::Next,
        }
    }
}

/// Header of one update block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateHeader {
    /// Raw update code, see [`UpdateCode`].
    pub code: u8,
    pub fragmentation: Fragmentation,
    pub compression: u8,
    /// Zero unless `compression` announced a flags byte.
    pub compression_flags: u8,
    pub size: u16,
}

/// Read an update block header.
pub fn read_update_header(c: &mut ReadCursor<'_>) -> Result<UpdateHeader> {
    let b = c.read_u8("updateHeader")?;
    let code = b & 0x0F;
    let fragmentation = Fragmentation::from_bits(b >> 4);
    let compression = (b >> 6) & 0x03;
    let compression_flags = if compression == FASTPATH_OUTPUT_COMPRESSION_USED {
        c.read_u8("compressionFlags")?
    } else {
        0
    };
    let size = c.read_u16("size")?;

    Ok(UpdateHeader {
        code,
        fragmentation,
        compression,
        compression_flags,
        size,
    })
}

/// Bulk decompressor for compressed update blocks.
///
/// # Example
///
/// ```rust,ignore
/// struct Mppc { /* history buffer */ }
///
/// impl BulkDecompressor for Mppc {
///     fn decompress(&mut self, input: &[u8], flags: u8, out: &mut BytesMut) -> Result<()> {
///         // expand `input` into `out`
///         Ok(())
///     }
/// }
/// ```
pub trait BulkDecompressor: Send {
    /// Expand `input` into `out`. `flags` is the compression-flags byte.
    fn decompress(&mut self, input: &[u8], flags: u8, out: &mut BytesMut) -> Result<()>;

    /// Drop history state. Called when the transport is reset.
    fn reset(&mut self) {}
}

/// Fragment reassembly state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentState {
    /// No fragmented update in progress.
    Idle,
    /// FIRST seen for update `code`, waiting for NEXT or LAST.
    Accumulating { code: u8 },
    /// A fatal error occurred; nothing is decoded until [`FastPath::reset`].
    Error,
}

/// Connection-scoped fast-path receiver.
pub struct FastPath {
    dispatcher: UpdateDispatcher,
    state: FragmentState,
    fragments: BytesMut,
    scratch: BytesMut,
    multifrag_max: usize,
    decompressor: Option<Box<dyn BulkDecompressor>>,
    last_header: Option<FastPathHeader>,
}

impl std::fmt::Debug for FastPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastPath")
            .field("state", &self.state)
            .field("fragments", &self.fragments.len())
            .field("multifrag_max", &self.multifrag_max)
            .field("decompressor", &self.decompressor.is_some())
            .finish()
    }
}

impl FastPath {
    /// Create a receiver for the negotiated values in `config`.
    pub fn new(config: &DecoderConfig) -> Self {
        FastPath {
            dispatcher: UpdateDispatcher::new(config),
            state: FragmentState::Idle,
            fragments: BytesMut::new(),
            scratch: BytesMut::new(),
            multifrag_max: config.multifrag_max_request_size as usize,
            decompressor: None,
            last_header: None,
        }
    }

    /// Use `decompressor` for blocks flagged as compressed.
    pub fn with_decompressor(mut self, decompressor: Box<dyn BulkDecompressor>) -> Self {
        self.decompressor = Some(decompressor);
        self
    }

    pub fn state(&self) -> FragmentState {
        self.state
    }

    /// Header of the last PDU passed to [`FastPath::process_pdu`], if it
    /// could be read.
    pub fn last_header(&self) -> Option<&FastPathHeader> {
        self.last_header.as_ref()
    }

    pub fn dispatcher(&self) -> &UpdateDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut UpdateDispatcher {
        &mut self.dispatcher
    }

    /// Apply a new multi-fragment maximum from capability exchange.
    pub fn set_multifrag_max(&mut self, max: u32) {
        self.multifrag_max = max as usize;
    }

    /// Restore connection-start state, clearing any error.
    pub fn reset(&mut self) {
        debug!("Resetting fast-path state");
        self.state = FragmentState::Idle;
        self.fragments.clear();
        self.scratch.clear();
        self.last_header = None;
        self.dispatcher.reset();
        if let Some(decompressor) = self.decompressor.as_mut() {
            decompressor.reset();
        }
    }

    /// Decode one complete fast-path PDU from the start of `pdu`.
    ///
    /// Returns the number of bytes the PDU occupied so a caller holding a
    /// stream of PDUs can advance past it.
    pub fn process_pdu(&mut self, pdu: &[u8], handler: &mut dyn UpdateHandler) -> Result<usize> {
        self.check_usable()?;
        let result = self.process_pdu_inner(pdu, handler);
        if result.is_err() {
            self.state = FragmentState::Error;
        }
        result
    }

    fn process_pdu_inner(&mut self, pdu: &[u8], handler: &mut dyn UpdateHandler) -> Result<usize> {
        self.last_header = None;
        let mut c = ReadCursor::new(pdu);
        let header = read_header(&mut c)?;
        self.last_header = Some(header);

        if header.encryption_flags != 0 {
            error!("Encrypted fast-path PDU, flags {:#x}", header.encryption_flags);
            return Err(DecodeError::violation(
                "encrypted fast-path PDU must be decrypted before decoding",
            ));
        }
        let body = c.read_slice("fpOutputUpdates", header.length - header.header_len)?;
        trace!("Fast-path PDU, {} bytes", header.length);

        self.process_updates_inner(body, handler)?;
        Ok(header.length)
    }

    /// Decode a decrypted update list, bracketed by begin/end paint.
    pub fn process_updates(&mut self, data: &[u8], handler: &mut dyn UpdateHandler) -> Result<()> {
        self.check_usable()?;
        let result = self.process_updates_inner(data, handler);
        if result.is_err() {
            self.state = FragmentState::Error;
        }
        result
    }

    fn check_usable(&self) -> Result<()> {
        if self.state == FragmentState::Error {
            return Err(DecodeError::violation(
                "fast-path receiver failed earlier and was not reset",
            ));
        }
        Ok(())
    }

    fn process_updates_inner(&mut self, data: &[u8], handler: &mut dyn UpdateHandler) -> Result<()> {
        let mut c = ReadCursor::new(data);
        handler.begin_paint();
        while c.remaining() >= MIN_UPDATE_SIZE {
            let start = c.position();
            if let Err(err) = self.process_update(&mut c, handler) {
                error!("Fast-path update at offset {} failed: {}", start, err);
                return Err(err);
            }
        }
        handler.end_paint();
        Ok(())
    }

    fn process_update(&mut self, c: &mut ReadCursor<'_>, handler: &mut dyn UpdateHandler) -> Result<()> {
        let header = read_update_header(c)?;
        let payload = c.read_slice("updateData", header.size as usize)?;
        trace!(
            code = header.code,
            fragmentation = ?header.fragmentation,
            size = header.size,
            "Update block"
        );

        let data: &[u8] = if header.compression_flags & PACKET_COMPRESSED != 0 {
            let decompressor = self.decompressor.as_mut().ok_or_else(|| {
                DecodeError::Decompression("compressed update without a bulk decompressor".into())
            })?;
            self.scratch.clear();
            decompressor.decompress(payload, header.compression_flags, &mut self.scratch)?;
            &self.scratch[..]
        } else {
            payload
        };

        match header.fragmentation {
            Fragmentation::Single => {
                if let FragmentState::Accumulating { code } = self.state {
                    return Err(DecodeError::violation(format!(
                        "SINGLE update while reassembling update code {}",
                        code
                    )));
                }
                deliver(&mut self.dispatcher, header.code, data, handler)
            }
            Fragmentation::First => {
                if let FragmentState::Accumulating { code } = self.state {
                    return Err(DecodeError::violation(format!(
                        "FIRST fragment while reassembling update code {}",
                        code
                    )));
                }
                self.fragments.clear();
                append_fragment(&mut self.fragments, data, self.multifrag_max)?;
                self.state = FragmentState::Accumulating { code: header.code };
                debug!("FIRST fragment for update code {}, {} bytes", header.code, data.len());
                Ok(())
            }
            Fragmentation::Next | Fragmentation::Last => {
                let code = match self.state {
                    FragmentState::Accumulating { code } => code,
                    _ => {
                        return Err(DecodeError::violation(format!(
                            "{:?} fragment without FIRST",
                            header.fragmentation
                        )))
                    }
                };
                if code != header.code {
                    return Err(DecodeError::violation(format!(
                        "{:?} fragment for update code {} while reassembling {}",
                        header.fragmentation, header.code, code
                    )));
                }
                append_fragment(&mut self.fragments, data, self.multifrag_max)?;

                if header.fragmentation == Fragmentation::Next {
                    debug!("NEXT fragment, {} bytes accumulated", self.fragments.len());
                    return Ok(());
                }
                debug!("LAST fragment, dispatching {} bytes", self.fragments.len());
                self.state = FragmentState::Idle;
                let result = deliver(&mut self.dispatcher, code, &self.fragments, handler);
                self.fragments.clear();
                result
            }
        }
    }
}

fn append_fragment(buf: &mut BytesMut, data: &[u8], max: usize) -> Result<()> {
    let size = buf.len() + data.len();
    if size > max {
        return Err(DecodeError::ResourceLimitExceeded {
            what: "fragment buffer",
            size,
            max,
        });
    }
    buf.put_slice(data);
    Ok(())
}

fn deliver(
    dispatcher: &mut UpdateDispatcher,
    code: u8,
    data: &[u8],
    handler: &mut dyn UpdateHandler,
) -> Result<()> {
    match UpdateCode::from_u8(code) {
        Some(code) => dispatcher.dispatch(code, &mut ReadCursor::new(data), handler),
        None => {
            warn!("Unknown fast-path update code {:#x}, skipping {} bytes", code, data.len());
            Ok(())
        }
    }
}
