//! Surface command decoder
//!
//! A surface commands update is a sequence of records, each starting with a
//! 16-bit command type:
//!
//! ```text
//! SetSurfaceBits / StreamSurfaceBits
//! +---------+----------+---------+-----------+------------+--------------------+
//! | cmdType | destLeft | destTop | destRight | destBottom | TS_BITMAP_DATA_EX  |
//! +---------+----------+---------+-----------+------------+--------------------+
//! |    2    |    2     |    2    |     2     |     2      |     variable       |
//! +---------+----------+---------+-----------+------------+--------------------+
//!
//! FrameMarker
//! +---------+-------------+---------+
//! | cmdType | frameAction | frameId |
//! +---------+-------------+---------+
//! |    2    |      2      |    4    |
//! +---------+-------------+---------+
//! ```
//!
//! Records carry no length of their own, so an unknown command type ends
//! the whole update.

use tracing::{error, trace, warn};

use crate::config::DecoderConfig;
use crate::cursor::ReadCursor;
use crate::error::{DecodeError, Result};
use crate::handler::{Renderer, SurfaceCodec, UpdateHandler};

/// Bitmap-data-ex flag announcing the extended compressed header.
pub const EX_COMPRESSED_BITMAP_HEADER_PRESENT: u8 = 0x01;

/// Surface command types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SurfaceCommandType {
    SetSurfaceBits = 0x0001,
    FrameMarker = 0x0004,
    StreamSurfaceBits = 0x0040,
}

impl SurfaceCommandType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(SurfaceCommandType::SetSurfaceBits),
            0x0004 => Some(SurfaceCommandType::FrameMarker),
            0x0040 => Some(SurfaceCommandType::StreamSurfaceBits),
            _ => None,
        }
    }
}

/// Extended compressed bitmap header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExBitmapHeader {
    pub high_unique_id: u32,
    pub low_unique_id: u32,
    pub tm_milliseconds: u64,
    pub tm_seconds: u64,
}

/// `TS_BITMAP_DATA_EX` with a borrowed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapDataEx<'a> {
    pub bpp: u8,
    pub flags: u8,
    pub codec_id: u8,
    pub width: u16,
    pub height: u16,
    pub ex_header: Option<ExBitmapHeader>,
    /// Encoded payload, borrowed from the packet.
    pub data: &'a [u8],
}

/// Read a `TS_BITMAP_DATA_EX` block.
///
/// Shared by surface bits commands and cache bitmap v3 orders.
pub fn read_bitmap_data_ex<'a>(c: &mut ReadCursor<'a>) -> Result<BitmapDataEx<'a>> {
    c.ensure("bitmap data ex header", 12)?;
    let bpp = c.read_u8("bpp")?;
    let flags = c.read_u8("flags")?;
    c.skip("reserved", 1)?;
    let codec_id = c.read_u8("codecID")?;
    let width = c.read_u16("width")?;
    let height = c.read_u16("height")?;
    let length = c.read_u32("bitmapDataLength")? as usize;

    let ex_header = if flags & EX_COMPRESSED_BITMAP_HEADER_PRESENT != 0 {
        c.ensure("exBitmapDataHeader", 24)?;
        Some(ExBitmapHeader {
            high_unique_id: c.read_u32("highUniqueId")?,
            low_unique_id: c.read_u32("lowUniqueId")?,
            tm_milliseconds: c.read_u64("tmMilliseconds")?,
            tm_seconds: c.read_u64("tmSeconds")?,
        })
    } else {
        None
    };

    if length > c.remaining() {
        return Err(DecodeError::invalid(
            "bitmapDataLength",
            format!("{} exceeds the {} bytes remaining", length, c.remaining()),
        ));
    }
    let data = c.read_slice("bitmapData", length)?;

    Ok(BitmapDataEx {
        bpp,
        flags,
        codec_id,
        width,
        height,
        ex_header,
        data,
    })
}

/// Set or stream surface bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceBitsCommand<'a> {
    pub cmd_type: SurfaceCommandType,
    pub dest_left: u16,
    pub dest_top: u16,
    pub dest_right: u16,
    pub dest_bottom: u16,
    pub bitmap: BitmapDataEx<'a>,
}

/// Frame marker action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    Begin = 0,
    End = 1,
}

/// Surface frame marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFrameMarker {
    pub action: FrameAction,
    pub frame_id: u32,
}

/// Decodes surface command updates against the negotiated desktop size and
/// codec set.
#[derive(Debug, Clone)]
pub struct SurfaceDecoder {
    desktop_width: u16,
    desktop_height: u16,
    codecs: Vec<u8>,
}

impl SurfaceDecoder {
    /// Create a decoder from negotiated values.
    pub fn new(config: &DecoderConfig) -> Self {
        SurfaceDecoder {
            desktop_width: config.desktop_width,
            desktop_height: config.desktop_height,
            codecs: config.surface_codecs.clone(),
        }
    }

    /// Update the desktop size after a resize or reactivation.
    pub fn set_desktop_size(&mut self, width: u16, height: u16) {
        self.desktop_width = width;
        self.desktop_height = height;
    }

    /// Whether `codec_id` may appear in surface bits. Codec 0 is raw pixels.
    pub fn is_codec_allowed(&self, codec_id: u8) -> bool {
        codec_id == 0 || self.codecs.contains(&codec_id)
    }

    /// Decode every record in `c` and deliver each to `handler`.
    pub fn decode<H: UpdateHandler + ?Sized>(
        &self,
        c: &mut ReadCursor<'_>,
        handler: &mut H,
    ) -> Result<()> {
        while c.remaining() >= 2 {
            let start = c.position();
            if let Err(e) = self.decode_command(c, handler) {
                error!(offset = start, error = %e, "Surface command failed");
                return Err(e);
            }
        }
        Ok(())
    }

    fn decode_command<H: UpdateHandler + ?Sized>(
        &self,
        c: &mut ReadCursor<'_>,
        handler: &mut H,
    ) -> Result<()> {
        let raw = c.read_u16("cmdType")?;
        let cmd_type = SurfaceCommandType::from_u16(raw)
            .ok_or_else(|| DecodeError::violation(format!("unknown surface command 0x{:04X}", raw)))?;
        trace!(?cmd_type, offset = c.position() - 2, "Surface command");

        match cmd_type {
            SurfaceCommandType::SetSurfaceBits | SurfaceCommandType::StreamSurfaceBits => {
                let command = self.read_surface_bits(c, cmd_type)?;
                let pixels = handler.decompress(&command)?;
                handler.surface_bits(&command, &pixels);
            }
            SurfaceCommandType::FrameMarker => {
                let marker = read_frame_marker(c)?;
                handler.surface_frame_marker(&marker);
            }
        }
        Ok(())
    }

    fn read_surface_bits<'a>(
        &self,
        c: &mut ReadCursor<'a>,
        cmd_type: SurfaceCommandType,
    ) -> Result<SurfaceBitsCommand<'a>> {
        c.ensure("surface bits destination", 8)?;
        let dest_left = c.read_u16("destLeft")?;
        let dest_top = c.read_u16("destTop")?;
        let dest_right = c.read_u16("destRight")?;
        let dest_bottom = c.read_u16("destBottom")?;

        if dest_left >= dest_right {
            return Err(DecodeError::invalid(
                "destRight",
                format!("{} is not right of destLeft {}", dest_right, dest_left),
            ));
        }
        if dest_top >= dest_bottom {
            return Err(DecodeError::invalid(
                "destBottom",
                format!("{} is not below destTop {}", dest_bottom, dest_top),
            ));
        }
        if dest_right > self.desktop_width {
            return Err(DecodeError::invalid(
                "destRight",
                format!("{} beyond desktop width {}", dest_right, self.desktop_width),
            ));
        }
        if dest_bottom > self.desktop_height {
            return Err(DecodeError::invalid(
                "destBottom",
                format!("{} beyond desktop height {}", dest_bottom, self.desktop_height),
            ));
        }

        let bitmap = read_bitmap_data_ex(c)?;
        if !self.is_codec_allowed(bitmap.codec_id) {
            return Err(DecodeError::invalid(
                "codecID",
                format!("codec {} was not negotiated", bitmap.codec_id),
            ));
        }

        Ok(SurfaceBitsCommand {
            cmd_type,
            dest_left,
            dest_top,
            dest_right,
            dest_bottom,
            bitmap,
        })
    }
}

fn read_frame_marker(c: &mut ReadCursor<'_>) -> Result<SurfaceFrameMarker> {
    let action = match c.read_u16("frameAction")? {
        0 => FrameAction::Begin,
        1 => FrameAction::End,
        other => {
            return Err(DecodeError::invalid(
                "frameAction",
                format!("unknown action {}", other),
            ))
        }
    };

    // some servers end the block right after the action
    let frame_id = if c.remaining() >= 4 {
        c.read_u32("frameId")?
    } else {
        warn!(?action, "Frame marker without frame id, using 0");
        c.read_remaining();
        0
    };

    Ok(SurfaceFrameMarker { action, frame_id })
}
