//! Update dispatch
//!
//! Routes one reassembled update block to the reader for its update code and
//! delivers the result to the handler.

mod bitmap;
mod pointer;

pub use bitmap::{
    read_bitmap_data, read_bitmap_update, read_palette, BitmapData, BitmapUpdate, PaletteEntry,
    PaletteUpdate, BITMAP_COMPRESSION, MAX_PALETTE_ENTRIES, NO_BITMAP_COMPRESSION_HDR,
};
pub use pointer::{
    read_pointer_cached, read_pointer_color, read_pointer_large, read_pointer_new,
    read_pointer_position, PointerCachedUpdate, PointerColorUpdate, PointerLargeUpdate,
    PointerNewUpdate, PointerPositionUpdate, PointerSystemUpdate, LARGE_POINTER_MAX_DIMENSION,
    SYSPTR_DEFAULT, SYSPTR_NULL,
};

use tracing::{debug, error, trace, warn};

use crate::config::DecoderConfig;
use crate::cursor::ReadCursor;
use crate::error::{DecodeError, Result};
use crate::handler::{Renderer, UpdateHandler};
use crate::orders::OrderDecoder;
use crate::surface::SurfaceDecoder;

/// `updateType` preceding a bitmap update body.
pub const UPDATETYPE_BITMAP: u16 = 0x0001;
/// `updateType` preceding a palette update body.
pub const UPDATETYPE_PALETTE: u16 = 0x0002;

/// Fast-path update codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UpdateCode {
    Orders = 0x0,
    Bitmap = 0x1,
    Palette = 0x2,
    Synchronize = 0x3,
    SurfCmds = 0x4,
    PtrNull = 0x5,
    PtrDefault = 0x6,
    PtrPosition = 0x8,
    Color = 0x9,
    Cached = 0xA,
    Pointer = 0xB,
    LargePointer = 0xC,
}

impl UpdateCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x0 => UpdateCode::Orders,
            0x1 => UpdateCode::Bitmap,
            0x2 => UpdateCode::Palette,
            0x3 => UpdateCode::Synchronize,
            0x4 => UpdateCode::SurfCmds,
            0x5 => UpdateCode::PtrNull,
            0x6 => UpdateCode::PtrDefault,
            0x8 => UpdateCode::PtrPosition,
            0x9 => UpdateCode::Color,
            0xA => UpdateCode::Cached,
            0xB => UpdateCode::Pointer,
            0xC => UpdateCode::LargePointer,
            _ => return None,
        })
    }

    /// Whether this code carries a pointer update.
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            UpdateCode::PtrNull
                | UpdateCode::PtrDefault
                | UpdateCode::PtrPosition
                | UpdateCode::Color
                | UpdateCode::Cached
                | UpdateCode::Pointer
                | UpdateCode::LargePointer
        )
    }
}

/// Connection-scoped dispatcher owning the order and surface decoders.
#[derive(Debug)]
pub struct UpdateDispatcher {
    orders: OrderDecoder,
    surface: SurfaceDecoder,
    pointer_updates: bool,
    large_pointer: bool,
}

impl UpdateDispatcher {
    pub fn new(config: &DecoderConfig) -> Self {
        UpdateDispatcher {
            orders: OrderDecoder::new(config),
            surface: SurfaceDecoder::new(config),
            pointer_updates: config.pointer_updates,
            large_pointer: config.large_pointer,
        }
    }

    /// Drawing order state.
    pub fn orders(&self) -> &OrderDecoder {
        &self.orders
    }

    /// Surface command decoder, e.g. to update the desktop size.
    pub fn surface_mut(&mut self) -> &mut SurfaceDecoder {
        &mut self.surface
    }

    /// Restore connection-start order state.
    pub fn reset(&mut self) {
        self.orders.reset();
    }

    /// Decode one complete update block of type `code`.
    pub fn dispatch(
        &mut self,
        code: UpdateCode,
        c: &mut ReadCursor<'_>,
        handler: &mut dyn UpdateHandler,
    ) -> Result<()> {
        trace!(?code, size = c.remaining(), "Dispatching update");
        self.dispatch_inner(code, c, handler).map_err(|err| {
            error!(?code, offset = c.position(), %err, "Update failed");
            err
        })
    }

    fn dispatch_inner(
        &mut self,
        code: UpdateCode,
        c: &mut ReadCursor<'_>,
        handler: &mut dyn UpdateHandler,
    ) -> Result<()> {
        if code.is_pointer() && !self.pointer_updates {
            debug!(?code, "Pointer updates disabled, ignoring");
            return Ok(());
        }

        match code {
            UpdateCode::Orders => {
                let count = c.read_u16("numberOrders")?;
                self.orders.decode_orders(c, count, handler)?;
            }
            UpdateCode::Bitmap | UpdateCode::Palette => {
                match c.read_u16("updateType")? {
                    UPDATETYPE_BITMAP => handler.bitmap_update(&read_bitmap_update(c)?),
                    UPDATETYPE_PALETTE => handler.palette(&read_palette(c)?),
                    other => debug!(update_type = other, "Ignoring update type"),
                }
            }
            UpdateCode::Synchronize => {
                if c.remaining() >= 2 {
                    c.skip("pad2Octets", 2)?;
                } else {
                    warn!("Synchronize update without padding");
                }
                handler.synchronize();
            }
            UpdateCode::SurfCmds => self.surface.decode(c, handler)?,
            UpdateCode::PtrNull => handler.pointer_system(&PointerSystemUpdate::Null),
            UpdateCode::PtrDefault => handler.pointer_system(&PointerSystemUpdate::Default),
            UpdateCode::PtrPosition => handler.pointer_position(&read_pointer_position(c)?),
            UpdateCode::Color => handler.pointer_color(&read_pointer_color(c)?),
            UpdateCode::Cached => handler.pointer_cached(&read_pointer_cached(c)?),
            UpdateCode::Pointer => handler.pointer_new(&read_pointer_new(c)?),
            UpdateCode::LargePointer => {
                if !self.large_pointer {
                    return Err(DecodeError::violation(
                        "large pointer update without negotiated large pointer support",
                    ));
                }
                handler.pointer_large(&read_pointer_large(c)?);
            }
        }
        Ok(())
    }
}
