//! Alternate secondary orders
//!
//! The order type sits in the upper six bits of the control byte and there
//! is no length field, so every body must be understood to be skipped.

use tracing::{debug, trace};

use crate::cursor::ReadCursor;
use crate::error::{DecodeError, Result};
use crate::handler::Renderer;
use crate::primitives::read_color_ref;

const DELETE_LIST_PRESENT: u16 = 0x8000;
const STREAM_BITMAP_V2: u8 = 0x04;
const WINDOW_ORDER_HEADER: usize = 3;

/// Alternate secondary order types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AltSecOrderType {
    SwitchSurface = 0x00,
    CreateOffscreenBitmap = 0x01,
    StreamBitmapFirst = 0x02,
    StreamBitmapNext = 0x03,
    CreateNineGridBitmap = 0x04,
    GdiPlusFirst = 0x05,
    GdiPlusNext = 0x06,
    GdiPlusEnd = 0x07,
    GdiPlusCacheFirst = 0x08,
    GdiPlusCacheNext = 0x09,
    GdiPlusCacheEnd = 0x0A,
    Window = 0x0B,
    CompDeskFirst = 0x0C,
    FrameMarker = 0x0D,
}

impl AltSecOrderType {
    /// Map a wire value to an order type.
    pub fn from_u8(value: u8) -> Option<Self> {
        use AltSecOrderType::*;
        let kind = match value {
            0x00 => SwitchSurface,
            0x01 => CreateOffscreenBitmap,
            0x02 => StreamBitmapFirst,
            0x03 => StreamBitmapNext,
            0x04 => CreateNineGridBitmap,
            0x05 => GdiPlusFirst,
            0x06 => GdiPlusNext,
            0x07 => GdiPlusEnd,
            0x08 => GdiPlusCacheFirst,
            0x09 => GdiPlusCacheNext,
            0x0A => GdiPlusCacheEnd,
            0x0B => Window,
            0x0C => CompDeskFirst,
            0x0D => FrameMarker,
            _ => return None,
        };
        Some(kind)
    }
}

/// Switch the drawing target to an offscreen surface (0xFFFF: the screen).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchSurfaceOrder {
    /// Target surface id
    pub bitmap_id: u16,
}

/// Create an offscreen surface, optionally deleting others first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOffscreenBitmapOrder {
    /// Surface id (15 bits)
    pub id: u16,
    /// Width
    pub cx: u16,
    /// Height
    pub cy: u16,
    /// Surfaces to delete
    pub delete_list: Vec<u16>,
}

/// Create a nine-grid bitmap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateNineGridBitmapOrder {
    /// Bits per pixel
    pub bitmap_bpp: u8,
    /// Bitmap id
    pub bitmap_id: u16,
    /// Nine-grid flags
    pub fl_flags: u32,
    /// Left column width
    pub left_width: u16,
    /// Right column width
    pub right_width: u16,
    /// Top row height
    pub top_height: u16,
    /// Bottom row height
    pub bottom_height: u16,
    /// Transparent color
    pub transparent: u32,
}

/// Frame boundary in the order stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameMarkerOrder {
    /// 0 begins a frame, 1 ends it
    pub action: u32,
}

/// First block of a streamed bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBitmapFirstOrder<'a> {
    /// Stream flags
    pub bitmap_flags: u8,
    /// Bits per pixel
    pub bitmap_bpp: u8,
    /// Bitmap type
    pub bitmap_type: u16,
    /// Width
    pub bitmap_width: u16,
    /// Height
    pub bitmap_height: u16,
    /// Total size of the streamed bitmap
    pub bitmap_size: u32,
    /// This block's bytes
    pub block: &'a [u8],
}

/// Subsequent block of a streamed bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBitmapNextOrder<'a> {
    /// Stream flags
    pub bitmap_flags: u8,
    /// Bitmap type
    pub bitmap_type: u16,
    /// This block's bytes
    pub block: &'a [u8],
}

/// GDI+ drawing fragment. The total sizes are zero on `next` fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdiPlusOrder<'a> {
    /// Size of all fragments
    pub cb_total_size: u32,
    /// Size of all EMF records
    pub cb_total_emf_size: u32,
    /// EMF records carried by this fragment
    pub emf_records: &'a [u8],
}

/// GDI+ cache fragment. The total size is zero on `next` fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdiPlusCacheOrder<'a> {
    /// Cache flags
    pub flags: u8,
    /// Cache type
    pub cache_type: u16,
    /// Slot within the cache
    pub cache_index: u16,
    /// Size of all fragments
    pub cb_total_size: u32,
    /// EMF records carried by this fragment
    pub emf_records: &'a [u8],
}

/// Window order, left unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOrder<'a> {
    /// Fields-present flags
    pub fields_present: u32,
    /// Everything after the flags
    pub data: &'a [u8],
}

/// Decode one alternate secondary order whose type came from the control
/// byte, and deliver it.
pub(crate) fn decode<H: Renderer + ?Sized>(
    c: &mut ReadCursor<'_>,
    order_type: u8,
    handler: &mut H,
) -> Result<()> {
    let kind = AltSecOrderType::from_u8(order_type).ok_or_else(|| {
        DecodeError::violation(format!(
            "unknown alternate secondary order 0x{:02X}",
            order_type
        ))
    })?;
    trace!(order = ?kind, "alternate secondary order");

    match kind {
        AltSecOrderType::SwitchSurface => {
            let order = SwitchSurfaceOrder {
                bitmap_id: c.read_u16("bitmapId")?,
            };
            handler.switch_surface(&order);
        }
        AltSecOrderType::CreateOffscreenBitmap => {
            handler.create_offscreen_bitmap(&read_create_offscreen_bitmap(c)?)
        }
        AltSecOrderType::CreateNineGridBitmap => {
            handler.create_nine_grid_bitmap(&read_create_nine_grid_bitmap(c)?)
        }
        AltSecOrderType::FrameMarker => {
            let order = FrameMarkerOrder {
                action: c.read_u32("action")?,
            };
            handler.frame_marker(&order);
        }
        AltSecOrderType::StreamBitmapFirst => {
            handler.stream_bitmap_first(&read_stream_bitmap_first(c)?)
        }
        AltSecOrderType::StreamBitmapNext => {
            c.ensure("stream bitmap next header", 5)?;
            let bitmap_flags = c.read_u8("bitmapFlags")?;
            let bitmap_type = c.read_u16("bitmapType")?;
            let block = read_block16(c, "bitmapBlock")?;
            handler.stream_bitmap_next(&StreamBitmapNextOrder {
                bitmap_flags,
                bitmap_type,
                block,
            });
        }
        AltSecOrderType::GdiPlusFirst => handler.gdiplus_first(&read_gdiplus(c)?),
        AltSecOrderType::GdiPlusNext => {
            c.skip("pad1Octet", 1)?;
            let emf_records = read_block16(c, "emfRecords")?;
            handler.gdiplus_next(&GdiPlusOrder {
                cb_total_size: 0,
                cb_total_emf_size: 0,
                emf_records,
            });
        }
        AltSecOrderType::GdiPlusEnd => handler.gdiplus_end(&read_gdiplus(c)?),
        AltSecOrderType::GdiPlusCacheFirst => {
            handler.gdiplus_cache_first(&read_gdiplus_cache(c, true)?)
        }
        AltSecOrderType::GdiPlusCacheNext => {
            handler.gdiplus_cache_next(&read_gdiplus_cache(c, false)?)
        }
        AltSecOrderType::GdiPlusCacheEnd => {
            handler.gdiplus_cache_end(&read_gdiplus_cache(c, true)?)
        }
        AltSecOrderType::Window => handler.window_order(&read_window(c)?),
        AltSecOrderType::CompDeskFirst => {
            let operation = c.read_u8("operation")?;
            let size = c.read_u16("size")?;
            c.skip("compdesk payload", usize::from(size))?;
            debug!(operation, size, "skipped desktop composition order");
        }
    }
    Ok(())
}

/// A u16 length followed by that many bytes.
fn read_block16<'a>(c: &mut ReadCursor<'a>, field: &'static str) -> Result<&'a [u8]> {
    let size = c.read_u16(field)?;
    c.read_slice(field, usize::from(size))
}

fn read_create_offscreen_bitmap(c: &mut ReadCursor<'_>) -> Result<CreateOffscreenBitmapOrder> {
    c.ensure("create offscreen bitmap", 6)?;
    let flags = c.read_u16("flags")?;
    let cx = c.read_u16("cx")?;
    let cy = c.read_u16("cy")?;

    let mut delete_list = Vec::new();
    if flags & DELETE_LIST_PRESENT != 0 {
        let count = usize::from(c.read_u16("cIndices")?);
        c.ensure("indices", count * 2)?;
        delete_list = (0..count)
            .map(|_| c.read_u16("indices"))
            .collect::<Result<Vec<_>>>()?;
    }

    Ok(CreateOffscreenBitmapOrder {
        id: flags & 0x7FFF,
        cx,
        cy,
        delete_list,
    })
}

fn read_create_nine_grid_bitmap(c: &mut ReadCursor<'_>) -> Result<CreateNineGridBitmapOrder> {
    c.ensure("create nine grid bitmap", 19)?;
    Ok(CreateNineGridBitmapOrder {
        bitmap_bpp: c.read_u8("bitmapBpp")?,
        bitmap_id: c.read_u16("bitmapId")?,
        fl_flags: c.read_u32("flFlags")?,
        left_width: c.read_u16("ulLeftWidth")?,
        right_width: c.read_u16("ulRightWidth")?,
        top_height: c.read_u16("ulTopHeight")?,
        bottom_height: c.read_u16("ulBottomHeight")?,
        transparent: read_color_ref(c)?,
    })
}

fn read_stream_bitmap_first<'a>(c: &mut ReadCursor<'a>) -> Result<StreamBitmapFirstOrder<'a>> {
    c.ensure("stream bitmap first header", 10)?;
    let bitmap_flags = c.read_u8("bitmapFlags")?;
    let bitmap_bpp = c.read_u8("bitmapBpp")?;
    let bitmap_type = c.read_u16("bitmapType")?;
    let bitmap_width = c.read_u16("bitmapWidth")?;
    let bitmap_height = c.read_u16("bitmapHeight")?;
    let bitmap_size = if bitmap_flags & STREAM_BITMAP_V2 != 0 {
        c.read_u32("bitmapSize")?
    } else {
        u32::from(c.read_u16("bitmapSize")?)
    };
    let block = read_block16(c, "bitmapBlock")?;

    Ok(StreamBitmapFirstOrder {
        bitmap_flags,
        bitmap_bpp,
        bitmap_type,
        bitmap_width,
        bitmap_height,
        bitmap_size,
        block,
    })
}

fn read_gdiplus<'a>(c: &mut ReadCursor<'a>) -> Result<GdiPlusOrder<'a>> {
    c.ensure("gdiplus header", 11)?;
    c.skip("pad1Octet", 1)?;
    let cb_size = c.read_u16("cbSize")?;
    let cb_total_size = c.read_u32("cbTotalSize")?;
    let cb_total_emf_size = c.read_u32("cbTotalEmfSize")?;
    let emf_records = c.read_slice("emfRecords", usize::from(cb_size))?;
    Ok(GdiPlusOrder {
        cb_total_size,
        cb_total_emf_size,
        emf_records,
    })
}

fn read_gdiplus_cache<'a>(c: &mut ReadCursor<'a>, with_total: bool) -> Result<GdiPlusCacheOrder<'a>> {
    c.ensure("gdiplus cache header", if with_total { 11 } else { 7 })?;
    let flags = c.read_u8("flags")?;
    let cache_type = c.read_u16("cacheType")?;
    let cache_index = c.read_u16("cacheIndex")?;
    let cb_size = c.read_u16("cbSize")?;
    let cb_total_size = if with_total {
        c.read_u32("cbTotalSize")?
    } else {
        0
    };
    let emf_records = c.read_slice("emfRecords", usize::from(cb_size))?;
    Ok(GdiPlusCacheOrder {
        flags,
        cache_type,
        cache_index,
        cb_total_size,
        emf_records,
    })
}

fn read_window<'a>(c: &mut ReadCursor<'a>) -> Result<WindowOrder<'a>> {
    let order_size = usize::from(c.read_u16("orderSize")?);
    if order_size < WINDOW_ORDER_HEADER + 4 {
        return Err(DecodeError::invalid(
            "orderSize",
            format!("{} is smaller than the window order header", order_size),
        ));
    }
    let mut body = c.sub_cursor("window order", order_size - WINDOW_ORDER_HEADER)?;
    let fields_present = body.read_u32("fieldsPresentFlags")?;
    Ok(WindowOrder {
        fields_present,
        data: body.read_remaining(),
    })
}
