//! Primary drawing orders
//!
//! Each order type has a fixed number of field-flags bytes. A set bit `n`
//! (1-based) in the mask means field `n` is on the wire; every other field
//! keeps the value it had after the previous order of the same type.

use serde::{Deserialize, Serialize};

use crate::cursor::ReadCursor;
use crate::error::Result;
use crate::handler::Renderer;
use crate::primitives::{
    read_color, read_coord, read_delta_points, read_delta_rects, DeltaPoint, DeltaRect,
};

use super::{read_glyph_v2, GlyphData, OrderInfo};

/// Bits per pixel indexed by brush bitmap format.
pub(crate) const BMF_BPP: [u8; 7] = [0, 1, 0, 8, 16, 24, 32];

const CACHED_BRUSH: u8 = 0x80;

/// Primary drawing order types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PrimaryOrderType {
    /// Destination-only blit
    DstBlt = 0x00,
    /// Pattern blit
    PatBlt = 0x01,
    /// Screen-to-screen blit
    ScrBlt = 0x02,
    /// Nine-grid stretch
    DrawNineGrid = 0x07,
    /// Clipped nine-grid stretch
    MultiDrawNineGrid = 0x08,
    /// Single line
    LineTo = 0x09,
    /// Solid rectangle fill
    OpaqueRect = 0x0A,
    /// Save or restore a screen region
    SaveBitmap = 0x0B,
    /// Cached bitmap blit
    MemBlt = 0x0D,
    /// Cached bitmap blit with pattern
    Mem3Blt = 0x0E,
    /// Clipped destination-only blit
    MultiDstBlt = 0x0F,
    /// Clipped pattern blit
    MultiPatBlt = 0x10,
    /// Clipped screen-to-screen blit
    MultiScrBlt = 0x11,
    /// Clipped solid rectangle fill
    MultiOpaqueRect = 0x12,
    /// Glyph run with compact layout
    FastIndex = 0x13,
    /// Solid color polygon
    PolygonSc = 0x14,
    /// Brushed polygon
    PolygonCb = 0x15,
    /// Connected line segments
    Polyline = 0x16,
    /// Single glyph, optionally carrying its bitmap
    FastGlyph = 0x18,
    /// Solid color ellipse
    EllipseSc = 0x19,
    /// Brushed ellipse
    EllipseCb = 0x1A,
    /// Glyph run
    GlyphIndex = 0x1B,
}

impl PrimaryOrderType {
    /// Every primary order type, in wire value order.
    pub const ALL: [PrimaryOrderType; 22] = [
        PrimaryOrderType::DstBlt,
        PrimaryOrderType::PatBlt,
        PrimaryOrderType::ScrBlt,
        PrimaryOrderType::DrawNineGrid,
        PrimaryOrderType::MultiDrawNineGrid,
        PrimaryOrderType::LineTo,
        PrimaryOrderType::OpaqueRect,
        PrimaryOrderType::SaveBitmap,
        PrimaryOrderType::MemBlt,
        PrimaryOrderType::Mem3Blt,
        PrimaryOrderType::MultiDstBlt,
        PrimaryOrderType::MultiPatBlt,
        PrimaryOrderType::MultiScrBlt,
        PrimaryOrderType::MultiOpaqueRect,
        PrimaryOrderType::FastIndex,
        PrimaryOrderType::PolygonSc,
        PrimaryOrderType::PolygonCb,
        PrimaryOrderType::Polyline,
        PrimaryOrderType::FastGlyph,
        PrimaryOrderType::EllipseSc,
        PrimaryOrderType::EllipseCb,
        PrimaryOrderType::GlyphIndex,
    ];

    /// Map a wire value to an order type.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| *t as u8 == value)
    }

    /// Number of field-flags bytes this order type carries.
    pub fn field_bytes(self) -> u8 {
        use PrimaryOrderType::*;
        match self {
            DstBlt | ScrBlt | DrawNineGrid | MultiDrawNineGrid | OpaqueRect | SaveBitmap
            | MultiDstBlt | PolygonSc | Polyline | EllipseSc => 1,
            PatBlt | LineTo | MemBlt | MultiPatBlt | MultiScrBlt | MultiOpaqueRect | FastIndex
            | PolygonCb | FastGlyph | EllipseCb => 2,
            Mem3Blt | GlyphIndex => 3,
        }
    }
}

/// Background mix mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackMode {
    /// Background left untouched
    Transparent = 1,
    /// Background filled
    #[default]
    Opaque = 2,
}

/// Brush used by pattern-carrying orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Brush {
    /// Horizontal origin
    pub x: u8,
    /// Vertical origin
    pub y: u8,
    /// Brush style, bit 7 set for a cached brush
    pub style: u8,
    /// Hatch style, or cache index for a cached brush
    pub hatch: u8,
    /// Cache index of a cached brush
    pub index: u8,
    /// Bits per pixel of a cached brush
    pub bpp: u8,
    /// 8x8 1bpp pattern, row 0 first
    pub data: [u8; 8],
}

/// DstBlt (type 0x00).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DstBltOrder {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Ternary raster operation
    pub rop: u8,
}

/// PatBlt (type 0x01).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatBltOrder {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Ternary raster operation
    pub rop: u8,
    /// Background color
    pub back_color: u32,
    /// Foreground color
    pub fore_color: u32,
    /// Pattern brush
    pub brush: Brush,
}

/// ScrBlt (type 0x02).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrBltOrder {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Ternary raster operation
    pub rop: u8,
    /// Source x
    pub x_src: i32,
    /// Source y
    pub y_src: i32,
}

/// OpaqueRect (type 0x0A).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpaqueRectOrder {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Fill color, `0x00BBGGRR`
    pub color: u32,
}

/// DrawNineGrid (type 0x07).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawNineGridOrder {
    /// Source left
    pub src_left: i32,
    /// Source top
    pub src_top: i32,
    /// Source right
    pub src_right: i32,
    /// Source bottom
    pub src_bottom: i32,
    /// Nine-grid bitmap id
    pub bitmap_id: u16,
}

/// MultiDstBlt (type 0x0F).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiDstBltOrder {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Ternary raster operation
    pub rop: u8,
    /// Number of clip rectangles
    pub num_rectangles: u8,
    /// Size of the encoded rectangle block
    pub cb_data: u16,
    /// Clip rectangles
    pub rectangles: Vec<DeltaRect>,
}

/// MultiPatBlt (type 0x10).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiPatBltOrder {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Ternary raster operation
    pub rop: u8,
    /// Background color
    pub back_color: u32,
    /// Foreground color
    pub fore_color: u32,
    /// Pattern brush
    pub brush: Brush,
    /// Number of clip rectangles
    pub num_rectangles: u8,
    /// Size of the encoded rectangle block
    pub cb_data: u16,
    /// Clip rectangles
    pub rectangles: Vec<DeltaRect>,
}

/// MultiScrBlt (type 0x11).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiScrBltOrder {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Ternary raster operation
    pub rop: u8,
    /// Source x
    pub x_src: i32,
    /// Source y
    pub y_src: i32,
    /// Number of clip rectangles
    pub num_rectangles: u8,
    /// Size of the encoded rectangle block
    pub cb_data: u16,
    /// Clip rectangles
    pub rectangles: Vec<DeltaRect>,
}

/// MultiOpaqueRect (type 0x12).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiOpaqueRectOrder {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Fill color, `0x00BBGGRR`
    pub color: u32,
    /// Number of clip rectangles
    pub num_rectangles: u8,
    /// Size of the encoded rectangle block
    pub cb_data: u16,
    /// Clip rectangles
    pub rectangles: Vec<DeltaRect>,
}

/// MultiDrawNineGrid (type 0x08). The delta entries are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiDrawNineGridOrder {
    /// Source left
    pub src_left: i32,
    /// Source top
    pub src_top: i32,
    /// Source right
    pub src_right: i32,
    /// Source bottom
    pub src_bottom: i32,
    /// Nine-grid bitmap id
    pub bitmap_id: u16,
    /// Number of delta entries
    pub n_delta_entries: u8,
    /// Size of the skipped delta block
    pub cb_data: u16,
}

/// LineTo (type 0x09).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineToOrder {
    /// Background mix mode, as sent
    pub back_mode: u16,
    /// Start x
    pub x_start: i32,
    /// Start y
    pub y_start: i32,
    /// End x
    pub x_end: i32,
    /// End y
    pub y_end: i32,
    /// Background color
    pub back_color: u32,
    /// Binary raster operation
    pub rop2: u8,
    /// Pen style
    pub pen_style: u8,
    /// Pen width
    pub pen_width: u8,
    /// Pen color
    pub pen_color: u32,
}

/// Polyline (type 0x16).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolylineOrder {
    /// Start x
    pub x_start: i32,
    /// Start y
    pub y_start: i32,
    /// Binary raster operation
    pub rop2: u8,
    /// Pen color
    pub pen_color: u32,
    /// Number of points
    pub num_points: u8,
    /// Size of the encoded point block
    pub cb_data: u8,
    /// Point offsets, each relative to the previous point
    pub points: Vec<DeltaPoint>,
}

/// MemBlt (type 0x0D).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemBltOrder {
    /// Bitmap cache id (low byte of the wire field)
    pub cache_id: u8,
    /// Color table index (high byte of the wire field)
    pub color_index: u8,
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Ternary raster operation
    pub rop: u8,
    /// Source x
    pub x_src: i32,
    /// Source y
    pub y_src: i32,
    /// Slot within the bitmap cache
    pub cache_index: u16,
}

/// Mem3Blt (type 0x0E).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mem3BltOrder {
    /// Bitmap cache id (low byte of the wire field)
    pub cache_id: u8,
    /// Color table index (high byte of the wire field)
    pub color_index: u8,
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
    /// Ternary raster operation
    pub rop: u8,
    /// Source x
    pub x_src: i32,
    /// Source y
    pub y_src: i32,
    /// Background color
    pub back_color: u32,
    /// Foreground color
    pub fore_color: u32,
    /// Pattern brush
    pub brush: Brush,
    /// Slot within the bitmap cache
    pub cache_index: u16,
}

/// SaveBitmap (type 0x0B).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveBitmapOrder {
    /// Position in the save-bitmap area
    pub saved_bitmap_position: u32,
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Right edge
    pub right: i32,
    /// Bottom edge
    pub bottom: i32,
    /// Save (0) or restore (1)
    pub operation: u8,
}

/// GlyphIndex (type 0x1B).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphIndexOrder {
    /// Glyph cache id
    pub cache_id: u8,
    /// Acceleration flags
    pub fl_accel: u8,
    /// Fixed character advance
    pub ul_char_inc: u8,
    /// Opaque rectangle is redundant
    pub f_op_redundant: u8,
    /// Background color
    pub back_color: u32,
    /// Foreground color
    pub fore_color: u32,
    /// Background rectangle left
    pub bk_left: i32,
    /// Background rectangle top
    pub bk_top: i32,
    /// Background rectangle right
    pub bk_right: i32,
    /// Background rectangle bottom
    pub bk_bottom: i32,
    /// Opaque rectangle left
    pub op_left: i32,
    /// Opaque rectangle top
    pub op_top: i32,
    /// Opaque rectangle right
    pub op_right: i32,
    /// Opaque rectangle bottom
    pub op_bottom: i32,
    /// Pattern brush
    pub brush: Brush,
    /// Baseline x
    pub x: i32,
    /// Baseline y
    pub y: i32,
    /// Glyph fragment data
    pub data: Vec<u8>,
}

/// FastIndex (type 0x13).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastIndexOrder {
    /// Glyph cache id
    pub cache_id: u8,
    /// Fixed character advance
    pub ul_char_inc: u8,
    /// Acceleration flags
    pub fl_accel: u8,
    /// Background color
    pub back_color: u32,
    /// Foreground color
    pub fore_color: u32,
    /// Background rectangle left
    pub bk_left: i32,
    /// Background rectangle top
    pub bk_top: i32,
    /// Background rectangle right
    pub bk_right: i32,
    /// Background rectangle bottom
    pub bk_bottom: i32,
    /// Opaque rectangle left
    pub op_left: i32,
    /// Opaque rectangle top
    pub op_top: i32,
    /// Opaque rectangle right
    pub op_right: i32,
    /// Opaque rectangle bottom
    pub op_bottom: i32,
    /// Baseline x
    pub x: i32,
    /// Baseline y
    pub y: i32,
    /// Glyph fragment data
    pub data: Vec<u8>,
}

/// FastGlyph (type 0x18).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastGlyphOrder {
    /// Glyph cache id
    pub cache_id: u8,
    /// Fixed character advance
    pub ul_char_inc: u8,
    /// Acceleration flags
    pub fl_accel: u8,
    /// Background color
    pub back_color: u32,
    /// Foreground color
    pub fore_color: u32,
    /// Background rectangle left
    pub bk_left: i32,
    /// Background rectangle top
    pub bk_top: i32,
    /// Background rectangle right
    pub bk_right: i32,
    /// Background rectangle bottom
    pub bk_bottom: i32,
    /// Opaque rectangle left
    pub op_left: i32,
    /// Opaque rectangle top
    pub op_top: i32,
    /// Opaque rectangle right
    pub op_right: i32,
    /// Opaque rectangle bottom
    pub op_bottom: i32,
    /// Baseline x
    pub x: i32,
    /// Baseline y
    pub y: i32,
    /// Raw glyph data block
    pub data: Vec<u8>,
    /// Inline glyph, present when the data block is longer than one byte
    pub glyph: Option<GlyphData>,
}

/// PolygonSC (type 0x14).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolygonScOrder {
    /// Start x
    pub x_start: i32,
    /// Start y
    pub y_start: i32,
    /// Binary raster operation
    pub rop2: u8,
    /// Fill mode
    pub fill_mode: u8,
    /// Fill color
    pub brush_color: u32,
    /// Number of points
    pub num_points: u8,
    /// Size of the encoded point block
    pub cb_data: u8,
    /// Point offsets, each relative to the previous point
    pub points: Vec<DeltaPoint>,
}

/// PolygonCB (type 0x15).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolygonCbOrder {
    /// Start x
    pub x_start: i32,
    /// Start y
    pub y_start: i32,
    /// Binary raster operation (low five bits of the wire field)
    pub rop2: u8,
    /// Background mode (bit 7 of the wire field)
    pub back_mode: BackMode,
    /// Fill mode
    pub fill_mode: u8,
    /// Background color
    pub back_color: u32,
    /// Foreground color
    pub fore_color: u32,
    /// Pattern brush
    pub brush: Brush,
    /// Number of points
    pub num_points: u8,
    /// Size of the encoded point block
    pub cb_data: u8,
    /// Point offsets, each relative to the previous point
    pub points: Vec<DeltaPoint>,
}

/// EllipseSC (type 0x19).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EllipseScOrder {
    /// Bounding box left
    pub left: i32,
    /// Bounding box top
    pub top: i32,
    /// Bounding box right
    pub right: i32,
    /// Bounding box bottom
    pub bottom: i32,
    /// Binary raster operation
    pub rop2: u8,
    /// Fill mode
    pub fill_mode: u8,
    /// Fill color
    pub color: u32,
}

/// EllipseCB (type 0x1A).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EllipseCbOrder {
    /// Bounding box left
    pub left: i32,
    /// Bounding box top
    pub top: i32,
    /// Bounding box right
    pub right: i32,
    /// Bounding box bottom
    pub bottom: i32,
    /// Binary raster operation
    pub rop2: u8,
    /// Fill mode
    pub fill_mode: u8,
    /// Background color
    pub back_color: u32,
    /// Foreground color
    pub fore_color: u32,
    /// Pattern brush
    pub brush: Brush,
}

/// Last decoded value of every primary order, one record per type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PrimaryState {
    pub dst_blt: DstBltOrder,
    pub pat_blt: PatBltOrder,
    pub scr_blt: ScrBltOrder,
    pub opaque_rect: OpaqueRectOrder,
    pub draw_nine_grid: DrawNineGridOrder,
    pub multi_dst_blt: MultiDstBltOrder,
    pub multi_pat_blt: MultiPatBltOrder,
    pub multi_scr_blt: MultiScrBltOrder,
    pub multi_opaque_rect: MultiOpaqueRectOrder,
    pub multi_draw_nine_grid: MultiDrawNineGridOrder,
    pub line_to: LineToOrder,
    pub polyline: PolylineOrder,
    pub mem_blt: MemBltOrder,
    pub mem3_blt: Mem3BltOrder,
    pub save_bitmap: SaveBitmapOrder,
    pub glyph_index: GlyphIndexOrder,
    pub fast_index: FastIndexOrder,
    pub fast_glyph: FastGlyphOrder,
    pub polygon_sc: PolygonScOrder,
    pub polygon_cb: PolygonCbOrder,
    pub ellipse_sc: EllipseScOrder,
    pub ellipse_cb: EllipseCbOrder,
}

/// Field-presence mask of the order being decoded.
struct Fields {
    flags: u32,
    delta: bool,
}

impl Fields {
    fn has(&self, n: u32) -> bool {
        self.flags & 1 << (n - 1) != 0
    }

    fn coord(&self, c: &mut ReadCursor<'_>, n: u32, target: &mut i32) -> Result<()> {
        if self.has(n) {
            read_coord(c, target, self.delta)?;
        }
        Ok(())
    }

    fn byte(&self, c: &mut ReadCursor<'_>, n: u32, name: &'static str, target: &mut u8) -> Result<()> {
        if self.has(n) {
            *target = c.read_u8(name)?;
        }
        Ok(())
    }

    fn word(&self, c: &mut ReadCursor<'_>, n: u32, name: &'static str, target: &mut u16) -> Result<()> {
        if self.has(n) {
            *target = c.read_u16(name)?;
        }
        Ok(())
    }

    fn signed_word(
        &self,
        c: &mut ReadCursor<'_>,
        n: u32,
        name: &'static str,
        target: &mut i32,
    ) -> Result<()> {
        if self.has(n) {
            *target = i32::from(c.read_i16(name)?);
        }
        Ok(())
    }

    fn dword(&self, c: &mut ReadCursor<'_>, n: u32, name: &'static str, target: &mut u32) -> Result<()> {
        if self.has(n) {
            *target = c.read_u32(name)?;
        }
        Ok(())
    }

    fn color(&self, c: &mut ReadCursor<'_>, n: u32, target: &mut u32) -> Result<()> {
        if self.has(n) {
            *target = read_color(c)?;
        }
        Ok(())
    }

    /// Replace one channel byte of a packed color.
    fn color_byte(&self, c: &mut ReadCursor<'_>, n: u32, shift: u32, target: &mut u32) -> Result<()> {
        if self.has(n) {
            let byte = c.read_u8("color channel")?;
            *target = (*target & !(0xFF << shift)) | u32::from(byte) << shift;
        }
        Ok(())
    }

    /// Fields of an embedded brush start at bit `first`.
    fn brush(&self, c: &mut ReadCursor<'_>, first: u32, brush: &mut Brush) -> Result<()> {
        let sub = Fields {
            flags: self.flags >> (first - 1),
            delta: self.delta,
        };
        sub.byte(c, 1, "brushOrgX", &mut brush.x)?;
        sub.byte(c, 2, "brushOrgY", &mut brush.y)?;
        sub.byte(c, 3, "brushStyle", &mut brush.style)?;
        sub.byte(c, 4, "brushHatch", &mut brush.hatch)?;

        if brush.style & CACHED_BRUSH != 0 {
            brush.index = brush.hatch;
            brush.bpp = match BMF_BPP.get(usize::from(brush.style & 0x0F)) {
                Some(0) | None => 1,
                Some(bpp) => *bpp,
            };
        }

        if sub.has(5) {
            let extra = c.read_slice("brushExtra", 7)?;
            for (i, b) in extra.iter().enumerate() {
                brush.data[7 - i] = *b;
            }
            brush.data[0] = brush.hatch;
        }
        Ok(())
    }

    fn delta_rects(
        &self,
        c: &mut ReadCursor<'_>,
        n: u32,
        count: u8,
        cb_data: &mut u16,
        rects: &mut Vec<DeltaRect>,
    ) -> Result<()> {
        if self.has(n) {
            *cb_data = c.read_u16("cbData")?;
            read_delta_rects(c, rects, usize::from(count))?;
        }
        Ok(())
    }

    fn delta_points(
        &self,
        c: &mut ReadCursor<'_>,
        n: u32,
        count: u8,
        cb_data: &mut u8,
        points: &mut Vec<DeltaPoint>,
    ) -> Result<()> {
        if self.has(n) {
            *cb_data = c.read_u8("cbData")?;
            read_delta_points(c, points, usize::from(count))?;
        }
        Ok(())
    }

    fn glyph_bytes(&self, c: &mut ReadCursor<'_>, n: u32, data: &mut Vec<u8>) -> Result<bool> {
        if !self.has(n) {
            return Ok(false);
        }
        let cb_data = c.read_u8("cbData")?;
        let raw = c.read_slice("glyph data", usize::from(cb_data))?;
        data.clear();
        data.extend_from_slice(raw);
        Ok(true)
    }
}

impl PrimaryState {
    /// Decode the fields of one order of `order_type` into its record.
    pub fn decode(
        &mut self,
        order_type: PrimaryOrderType,
        c: &mut ReadCursor<'_>,
        info: &OrderInfo,
    ) -> Result<()> {
        let f = Fields {
            flags: info.field_flags,
            delta: info.delta_coordinates,
        };

        match order_type {
            PrimaryOrderType::DstBlt => {
                let o = &mut self.dst_blt;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.width)?;
                f.coord(c, 4, &mut o.height)?;
                f.byte(c, 5, "bRop", &mut o.rop)?;
            }
            PrimaryOrderType::PatBlt => {
                let o = &mut self.pat_blt;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.width)?;
                f.coord(c, 4, &mut o.height)?;
                f.byte(c, 5, "bRop", &mut o.rop)?;
                f.color(c, 6, &mut o.back_color)?;
                f.color(c, 7, &mut o.fore_color)?;
                f.brush(c, 8, &mut o.brush)?;
            }
            PrimaryOrderType::ScrBlt => {
                let o = &mut self.scr_blt;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.width)?;
                f.coord(c, 4, &mut o.height)?;
                f.byte(c, 5, "bRop", &mut o.rop)?;
                f.coord(c, 6, &mut o.x_src)?;
                f.coord(c, 7, &mut o.y_src)?;
            }
            PrimaryOrderType::OpaqueRect => {
                let o = &mut self.opaque_rect;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.width)?;
                f.coord(c, 4, &mut o.height)?;
                f.color_byte(c, 5, 0, &mut o.color)?;
                f.color_byte(c, 6, 8, &mut o.color)?;
                f.color_byte(c, 7, 16, &mut o.color)?;
            }
            PrimaryOrderType::DrawNineGrid => {
                let o = &mut self.draw_nine_grid;
                f.coord(c, 1, &mut o.src_left)?;
                f.coord(c, 2, &mut o.src_top)?;
                f.coord(c, 3, &mut o.src_right)?;
                f.coord(c, 4, &mut o.src_bottom)?;
                f.word(c, 5, "bitmapId", &mut o.bitmap_id)?;
            }
            PrimaryOrderType::MultiDstBlt => {
                let o = &mut self.multi_dst_blt;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.width)?;
                f.coord(c, 4, &mut o.height)?;
                f.byte(c, 5, "bRop", &mut o.rop)?;
                f.byte(c, 6, "numRectangles", &mut o.num_rectangles)?;
                f.delta_rects(c, 7, o.num_rectangles, &mut o.cb_data, &mut o.rectangles)?;
            }
            PrimaryOrderType::MultiPatBlt => {
                let o = &mut self.multi_pat_blt;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.width)?;
                f.coord(c, 4, &mut o.height)?;
                f.byte(c, 5, "bRop", &mut o.rop)?;
                f.color(c, 6, &mut o.back_color)?;
                f.color(c, 7, &mut o.fore_color)?;
                f.brush(c, 8, &mut o.brush)?;
                f.byte(c, 13, "numRectangles", &mut o.num_rectangles)?;
                f.delta_rects(c, 14, o.num_rectangles, &mut o.cb_data, &mut o.rectangles)?;
            }
            PrimaryOrderType::MultiScrBlt => {
                let o = &mut self.multi_scr_blt;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.width)?;
                f.coord(c, 4, &mut o.height)?;
                f.byte(c, 5, "bRop", &mut o.rop)?;
                f.coord(c, 6, &mut o.x_src)?;
                f.coord(c, 7, &mut o.y_src)?;
                f.byte(c, 8, "numRectangles", &mut o.num_rectangles)?;
                f.delta_rects(c, 9, o.num_rectangles, &mut o.cb_data, &mut o.rectangles)?;
            }
            PrimaryOrderType::MultiOpaqueRect => {
                let o = &mut self.multi_opaque_rect;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.width)?;
                f.coord(c, 4, &mut o.height)?;
                f.color_byte(c, 5, 0, &mut o.color)?;
                f.color_byte(c, 6, 8, &mut o.color)?;
                f.color_byte(c, 7, 16, &mut o.color)?;
                f.byte(c, 8, "numRectangles", &mut o.num_rectangles)?;
                f.delta_rects(c, 9, o.num_rectangles, &mut o.cb_data, &mut o.rectangles)?;
            }
            PrimaryOrderType::MultiDrawNineGrid => {
                let o = &mut self.multi_draw_nine_grid;
                f.coord(c, 1, &mut o.src_left)?;
                f.coord(c, 2, &mut o.src_top)?;
                f.coord(c, 3, &mut o.src_right)?;
                f.coord(c, 4, &mut o.src_bottom)?;
                f.word(c, 5, "bitmapId", &mut o.bitmap_id)?;
                f.byte(c, 6, "nDeltaEntries", &mut o.n_delta_entries)?;
                if f.has(7) {
                    o.cb_data = c.read_u16("cbData")?;
                    c.skip("deltaEntries", usize::from(o.cb_data))?;
                }
            }
            PrimaryOrderType::LineTo => {
                let o = &mut self.line_to;
                f.word(c, 1, "backMode", &mut o.back_mode)?;
                f.coord(c, 2, &mut o.x_start)?;
                f.coord(c, 3, &mut o.y_start)?;
                f.coord(c, 4, &mut o.x_end)?;
                f.coord(c, 5, &mut o.y_end)?;
                f.color(c, 6, &mut o.back_color)?;
                f.byte(c, 7, "bRop2", &mut o.rop2)?;
                f.byte(c, 8, "penStyle", &mut o.pen_style)?;
                f.byte(c, 9, "penWidth", &mut o.pen_width)?;
                f.color(c, 10, &mut o.pen_color)?;
            }
            PrimaryOrderType::Polyline => {
                let o = &mut self.polyline;
                f.coord(c, 1, &mut o.x_start)?;
                f.coord(c, 2, &mut o.y_start)?;
                f.byte(c, 3, "bRop2", &mut o.rop2)?;
                let mut unused = 0u16;
                f.word(c, 4, "brushCacheEntry", &mut unused)?;
                f.color(c, 5, &mut o.pen_color)?;
                f.byte(c, 6, "numDeltaEntries", &mut o.num_points)?;
                f.delta_points(c, 7, o.num_points, &mut o.cb_data, &mut o.points)?;
            }
            PrimaryOrderType::MemBlt => {
                let o = &mut self.mem_blt;
                if f.has(1) {
                    let raw = c.read_u16("cacheId")?;
                    o.cache_id = (raw & 0xFF) as u8;
                    o.color_index = (raw >> 8) as u8;
                }
                f.coord(c, 2, &mut o.left)?;
                f.coord(c, 3, &mut o.top)?;
                f.coord(c, 4, &mut o.width)?;
                f.coord(c, 5, &mut o.height)?;
                f.byte(c, 6, "bRop", &mut o.rop)?;
                f.coord(c, 7, &mut o.x_src)?;
                f.coord(c, 8, &mut o.y_src)?;
                f.word(c, 9, "cacheIndex", &mut o.cache_index)?;
            }
            PrimaryOrderType::Mem3Blt => {
                let o = &mut self.mem3_blt;
                if f.has(1) {
                    let raw = c.read_u16("cacheId")?;
                    o.cache_id = (raw & 0xFF) as u8;
                    o.color_index = (raw >> 8) as u8;
                }
                f.coord(c, 2, &mut o.left)?;
                f.coord(c, 3, &mut o.top)?;
                f.coord(c, 4, &mut o.width)?;
                f.coord(c, 5, &mut o.height)?;
                f.byte(c, 6, "bRop", &mut o.rop)?;
                f.coord(c, 7, &mut o.x_src)?;
                f.coord(c, 8, &mut o.y_src)?;
                f.color(c, 9, &mut o.back_color)?;
                f.color(c, 10, &mut o.fore_color)?;
                f.brush(c, 11, &mut o.brush)?;
                f.word(c, 16, "cacheIndex", &mut o.cache_index)?;
            }
            PrimaryOrderType::SaveBitmap => {
                let o = &mut self.save_bitmap;
                f.dword(c, 1, "savedBitmapPosition", &mut o.saved_bitmap_position)?;
                f.coord(c, 2, &mut o.left)?;
                f.coord(c, 3, &mut o.top)?;
                f.coord(c, 4, &mut o.right)?;
                f.coord(c, 5, &mut o.bottom)?;
                f.byte(c, 6, "operation", &mut o.operation)?;
            }
            PrimaryOrderType::GlyphIndex => {
                let o = &mut self.glyph_index;
                f.byte(c, 1, "cacheId", &mut o.cache_id)?;
                f.byte(c, 2, "flAccel", &mut o.fl_accel)?;
                f.byte(c, 3, "ulCharInc", &mut o.ul_char_inc)?;
                f.byte(c, 4, "fOpRedundant", &mut o.f_op_redundant)?;
                f.color(c, 5, &mut o.back_color)?;
                f.color(c, 6, &mut o.fore_color)?;
                f.signed_word(c, 7, "bkLeft", &mut o.bk_left)?;
                f.signed_word(c, 8, "bkTop", &mut o.bk_top)?;
                f.signed_word(c, 9, "bkRight", &mut o.bk_right)?;
                f.signed_word(c, 10, "bkBottom", &mut o.bk_bottom)?;
                f.signed_word(c, 11, "opLeft", &mut o.op_left)?;
                f.signed_word(c, 12, "opTop", &mut o.op_top)?;
                f.signed_word(c, 13, "opRight", &mut o.op_right)?;
                f.signed_word(c, 14, "opBottom", &mut o.op_bottom)?;
                f.brush(c, 15, &mut o.brush)?;
                f.signed_word(c, 20, "x", &mut o.x)?;
                f.signed_word(c, 21, "y", &mut o.y)?;
                f.glyph_bytes(c, 22, &mut o.data)?;
            }
            PrimaryOrderType::FastIndex => {
                let o = &mut self.fast_index;
                f.byte(c, 1, "cacheId", &mut o.cache_id)?;
                if f.has(2) {
                    o.ul_char_inc = c.read_u8("ulCharInc")?;
                    o.fl_accel = c.read_u8("flAccel")?;
                }
                f.color(c, 3, &mut o.back_color)?;
                f.color(c, 4, &mut o.fore_color)?;
                f.coord(c, 5, &mut o.bk_left)?;
                f.coord(c, 6, &mut o.bk_top)?;
                f.coord(c, 7, &mut o.bk_right)?;
                f.coord(c, 8, &mut o.bk_bottom)?;
                f.coord(c, 9, &mut o.op_left)?;
                f.coord(c, 10, &mut o.op_top)?;
                f.coord(c, 11, &mut o.op_right)?;
                f.coord(c, 12, &mut o.op_bottom)?;
                f.coord(c, 13, &mut o.x)?;
                f.coord(c, 14, &mut o.y)?;
                f.glyph_bytes(c, 15, &mut o.data)?;
            }
            PrimaryOrderType::FastGlyph => {
                let o = &mut self.fast_glyph;
                f.byte(c, 1, "cacheId", &mut o.cache_id)?;
                if f.has(2) {
                    o.ul_char_inc = c.read_u8("ulCharInc")?;
                    o.fl_accel = c.read_u8("flAccel")?;
                }
                f.color(c, 3, &mut o.back_color)?;
                f.color(c, 4, &mut o.fore_color)?;
                f.coord(c, 5, &mut o.bk_left)?;
                f.coord(c, 6, &mut o.bk_top)?;
                f.coord(c, 7, &mut o.bk_right)?;
                f.coord(c, 8, &mut o.bk_bottom)?;
                f.coord(c, 9, &mut o.op_left)?;
                f.coord(c, 10, &mut o.op_top)?;
                f.coord(c, 11, &mut o.op_right)?;
                f.coord(c, 12, &mut o.op_bottom)?;
                f.coord(c, 13, &mut o.x)?;
                f.coord(c, 14, &mut o.y)?;
                if f.glyph_bytes(c, 15, &mut o.data)? {
                    o.glyph = match o.data.split_first() {
                        Some((index, rest)) if !rest.is_empty() => {
                            let mut inner = ReadCursor::new(rest);
                            Some(read_glyph_v2(&mut inner, u16::from(*index))?)
                        }
                        _ => None,
                    };
                }
            }
            PrimaryOrderType::PolygonSc => {
                let o = &mut self.polygon_sc;
                f.coord(c, 1, &mut o.x_start)?;
                f.coord(c, 2, &mut o.y_start)?;
                f.byte(c, 3, "bRop2", &mut o.rop2)?;
                f.byte(c, 4, "fillMode", &mut o.fill_mode)?;
                f.color(c, 5, &mut o.brush_color)?;
                f.byte(c, 6, "numPoints", &mut o.num_points)?;
                f.delta_points(c, 7, o.num_points, &mut o.cb_data, &mut o.points)?;
            }
            PrimaryOrderType::PolygonCb => {
                let o = &mut self.polygon_cb;
                f.coord(c, 1, &mut o.x_start)?;
                f.coord(c, 2, &mut o.y_start)?;
                if f.has(3) {
                    let raw = c.read_u8("bRop2")?;
                    o.back_mode = if raw & 0x80 != 0 {
                        BackMode::Transparent
                    } else {
                        BackMode::Opaque
                    };
                    o.rop2 = raw & 0x1F;
                }
                f.byte(c, 4, "fillMode", &mut o.fill_mode)?;
                f.color(c, 5, &mut o.back_color)?;
                f.color(c, 6, &mut o.fore_color)?;
                f.brush(c, 7, &mut o.brush)?;
                f.byte(c, 12, "numPoints", &mut o.num_points)?;
                f.delta_points(c, 13, o.num_points, &mut o.cb_data, &mut o.points)?;
            }
            PrimaryOrderType::EllipseSc => {
                let o = &mut self.ellipse_sc;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.right)?;
                f.coord(c, 4, &mut o.bottom)?;
                f.byte(c, 5, "bRop2", &mut o.rop2)?;
                f.byte(c, 6, "fillMode", &mut o.fill_mode)?;
                f.color(c, 7, &mut o.color)?;
            }
            PrimaryOrderType::EllipseCb => {
                let o = &mut self.ellipse_cb;
                f.coord(c, 1, &mut o.left)?;
                f.coord(c, 2, &mut o.top)?;
                f.coord(c, 3, &mut o.right)?;
                f.coord(c, 4, &mut o.bottom)?;
                f.byte(c, 5, "bRop2", &mut o.rop2)?;
                f.byte(c, 6, "fillMode", &mut o.fill_mode)?;
                f.color(c, 7, &mut o.back_color)?;
                f.color(c, 8, &mut o.fore_color)?;
                f.brush(c, 9, &mut o.brush)?;
            }
        }
        Ok(())
    }

    /// Hand the record of `order_type` to the renderer.
    pub fn deliver<R: Renderer + ?Sized>(&self, order_type: PrimaryOrderType, renderer: &mut R) {
        match order_type {
            PrimaryOrderType::DstBlt => renderer.dst_blt(&self.dst_blt),
            PrimaryOrderType::PatBlt => renderer.pat_blt(&self.pat_blt),
            PrimaryOrderType::ScrBlt => renderer.scr_blt(&self.scr_blt),
            PrimaryOrderType::OpaqueRect => renderer.opaque_rect(&self.opaque_rect),
            PrimaryOrderType::DrawNineGrid => renderer.draw_nine_grid(&self.draw_nine_grid),
            PrimaryOrderType::MultiDstBlt => renderer.multi_dst_blt(&self.multi_dst_blt),
            PrimaryOrderType::MultiPatBlt => renderer.multi_pat_blt(&self.multi_pat_blt),
            PrimaryOrderType::MultiScrBlt => renderer.multi_scr_blt(&self.multi_scr_blt),
            PrimaryOrderType::MultiOpaqueRect => {
                renderer.multi_opaque_rect(&self.multi_opaque_rect)
            }
            PrimaryOrderType::MultiDrawNineGrid => {
                renderer.multi_draw_nine_grid(&self.multi_draw_nine_grid)
            }
            PrimaryOrderType::LineTo => renderer.line_to(&self.line_to),
            PrimaryOrderType::Polyline => renderer.polyline(&self.polyline),
            PrimaryOrderType::MemBlt => renderer.mem_blt(&self.mem_blt),
            PrimaryOrderType::Mem3Blt => renderer.mem3_blt(&self.mem3_blt),
            PrimaryOrderType::SaveBitmap => renderer.save_bitmap(&self.save_bitmap),
            PrimaryOrderType::GlyphIndex => renderer.glyph_index(&self.glyph_index),
            PrimaryOrderType::FastIndex => renderer.fast_index(&self.fast_index),
            PrimaryOrderType::FastGlyph => renderer.fast_glyph(&self.fast_glyph),
            PrimaryOrderType::PolygonSc => renderer.polygon_sc(&self.polygon_sc),
            PrimaryOrderType::PolygonCb => renderer.polygon_cb(&self.polygon_cb),
            PrimaryOrderType::EllipseSc => renderer.ellipse_sc(&self.ellipse_sc),
            PrimaryOrderType::EllipseCb => renderer.ellipse_cb(&self.ellipse_cb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    fn info(field_flags: u32, delta: bool) -> OrderInfo {
        OrderInfo {
            order_type: PrimaryOrderType::PatBlt,
            field_flags,
            delta_coordinates: delta,
            ..OrderInfo::default()
        }
    }

    fn decode(state: &mut PrimaryState, t: PrimaryOrderType, flags: u32, delta: bool, data: &[u8]) -> usize {
        let mut cursor = ReadCursor::new(data);
        state.decode(t, &mut cursor, &info(flags, delta)).unwrap();
        cursor.position()
    }

    #[test]
    fn test_field_byte_table() {
        let count = |v: u8| PrimaryOrderType::from_u8(v).map(|t| t.field_bytes()).unwrap_or(0);
        let expected: [u8; 28] = [
            1, 2, 1, 0, 0, 0, 0, 1, 1, 2, 1, 1, 0, 2, 3, 1, 2, 2, 2, 2, 1, 2, 1, 0, 2, 1, 2, 3,
        ];
        for (value, bytes) in expected.iter().enumerate() {
            assert_eq!(count(value as u8), *bytes, "order type 0x{:02X}", value);
        }
        assert!(PrimaryOrderType::from_u8(0x1C).is_none());
    }

    #[test]
    fn test_dstblt_example() {
        let mut state = PrimaryState::default();
        let used = decode(&mut state, PrimaryOrderType::DstBlt, 0x0C, false, &[0x48, 0x00, 0x37, 0x01]);
        assert_eq!(used, 4);
        assert_eq!(
            state.dst_blt,
            DstBltOrder {
                left: 0,
                top: 0,
                width: 72,
                height: 311,
                rop: 0
            }
        );
    }

    #[test]
    fn test_opaque_rect_example() {
        let mut state = PrimaryState::default();
        let data = [0x00, 0x04, 0x00, 0x03, 0x73, 0x02, 0x06];
        let used = decode(&mut state, PrimaryOrderType::OpaqueRect, 0x7C, false, &data);
        assert_eq!(used, 7);
        assert_eq!(
            state.opaque_rect,
            OpaqueRectOrder {
                left: 0,
                top: 0,
                width: 1024,
                height: 768,
                color: 0x0006_0273
            }
        );
    }

    #[test]
    fn test_unset_fields_keep_previous_value() {
        let mut state = PrimaryState::default();
        decode(&mut state, PrimaryOrderType::ScrBlt, 0x7F, false, &[
            0x0A, 0x00, 0x14, 0x00, 0x1E, 0x00, 0x28, 0x00, 0xCC, 0x05, 0x00, 0x06, 0x00,
        ]);
        // only nXSrc, as a delta
        decode(&mut state, PrimaryOrderType::ScrBlt, 0x20, true, &[0xFE]);
        assert_eq!(
            state.scr_blt,
            ScrBltOrder {
                left: 10,
                top: 20,
                width: 30,
                height: 40,
                rop: 0xCC,
                x_src: 3,
                y_src: 6
            }
        );
    }

    #[test]
    fn test_patblt_with_brush() {
        let mut state = PrimaryState::default();
        // fields 5..12: rop, back, fore, brush x/y/style/hatch/extra
        let flags = 0x0FF0;
        let data = [
            0xF0, // rop
            0x01, 0x02, 0x03, // back
            0x04, 0x05, 0x06, // fore
            0x01, 0x02, 0x03, 0xAA, // brush x, y, style, hatch
            0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77,
        ];
        let used = decode(&mut state, PrimaryOrderType::PatBlt, flags, false, &data);
        assert_eq!(used, data.len());
        let o = &state.pat_blt;
        assert_eq!(o.rop, 0xF0);
        assert_eq!(o.back_color, 0x0003_0201);
        assert_eq!(o.fore_color, 0x0006_0504);
        assert_eq!(o.brush.x, 1);
        assert_eq!(o.brush.y, 2);
        assert_eq!(o.brush.style, 3);
        assert_eq!(o.brush.data, [0xAA, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn test_cached_brush_index_and_bpp() {
        let mut state = PrimaryState::default();
        // style and hatch only: brush fields 3 and 4 (order fields 10 and 11)
        decode(&mut state, PrimaryOrderType::PatBlt, 0x0600, false, &[0x83, 0x07]);
        assert_eq!(state.pat_blt.brush.index, 7);
        assert_eq!(state.pat_blt.brush.bpp, 8);

        decode(&mut state, PrimaryOrderType::PatBlt, 0x0200, false, &[0x80]);
        assert_eq!(state.pat_blt.brush.bpp, 1);
    }

    #[test]
    fn test_multi_opaque_rect_with_rects() {
        let mut state = PrimaryState::default();
        // fields 8 and 9: numRectangles, cbData + rects
        let data = [0x02, 0x08, 0x00, 0x03, 1, 2, 3, 4, 5, 6];
        let used = decode(&mut state, PrimaryOrderType::MultiOpaqueRect, 0x0180, false, &data);
        assert_eq!(used, data.len());
        let o = &state.multi_opaque_rect;
        assert_eq!(o.num_rectangles, 2);
        assert_eq!(o.cb_data, 8);
        assert_eq!(o.rectangles.len(), 2);
        assert_eq!(o.rectangles[1], DeltaRect { left: 6, top: 8, width: 3, height: 4 });
    }

    #[test]
    fn test_multi_dstblt_too_many_rects() {
        let mut state = PrimaryState::default();
        let mut cursor = ReadCursor::new(&[46, 0x00, 0x00]);
        let err = state
            .decode(PrimaryOrderType::MultiDstBlt, &mut cursor, &info(0x60, false))
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_multi_draw_nine_grid_skips_entries() {
        let mut state = PrimaryState::default();
        let data = [0x03, 0x03, 0x00, 9, 9, 9, 0xEE];
        let used = decode(&mut state, PrimaryOrderType::MultiDrawNineGrid, 0x60, false, &data);
        assert_eq!(used, 6);
        assert_eq!(state.multi_draw_nine_grid.n_delta_entries, 3);
        assert_eq!(state.multi_draw_nine_grid.cb_data, 3);
    }

    #[test]
    fn test_line_to() {
        let mut state = PrimaryState::default();
        let data = [
            0x01, 0x00, // backMode
            0x0A, 0x00, 0x14, 0x00, 0x1E, 0x00, 0x28, 0x00, // coords
            0x10, 0x20, 0x30, // back color
            0x0D, // rop2
            0x00, 0x01, // pen style, width
            0xFF, 0x00, 0x00, // pen color
        ];
        let used = decode(&mut state, PrimaryOrderType::LineTo, 0x03FF, false, &data);
        assert_eq!(used, data.len());
        let o = &state.line_to;
        assert_eq!((o.x_start, o.y_start, o.x_end, o.y_end), (10, 20, 30, 40));
        assert_eq!(o.rop2, 0x0D);
        assert_eq!(o.pen_color, 0xFF);
    }

    #[test]
    fn test_polyline_points() {
        let mut state = PrimaryState::default();
        // xStart, yStart, numPoints, cbData + points
        let data = [0x05, 0x00, 0x06, 0x00, 0x02, 0x03, 0x30, 0x0A, 0x7F];
        let used = decode(&mut state, PrimaryOrderType::Polyline, 0x63, false, &data);
        assert_eq!(used, data.len());
        let o = &state.polyline;
        assert_eq!((o.x_start, o.y_start), (5, 6));
        assert_eq!(o.points, vec![DeltaPoint { x: 10, y: -1 }, DeltaPoint { x: 0, y: 0 }]);
    }

    #[test]
    fn test_memblt_splits_cache_id() {
        let mut state = PrimaryState::default();
        let data = [0x02, 0x05, 0xCC, 0x07, 0x00];
        decode(&mut state, PrimaryOrderType::MemBlt, 0x0121, false, &data);
        assert_eq!(state.mem_blt.cache_id, 2);
        assert_eq!(state.mem_blt.color_index, 5);
        assert_eq!(state.mem_blt.rop, 0xCC);
        assert_eq!(state.mem_blt.cache_index, 7);

        // cache id absent: both halves persist
        decode(&mut state, PrimaryOrderType::MemBlt, 0x0020, false, &[0x66]);
        assert_eq!(state.mem_blt.cache_id, 2);
        assert_eq!(state.mem_blt.color_index, 5);
    }

    #[test]
    fn test_mem3blt_cache_index_after_brush() {
        let mut state = PrimaryState::default();
        // field 16 only
        decode(&mut state, PrimaryOrderType::Mem3Blt, 0x8000, false, &[0x34, 0x12]);
        assert_eq!(state.mem3_blt.cache_index, 0x1234);
    }

    #[test]
    fn test_save_bitmap() {
        let mut state = PrimaryState::default();
        let data = [0x78, 0x56, 0x34, 0x12, 0x01];
        decode(&mut state, PrimaryOrderType::SaveBitmap, 0x21, false, &data);
        assert_eq!(state.save_bitmap.saved_bitmap_position, 0x1234_5678);
        assert_eq!(state.save_bitmap.operation, 1);
    }

    #[test]
    fn test_glyph_index_data() {
        let mut state = PrimaryState::default();
        // field 20 (x), 21 (y), 22 (cbData + data)
        let data = [0xFF, 0xFF, 0x10, 0x00, 0x03, 0xAA, 0xBB, 0xCC];
        let used = decode(&mut state, PrimaryOrderType::GlyphIndex, 0x38_0000, false, &data);
        assert_eq!(used, data.len());
        assert_eq!(state.glyph_index.x, -1);
        assert_eq!(state.glyph_index.y, 16);
        assert_eq!(state.glyph_index.data, vec![0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_fast_index_char_inc_and_accel() {
        let mut state = PrimaryState::default();
        decode(&mut state, PrimaryOrderType::FastIndex, 0x02, false, &[0x04, 0x03]);
        assert_eq!(state.fast_index.ul_char_inc, 4);
        assert_eq!(state.fast_index.fl_accel, 3);
    }

    #[test]
    fn test_fast_glyph_inline_glyph() {
        let mut state = PrimaryState::default();
        // cbData 9: cacheIndex 7, x -2, y 3, cx 8, cy 1, aj padded to 4 bytes
        let data = [9, 0x07, 0x42, 0x03, 0x08, 0x01, 0xF0, 0, 0, 0, 0xEE];
        let used = decode(&mut state, PrimaryOrderType::FastGlyph, 0x4000, false, &data);
        assert_eq!(used, 10);
        let glyph = state.fast_glyph.glyph.clone().unwrap();
        assert_eq!(glyph.cache_index, 7);
        assert_eq!((glyph.x, glyph.y, glyph.cx, glyph.cy), (-2, 3, 8, 1));
        assert_eq!(glyph.aj, vec![0xF0, 0, 0, 0]);
    }

    #[test]
    fn test_fast_glyph_index_only() {
        let mut state = PrimaryState::default();
        let used = decode(&mut state, PrimaryOrderType::FastGlyph, 0x4000, false, &[1, 0x09]);
        assert_eq!(used, 2);
        assert!(state.fast_glyph.glyph.is_none());
        assert_eq!(state.fast_glyph.data, vec![0x09]);
    }

    #[test]
    fn test_fast_glyph_bad_inline_glyph() {
        let mut state = PrimaryState::default();
        // declares an 8x8 glyph but carries no mask bytes
        let data = [5, 0x07, 0x00, 0x00, 0x08, 0x08];
        let mut cursor = ReadCursor::new(&data);
        assert!(state
            .decode(PrimaryOrderType::FastGlyph, &mut cursor, &info(0x4000, false))
            .is_err());
    }

    #[test]
    fn test_polygon_cb_back_mode() {
        let mut state = PrimaryState::default();
        decode(&mut state, PrimaryOrderType::PolygonCb, 0x04, false, &[0x8D]);
        assert_eq!(state.polygon_cb.back_mode, BackMode::Transparent);
        assert_eq!(state.polygon_cb.rop2, 0x0D);

        decode(&mut state, PrimaryOrderType::PolygonCb, 0x04, false, &[0x0D]);
        assert_eq!(state.polygon_cb.back_mode, BackMode::Opaque);
    }

    #[test]
    fn test_ellipse_sc() {
        let mut state = PrimaryState::default();
        let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0x0D, 0x01, 0x01, 0x02, 0x03];
        let used = decode(&mut state, PrimaryOrderType::EllipseSc, 0x7F, false, &data);
        assert_eq!(used, data.len());
        assert_eq!(state.ellipse_sc.right, 3);
        assert_eq!(state.ellipse_sc.color, 0x0003_0201);
    }

    #[test]
    fn test_primary_order_type_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            orders: Vec<PrimaryOrderType>,
        }
        let w: Wrapper = toml::from_str(r#"orders = ["dst_blt", "mem3_blt", "polygon_cb"]"#).unwrap();
        assert_eq!(
            w.orders,
            vec![
                PrimaryOrderType::DstBlt,
                PrimaryOrderType::Mem3Blt,
                PrimaryOrderType::PolygonCb
            ]
        );
    }
}
