//! Secondary (cache) orders
//!
//! ```text
//! +--------------+-------------+------------+-----------+----------------------+
//! | controlFlags | orderLength | extraFlags | orderType | body                 |
//! |     u8       |    u16      |    u16     |    u8     | orderLength + 7 bytes|
//! +--------------+-------------+------------+-----------+----------------------+
//! ```
//!
//! The body is decoded from a cursor bounded to its declared length and the
//! outer cursor always resumes right after it. A body that fails to decode
//! is dropped; only a header that does not fit is an error.

use tracing::{debug, trace, warn};

use crate::cursor::ReadCursor;
use crate::error::{DecodeError, Result};
use crate::handler::CacheManager;
use crate::primitives::{read_2byte_unsigned, read_4byte_unsigned, read_color_quad};
use crate::surface::{read_bitmap_data_ex, BitmapDataEx};

use super::primary::BMF_BPP;
use super::{glyph_bitmap_size, read_glyph_v2, GlyphData};

/// Bits per pixel indexed by the cache bitmap v2/v3 bpp id.
const CBR2_BPP: [u8; 7] = [0, 0, 0, 8, 16, 24, 32];

const BODY_LENGTH_BIAS: usize = 7;

const NO_BITMAP_COMPRESSION_HDR: u16 = 0x0400;
const CG_GLYPH_UNICODE_PRESENT: u16 = 0x0010;

const CBR2_HEIGHT_SAME_AS_WIDTH: u16 = 0x01;
const CBR2_PERSISTENT_KEY_PRESENT: u16 = 0x02;
const CBR2_NO_BITMAP_COMPRESSION_HDR: u16 = 0x08;
const CBR2_DO_NOT_CACHE: u16 = 0x10;

/// Cache index used for bitmaps that go to the waiting list.
pub const BITMAP_CACHE_WAITING_LIST_INDEX: u32 = 0x7FFF;

const BMF_8BPP: u8 = 3;
const BMF_16BPP: u8 = 4;
const BMF_32BPP: u8 = 6;

/// Secondary order types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SecondaryOrderType {
    /// Cache bitmap, raw pixels
    CacheBitmapUncompressed = 0x00,
    /// Cache a 256-entry color table
    CacheColorTable = 0x01,
    /// Cache bitmap, compressed pixels
    CacheBitmapCompressed = 0x02,
    /// Cache glyphs
    CacheGlyph = 0x03,
    /// Cache bitmap revision 2, raw pixels
    CacheBitmapV2Uncompressed = 0x04,
    /// Cache bitmap revision 2, compressed pixels
    CacheBitmapV2Compressed = 0x05,
    /// Cache a brush
    CacheBrush = 0x07,
    /// Cache bitmap revision 3
    CacheBitmapV3 = 0x08,
}

impl SecondaryOrderType {
    /// Map a wire value to an order type.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(SecondaryOrderType::CacheBitmapUncompressed),
            0x01 => Some(SecondaryOrderType::CacheColorTable),
            0x02 => Some(SecondaryOrderType::CacheBitmapCompressed),
            0x03 => Some(SecondaryOrderType::CacheGlyph),
            0x04 => Some(SecondaryOrderType::CacheBitmapV2Uncompressed),
            0x05 => Some(SecondaryOrderType::CacheBitmapV2Compressed),
            0x07 => Some(SecondaryOrderType::CacheBrush),
            0x08 => Some(SecondaryOrderType::CacheBitmapV3),
            _ => None,
        }
    }
}

/// Compressed bitmap header preceding compressed cache bitmap data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitmapCompressionHeader {
    /// Size of the first compressed row
    pub comp_first_row_size: u16,
    /// Size of the compressed data
    pub comp_main_body_size: u16,
    /// Row width in bytes, padded
    pub scan_width: u16,
    /// Size of the decompressed data
    pub uncompressed_size: u16,
}

impl BitmapCompressionHeader {
    pub(crate) fn read(cursor: &mut ReadCursor<'_>) -> Result<Self> {
        cursor.ensure("bitmapComprHdr", 8)?;
        Ok(BitmapCompressionHeader {
            comp_first_row_size: cursor.read_u16("cbCompFirstRowSize")?,
            comp_main_body_size: cursor.read_u16("cbCompMainBodySize")?,
            scan_width: cursor.read_u16("cbScanWidth")?,
            uncompressed_size: cursor.read_u16("cbUncompressedSize")?,
        })
    }
}

/// Cache bitmap (revision 1). `data` borrows the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBitmapOrder<'a> {
    /// Bitmap cache id
    pub cache_id: u8,
    /// Width in pixels
    pub bitmap_width: u8,
    /// Height in pixels
    pub bitmap_height: u8,
    /// Bits per pixel
    pub bitmap_bpp: u8,
    /// Length of `data`
    pub bitmap_length: u16,
    /// Slot within the cache
    pub cache_index: u16,
    /// Whether `data` is compressed
    pub compressed: bool,
    /// Present for compressed data unless the server omits it
    pub compression_header: Option<BitmapCompressionHeader>,
    /// Bitmap bytes
    pub data: &'a [u8],
}

/// Cache bitmap (revision 2). `data` borrows the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBitmapV2Order<'a> {
    /// Bitmap cache id
    pub cache_id: u8,
    /// Order flags (bits 7..15 of the extra flags)
    pub flags: u16,
    /// Bits per pixel
    pub bitmap_bpp: u8,
    /// Persistent cache key, low half
    pub key1: u32,
    /// Persistent cache key, high half
    pub key2: u32,
    /// Width in pixels
    pub bitmap_width: u32,
    /// Height in pixels
    pub bitmap_height: u32,
    /// Length of `data`
    pub bitmap_length: u32,
    /// Slot within the cache, or the waiting-list index
    pub cache_index: u32,
    /// Whether `data` is compressed
    pub compressed: bool,
    /// Present for compressed data unless the server omits it
    pub compression_header: Option<BitmapCompressionHeader>,
    /// Bitmap bytes
    pub data: &'a [u8],
}

/// Cache bitmap (revision 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBitmapV3Order<'a> {
    /// Bitmap cache id
    pub cache_id: u8,
    /// Order flags (bits 7..15 of the extra flags)
    pub flags: u16,
    /// Bits per pixel
    pub bpp: u8,
    /// Slot within the cache
    pub cache_index: u16,
    /// Persistent cache key, low half
    pub key1: u32,
    /// Persistent cache key, high half
    pub key2: u32,
    /// Codec-tagged bitmap
    pub bitmap_data: BitmapDataEx<'a>,
}

/// Cache color table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheColorTableOrder {
    /// Slot within the color table cache
    pub cache_index: u8,
    /// Colors, `0x00BBGGRR`
    pub colors: Vec<u32>,
}

/// Cache glyph (revision 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheGlyphOrder {
    /// Glyph cache id
    pub cache_id: u8,
    /// Glyphs in wire order
    pub glyphs: Vec<GlyphData>,
    /// One UTF-16 code unit per glyph, when sent
    pub unicode_characters: Vec<u16>,
}

/// Cache glyph (revision 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheGlyphV2Order {
    /// Glyph cache id
    pub cache_id: u8,
    /// Order flags (bits 4..7 of the extra flags)
    pub flags: u8,
    /// Glyphs in wire order
    pub glyphs: Vec<GlyphData>,
    /// One UTF-16 code unit per glyph, when sent
    pub unicode_characters: Vec<u16>,
}

/// Cache brush.
///
/// `data` holds the expanded 8x8 pattern, row 0 first: one byte per row at
/// 1bpp, otherwise `bpp / 8` bytes per pixel. Brushes of any other size carry
/// no pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBrushOrder {
    /// Slot within the brush cache
    pub index: u8,
    /// Bits per pixel
    pub bpp: u8,
    /// Width in pixels
    pub cx: u8,
    /// Height in pixels
    pub cy: u8,
    /// Brush style
    pub style: u8,
    /// Encoded pattern length
    pub length: u8,
    /// Expanded pattern
    pub data: Vec<u8>,
}

/// Decode one secondary order. The control byte has already been consumed.
///
/// Returns the raw order type. The outer cursor ends right after the declared
/// body whether or not the body decoded.
pub(crate) fn decode<H: CacheManager + ?Sized>(
    cursor: &mut ReadCursor<'_>,
    glyph_v2: bool,
    handler: &mut H,
) -> Result<u8> {
    let start = cursor.position().saturating_sub(1);
    let order_length = cursor.read_u16("orderLength")?;
    let extra_flags = cursor.read_u16("extraFlags")?;
    let order_type = cursor.read_u8("orderType")?;
    let mut body = cursor.sub_cursor(
        "secondary order body",
        usize::from(order_length) + BODY_LENGTH_BIAS,
    )?;

    let Some(kind) = SecondaryOrderType::from_u8(order_type) else {
        debug!(order_type, offset = start, "skipping unknown secondary order");
        return Ok(order_type);
    };
    trace!(order = ?kind, offset = start, order_length, extra_flags, "secondary order");

    if let Err(err) = decode_body(kind, &mut body, extra_flags, glyph_v2, handler) {
        warn!(order = ?kind, offset = start, %err, "dropping malformed secondary order");
    }
    Ok(order_type)
}

fn decode_body<H: CacheManager + ?Sized>(
    kind: SecondaryOrderType,
    body: &mut ReadCursor<'_>,
    extra_flags: u16,
    glyph_v2: bool,
    handler: &mut H,
) -> Result<()> {
    match kind {
        SecondaryOrderType::CacheBitmapUncompressed => {
            handler.cache_bitmap(&read_cache_bitmap(body, false, extra_flags)?)
        }
        SecondaryOrderType::CacheBitmapCompressed => {
            handler.cache_bitmap(&read_cache_bitmap(body, true, extra_flags)?)
        }
        SecondaryOrderType::CacheBitmapV2Uncompressed => {
            handler.cache_bitmap_v2(&read_cache_bitmap_v2(body, false, extra_flags)?)
        }
        SecondaryOrderType::CacheBitmapV2Compressed => {
            handler.cache_bitmap_v2(&read_cache_bitmap_v2(body, true, extra_flags)?)
        }
        SecondaryOrderType::CacheBitmapV3 => {
            handler.cache_bitmap_v3(&read_cache_bitmap_v3(body, extra_flags)?)
        }
        SecondaryOrderType::CacheColorTable => {
            handler.cache_color_table(&read_cache_color_table(body)?)
        }
        SecondaryOrderType::CacheGlyph if glyph_v2 => {
            handler.cache_glyph_v2(&read_cache_glyph_v2(body, extra_flags)?)
        }
        SecondaryOrderType::CacheGlyph => {
            handler.cache_glyph(&read_cache_glyph(body, extra_flags)?)
        }
        SecondaryOrderType::CacheBrush => handler.cache_brush(&read_cache_brush(body)?),
    }
    Ok(())
}

fn cbr2_bpp(extra_flags: u16) -> Result<u8> {
    let id = usize::from((extra_flags & 0x0078) >> 3);
    match CBR2_BPP.get(id) {
        Some(bpp) if *bpp != 0 => Ok(*bpp),
        _ => Err(DecodeError::invalid(
            "bitsPerPixelId",
            format!("unsupported id {}", id),
        )),
    }
}

fn read_cache_bitmap<'a>(
    c: &mut ReadCursor<'a>,
    compressed: bool,
    extra_flags: u16,
) -> Result<CacheBitmapOrder<'a>> {
    c.ensure("cache bitmap header", 9)?;
    let cache_id = c.read_u8("cacheId")?;
    c.skip("pad1Octet", 1)?;
    let bitmap_width = c.read_u8("bitmapWidth")?;
    let bitmap_height = c.read_u8("bitmapHeight")?;
    let bitmap_bpp = c.read_u8("bitmapBpp")?;
    let mut bitmap_length = c.read_u16("bitmapLength")?;
    let cache_index = c.read_u16("cacheIndex")?;

    let mut compression_header = None;
    if compressed && extra_flags & NO_BITMAP_COMPRESSION_HDR == 0 {
        compression_header = Some(BitmapCompressionHeader::read(c)?);
        bitmap_length = bitmap_length.checked_sub(8).ok_or_else(|| {
            DecodeError::invalid("bitmapLength", "shorter than its compression header")
        })?;
    }
    let data = c.read_slice("bitmapDataStream", usize::from(bitmap_length))?;

    Ok(CacheBitmapOrder {
        cache_id,
        bitmap_width,
        bitmap_height,
        bitmap_bpp,
        bitmap_length,
        cache_index,
        compressed,
        compression_header,
        data,
    })
}

fn read_cache_bitmap_v2<'a>(
    c: &mut ReadCursor<'a>,
    compressed: bool,
    extra_flags: u16,
) -> Result<CacheBitmapV2Order<'a>> {
    let cache_id = (extra_flags & 0x0003) as u8;
    let flags = (extra_flags & 0xFF80) >> 7;
    let bitmap_bpp = cbr2_bpp(extra_flags)?;

    let (mut key1, mut key2) = (0, 0);
    if flags & CBR2_PERSISTENT_KEY_PRESENT != 0 {
        c.ensure("persistent key", 8)?;
        key1 = c.read_u32("key1")?;
        key2 = c.read_u32("key2")?;
    }

    let bitmap_width = read_2byte_unsigned(c)?;
    let bitmap_height = if flags & CBR2_HEIGHT_SAME_AS_WIDTH != 0 {
        bitmap_width
    } else {
        read_2byte_unsigned(c)?
    };
    let mut bitmap_length = read_4byte_unsigned(c)?;
    let mut cache_index = read_2byte_unsigned(c)?;
    if flags & CBR2_DO_NOT_CACHE != 0 {
        cache_index = BITMAP_CACHE_WAITING_LIST_INDEX;
    }

    let mut compression_header = None;
    if compressed && flags & CBR2_NO_BITMAP_COMPRESSION_HDR == 0 {
        let header = BitmapCompressionHeader::read(c)?;
        bitmap_length = u32::from(header.comp_main_body_size);
        compression_header = Some(header);
    }
    let data = c.read_slice("bitmapDataStream", bitmap_length as usize)?;

    Ok(CacheBitmapV2Order {
        cache_id,
        flags,
        bitmap_bpp,
        key1,
        key2,
        bitmap_width,
        bitmap_height,
        bitmap_length,
        cache_index,
        compressed,
        compression_header,
        data,
    })
}

fn read_cache_bitmap_v3<'a>(c: &mut ReadCursor<'a>, extra_flags: u16) -> Result<CacheBitmapV3Order<'a>> {
    let cache_id = (extra_flags & 0x0003) as u8;
    let flags = (extra_flags & 0xFF80) >> 7;
    let bpp = cbr2_bpp(extra_flags)?;

    c.ensure("cache bitmap v3 header", 10)?;
    let cache_index = c.read_u16("cacheIndex")?;
    let key1 = c.read_u32("key1")?;
    let key2 = c.read_u32("key2")?;
    let bitmap_data = read_bitmap_data_ex(c)?;

    Ok(CacheBitmapV3Order {
        cache_id,
        flags,
        bpp,
        cache_index,
        key1,
        key2,
        bitmap_data,
    })
}

fn read_cache_color_table(c: &mut ReadCursor<'_>) -> Result<CacheColorTableOrder> {
    let cache_index = c.read_u8("cacheIndex")?;
    let number_colors = c.read_u16("numberColors")?;
    if number_colors != 256 {
        return Err(DecodeError::invalid(
            "numberColors",
            format!("{} (must be 256)", number_colors),
        ));
    }
    c.ensure("colorTable", usize::from(number_colors) * 4)?;
    let colors = (0..number_colors)
        .map(|_| read_color_quad(c))
        .collect::<Result<Vec<_>>>()?;
    Ok(CacheColorTableOrder {
        cache_index,
        colors,
    })
}

fn read_unicode_characters(c: &mut ReadCursor<'_>, extra_flags: u16, count: usize) -> Result<Vec<u16>> {
    if extra_flags & CG_GLYPH_UNICODE_PRESENT == 0 {
        return Ok(Vec::new());
    }
    c.ensure("unicodeCharacters", count * 2)?;
    (0..count).map(|_| c.read_u16("unicodeCharacters")).collect()
}

fn read_cache_glyph(c: &mut ReadCursor<'_>, extra_flags: u16) -> Result<CacheGlyphOrder> {
    let cache_id = c.read_u8("cacheId")?;
    let count = c.read_u8("cGlyphs")?;

    let mut glyphs = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        c.ensure("glyph header", 10)?;
        let cache_index = c.read_u16("cacheIndex")?;
        let x = i32::from(c.read_i16("x")?);
        let y = i32::from(c.read_i16("y")?);
        let cx = u32::from(c.read_u16("cx")?);
        let cy = u32::from(c.read_u16("cy")?);
        let aj = c.read_slice("aj", glyph_bitmap_size(cx, cy))?.to_vec();
        glyphs.push(GlyphData {
            cache_index,
            x,
            y,
            cx,
            cy,
            aj,
        });
    }

    let unicode_characters = read_unicode_characters(c, extra_flags, usize::from(count))?;
    Ok(CacheGlyphOrder {
        cache_id,
        glyphs,
        unicode_characters,
    })
}

fn read_cache_glyph_v2(c: &mut ReadCursor<'_>, extra_flags: u16) -> Result<CacheGlyphV2Order> {
    let cache_id = (extra_flags & 0x000F) as u8;
    let flags = ((extra_flags & 0x00F0) >> 4) as u8;
    let count = usize::from((extra_flags & 0xFF00) >> 8);

    let glyphs = (0..count)
        .map(|_| {
            let cache_index = u16::from(c.read_u8("cacheIndex")?);
            read_glyph_v2(c, cache_index)
        })
        .collect::<Result<Vec<_>>>()?;

    let unicode_characters = read_unicode_characters(c, extra_flags, count)?;
    Ok(CacheGlyphV2Order {
        cache_id,
        flags,
        glyphs,
        unicode_characters,
    })
}

/// Expand a palette-compressed 8x8 brush: 16 bytes of 2-bit indices, bottom
/// row first, then a 4-entry palette.
fn decompress_brush(c: &mut ReadCursor<'_>, bytes_per_pixel: usize) -> Result<Vec<u8>> {
    let indices = c.read_slice("brush indices", 16)?;
    let palette = c.read_slice("brush palette", 4 * bytes_per_pixel)?;

    let mut out = vec![0u8; 64 * bytes_per_pixel];
    let mut packed = indices.iter();
    let mut byte = 0u8;
    for y in (0..8).rev() {
        for x in 0..8 {
            if x % 4 == 0 {
                byte = packed.next().copied().unwrap_or(0);
            }
            let index = usize::from((byte >> ((3 - (x % 4)) * 2)) & 0x03);
            let dst = (y * 8 + x) * bytes_per_pixel;
            let src = index * bytes_per_pixel;
            out[dst..dst + bytes_per_pixel].copy_from_slice(&palette[src..src + bytes_per_pixel]);
        }
    }
    Ok(out)
}

fn read_cache_brush(c: &mut ReadCursor<'_>) -> Result<CacheBrushOrder> {
    c.ensure("cache brush header", 6)?;
    let index = c.read_u8("cacheEntry")?;
    let format = c.read_u8("iBitmapFormat")?;
    let cx = c.read_u8("cx")?;
    let cy = c.read_u8("cy")?;
    let style = c.read_u8("style")?;
    let length = c.read_u8("iBytes")?;

    let bpp = match BMF_BPP.get(usize::from(format)) {
        Some(bpp) if *bpp != 0 => *bpp,
        _ => {
            return Err(DecodeError::invalid(
                "iBitmapFormat",
                format!("unsupported format {}", format),
            ))
        }
    };

    let mut data = Vec::new();
    if cx == 8 && cy == 8 {
        if bpp == 1 {
            if length != 8 {
                return Err(DecodeError::invalid(
                    "iBytes",
                    format!("1bpp brush of length {}", length),
                ));
            }
            let rows = c.read_slice("brushData", 8)?;
            data = rows.iter().rev().copied().collect();
        } else {
            let compressed = matches!(
                (format, length),
                (BMF_8BPP, 20) | (BMF_16BPP, 24) | (BMF_32BPP, 32)
            );
            if compressed {
                data = decompress_brush(c, (usize::from(bpp) + 1) / 8)?;
            } else {
                let scanline = usize::from(bpp / 8) * 8;
                let rows = c.read_slice("brushData", scanline * 8)?;
                data = rows
                    .chunks_exact(scanline)
                    .rev()
                    .flatten()
                    .copied()
                    .collect();
            }
        }
    }

    Ok(CacheBrushOrder {
        index,
        bpp,
        cx,
        cy,
        style,
        length,
        data,
    })
}
