//! Bitmap and palette update readers

use tracing::{debug, trace};

use crate::cursor::ReadCursor;
use crate::error::Result;
use crate::orders::BitmapCompressionHeader;

/// Bitmap data is compressed.
pub const BITMAP_COMPRESSION: u16 = 0x0001;
/// Compressed bitmap data carries no compression header.
pub const NO_BITMAP_COMPRESSION_HDR: u16 = 0x0400;

/// Largest palette the protocol allows.
pub const MAX_PALETTE_ENTRIES: usize = 256;

/// One rectangle of a bitmap update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapData<'a> {
    pub dest_left: u16,
    pub dest_top: u16,
    pub dest_right: u16,
    pub dest_bottom: u16,
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u16,
    pub flags: u16,
    pub compressed: bool,
    pub compression_header: Option<BitmapCompressionHeader>,
    /// Bitmap bytes, borrowed from the packet.
    pub data: &'a [u8],
}

/// A bitmap update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitmapUpdate<'a> {
    pub rectangles: Vec<BitmapData<'a>>,
}

/// One palette color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaletteEntry {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// A palette update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteUpdate {
    pub entries: Vec<PaletteEntry>,
}

/// Read one `TS_BITMAP_DATA` rectangle.
pub fn read_bitmap_data<'a>(c: &mut ReadCursor<'a>) -> Result<BitmapData<'a>> {
    c.ensure("bitmap data header", 18)?;
    let dest_left = c.read_u16("destLeft")?;
    let dest_top = c.read_u16("destTop")?;
    let dest_right = c.read_u16("destRight")?;
    let dest_bottom = c.read_u16("destBottom")?;
    let width = c.read_u16("width")?;
    let height = c.read_u16("height")?;
    let bits_per_pixel = c.read_u16("bitsPerPixel")?;
    let flags = c.read_u16("flags")?;
    let mut length = c.read_u16("bitmapLength")? as usize;

    let compressed = flags & BITMAP_COMPRESSION != 0;
    let mut compression_header = None;
    if compressed && flags & NO_BITMAP_COMPRESSION_HDR == 0 {
        let header = BitmapCompressionHeader::read(c)?;
        length = header.comp_main_body_size as usize;
        compression_header = Some(header);
    }
    let data = c.read_slice("bitmapDataStream", length)?;

    Ok(BitmapData {
        dest_left,
        dest_top,
        dest_right,
        dest_bottom,
        width,
        height,
        bits_per_pixel,
        flags,
        compressed,
        compression_header,
        data,
    })
}

/// Read `numberRectangles` followed by that many rectangles.
pub fn read_bitmap_update<'a>(c: &mut ReadCursor<'a>) -> Result<BitmapUpdate<'a>> {
    let number = c.read_u16("numberRectangles")?;
    // each rectangle needs at least its fixed header
    c.ensure("bitmap rectangles", number as usize * 18)?;
    let rectangles = (0..number)
        .map(|_| read_bitmap_data(c))
        .collect::<Result<Vec<_>>>()?;
    trace!(rectangles = rectangles.len(), "Bitmap update");
    Ok(BitmapUpdate { rectangles })
}

/// Read a palette update. Counts above 256 are clamped.
pub fn read_palette(c: &mut ReadCursor<'_>) -> Result<PaletteUpdate> {
    c.skip("pad2Octets", 2)?;
    let mut number = c.read_u32("numberColors")? as usize;
    if number > MAX_PALETTE_ENTRIES {
        debug!(number, "Palette larger than 256 entries, clamping");
        number = MAX_PALETTE_ENTRIES;
    }
    c.ensure("paletteEntries", number * 3)?;

    let mut entries = Vec::with_capacity(number);
    for _ in 0..number {
        entries.push(PaletteEntry {
            red: c.read_u8("red")?,
            green: c.read_u8("green")?,
            blue: c.read_u8("blue")?,
        });
    }
    Ok(PaletteUpdate { entries })
}
