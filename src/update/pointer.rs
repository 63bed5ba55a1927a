//! Pointer update readers

use crate::cursor::ReadCursor;
use crate::error::{DecodeError, Result};

/// Hidden system pointer.
pub const SYSPTR_NULL: u32 = 0x0000_0000;
/// Default system pointer.
pub const SYSPTR_DEFAULT: u32 = 0x0000_7F00;

/// Largest large-pointer dimension.
pub const LARGE_POINTER_MAX_DIMENSION: u16 = 384;

const XOR_BPP_VALUES: [u16; 6] = [1, 4, 8, 16, 24, 32];

/// System pointer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSystemUpdate {
    Null,
    Default,
}

impl PointerSystemUpdate {
    /// Wire value of the system pointer type.
    pub fn as_u32(self) -> u32 {
        match self {
            PointerSystemUpdate::Null => SYSPTR_NULL,
            PointerSystemUpdate::Default => SYSPTR_DEFAULT,
        }
    }
}

/// Pointer moved by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerPositionUpdate {
    pub x: u16,
    pub y: u16,
}

/// Color pointer with borrowed masks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerColorUpdate<'a> {
    pub cache_index: u16,
    /// Hotspot, clamped to 0 when outside the pointer.
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub xor_mask: &'a [u8],
    pub and_mask: &'a [u8],
}

/// Color pointer with an explicit xor mask depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerNewUpdate<'a> {
    pub xor_bpp: u16,
    pub color: PointerColorUpdate<'a>,
}

/// Switch to a cached pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerCachedUpdate {
    pub cache_index: u16,
}

/// Pointer up to 384x384.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerLargeUpdate<'a> {
    pub xor_bpp: u16,
    pub cache_index: u16,
    pub hot_spot_x: u16,
    pub hot_spot_y: u16,
    pub width: u16,
    pub height: u16,
    pub xor_mask: &'a [u8],
    pub and_mask: &'a [u8],
}

fn check_xor_bpp(xor_bpp: u16) -> Result<()> {
    if XOR_BPP_VALUES.contains(&xor_bpp) {
        Ok(())
    } else {
        Err(DecodeError::invalid(
            "xorBpp",
            format!("{} is not a pointer color depth", xor_bpp),
        ))
    }
}

/// Read a pointer position.
pub fn read_pointer_position(c: &mut ReadCursor<'_>) -> Result<PointerPositionUpdate> {
    c.ensure("pointer position", 4)?;
    Ok(PointerPositionUpdate {
        x: c.read_u16("xPos")?,
        y: c.read_u16("yPos")?,
    })
}

/// Read a `TS_COLORPOINTERATTRIBUTE`.
pub fn read_pointer_color<'a>(c: &mut ReadCursor<'a>) -> Result<PointerColorUpdate<'a>> {
    c.ensure("color pointer header", 14)?;
    let cache_index = c.read_u16("cacheIndex")?;
    let mut x = c.read_u16("xPos")?;
    let mut y = c.read_u16("yPos")?;
    let width = c.read_u16("width")?;
    let height = c.read_u16("height")?;
    let length_and_mask = c.read_u16("lengthAndMask")? as usize;
    let length_xor_mask = c.read_u16("lengthXorMask")? as usize;

    // servers send hotspots outside the pointer
    if x >= width {
        x = 0;
    }
    if y >= height {
        y = 0;
    }

    let xor_mask = c.read_slice("xorMaskData", length_xor_mask)?;
    let and_mask = c.read_slice("andMaskData", length_and_mask)?;
    if c.remaining() > 0 {
        c.skip("pad", 1)?;
    }

    Ok(PointerColorUpdate {
        cache_index,
        x,
        y,
        width,
        height,
        xor_mask,
        and_mask,
    })
}

/// Read a new pointer: xor depth followed by a color pointer.
pub fn read_pointer_new<'a>(c: &mut ReadCursor<'a>) -> Result<PointerNewUpdate<'a>> {
    let xor_bpp = c.read_u16("xorBpp")?;
    check_xor_bpp(xor_bpp)?;
    Ok(PointerNewUpdate {
        xor_bpp,
        color: read_pointer_color(c)?,
    })
}

/// Read a cached pointer index.
pub fn read_pointer_cached(c: &mut ReadCursor<'_>) -> Result<PointerCachedUpdate> {
    Ok(PointerCachedUpdate {
        cache_index: c.read_u16("cacheIndex")?,
    })
}

/// Read a `TS_LARGEPOINTERATTRIBUTE`.
pub fn read_pointer_large<'a>(c: &mut ReadCursor<'a>) -> Result<PointerLargeUpdate<'a>> {
    c.ensure("large pointer header", 20)?;
    let xor_bpp = c.read_u16("xorBpp")?;
    check_xor_bpp(xor_bpp)?;
    let cache_index = c.read_u16("cacheIndex")?;
    let hot_spot_x = c.read_u16("hotSpotX")?;
    let hot_spot_y = c.read_u16("hotSpotY")?;
    let width = c.read_u16("width")?;
    let height = c.read_u16("height")?;
    if width > LARGE_POINTER_MAX_DIMENSION || height > LARGE_POINTER_MAX_DIMENSION {
        return Err(DecodeError::invalid(
            "width",
            format!("large pointer {}x{} exceeds 384x384", width, height),
        ));
    }
    let length_and_mask = c.read_u32("lengthAndMask")? as usize;
    let length_xor_mask = c.read_u32("lengthXorMask")? as usize;
    let xor_mask = c.read_slice("xorMaskData", length_xor_mask)?;
    let and_mask = c.read_slice("andMaskData", length_and_mask)?;

    Ok(PointerLargeUpdate {
        xor_bpp,
        cache_index,
        hot_spot_x,
        hot_spot_y,
        width,
        height,
        xor_mask,
        and_mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_body(x: u16, y: u16, and: &[u8], xor: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in [5u16, x, y, 32, 32, and.len() as u16, xor.len() as u16] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(xor);
        out.extend_from_slice(and);
        out
    }

    #[test]
    fn test_pointer_position() {
        let update = read_pointer_position(&mut ReadCursor::new(&[0x10, 0x00, 0x20, 0x01])).unwrap();
        assert_eq!(update, PointerPositionUpdate { x: 0x10, y: 0x120 });
    }

    #[test]
    fn test_system_pointer_values() {
        assert_eq!(PointerSystemUpdate::Null.as_u32(), 0);
        assert_eq!(PointerSystemUpdate::Default.as_u32(), 0x7F00);
    }

    #[test]
    fn test_pointer_color_masks() {
        let mut data = color_body(3, 4, &[0xF0; 2], &[1, 2, 3]);
        data.push(0);
        let mut c = ReadCursor::new(&data);
        let update = read_pointer_color(&mut c).unwrap();
        assert_eq!(update.cache_index, 5);
        assert_eq!((update.x, update.y), (3, 4));
        assert_eq!(update.xor_mask, &[1, 2, 3]);
        assert_eq!(update.and_mask, &[0xF0, 0xF0]);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_pointer_color_hotspot_clamped() {
        let data = color_body(40, 32, &[], &[]);
        let update = read_pointer_color(&mut ReadCursor::new(&data)).unwrap();
        assert_eq!((update.x, update.y), (0, 0));
    }

    #[test]
    fn test_pointer_color_truncated_mask() {
        let mut data = color_body(0, 0, &[], &[1, 2, 3]);
        data.truncate(data.len() - 1);
        assert!(read_pointer_color(&mut ReadCursor::new(&data)).is_err());
    }

    #[test]
    fn test_pointer_new() {
        let mut data = 24u16.to_le_bytes().to_vec();
        data.extend(color_body(1, 1, &[0xFF], &[9]));
        let update = read_pointer_new(&mut ReadCursor::new(&data)).unwrap();
        assert_eq!(update.xor_bpp, 24);
        assert_eq!(update.color.xor_mask, &[9]);
    }

    #[test]
    fn test_pointer_new_bad_bpp() {
        let mut data = 7u16.to_le_bytes().to_vec();
        data.extend(color_body(1, 1, &[], &[]));
        let err = read_pointer_new(&mut ReadCursor::new(&data)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidFieldValue { field: "xorBpp", .. }
        ));
    }

    #[test]
    fn test_pointer_cached() {
        let update = read_pointer_cached(&mut ReadCursor::new(&[0x02, 0x00])).unwrap();
        assert_eq!(update.cache_index, 2);
    }

    #[test]
    fn test_pointer_large() {
        let mut data = Vec::new();
        for v in [32u16, 1, 10, 20, 256, 256] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0xA, 0xB, 0xC]);
        let update = read_pointer_large(&mut ReadCursor::new(&data)).unwrap();
        assert_eq!(update.width, 256);
        assert_eq!(update.hot_spot_y, 20);
        assert_eq!(update.xor_mask, &[0xA, 0xB]);
        assert_eq!(update.and_mask, &[0xC]);
    }

    #[test]
    fn test_pointer_large_too_big() {
        let mut data = Vec::new();
        for v in [32u16, 1, 0, 0, 385, 16] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[0; 8]);
        assert!(matches!(
            read_pointer_large(&mut ReadCursor::new(&data)),
            Err(DecodeError::InvalidFieldValue { .. })
        ));
    }
}
