//! Binary field readers shared by the order decoders
//!
//! These cover the compact integer, color and coordinate encodings used by
//! drawing orders. Each reader consumes exactly the bytes its leading bits
//! declare and fails with `TruncatedInput` when they are not there.

use crate::cursor::ReadCursor;
use crate::error::{DecodeError, Result};

/// Maximum number of rectangles a delta-rectangle array may carry.
pub const MAX_DELTA_RECTS: usize = 45;

/// One entry of a delta-encoded rectangle array, already resolved to
/// absolute left/top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaRect {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
}

/// One entry of a delta-encoded point array. Values are offsets from the
/// previous point (the first from the order's start point).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaPoint {
    /// Horizontal offset
    pub x: i32,
    /// Vertical offset
    pub y: i32,
}

/// Read a coordinate into `coord`.
///
/// In delta mode a signed byte is added to the current value, otherwise a
/// fresh signed 16-bit value replaces it.
pub fn read_coord(cursor: &mut ReadCursor<'_>, coord: &mut i32, delta: bool) -> Result<()> {
    if delta {
        let step = cursor.read_i8("coord delta")?;
        *coord = coord.wrapping_add(i32::from(step));
    } else {
        *coord = i32::from(cursor.read_i16("coord")?);
    }
    Ok(())
}

/// Read a 3-byte RGB color into `0x00BBGGRR` layout.
pub fn read_color(cursor: &mut ReadCursor<'_>) -> Result<u32> {
    let raw = cursor.read_slice("color", 3)?;
    Ok(u32::from(raw[0]) | u32::from(raw[1]) << 8 | u32::from(raw[2]) << 16)
}

/// Read a 4-byte color reference (RGB plus one pad byte).
pub fn read_color_ref(cursor: &mut ReadCursor<'_>) -> Result<u32> {
    cursor.ensure("colorRef", 4)?;
    let color = read_color(cursor)?;
    cursor.skip("colorRef pad", 1)?;
    Ok(color)
}

/// Read a 4-byte color quad (blue, green, red, pad) into `0x00BBGGRR`.
pub fn read_color_quad(cursor: &mut ReadCursor<'_>) -> Result<u32> {
    let raw = cursor.read_slice("colorQuad", 4)?;
    Ok(u32::from(raw[0]) << 16 | u32::from(raw[1]) << 8 | u32::from(raw[2]))
}

/// Read a 1 or 2 byte unsigned value. Bit 7 of the first byte selects the
/// two byte form, giving a 15-bit range.
pub fn read_2byte_unsigned(cursor: &mut ReadCursor<'_>) -> Result<u32> {
    let first = cursor.read_u8("2byte unsigned")?;
    if first & 0x80 != 0 {
        let second = cursor.read_u8("2byte unsigned")?;
        Ok(u32::from(first & 0x7F) << 8 | u32::from(second))
    } else {
        Ok(u32::from(first & 0x7F))
    }
}

/// Read a 1 or 2 byte sign-magnitude value. Bit 7 selects the two byte form,
/// bit 6 is the sign.
pub fn read_2byte_signed(cursor: &mut ReadCursor<'_>) -> Result<i32> {
    let first = cursor.read_u8("2byte signed")?;
    let negative = first & 0x40 != 0;
    let mut value = i32::from(first & 0x3F);
    if first & 0x80 != 0 {
        value = value << 8 | i32::from(cursor.read_u8("2byte signed")?);
    }
    Ok(if negative { -value } else { value })
}

/// Read a 1 to 4 byte unsigned value. The top two bits of the first byte
/// give the number of extra bytes, which follow in big-endian order.
pub fn read_4byte_unsigned(cursor: &mut ReadCursor<'_>) -> Result<u32> {
    let first = cursor.read_u8("4byte unsigned")?;
    let extra = usize::from((first & 0xC0) >> 6);
    let tail = cursor.read_slice("4byte unsigned", extra)?;
    Ok(tail
        .iter()
        .fold(u32::from(first & 0x3F), |acc, b| acc << 8 | u32::from(*b)))
}

/// Read a delta value used by the rectangle and point arrays.
///
/// Bit 6 sign-extends the low six bits, bit 7 appends a second byte.
pub fn read_delta(cursor: &mut ReadCursor<'_>) -> Result<i32> {
    let first = cursor.read_u8("delta")?;
    let mut value = if first & 0x40 != 0 {
        i32::from(first) | !0x3F
    } else {
        i32::from(first & 0x3F)
    };
    if first & 0x80 != 0 {
        value = value << 8 | i32::from(cursor.read_u8("delta")?);
    }
    Ok(value)
}

/// Read `count` delta-encoded rectangles into `rects`, replacing its contents.
///
/// A zero-bits block (one nibble per rectangle) precedes the values. A set
/// bit elides the field: left and top then add nothing, width and height
/// copy the previous rectangle.
pub fn read_delta_rects(
    cursor: &mut ReadCursor<'_>,
    rects: &mut Vec<DeltaRect>,
    count: usize,
) -> Result<()> {
    if count > MAX_DELTA_RECTS {
        return Err(DecodeError::invalid(
            "numRectangles",
            format!("{} exceeds {}", count, MAX_DELTA_RECTS),
        ));
    }

    let zero_bits = cursor.read_slice("delta rect zero bits", (count + 1) / 2)?;
    rects.clear();

    let mut prev = DeltaRect::default();
    let mut flags = 0u8;
    for i in 0..count {
        if i % 2 == 0 {
            flags = zero_bits[i / 2];
        }

        let mut rect = DeltaRect::default();
        if flags & 0x80 == 0 {
            rect.left = read_delta(cursor)?;
        }
        if flags & 0x40 == 0 {
            rect.top = read_delta(cursor)?;
        }
        rect.width = if flags & 0x20 == 0 {
            read_delta(cursor)?
        } else {
            prev.width
        };
        rect.height = if flags & 0x10 == 0 {
            read_delta(cursor)?
        } else {
            prev.height
        };
        rect.left = rect.left.wrapping_add(prev.left);
        rect.top = rect.top.wrapping_add(prev.top);

        rects.push(rect);
        prev = rect;
        flags <<= 4;
    }
    Ok(())
}

/// Read `count` delta-encoded points into `points`, replacing its contents.
///
/// The zero-bits block carries two bits per point; a set bit means that axis
/// did not move.
pub fn read_delta_points(
    cursor: &mut ReadCursor<'_>,
    points: &mut Vec<DeltaPoint>,
    count: usize,
) -> Result<()> {
    let zero_bits = cursor.read_slice("delta point zero bits", (count + 3) / 4)?;
    points.clear();

    let mut flags = 0u8;
    for i in 0..count {
        if i % 4 == 0 {
            flags = zero_bits[i / 4];
        }

        let mut point = DeltaPoint::default();
        if flags & 0x80 == 0 {
            point.x = read_delta(cursor)?;
        }
        if flags & 0x40 == 0 {
            point.y = read_delta(cursor)?;
        }
        points.push(point);
        flags <<= 2;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_read_coord_delta_accumulates() {
        let mut coord = 100;
        let mut cursor = ReadCursor::new(&[0xF6, 0x05]);
        read_coord(&mut cursor, &mut coord, true).unwrap();
        assert_eq!(coord, 90);
        read_coord(&mut cursor, &mut coord, true).unwrap();
        assert_eq!(coord, 95);
    }

    #[test]
    fn test_read_coord_absolute_is_signed() {
        let mut coord = 7;
        let mut cursor = ReadCursor::new(&[0xFE, 0xFF]);
        read_coord(&mut cursor, &mut coord, false).unwrap();
        assert_eq!(coord, -2);
    }

    #[test]
    fn test_read_coord_truncated_keeps_value() {
        let mut coord = 7;
        let mut cursor = ReadCursor::new(&[0x01]);
        assert!(read_coord(&mut cursor, &mut coord, false).is_err());
        assert_eq!(coord, 7);
    }

    #[test]
    fn test_read_colors() {
        let mut cursor = ReadCursor::new(&[0x73, 0x02, 0x06]);
        assert_eq!(read_color(&mut cursor).unwrap(), 0x0006_0273);

        let mut cursor = ReadCursor::new(&[0x11, 0x22, 0x33, 0x00, 0xAA]);
        assert_eq!(read_color_ref(&mut cursor).unwrap(), 0x0033_2211);
        assert_eq!(cursor.remaining(), 1);

        // blue, green, red, pad
        let mut cursor = ReadCursor::new(&[0x33, 0x22, 0x11, 0x00]);
        assert_eq!(read_color_quad(&mut cursor).unwrap(), 0x0033_2211);
    }

    #[test]
    fn test_read_color_ref_short() {
        let mut cursor = ReadCursor::new(&[0x11, 0x22, 0x33]);
        assert!(matches!(
            read_color_ref(&mut cursor),
            Err(DecodeError::TruncatedInput { .. })
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_read_2byte_unsigned() {
        let mut cursor = ReadCursor::new(&[0x7F, 0x81, 0x02]);
        assert_eq!(read_2byte_unsigned(&mut cursor).unwrap(), 0x7F);
        assert_eq!(read_2byte_unsigned(&mut cursor).unwrap(), 0x0102);
        assert_eq!(cursor.remaining(), 0);

        let mut cursor = ReadCursor::new(&[0x80]);
        assert!(read_2byte_unsigned(&mut cursor).is_err());
    }

    #[test]
    fn test_read_2byte_signed() {
        let mut cursor = ReadCursor::new(&[0x05, 0x45, 0xC1, 0x00]);
        assert_eq!(read_2byte_signed(&mut cursor).unwrap(), 5);
        assert_eq!(read_2byte_signed(&mut cursor).unwrap(), -5);
        assert_eq!(read_2byte_signed(&mut cursor).unwrap(), -256);
    }

    #[test]
    fn test_read_4byte_unsigned_widths() {
        let mut cursor = ReadCursor::new(&[0x3F]);
        assert_eq!(read_4byte_unsigned(&mut cursor).unwrap(), 0x3F);

        let mut cursor = ReadCursor::new(&[0x41, 0x02]);
        assert_eq!(read_4byte_unsigned(&mut cursor).unwrap(), 0x0102);

        let mut cursor = ReadCursor::new(&[0x81, 0x02, 0x03]);
        assert_eq!(read_4byte_unsigned(&mut cursor).unwrap(), 0x01_0203);

        let mut cursor = ReadCursor::new(&[0xC1, 0x02, 0x03, 0x04]);
        assert_eq!(read_4byte_unsigned(&mut cursor).unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_read_4byte_unsigned_never_overreads() {
        let mut cursor = ReadCursor::new(&[0xC1, 0x02, 0x03]);
        assert!(read_4byte_unsigned(&mut cursor).is_err());
    }

    #[test]
    fn test_read_delta() {
        let mut cursor = ReadCursor::new(&[0x05, 0x7F, 0x81, 0x00, 0xFF, 0xFF]);
        assert_eq!(read_delta(&mut cursor).unwrap(), 5);
        assert_eq!(read_delta(&mut cursor).unwrap(), -1);
        assert_eq!(read_delta(&mut cursor).unwrap(), 256);
        assert_eq!(read_delta(&mut cursor).unwrap(), -1);
    }

    #[test]
    fn test_delta_rects_elided_size_copies_previous() {
        // rect 0: all present; rect 1: width and height elided
        let data = [0x03, 10, 20, 30, 40, 5, 6];
        let mut cursor = ReadCursor::new(&data);
        let mut rects = Vec::new();
        read_delta_rects(&mut cursor, &mut rects, 2).unwrap();

        assert_eq!(
            rects,
            vec![
                DeltaRect { left: 10, top: 20, width: 30, height: 40 },
                DeltaRect { left: 15, top: 26, width: 30, height: 40 },
            ]
        );
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_delta_rects_elided_position_keeps_previous() {
        // rect 1 elides left and top only
        let data = [0x0C, 1, 2, 3, 4, 9, 9];
        let mut cursor = ReadCursor::new(&data);
        let mut rects = Vec::new();
        read_delta_rects(&mut cursor, &mut rects, 2).unwrap();
        assert_eq!(rects[1], DeltaRect { left: 1, top: 2, width: 9, height: 9 });
    }

    #[test]
    fn test_delta_rects_limit() {
        let mut cursor = ReadCursor::new(&[]);
        let mut rects = Vec::new();
        let err = read_delta_rects(&mut cursor, &mut rects, 46).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_delta_rects_replaces_previous_contents() {
        let mut rects = vec![DeltaRect::default(); 5];
        let mut cursor = ReadCursor::new(&[0xF0]);
        read_delta_rects(&mut cursor, &mut rects, 1).unwrap();
        assert_eq!(rects, vec![DeltaRect::default()]);
    }

    #[test]
    fn test_delta_points() {
        // point 0: both axes; point 1: x only; point 2: none
        let data = [0x1C, 3, 0x7D, 4, 0xAA];
        let mut cursor = ReadCursor::new(&data);
        let mut points = Vec::new();
        read_delta_points(&mut cursor, &mut points, 3).unwrap();
        assert_eq!(
            points,
            vec![
                DeltaPoint { x: 3, y: -3 },
                DeltaPoint { x: 4, y: 0 },
                DeltaPoint { x: 0, y: 0 },
            ]
        );
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_delta_points_truncated() {
        let mut cursor = ReadCursor::new(&[0x00, 1]);
        let mut points = Vec::new();
        assert!(read_delta_points(&mut cursor, &mut points, 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_delta_coord_round_trip(start in -1000i32..1000, step in -128i32..=127) {
            let mut coord = start;
            let byte = [step as i8 as u8];
            let mut cursor = ReadCursor::new(&byte);
            read_coord(&mut cursor, &mut coord, true).unwrap();
            prop_assert_eq!(coord - start, step);
        }

        #[test]
        fn prop_absolute_coord_round_trip(value in any::<i16>()) {
            let mut coord = 0;
            let bytes = value.to_le_bytes();
            let mut cursor = ReadCursor::new(&bytes);
            read_coord(&mut cursor, &mut coord, false).unwrap();
            prop_assert_eq!(coord, i32::from(value));
        }

        #[test]
        fn prop_4byte_unsigned_consumes_declared_width(first in any::<u8>(), tail in proptest::collection::vec(any::<u8>(), 3)) {
            let mut data = vec![first];
            data.extend_from_slice(&tail);
            let mut cursor = ReadCursor::new(&data);
            read_4byte_unsigned(&mut cursor).unwrap();
            prop_assert_eq!(cursor.position(), 1 + usize::from(first >> 6));
        }
    }
}
