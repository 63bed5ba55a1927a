//! Control flags, field-presence masks and bounds rectangles
//!
//! Every drawing order starts with a control-flags byte:
//!
//! ```text
//! bit  7                  6                  5            4       3        2      1         0
//! +------------------+------------------+------------+-------+--------+------+---------+--------+
//! | ZERO_FIELD_BIT1  | ZERO_FIELD_BIT0  | ZERO_BOUNDS| DELTA | TYPE   |BOUNDS|SECONDARY|STANDARD|
//! +------------------+------------------+------------+-------+--------+------+---------+--------+
//! ```
//!
//! Alternate secondary orders clear STANDARD and reuse bits 2..7 as their
//! order type.

use bitflags::bitflags;

use crate::cursor::ReadCursor;
use crate::error::Result;
use crate::primitives::read_coord;

bitflags! {
    /// Order control flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u8 {
        /// Standard (primary or secondary) order
        const STANDARD = 0x01;
        /// Secondary order
        const SECONDARY = 0x02;
        /// Bounds rectangle present
        const BOUNDS = 0x04;
        /// Order type byte present
        const TYPE_CHANGE = 0x08;
        /// Coordinates are signed byte deltas
        const DELTA_COORDINATES = 0x10;
        /// Bounds unchanged since the previous order
        const ZERO_BOUNDS_DELTAS = 0x20;
        /// One trailing field-flags byte elided
        const ZERO_FIELD_BYTE_BIT0 = 0x40;
        /// Two trailing field-flags bytes elided
        const ZERO_FIELD_BYTE_BIT1 = 0x80;
    }
}

bitflags! {
    /// Presence flags of an encoded bounds rectangle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BoundsFlags: u8 {
        /// Absolute left
        const LEFT = 0x01;
        /// Absolute top
        const TOP = 0x02;
        /// Absolute right
        const RIGHT = 0x04;
        /// Absolute bottom
        const BOTTOM = 0x08;
        /// Delta left
        const DELTA_LEFT = 0x10;
        /// Delta top
        const DELTA_TOP = 0x20;
        /// Delta right
        const DELTA_RIGHT = 0x40;
        /// Delta bottom
        const DELTA_BOTTOM = 0x80;
    }
}

/// Clipping rectangle applied to primary orders, inclusive on all edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Right edge
    pub right: i32,
    /// Bottom edge
    pub bottom: i32,
}

/// Number of field-flags bytes present once the elision bits of `control`
/// have been applied to the per-type byte count.
pub fn field_byte_count(control: ControlFlags, field_bytes: u8) -> u8 {
    let mut count = field_bytes;
    if control.contains(ControlFlags::ZERO_FIELD_BYTE_BIT0) {
        count = count.saturating_sub(1);
    }
    if control.contains(ControlFlags::ZERO_FIELD_BYTE_BIT1) {
        count = count.saturating_sub(2);
    }
    count
}

/// Read the field-presence mask of a primary order.
///
/// Bytes are little-endian; elided trailing bytes read as zero.
pub fn read_field_flags(
    cursor: &mut ReadCursor<'_>,
    control: ControlFlags,
    field_bytes: u8,
) -> Result<u32> {
    let count = usize::from(field_byte_count(control, field_bytes));
    let raw = cursor.read_slice("fieldFlags", count)?;
    Ok(raw
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, b)| acc | u32::from(*b) << (8 * i)))
}

fn read_edge(
    cursor: &mut ReadCursor<'_>,
    edge: &mut i32,
    flags: BoundsFlags,
    absolute: BoundsFlags,
    delta: BoundsFlags,
) -> Result<()> {
    if flags.contains(absolute) {
        read_coord(cursor, edge, false)
    } else if flags.contains(delta) {
        read_coord(cursor, edge, true)
    } else {
        Ok(())
    }
}

/// Update `bounds` from an encoded bounds block. Absent edges keep their
/// previous value; an absolute edge wins over a delta edge.
pub fn read_bounds(cursor: &mut ReadCursor<'_>, bounds: &mut Bounds) -> Result<()> {
    let flags = BoundsFlags::from_bits_retain(cursor.read_u8("boundsFlags")?);
    read_edge(cursor, &mut bounds.left, flags, BoundsFlags::LEFT, BoundsFlags::DELTA_LEFT)?;
    read_edge(cursor, &mut bounds.top, flags, BoundsFlags::TOP, BoundsFlags::DELTA_TOP)?;
    read_edge(cursor, &mut bounds.right, flags, BoundsFlags::RIGHT, BoundsFlags::DELTA_RIGHT)?;
    read_edge(
        cursor,
        &mut bounds.bottom,
        flags,
        BoundsFlags::BOTTOM,
        BoundsFlags::DELTA_BOTTOM,
    )?;
    Ok(())
}
