//! Drawing order decoder
//!
//! One call to [`OrderDecoder::decode_order`] consumes exactly one order.
//! The control-flags byte selects the order class:
//!
//! - STANDARD clear: alternate secondary order, type in bits 2..7
//! - STANDARD and SECONDARY set: secondary (cache) order with a length header
//! - STANDARD set, SECONDARY clear: primary drawing order
//!
//! Primary orders only transmit the fields that changed, so the decoder
//! keeps the last value of every field for the life of the connection.

mod altsec;
mod field_flags;
mod primary;
mod secondary;

pub use altsec::{
    AltSecOrderType, CreateNineGridBitmapOrder, CreateOffscreenBitmapOrder, FrameMarkerOrder,
    GdiPlusCacheOrder, GdiPlusOrder, StreamBitmapFirstOrder, StreamBitmapNextOrder,
    SwitchSurfaceOrder, WindowOrder,
};
pub use field_flags::{
    field_byte_count, read_bounds, read_field_flags, Bounds, BoundsFlags, ControlFlags,
};
pub use primary::{
    BackMode, Brush, DrawNineGridOrder, DstBltOrder, EllipseCbOrder, EllipseScOrder,
    FastGlyphOrder, FastIndexOrder, GlyphIndexOrder, LineToOrder, Mem3BltOrder, MemBltOrder,
    MultiDrawNineGridOrder, MultiDstBltOrder, MultiOpaqueRectOrder, MultiPatBltOrder,
    MultiScrBltOrder, OpaqueRectOrder, PatBltOrder, PolygonCbOrder, PolygonScOrder,
    PolylineOrder, PrimaryOrderType, PrimaryState, SaveBitmapOrder, ScrBltOrder,
};
pub use secondary::{
    BitmapCompressionHeader, CacheBitmapOrder, CacheBitmapV2Order, CacheBitmapV3Order,
    CacheBrushOrder, CacheColorTableOrder, CacheGlyphOrder, CacheGlyphV2Order, SecondaryOrderType,
};

use tracing::{error, trace};

use crate::config::DecoderConfig;
use crate::cursor::ReadCursor;
use crate::error::{DecodeError, Result};
use crate::handler::{Renderer, UpdateHandler};
use crate::primitives::{read_2byte_signed, read_2byte_unsigned};

/// Connection-scoped primary order state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInfo {
    /// Type of the most recent primary order
    pub order_type: PrimaryOrderType,
    /// Field-presence mask of the most recent primary order
    pub field_flags: u32,
    /// Last bounds rectangle, the base for delta-encoded bounds
    pub bounds: Bounds,
    /// Whether the current order's coordinates are deltas
    pub delta_coordinates: bool,
}

impl Default for OrderInfo {
    fn default() -> Self {
        OrderInfo {
            order_type: PrimaryOrderType::PatBlt,
            field_flags: 0,
            bounds: Bounds::default(),
            delta_coordinates: false,
        }
    }
}

/// Class of a decoded order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderClass {
    /// Primary drawing order of the given type
    Primary(PrimaryOrderType),
    /// Secondary order with its raw type byte
    Secondary(u8),
    /// Alternate secondary order with its raw type
    AltSecondary(u8),
}

/// Glyph bitmap with its cell metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphData {
    /// Cache slot
    pub cache_index: u16,
    /// Origin x offset
    pub x: i32,
    /// Origin y offset
    pub y: i32,
    /// Width in pixels
    pub cx: u32,
    /// Height in pixels
    pub cy: u32,
    /// 1bpp glyph mask, rows padded to a byte and the total to 4 bytes
    pub aj: Vec<u8>,
}

/// Size in bytes of a 1bpp glyph mask.
pub fn glyph_bitmap_size(cx: u32, cy: u32) -> usize {
    let cb = ((cx as usize + 7) / 8) * cy as usize;
    (cb + 3) & !3
}

/// Read a glyph whose metrics use the compact 2-byte encodings.
pub(crate) fn read_glyph_v2(cursor: &mut ReadCursor<'_>, cache_index: u16) -> Result<GlyphData> {
    let x = read_2byte_signed(cursor)?;
    let y = read_2byte_signed(cursor)?;
    let cx = read_2byte_unsigned(cursor)?;
    let cy = read_2byte_unsigned(cursor)?;
    let aj = cursor.read_slice("glyph aj", glyph_bitmap_size(cx, cy))?;
    Ok(GlyphData {
        cache_index,
        x,
        y,
        cx,
        cy,
        aj: aj.to_vec(),
    })
}

/// Stateful decoder for the drawing order stream of one connection.
#[derive(Debug)]
pub struct OrderDecoder {
    info: OrderInfo,
    primary: PrimaryState,
    supported: u32,
    glyph_v2: bool,
}

impl OrderDecoder {
    /// Create a decoder for the negotiated capabilities in `config`.
    pub fn new(config: &DecoderConfig) -> Self {
        let supported = config
            .primary_orders
            .iter()
            .fold(0u32, |acc, t| acc | 1 << (*t as u8));
        OrderDecoder {
            info: OrderInfo::default(),
            primary: PrimaryState::default(),
            supported,
            glyph_v2: config.glyph_v2,
        }
    }

    /// Restore connection-start state.
    pub fn reset(&mut self) {
        self.info = OrderInfo::default();
        self.primary = PrimaryState::default();
    }

    /// Current primary order state.
    pub fn info(&self) -> &OrderInfo {
        &self.info
    }

    /// Persisted primary order records.
    pub fn primary(&self) -> &PrimaryState {
        &self.primary
    }

    /// Whether a primary order type was negotiated.
    pub fn is_supported(&self, order_type: PrimaryOrderType) -> bool {
        self.supported & 1 << (order_type as u8) != 0
    }

    /// Decode `count` consecutive orders.
    pub fn decode_orders(
        &mut self,
        cursor: &mut ReadCursor<'_>,
        count: u16,
        handler: &mut dyn UpdateHandler,
    ) -> Result<()> {
        for _ in 0..count {
            self.decode_order(cursor, handler)?;
        }
        Ok(())
    }

    /// Decode one order and deliver it to `handler`.
    ///
    /// Errors returned from here are fatal for the connection. Secondary
    /// order body failures are logged and skipped instead.
    pub fn decode_order(
        &mut self,
        cursor: &mut ReadCursor<'_>,
        handler: &mut dyn UpdateHandler,
    ) -> Result<OrderClass> {
        let start = cursor.position();
        let control_byte = cursor.read_u8("controlFlags")?;
        let control = ControlFlags::from_bits_retain(control_byte);

        if !control.contains(ControlFlags::STANDARD) {
            let order_type = control_byte >> 2;
            trace!(order_type, offset = start, "alternate secondary order");
            altsec::decode(cursor, order_type, handler).map_err(|err| {
                error!(order_type, offset = start, %err, "alternate secondary order failed");
                err
            })?;
            Ok(OrderClass::AltSecondary(order_type))
        } else if control.contains(ControlFlags::SECONDARY) {
            let order_type = secondary::decode(cursor, self.glyph_v2, handler).map_err(|err| {
                error!(offset = start, %err, "secondary order header invalid");
                err
            })?;
            Ok(OrderClass::Secondary(order_type))
        } else {
            let order_type = self.decode_primary(cursor, control, handler).map_err(|err| {
                error!(
                    order = ?self.info.order_type,
                    offset = start,
                    %err,
                    "primary order failed"
                );
                err
            })?;
            Ok(OrderClass::Primary(order_type))
        }
    }

    fn decode_primary(
        &mut self,
        cursor: &mut ReadCursor<'_>,
        control: ControlFlags,
        handler: &mut dyn UpdateHandler,
    ) -> Result<PrimaryOrderType> {
        if control.contains(ControlFlags::TYPE_CHANGE) {
            let raw = cursor.read_u8("orderType")?;
            self.info.order_type = PrimaryOrderType::from_u8(raw).ok_or_else(|| {
                DecodeError::violation(format!("unknown primary order type 0x{:02X}", raw))
            })?;
        }
        let order_type = self.info.order_type;

        if !self.is_supported(order_type) {
            return Err(DecodeError::violation(format!(
                "primary order {:?} was not negotiated",
                order_type
            )));
        }

        self.info.field_flags = read_field_flags(cursor, control, order_type.field_bytes())?;

        let bounded = control.contains(ControlFlags::BOUNDS);
        if bounded && !control.contains(ControlFlags::ZERO_BOUNDS_DELTAS) {
            read_bounds(cursor, &mut self.info.bounds)?;
        }
        self.info.delta_coordinates = control.contains(ControlFlags::DELTA_COORDINATES);

        trace!(
            order = ?order_type,
            field_flags = self.info.field_flags,
            bounded,
            "primary order"
        );

        self.primary.decode(order_type, cursor, &self.info)?;

        if bounded {
            handler.set_bounds(Some(&self.info.bounds));
        }
        self.primary.deliver(order_type, handler);
        if bounded {
            handler.set_bounds(None);
        }
        Ok(order_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{CacheManager, Renderer, SurfaceCodec};

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        dst_blts: Vec<DstBltOrder>,
        opaque_rects: Vec<OpaqueRectOrder>,
    }

    impl Renderer for Recorder {
        fn set_bounds(&mut self, bounds: Option<&Bounds>) {
            self.events.push(format!("bounds {:?}", bounds));
        }

        fn dst_blt(&mut self, order: &DstBltOrder) {
            self.events.push("dst_blt".to_string());
            self.dst_blts.push(order.clone());
        }

        fn opaque_rect(&mut self, order: &OpaqueRectOrder) {
            self.events.push("opaque_rect".to_string());
            self.opaque_rects.push(order.clone());
        }

        fn switch_surface(&mut self, order: &SwitchSurfaceOrder) {
            self.events.push(format!("switch_surface {}", order.bitmap_id));
        }
    }

    impl CacheManager for Recorder {
        fn cache_color_table(&mut self, order: &CacheColorTableOrder) {
            self.events.push(format!("color_table {}", order.cache_index));
        }
    }

    impl SurfaceCodec for Recorder {}

    fn decoder() -> OrderDecoder {
        OrderDecoder::new(&DecoderConfig::default())
    }

    #[test]
    fn test_initial_order_type_is_patblt() {
        assert_eq!(decoder().info().order_type, PrimaryOrderType::PatBlt);
    }

    #[test]
    fn test_dstblt_example() {
        // STANDARD | TYPE_CHANGE, type DstBlt, fieldFlags 0x0C
        let data = [0x09, 0x00, 0x0C, 0x48, 0x00, 0x37, 0x01];
        let mut cursor = ReadCursor::new(&data);
        let mut rec = Recorder::default();
        let class = decoder().decode_order(&mut cursor, &mut rec).unwrap();

        assert_eq!(class, OrderClass::Primary(PrimaryOrderType::DstBlt));
        assert_eq!(
            rec.dst_blts,
            vec![DstBltOrder {
                left: 0,
                top: 0,
                width: 72,
                height: 311,
                rop: 0
            }]
        );
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_opaque_rect_example_with_persisted_type() {
        let mut dec = decoder();
        let mut rec = Recorder::default();

        let first = [0x09, 0x0A, 0x7C, 0x00, 0x04, 0x00, 0x03, 0x73, 0x02, 0x06];
        let mut cursor = ReadCursor::new(&first);
        dec.decode_order(&mut cursor, &mut rec).unwrap();
        assert_eq!(
            rec.opaque_rects[0],
            OpaqueRectOrder {
                left: 0,
                top: 0,
                width: 1024,
                height: 768,
                color: 0x0006_0273
            }
        );

        // no TYPE_CHANGE: still OpaqueRect; delta left +5, only red changes
        let second = [0x11, 0x11, 0x05, 0xFF];
        let mut cursor = ReadCursor::new(&second);
        let class = dec.decode_order(&mut cursor, &mut rec).unwrap();
        assert_eq!(class, OrderClass::Primary(PrimaryOrderType::OpaqueRect));
        assert_eq!(
            rec.opaque_rects[1],
            OpaqueRectOrder {
                left: 5,
                top: 0,
                width: 1024,
                height: 768,
                color: 0x0006_02FF
            }
        );
    }

    #[test]
    fn test_bounds_bracket_primary_order() {
        let mut dec = decoder();
        let mut rec = Recorder::default();
        // STANDARD | BOUNDS | TYPE_CHANGE, DstBlt, no fields, bounds: left=1 right=9
        let data = [0x0D, 0x00, 0x00, 0x05, 0x01, 0x00, 0x09, 0x00];
        let mut cursor = ReadCursor::new(&data);
        dec.decode_order(&mut cursor, &mut rec).unwrap();

        assert_eq!(rec.events.len(), 3);
        assert!(rec.events[0].starts_with("bounds Some"));
        assert_eq!(rec.events[1], "dst_blt");
        assert_eq!(rec.events[2], "bounds None");
        assert_eq!(
            dec.info().bounds,
            Bounds {
                left: 1,
                top: 0,
                right: 9,
                bottom: 0
            }
        );
    }

    #[test]
    fn test_zero_bounds_deltas_reuses_bounds() {
        let mut dec = decoder();
        let mut rec = Recorder::default();
        let data = [0x0D, 0x00, 0x00, 0x01, 0x07, 0x00];
        dec.decode_order(&mut ReadCursor::new(&data), &mut rec).unwrap();

        // BOUNDS | ZERO_BOUNDS_DELTAS: no bounds block on the wire
        let data = [0x25, 0x00];
        let mut cursor = ReadCursor::new(&data);
        dec.decode_order(&mut cursor, &mut rec).unwrap();
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(dec.info().bounds.left, 7);
    }

    #[test]
    fn test_unknown_primary_type_is_violation() {
        let data = [0x09, 0x03, 0x00];
        let mut rec = Recorder::default();
        let err = decoder()
            .decode_order(&mut ReadCursor::new(&data), &mut rec)
            .unwrap_err();
        assert!(matches!(err, DecodeError::ProtocolViolation(_)));
        assert!(rec.events.is_empty());
    }

    #[test]
    fn test_unsupported_primary_type_is_violation() {
        let config = DecoderConfig {
            primary_orders: vec![PrimaryOrderType::DstBlt],
            ..DecoderConfig::default()
        };
        let mut dec = OrderDecoder::new(&config);
        let mut rec = Recorder::default();
        let data = [0x09, 0x0A, 0x00];
        let err = dec
            .decode_order(&mut ReadCursor::new(&data), &mut rec)
            .unwrap_err();
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn test_truncated_primary_not_delivered() {
        let data = [0x09, 0x00, 0x0C, 0x48, 0x00, 0x37];
        let mut rec = Recorder::default();
        let err = decoder()
            .decode_order(&mut ReadCursor::new(&data), &mut rec)
            .unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedInput { .. }));
        assert!(rec.dst_blts.is_empty());
    }

    #[test]
    fn test_altsec_switch_surface() {
        // SwitchSurface (0x00) << 2, STANDARD clear
        let data = [0x00, 0xFF, 0xFF];
        let mut rec = Recorder::default();
        let class = decoder()
            .decode_order(&mut ReadCursor::new(&data), &mut rec)
            .unwrap();
        assert_eq!(class, OrderClass::AltSecondary(0));
        assert_eq!(rec.events, vec!["switch_surface 65535".to_string()]);
    }

    #[test]
    fn test_decode_orders_in_wire_order() {
        let mut data = vec![0x19, 0x00, 0x01, 0x05];
        data.extend_from_slice(&[0x00, 0x01, 0x00]);
        let mut rec = Recorder::default();
        let mut cursor = ReadCursor::new(&data);
        decoder().decode_orders(&mut cursor, 2, &mut rec).unwrap();
        assert_eq!(rec.events, vec!["dst_blt".to_string(), "switch_surface 1".to_string()]);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut dec = decoder();
        let mut rec = Recorder::default();
        let data = [0x19, 0x00, 0x01, 0x05];
        dec.decode_order(&mut ReadCursor::new(&data), &mut rec).unwrap();
        assert_eq!(dec.info().order_type, PrimaryOrderType::DstBlt);
        dec.reset();
        assert_eq!(dec.info(), &OrderInfo::default());
        assert_eq!(dec.primary().dst_blt, DstBltOrder::default());
    }

    #[test]
    fn test_glyph_bitmap_size() {
        assert_eq!(glyph_bitmap_size(8, 8), 8);
        assert_eq!(glyph_bitmap_size(9, 3), 8);
        assert_eq!(glyph_bitmap_size(1, 1), 4);
        assert_eq!(glyph_bitmap_size(0, 5), 0);
    }
}
