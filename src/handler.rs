//! Collaborator interfaces fed by the decoder
//!
//! The decoder owns no caches, codecs or drawing surface. Everything it
//! decodes is handed to an [`UpdateHandler`], which is any type that
//! implements the three traits below. Every method has a no-op default so a
//! handler only overrides what it cares about.
//!
//! Records are passed by reference and are only valid for the duration of
//! the call; borrowed payloads point into the packet being decoded.
//!
//! # Example
//!
//! ```rust,ignore
//! use rdp_updates::handler::{CacheManager, Renderer, SurfaceCodec};
//! use rdp_updates::orders::OpaqueRectOrder;
//!
//! struct Fills(u64);
//!
//! impl Renderer for Fills {
//!     fn opaque_rect(&mut self, _order: &OpaqueRectOrder) {
//!         self.0 += 1;
//!     }
//! }
//! impl CacheManager for Fills {}
//! impl SurfaceCodec for Fills {}
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::trace;

use crate::error::Result;
use crate::orders::{
    Bounds, CacheBitmapOrder, CacheBitmapV2Order, CacheBitmapV3Order, CacheBrushOrder,
    CacheColorTableOrder, CacheGlyphOrder, CacheGlyphV2Order, CreateNineGridBitmapOrder,
    CreateOffscreenBitmapOrder, DrawNineGridOrder, DstBltOrder, EllipseCbOrder, EllipseScOrder,
    FastGlyphOrder, FastIndexOrder, FrameMarkerOrder, GdiPlusCacheOrder, GdiPlusOrder,
    GlyphIndexOrder, LineToOrder, Mem3BltOrder, MemBltOrder, MultiDrawNineGridOrder,
    MultiDstBltOrder, MultiOpaqueRectOrder, MultiPatBltOrder, MultiScrBltOrder, OpaqueRectOrder,
    PatBltOrder, PolygonCbOrder, PolygonScOrder, PolylineOrder, SaveBitmapOrder, ScrBltOrder,
    StreamBitmapFirstOrder, StreamBitmapNextOrder, SwitchSurfaceOrder, WindowOrder,
};
use crate::surface::{SurfaceBitsCommand, SurfaceFrameMarker};
use crate::update::{
    BitmapUpdate, PaletteUpdate, PointerCachedUpdate, PointerColorUpdate, PointerLargeUpdate,
    PointerNewUpdate, PointerPositionUpdate, PointerSystemUpdate,
};

/// Drawing and update callbacks.
#[allow(unused_variables)]
pub trait Renderer {
    /// Start of a fast-path PDU's update list.
    fn begin_paint(&mut self) {}
    /// End of a fast-path PDU's update list.
    fn end_paint(&mut self) {}
    /// Clip subsequent primary orders to `bounds`, or stop clipping on `None`.
    fn set_bounds(&mut self, bounds: Option<&Bounds>) {}

    fn dst_blt(&mut self, order: &DstBltOrder) {}
    fn pat_blt(&mut self, order: &PatBltOrder) {}
    fn scr_blt(&mut self, order: &ScrBltOrder) {}
    fn opaque_rect(&mut self, order: &OpaqueRectOrder) {}
    fn draw_nine_grid(&mut self, order: &DrawNineGridOrder) {}
    fn multi_dst_blt(&mut self, order: &MultiDstBltOrder) {}
    fn multi_pat_blt(&mut self, order: &MultiPatBltOrder) {}
    fn multi_scr_blt(&mut self, order: &MultiScrBltOrder) {}
    fn multi_opaque_rect(&mut self, order: &MultiOpaqueRectOrder) {}
    fn multi_draw_nine_grid(&mut self, order: &MultiDrawNineGridOrder) {}
    fn line_to(&mut self, order: &LineToOrder) {}
    fn polyline(&mut self, order: &PolylineOrder) {}
    fn mem_blt(&mut self, order: &MemBltOrder) {}
    fn mem3_blt(&mut self, order: &Mem3BltOrder) {}
    fn save_bitmap(&mut self, order: &SaveBitmapOrder) {}
    fn glyph_index(&mut self, order: &GlyphIndexOrder) {}
    fn fast_index(&mut self, order: &FastIndexOrder) {}
    fn fast_glyph(&mut self, order: &FastGlyphOrder) {}
    fn polygon_sc(&mut self, order: &PolygonScOrder) {}
    fn polygon_cb(&mut self, order: &PolygonCbOrder) {}
    fn ellipse_sc(&mut self, order: &EllipseScOrder) {}
    fn ellipse_cb(&mut self, order: &EllipseCbOrder) {}

    fn create_offscreen_bitmap(&mut self, order: &CreateOffscreenBitmapOrder) {}
    fn switch_surface(&mut self, order: &SwitchSurfaceOrder) {}
    fn create_nine_grid_bitmap(&mut self, order: &CreateNineGridBitmapOrder) {}
    fn frame_marker(&mut self, order: &FrameMarkerOrder) {}
    fn stream_bitmap_first(&mut self, order: &StreamBitmapFirstOrder<'_>) {}
    fn stream_bitmap_next(&mut self, order: &StreamBitmapNextOrder<'_>) {}
    fn gdiplus_first(&mut self, order: &GdiPlusOrder<'_>) {}
    fn gdiplus_next(&mut self, order: &GdiPlusOrder<'_>) {}
    fn gdiplus_end(&mut self, order: &GdiPlusOrder<'_>) {}
    fn gdiplus_cache_first(&mut self, order: &GdiPlusCacheOrder<'_>) {}
    fn gdiplus_cache_next(&mut self, order: &GdiPlusCacheOrder<'_>) {}
    fn gdiplus_cache_end(&mut self, order: &GdiPlusCacheOrder<'_>) {}
    /// Window orders are passed through undecoded.
    fn window_order(&mut self, order: &WindowOrder<'_>) {}

    /// Surface bits after the codec has run. `pixels` is the codec output.
    fn surface_bits(&mut self, command: &SurfaceBitsCommand<'_>, pixels: &[u8]) {}
    fn surface_frame_marker(&mut self, marker: &SurfaceFrameMarker) {}

    fn synchronize(&mut self) {}
    fn bitmap_update(&mut self, update: &BitmapUpdate<'_>) {}
    fn palette(&mut self, update: &PaletteUpdate) {}

    fn pointer_system(&mut self, update: &PointerSystemUpdate) {}
    fn pointer_position(&mut self, update: &PointerPositionUpdate) {}
    fn pointer_color(&mut self, update: &PointerColorUpdate<'_>) {}
    fn pointer_new(&mut self, update: &PointerNewUpdate<'_>) {}
    fn pointer_cached(&mut self, update: &PointerCachedUpdate) {}
    fn pointer_large(&mut self, update: &PointerLargeUpdate<'_>) {}
}

/// Cache mutation callbacks for secondary orders.
#[allow(unused_variables)]
pub trait CacheManager {
    fn cache_bitmap(&mut self, order: &CacheBitmapOrder<'_>) {}
    fn cache_bitmap_v2(&mut self, order: &CacheBitmapV2Order<'_>) {}
    fn cache_bitmap_v3(&mut self, order: &CacheBitmapV3Order<'_>) {}
    fn cache_color_table(&mut self, order: &CacheColorTableOrder) {}
    fn cache_glyph(&mut self, order: &CacheGlyphOrder) {}
    fn cache_glyph_v2(&mut self, order: &CacheGlyphV2Order) {}
    fn cache_brush(&mut self, order: &CacheBrushOrder) {}
}

/// Codec used to turn surface bits payloads into pixels.
pub trait SurfaceCodec {
    /// Decode the payload of `command`. The default returns it unchanged.
    ///
    /// An error fails the surface command block.
    fn decompress<'a>(&mut self, command: &SurfaceBitsCommand<'a>) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(command.bitmap.data))
    }
}

/// Everything the decoder delivers to.
pub trait UpdateHandler: Renderer + CacheManager + SurfaceCodec {}

impl<T: Renderer + CacheManager + SurfaceCodec + ?Sized> UpdateHandler for T {}

/// Handler that counts what it receives, keyed by record kind.
#[derive(Debug, Default, Clone)]
pub struct UpdateCounter {
    counts: BTreeMap<&'static str, u64>,
}

impl UpdateCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self, kind: &'static str) {
        trace!(kind, "delivered");
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    /// Number of records of `kind` seen so far.
    pub fn count(&self, kind: &str) -> u64 {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    /// Total number of records seen.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Per-kind counts in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.counts.iter().map(|(k, v)| (*k, *v))
    }
}

impl Renderer for UpdateCounter {
    fn dst_blt(&mut self, _: &DstBltOrder) {
        self.bump("dst_blt");
    }
    fn pat_blt(&mut self, _: &PatBltOrder) {
        self.bump("pat_blt");
    }
    fn scr_blt(&mut self, _: &ScrBltOrder) {
        self.bump("scr_blt");
    }
    fn opaque_rect(&mut self, _: &OpaqueRectOrder) {
        self.bump("opaque_rect");
    }
    fn draw_nine_grid(&mut self, _: &DrawNineGridOrder) {
        self.bump("draw_nine_grid");
    }
    fn multi_dst_blt(&mut self, _: &MultiDstBltOrder) {
        self.bump("multi_dst_blt");
    }
    fn multi_pat_blt(&mut self, _: &MultiPatBltOrder) {
        self.bump("multi_pat_blt");
    }
    fn multi_scr_blt(&mut self, _: &MultiScrBltOrder) {
        self.bump("multi_scr_blt");
    }
    fn multi_opaque_rect(&mut self, _: &MultiOpaqueRectOrder) {
        self.bump("multi_opaque_rect");
    }
    fn multi_draw_nine_grid(&mut self, _: &MultiDrawNineGridOrder) {
        self.bump("multi_draw_nine_grid");
    }
    fn line_to(&mut self, _: &LineToOrder) {
        self.bump("line_to");
    }
    fn polyline(&mut self, _: &PolylineOrder) {
        self.bump("polyline");
    }
    fn mem_blt(&mut self, _: &MemBltOrder) {
        self.bump("mem_blt");
    }
    fn mem3_blt(&mut self, _: &Mem3BltOrder) {
        self.bump("mem3_blt");
    }
    fn save_bitmap(&mut self, _: &SaveBitmapOrder) {
        self.bump("save_bitmap");
    }
    fn glyph_index(&mut self, _: &GlyphIndexOrder) {
        self.bump("glyph_index");
    }
    fn fast_index(&mut self, _: &FastIndexOrder) {
        self.bump("fast_index");
    }
    fn fast_glyph(&mut self, _: &FastGlyphOrder) {
        self.bump("fast_glyph");
    }
    fn polygon_sc(&mut self, _: &PolygonScOrder) {
        self.bump("polygon_sc");
    }
    fn polygon_cb(&mut self, _: &PolygonCbOrder) {
        self.bump("polygon_cb");
    }
    fn ellipse_sc(&mut self, _: &EllipseScOrder) {
        self.bump("ellipse_sc");
    }
    fn ellipse_cb(&mut self, _: &EllipseCbOrder) {
        self.bump("ellipse_cb");
    }

    fn create_offscreen_bitmap(&mut self, _: &CreateOffscreenBitmapOrder) {
        self.bump("create_offscreen_bitmap");
    }
    fn switch_surface(&mut self, _: &SwitchSurfaceOrder) {
        self.bump("switch_surface");
    }
    fn create_nine_grid_bitmap(&mut self, _: &CreateNineGridBitmapOrder) {
        self.bump("create_nine_grid_bitmap");
    }
    fn frame_marker(&mut self, _: &FrameMarkerOrder) {
        self.bump("frame_marker");
    }
    fn stream_bitmap_first(&mut self, _: &StreamBitmapFirstOrder<'_>) {
        self.bump("stream_bitmap_first");
    }
    fn stream_bitmap_next(&mut self, _: &StreamBitmapNextOrder<'_>) {
        self.bump("stream_bitmap_next");
    }
    fn gdiplus_first(&mut self, _: &GdiPlusOrder<'_>) {
        self.bump("gdiplus_first");
    }
    fn gdiplus_next(&mut self, _: &GdiPlusOrder<'_>) {
        self.bump("gdiplus_next");
    }
    fn gdiplus_end(&mut self, _: &GdiPlusOrder<'_>) {
        self.bump("gdiplus_end");
    }
    fn gdiplus_cache_first(&mut self, _: &GdiPlusCacheOrder<'_>) {
        self.bump("gdiplus_cache_first");
    }
    fn gdiplus_cache_next(&mut self, _: &GdiPlusCacheOrder<'_>) {
        self.bump("gdiplus_cache_next");
    }
    fn gdiplus_cache_end(&mut self, _: &GdiPlusCacheOrder<'_>) {
        self.bump("gdiplus_cache_end");
    }
    fn window_order(&mut self, _: &WindowOrder<'_>) {
        self.bump("window_order");
    }

    fn surface_bits(&mut self, _: &SurfaceBitsCommand<'_>, _: &[u8]) {
        self.bump("surface_bits");
    }
    fn surface_frame_marker(&mut self, _: &SurfaceFrameMarker) {
        self.bump("surface_frame_marker");
    }

    fn synchronize(&mut self) {
        self.bump("synchronize");
    }
    fn bitmap_update(&mut self, _: &BitmapUpdate<'_>) {
        self.bump("bitmap_update");
    }
    fn palette(&mut self, _: &PaletteUpdate) {
        self.bump("palette");
    }

    fn pointer_system(&mut self, _: &PointerSystemUpdate) {
        self.bump("pointer_system");
    }
    fn pointer_position(&mut self, _: &PointerPositionUpdate) {
        self.bump("pointer_position");
    }
    fn pointer_color(&mut self, _: &PointerColorUpdate<'_>) {
        self.bump("pointer_color");
    }
    fn pointer_new(&mut self, _: &PointerNewUpdate<'_>) {
        self.bump("pointer_new");
    }
    fn pointer_cached(&mut self, _: &PointerCachedUpdate) {
        self.bump("pointer_cached");
    }
    fn pointer_large(&mut self, _: &PointerLargeUpdate<'_>) {
        self.bump("pointer_large");
    }
}

impl CacheManager for UpdateCounter {
    fn cache_bitmap(&mut self, _: &CacheBitmapOrder<'_>) {
        self.bump("cache_bitmap");
    }
    fn cache_bitmap_v2(&mut self, _: &CacheBitmapV2Order<'_>) {
        self.bump("cache_bitmap_v2");
    }
    fn cache_bitmap_v3(&mut self, _: &CacheBitmapV3Order<'_>) {
        self.bump("cache_bitmap_v3");
    }
    fn cache_color_table(&mut self, _: &CacheColorTableOrder) {
        self.bump("cache_color_table");
    }
    fn cache_glyph(&mut self, _: &CacheGlyphOrder) {
        self.bump("cache_glyph");
    }
    fn cache_glyph_v2(&mut self, _: &CacheGlyphV2Order) {
        self.bump("cache_glyph_v2");
    }
    fn cache_brush(&mut self, _: &CacheBrushOrder) {
        self.bump("cache_brush");
    }
}

impl SurfaceCodec for UpdateCounter {}
