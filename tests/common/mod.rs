//! Test utilities and mocks for rdp-updates
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use std::borrow::Cow;

use rdp_updates::config::DecoderConfig;
use rdp_updates::error::{DecodeError, Result};
use rdp_updates::handler::{CacheManager, Renderer, SurfaceCodec};
use rdp_updates::orders::{
    Bounds, CacheBitmapV2Order, CacheColorTableOrder, DstBltOrder, FrameMarkerOrder,
    OpaqueRectOrder, SwitchSurfaceOrder,
};
use rdp_updates::surface::{SurfaceBitsCommand, SurfaceFrameMarker};
use rdp_updates::update::{PaletteUpdate, PointerPositionUpdate};

/// Everything a [`Recorder`] saw, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeginPaint,
    EndPaint,
    Bounds(Option<Bounds>),
    DstBlt(DstBltOrder),
    OpaqueRect(OpaqueRectOrder),
    SwitchSurface(u16),
    AltFrameMarker(u32),
    CacheColorTable(u8),
    CacheBitmapV2 { cache_index: u32, data: Vec<u8> },
    SurfaceBits { codec_id: u8, pixels: Vec<u8> },
    SurfaceFrameMarker(SurfaceFrameMarker),
    Synchronize,
    Palette(usize),
    PointerPosition(u16, u16),
}

/// Handler that records every callback it cares about.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub codec_calls: usize,
}

impl Recorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Events without the paint brackets
    pub fn records(&self) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| !matches!(e, Event::BeginPaint | Event::EndPaint))
            .cloned()
            .collect()
    }
}

impl Renderer for Recorder {
    fn begin_paint(&mut self) {
        self.events.push(Event::BeginPaint);
    }
    fn end_paint(&mut self) {
        self.events.push(Event::EndPaint);
    }
    fn set_bounds(&mut self, bounds: Option<&Bounds>) {
        self.events.push(Event::Bounds(bounds.copied()));
    }
    fn dst_blt(&mut self, order: &DstBltOrder) {
        self.events.push(Event::DstBlt(order.clone()));
    }
    fn opaque_rect(&mut self, order: &OpaqueRectOrder) {
        self.events.push(Event::OpaqueRect(order.clone()));
    }
    fn switch_surface(&mut self, order: &SwitchSurfaceOrder) {
        self.events.push(Event::SwitchSurface(order.bitmap_id));
    }
    fn frame_marker(&mut self, order: &FrameMarkerOrder) {
        self.events.push(Event::AltFrameMarker(order.action));
    }
    fn surface_bits(&mut self, command: &SurfaceBitsCommand<'_>, pixels: &[u8]) {
        self.events.push(Event::SurfaceBits {
            codec_id: command.bitmap.codec_id,
            pixels: pixels.to_vec(),
        });
    }
    fn surface_frame_marker(&mut self, marker: &SurfaceFrameMarker) {
        self.events.push(Event::SurfaceFrameMarker(*marker));
    }
    fn synchronize(&mut self) {
        self.events.push(Event::Synchronize);
    }
    fn palette(&mut self, update: &PaletteUpdate) {
        self.events.push(Event::Palette(update.entries.len()));
    }
    fn pointer_position(&mut self, update: &PointerPositionUpdate) {
        self.events.push(Event::PointerPosition(update.x, update.y));
    }
}

impl CacheManager for Recorder {
    fn cache_color_table(&mut self, order: &CacheColorTableOrder) {
        self.events.push(Event::CacheColorTable(order.cache_index));
    }
    fn cache_bitmap_v2(&mut self, order: &CacheBitmapV2Order<'_>) {
        self.events.push(Event::CacheBitmapV2 {
            cache_index: order.cache_index,
            data: order.data.to_vec(),
        });
    }
}

impl SurfaceCodec for Recorder {
    /// Codec 3 doubles every byte; anything else passes through.
    fn decompress<'a>(&mut self, command: &SurfaceBitsCommand<'a>) -> Result<Cow<'a, [u8]>> {
        self.codec_calls += 1;
        match command.bitmap.codec_id {
            0 => Ok(Cow::Borrowed(command.bitmap.data)),
            3 => Ok(Cow::Owned(
                command.bitmap.data.iter().map(|b| b.wrapping_mul(2)).collect(),
            )),
            other => Err(DecodeError::Decompression(format!("no codec {}", other))),
        }
    }
}

/// Test configuration builder
pub struct TestConfigBuilder {
    config: DecoderConfig,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        TestConfigBuilder {
            config: DecoderConfig::default(),
        }
    }
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set desktop size
    pub fn desktop(mut self, width: u16, height: u16) -> Self {
        self.config.desktop_width = width;
        self.config.desktop_height = height;
        self
    }

    /// Set the multi-fragment limit
    pub fn multifrag_max(mut self, max: u32) -> Self {
        self.config.multifrag_max_request_size = max;
        self
    }

    /// Set negotiated surface codecs
    pub fn codecs(mut self, codecs: &[u8]) -> Self {
        self.config.surface_codecs = codecs.to_vec();
        self
    }

    /// Build the configuration
    pub fn build(self) -> DecoderConfig {
        self.config
    }
}

/// Builders for wire data
pub mod wire {
    /// Fast-path fragmentation values
    pub const SINGLE: u8 = 0;
    pub const LAST: u8 = 1;
    pub const FIRST: u8 = 2;
    pub const NEXT: u8 = 3;

    /// One update block without compression
    pub fn update(code: u8, fragmentation: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![code | fragmentation << 4];
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// A fast-path PDU around `updates`
    pub fn pdu(updates: &[Vec<u8>]) -> Vec<u8> {
        let body = updates.concat();
        let mut out = vec![0x00];
        if body.len() + 2 < 0x80 {
            out.push((body.len() + 2) as u8);
        } else {
            let total = body.len() + 3;
            out.push(0x80 | (total >> 8) as u8);
            out.push(total as u8);
        }
        out.extend(body);
        out
    }

    /// Orders update payload: count followed by the encoded orders
    pub fn orders(orders: &[Vec<u8>]) -> Vec<u8> {
        let mut out = (orders.len() as u16).to_le_bytes().to_vec();
        for order in orders {
            out.extend_from_slice(order);
        }
        out
    }

    /// Secondary order with the given body
    pub fn secondary(order_type: u8, extra_flags: u16, body: &[u8]) -> Vec<u8> {
        let order_length = (body.len() as u16).wrapping_sub(7);
        let mut out = vec![0x03];
        out.extend_from_slice(&order_length.to_le_bytes());
        out.extend_from_slice(&extra_flags.to_le_bytes());
        out.push(order_type);
        out.extend_from_slice(body);
        out
    }

    /// Cache color table with 256 entries
    pub fn color_table(cache_index: u8) -> Vec<u8> {
        let mut body = vec![cache_index, 0x00, 0x01];
        body.extend(std::iter::repeat(0u8).take(256 * 4));
        secondary(0x01, 0, &body)
    }

    /// Surface bits command with a raw payload
    pub fn surface_bits(rect: [u16; 4], codec: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = 0x0001u16.to_le_bytes().to_vec();
        for v in rect {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&[32, 0, 0, codec]);
        out.extend_from_slice(&rect[2].wrapping_sub(rect[0]).to_le_bytes());
        out.extend_from_slice(&rect[3].wrapping_sub(rect[1]).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Surface frame marker
    pub fn frame_marker(action: u16, frame_id: u32) -> Vec<u8> {
        let mut out = 0x0004u16.to_le_bytes().to_vec();
        out.extend_from_slice(&action.to_le_bytes());
        out.extend_from_slice(&frame_id.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdu_length_encoding() {
        let short = wire::pdu(&[wire::update(3, wire::SINGLE, &[0, 0])]);
        assert_eq!(short[1] as usize, short.len());

        let long = wire::pdu(&[wire::update(3, wire::SINGLE, &[0; 200])]);
        let length = ((long[1] as usize & 0x7F) << 8) | long[2] as usize;
        assert_eq!(length, long.len());
    }

    #[test]
    fn test_config_builder() {
        let config = TestConfigBuilder::new()
            .desktop(640, 480)
            .multifrag_max(100)
            .codecs(&[3])
            .build();

        assert_eq!(config.desktop_width, 640);
        assert_eq!(config.multifrag_max_request_size, 100);
        assert_eq!(config.surface_codecs, vec![3]);
    }
}
