//! Software back buffer

use hotframe_shared::OffscreenBuffer;

pub const BYTES_PER_PIXEL: usize = 4;

/// 32-bit `0x00RRGGBB` pixels, top row first, no row padding.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn pitch(&self) -> u32 {
        self.width * BYTES_PER_PIXEL as u32
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }

    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Raw view for a native logic call. Valid while `self` is not touched.
    pub fn as_offscreen(&mut self) -> OffscreenBuffer {
        OffscreenBuffer {
            memory: self.pixels.as_mut_ptr().cast(),
            width: self.width as i32,
            height: self.height as i32,
            pitch: self.pitch() as i32,
            bytes_per_pixel: BYTES_PER_PIXEL as i32,
        }
    }
}
