// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Frame buffers and pixel views
//!
//! A [`FrameBuffer`] is one full frame of RGBA pixels. Cropped areas are never
//! copied out; a [`PixelView`] computes row offsets over the owning buffer. The
//! debugger's element and overlay images live in one [`ReflectionPlanes`] arena
//! addressed by plane offset.

use crate::core::specification::{Rgba, BLACK};

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Rectangle within a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crop {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Crop {
    /// Rectangle covering a whole buffer
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// One frame of RGBA pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    /// Create a buffer filled with opaque black
    pub fn new(width: usize, height: usize) -> Self {
        let mut buf = Self {
            width,
            height,
            pixels: vec![0; width * height * BYTES_PER_PIXEL],
        };
        buf.clear();
        buf
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row
    #[inline]
    pub fn stride(&self) -> usize {
        self.width * BYTES_PER_PIXEL
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) * BYTES_PER_PIXEL)
    }

    /// Write a pixel, returning false if the coordinate is outside the buffer
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, color: Rgba) -> bool {
        match self.offset(x, y) {
            Some(o) => {
                self.pixels[o..o + BYTES_PER_PIXEL].copy_from_slice(&color);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        self.offset(x, y).map(|o| {
            let mut c = [0; BYTES_PER_PIXEL];
            c.copy_from_slice(&self.pixels[o..o + BYTES_PER_PIXEL]);
            c
        })
    }

    /// Fill with opaque black
    pub fn clear(&mut self) {
        fill(&mut self.pixels, BLACK);
    }

    /// Fill every pixel after `(x, y)` in raster order
    pub fn clear_after(&mut self, x: usize, y: usize, color: Rgba) {
        let start = match self.offset(x, y) {
            Some(o) => o + BYTES_PER_PIXEL,
            None => return,
        };
        fill(&mut self.pixels[start..], color);
    }

    /// Copy another buffer of the same size; reallocates if the sizes differ
    pub fn copy_from(&mut self, other: &FrameBuffer) {
        if self.width != other.width || self.height != other.height {
            *self = other.clone();
        } else {
            self.pixels.copy_from_slice(&other.pixels);
        }
    }

    /// View of the whole buffer
    pub fn view(&self) -> PixelView<'_> {
        PixelView::new(&self.pixels, self.width, Crop::full(self.width, self.height))
    }

    /// View of a rectangle, clamped to the buffer
    pub fn cropped(&self, crop: Crop) -> PixelView<'_> {
        PixelView::new(&self.pixels, self.width, crop)
    }
}

fn fill(bytes: &mut [u8], color: Rgba) {
    for px in bytes.chunks_exact_mut(BYTES_PER_PIXEL) {
        px.copy_from_slice(&color);
    }
}

/// Read-only rectangle over pixel storage
///
/// # Example
///
/// ```
/// use vcsgui::frontend::screen::{Crop, FrameBuffer};
///
/// let mut buf = FrameBuffer::new(8, 8);
/// buf.set(3, 4, [1, 2, 3, 255]);
/// let view = buf.cropped(Crop { x: 2, y: 4, width: 4, height: 2 });
/// assert_eq!(view.get(1, 0), Some([1, 2, 3, 255]));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    bytes: &'a [u8],
    buffer_width: usize,
    crop: Crop,
}

impl<'a> PixelView<'a> {
    pub(crate) fn new(bytes: &'a [u8], buffer_width: usize, crop: Crop) -> Self {
        let buffer_height = if buffer_width == 0 {
            0
        } else {
            bytes.len() / (buffer_width * BYTES_PER_PIXEL)
        };
        let x = crop.x.min(buffer_width);
        let y = crop.y.min(buffer_height);
        let crop = Crop {
            x,
            y,
            width: crop.width.min(buffer_width - x),
            height: crop.height.min(buffer_height - y),
        };
        Self {
            bytes,
            buffer_width,
            crop,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.crop.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.crop.height
    }

    /// The rectangle this view covers in its buffer
    pub fn crop(&self) -> Crop {
        self.crop
    }

    /// Pixel bytes of one row of the view
    pub fn row(&self, row: usize) -> &'a [u8] {
        debug_assert!(row < self.crop.height);
        let start = ((self.crop.y + row) * self.buffer_width + self.crop.x) * BYTES_PER_PIXEL;
        &self.bytes[start..start + self.crop.width * BYTES_PER_PIXEL]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.crop.width || y >= self.crop.height {
            return None;
        }
        let row = self.row(y);
        let o = x * BYTES_PER_PIXEL;
        let mut c = [0; BYTES_PER_PIXEL];
        c.copy_from_slice(&row[o..o + BYTES_PER_PIXEL]);
        Some(c)
    }

    /// Bytes needed to hold the view tightly packed
    pub fn len_bytes(&self) -> usize {
        self.crop.width * self.crop.height * BYTES_PER_PIXEL
    }

    /// Copy the view into `dst`, tightly packed, resizing `dst` as needed
    pub fn copy_into(&self, dst: &mut Vec<u8>) {
        dst.clear();
        dst.reserve(self.len_bytes());
        for row in 0..self.crop.height {
            dst.extend_from_slice(self.row(row));
        }
    }
}

/// Debugger image layers sharing one allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Each pixel coloured by the video element that drew it
    Elements,
    /// Highlights for the active overlay, transparent elsewhere
    Overlay,
}

/// Transparent, used for overlay pixels the overlay does not mark
pub const CLEAR_OVERLAY: Rgba = [0, 0, 0, 0];

/// Element and overlay images stored back to back in one arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionPlanes {
    width: usize,
    height: usize,
    arena: Vec<u8>,
}

impl ReflectionPlanes {
    pub fn new(width: usize, height: usize) -> Self {
        let mut planes = Self {
            width,
            height,
            arena: vec![0; 2 * width * height * BYTES_PER_PIXEL],
        };
        planes.clear();
        planes
    }

    #[inline]
    fn plane_len(&self) -> usize {
        self.width * self.height * BYTES_PER_PIXEL
    }

    #[inline]
    fn plane_offset(&self, layer: Layer) -> usize {
        match layer {
            Layer::Elements => 0,
            Layer::Overlay => self.plane_len(),
        }
    }

    fn plane(&self, layer: Layer) -> &[u8] {
        let start = self.plane_offset(layer);
        &self.arena[start..start + self.plane_len()]
    }

    fn plane_mut(&mut self, layer: Layer) -> &mut [u8] {
        let start = self.plane_offset(layer);
        let len = self.plane_len();
        &mut self.arena[start..start + len]
    }

    fn blank(layer: Layer) -> Rgba {
        match layer {
            Layer::Elements => BLACK,
            Layer::Overlay => CLEAR_OVERLAY,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Write a pixel in one layer; coordinates outside the planes are ignored
    pub fn set(&mut self, layer: Layer, x: usize, y: usize, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let o = (y * self.width + x) * BYTES_PER_PIXEL;
        self.plane_mut(layer)[o..o + BYTES_PER_PIXEL].copy_from_slice(&color);
    }

    pub fn get(&self, layer: Layer, x: usize, y: usize) -> Option<Rgba> {
        self.view(layer).get(x, y)
    }

    pub fn clear(&mut self) {
        for layer in [Layer::Elements, Layer::Overlay] {
            fill(self.plane_mut(layer), Self::blank(layer));
        }
    }

    /// Blank every pixel after `(x, y)` in raster order, in both layers
    pub fn clear_after(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let start = (y * self.width + x + 1) * BYTES_PER_PIXEL;
        for layer in [Layer::Elements, Layer::Overlay] {
            fill(&mut self.plane_mut(layer)[start..], Self::blank(layer));
        }
    }

    pub fn copy_from(&mut self, other: &ReflectionPlanes) {
        if self.width != other.width || self.height != other.height {
            *self = other.clone();
        } else {
            self.arena.copy_from_slice(&other.arena);
        }
    }

    pub fn view(&self, layer: Layer) -> PixelView<'_> {
        PixelView::new(
            self.plane(layer),
            self.width,
            Crop::full(self.width, self.height),
        )
    }
}
