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

//! Presentation adapter
//!
//! Once per tick the render thread copies the frame chosen by the scheduler
//! out of the critical section into a [`Presentation`]. Consumers (GPU
//! textures, screenshot writers, tests) implement [`TextureRenderer`] and read
//! whichever [`View`] they need from it. Nothing here decides which ring slot
//! is shown.

use super::scheduler::ScreenMode;
use super::screen::frame_buffer::{Crop, FrameBuffer, Layer, PixelView, ReflectionPlanes, BYTES_PER_PIXEL};
use crate::core::reflection::Overlay;
use crate::core::specification::{Rgba, SpecId};
use std::cell::RefCell;
use std::rc::Rc;

/// Horizontal stretch applied to every pixel when drawn
///
/// Colour clocks are roughly twice as tall as they are wide on a television.
pub const PIXEL_WIDTH: f32 = 2.0;

/// Colour of the beam position marker stamped into copies
pub const CURSOR_COLOR: Rgba = [0xff, 0x00, 0xff, 0xff];

/// Which image a consumer wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    /// Whole frame including blank areas
    Uncropped,
    /// Visible window only
    #[default]
    Cropped,
    /// Debug colours of the element that drew each pixel
    Elements,
    /// Overlay highlights, transparent elsewhere
    Overlay,
}

/// Backing geometry of the presented frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationGeometry {
    pub spec: SpecId,
    /// Width of the full frame in colour clocks
    pub width: usize,
    /// Height of the full frame in scanlines
    pub height: usize,
    /// Visible window within the full frame
    pub crop: Crop,
    pub frames_per_second: f32,
    /// Changes every time the screen is reallocated
    pub generation: u64,
}

impl PresentationGeometry {
    /// Pixel dimensions of a view
    pub fn view_size(&self, view: View) -> (usize, usize) {
        match view {
            View::Cropped => (self.crop.width, self.crop.height),
            View::Uncropped | View::Elements | View::Overlay => (self.width, self.height),
        }
    }
}

/// The frame selected for presentation on the current tick
#[derive(Debug, Clone)]
pub struct Presentation {
    pub(crate) geometry: PresentationGeometry,
    pub(crate) pixels: FrameBuffer,
    pub(crate) planes: ReflectionPlanes,
    pub(crate) mode: ScreenMode,
    pub(crate) is_stable: bool,
    pub(crate) cursor: Option<(usize, usize)>,
    pub(crate) render_index: usize,
    pub(crate) frame_seq: u64,
    pub(crate) overlay: Overlay,
}

impl Presentation {
    pub(crate) fn new(geometry: PresentationGeometry) -> Self {
        Self {
            pixels: FrameBuffer::new(geometry.width, geometry.height),
            planes: ReflectionPlanes::new(geometry.width, geometry.height),
            geometry,
            mode: ScreenMode::Play,
            is_stable: false,
            cursor: None,
            render_index: 0,
            frame_seq: 0,
            overlay: Overlay::None,
        }
    }

    pub fn geometry(&self) -> &PresentationGeometry {
        &self.geometry
    }

    /// Pixel view for a consumer
    ///
    /// The element and overlay views are only refreshed in debug mode.
    pub fn view(&self, view: View) -> PixelView<'_> {
        match view {
            View::Uncropped => self.pixels.view(),
            View::Cropped => self.pixels.cropped(self.geometry.crop),
            View::Elements => self.planes.view(Layer::Elements),
            View::Overlay => self.planes.view(Layer::Overlay),
        }
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    /// Whether the presented frame had well-formed sync timing
    ///
    /// Advisory; the frame is presented either way.
    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    /// Last beam position, set only in debug mode while emulation is halted
    pub fn cursor(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    /// Ring slot the frame was copied from
    pub fn render_index(&self) -> usize {
        self.render_index
    }

    /// Frames completed by the emulation when this copy was taken
    pub fn frame_seq(&self) -> u64 {
        self.frame_seq
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    /// Copy a view tightly packed into `dst`, stamping the cursor if present
    ///
    /// # Arguments
    ///
    /// * `view` - Which image to copy
    /// * `dst` - Destination, resized to fit
    ///
    /// # Returns
    ///
    /// The (width, height) of the copied image
    pub fn copy_into(&self, view: View, dst: &mut Vec<u8>) -> (usize, usize) {
        let pixels = self.view(view);
        pixels.copy_into(dst);
        if let Some(cursor) = self.cursor {
            stamp_cursor(dst, pixels.crop(), cursor);
        }
        (pixels.width(), pixels.height())
    }
}

/// Mark the beam position in a tightly packed copy of `crop`
fn stamp_cursor(dst: &mut [u8], crop: Crop, (x, y): (usize, usize)) {
    if x < crop.x || y < crop.y || x >= crop.x + crop.width || y >= crop.y + crop.height {
        return;
    }
    let o = ((y - crop.y) * crop.width + (x - crop.x)) * BYTES_PER_PIXEL;
    if let Some(px) = dst.get_mut(o..o + BYTES_PER_PIXEL) {
        px.copy_from_slice(&CURSOR_COLOR);
    }
}

/// A consumer of presented frames
///
/// Both methods are called on the render thread, outside the screen lock.
pub trait TextureRenderer {
    /// The backing geometry changed; recreate anything sized from it
    fn resize(&mut self, geometry: &PresentationGeometry);

    /// Copy the presented frame; called once per tick
    fn render(&mut self, frame: &Presentation);
}

impl<T: TextureRenderer + ?Sized> TextureRenderer for Rc<RefCell<T>> {
    fn resize(&mut self, geometry: &PresentationGeometry) {
        self.borrow_mut().resize(geometry);
    }

    fn render(&mut self, frame: &Presentation) {
        self.borrow_mut().render(frame);
    }
}

/// Per-window scale factor and size queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowScale {
    scale: f32,
}

impl WindowScale {
    pub const MIN: f32 = 0.1;

    pub fn new(scale: f32) -> Self {
        Self {
            scale: scale.max(Self::MIN),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.max(Self::MIN);
    }

    /// On-screen size of a view at the current scale
    pub fn display_size(&self, geometry: &PresentationGeometry, view: View) -> (f32, f32) {
        let (w, h) = geometry.view_size(view);
        (w as f32 * PIXEL_WIDTH * self.scale, h as f32 * self.scale)
    }

    /// Largest scale at which a view fits inside `available`
    pub fn scale_to_fit(geometry: &PresentationGeometry, view: View, available: (f32, f32)) -> f32 {
        let (w, h) = geometry.view_size(view);
        if w == 0 || h == 0 {
            return Self::MIN;
        }
        let sx = available.0 / (w as f32 * PIXEL_WIDTH);
        let sy = available.1 / h as f32;
        sx.min(sy).max(Self::MIN)
    }

    /// Set the scale so the view fills `available`
    pub fn fit(&mut self, geometry: &PresentationGeometry, view: View, available: (f32, f32)) {
        self.scale = Self::scale_to_fit(geometry, view, available);
    }
}

impl Default for WindowScale {
    fn default() -> Self {
        Self::new(1.0)
    }
}
