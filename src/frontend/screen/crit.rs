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

//! Screen critical state
//!
//! Everything the emulation and render threads share lives in one
//! [`ScreenCrit`] behind one mutex: the ring of frame buffers, the scheduler's
//! indices, the geometry, the stability flag, the reflection grid, the beam
//! cursor and the overlay selection.

use super::frame_buffer::{Crop, FrameBuffer, Layer, ReflectionPlanes, CLEAR_OVERLAY};
use crate::core::error::{GuiError, Result};
use crate::core::reflection::{Overlay, ReflectionStep};
use crate::core::signal::{Signal, CLOCKS_HBLANK, CLOCKS_PER_SCANLINE, CLOCKS_VISIBLE};
use crate::core::specification::{Specification, BLACK};
use crate::frontend::presentation::{Presentation, PresentationGeometry};
use crate::frontend::scheduler::{
    refresh_in_range, FrameScheduler, PlotOutcome, RenderOutcome, ScreenMode,
};

/// Shared screen state, only ever touched with the screen lock held
#[derive(Debug)]
pub struct ScreenCrit {
    spec: &'static Specification,
    top: usize,
    bottom: usize,
    crop: Crop,
    scheduler: FrameScheduler,
    ring: Vec<FrameBuffer>,
    planes: ReflectionPlanes,
    reflection: Vec<Option<ReflectionStep>>,
    is_stable: bool,
    last_x: usize,
    last_y: usize,
    overlay: Overlay,
    generation: u64,
    refresh_rate: Option<f32>,
    frame_seq: u64,
}

/// Check a visible window against a specification (`bottom` exclusive)
pub fn validate_geometry(spec: &Specification, top: usize, bottom: usize) -> Result<()> {
    if top >= bottom || bottom > spec.scanlines_total {
        return Err(GuiError::InvalidGeometry {
            top,
            bottom,
            scanlines: spec.scanlines_total,
        });
    }
    Ok(())
}

impl ScreenCrit {
    /// Allocate the screen for a specification and visible window
    ///
    /// # Errors
    ///
    /// [`GuiError::InvalidGeometry`] if the window does not fit the specification
    pub fn new(
        spec: &'static Specification,
        top: usize,
        bottom: usize,
        ring_len: usize,
        mode: ScreenMode,
        vsync: bool,
    ) -> Result<Self> {
        validate_geometry(spec, top, bottom)?;
        let scheduler = FrameScheduler::new(ring_len, mode, vsync);
        let mut crit = Self {
            spec,
            top,
            bottom,
            crop: Crop::default(),
            ring: Vec::new(),
            planes: ReflectionPlanes::new(0, 0),
            reflection: Vec::new(),
            scheduler,
            is_stable: false,
            last_x: 0,
            last_y: 0,
            overlay: Overlay::None,
            generation: 0,
            refresh_rate: None,
            frame_seq: 0,
        };
        crit.allocate();
        Ok(crit)
    }

    fn width(&self) -> usize {
        CLOCKS_PER_SCANLINE
    }

    fn height(&self) -> usize {
        self.spec.buffer_height()
    }

    fn allocate(&mut self) {
        let (width, height) = (self.width(), self.height());
        self.ring = (0..self.scheduler.ring_len())
            .map(|_| FrameBuffer::new(width, height))
            .collect();
        self.planes = ReflectionPlanes::new(width, height);
        self.reflection = vec![None; width * height];
        self.crop = Crop {
            x: CLOCKS_HBLANK,
            y: self.top,
            width: CLOCKS_VISIBLE,
            height: self.bottom - self.top,
        };
        self.scheduler.reset_indices();
        self.update_pacing();
        self.generation += 1;
    }

    fn update_pacing(&mut self) {
        let in_range = refresh_in_range(self.refresh_rate, self.spec.frames_per_second);
        self.scheduler.set_in_range(in_range);
    }

    /// Whether the screen already has this geometry
    pub fn geometry_matches(&self, spec: &Specification, top: usize, bottom: usize) -> bool {
        self.spec == spec && self.top == top && self.bottom == bottom
    }

    /// Change the geometry, reallocating every buffer if it differs
    ///
    /// Returns `Ok(true)` if the screen was reallocated. Unchanged parameters
    /// leave every buffer untouched.
    pub fn set_geometry(&mut self, spec: &'static Specification, top: usize, bottom: usize) -> Result<bool> {
        validate_geometry(spec, top, bottom)?;
        if self.geometry_matches(spec, top, bottom) {
            return Ok(false);
        }
        self.spec = spec;
        self.top = top;
        self.bottom = bottom;
        self.allocate();
        log::info!(
            "Screen resized: {} scanlines {}..{} ({}x{}, {} slots)",
            spec.id,
            top,
            bottom,
            self.width(),
            self.height(),
            self.ring.len()
        );
        Ok(true)
    }

    pub fn spec(&self) -> &'static Specification {
        self.spec
    }

    /// Visible window as (top, bottom), `bottom` exclusive
    pub fn window(&self) -> (usize, usize) {
        (self.top, self.bottom)
    }

    pub fn crop(&self) -> Crop {
        self.crop
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    /// Most recent real-time beam position
    pub fn cursor(&self) -> (usize, usize) {
        (self.last_x, self.last_y)
    }

    /// Frames completed since creation
    pub fn frame_seq(&self) -> u64 {
        self.frame_seq
    }

    pub fn geometry(&self) -> PresentationGeometry {
        PresentationGeometry {
            spec: self.spec.id,
            width: self.width(),
            height: self.height(),
            crop: self.crop,
            frames_per_second: self.spec.frames_per_second,
            generation: self.generation,
        }
    }

    /// Frame buffer at a ring slot
    pub fn slot(&self, index: usize) -> Option<&FrameBuffer> {
        self.ring.get(index)
    }

    /// Reflection recorded at a coordinate
    pub fn reflection_at(&self, x: usize, y: usize) -> Option<ReflectionStep> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.reflection[y * self.width() + x]
    }

    /// Write one signal into the plot slot
    ///
    /// Out of range coordinates are dropped. Vertical blank is always black.
    #[inline]
    pub fn plot(&mut self, signal: &Signal, is_current: bool) {
        let (x, y) = (signal.clock as usize, signal.scanline as usize);
        let color = if signal.is_vblank() {
            BLACK
        } else {
            self.spec.decode(signal.color)
        };
        let slot = self.scheduler.plot_index();
        if !self.ring[slot].set(x, y, color) {
            return;
        }
        if is_current {
            self.last_x = x;
            self.last_y = y;
        }
    }

    /// Record reflection metadata for a coordinate
    pub fn reflect(&mut self, step: ReflectionStep) {
        let (x, y) = (step.clock as usize, step.scanline as usize);
        if x >= self.width() || y >= self.height() {
            return;
        }
        let i = y * self.width() + x;
        self.reflection[i] = Some(step);
        self.planes.set(Layer::Elements, x, y, step.element.debug_color());
        let highlight = self.overlay.color_for(&step).unwrap_or(CLEAR_OVERLAY);
        self.planes.set(Layer::Overlay, x, y, highlight);
    }

    /// End of frame
    ///
    /// In debug mode the reflection after the beam position belongs to the
    /// previous frame and is cleared.
    pub fn new_frame(&mut self, is_stable: bool) -> PlotOutcome {
        self.is_stable = is_stable;
        self.frame_seq += 1;
        if self.scheduler.mode() == ScreenMode::Debug {
            self.clear_reflection_after(self.last_x, self.last_y);
        }
        let outcome = self.scheduler.advance_plot();
        log::trace!(
            "Frame {} complete: plot {} render {} ({:?})",
            self.frame_seq,
            self.scheduler.plot_index(),
            self.scheduler.render_index(),
            outcome
        );
        outcome
    }

    fn clear_reflection_after(&mut self, x: usize, y: usize) {
        let start = y * self.width() + x + 1;
        if start < self.reflection.len() {
            self.reflection[start..].fill(None);
        }
        self.planes.clear_after(x, y);
    }

    /// Choose the slot to present on this tick
    pub fn advance_render(&mut self) -> RenderOutcome {
        self.scheduler.advance_render()
    }

    /// Clear every frame and the reflection without changing geometry
    pub fn reset(&mut self) {
        for buffer in &mut self.ring {
            buffer.clear();
        }
        self.planes.clear();
        self.reflection.fill(None);
        self.is_stable = false;
        self.last_x = 0;
        self.last_y = 0;
    }

    /// Switch between play and debug presentation
    pub fn set_mode(&mut self, mode: ScreenMode) -> bool {
        let changed = self.scheduler.set_mode(mode);
        if changed {
            log::info!("Screen mode: {}", mode);
        }
        changed
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.scheduler.set_vsync(vsync);
    }

    /// Record the display refresh rate, if known
    pub fn set_refresh_rate(&mut self, refresh_rate: Option<f32>) {
        self.refresh_rate = refresh_rate;
        self.update_pacing();
        if !self.scheduler.pacing_active() && self.scheduler.vsync() {
            log::warn!(
                "Display refresh {:?}Hz cannot keep up with {}Hz, pacing disabled",
                refresh_rate,
                self.spec.frames_per_second
            );
        }
    }

    /// Select the overlay and recolour it from the reflection grid
    pub fn set_overlay(&mut self, overlay: Overlay) {
        if self.overlay == overlay {
            return;
        }
        self.overlay = overlay;
        let width = self.width();
        for (i, step) in self.reflection.iter().enumerate() {
            let color = step
                .as_ref()
                .and_then(|s| overlay.color_for(s))
                .unwrap_or(CLEAR_OVERLAY);
            self.planes.set(Layer::Overlay, i % width, i / width, color);
        }
    }

    /// Copy the current render slot out for presentation
    ///
    /// # Arguments
    ///
    /// * `dst` - Presentation reused across ticks
    /// * `with_cursor` - Include the beam position (debug mode only)
    pub fn copy_presentation(&self, dst: &mut Presentation, with_cursor: bool) {
        let mode = self.scheduler.mode();
        let index = self.scheduler.render_index();
        dst.geometry = self.geometry();
        dst.pixels.copy_from(&self.ring[index]);
        if mode == ScreenMode::Debug {
            dst.planes.copy_from(&self.planes);
        }
        dst.mode = mode;
        dst.is_stable = self.is_stable;
        dst.cursor = (with_cursor && mode == ScreenMode::Debug).then_some((self.last_x, self.last_y));
        dst.render_index = index;
        dst.frame_seq = self.frame_seq;
        dst.overlay = self.overlay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reflection::{Collisions, VideoElement};
    use crate::core::signal::SignalFlags;
    use crate::core::specification::SpecId;

    fn ntsc() -> &'static Specification {
        Specification::get(SpecId::Ntsc)
    }

    fn crit(mode: ScreenMode) -> ScreenCrit {
        ScreenCrit::new(ntsc(), 40, 232, 4, mode, true).unwrap()
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        assert!(ScreenCrit::new(ntsc(), 100, 100, 4, ScreenMode::Play, true).is_err());
        assert!(ScreenCrit::new(ntsc(), 10, 263, 4, ScreenMode::Play, true).is_err());
        assert!(ScreenCrit::new(ntsc(), 0, 262, 4, ScreenMode::Play, true).is_ok());
    }

    #[test]
    fn test_crop_follows_window() {
        let c = crit(ScreenMode::Play);
        assert_eq!(
            c.crop(),
            Crop {
                x: 68,
                y: 40,
                width: 160,
                height: 192
            }
        );
        assert_eq!(c.geometry().height, 263);
    }

    #[test]
    fn test_plot_writes_plot_slot_only() {
        let mut c = crit(ScreenMode::Play);
        let plot = c.scheduler().plot_index();
        c.plot(&Signal::new(100, 50, 0x0e), true);

        let expected = ntsc().decode(0x0e);
        assert_eq!(c.slot(plot).unwrap().get(100, 50), Some(expected));
        for i in (0..4).filter(|&i| i != plot) {
            assert_eq!(c.slot(i).unwrap().get(100, 50), Some(BLACK));
        }
        assert_eq!(c.cursor(), (100, 50));
    }

    #[test]
    fn test_vblank_is_black_and_backfill_keeps_cursor() {
        let mut c = crit(ScreenMode::Play);
        let plot = c.scheduler().plot_index();
        c.plot(&Signal::new(100, 50, 0x0e).with_flags(SignalFlags::VBLANK), false);
        assert_eq!(c.slot(plot).unwrap().get(100, 50), Some(BLACK));
        assert_eq!(c.cursor(), (0, 0));
    }

    #[test]
    fn test_out_of_range_plot_dropped() {
        let mut c = crit(ScreenMode::Play);
        c.plot(&Signal::new(500, 50, 0x0e), true);
        c.plot(&Signal::new(10, 300, 0x0e), true);
        assert_eq!(c.cursor(), (0, 0));
    }

    #[test]
    fn test_identical_geometry_keeps_buffers() {
        let mut c = crit(ScreenMode::Play);
        let plot = c.scheduler().plot_index();
        c.plot(&Signal::new(100, 50, 0x0e), true);
        let generation = c.generation();

        assert!(!c.set_geometry(ntsc(), 40, 232).unwrap());
        assert_eq!(c.generation(), generation);
        assert_eq!(c.slot(plot).unwrap().get(100, 50), Some(ntsc().decode(0x0e)));
    }

    #[test]
    fn test_changed_geometry_reallocates() {
        let mut c = crit(ScreenMode::Play);
        let generation = c.generation();
        assert!(c
            .set_geometry(Specification::get(SpecId::Pal), 48, 276)
            .unwrap());
        assert_eq!(c.generation(), generation + 1);
        assert_eq!(c.geometry().height, 313);
        assert_eq!(c.crop().height, 228);
        assert_eq!(c.scheduler().plot_index(), 1);
    }

    #[test]
    fn test_reflect_colours_planes() {
        let mut c = crit(ScreenMode::Debug);
        c.set_overlay(Overlay::Collisions);
        let step = ReflectionStep {
            clock: 80,
            scanline: 60,
            element: VideoElement::Player0,
            collisions: Collisions::P0_PF,
            ..Default::default()
        };
        c.reflect(step);
        assert_eq!(c.reflection_at(80, 60), Some(step));
        assert_eq!(
            c.planes.get(Layer::Elements, 80, 60),
            Some(VideoElement::Player0.debug_color())
        );
        assert_eq!(
            c.planes.get(Layer::Overlay, 80, 60),
            Overlay::Collisions.color_for(&step)
        );

        // switching overlay recolours from the grid
        c.set_overlay(Overlay::Wsync);
        assert_eq!(c.planes.get(Layer::Overlay, 80, 60), Some(CLEAR_OVERLAY));
    }

    #[test]
    fn test_debug_new_frame_clears_stale_reflection() {
        let mut c = crit(ScreenMode::Debug);
        for (clock, scanline) in [(80u16, 60u16), (90, 70)] {
            c.reflect(ReflectionStep {
                clock,
                scanline,
                element: VideoElement::Ball,
                ..Default::default()
            });
        }
        c.plot(&Signal::new(85, 60, 0x0e), true);
        assert_eq!(c.new_frame(true), PlotOutcome::Pinned);

        assert!(c.reflection_at(80, 60).is_some());
        assert!(c.reflection_at(90, 70).is_none());
        assert_eq!(c.planes.get(Layer::Elements, 90, 70), Some(BLACK));
    }

    #[test]
    fn test_reset_clears_pixels_and_reflection() {
        let mut c = crit(ScreenMode::Play);
        let plot = c.scheduler().plot_index();
        c.plot(&Signal::new(100, 50, 0x0e), true);
        c.reflect(ReflectionStep {
            clock: 100,
            scanline: 50,
            ..Default::default()
        });
        let generation = c.generation();

        c.reset();
        assert_eq!(c.slot(plot).unwrap().get(100, 50), Some(BLACK));
        assert!(c.reflection_at(100, 50).is_none());
        assert_eq!(c.generation(), generation);
    }

    #[test]
    fn test_slow_display_disables_pacing() {
        let mut c = crit(ScreenMode::Play);
        assert!(c.scheduler().pacing_active());
        c.set_refresh_rate(Some(30.0));
        assert!(!c.scheduler().pacing_active());
        c.set_refresh_rate(None);
        assert!(c.scheduler().pacing_active());
    }

    #[test]
    fn test_copy_presentation_cursor_only_in_debug() {
        let mut c = crit(ScreenMode::Play);
        c.plot(&Signal::new(100, 50, 0x0e), true);
        let mut p = Presentation::new(c.geometry());
        c.copy_presentation(&mut p, true);
        assert_eq!(p.cursor(), None);

        c.set_mode(ScreenMode::Debug);
        c.copy_presentation(&mut p, true);
        assert_eq!(p.cursor(), Some((100, 50)));
        c.copy_presentation(&mut p, false);
        assert_eq!(p.cursor(), None);
    }
}
