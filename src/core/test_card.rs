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

//! Test card signal generator
//!
//! Produces a deterministic frame of colour bars through the same
//! [`PixelRenderer`] calls a real emulation core would make. The bars scroll by
//! one hue per frame so consecutive frames are distinguishable.

use super::error::Result;
use super::reflection::{Collisions, ReflectionStep, VideoElement};
use super::renderer::{PixelReflector, PixelRenderer};
use super::signal::{Signal, SignalFlags, CLOCKS_HBLANK, CLOCKS_PER_SCANLINE, CLOCKS_VISIBLE};
use super::specification::Specification;

/// Number of vertical colour bars
pub const BARS: usize = 8;

/// Colour bar generator
///
/// # Example
///
/// ```
/// use vcsgui::core::specification::{SpecId, Specification};
/// use vcsgui::core::test_card::TestCard;
///
/// let card = TestCard::new(Specification::get(SpecId::Ntsc));
/// // horizontal blank is always black
/// assert_eq!(card.color_at(10, 100), 0);
/// ```
pub struct TestCard {
    spec: &'static Specification,
    top: usize,
    bottom: usize,
    frame: u64,
    reflect: bool,
    scanline: Vec<Signal>,
}

impl TestCard {
    /// Create a generator using the specification's default visible window
    pub fn new(spec: &'static Specification) -> Self {
        Self::with_window(spec, spec.visible_top, spec.visible_bottom)
    }

    /// Create a generator with an explicit visible window (`bottom` exclusive)
    pub fn with_window(spec: &'static Specification, top: usize, bottom: usize) -> Self {
        Self {
            spec,
            top,
            bottom,
            frame: 0,
            reflect: false,
            scanline: Vec::with_capacity(CLOCKS_PER_SCANLINE),
        }
    }

    /// Also emit reflection metadata for every visible pixel
    pub fn with_reflection(mut self, reflect: bool) -> Self {
        self.reflect = reflect;
        self
    }

    pub fn spec(&self) -> &'static Specification {
        self.spec
    }

    /// Visible window as (top, bottom)
    pub fn window(&self) -> (usize, usize) {
        (self.top, self.bottom)
    }

    /// Frames generated so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Colour register value for a position in the current frame
    pub fn color_at(&self, clock: usize, scanline: usize) -> u8 {
        self.color_in_frame(self.frame, clock, scanline)
    }

    /// Colour register value for a position in a given frame
    pub fn color_in_frame(&self, frame: u64, clock: usize, scanline: usize) -> u8 {
        if clock < CLOCKS_HBLANK || scanline < self.top || scanline >= self.bottom {
            return 0;
        }
        let bar = (clock - CLOCKS_HBLANK) * BARS / CLOCKS_VISIBLE;
        let hue = ((bar as u64 + frame) % 16) as u8;
        let lum = ((scanline - self.top) / 24 % 8) as u8;
        (hue << 4) | (lum << 1)
    }

    fn element_at(clock: usize) -> VideoElement {
        match (clock - CLOCKS_HBLANK) * BARS / CLOCKS_VISIBLE {
            0 => VideoElement::Background,
            1 => VideoElement::Playfield,
            2 => VideoElement::Player0,
            3 => VideoElement::Player1,
            4 => VideoElement::Missile0,
            5 => VideoElement::Missile1,
            6 => VideoElement::Ball,
            _ => VideoElement::Playfield,
        }
    }

    /// Generate one complete frame and end it with `new_frame(true)`
    pub fn run_frame<R>(&mut self, renderer: &mut R) -> Result<()>
    where
        R: PixelRenderer + PixelReflector,
    {
        for scanline in 0..self.spec.scanlines_total {
            self.fill_scanline(scanline);

            renderer.new_scanline(scanline)?;
            renderer.updating_pixels(true);
            let written = renderer.set_pixels(&self.scanline, true);
            let reflected = if self.reflect && written.is_ok() {
                self.reflect_scanline(renderer, scanline)
            } else {
                Ok(())
            };
            renderer.updating_pixels(false);
            written?;
            reflected?;
        }

        self.frame += 1;
        renderer.new_frame(true)
    }

    fn fill_scanline(&mut self, scanline: usize) {
        self.scanline.clear();
        let blank = scanline < self.top || scanline >= self.bottom;
        for clock in 0..CLOCKS_PER_SCANLINE {
            let mut flags = SignalFlags::empty();
            if blank {
                flags |= SignalFlags::VBLANK;
            }
            if scanline < 3 {
                flags |= SignalFlags::VSYNC;
            }
            if clock < CLOCKS_HBLANK {
                flags |= SignalFlags::HSYNC;
            }
            let color = self.color_at(clock, scanline);
            self.scanline
                .push(Signal::new(clock as u16, scanline as u16, color).with_flags(flags));
        }
    }

    fn reflect_scanline<R: PixelReflector>(&self, renderer: &mut R, scanline: usize) -> Result<()> {
        if scanline < self.top || scanline >= self.bottom {
            return Ok(());
        }
        for clock in CLOCKS_HBLANK..CLOCKS_PER_SCANLINE {
            let element = Self::element_at(clock);
            let collisions = if element == VideoElement::Ball {
                Collisions::BL_PF
            } else {
                Collisions::empty()
            };
            renderer.reflect(ReflectionStep {
                clock: clock as u16,
                scanline: scanline as u16,
                element,
                collisions,
                hmove: clock < CLOCKS_HBLANK + 8,
                wsync: false,
            })?;
        }
        Ok(())
    }
}
