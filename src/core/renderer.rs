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

//! Capabilities the emulation core drives
//!
//! The television half of the emulation core knows nothing about windows or
//! textures. It pushes its output through these two traits; the front-end
//! implements them on the emulation-thread handle of its screen.

use super::error::Result;
use super::reflection::ReflectionStep;
use super::signal::Signal;
use super::specification::Specification;

/// Sink for the television signal
///
/// All methods are called from the emulation thread.
pub trait PixelRenderer {
    /// Change the frame geometry
    ///
    /// `bottom` is exclusive. Blocks until the change has been applied by the
    /// render thread. Calling it with unchanged arguments does nothing.
    fn resize(&mut self, spec: &'static Specification, top: usize, bottom: usize) -> Result<()>;

    /// End of frame
    ///
    /// `is_stable` reports whether the frame's sync timing was well formed.
    /// May block while the render thread catches up.
    fn new_frame(&mut self, is_stable: bool) -> Result<()>;

    /// Start of a scanline
    fn new_scanline(&mut self, scanline: usize) -> Result<()>;

    /// Bracket a burst of pixel writes
    ///
    /// `true` takes the screen lock until the matching `false`.
    fn updating_pixels(&mut self, updating: bool);

    /// Write one pixel
    ///
    /// `is_current` marks the write as the real-time beam position (as
    /// opposed to a backfill during rewind).
    fn set_pixel(&mut self, signal: Signal, is_current: bool) -> Result<()>;

    /// Write a run of pixels
    fn set_pixels(&mut self, signals: &[Signal], is_current: bool) -> Result<()>;

    /// The emulation has stopped producing pixels
    fn end_rendering(&mut self) -> Result<()>;

    /// Clear the picture without changing geometry
    fn reset(&mut self);
}

/// Sink for per-pixel debug metadata
pub trait PixelReflector {
    fn reflect(&mut self, step: ReflectionStep) -> Result<()>;
}
