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

//! Television signal attributes
//!
//! The emulation core describes every colour clock it generates as a [`Signal`]:
//! where on the screen the beam is, which colour register value is being output
//! and the state of the sync/blank lines.

use bitflags::bitflags;

/// Colour clocks in one scanline (horizontal blank plus visible area)
pub const CLOCKS_PER_SCANLINE: usize = 228;

/// Colour clocks of horizontal blank at the start of each scanline
pub const CLOCKS_HBLANK: usize = 68;

/// Visible colour clocks in one scanline
pub const CLOCKS_VISIBLE: usize = CLOCKS_PER_SCANLINE - CLOCKS_HBLANK;

bitflags! {
    /// Sync and blank lines accompanying a signal
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SignalFlags: u8 {
        const VSYNC = 1 << 0;
        const VBLANK = 1 << 1;
        const CBURST = 1 << 2;
        const HSYNC = 1 << 3;
    }
}

/// One colour clock of television signal
///
/// # Example
///
/// ```
/// use vcsgui::core::signal::{Signal, SignalFlags};
///
/// let signal = Signal::new(100, 50, 0x1e).with_flags(SignalFlags::VBLANK);
/// assert!(signal.is_vblank());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signal {
    /// Horizontal position in colour clocks, including horizontal blank
    pub clock: u16,
    /// Scanline number from the top of the frame
    pub scanline: u16,
    /// Colour register value (hue in the upper nibble, luminance in bits 1-3)
    pub color: u8,
    /// Sync and blank state
    pub flags: SignalFlags,
}

impl Signal {
    /// Create a signal with no sync or blank flags set
    pub const fn new(clock: u16, scanline: u16, color: u8) -> Self {
        Self {
            clock,
            scanline,
            color,
            flags: SignalFlags::empty(),
        }
    }

    /// Replace the sync/blank flags
    pub const fn with_flags(mut self, flags: SignalFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn is_vblank(&self) -> bool {
        self.flags.contains(SignalFlags::VBLANK)
    }

    #[inline]
    pub fn is_vsync(&self) -> bool {
        self.flags.contains(SignalFlags::VSYNC)
    }

    /// Whether the clock falls inside horizontal blank
    #[inline]
    pub fn in_hblank(&self) -> bool {
        (self.clock as usize) < CLOCKS_HBLANK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_clocks() {
        assert_eq!(CLOCKS_VISIBLE, 160);
    }

    #[test]
    fn test_signal_flags() {
        let signal = Signal::new(10, 3, 0x0e);
        assert!(!signal.is_vblank());
        assert!(!signal.is_vsync());
        assert!(signal.in_hblank());

        let blanked = signal.with_flags(SignalFlags::VBLANK | SignalFlags::VSYNC);
        assert!(blanked.is_vblank());
        assert!(blanked.is_vsync());
        assert_eq!(blanked.color, 0x0e);
    }

    #[test]
    fn test_visible_signal_not_in_hblank() {
        let signal = Signal::new(CLOCKS_HBLANK as u16, 0, 0);
        assert!(!signal.in_hblank());
    }
}
