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

//! Television specifications
//!
//! A specification fixes the frame geometry (total scanlines, default visible
//! window), the nominal refresh rate and the colour decode table used to turn a
//! colour register value into RGBA.
//!
//! # Example
//!
//! ```
//! use vcsgui::core::specification::{SpecId, Specification};
//!
//! let ntsc = Specification::get(SpecId::Ntsc);
//! assert_eq!(ntsc.scanlines_total, 262);
//! assert_eq!(ntsc.decode(0x00), [0, 0, 0, 255]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Packed RGBA colour, one byte per channel
pub type Rgba = [u8; 4];

/// Opaque black
pub const BLACK: Rgba = [0, 0, 0, 255];

/// Number of distinct colours a colour register can select
pub const PALETTE_SIZE: usize = 128;

/// Television specification identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpecId {
    #[default]
    Ntsc,
    Pal,
    #[serde(rename = "PAL-M")]
    PalM,
    Secam,
}

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpecId::Ntsc => "NTSC",
            SpecId::Pal => "PAL",
            SpecId::PalM => "PAL-M",
            SpecId::Secam => "SECAM",
        };
        f.write_str(name)
    }
}

impl FromStr for SpecId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NTSC" => Ok(SpecId::Ntsc),
            "PAL" => Ok(SpecId::Pal),
            "PAL-M" | "PALM" | "PAL60" => Ok(SpecId::PalM),
            "SECAM" => Ok(SpecId::Secam),
            other => Err(format!("unknown television specification: {}", other)),
        }
    }
}

/// Frame geometry, refresh rate and colour decoding for one television standard
#[derive(Debug)]
pub struct Specification {
    pub id: SpecId,
    /// Scanlines in a complete frame
    pub scanlines_total: usize,
    /// First scanline of the default visible window
    pub visible_top: usize,
    /// Scanline after the last one of the default visible window
    pub visible_bottom: usize,
    /// Nominal frame rate
    pub frames_per_second: f32,
    palette: [Rgba; PALETTE_SIZE],
}

static NTSC: LazyLock<Specification> = LazyLock::new(|| Specification {
    id: SpecId::Ntsc,
    scanlines_total: 262,
    visible_top: 40,
    visible_bottom: 232,
    frames_per_second: 60.0,
    palette: ntsc_palette(),
});

static PAL: LazyLock<Specification> = LazyLock::new(|| Specification {
    id: SpecId::Pal,
    scanlines_total: 312,
    visible_top: 48,
    visible_bottom: 276,
    frames_per_second: 50.0,
    palette: pal_palette(),
});

static PAL_M: LazyLock<Specification> = LazyLock::new(|| Specification {
    id: SpecId::PalM,
    scanlines_total: 262,
    visible_top: 40,
    visible_bottom: 232,
    frames_per_second: 60.0,
    palette: pal_palette(),
});

static SECAM: LazyLock<Specification> = LazyLock::new(|| Specification {
    id: SpecId::Secam,
    scanlines_total: 312,
    visible_top: 48,
    visible_bottom: 276,
    frames_per_second: 50.0,
    palette: secam_palette(),
});

impl Specification {
    /// Look up the specification for an identifier
    pub fn get(id: SpecId) -> &'static Specification {
        match id {
            SpecId::Ntsc => &NTSC,
            SpecId::Pal => &PAL,
            SpecId::PalM => &PAL_M,
            SpecId::Secam => &SECAM,
        }
    }

    /// Height of a frame buffer for this specification (one guard line extra)
    #[inline]
    pub fn buffer_height(&self) -> usize {
        self.scanlines_total + 1
    }

    /// Decode a colour register value
    ///
    /// Bit 0 of the register is not connected and is ignored.
    #[inline]
    pub fn decode(&self, color: u8) -> Rgba {
        self.palette[(color >> 1) as usize & (PALETTE_SIZE - 1)]
    }
}

impl PartialEq for Specification {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Specification {}

// Luminance steps for coloured entries start above black; hue 0 is a pure
// grey ramp starting at black.
const GREY_STEP: f32 = 0.925 / 7.0;
const CHROMA_LUMA_BASE: f32 = 0.2;
const CHROMA_LUMA_STEP: f32 = 0.75 / 7.0;
const SATURATION: f32 = 0.2;

const NTSC_PHASE_START: f32 = 180.0;
const NTSC_PHASE_STEP: f32 = 25.7;

const PAL_PHASE_START: f32 = 100.0;
const PAL_PHASE_STEP: f32 = 30.0;

fn luma(hue_is_grey: bool, lum: usize) -> f32 {
    if hue_is_grey {
        lum as f32 * GREY_STEP
    } else {
        CHROMA_LUMA_BASE + lum as f32 * CHROMA_LUMA_STEP
    }
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn ntsc_palette() -> [Rgba; PALETTE_SIZE] {
    let mut palette = [BLACK; PALETTE_SIZE];
    for (idx, entry) in palette.iter_mut().enumerate() {
        let hue = idx >> 3;
        let lum = idx & 7;
        let y = luma(hue == 0, lum);
        let (i, q) = if hue == 0 {
            (0.0, 0.0)
        } else {
            let angle = (NTSC_PHASE_START + (hue - 1) as f32 * NTSC_PHASE_STEP).to_radians();
            (SATURATION * angle.cos(), SATURATION * angle.sin())
        };
        let r = y + 0.956 * i + 0.621 * q;
        let g = y - 0.272 * i - 0.647 * q;
        let b = y - 1.106 * i + 1.703 * q;
        *entry = [to_byte(r), to_byte(g), to_byte(b), 255];
    }
    palette
}

fn pal_palette() -> [Rgba; PALETTE_SIZE] {
    let mut palette = [BLACK; PALETTE_SIZE];
    for (idx, entry) in palette.iter_mut().enumerate() {
        let hue = idx >> 3;
        let lum = idx & 7;
        // hues 0, 1, 14 and 15 carry no colour on PAL machines
        let grey = matches!(hue, 0 | 1 | 14 | 15);
        let y = luma(grey, lum);
        let (u, v) = if grey {
            (0.0, 0.0)
        } else {
            let angle = (PAL_PHASE_START + (hue - 2) as f32 * PAL_PHASE_STEP).to_radians();
            (SATURATION * angle.cos(), SATURATION * angle.sin())
        };
        let r = y + 1.140 * v;
        let g = y - 0.395 * u - 0.581 * v;
        let b = y + 2.032 * u;
        *entry = [to_byte(r), to_byte(g), to_byte(b), 255];
    }
    palette
}

fn secam_palette() -> [Rgba; PALETTE_SIZE] {
    const COLORS: [Rgba; 8] = [
        [0x00, 0x00, 0x00, 0xff],
        [0x21, 0x21, 0xff, 0xff],
        [0xf0, 0x3c, 0x79, 0xff],
        [0xff, 0x50, 0xff, 0xff],
        [0x7f, 0xff, 0x50, 0xff],
        [0x7f, 0xff, 0xff, 0xff],
        [0xff, 0xff, 0x3f, 0xff],
        [0xff, 0xff, 0xff, 0xff],
    ];
    let mut palette = [BLACK; PALETTE_SIZE];
    for (idx, entry) in palette.iter_mut().enumerate() {
        *entry = COLORS[idx & 7];
    }
    palette
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry() {
        let ntsc = Specification::get(SpecId::Ntsc);
        assert_eq!(ntsc.buffer_height(), 263);
        assert_eq!(ntsc.visible_bottom - ntsc.visible_top, 192);

        let pal = Specification::get(SpecId::Pal);
        assert_eq!(pal.scanlines_total, 312);
        assert_eq!(pal.visible_bottom - pal.visible_top, 228);
    }

    #[test]
    fn test_black_and_white() {
        for id in [SpecId::Ntsc, SpecId::Pal, SpecId::PalM, SpecId::Secam] {
            let spec = Specification::get(id);
            assert_eq!(spec.decode(0x00), BLACK, "{}", id);
            // bit 0 is ignored
            assert_eq!(spec.decode(0x01), BLACK, "{}", id);
            let white = spec.decode(0x0e);
            assert!(white[0] > 200 && white[1] > 200 && white[2] > 200, "{}", id);
        }
    }

    #[test]
    fn test_grey_ramp_is_neutral() {
        let ntsc = Specification::get(SpecId::Ntsc);
        for lum in 0..8u8 {
            let c = ntsc.decode(lum << 1);
            assert_eq!(c[0], c[1]);
            assert_eq!(c[1], c[2]);
        }
    }

    #[test]
    fn test_ntsc_hues_are_coloured() {
        let ntsc = Specification::get(SpecId::Ntsc);
        let c = ntsc.decode(0x48);
        assert!(c[0] != c[1] || c[1] != c[2]);
    }

    #[test]
    fn test_secam_ignores_hue() {
        let secam = Specification::get(SpecId::Secam);
        assert_eq!(secam.decode(0x02), secam.decode(0xf2));
    }

    #[test]
    fn test_spec_id_parse() {
        assert_eq!("ntsc".parse::<SpecId>(), Ok(SpecId::Ntsc));
        assert_eq!("PAL-M".parse::<SpecId>(), Ok(SpecId::PalM));
        assert_eq!("Secam".parse::<SpecId>(), Ok(SpecId::Secam));
        assert!("vhs".parse::<SpecId>().is_err());
    }

    #[test]
    fn test_spec_equality_by_id() {
        assert_eq!(
            Specification::get(SpecId::Pal),
            Specification::get(SpecId::Pal)
        );
        assert_ne!(
            Specification::get(SpecId::Pal),
            Specification::get(SpecId::PalM)
        );
    }
}
