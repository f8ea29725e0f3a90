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

//! Reflection metadata
//!
//! Reflection is the per-pixel debug annotation the emulation core produces
//! alongside the picture: which video element drew the pixel, which collision
//! latches were set and whether HMOVE or WSYNC were in effect. The debugger
//! renders it as an "elements" image and as overlays on top of the picture.

use super::specification::Rgba;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The video element responsible for a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VideoElement {
    #[default]
    Background,
    Ball,
    Playfield,
    Player0,
    Player1,
    Missile0,
    Missile1,
}

impl VideoElement {
    /// Fixed colour used for the element in the debugger's elements view
    pub fn debug_color(self) -> Rgba {
        match self {
            VideoElement::Background => [0x11, 0x11, 0x11, 0xff],
            VideoElement::Ball => [0xff, 0xff, 0xff, 0xff],
            VideoElement::Playfield => [0x74, 0x4d, 0x9e, 0xff],
            VideoElement::Player0 => [0xd2, 0x3b, 0x3b, 0xff],
            VideoElement::Player1 => [0x3b, 0x8e, 0xd2, 0xff],
            VideoElement::Missile0 => [0xe8, 0x9c, 0x4a, 0xff],
            VideoElement::Missile1 => [0x4a, 0xe8, 0xc6, 0xff],
        }
    }
}

bitflags! {
    /// Collision latches active at the moment a pixel was drawn
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Collisions: u16 {
        const M0_P1 = 1 << 0;
        const M0_P0 = 1 << 1;
        const M1_P0 = 1 << 2;
        const M1_P1 = 1 << 3;
        const P0_PF = 1 << 4;
        const P0_BL = 1 << 5;
        const P1_PF = 1 << 6;
        const P1_BL = 1 << 7;
        const M0_PF = 1 << 8;
        const M0_BL = 1 << 9;
        const M1_PF = 1 << 10;
        const M1_BL = 1 << 11;
        const BL_PF = 1 << 12;
        const P0_P1 = 1 << 13;
        const M0_M1 = 1 << 14;
    }
}

/// Debug metadata for one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReflectionStep {
    /// Horizontal position in colour clocks, including horizontal blank
    pub clock: u16,
    /// Scanline number from the top of the frame
    pub scanline: u16,
    pub element: VideoElement,
    pub collisions: Collisions,
    /// HMOVE was in progress
    pub hmove: bool,
    /// The CPU was halted by WSYNC
    pub wsync: bool,
}

/// Debug overlay drawn on top of the picture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overlay {
    #[default]
    None,
    Wsync,
    Collisions,
    Hmove,
}

impl Overlay {
    pub const ALL: [Overlay; 4] = [
        Overlay::None,
        Overlay::Wsync,
        Overlay::Collisions,
        Overlay::Hmove,
    ];

    /// Overlay colour for a reflected pixel, if the overlay marks it
    pub fn color_for(self, step: &ReflectionStep) -> Option<Rgba> {
        match self {
            Overlay::None => None,
            Overlay::Wsync => step.wsync.then_some([0x2a, 0x3f, 0xbf, 0xc0]),
            Overlay::Collisions => (!step.collisions.is_empty()).then_some([0xe0, 0x30, 0x30, 0xc0]),
            Overlay::Hmove => step.hmove.then_some([0x30, 0xc0, 0x50, 0xc0]),
        }
    }

    /// The overlay following this one, wrapping round
    pub fn next(self) -> Overlay {
        match self {
            Overlay::None => Overlay::Wsync,
            Overlay::Wsync => Overlay::Collisions,
            Overlay::Collisions => Overlay::Hmove,
            Overlay::Hmove => Overlay::None,
        }
    }
}

impl FromStr for Overlay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Overlay::None),
            "wsync" => Ok(Overlay::Wsync),
            "collisions" => Ok(Overlay::Collisions),
            "hmove" => Ok(Overlay::Hmove),
            other => Err(format!("unknown overlay: {}", other)),
        }
    }
}
