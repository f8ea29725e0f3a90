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

//! Emulation-facing contract
//!
//! Types shared between the emulation core and the front-end: the television
//! signal, specifications, reflection metadata and the renderer capabilities the
//! emulation drives.

pub mod error;
pub mod reflection;
pub mod renderer;
pub mod signal;
pub mod specification;
pub mod test_card;

pub use error::{GuiError, Result};
pub use reflection::{Collisions, Overlay, ReflectionStep, VideoElement};
pub use renderer::{PixelReflector, PixelRenderer};
pub use signal::{Signal, SignalFlags};
pub use specification::{Rgba, SpecId, Specification};
pub use test_card::TestCard;
