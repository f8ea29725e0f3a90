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

//! vcsgui: screen front-end for an Atari 2600 (VCS) emulator
//!
//! This crate moves the television signal produced by an emulation thread
//! onto the screen, keeping the emulation paced against the display without
//! tearing or strobing.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`core`]: the emulation-facing contract (signal, specifications,
//!   reflection metadata, the [`PixelRenderer`](core::PixelRenderer) trait)
//! - [`frontend`]: the screen, its scheduler and the window presenting it
//!
//! # Example
//!
//! ```
//! use vcsgui::core::{SpecId, Specification, TestCard};
//! use vcsgui::frontend::{Core, GuiConfig};
//!
//! let mut core = Core::new(&GuiConfig::default(), None)?;
//! let mut sink = core.screen_sink()?;
//!
//! let mut card = TestCard::new(Specification::get(SpecId::Ntsc));
//! card.run_frame(&mut sink)?;
//! core.tick();
//!
//! assert_eq!(core.presentation().frame_seq(), 1);
//! # Ok::<(), vcsgui::core::GuiError>(())
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, GuiError>`.

pub mod core;
pub mod frontend;

// Re-export commonly used types
pub use core::error::{GuiError, Result};
