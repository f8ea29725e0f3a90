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

//! Frontend module
//!
//! Screen synchronization between an emulation thread and a render thread,
//! and the window that presents the result.
//!
//! # Architecture
//!
//! - [`screen`]: the ring of frame buffers and the emulation thread's sink
//! - [`scheduler`]: plot and render indices, backpressure and rollback
//! - [`rendezvous`]: where a lapping emulation thread waits for the render thread
//! - [`service`]: requests marshalled onto the render thread
//! - [`polling`]: how long the render loop may sleep
//! - [`presentation`]: the frame handed to texture consumers
//! - [`Core`]: the render side, one tick at a time
//! - [`Application`]: winit window and wgpu presentation around a core
//!
//! # Example
//!
//! ```no_run
//! use winit::event_loop::EventLoop;
//! use vcsgui::frontend::{AppEvent, Application, GuiConfig};
//!
//! let event_loop = EventLoop::<AppEvent>::with_user_event().build().unwrap();
//! let mut app = Application::new(GuiConfig::default(), event_loop.create_proxy());
//! event_loop.run_app(&mut app).unwrap();
//! ```

pub mod app;
pub mod config;
pub mod emulation;
pub mod frame_timer;
pub mod gui;
pub mod polling;
pub mod presentation;
pub mod renderer;
pub mod rendezvous;
pub mod scheduler;
pub mod screen;
pub mod service;
#[cfg(test)]
mod tests;

pub use app::{AppEvent, Application};
pub use config::GuiConfig;
pub use emulation::EmulationThread;
pub use frame_timer::{FrameTimer, RateMeter};
pub use gui::{Core, FeatureRequest};
pub use polling::{EmulationState, PollingClock};
pub use presentation::{Presentation, TextureRenderer, View};
pub use renderer::RenderContext;
pub use scheduler::{FrameScheduler, ScreenMode};
pub use screen::{Screen, ScreenSink};
