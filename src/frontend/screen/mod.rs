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

//! Screen
//!
//! The ring of frame buffers written by the emulation thread and read by the
//! render thread, guarded by a single mutex.
//!
//! - [`ScreenCrit`]: the state behind the lock
//! - [`Screen`]: cheap shared handle to it
//! - [`ScreenSink`]: the emulation thread's [`PixelRenderer`](crate::core::PixelRenderer)

pub mod crit;
pub mod frame_buffer;
pub mod sink;

pub use crit::ScreenCrit;
pub use frame_buffer::{Crop, FrameBuffer, Layer, PixelView, ReflectionPlanes};
pub use sink::ScreenSink;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, MutexGuard, RawMutex};
use std::sync::Arc;

/// Shared handle to the screen's critical state
#[derive(Debug, Clone)]
pub struct Screen {
    crit: Arc<Mutex<ScreenCrit>>,
}

impl Screen {
    pub fn new(crit: ScreenCrit) -> Self {
        Self {
            crit: Arc::new(Mutex::new(crit)),
        }
    }

    /// Enter the critical section
    pub fn lock(&self) -> MutexGuard<'_, ScreenCrit> {
        self.crit.lock()
    }

    /// Enter the critical section with a guard that owns its handle
    pub(crate) fn lock_arc(&self) -> ArcMutexGuard<RawMutex, ScreenCrit> {
        self.crit.lock_arc()
    }
}
