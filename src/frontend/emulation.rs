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

//! Demo emulation thread
//!
//! Drives a [`TestCard`] into a [`ScreenSink`] at the specification's frame
//! rate, the way a real emulation core drives the screen: resize once, then
//! bracket pixel bursts and end each frame, blocking at the rendezvous when
//! the render thread falls behind.

use super::frame_timer::FrameTimer;
use super::gui::FeatureRequest;
use super::polling::EmulationState;
use super::screen::ScreenSink;
use super::service::FeatureSender;
use crate::core::error::GuiError;
use crate::core::renderer::PixelRenderer;
use crate::core::test_card::TestCard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Sleep between checks while paused
const PAUSED_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct Control {
    paused: AtomicBool,
    stop: AtomicBool,
    reset: AtomicBool,
}

/// Handle to the running emulation thread
///
/// Stopping joins the thread. If the thread may be parked at the rendezvous,
/// shut the [`Core`](super::Core) down first so it can leave.
pub struct EmulationThread {
    control: Arc<Control>,
    handle: Option<JoinHandle<()>>,
}

impl EmulationThread {
    /// Start generating frames
    ///
    /// # Arguments
    ///
    /// * `sink` - The screen sink taken from the core
    /// * `card` - Frame generator; its window is applied with a resize first
    /// * `features` - Where state changes are reported
    pub fn spawn(
        mut sink: ScreenSink,
        mut card: TestCard,
        features: FeatureSender<FeatureRequest>,
    ) -> std::io::Result<Self> {
        let control = Arc::new(Control::default());
        let shared = Arc::clone(&control);

        let handle = thread::Builder::new()
            .name("emulation".into())
            .spawn(move || run(&mut sink, &mut card, &features, &shared))?;

        Ok(Self {
            control,
            handle: Some(handle),
        })
    }

    pub fn set_paused(&self, paused: bool) {
        self.control.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.control.paused.load(Ordering::Acquire)
    }

    /// Clear the screen before the next frame
    pub fn request_reset(&self) {
        self.control.reset.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Ask the thread to stop and wait for it
    pub fn stop(&mut self) {
        self.control.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Emulation thread panicked");
            }
        }
    }
}

impl Drop for EmulationThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(sink: &mut ScreenSink, card: &mut TestCard, features: &FeatureSender<FeatureRequest>, control: &Control) {
    let spec = card.spec();
    let (top, bottom) = card.window();
    if let Err(e) = sink.resize(spec, top, bottom) {
        log::error!("Emulation could not size the screen: {}", e);
        features.send(FeatureRequest::SetEmulationState(EmulationState::Ending));
        return;
    }

    let mut timer = FrameTimer::new(spec.frames_per_second);
    let mut state = EmulationState::Initialising;
    let mut report = |next: EmulationState| {
        if state != next {
            state = next;
            features.send(FeatureRequest::SetEmulationState(next));
        }
    };

    log::info!("Emulation started: {} at {}Hz", spec.id, spec.frames_per_second);
    while !control.stop.load(Ordering::Acquire) {
        if control.paused.load(Ordering::Acquire) {
            report(EmulationState::Paused);
            thread::sleep(PAUSED_POLL);
            continue;
        }
        report(EmulationState::Running);

        if control.reset.swap(false, Ordering::AcqRel) {
            sink.reset();
        }

        timer.sleep_until_next_frame();
        match card.run_frame(sink) {
            Ok(()) => timer.tick(),
            Err(GuiError::ShutDown) => {
                log::debug!("Render side shut down, emulation stopping");
                break;
            }
            Err(e) => {
                log::error!("Emulation stopped: {}", e);
                break;
            }
        }
    }

    if let Err(e) = sink.end_rendering() {
        log::warn!("end_rendering failed: {}", e);
    }
    report(EmulationState::Ending);
    log::info!("Emulation stopped after {} frames", card.frame_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::specification::{SpecId, Specification};
    use crate::frontend::config::GuiConfig;
    use crate::frontend::gui::Core;
    use std::time::Instant;

    fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_emulation_produces_frames() {
        let mut core = Core::new(&GuiConfig::default(), None).unwrap();
        let sink = core.screen_sink().unwrap();
        let card = TestCard::new(Specification::get(SpecId::Ntsc));
        let mut emu = EmulationThread::spawn(sink, card, core.feature_sender()).unwrap();

        assert!(wait_until(Duration::from_secs(5), || {
            core.tick();
            core.stats().frames_plotted >= 3
        }));
        assert_eq!(core.polling().state(), EmulationState::Running);

        core.shutdown();
        emu.stop();
        assert!(emu.is_finished());
    }

    #[test]
    fn test_pause_reported() {
        let mut core = Core::new(&GuiConfig::default(), None).unwrap();
        let sink = core.screen_sink().unwrap();
        let card = TestCard::new(Specification::get(SpecId::Ntsc));
        let mut emu = EmulationThread::spawn(sink, card, core.feature_sender()).unwrap();

        emu.set_paused(true);
        assert!(emu.is_paused());
        assert!(wait_until(Duration::from_secs(5), || {
            core.tick();
            core.polling().state() == EmulationState::Paused
        }));

        core.shutdown();
        emu.stop();
    }

    #[test]
    fn test_stops_when_render_side_shuts_down() {
        let config = GuiConfig {
            ring_size: 2,
            ..GuiConfig::default()
        };
        let mut core = Core::new(&config, None).unwrap();
        let sink = core.screen_sink().unwrap();
        let card = TestCard::new(Specification::get(SpecId::Ntsc));
        let emu = EmulationThread::spawn(sink, card, core.feature_sender()).unwrap();

        // without ticks the first frame laps the render index and parks
        assert!(wait_until(Duration::from_secs(5), || core.stats().producer_blocks == 1));
        core.shutdown();
        assert!(wait_until(Duration::from_secs(5), || emu.is_finished()));
    }
}
