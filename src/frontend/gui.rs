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

//! Render-thread core
//!
//! [`Core`] owns the render side of every channel between the two threads and
//! runs one tick of the presentation pipeline at a time:
//!
//! 1. apply queued feature requests
//! 2. service queued resize requests
//! 3. advance the render index and copy the slot out, under the screen lock
//! 4. release an emulation thread parked at the rendezvous
//! 5. hand the copy to every registered [`TextureRenderer`]
//!
//! It has no window of its own; [`Application`](super::Application) drives it
//! from the winit event loop and tests drive it directly.

use super::config::GuiConfig;
use super::polling::{EmulationState, PollingClock};
use super::presentation::{Presentation, TextureRenderer};
use super::rendezvous::{rendezvous, ConsumerGate};
use super::scheduler::{RenderOutcome, SchedulerStats, ScreenMode};
use super::screen::{Screen, ScreenCrit, ScreenSink};
use super::service::{
    feature_queue, service_queue, FeatureReceiver, FeatureSender, ServiceReceiver,
    ServiceRequest, Waker,
};
use crate::core::error::{GuiError, Result};
use crate::core::reflection::Overlay;
use crossbeam_channel::Select;
use std::time::{Duration, Instant};

/// Outstanding resize requests the service queue holds
const SERVICE_QUEUE_SIZE: usize = 4;

/// Presented frames between scheduler statistics log lines
const STATS_LOG_INTERVAL: u64 = 600;

/// Fire-and-forget requests from other threads to the render thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureRequest {
    SetMode(ScreenMode),
    SetVsync(bool),
    SetOverlay(Overlay),
    SetEmulationState(EmulationState),
    /// Wake the render loop without changing anything
    Alert,
}

/// Render side of the screen
///
/// # Example
///
/// ```
/// use vcsgui::core::PixelRenderer;
/// use vcsgui::frontend::{Core, GuiConfig};
///
/// let config = GuiConfig::default();
/// let mut core = Core::new(&config, None)?;
/// let mut sink = core.screen_sink()?;
///
/// sink.updating_pixels(true);
/// sink.new_frame(true)?;
/// sink.updating_pixels(false);
///
/// core.tick();
/// assert_eq!(core.stats().frames_plotted, 1);
/// # Ok::<(), vcsgui::core::GuiError>(())
/// ```
pub struct Core {
    screen: Screen,
    sink: Option<ScreenSink>,
    consumer: ConsumerGate,
    service: ServiceReceiver,
    features_tx: FeatureSender<FeatureRequest>,
    features: FeatureReceiver<FeatureRequest>,
    polling: PollingClock,
    textures: Vec<Box<dyn TextureRenderer>>,
    presentation: Presentation,
    /// Geometry generation the textures were last sized for
    seen_generation: u64,
    last_tick: Option<Instant>,
}

impl Core {
    /// Build the screen and its channels from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Front-end settings, validated here
    /// * `waker` - Called from other threads when the render loop has work
    ///
    /// # Returns
    ///
    /// The core, with its [`ScreenSink`] ready to be taken
    pub fn new(config: &GuiConfig, waker: Option<Waker>) -> Result<Self> {
        config.validate()?;

        let spec = config.specification();
        let (top, bottom) = config.visible_window();
        let mut crit = ScreenCrit::new(spec, top, bottom, config.ring_size, config.mode, config.vsync)?;
        crit.set_overlay(config.overlay);
        crit.set_refresh_rate(config.refresh_rate);
        let presentation = Presentation::new(crit.geometry());
        let screen = Screen::new(crit);

        let (producer, consumer) = rendezvous();
        let (service_tx, service) = service_queue(SERVICE_QUEUE_SIZE, waker.clone());
        let (features_tx, features) = feature_queue(config.feature_queue_size, waker.clone());
        let sink = ScreenSink::new(
            screen.clone(),
            producer,
            service_tx,
            waker,
            config.resize_timeout(),
        );

        log::info!(
            "Screen core: {} {}..{}, {} frame ring, {} mode, vsync {}",
            spec.id,
            top,
            bottom,
            config.ring_size,
            config.mode,
            if config.vsync { "on" } else { "off" }
        );

        Ok(Self {
            screen,
            sink: Some(sink),
            consumer,
            service,
            features_tx,
            features,
            polling: PollingClock::new(config.mode),
            textures: Vec::new(),
            presentation,
            seen_generation: 0,
            last_tick: None,
        })
    }

    /// Take the emulation thread's handle to the screen
    ///
    /// # Errors
    ///
    /// [`GuiError::SinkTaken`] on every call after the first
    pub fn screen_sink(&mut self) -> Result<ScreenSink> {
        self.sink.take().ok_or(GuiError::SinkTaken)
    }

    /// A handle other threads can queue feature requests with
    pub fn feature_sender(&self) -> FeatureSender<FeatureRequest> {
        self.features_tx.clone()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Register a consumer of presented frames
    ///
    /// The texture is sized for the current geometry straight away and again
    /// whenever the geometry changes.
    pub fn add_texture(&mut self, mut texture: Box<dyn TextureRenderer>) {
        let geometry = self.screen.lock().geometry();
        texture.resize(&geometry);
        self.textures.push(texture);
    }

    /// Apply queued feature requests
    ///
    /// # Returns
    ///
    /// Number of requests applied
    pub fn apply_features(&mut self) -> usize {
        let requests: Vec<FeatureRequest> = self.features.drain().collect();
        let count = requests.len();
        for request in requests {
            log::debug!("Feature request: {:?}", request);
            match request {
                FeatureRequest::SetMode(mode) => self.set_mode(mode),
                FeatureRequest::SetVsync(vsync) => self.set_vsync(vsync),
                FeatureRequest::SetOverlay(overlay) => self.set_overlay(overlay),
                FeatureRequest::SetEmulationState(state) => self.set_emulation_state(state),
                FeatureRequest::Alert => self.polling.alert(),
            }
        }
        count
    }

    /// Answer queued service requests
    ///
    /// # Returns
    ///
    /// Number of requests answered
    pub fn service(&mut self) -> usize {
        let mut count = 0;
        while let Some(request) = self.service.try_next() {
            match request {
                ServiceRequest::Resize {
                    spec,
                    top,
                    bottom,
                    reply,
                    ..
                } => {
                    let result = self.screen.lock().set_geometry(spec, top, bottom).map(|_| ());
                    if let Err(e) = &result {
                        log::warn!("Resize to {} {}..{} refused: {}", spec.id, top, bottom, e);
                    }
                    if reply.send(result).is_err() {
                        log::debug!("Resize requester stopped waiting");
                    }
                }
            }
            count += 1;
        }
        count
    }

    /// Run one render loop iteration
    ///
    /// # Returns
    ///
    /// What the scheduler did with the render index
    pub fn tick(&mut self) -> RenderOutcome {
        self.last_tick = Some(Instant::now());
        self.apply_features();
        self.service();

        let with_cursor = !self.polling.state().is_active();
        let (outcome, generation) = {
            let mut crit = self.screen.lock();
            let outcome = crit.advance_render();
            crit.copy_presentation(&mut self.presentation, with_cursor);
            (outcome, crit.generation())
        };

        self.consumer.release_pending();

        if generation != self.seen_generation {
            let geometry = self.presentation.geometry();
            for texture in &mut self.textures {
                texture.resize(geometry);
            }
            self.seen_generation = generation;
        }
        for texture in &mut self.textures {
            texture.render(&self.presentation);
        }

        self.polling.clear_alert();

        let stats = self.stats();
        if stats.frames_presented > 0 && stats.frames_presented % STATS_LOG_INTERVAL == 0 {
            log::debug!(
                "Presented {} of {} frames, {} producer blocks, {} rollbacks",
                stats.frames_presented,
                stats.frames_plotted,
                stats.producer_blocks,
                stats.render_rollbacks
            );
        }
        outcome
    }

    /// How long the render loop may sleep before the next tick
    pub fn wait_duration(&self) -> Duration {
        if self.service.is_pending() || self.features.is_pending() || self.consumer.has_waiter() {
            return Duration::ZERO;
        }
        self.polling.wait_duration(Instant::now())
    }

    /// When the next tick is due, now if there has not been one yet
    pub fn next_tick(&self) -> Instant {
        let now = Instant::now();
        match self.last_tick {
            Some(last) => (last + self.wait_duration()).max(now),
            None => now,
        }
    }

    /// Whether the render loop should tick at `now`
    ///
    /// Window events wake the loop early; they do not bring the deadline
    /// forward unless they raised the alert or left work queued.
    pub fn tick_due(&self, now: Instant) -> bool {
        match self.last_tick {
            Some(last) => now >= last + self.wait_duration(),
            None => true,
        }
    }

    /// Block until another thread has something for the render thread, or
    /// the timeout elapses
    ///
    /// # Returns
    ///
    /// `true` if work arrived before the timeout
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        let mut select = Select::new();
        select.recv(self.service.receiver());
        select.recv(self.features.receiver());
        select.recv(self.consumer.wait_receiver());
        select.ready_timeout(timeout).is_ok()
    }

    pub fn set_mode(&mut self, mode: ScreenMode) {
        self.screen.lock().set_mode(mode);
        self.polling.set_mode(mode);
        self.polling.alert();
    }

    pub fn mode(&self) -> ScreenMode {
        self.polling.mode()
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.screen.lock().set_vsync(vsync);
        log::info!("Vsync {}", if vsync { "on" } else { "off" });
    }

    pub fn set_overlay(&mut self, overlay: Overlay) {
        self.screen.lock().set_overlay(overlay);
        self.polling.alert();
    }

    pub fn set_emulation_state(&mut self, state: EmulationState) {
        if self.polling.state() != state {
            log::debug!("Emulation state: {:?}", state);
        }
        self.polling.set_state(state);
    }

    /// Record the display refresh rate, `None` if unknown
    pub fn set_refresh_rate(&mut self, refresh_rate: Option<f32>) {
        self.screen.lock().set_refresh_rate(refresh_rate);
    }

    /// Clear the screen without changing geometry
    pub fn reset(&mut self) {
        self.screen.lock().reset();
        self.polling.alert();
    }

    pub fn stats(&self) -> SchedulerStats {
        self.screen.lock().scheduler().stats()
    }

    /// Feature requests dropped because their queue was full
    pub fn dropped_features(&self) -> u64 {
        self.features.overflow_count()
    }

    /// The last presented frame
    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    pub fn polling(&self) -> &PollingClock {
        &self.polling
    }

    pub fn polling_mut(&mut self) -> &mut PollingClock {
        &mut self.polling
    }

    /// Wake the emulation thread if it is parked and refuse further waits
    pub fn shutdown(&mut self) {
        if !self.consumer.is_shut_down() {
            log::info!("Screen core shutting down");
        }
        self.consumer.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.consumer.is_shut_down()
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        self.shutdown();
    }
}
