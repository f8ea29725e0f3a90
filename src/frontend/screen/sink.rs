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

//! Emulation-thread handle to the screen

use super::crit::{validate_geometry, ScreenCrit};
use super::Screen;
use crate::core::error::{GuiError, Result};
use crate::core::reflection::ReflectionStep;
use crate::core::renderer::{PixelReflector, PixelRenderer};
use crate::core::signal::Signal;
use crate::core::specification::Specification;
use crate::frontend::rendezvous::{GateOutcome, ProducerGate};
use crate::frontend::scheduler::PlotOutcome;
use crate::frontend::service::{ServiceSender, Waker};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::RawMutex;
use std::time::Duration;

/// The screen as seen by the emulation thread
///
/// Implements [`PixelRenderer`] and [`PixelReflector`]. Between
/// `updating_pixels(true)` and `updating_pixels(false)` the sink holds the
/// screen lock; it lets go before blocking at the rendezvous or waiting for a
/// resize and takes it back afterwards.
///
/// There is only one sink per screen, obtained from
/// [`Core::screen_sink`](crate::frontend::Core::screen_sink).
pub struct ScreenSink {
    screen: Screen,
    guard: Option<ArcMutexGuard<RawMutex, ScreenCrit>>,
    gate: ProducerGate,
    service: ServiceSender,
    waker: Option<Waker>,
    reply_timeout: Duration,
}

impl ScreenSink {
    pub(crate) fn new(
        screen: Screen,
        gate: ProducerGate,
        service: ServiceSender,
        waker: Option<Waker>,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            screen,
            guard: None,
            gate,
            service,
            waker,
            reply_timeout,
        }
    }

    /// Whether the render side has shut down
    pub fn is_shut_down(&self) -> bool {
        self.gate.is_shut_down()
    }

    /// Whether a pixel burst is in progress
    pub fn is_updating(&self) -> bool {
        self.guard.is_some()
    }

    fn with_crit<R>(&mut self, f: impl FnOnce(&mut ScreenCrit) -> R) -> R {
        match self.guard.as_mut() {
            Some(guard) => f(&mut **guard),
            None => {
                let mut crit = self.screen.lock();
                f(&mut *crit)
            }
        }
    }

    /// Drop the lock for a blocking call, restoring the bracket afterwards
    fn unlocked<R>(&mut self, f: impl FnOnce(&Self) -> R) -> R {
        let bracketed = self.guard.take().is_some();
        let result = f(self);
        if bracketed {
            self.guard = Some(self.screen.lock_arc());
        }
        result
    }
}

impl PixelRenderer for ScreenSink {
    fn resize(&mut self, spec: &'static Specification, top: usize, bottom: usize) -> Result<()> {
        if self.with_crit(|crit| crit.geometry_matches(spec, top, bottom)) {
            return Ok(());
        }
        validate_geometry(spec, top, bottom)?;

        self.unlocked(|sink| {
            sink.service.request_resize(
                spec,
                top,
                bottom,
                sink.gate.shutdown_signal(),
                sink.reply_timeout,
            )
        })
    }

    fn new_frame(&mut self, is_stable: bool) -> Result<()> {
        let outcome = self.with_crit(|crit| crit.new_frame(is_stable));
        if outcome != PlotOutcome::Lapped {
            return Ok(());
        }

        let gate = self.unlocked(|sink| {
            if let Some(waker) = &sink.waker {
                waker();
            }
            sink.gate.wait_for_consumer()
        });
        match gate {
            GateOutcome::Released => Ok(()),
            GateOutcome::ShutDown => Err(GuiError::ShutDown),
        }
    }

    fn new_scanline(&mut self, _scanline: usize) -> Result<()> {
        Ok(())
    }

    fn updating_pixels(&mut self, updating: bool) {
        if updating {
            if self.guard.is_none() {
                self.guard = Some(self.screen.lock_arc());
            }
        } else {
            self.guard = None;
        }
    }

    fn set_pixel(&mut self, signal: Signal, is_current: bool) -> Result<()> {
        if self.guard.is_none() {
            log::trace!("set_pixel outside of an updating_pixels bracket");
        }
        self.with_crit(|crit| crit.plot(&signal, is_current));
        Ok(())
    }

    fn set_pixels(&mut self, signals: &[Signal], is_current: bool) -> Result<()> {
        if self.guard.is_none() {
            log::trace!("set_pixels outside of an updating_pixels bracket");
        }
        self.with_crit(|crit| {
            for signal in signals {
                crit.plot(signal, is_current);
            }
        });
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.guard = None;
        Ok(())
    }

    fn reset(&mut self) {
        self.with_crit(ScreenCrit::reset);
    }
}

impl PixelReflector for ScreenSink {
    fn reflect(&mut self, step: ReflectionStep) -> Result<()> {
        self.with_crit(|crit| crit.reflect(step));
        Ok(())
    }
}
