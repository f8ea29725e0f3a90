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

//! Frame timing module
//!
//! Frame timing for a producer running at a television specification's frame
//! rate (50Hz, 60Hz) and for measuring the rate at which the render loop
//! presents. Deadlines advance by whole frame durations so the average rate
//! stays exact even when individual sleeps overshoot.

use std::time::{Duration, Instant};

/// Below this remaining time the timer spins instead of sleeping
const SPIN_THRESHOLD: Duration = Duration::from_micros(300);

/// Length of an FPS measurement window
const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Measures how often something happens, averaged over one second windows
#[derive(Debug, Clone)]
pub struct RateMeter {
    window_start: Instant,
    window_count: u64,
    last: Instant,
    rate: f32,
    last_interval: Duration,
}

impl RateMeter {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            window_start: now,
            window_count: 0,
            last: now,
            rate: 0.0,
            last_interval: Duration::ZERO,
        }
    }

    /// Count one event at `now`
    pub fn record(&mut self, now: Instant) {
        self.last_interval = now.saturating_duration_since(self.last);
        self.last = now;
        self.window_count += 1;

        let window = now.saturating_duration_since(self.window_start);
        if window >= RATE_WINDOW {
            self.rate = self.window_count as f32 / window.as_secs_f32();
            self.window_count = 0;
            self.window_start = now;
            log::trace!("{:.1} fps", self.rate);
        }
    }

    /// Events per second over the last complete window, zero before the first
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Time between the last two events
    pub fn last_interval(&self) -> Duration {
        self.last_interval
    }

    /// When the last event was recorded
    pub fn last(&self) -> Instant {
        self.last
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame timer
///
/// Tells a producer running at a television specification's frame rate when
/// its next frame is due, and measures the rate it actually achieves.
/// Deadlines advance by whole frame durations so the average rate stays
/// exact even when individual sleeps overshoot.
///
/// # Example
///
/// ```
/// use vcsgui::frontend::FrameTimer;
///
/// let mut timer = FrameTimer::new(60.0);
///
/// for _ in 0..3 {
///     timer.sleep_until_next_frame();
///     // produce a frame
///     timer.tick();
/// }
/// assert_eq!(timer.frame_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct FrameTimer {
    frame_time: Duration,
    deadline: Instant,
    frame_count: u64,
    meter: RateMeter,
}

impl FrameTimer {
    /// Create a timer whose first frame is due immediately
    ///
    /// # Arguments
    ///
    /// * `target_fps` - Target frames per second
    ///
    /// # Panics
    ///
    /// Panics if `target_fps` is not a positive finite number
    pub fn new(target_fps: f32) -> Self {
        let meter = RateMeter::new();
        Self {
            frame_time: frame_duration(target_fps),
            deadline: meter.last(),
            frame_count: 0,
            meter,
        }
    }

    /// Change the target rate, e.g. after switching television specification
    ///
    /// # Panics
    ///
    /// Panics if `target_fps` is not a positive finite number
    pub fn set_target_fps(&mut self, target_fps: f32) {
        self.frame_time = frame_duration(target_fps);
        self.deadline = self.meter.last() + self.frame_time;
    }

    pub fn target_frame_time(&self) -> Duration {
        self.frame_time
    }

    /// Record a completed frame and move the deadline on by one frame
    ///
    /// A producer more than two frames behind is resynchronised instead of
    /// bursting to catch up.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.meter.record(now);
        self.frame_count += 1;

        self.deadline += self.frame_time;
        if now.saturating_duration_since(self.deadline) > self.frame_time * 2 {
            self.deadline = now;
        }
    }

    /// Whether the next frame is due
    #[inline(always)]
    pub fn should_run_frame(&self) -> bool {
        Instant::now() >= self.deadline
    }

    #[inline(always)]
    pub fn next_frame_instant(&self) -> Instant {
        self.deadline
    }

    /// Time left until the next frame is due, zero if already due
    pub fn time_until_next_frame(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Block until the next frame is due
    ///
    /// Sleeps for most of the wait and spins for the final few hundred
    /// microseconds.
    pub fn sleep_until_next_frame(&self) {
        loop {
            let remaining = self.time_until_next_frame();
            if remaining.is_zero() {
                return;
            }
            if remaining > SPIN_THRESHOLD {
                std::thread::sleep(remaining - SPIN_THRESHOLD);
            } else {
                std::hint::spin_loop();
            }
        }
    }

    /// Measured FPS, updated about once per second
    pub fn fps(&self) -> f32 {
        self.meter.rate()
    }

    /// Duration of the last frame in milliseconds
    pub fn frame_time_ms(&self) -> f32 {
        self.meter.last_interval().as_secs_f32() * 1000.0
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(60.0)
    }
}

fn frame_duration(target_fps: f32) -> Duration {
    assert!(
        target_fps.is_finite() && target_fps > 0.0,
        "target_fps must be greater than 0"
    );
    Duration::from_secs_f64(1.0 / target_fps as f64)
}
