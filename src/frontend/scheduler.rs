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

//! Frame scheduler
//!
//! Tracks the two ring indices shared by the emulation thread (the *plot*
//! index, where pixels are written) and the render thread (the *render* index,
//! the frame being presented), and decides at each frame boundary how they
//! move.
//!
//! In play mode with pacing active the two indices are never equal, except
//! while the emulation thread is blocked waiting for the render thread to
//! catch up. When the render thread is the faster of the two it rolls back
//! instead of presenting the frame still being drawn. Without pacing the
//! render thread simply presents the most recently completed frame. In debug
//! mode both indices are pinned to one slot.
//!
//! The scheduler holds no lock of its own; it lives inside the screen's
//! critical section.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Presentation mode of the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenMode {
    /// Normal play: multi-slot ring, paced against the display
    #[default]
    Play,
    /// Debugger: single slot, no backpressure
    Debug,
}

impl fmt::Display for ScreenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenMode::Play => f.write_str("play"),
            ScreenMode::Debug => f.write_str("debug"),
        }
    }
}

impl FromStr for ScreenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "play" => Ok(ScreenMode::Play),
            "debug" => Ok(ScreenMode::Debug),
            other => Err(format!("unknown screen mode: {}", other)),
        }
    }
}

/// Result of advancing the plot index at the end of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotOutcome {
    /// The emulation may continue into the next slot
    Advanced,
    /// The plot index has met the render index; the emulation must wait
    Lapped,
    /// Debug mode, the index did not move
    Pinned,
}

/// Result of advancing the render index once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Moved to the next slot in the ring
    Advanced,
    /// Would have met the plot index and was moved back behind it instead
    RolledBack,
    /// Pacing inactive, moved to the most recently completed frame
    Latest,
    /// Debug mode, the index did not move
    Pinned,
}

/// Counters kept by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    /// Frames completed by the emulation
    pub frames_plotted: u64,
    /// Render ticks that selected a frame
    pub frames_presented: u64,
    /// Times the emulation had to wait for the render thread
    pub producer_blocks: u64,
    /// Times the render index rolled back behind the plot index
    pub render_rollbacks: u64,
}

/// Whether a display refresh rate can keep up with a frame rate
///
/// An unknown refresh rate counts as in range. A display within 1Hz of the
/// frame rate is accepted so that 59.94Hz monitors still pace 60Hz output.
pub fn refresh_in_range(refresh_rate: Option<f32>, frames_per_second: f32) -> bool {
    match refresh_rate {
        None => true,
        Some(hz) => hz + 1.0 >= frames_per_second,
    }
}

/// Ring index bookkeeping for the screen
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    ring_len: usize,
    plot: usize,
    render: usize,
    mode: ScreenMode,
    vsync: bool,
    in_range: bool,
    stats: SchedulerStats,
}

impl FrameScheduler {
    /// Smallest ring the scheduler can pace with
    pub const MIN_RING: usize = 2;

    /// Create a scheduler for a ring of `ring_len` slots
    ///
    /// # Arguments
    ///
    /// * `ring_len` - Number of frame buffers in play mode (at least 2; smaller
    ///   values are raised to 2)
    /// * `mode` - Starting presentation mode
    /// * `vsync` - Whether presentation pacing is requested
    pub fn new(ring_len: usize, mode: ScreenMode, vsync: bool) -> Self {
        let mut scheduler = Self {
            ring_len: ring_len.max(Self::MIN_RING),
            plot: 0,
            render: 0,
            mode,
            vsync,
            in_range: true,
            stats: SchedulerStats::default(),
        };
        scheduler.reset_indices();
        scheduler
    }

    /// Put the indices back to their starting positions for the current mode
    pub fn reset_indices(&mut self) {
        match self.mode {
            ScreenMode::Play => {
                self.plot = 1;
                self.render = 0;
            }
            ScreenMode::Debug => {
                self.plot = 0;
                self.render = 0;
            }
        }
    }

    #[inline]
    pub fn ring_len(&self) -> usize {
        self.ring_len
    }

    #[inline]
    pub fn plot_index(&self) -> usize {
        self.plot
    }

    #[inline]
    pub fn render_index(&self) -> usize {
        self.render
    }

    #[inline]
    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    #[inline]
    pub fn vsync(&self) -> bool {
        self.vsync
    }

    /// Switch presentation mode, resetting the indices if it changed
    ///
    /// Returns `true` if the mode changed.
    pub fn set_mode(&mut self, mode: ScreenMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.reset_indices();
        true
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.vsync = vsync;
    }

    /// Record whether the display refresh rate can keep up with the emulation
    pub fn set_in_range(&mut self, in_range: bool) {
        self.in_range = in_range;
    }

    /// Whether the emulation is currently paced against presentation
    #[inline]
    pub fn pacing_active(&self) -> bool {
        self.mode == ScreenMode::Play && self.vsync && self.in_range
    }

    /// How many slots the producer is ahead of the consumer
    #[inline]
    pub fn distance(&self) -> usize {
        (self.plot + self.ring_len - self.render) % self.ring_len
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Advance the plot index at the end of a frame
    ///
    /// Called by the emulation thread inside the critical section. A
    /// [`PlotOutcome::Lapped`] result obliges the caller to leave the critical
    /// section and wait at the rendezvous before plotting again.
    pub fn advance_plot(&mut self) -> PlotOutcome {
        self.stats.frames_plotted += 1;
        if self.mode == ScreenMode::Debug {
            return PlotOutcome::Pinned;
        }

        self.plot = (self.plot + 1) % self.ring_len;
        if self.pacing_active() && self.plot == self.render {
            self.stats.producer_blocks += 1;
            return PlotOutcome::Lapped;
        }
        PlotOutcome::Advanced
    }

    /// Choose the frame to present on this tick
    ///
    /// Called by the render thread inside the critical section, before it
    /// copies the frame at [`render_index`](Self::render_index).
    pub fn advance_render(&mut self) -> RenderOutcome {
        self.stats.frames_presented += 1;
        if self.mode == ScreenMode::Debug {
            return RenderOutcome::Pinned;
        }

        if !self.pacing_active() {
            self.render = self.behind_plot(1);
            return RenderOutcome::Latest;
        }

        let next = (self.render + 1) % self.ring_len;
        if next == self.plot {
            // a two slot ring cannot step back twice without landing on plot
            let back = if self.ring_len >= 3 { 2 } else { 1 };
            self.render = self.behind_plot(back);
            self.stats.render_rollbacks += 1;
            RenderOutcome::RolledBack
        } else {
            self.render = next;
            RenderOutcome::Advanced
        }
    }

    #[inline]
    fn behind_plot(&self, n: usize) -> usize {
        (self.plot + self.ring_len - n) % self.ring_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_indices() {
        let play = FrameScheduler::new(10, ScreenMode::Play, true);
        assert_eq!((play.plot_index(), play.render_index()), (1, 0));
        assert_eq!(play.distance(), 1);

        let debug = FrameScheduler::new(10, ScreenMode::Debug, true);
        assert_eq!((debug.plot_index(), debug.render_index()), (0, 0));
    }

    #[test]
    fn test_ring_len_raised_to_minimum() {
        let s = FrameScheduler::new(1, ScreenMode::Play, true);
        assert_eq!(s.ring_len(), FrameScheduler::MIN_RING);
    }

    #[test]
    fn test_producer_laps_after_ring_fills() {
        let mut s = FrameScheduler::new(4, ScreenMode::Play, true);
        assert_eq!(s.advance_plot(), PlotOutcome::Advanced); // 2
        assert_eq!(s.advance_plot(), PlotOutcome::Advanced); // 3
        assert_eq!(s.advance_plot(), PlotOutcome::Lapped); // 0 == render
        assert_eq!(s.stats().producer_blocks, 1);

        // the consumer moves on, which releases the producer
        assert_eq!(s.advance_render(), RenderOutcome::Advanced);
        assert_eq!(s.render_index(), 1);
        assert_ne!(s.plot_index(), s.render_index());
    }

    #[test]
    fn test_consumer_rolls_back_two_slots() {
        let mut s = FrameScheduler::new(10, ScreenMode::Play, true);
        s.advance_plot(); // plot 2
        s.advance_plot(); // plot 3
        s.advance_plot(); // plot 4

        assert_eq!(s.advance_render(), RenderOutcome::Advanced); // 1
        assert_eq!(s.advance_render(), RenderOutcome::Advanced); // 2
        assert_eq!(s.advance_render(), RenderOutcome::Advanced); // 3
        assert_eq!(s.advance_render(), RenderOutcome::RolledBack);
        assert_eq!(s.render_index(), 2);
        assert_eq!(s.stats().render_rollbacks, 1);
    }

    #[test]
    fn test_rollback_wraps() {
        let mut s = FrameScheduler::new(5, ScreenMode::Play, true);
        // plot 1, render 0: the very first tick meets the plot index
        assert_eq!(s.advance_render(), RenderOutcome::RolledBack);
        assert_eq!(s.render_index(), 4);
    }

    #[test]
    fn test_two_slot_ring_rolls_back_one() {
        let mut s = FrameScheduler::new(2, ScreenMode::Play, true);
        assert_eq!(s.advance_render(), RenderOutcome::RolledBack);
        assert_eq!(s.render_index(), 0);
        assert_eq!(s.plot_index(), 1);
    }

    #[test]
    fn test_without_vsync_presents_latest_and_never_laps() {
        let mut s = FrameScheduler::new(3, ScreenMode::Play, false);
        for _ in 0..10 {
            assert_eq!(s.advance_plot(), PlotOutcome::Advanced);
        }
        assert_eq!(s.advance_render(), RenderOutcome::Latest);
        assert_eq!(s.distance(), 1);
        assert_eq!(s.stats().producer_blocks, 0);
    }

    #[test]
    fn test_out_of_range_display_disables_pacing() {
        let mut s = FrameScheduler::new(4, ScreenMode::Play, true);
        assert!(s.pacing_active());
        s.set_in_range(refresh_in_range(Some(30.0), 60.0));
        assert!(!s.pacing_active());
        s.set_in_range(refresh_in_range(Some(59.94), 60.0));
        assert!(s.pacing_active());
    }

    #[test]
    fn test_refresh_in_range() {
        assert!(refresh_in_range(None, 60.0));
        assert!(refresh_in_range(Some(144.0), 60.0));
        assert!(refresh_in_range(Some(59.0), 60.0));
        assert!(!refresh_in_range(Some(58.9), 60.0));
        assert!(refresh_in_range(Some(50.0), 50.0));
    }

    #[test]
    fn test_debug_mode_pins_indices() {
        let mut s = FrameScheduler::new(10, ScreenMode::Debug, true);
        assert_eq!(s.advance_plot(), PlotOutcome::Pinned);
        assert_eq!(s.advance_render(), RenderOutcome::Pinned);
        assert_eq!(s.plot_index(), s.render_index());
        assert!(!s.pacing_active());
    }

    #[test]
    fn test_mode_change_resets_indices() {
        let mut s = FrameScheduler::new(10, ScreenMode::Play, true);
        s.advance_plot();
        s.advance_plot();
        assert!(s.set_mode(ScreenMode::Debug));
        assert_eq!((s.plot_index(), s.render_index()), (0, 0));
        assert!(!s.set_mode(ScreenMode::Debug));
        assert!(s.set_mode(ScreenMode::Play));
        assert_eq!((s.plot_index(), s.render_index()), (1, 0));
    }

    #[test]
    fn test_screen_mode_parse() {
        assert_eq!("DEBUG".parse::<ScreenMode>(), Ok(ScreenMode::Debug));
        assert!("fast".parse::<ScreenMode>().is_err());
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Plot,
        Render,
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![Just(Step::Plot), Just(Step::Render)]
    }

    proptest! {
        /// With pacing active the indices only coincide while the producer
        /// is held at the rendezvous, and the consumer always releases it.
        #[test]
        fn paced_indices_meet_only_when_lapped(
            ring_len in 2usize..=12,
            steps in prop::collection::vec(step_strategy(), 1..200),
        ) {
            let mut s = FrameScheduler::new(ring_len, ScreenMode::Play, true);
            let mut producer_blocked = false;

            for step in steps {
                match step {
                    Step::Plot if !producer_blocked => {
                        let outcome = s.advance_plot();
                        producer_blocked = outcome == PlotOutcome::Lapped;
                        prop_assert_eq!(producer_blocked, s.plot_index() == s.render_index());
                    }
                    Step::Plot => {}
                    Step::Render => {
                        s.advance_render();
                        producer_blocked = false;
                        prop_assert_ne!(s.plot_index(), s.render_index());
                    }
                }
                prop_assert!(s.plot_index() < ring_len);
                prop_assert!(s.render_index() < ring_len);
            }
        }

        /// A rollback always lands two slots behind plot (one on a two slot ring).
        #[test]
        fn rollback_lands_behind_plot(
            ring_len in 2usize..=12,
            plots in 0usize..40,
            renders in 1usize..40,
        ) {
            let mut s = FrameScheduler::new(ring_len, ScreenMode::Play, true);
            for _ in 0..plots {
                if s.advance_plot() == PlotOutcome::Lapped {
                    s.advance_render();
                }
            }
            for _ in 0..renders {
                let plot = s.plot_index();
                if s.advance_render() == RenderOutcome::RolledBack {
                    let back = if ring_len >= 3 { 2 } else { 1 };
                    prop_assert_eq!(s.render_index(), (plot + ring_len - back) % ring_len);
                }
            }
        }

        /// Without pacing the consumer always presents the latest complete frame.
        #[test]
        fn unpaced_render_trails_plot_by_one(
            ring_len in 2usize..=12,
            plots in 0usize..40,
        ) {
            let mut s = FrameScheduler::new(ring_len, ScreenMode::Play, false);
            for _ in 0..plots {
                prop_assert_eq!(s.advance_plot(), PlotOutcome::Advanced);
            }
            prop_assert_eq!(s.advance_render(), RenderOutcome::Latest);
            prop_assert_eq!(s.distance(), 1);
        }
    }
}
