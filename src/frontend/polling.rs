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

//! Render loop governor
//!
//! Decides, once per render loop iteration, how long the loop may sleep
//! waiting for events. The choice trades CPU use against responsiveness and
//! depends on the presentation mode, what the emulation is doing and how
//! recently the user did something.

use super::scheduler::ScreenMode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Wait while an alert is pending
pub const ALERT_WAIT: Duration = Duration::ZERO;
/// Play mode, emulation running or a modal open
pub const PLAY_RUNNING_WAIT: Duration = Duration::from_millis(5);
/// Play mode, emulation paused
pub const PLAY_PAUSED_WAIT: Duration = Duration::from_millis(50);
/// Debug mode, emulation running
pub const DEBUG_RUNNING_WAIT: Duration = Duration::from_millis(1);
/// Debug mode, idle but the user was recently active
pub const DEBUG_AWAKE_WAIT: Duration = Duration::from_millis(20);
/// Fully idle
pub const IDLE_WAIT: Duration = Duration::from_millis(200);

/// How long after an event the debugger counts as awake
pub const AWAKE_PERIOD: Duration = Duration::from_secs(3);
/// Minimum spacing between accepted mouse motion events
pub const MOUSE_MOTION_THROTTLE: Duration = Duration::from_millis(50);

/// What the emulation is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmulationState {
    #[default]
    Initialising,
    Paused,
    Running,
    Stepping,
    Rewinding,
    Ending,
}

impl EmulationState {
    /// Whether frames are being produced
    pub fn is_active(self) -> bool {
        matches!(
            self,
            EmulationState::Running | EmulationState::Stepping | EmulationState::Rewinding
        )
    }
}

/// Everything the wait policy looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingInputs {
    pub alert: bool,
    pub mode: ScreenMode,
    pub state: EmulationState,
    pub modal_open: bool,
    /// Time since the last user event, if there has been one
    pub since_event: Option<Duration>,
}

/// The wait policy; the first matching rule wins
///
/// # Example
///
/// ```
/// use vcsgui::frontend::polling::{select_wait, EmulationState, PollingInputs, PLAY_PAUSED_WAIT};
/// use vcsgui::frontend::ScreenMode;
///
/// let inputs = PollingInputs {
///     alert: false,
///     mode: ScreenMode::Play,
///     state: EmulationState::Paused,
///     modal_open: false,
///     since_event: None,
/// };
/// assert_eq!(select_wait(&inputs), PLAY_PAUSED_WAIT);
/// ```
pub fn select_wait(inputs: &PollingInputs) -> Duration {
    let running = matches!(
        inputs.state,
        EmulationState::Running | EmulationState::Stepping | EmulationState::Rewinding
    );
    let awake = inputs.since_event.is_some_and(|d| d < AWAKE_PERIOD);

    match inputs.mode {
        _ if inputs.alert => ALERT_WAIT,
        ScreenMode::Play if running || inputs.modal_open => PLAY_RUNNING_WAIT,
        ScreenMode::Play if inputs.state == EmulationState::Paused => PLAY_PAUSED_WAIT,
        ScreenMode::Debug if inputs.state.is_active() => DEBUG_RUNNING_WAIT,
        ScreenMode::Debug if awake => DEBUG_AWAKE_WAIT,
        _ => IDLE_WAIT,
    }
}

/// Render loop governor state
#[derive(Debug, Clone)]
pub struct PollingClock {
    mode: ScreenMode,
    state: EmulationState,
    modal_open: bool,
    alert: bool,
    last_event: Option<Instant>,
    last_mouse: Option<Instant>,
}

impl PollingClock {
    pub fn new(mode: ScreenMode) -> Self {
        Self {
            mode,
            state: EmulationState::default(),
            modal_open: false,
            alert: false,
            last_event: None,
            last_mouse: None,
        }
    }

    pub fn set_mode(&mut self, mode: ScreenMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    pub fn set_state(&mut self, state: EmulationState) {
        self.state = state;
    }

    pub fn state(&self) -> EmulationState {
        self.state
    }

    pub fn set_modal_open(&mut self, open: bool) {
        self.modal_open = open;
    }

    /// Request that the next wait be zero
    pub fn alert(&mut self) {
        self.alert = true;
    }

    pub fn is_alerted(&self) -> bool {
        self.alert
    }

    /// Forget a pending alert once it has been serviced
    pub fn clear_alert(&mut self) {
        self.alert = false;
    }

    /// Record a user event
    pub fn note_event(&mut self, now: Instant) {
        self.last_event = Some(now);
    }

    /// Throttle mouse motion
    ///
    /// Returns `true` if the event should be processed, in which case it also
    /// counts as a user event.
    pub fn accept_mouse_motion(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_mouse {
            if now.saturating_duration_since(last) < MOUSE_MOTION_THROTTLE {
                return false;
            }
        }
        self.last_mouse = Some(now);
        self.note_event(now);
        true
    }

    /// Whether a user event arrived within the awake period
    pub fn is_awake(&self, now: Instant) -> bool {
        self.last_event
            .is_some_and(|t| now.saturating_duration_since(t) < AWAKE_PERIOD)
    }

    /// How long the render loop may wait
    pub fn wait_duration(&self, now: Instant) -> Duration {
        select_wait(&self.inputs(now))
    }

    pub fn inputs(&self, now: Instant) -> PollingInputs {
        PollingInputs {
            alert: self.alert,
            mode: self.mode,
            state: self.state,
            modal_open: self.modal_open,
            since_event: self.last_event.map(|t| now.saturating_duration_since(t)),
        }
    }
}

impl Default for PollingClock {
    fn default() -> Self {
        Self::new(ScreenMode::Play)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(mode: ScreenMode, state: EmulationState) -> PollingInputs {
        PollingInputs {
            alert: false,
            mode,
            state,
            modal_open: false,
            since_event: None,
        }
    }

    #[test]
    fn test_alert_beats_everything() {
        let mut i = inputs(ScreenMode::Debug, EmulationState::Running);
        i.alert = true;
        i.modal_open = true;
        assert_eq!(select_wait(&i), ALERT_WAIT);
    }

    #[test]
    fn test_play_mode_rules() {
        use EmulationState::*;
        assert_eq!(select_wait(&inputs(ScreenMode::Play, Running)), PLAY_RUNNING_WAIT);
        assert_eq!(select_wait(&inputs(ScreenMode::Play, Rewinding)), PLAY_RUNNING_WAIT);
        assert_eq!(select_wait(&inputs(ScreenMode::Play, Stepping)), PLAY_RUNNING_WAIT);
        assert_eq!(select_wait(&inputs(ScreenMode::Play, Paused)), PLAY_PAUSED_WAIT);
        assert_eq!(select_wait(&inputs(ScreenMode::Play, Initialising)), IDLE_WAIT);

        let mut modal = inputs(ScreenMode::Play, Paused);
        modal.modal_open = true;
        assert_eq!(select_wait(&modal), PLAY_RUNNING_WAIT);
    }

    #[test]
    fn test_debug_mode_rules() {
        use EmulationState::*;
        for state in [Running, Stepping, Rewinding] {
            assert_eq!(select_wait(&inputs(ScreenMode::Debug, state)), DEBUG_RUNNING_WAIT);
        }

        let mut recent = inputs(ScreenMode::Debug, Paused);
        recent.since_event = Some(Duration::from_secs(1));
        assert_eq!(select_wait(&recent), DEBUG_AWAKE_WAIT);

        recent.since_event = Some(Duration::from_secs(4));
        assert_eq!(select_wait(&recent), IDLE_WAIT);
        assert_eq!(select_wait(&inputs(ScreenMode::Debug, Paused)), IDLE_WAIT);
    }

    #[test]
    fn test_recent_event_does_not_apply_in_play_mode() {
        let mut i = inputs(ScreenMode::Play, EmulationState::Ending);
        i.since_event = Some(Duration::from_millis(10));
        assert_eq!(select_wait(&i), IDLE_WAIT);
    }

    #[test]
    fn test_clock_alert_cycle() {
        let mut clock = PollingClock::new(ScreenMode::Play);
        clock.set_state(EmulationState::Paused);
        let now = Instant::now();
        assert_eq!(clock.wait_duration(now), PLAY_PAUSED_WAIT);

        clock.alert();
        assert_eq!(clock.wait_duration(now), ALERT_WAIT);
        clock.clear_alert();
        assert_eq!(clock.wait_duration(now), PLAY_PAUSED_WAIT);
    }

    #[test]
    fn test_awake_window() {
        let mut clock = PollingClock::new(ScreenMode::Debug);
        clock.set_state(EmulationState::Paused);
        let start = Instant::now();
        assert!(!clock.is_awake(start));

        clock.note_event(start);
        assert!(clock.is_awake(start + Duration::from_secs(2)));
        assert_eq!(
            clock.wait_duration(start + Duration::from_secs(2)),
            DEBUG_AWAKE_WAIT
        );
        assert!(!clock.is_awake(start + AWAKE_PERIOD));
        assert_eq!(clock.wait_duration(start + AWAKE_PERIOD), IDLE_WAIT);
    }

    #[test]
    fn test_mouse_motion_throttled() {
        let mut clock = PollingClock::default();
        let start = Instant::now();
        assert!(clock.accept_mouse_motion(start));
        assert!(!clock.accept_mouse_motion(start + Duration::from_millis(10)));
        assert!(!clock.accept_mouse_motion(start + Duration::from_millis(49)));
        assert!(clock.accept_mouse_motion(start + Duration::from_millis(50)));
        assert!(clock.is_awake(start + Duration::from_millis(50)));
    }

    #[test]
    fn test_active_states() {
        assert!(EmulationState::Stepping.is_active());
        assert!(!EmulationState::Paused.is_active());
        assert!(!EmulationState::Ending.is_active());
    }
}
