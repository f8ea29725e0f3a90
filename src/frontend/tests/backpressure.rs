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

//! Two-thread tests: blocking, release, resize round trips and shutdown

use crate::core::error::{GuiError, Result};
use crate::core::renderer::PixelRenderer;
use crate::core::signal::Signal;
use crate::core::specification::{SpecId, Specification};
use crate::frontend::config::GuiConfig;
use crate::frontend::gui::Core;
use crate::frontend::presentation::{Presentation, PresentationGeometry, TextureRenderer, View};
use crate::frontend::scheduler::ScreenMode;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

fn wait_until(mut f: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < TIMEOUT {
        if f() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn core(ring_size: usize) -> Core {
    let config = GuiConfig {
        ring_size,
        ..GuiConfig::default()
    };
    Core::new(&config, None).unwrap()
}

#[test]
fn test_producer_blocks_after_filling_ring() {
    let mut core = core(4);
    let mut sink = core.screen_sink().unwrap();
    let completed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completed);

    let producer = thread::spawn(move || -> Result<()> {
        loop {
            sink.updating_pixels(true);
            sink.set_pixel(Signal::new(100, 100, 0x0e), true)?;
            sink.new_frame(true)?;
            sink.updating_pixels(false);
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    // a four slot ring starting one ahead takes two frames before the third laps
    assert!(core.wait_for_work(TIMEOUT));
    assert_eq!(completed.load(Ordering::SeqCst), 2);
    assert_eq!(core.stats().producer_blocks, 1);

    // a parked producer needs a tick even with no waker to raise the alert
    assert_eq!(core.wait_duration(), Duration::ZERO);

    // one tick frees a slot and releases the producer
    core.tick();
    assert!(wait_until(|| completed.load(Ordering::SeqCst) == 3));

    // and it laps again on the very next frame
    assert!(core.wait_for_work(TIMEOUT));
    assert_eq!(completed.load(Ordering::SeqCst), 3);
    assert_eq!(core.stats().producer_blocks, 2);

    core.shutdown();
    let result = producer.join().unwrap();
    assert!(matches!(result, Err(GuiError::ShutDown)));
}

#[test]
fn test_presented_slot_never_written_while_shown() {
    let mut core = core(3);
    let mut sink = core.screen_sink().unwrap();

    let producer = thread::spawn(move || -> Result<()> {
        let mut color = 0u8;
        loop {
            color = color.wrapping_add(2) & 0x7e;
            sink.updating_pixels(true);
            sink.set_pixel(Signal::new(100, 100, color), true)?;
            sink.updating_pixels(false);
            sink.new_frame(true)?;
        }
    });

    for _ in 0..50 {
        core.wait_for_work(Duration::from_millis(20));
        core.tick();
        let frame = core.presentation();
        let index = frame.render_index();
        let shown = frame.view(View::Uncropped).get(100, 100);

        // between ticks the producer only writes to other slots
        thread::sleep(Duration::from_millis(2));
        let crit = core.screen().lock();
        assert_eq!(crit.slot(index).and_then(|s| s.get(100, 100)), shown);
    }
    assert!(core.stats().producer_blocks > 0);

    core.shutdown();
    assert!(matches!(producer.join().unwrap(), Err(GuiError::ShutDown)));
}

#[test]
fn test_shutdown_wakes_blocked_producer() {
    let mut core = core(2);
    let mut sink = core.screen_sink().unwrap();

    let producer = thread::spawn(move || sink.new_frame(true));
    assert!(core.wait_for_work(TIMEOUT));

    core.shutdown();
    assert!(matches!(producer.join().unwrap(), Err(GuiError::ShutDown)));
}

#[test]
fn test_dropping_core_wakes_blocked_producer() {
    let mut core = core(2);
    let mut sink = core.screen_sink().unwrap();

    let producer = thread::spawn(move || sink.new_frame(true));
    assert!(core.wait_for_work(TIMEOUT));

    drop(core);
    assert!(matches!(producer.join().unwrap(), Err(GuiError::ShutDown)));
}

#[derive(Default)]
struct Sizes(Vec<PresentationGeometry>);

impl TextureRenderer for Sizes {
    fn resize(&mut self, geometry: &PresentationGeometry) {
        self.0.push(*geometry);
    }

    fn render(&mut self, _frame: &Presentation) {}
}

#[test]
fn test_resize_applied_by_render_thread() {
    let mut core = core(4);
    let mut sink = core.screen_sink().unwrap();
    let sizes = Rc::new(RefCell::new(Sizes::default()));
    core.add_texture(Box::new(Rc::clone(&sizes)));
    core.tick();
    let before = sizes.borrow().0.len();
    let generation = core.screen().lock().generation();

    let pal = Specification::get(SpecId::Pal);
    let producer = thread::spawn(move || {
        let result = sink.resize(pal, 48, 276);
        (sink, result)
    });

    assert!(core.wait_for_work(TIMEOUT));
    core.tick();
    let (mut sink, result) = producer.join().unwrap();
    result.unwrap();

    assert_eq!(core.screen().lock().generation(), generation + 1);
    let sizes = sizes.borrow();
    assert_eq!(sizes.0.len(), before + 1);
    let geometry = sizes.0[before];
    assert_eq!(geometry.spec, SpecId::Pal);
    assert_eq!(geometry.view_size(View::Cropped), (160, 228));
    assert_eq!(geometry.frames_per_second, 50.0);

    // the same geometry again needs no render thread
    sink.resize(pal, 48, 276).unwrap();
}

#[test]
fn test_resize_inside_bracket_does_not_deadlock() {
    let mut core = core(4);
    let mut sink = core.screen_sink().unwrap();

    let producer = thread::spawn(move || {
        sink.updating_pixels(true);
        let result = sink.resize(Specification::get(SpecId::Ntsc), 30, 230);
        // the bracket is restored after the round trip
        let still_updating = sink.is_updating();
        sink.updating_pixels(false);
        (result, still_updating)
    });

    assert!(core.wait_for_work(TIMEOUT));
    core.tick();
    let (result, still_updating) = producer.join().unwrap();
    result.unwrap();
    assert!(still_updating);
    assert_eq!(core.screen().lock().window(), (30, 230));
}

#[test]
fn test_resize_times_out_without_render_thread() {
    let config = GuiConfig {
        resize_timeout_ms: 20,
        ..GuiConfig::default()
    };
    let mut core = Core::new(&config, None).unwrap();
    let mut sink = core.screen_sink().unwrap();

    let result = sink.resize(Specification::get(SpecId::Pal), 48, 276);
    assert!(matches!(result, Err(GuiError::ServiceTimeout { .. })));
    drop(core);
}

#[test]
fn test_timed_out_resize_is_not_applied_later() {
    let config = GuiConfig {
        resize_timeout_ms: 20,
        ..GuiConfig::default()
    };
    let mut core = Core::new(&config, None).unwrap();
    let mut sink = core.screen_sink().unwrap();
    let window = core.screen().lock().window();
    let generation = core.screen().lock().generation();

    let result = sink.resize(Specification::get(SpecId::Pal), 48, 276);
    assert!(matches!(result, Err(GuiError::ServiceTimeout { .. })));

    // the abandoned request is skipped once the render thread gets to it
    assert_eq!(core.service(), 0);
    core.tick();
    let crit = core.screen().lock();
    assert_eq!(crit.window(), window);
    assert_eq!(crit.generation(), generation);
    assert_eq!(crit.spec().id, SpecId::Ntsc);
}

#[test]
fn test_mode_change_releases_blocked_producer() {
    let mut core = core(2);
    let mut sink = core.screen_sink().unwrap();

    let producer = thread::spawn(move || {
        sink.new_frame(true)?;
        // debug mode pins both indices, so this frame cannot lap
        sink.new_frame(true)?;
        Ok::<_, GuiError>(sink)
    });
    assert!(core.wait_for_work(TIMEOUT));

    core.set_mode(ScreenMode::Debug);
    core.tick();
    assert!(producer.join().unwrap().is_ok());
    assert_eq!(core.stats().producer_blocks, 1);
}
