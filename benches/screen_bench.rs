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

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use vcsgui::core::renderer::PixelRenderer;
use vcsgui::core::signal::Signal;
use vcsgui::core::specification::{SpecId, Specification};
use vcsgui::core::test_card::TestCard;
use vcsgui::frontend::{Core, GuiConfig};

fn unpaced_core() -> Core {
    let config = GuiConfig {
        vsync: false,
        ..GuiConfig::default()
    };
    Core::new(&config, None).unwrap()
}

fn benchmark_plotting(c: &mut Criterion) {
    let mut core = unpaced_core();
    let mut sink = core.screen_sink().unwrap();
    let scanline: Vec<Signal> = (0..228u16).map(|clock| Signal::new(clock, 100, 0x1e)).collect();

    c.bench_function("set_pixels_scanline", |b| {
        b.iter(|| {
            sink.updating_pixels(true);
            sink.set_pixels(black_box(&scanline), true).unwrap();
            sink.updating_pixels(false);
        })
    });

    let mut card = TestCard::new(Specification::get(SpecId::Ntsc));
    c.bench_function("test_card_frame", |b| b.iter(|| card.run_frame(&mut sink).unwrap()));

    core.shutdown();
}

fn benchmark_render_tick(c: &mut Criterion) {
    let mut core = unpaced_core();
    let mut sink = core.screen_sink().unwrap();
    let mut card = TestCard::new(Specification::get(SpecId::Ntsc));
    card.run_frame(&mut sink).unwrap();

    c.bench_function("core_tick", |b| b.iter(|| black_box(core.tick())));
}

criterion_group!(benches, benchmark_plotting, benchmark_render_tick);
criterion_main!(benches);
