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

//! Screen demo entry point
//!
//! Opens a window and drives a colour bar test card through the screen
//! pipeline. Hotkeys: Space pause, F1 play/debug, L debug layer,
//! O overlay, V vsync, R reset, F11 fullscreen, Esc quit.

use clap::Parser;
use std::path::PathBuf;
use vcsgui::core::SpecId;
use vcsgui::frontend::config::{VisibleWindow, CONFIG_FILE};
use vcsgui::frontend::{AppEvent, Application, GuiConfig, ScreenMode};
use winit::event_loop::EventLoop;

#[derive(Parser, Debug)]
#[command(name = "vcsgui-demo")]
#[command(about = "Atari 2600 screen front-end demo", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Television specification (NTSC, PAL, PAL-M, SECAM)
    #[arg(short, long)]
    spec: Option<SpecId>,

    /// Visible window as TOP..BOTTOM
    #[arg(long)]
    visible: Option<VisibleWindow>,

    /// Frame buffers in the play mode ring
    #[arg(short, long)]
    ring: Option<usize>,

    /// Starting mode (play or debug)
    #[arg(short, long)]
    mode: Option<ScreenMode>,

    /// Do not pace emulation against the display
    #[arg(long)]
    no_vsync: bool,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let mut config = GuiConfig::load_or_default(&args.config)?;
    config.apply_env()?;
    if let Some(spec) = args.spec {
        config.spec = spec;
    }
    if let Some(visible) = args.visible {
        config.visible = Some(visible);
    }
    if let Some(ring) = args.ring {
        config.ring_size = ring;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if args.no_vsync {
        config.vsync = false;
    }
    config.validate()?;

    if args.save_config {
        config.save(&args.config)?;
        log::info!("Saved configuration to {}", args.config.display());
    }

    log::info!("Starting vcsgui demo...");

    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    let mut app = Application::new(config, event_loop.create_proxy());

    log::info!("Running event loop...");
    event_loop.run_app(&mut app)?;

    Ok(())
}
