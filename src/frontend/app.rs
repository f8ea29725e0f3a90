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

//! Screen application
//!
//! Window, event loop and GPU presentation around a [`Core`]. The winit event
//! loop is the render thread: every `about_to_wait` runs one core tick, and
//! the polling clock decides how long the loop sleeps before the next one.
//! Other threads wake it early through an [`AppEvent::Wake`] user event.

use crate::core::error::{GuiError, Result};
use crate::core::test_card::TestCard;
use crate::frontend::config::GuiConfig;
use crate::frontend::emulation::EmulationThread;
use crate::frontend::frame_timer::RateMeter;
use crate::frontend::gui::Core;
use crate::frontend::polling::EmulationState;
use crate::frontend::presentation::{View, WindowScale};
use crate::frontend::renderer::{DisplayRenderer, RenderContext, ScreenTexture};
use crate::frontend::scheduler::ScreenMode;
use crate::frontend::service::Waker;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// How often the window title's statistics are refreshed
const TITLE_INTERVAL: Duration = Duration::from_secs(1);

/// Events other threads post to the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The render loop has work; stop waiting
    Wake,
}

/// Build a [`Waker`] that posts [`AppEvent::Wake`] to an event loop
pub fn proxy_waker(proxy: EventLoopProxy<AppEvent>) -> Waker {
    let proxy = Mutex::new(proxy);
    Arc::new(move || {
        // the loop has exited if this fails; nothing left to wake
        let _ = proxy.lock().send_event(AppEvent::Wake);
    })
}

/// View shown by default in a mode
pub fn default_view(mode: ScreenMode) -> View {
    match mode {
        ScreenMode::Play => View::Cropped,
        ScreenMode::Debug => View::Uncropped,
    }
}

/// Screen application
///
/// Owns the window, the GPU context and the [`Core`], and starts a demo
/// [`EmulationThread`] driving a test card into the screen.
pub struct Application {
    config: GuiConfig,
    waker: Option<Waker>,
    /// The application window
    window: Option<Arc<Window>>,
    /// wgpu rendering context
    render_context: Option<RenderContext>,
    display_renderer: Option<DisplayRenderer>,
    /// Shared with the core, which fills it every tick
    screen_texture: Option<Rc<RefCell<ScreenTexture>>>,
    core: Option<Core>,
    emulation: Option<EmulationThread>,
    /// Measures ticks that reached the screen
    present_rate: RateMeter,
    scale: WindowScale,
    view: View,
    last_title: Instant,
}

impl Application {
    /// Create a new application
    ///
    /// # Arguments
    ///
    /// * `config` - Validated front-end settings
    /// * `proxy` - Proxy of the event loop the application will run on
    ///
    /// # Example
    ///
    /// ```no_run
    /// use winit::event_loop::EventLoop;
    /// use vcsgui::frontend::{AppEvent, Application, GuiConfig};
    ///
    /// let event_loop = EventLoop::<AppEvent>::with_user_event().build().unwrap();
    /// let mut app = Application::new(GuiConfig::default(), event_loop.create_proxy());
    /// event_loop.run_app(&mut app).unwrap();
    /// ```
    pub fn new(config: GuiConfig, proxy: EventLoopProxy<AppEvent>) -> Self {
        let scale = WindowScale::new(config.scale_for(config.mode));
        let view = default_view(config.mode);

        Self {
            config,
            waker: Some(proxy_waker(proxy)),
            window: None,
            render_context: None,
            display_renderer: None,
            screen_texture: None,
            core: None,
            emulation: None,
            present_rate: RateMeter::new(),
            scale,
            view,
            last_title: Instant::now(),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut core = Core::new(&self.config, self.waker.clone())?;
        let geometry = *core.presentation().geometry();
        let (width, height) = self.scale.display_size(&geometry, self.view);

        let window_attributes = Window::default_attributes()
            .with_title("vcsgui")
            .with_inner_size(LogicalSize::new(width, height))
            .with_resizable(true);
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .map_err(|e| GuiError::Render(format!("Failed to create window: {}", e)))?,
        );

        let render_context = pollster::block_on(RenderContext::new(&window, self.config.vsync))?;
        let display_renderer =
            DisplayRenderer::new(&render_context.device, render_context.surface_config.format);
        let screen_texture = Rc::new(RefCell::new(ScreenTexture::new(
            &render_context.device,
            &render_context.queue,
            self.view,
        )));
        core.add_texture(Box::new(Rc::clone(&screen_texture)));

        let refresh_rate = self.config.refresh_rate.or_else(|| {
            window
                .current_monitor()
                .and_then(|m| m.refresh_rate_millihertz())
                .map(|mhz| mhz as f32 / 1000.0)
        });
        log::info!("Display refresh rate: {:?}Hz", refresh_rate);
        core.set_refresh_rate(refresh_rate);

        let (top, bottom) = self.config.visible_window();
        let card = TestCard::with_window(self.config.specification(), top, bottom).with_reflection(true);
        let emulation =
            EmulationThread::spawn(core.screen_sink()?, card, core.feature_sender()).map_err(GuiError::Spawn)?;

        self.window = Some(window);
        self.render_context = Some(render_context);
        self.display_renderer = Some(display_renderer);
        self.screen_texture = Some(screen_texture);
        self.core = Some(core);
        self.emulation = Some(emulation);

        log::info!("Application initialized successfully");
        Ok(())
    }

    /// Toggle pause/resume emulation
    pub fn toggle_pause(&mut self) {
        if let Some(emulation) = &self.emulation {
            let paused = !emulation.is_paused();
            emulation.set_paused(paused);
            log::info!("Emulation {}", if paused { "paused" } else { "resumed" });
        }
    }

    /// Switch between play and debug presentation
    pub fn toggle_mode(&mut self) {
        let Some(core) = &mut self.core else {
            return;
        };
        let mode = match core.mode() {
            ScreenMode::Play => ScreenMode::Debug,
            ScreenMode::Debug => ScreenMode::Play,
        };
        core.set_mode(mode);
        self.scale.set_scale(self.config.scale_for(mode));
        self.set_view(default_view(mode));
    }

    /// Cycle the debug view between pixels, element colours and the overlay
    pub fn cycle_debug_view(&mut self) {
        if self.core.as_ref().map(Core::mode) != Some(ScreenMode::Debug) {
            return;
        }
        let view = match self.view {
            View::Uncropped => View::Elements,
            View::Elements => View::Overlay,
            _ => View::Uncropped,
        };
        self.set_view(view);
    }

    fn set_view(&mut self, view: View) {
        self.view = view;
        if let Some(texture) = &self.screen_texture {
            texture.borrow_mut().set_view(view);
        }
        if let (Some(window), Some(core)) = (&self.window, &self.core) {
            let (width, height) = self.scale.display_size(core.presentation().geometry(), view);
            let _ = window.request_inner_size(LogicalSize::new(width, height));
        }
    }

    pub fn toggle_vsync(&mut self) {
        if let (Some(core), Some(render_context)) = (&mut self.core, &mut self.render_context) {
            let vsync = !render_context.vsync();
            render_context.set_vsync(vsync);
            core.set_vsync(vsync);
        }
    }

    pub fn cycle_overlay(&mut self) {
        if let Some(core) = &mut self.core {
            let overlay = core.presentation().overlay().next();
            log::info!("Overlay: {:?}", overlay);
            core.set_overlay(overlay);
        }
    }

    /// Clear the screen before the next emulated frame
    pub fn reset(&mut self) {
        if let Some(emulation) = &self.emulation {
            emulation.request_reset();
            log::info!("Screen reset");
        }
    }

    /// Toggle fullscreen mode
    pub fn toggle_fullscreen(&mut self) {
        if let Some(window) = &self.window {
            if window.fullscreen().is_some() {
                window.set_fullscreen(None);
                log::info!("Switched to windowed mode");
            } else {
                window.set_fullscreen(Some(winit::window::Fullscreen::Borderless(None)));
                log::info!("Switched to fullscreen mode");
            }
        }
    }

    /// Release the emulation thread and wait for it to finish
    fn shutdown(&mut self) {
        if let Some(core) = &mut self.core {
            core.shutdown();
        }
        if let Some(mut emulation) = self.emulation.take() {
            emulation.stop();
        }
    }

    fn update_title(&mut self) {
        if self.last_title.elapsed() < TITLE_INTERVAL {
            return;
        }
        self.last_title = Instant::now();
        if let (Some(window), Some(core)) = (&self.window, &self.core) {
            let stats = core.stats();
            window.set_title(&format!(
                "vcsgui - {} {} - {:.1} fps - {} blocks, {} rollbacks",
                self.config.spec,
                core.mode(),
                self.present_rate.rate(),
                stats.producer_blocks,
                stats.render_rollbacks
            ));
        }
    }

    fn render(&mut self) -> Result<()> {
        let render_context = self
            .render_context
            .as_mut()
            .ok_or_else(|| GuiError::Render("Render context not initialized".into()))?;
        let display_renderer = self
            .display_renderer
            .as_mut()
            .ok_or_else(|| GuiError::Render("Display renderer not initialized".into()))?;
        let screen_texture = self
            .screen_texture
            .as_ref()
            .ok_or_else(|| GuiError::Render("Screen texture not initialized".into()))?;

        // Get the next frame, handling common surface errors gracefully
        let output = match render_context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                let (width, height) = render_context.size();
                render_context.resize(width, height);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout while acquiring frame");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(GuiError::Render(
                    "Surface out of memory while acquiring frame".into(),
                ));
            }
            Err(e) => {
                log::error!("Unexpected surface error: {:?}", e);
                return Err(GuiError::Render(format!("Failed to get surface texture: {:?}", e)));
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            render_context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

        display_renderer.render(
            &mut encoder,
            &view,
            render_context.size(),
            &screen_texture.borrow(),
            &render_context.device,
        );

        render_context
            .queue
            .submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl ApplicationHandler<AppEvent> for Application {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                log::error!("Failed to start: {}", e);
                self.shutdown();
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Wake => {
                if let Some(core) = &mut self.core {
                    core.polling_mut().alert();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(render_context) = &mut self.render_context {
                    render_context.resize(physical_size.width, physical_size.height);
                }
                if let (Some(window), Some(core)) = (&self.window, &self.core) {
                    let logical = physical_size.to_logical::<f32>(window.scale_factor());
                    self.scale
                        .fit(core.presentation().geometry(), self.view, (logical.width, logical.height));
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(core) = &mut self.core {
                    if core.polling_mut().accept_mouse_motion(Instant::now()) {
                        log::trace!("Cursor at {:.0},{:.0}", position.x, position.y);
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(core) = &mut self.core {
                    core.polling_mut().note_event(Instant::now());
                }
                if !event.state.is_pressed() || event.repeat {
                    return;
                }
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    match key_code {
                        KeyCode::Space => self.toggle_pause(),
                        KeyCode::F1 => self.toggle_mode(),
                        KeyCode::KeyL => self.cycle_debug_view(),
                        KeyCode::KeyO => self.cycle_overlay(),
                        KeyCode::KeyV => self.toggle_vsync(),
                        KeyCode::KeyR => self.reset(),
                        KeyCode::F11 => self.toggle_fullscreen(),
                        KeyCode::Escape => {
                            self.shutdown();
                            event_loop.exit();
                        }
                        _ => {}
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    log::error!("Render error: {}", e);
                    self.shutdown();
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(core) = &mut self.core else {
            return;
        };

        if self.emulation.as_ref().is_some_and(EmulationThread::is_finished)
            && core.polling().state() != EmulationState::Ending
        {
            core.set_emulation_state(EmulationState::Ending);
        }

        let now = Instant::now();
        if core.tick_due(now) {
            core.tick();
            self.present_rate.record(now);
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }

        let next = core.next_tick();
        self.update_title();

        event_loop.set_control_flow(ControlFlow::WaitUntil(next));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
