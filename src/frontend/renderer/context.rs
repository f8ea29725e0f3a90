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

//! wgpu rendering context
//!
//! Owns the GPU device, queue and window surface. The surface's present mode
//! follows the vsync setting: with vsync on, presenting blocks on the
//! display's refresh and that is what paces the render loop.

use crate::core::error::{GuiError, Result};
use std::sync::Arc;
use winit::window::Window;

/// GPU device, queue and the window surface they draw to
pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    /// Current surface configuration; change it through the methods below
    pub surface_config: wgpu::SurfaceConfiguration,
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    let info = adapter.get_info();
    log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Screen Device"),
            ..Default::default()
        })
        .await
        .map_err(|e| GuiError::Render(format!("Failed to create device: {}", e)))
}

impl RenderContext {
    /// Create a rendering context for a window
    ///
    /// # Arguments
    ///
    /// * `window` - The window to render to
    /// * `vsync` - Present in step with the display refresh
    ///
    /// # Errors
    ///
    /// Returns [`GuiError::Render`] if the surface, adapter or device cannot
    /// be created, or the surface is incompatible with the adapter.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use winit::window::Window;
    /// use vcsgui::frontend::renderer::RenderContext;
    ///
    /// async fn create_context(window: Arc<Window>) -> vcsgui::core::Result<()> {
    ///     let context = RenderContext::new(&window, true).await?;
    ///     assert!(context.vsync());
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(window: &Arc<Window>, vsync: bool) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(Arc::clone(window))
            .map_err(|e| GuiError::Render(format!("Failed to create surface: {}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GuiError::Render(format!("Failed to find suitable GPU adapter: {}", e)))?;
        let (device, queue) = request_device(&adapter).await?;

        let size = window.inner_size();
        let mut surface_config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or_else(|| GuiError::Render("Surface is not supported by the adapter".into()))?;

        // palette colours are sRGB encoded; keep them that way on the way out
        let caps = surface.get_capabilities(&adapter);
        if let Some(format) = caps.formats.iter().copied().find(|f| f.is_srgb()) {
            surface_config.format = format;
        }
        surface_config.present_mode = present_mode(vsync);

        let context = Self {
            device,
            queue,
            surface,
            surface_config,
        };
        context.reconfigure();
        log::info!(
            "Surface {}x{} {:?}, {:?}",
            context.surface_config.width,
            context.surface_config.height,
            context.surface_config.format,
            context.surface_config.present_mode
        );
        Ok(context)
    }

    fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Resize the surface to the window's new inner size
    ///
    /// A zero dimension (minimised window) is ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure();
        log::debug!("Resized surface to {}x{}", width, height);
    }

    /// Switch between presenting in step with the display and presenting
    /// as soon as a frame is ready
    pub fn set_vsync(&mut self, vsync: bool) {
        let mode = present_mode(vsync);
        if self.surface_config.present_mode != mode {
            self.surface_config.present_mode = mode;
            self.reconfigure();
            log::debug!("Present mode: {:?}", mode);
        }
    }

    pub fn vsync(&self) -> bool {
        self.surface_config.present_mode == wgpu::PresentMode::Fifo
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}

/// Present mode for a vsync setting
///
/// Fifo is the only mode every backend must support; without vsync wgpu picks
/// the best available non-blocking mode.
pub fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_mode_follows_vsync() {
        assert_eq!(present_mode(true), wgpu::PresentMode::Fifo);
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
    }
}
