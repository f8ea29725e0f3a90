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

//! Screen texture management
//!
//! GPU copy of one view of the presented frame. Registered with the
//! [`Core`](crate::frontend::Core) as a [`TextureRenderer`], so it is resized
//! whenever the screen geometry changes and refilled once per tick.

use crate::frontend::presentation::{Presentation, PresentationGeometry, TextureRenderer, View};
use crate::frontend::screen::frame_buffer::BYTES_PER_PIXEL;

/// Texture format of uploaded frames
///
/// Palette colours are sRGB encoded.
pub const SCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Texture size for a view of a geometry, never zero in either dimension
///
/// # Example
///
/// ```
/// use vcsgui::core::specification::{SpecId, Specification};
/// use vcsgui::frontend::presentation::View;
/// use vcsgui::frontend::renderer::texture_size;
/// use vcsgui::frontend::screen::ScreenCrit;
/// use vcsgui::frontend::ScreenMode;
///
/// let crit = ScreenCrit::new(Specification::get(SpecId::Ntsc), 40, 232, 4, ScreenMode::Play, true)?;
/// assert_eq!(texture_size(&crit.geometry(), View::Cropped), (160, 192));
/// assert_eq!(texture_size(&crit.geometry(), View::Uncropped), (228, 263));
/// # Ok::<(), vcsgui::core::GuiError>(())
/// ```
pub fn texture_size(geometry: &PresentationGeometry, view: View) -> (u32, u32) {
    let (width, height) = geometry.view_size(view);
    (width.max(1) as u32, height.max(1) as u32)
}

/// Screen texture wrapper
///
/// The texture is created lazily on the first frame after a resize.
pub struct ScreenTexture {
    device: wgpu::Device,
    queue: wgpu::Queue,
    view: View,
    size: (u32, u32),
    texture: Option<(wgpu::Texture, wgpu::TextureView)>,
    /// Bumped each time the texture is recreated
    texture_id: u64,
    /// Reused upload buffer
    staging: Vec<u8>,
}

impl ScreenTexture {
    /// Create a screen texture for one view
    ///
    /// # Arguments
    ///
    /// * `device` - wgpu device for creating GPU resources
    /// * `queue` - wgpu queue for uploads
    /// * `view` - Which image of the presented frame to show
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, view: View) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            view,
            size: (1, 1),
            texture: None,
            texture_id: 0,
            staging: Vec::new(),
        }
    }

    /// Show a different view from the next frame on
    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Texture size in texels
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Texture view for binding to shaders, once a frame has been uploaded
    pub fn texture_view(&self) -> Option<&wgpu::TextureView> {
        self.texture.as_ref().map(|(_, view)| view)
    }

    /// Identifies the current texture; anything bound to an older one is stale
    pub fn texture_id(&self) -> u64 {
        self.texture_id
    }

    fn create(&mut self) {
        let (width, height) = self.size;
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Screen Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCREEN_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("Created {}x{} screen texture ({:?})", width, height, self.view);
        self.texture = Some((texture, view));
        self.texture_id += 1;
    }
}

impl TextureRenderer for ScreenTexture {
    fn resize(&mut self, geometry: &PresentationGeometry) {
        self.size = texture_size(geometry, self.view);
        self.texture = None;
    }

    fn render(&mut self, frame: &Presentation) {
        let (width, height) = frame.copy_into(self.view, &mut self.staging);
        if width == 0 || height == 0 {
            return;
        }
        let size = (width as u32, height as u32);
        if size != self.size {
            self.size = size;
            self.texture = None;
        }
        if self.texture.is_none() {
            self.create();
        }
        let Some((texture, _)) = &self.texture else {
            return;
        };

        self.queue.write_texture(
            texture.as_image_copy(),
            &self.staging,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.0 * BYTES_PER_PIXEL as u32),
                rows_per_image: Some(size.1),
            },
            wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
        );
    }
}
