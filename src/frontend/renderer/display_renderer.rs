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

//! Display renderer
//!
//! Draws the screen texture to the window surface, letterboxed to keep the
//! television's pixel aspect ratio. The texture itself is filled by
//! [`ScreenTexture`] through the core's tick; this module only draws it.

use super::screen_texture::ScreenTexture;
use crate::frontend::presentation::PIXEL_WIDTH;

/// Placement of the picture within the output surface, in output pixels
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit a picture into an output surface
///
/// Scales the picture as large as it can go without changing its aspect
/// ratio, once horizontal pixels have been stretched by [`PIXEL_WIDTH`], and
/// centres it.
///
/// # Arguments
///
/// * `texture` - Picture size in texels
/// * `output` - Output surface size in pixels
///
/// # Example
///
/// ```
/// use vcsgui::frontend::renderer::fit_viewport;
///
/// // 160x192 at 2:1 pixels is 320x192, which fills a 640x384 window exactly
/// let vp = fit_viewport((160, 192), (640, 384));
/// assert_eq!((vp.x, vp.y, vp.width, vp.height), (0.0, 0.0, 640.0, 384.0));
/// ```
pub fn fit_viewport(texture: (u32, u32), output: (u32, u32)) -> Viewport {
    let content_w = texture.0.max(1) as f32 * PIXEL_WIDTH;
    let content_h = texture.1.max(1) as f32;
    let (out_w, out_h) = (output.0.max(1) as f32, output.1.max(1) as f32);

    let scale = (out_w / content_w).min(out_h / content_h);
    let (width, height) = (content_w * scale, content_h * scale);

    Viewport {
        x: (out_w - width) / 2.0,
        y: (out_h - height) / 2.0,
        width,
        height,
    }
}

fn fragment_entry(binding: u32, ty: wgpu::BindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty,
        count: None,
    }
}

/// Display renderer
///
/// Owns the display pipeline and sampler. The bind group is rebuilt only
/// when the screen texture has been recreated.
///
/// # Examples
///
/// ```no_run
/// use vcsgui::frontend::presentation::View;
/// use vcsgui::frontend::renderer::{DisplayRenderer, ScreenTexture};
///
/// # fn example(device: &wgpu::Device, queue: &wgpu::Queue, output_view: &wgpu::TextureView) {
/// let mut renderer = DisplayRenderer::new(device, wgpu::TextureFormat::Bgra8UnormSrgb);
/// let screen = ScreenTexture::new(device, queue, View::Cropped);
///
/// let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
///     label: Some("Render Encoder"),
/// });
/// renderer.render(&mut encoder, output_view, (640, 480), &screen, device);
/// queue.submit(std::iter::once(encoder.finish()));
/// # }
/// ```
pub struct DisplayRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    /// Point filtering keeps colour clocks sharp
    sampler: wgpu::Sampler,
    /// Bind group for the screen texture instance it was built from
    bound: Option<(u64, wgpu::BindGroup)>,
}

impl DisplayRenderer {
    /// Create a new display renderer
    ///
    /// # Arguments
    ///
    /// * `device` - wgpu device for creating GPU resources
    /// * `surface_format` - Output surface texture format
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Screen Sampler"),
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Display Bind Group Layout"),
            entries: &[
                fragment_entry(
                    0,
                    wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                ),
                fragment_entry(1, wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)),
            ],
        });

        let pipeline = Self::create_pipeline(device, &bind_group_layout, surface_format);
        log::info!("Display renderer initialized for {:?}", surface_format);

        Self {
            pipeline,
            bind_group_layout,
            sampler,
            bound: None,
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/display.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Display Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Display Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(format.into())],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        })
    }

    fn refresh_bind_group(&mut self, device: &wgpu::Device, screen: &ScreenTexture) {
        let Some(texture_view) = screen.texture_view() else {
            self.bound = None;
            return;
        };
        let id = screen.texture_id();
        if self.bound.as_ref().is_none_or(|(bound, _)| *bound != id) {
            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Display Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(texture_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            self.bound = Some((id, group));
        }
    }

    /// Draw the screen texture to the output
    ///
    /// Clears the output to black. Draws nothing more until the screen
    /// texture has received its first frame.
    ///
    /// # Arguments
    ///
    /// * `encoder` - Command encoder for recording GPU commands
    /// * `output_view` - Output texture view to render to
    /// * `output_size` - Output size in pixels, for letterboxing
    /// * `screen` - Texture holding the presented frame
    /// * `device` - wgpu device for the bind group
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        output_size: (u32, u32),
        screen: &ScreenTexture,
        device: &wgpu::Device,
    ) {
        let viewport = fit_viewport(screen.size(), output_size);
        self.refresh_bind_group(device, screen);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Display Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });

        let Some((_, bind_group)) = &self.bound else {
            return;
        };
        pass.set_viewport(viewport.x, viewport.y, viewport.width, viewport.height, 0.0, 1.0);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
