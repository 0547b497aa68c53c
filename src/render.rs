//! Primary scene renderers.
//!
//! A frame walks the visible part of the scene graph once and groups meshes
//! by `(geometry, material)` into [`Batch`]es, so the 1000 particles that share
//! one geometry and one material go out in a single instanced draw. Opaque
//! batches are drawn before transparent ones.
//!
//! - [`SceneRenderer`] is the seam the viewer context talks to
//! - [`WgpuRenderer`] draws to a window or canvas surface
//! - [`HeadlessRenderer`] does all the CPU-side work without a GPU

use std::{collections::HashMap, sync::Arc};

use wgpu::util::DeviceExt;

use crate::{
    camera::{CameraUniform, PerspectiveCamera},
    config::RendererOptions,
    data_structures::{
        geometry::Geometry,
        instance::InstanceRaw,
        material::Material,
        scene_graph::{NodeKind, Scene},
    },
    error::{Result, ViewerError},
    pipelines::{
        DEPTH_FORMAT, Pipelines, Program,
        light::{self, LightUniform},
        material::{GpuMaterial, GpuTexture, create_default_sampler},
    },
    resources::{ResourceKind, ResourceTracker},
};

/// Everything the viewer needs from a primary renderer.
///
/// Sizes are logical pixels (CSS pixels on the web). The drawing buffer is
/// that size times the pixel ratio.
pub trait SceneRenderer {
    /// Resizes the viewport. Zero is clamped to one.
    fn set_size(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    /// Sets drawing-buffer pixels per logical pixel and resizes the buffer.
    fn set_pixel_ratio(&mut self, ratio: f64);

    fn pixel_ratio(&self) -> f64;

    /// Size of the drawing buffer in physical pixels.
    fn drawing_buffer_size(&self) -> (u32, u32) {
        physical_size(self.size(), self.pixel_ratio())
    }

    /// Requests a clear at the start of the next `render`. Without it, and
    /// with `auto_clear` off, `render` draws over the previous contents.
    fn clear(&mut self);

    /// Draws `scene` as seen from `camera`.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()>;
}

/// Scales a logical size by `ratio`, rounding to whole pixels of at least one.
pub fn physical_size((width, height): (u32, u32), ratio: f64) -> (u32, u32) {
    let scale = |v: u32| ((v.max(1) as f64 * ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

fn valid_ratio(ratio: f64, fallback: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        log::warn!("ignoring pixel ratio {ratio}, keeping {fallback}");
        fallback
    }
}

/// Meshes sharing a geometry and material, drawn with one instanced call.
#[derive(Debug)]
pub struct Batch<'a> {
    pub geometry: &'a Arc<Geometry>,
    pub material: &'a Arc<Material>,
    pub instances: Vec<InstanceRaw>,
}

/// Groups the visible meshes of `scene`, opaque batches first.
///
/// Nodes whose geometry or material has already been disposed are skipped.
/// Multi-material nodes are drawn with their first material.
pub fn collect_batches(scene: &Scene) -> Vec<Batch<'_>> {
    let mut batches: Vec<Batch<'_>> = Vec::new();
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut skipped = 0usize;

    scene.traverse_visible_with_world(&mut |node, world| {
        if node.kind != NodeKind::Mesh {
            return;
        }
        let (Some(geometry), Some(material)) = (
            node.geometry.as_ref(),
            node.material.as_ref().and_then(|slot| slot.primary()),
        ) else {
            return;
        };
        if geometry.handle.is_disposed() || material.handle.is_disposed() {
            skipped += 1;
            return;
        }
        let key = (geometry.handle.id(), material.handle.id());
        let i = *index.entry(key).or_insert_with(|| {
            batches.push(Batch {
                geometry,
                material,
                instances: Vec::new(),
            });
            batches.len() - 1
        });
        batches[i].instances.push(world.to_raw());
    });

    if skipped > 0 {
        log::warn!("{skipped} meshes reference disposed resources and were not drawn");
    }
    // stable, so first-seen order survives within each group
    batches.sort_by_key(|batch| batch.material.is_transparent());
    batches
}

/// Renderer without a GPU. It runs the same traversal, batching and release
/// handling as [`WgpuRenderer`] and records what it would have drawn.
#[derive(Debug)]
pub struct HeadlessRenderer {
    width: u32,
    height: u32,
    pixel_ratio: f64,
    options: RendererOptions,
    tracker: ResourceTracker,
    clear_requested: bool,
    frames: u64,
    clears: u64,
    last_draw_calls: usize,
    last_instances: usize,
    freed: usize,
}

impl HeadlessRenderer {
    pub fn new(options: RendererOptions, tracker: ResourceTracker, width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixel_ratio: valid_ratio(options.pixel_ratio.unwrap_or(1.0), 1.0),
            options,
            tracker,
            clear_requested: false,
            frames: 0,
            clears: 0,
            last_draw_calls: 0,
            last_instances: 0,
            freed: 0,
        }
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Number of completed `render` calls.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of renders that started by clearing the target.
    pub fn clears(&self) -> u64 {
        self.clears
    }

    pub fn last_draw_calls(&self) -> usize {
        self.last_draw_calls
    }

    pub fn last_instance_count(&self) -> usize {
        self.last_instances
    }

    /// Released handles picked up from the tracker so far.
    pub fn freed(&self) -> usize {
        self.freed
    }
}

impl SceneRenderer for HeadlessRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = valid_ratio(ratio, self.pixel_ratio);
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn clear(&mut self) {
        self.clear_requested = true;
    }

    fn render(&mut self, scene: &Scene, _camera: &PerspectiveCamera) -> Result<()> {
        if self.options.auto_clear || std::mem::take(&mut self.clear_requested) {
            self.clears += 1;
        }
        self.freed += self.tracker.drain_released().len();
        let batches = collect_batches(scene);
        self.last_draw_calls = batches.len();
        self.last_instances = batches.iter().map(|b| b.instances.len()).sum();
        self.frames += 1;
        Ok(())
    }
}

#[derive(Debug)]
struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

#[derive(Debug)]
struct CachedMaterial {
    gpu: GpuMaterial,
    /// Texture bound as base map, if any.
    map_id: Option<u64>,
}

fn create_target_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    format: wgpu::TextureFormat,
    sample_count: u32,
    label: &str,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Draws the scene into a wgpu surface.
#[derive(Debug)]
pub struct WgpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    options: RendererOptions,
    width: u32,
    height: u32,
    pixel_ratio: f64,
    clear_requested: bool,
    sample_count: u32,
    tracker: ResourceTracker,
    pipelines: Pipelines,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    sampler: wgpu::Sampler,
    white: GpuTexture,
    geometries: HashMap<u64, GpuGeometry>,
    textures: HashMap<u64, GpuTexture>,
    materials: HashMap<u64, CachedMaterial>,
}

impl WgpuRenderer {
    /// Sets up the device, surface and pipelines for `target`.
    ///
    /// `(width, height)` is the logical viewport size. `scale_factor` is the
    /// device pixel ratio reported by the window; it is overridden by
    /// `options.pixel_ratio` when set.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        (width, height): (u32, u32),
        scale_factor: f64,
        options: RendererOptions,
        tracker: ResourceTracker,
    ) -> Result<Self> {
        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| ViewerError::Gpu(format!("surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::Gpu(format!("adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("viewer device"),
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .map_err(|e| ViewerError::Gpu(format!("device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        // the shader writes linear colour and relies on an sRGB target
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| ViewerError::Gpu("surface reports no formats".into()))?;

        let wanted_alpha: &[wgpu::CompositeAlphaMode] = if options.alpha {
            &[
                wgpu::CompositeAlphaMode::PreMultiplied,
                wgpu::CompositeAlphaMode::PostMultiplied,
            ]
        } else {
            &[wgpu::CompositeAlphaMode::Opaque]
        };
        let alpha_mode = wanted_alpha
            .iter()
            .copied()
            .find(|mode| surface_caps.alpha_modes.contains(mode))
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        if options.alpha && alpha_mode == wgpu::CompositeAlphaMode::Auto {
            log::warn!("surface cannot composite with alpha, the canvas will be opaque");
        }

        let sample_count = {
            let wanted = options.sample_count();
            let flags = adapter.get_texture_format_features(format).flags;
            if wanted > 1 && !flags.sample_count_supported(wanted) {
                log::warn!("{wanted}x MSAA is not supported for {format:?}, antialiasing disabled");
                1
            } else {
                wanted
            }
        };

        let (width, height) = (width.max(1), height.max(1));
        let pixel_ratio = valid_ratio(options.pixel_ratio.unwrap_or(scale_factor), 1.0);
        let (buffer_width, buffer_height) = physical_size((width, height), pixel_ratio);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: buffer_width,
            height: buffer_height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let pipelines = Pipelines::new(&device, format, sample_count);
        tracker.set_programs(pipelines.count());

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipelines.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let light_buffer = light::mk_buffer(&device, LightUniform::new(&[]));
        let light_bind_group =
            light::mk_bind_group(&device, &pipelines.light_layout, &light_buffer);

        let depth_view = create_target_view(&device, &config, DEPTH_FORMAT, sample_count, "depth");
        let msaa_view = (sample_count > 1)
            .then(|| create_target_view(&device, &config, format, sample_count, "msaa colour"));

        let sampler = create_default_sampler(&device);
        let white = GpuTexture::white(&device, &queue);

        log::info!(
            "renderer ready: {}x{} at pixel ratio {pixel_ratio} {:?}, {sample_count}x MSAA, alpha {:?}",
            config.width,
            config.height,
            format,
            alpha_mode
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            options,
            width,
            height,
            pixel_ratio,
            clear_requested: false,
            sample_count,
            tracker,
            pipelines,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            light_buffer,
            light_bind_group,
            depth_view,
            msaa_view,
            sampler,
            white,
            geometries: HashMap::new(),
            textures: HashMap::new(),
            materials: HashMap::new(),
        })
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Sizes the surface to the logical size times the pixel ratio.
    fn apply_size(&mut self) {
        let (width, height) = physical_size((self.width, self.height), self.pixel_ratio);
        if (width, height) == (self.config.width, self.config.height) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_target_view(
            &self.device,
            &self.config,
            DEPTH_FORMAT,
            self.sample_count,
            "depth",
        );
        if self.sample_count > 1 {
            self.msaa_view = Some(create_target_view(
                &self.device,
                &self.config,
                self.config.format,
                self.sample_count,
                "msaa colour",
            ));
        }
    }

    /// Destroys the GPU copies of everything disposed since the last frame.
    fn free_released(&mut self) {
        let released = self.tracker.drain_released();
        if released.is_empty() {
            return;
        }
        for (kind, id) in &released {
            match kind {
                ResourceKind::Geometry => {
                    if let Some(geometry) = self.geometries.remove(id) {
                        geometry.vertex_buffer.destroy();
                        geometry.index_buffer.destroy();
                    }
                }
                ResourceKind::Material => {
                    if let Some(material) = self.materials.remove(id) {
                        material.gpu.buffer.destroy();
                    }
                }
                ResourceKind::Texture => {
                    if let Some(texture) = self.textures.remove(id) {
                        texture.texture.destroy();
                    }
                    // bind groups still pointing at the texture have to be rebuilt
                    self.materials.retain(|_, m| m.map_id != Some(*id));
                }
            }
        }
        log::debug!("freed {} GPU resources", released.len());
    }

    fn prepare(&mut self, batch: &Batch<'_>) {
        let geometry = batch.geometry;
        self.geometries
            .entry(geometry.handle.id())
            .or_insert_with(|| GpuGeometry {
                vertex_buffer: self.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} vertex buffer", geometry.name)),
                        contents: bytemuck::cast_slice(&geometry.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    },
                ),
                index_buffer: self.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} index buffer", geometry.name)),
                        contents: bytemuck::cast_slice(&geometry.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    },
                ),
                num_elements: geometry.num_elements(),
            });

        let material = batch.material;
        if self.materials.contains_key(&material.handle.id()) {
            return;
        }
        let map = material
            .maps
            .map
            .as_ref()
            .filter(|texture| !texture.handle.is_disposed());
        if let Some(texture) = map {
            self.textures
                .entry(texture.handle.id())
                .or_insert_with(|| GpuTexture::upload(&self.device, &self.queue, texture));
        }
        let view = map
            .and_then(|texture| self.textures.get(&texture.handle.id()))
            .map(|gpu| &gpu.view)
            .unwrap_or(&self.white.view);
        let gpu = GpuMaterial::new(
            &self.device,
            &self.pipelines.material_layout,
            material,
            view,
            &self.sampler,
        );
        self.materials.insert(
            material.handle.id(),
            CachedMaterial {
                gpu,
                map_id: map.map(|texture| texture.handle.id()),
            },
        );
    }
}

impl SceneRenderer for WgpuRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.apply_size();
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = valid_ratio(ratio, self.pixel_ratio);
        self.apply_size();
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn clear(&mut self) {
        self.clear_requested = true;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        self.free_released();

        let batches = collect_batches(scene);
        for batch in &batches {
            self.prepare(batch);
        }

        self.camera_uniform.update_view_proj(camera);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        self.queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::cast_slice(&[LightUniform::new(&scene.lights())]),
        );

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring the next frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let cleared = self.options.auto_clear || std::mem::take(&mut self.clear_requested);
        let (colour_load, depth_load) = if cleared {
            (wgpu::LoadOp::Clear(self.options.clear_colour), wgpu::LoadOp::Clear(1.0))
        } else {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        };

        let instance_buffers: Vec<wgpu::Buffer> = batches
            .iter()
            .map(|batch| {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Instance Buffer"),
                        contents: bytemuck::cast_slice(&batch.instances),
                        usage: wgpu::BufferUsages::VERTEX,
                    })
            })
            .collect();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let (colour_view, resolve_target) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: colour_view,
                    resolve_target,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: colour_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            render_pass.set_bind_group(1, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(2, &self.light_bind_group, &[]);

            let mut transparent = false;
            render_pass.set_pipeline(self.pipelines.get(Program::Opaque));
            for (batch, instances) in batches.iter().zip(&instance_buffers) {
                let (Some(geometry), Some(material)) = (
                    self.geometries.get(&batch.geometry.handle.id()),
                    self.materials.get(&batch.material.handle.id()),
                ) else {
                    continue;
                };
                if batch.material.is_transparent() && !transparent {
                    transparent = true;
                    render_pass.set_pipeline(self.pipelines.get(Program::Transparent));
                }
                render_pass.set_bind_group(0, &material.gpu.bind_group, &[]);
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, instances.slice(..));
                render_pass
                    .set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(
                    0..geometry.num_elements,
                    0,
                    0..batch.instances.len() as u32,
                );
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
