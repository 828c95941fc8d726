use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::util::DeviceExt;
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::config::Configuration;
use crate::events::{NavKey, SlideshowEvent, ViewerEvent};
use crate::manifest::ArtworkManifest;
use crate::render::fade::{Crossfade, FadeAlphas};
use crate::render::layout::compute_ndc_scale;
use crate::render::loader::{LoadOutcome, LoaderMsg, spawn_loader};
use crate::slideshow::Slideshow;

/// How often to look for decoded images while one is outstanding.
const LOADER_POLL: Duration = Duration::from_millis(16);

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD: [Vertex; 4] = [
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    },
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    },
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    },
];

/// Matches `Layer` in artwork.wgsl.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct LayerUniform {
    scale: [f32; 2],
    alpha: f32,
    _pad: f32,
}

/// Arrow keys navigate; everything else is ignored by the controller.
pub fn nav_key_for(key: &Key) -> Option<NavKey> {
    match key {
        Key::Named(NamedKey::ArrowRight) => Some(NavKey::Next),
        Key::Named(NamedKey::ArrowLeft) => Some(NavKey::Previous),
        _ => None,
    }
}

/// What a newly shown entry needs from the rendering surface. The surface is
/// keyed by image locator, not by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceChange {
    /// Already displayed; drop any outstanding load.
    Unchanged,
    /// Already being decoded or waiting for the current fade.
    Pending,
    Load,
}

fn surface_change(displayed: Option<&str>, pending: Option<&str>, next: &str) -> SurfaceChange {
    if pending == Some(next) {
        SurfaceChange::Pending
    } else if displayed == Some(next) {
        SurfaceChange::Unchanged
    } else {
        SurfaceChange::Load
    }
}

/// A decoded image is only promoted once the running fade has settled, so a
/// layer is never replaced while it is still partly visible.
fn fade_settled(fade: Option<&Crossfade>, now: Instant) -> bool {
    fade.is_none_or(|fade| fade.is_finished(now))
}

fn is_quit_key(key: &Key) -> bool {
    match key {
        Key::Named(NamedKey::Escape) => true,
        Key::Character(c) => c.eq_ignore_ascii_case("q"),
        _ => false,
    }
}

fn srgb_to_linear(c: u8) -> f64 {
    (f64::from(c) / 255.0).powf(2.2)
}

/// One textured quad; the viewer keeps two and swaps them on every transition.
struct Layer {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
    alpha: f32,
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vbuf: wgpu::Buffer,
    clear: wgpu::Color,
    placeholder: [u8; 4],
    max_texture_dim: u32,
    layers: [Layer; 2],
    front: usize,
}

impl Gpu {
    fn new(window: Arc<Window>, background: [u8; 3]) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .unwrap_or(caps.formats[0]);

        let limits = adapter.limits();
        let max_texture_dim = limits.max_texture_dimension_2d;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("slideshow-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("artwork-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("artwork-quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("artwork-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/artwork.wgsl").into()),
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("artwork-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("artwork-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("artwork-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let [r, g, b] = background;
        let placeholder = [r, g, b, 255];
        let make_layer = |label: &str| {
            let uniform = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<LayerUniform>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let view = upload_texture(&device, &queue, &placeholder, 1, 1);
            let bind_group = make_bind_group(&device, &bind_layout, &view, &sampler, &uniform);
            Layer {
                uniform,
                bind_group,
                size: (1, 1),
                alpha: 0.0,
            }
        };
        let layers = [make_layer("layer-a"), make_layer("layer-b")];

        let gpu = Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            bind_layout,
            sampler,
            vbuf,
            clear: wgpu::Color {
                r: srgb_to_linear(r),
                g: srgb_to_linear(g),
                b: srgb_to_linear(b),
                a: 1.0,
            },
            placeholder,
            max_texture_dim,
            layers,
            front: 0,
        };
        gpu.write_uniforms();
        Ok(gpu)
    }

    fn back(&self) -> usize {
        self.front ^ 1
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.write_uniforms();
        debug!(
            width = self.config.width,
            height = self.config.height,
            "viewer surface resized",
        );
    }

    /// Promote a new image to the front layer. The old front becomes the
    /// outgoing layer and keeps its current opacity, which is returned.
    fn present_new(&mut self, size: (u32, u32), pixels: &[u8]) -> f32 {
        let outgoing_from = self.layers[self.front].alpha;
        self.front = self.back();
        let front = self.front;
        let back = self.back();

        let view = upload_texture(&self.device, &self.queue, pixels, size.0, size.1);
        let layer = &mut self.layers[front];
        layer.bind_group = make_bind_group(
            &self.device,
            &self.bind_layout,
            &view,
            &self.sampler,
            &layer.uniform,
        );
        layer.size = size;
        layer.alpha = 0.0;
        self.layers[back].alpha = outgoing_from;
        self.write_uniforms();
        outgoing_from
    }

    fn present_placeholder(&mut self) -> f32 {
        let pixel = self.placeholder;
        self.present_new((1, 1), &pixel)
    }

    fn set_alphas(&mut self, alphas: FadeAlphas) {
        let back = self.back();
        self.layers[self.front].alpha = alphas.incoming;
        self.layers[back].alpha = alphas.outgoing;
        self.write_uniforms();
    }

    fn write_uniforms(&self) {
        for layer in &self.layers {
            let uniform = LayerUniform {
                scale: compute_ndc_scale(
                    layer.size.0,
                    layer.size.1,
                    self.config.width,
                    self.config.height,
                ),
                alpha: layer.alpha,
                _pad: 0.0,
            };
            self.queue
                .write_buffer(&layer.uniform, 0, bytemuck::bytes_of(&uniform));
        }
    }

    fn render(&self) -> Result<(), SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("slideshow-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("slideshow-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.pipeline);
            rpass.set_vertex_buffer(0, self.vbuf.slice(..));
            // outgoing underneath, incoming on top
            for slot in [self.back(), self.front] {
                let layer = &self.layers[slot];
                if layer.alpha <= 0.0 {
                    continue;
                }
                rpass.set_bind_group(0, &layer.bind_group, &[]);
                rpass.draw(0..4, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixels: &[u8],
    w: u32,
    h: u32,
) -> wgpu::TextureView {
    let extent = wgpu::Extent3d {
        width: w,
        height: h,
        depth_or_array_layers: 1,
    };
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("artwork"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        tex.as_image_copy(),
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * w),
            rows_per_image: Some(h),
        },
        extent,
    );
    tex.create_view(&wgpu::TextureViewDescriptor::default())
}

fn make_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniform: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("artwork-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniform.as_entire_binding(),
            },
        ],
    })
}

struct ViewerApp {
    cfg: Configuration,
    manifest: ArtworkManifest,
    cancel: CancellationToken,
    show: Option<Slideshow>,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    fade: Option<Crossfade>,
    /// Locator on the front layer.
    displayed: Option<String>,
    /// Entry whose decode we are waiting on; results for anything else are stale.
    awaiting: Option<usize>,
    /// Decoded, waiting for the running fade to finish.
    staged: Option<LoadOutcome>,
    to_loader: xchan::Sender<LoaderMsg>,
    from_loader: xchan::Receiver<LoadOutcome>,
}

impl ViewerApp {
    fn new(
        cfg: Configuration,
        manifest: ArtworkManifest,
        cancel: CancellationToken,
        to_loader: xchan::Sender<LoaderMsg>,
        from_loader: xchan::Receiver<LoadOutcome>,
    ) -> Self {
        Self {
            cfg,
            manifest,
            cancel,
            show: None,
            window: None,
            gpu: None,
            fade: None,
            displayed: None,
            awaiting: None,
            staged: None,
            to_loader,
            from_loader,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let mut attrs = WindowAttributes::default().with_title("Artwork Slideshow");
        if self.cfg.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn request_load(&mut self, index: usize) {
        let (Some(gpu), Some(path)) = (self.gpu.as_ref(), self.manifest.resolve(index)) else {
            return;
        };
        if let Some(entry) = self.manifest.get(index) {
            debug!(
                index,
                src = %entry.src,
                description = entry.description.as_deref(),
                "requesting artwork"
            );
        }
        let msg = LoaderMsg::Decode {
            index,
            path,
            target: (gpu.config.width, gpu.config.height),
            max_texture_dim: gpu.max_texture_dim,
        };
        if self.to_loader.send(msg).is_err() {
            warn!(index, "loader thread is gone; artwork will not change");
            return;
        }
        self.awaiting = Some(index);
    }

    fn src_of(&self, index: usize) -> Option<&str> {
        self.manifest.get(index).map(|entry| entry.src.as_str())
    }

    fn pending_src(&self) -> Option<&str> {
        let index = self
            .awaiting
            .or_else(|| self.staged.as_ref().map(LoadOutcome::index))?;
        self.src_of(index)
    }

    fn apply(&mut self, events: impl IntoIterator<Item = SlideshowEvent>) {
        for event in events {
            let SlideshowEvent::Shown { index, .. } = event else {
                continue;
            };
            let Some(entry) = self.manifest.get(index) else {
                continue;
            };
            if let Some(window) = self.window.as_ref() {
                window.set_title(entry.description.as_deref().unwrap_or(entry.src.as_str()));
            }
            let change = surface_change(self.displayed.as_deref(), self.pending_src(), &entry.src);
            match change {
                SurfaceChange::Load => {
                    self.staged = None;
                    self.request_load(index);
                }
                SurfaceChange::Pending => debug!(index, "artwork already on its way"),
                SurfaceChange::Unchanged => {
                    debug!(index, "artwork locator unchanged; no transition");
                    self.awaiting = None;
                    self.staged = None;
                }
            }
        }
    }

    fn drain_loader(&mut self) {
        while let Ok(outcome) = self.from_loader.try_recv() {
            if self.awaiting != Some(outcome.index()) {
                debug!(index = outcome.index(), "dropping stale artwork");
                continue;
            }
            self.awaiting = None;
            if let Some(superseded) = self.staged.replace(outcome) {
                debug!(index = superseded.index(), "staged artwork superseded");
            }
        }
    }

    /// Promote the staged image once the previous fade is done. Returns
    /// whether a new fade started.
    fn present_staged(&mut self, now: Instant) -> bool {
        if !fade_settled(self.fade.as_ref(), now) {
            return false;
        }
        let (Some(outcome), Some(gpu)) = (self.staged.take(), self.gpu.as_mut()) else {
            return false;
        };
        let index = outcome.index();
        let outgoing_from = match outcome {
            LoadOutcome::Ready(img) => gpu.present_new(img.size, &img.pixels),
            // keep rotating; the slot simply shows the background
            LoadOutcome::Failed { .. } => gpu.present_placeholder(),
        };
        self.displayed = self.src_of(index).map(str::to_owned);
        self.fade = Some(Crossfade::start(
            now,
            self.cfg.fade,
            self.cfg.fade_mode,
            outgoing_from,
        ));
        true
    }

    /// Returns whether a fade is still running.
    fn update_fade(&mut self, now: Instant) -> bool {
        let (Some(fade), Some(gpu)) = (self.fade, self.gpu.as_mut()) else {
            return false;
        };
        gpu.set_alphas(fade.alphas(now));
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
        if fade.is_finished(now) {
            self.fade = None;
            return false;
        }
        true
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        match gpu.render() {
            Ok(()) => {}
            Err(SurfaceError::Outdated | SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                if let Some(window) = self.window.as_ref() {
                    gpu.resize(window.inner_size());
                }
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                if let Some(window) = self.window.as_ref() {
                    gpu.resize(window.inner_size());
                }
            }
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.gpu.is_none() {
            match Gpu::new(window.clone(), self.cfg.background) {
                Ok(gpu) => self.gpu = Some(gpu),
                Err(err) => {
                    error!(error = ?err, "failed to initialize GPU state");
                    event_loop.exit();
                    return;
                }
            }
        }

        if self.show.is_none() {
            let show = Slideshow::new(
                self.manifest.len(),
                self.cfg.slideshow_settings(),
                Instant::now(),
            );
            info!(entries = show.len().get(), "slideshow started");
            let first = show.index();
            self.show = Some(show);
            self.request_load(first);
        }

        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size);
                }
                window.request_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if is_quit_key(&event.logical_key) {
                    info!("quit key pressed");
                    event_loop.exit();
                    return;
                }
                let Some(key) = nav_key_for(&event.logical_key) else {
                    return;
                };
                let now = Instant::now();
                let shown = self.show.as_mut().and_then(|show| show.on_key(key, now));
                self.apply(shown);
            }
            WindowEvent::CursorMoved { .. } => {
                let now = Instant::now();
                let paused = self
                    .show
                    .as_mut()
                    .and_then(|show| show.on_pointer_activity(now));
                self.apply(paused);
            }
            WindowEvent::RedrawRequested => self.draw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if let Some(show) = self.show.as_mut() {
            let events = show.on_tick(now);
            self.apply(events);
        }
        self.drain_loader();
        let mut fading = self.update_fade(now);
        if !fading && self.present_staged(now) {
            fading = self.update_fade(now);
        }

        if fading {
            event_loop.set_control_flow(ControlFlow::Poll);
            return;
        }

        let mut wake = self.show.as_ref().and_then(Slideshow::next_deadline);
        if self.awaiting.is_some() {
            let poll = now + LOADER_POLL;
            wake = Some(wake.map_or(poll, |at| at.min(poll)));
        }
        event_loop.set_control_flow(match wake {
            Some(at) => ControlFlow::WaitUntil(at),
            None => ControlFlow::Wait,
        });
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(show) = self.show.as_mut() {
            show.shutdown();
        }
        let _ = self.to_loader.send(LoaderMsg::Quit);
    }
}

/// Open the slideshow window and run it on the current thread until the
/// window closes or `cancel` fires. Must be called from within a Tokio
/// runtime, which forwards cancellation into the event loop.
pub fn run_windowed(
    cfg: Configuration,
    manifest: ArtworkManifest,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let (to_loader, loader_rx) = xchan::unbounded::<LoaderMsg>();
    let (loader_tx, from_loader) = xchan::unbounded::<LoadOutcome>();
    let loader: JoinHandle<()> = spawn_loader(loader_rx, loader_tx);

    let mut app = ViewerApp::new(cfg, manifest, cancel, to_loader, from_loader);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    // dropping the app closes the request channel even if `exiting` never ran
    drop(app);
    if loader.join().is_err() {
        warn!("loader thread panicked");
    }

    run_result.context("viewer event loop failed")
}
