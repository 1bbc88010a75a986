//! Window host: winit event loop + wgpu surface around the core [`WarpView`].
//!
//! The view composes each frame on the CPU canvas; this host uploads it as a
//! texture and draws a fullscreen quad. It also translates winit input into
//! the core's gestures, including double-tap synthesis.

use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::canvas::Canvas;
use crate::config::Configuration;
use crate::events::{Gesture, LoaderMsg, PointerEvent, PointerPhase, SourceEvent};
use crate::media::{self, NoVideoBackend};
use crate::scan;
use crate::view::{ViewOptions, WarpView};
use crate::watch::{self, RescanRequest};

const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(350);
const DOUBLE_TAP_SLOP: f64 = 40.0;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD: [Vertex; 4] = [
    //   NDC pos         UV
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    }, // bottom-left
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    }, // bottom-right
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    }, // top-left
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    }, // top-right
];

/// Run the fullscreen display until the operator quits.
///
/// # Errors
/// Returns an error if the initial scan, the watcher, or the rendering
/// backend fails to initialize.
pub fn run_display(cfg: Configuration) -> Result<()> {
    let opts = view_options(&cfg)?;

    let (req_tx, req_rx) = xchan::unbounded::<LoaderMsg>();
    let (res_tx, res_rx) = xchan::unbounded::<SourceEvent>();
    media::spawn_loader(Arc::new(NoVideoBackend), req_rx, res_tx);

    let (rescan_tx, rescan_rx) = xchan::unbounded::<RescanRequest>();
    let watcher = if cfg.watch {
        Some(
            watch::watch_media_dir(&cfg.media_dir, rescan_tx)
                .with_context(|| format!("watching {}", cfg.media_dir.display()))?,
        )
    } else {
        None
    };

    let view = WarpView::new(1, 1, opts, req_tx.clone());

    let event_loop = EventLoop::new()?;
    let mut app = App {
        cfg,
        view,
        canvas: Canvas::new(1, 1),
        window: None,
        gpu: None,
        req_tx,
        res_rx,
        rescan_rx,
        _watcher: watcher,
        cursor: (0.0, 0.0),
        pointer_down: false,
        last_press: None,
        swallow_next_release: false,
    };
    event_loop.run_app(&mut app)?;

    let _ = app.req_tx.send(LoaderMsg::Quit);
    Ok(())
}

fn view_options(cfg: &Configuration) -> Result<ViewOptions> {
    let load = |path: &std::path::PathBuf| -> Result<Arc<image::RgbaImage>> {
        let img = image::open(path)
            .with_context(|| format!("loading {}", path.display()))?
            .to_rgba8();
        Ok(Arc::new(img))
    };
    Ok(ViewOptions {
        handle_radius_px: cfg.handle_radius_px,
        show_handles_always: cfg.show_handles_always,
        fallback_image: cfg.fallback_image.as_ref().map(&load).transpose()?,
        alignment_overlay: cfg.alignment_overlay.as_ref().map(&load).transpose()?,
    })
}

struct Gpu {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    _adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    vbuf: wgpu::Buffer,
    sampler: wgpu::Sampler,

    // CPU canvas destination; recreated on resize
    tex: wgpu::Texture,
    tex_size: (u32, u32),
}

struct App {
    cfg: Configuration,
    view: WarpView,
    canvas: Canvas,

    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,

    req_tx: xchan::Sender<LoaderMsg>,
    res_rx: xchan::Receiver<SourceEvent>,
    rescan_rx: xchan::Receiver<RescanRequest>,
    _watcher: Option<notify::RecommendedWatcher>,

    // input translation state
    cursor: (f64, f64),
    pointer_down: bool,
    last_press: Option<(Instant, f64, f64)>,
    swallow_next_release: bool,
}

impl App {
    fn rescan(&mut self) {
        match scan::scan_media(&self.cfg.media_dir) {
            Ok(entries) => {
                info!(count = entries.len(), "media folder scanned");
                self.view.load_entries(entries);
            }
            Err(err) => {
                warn!(%err, "scan failed");
                self.view.on_scan_error();
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(gpu) = &mut self.gpu {
            gpu.config.width = width;
            gpu.config.height = height;
            gpu.surface.configure(&gpu.device, &gpu.config);
            let (tex, _) = make_canvas_texture(&gpu.device, width, height);
            gpu.tex = tex;
            gpu.tex_size = (width, height);
            let bind_group = make_bind_group(gpu);
            gpu.bind_group = bind_group;
        }
        self.canvas = Canvas::new(width, height);
        self.view.on_resize(width, height);
    }

    /// Translate a raw press/release into core gestures, synthesizing the
    /// double-tap the way a platform gesture recognizer would: the second tap
    /// of a pair becomes one atomic DoubleTap and its release is swallowed.
    fn pointer_phase(&mut self, pressed: bool) {
        let (x, y) = self.cursor;
        if pressed {
            let now = Instant::now();
            let is_double = self.last_press.is_some_and(|(t, px, py)| {
                now.duration_since(t) <= DOUBLE_TAP_WINDOW
                    && ((x - px).powi(2) + (y - py).powi(2)).sqrt() <= DOUBLE_TAP_SLOP
            });
            self.pointer_down = true;
            if is_double {
                self.last_press = None;
                self.swallow_next_release = true;
                self.forward(Gesture::DoubleTap);
            } else {
                self.last_press = Some((now, x, y));
                self.forward(Gesture::Pointer(PointerEvent {
                    phase: PointerPhase::Down,
                    x,
                    y,
                }));
            }
        } else {
            self.pointer_down = false;
            if self.swallow_next_release {
                self.swallow_next_release = false;
                return;
            }
            self.forward(Gesture::Pointer(PointerEvent {
                phase: PointerPhase::Up,
                x,
                y,
            }));
        }
    }

    fn forward(&mut self, gesture: Gesture) {
        if self.view.on_gesture(gesture) {
            if let Some(win) = &self.window {
                win.request_redraw();
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // ----- window -----
        let attrs = WindowAttributes::default().with_title("vj-frame");
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));
        let monitor = window.current_monitor();
        window.set_fullscreen(Some(Fullscreen::Borderless(monitor)));
        window.set_cursor_visible(false);
        info!("window fullscreen initialized");
        self.window = Some(window.clone());

        let PhysicalSize { width, height } = window.inner_size();

        // ----- GPU init -----
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");

        let gpu_init = async move {
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await
                .context("no compatible GPU adapter found")?;

            let (device, queue) = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("device"),
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::default(),
                        memory_hints: wgpu::MemoryHints::default(),
                    },
                    None,
                )
                .await?;

            let caps = surface.get_capabilities(&adapter);
            let format = caps
                .formats
                .iter()
                .copied()
                .find(wgpu::TextureFormat::is_srgb)
                .unwrap_or(caps.formats[0]);
            let config = wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: width.max(1),
                height: height.max(1),
                present_mode: wgpu::PresentMode::AutoVsync,
                alpha_mode: caps.alpha_modes[0],
                view_formats: vec![],
                desired_maximum_frame_latency: 1,
            };
            surface.configure(&device, &config);

            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });

            let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad"),
                contents: bytemuck::cast_slice(&QUAD),
                usage: wgpu::BufferUsages::VERTEX,
            });

            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/display.wgsl").into()),
            });

            let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("bind_layout"),
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
                ],
            });

            let (tex, tex_size) = make_canvas_texture(&device, config.width, config.height);
            let tex_view = tex.create_view(&wgpu::TextureViewDescriptor::default());
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("bind_group"),
                layout: &bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&tex_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            });

            let vlayout = wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
            };

            let pip_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("pipe_layout"),
                bind_group_layouts: &[&bind_layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("pipeline"),
                layout: Some(&pip_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[vlayout],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            Ok::<Gpu, anyhow::Error>(Gpu {
                _instance: instance,
                surface,
                _adapter: adapter,
                device,
                queue,
                config,
                pipeline,
                bind_layout,
                bind_group,
                vbuf,
                sampler,
                tex,
                tex_size,
            })
        };

        self.gpu = Some(pollster::block_on(gpu_init).expect("GPU init"));

        self.canvas = Canvas::new(width.max(1), height.max(1));
        self.view.on_resize(width.max(1), height.max(1));
        self.rescan();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(win) = &self.window else { return };
        if win.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Released {
                    use winit::keyboard::{KeyCode, PhysicalKey};
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape | KeyCode::KeyQ) => event_loop.exit(),
                        // Hardware "toggle chrome" stand-in.
                        PhysicalKey::Code(KeyCode::KeyF) => {
                            let win = win.clone();
                            if win.fullscreen().is_some() {
                                win.set_fullscreen(None);
                            } else {
                                win.set_fullscreen(Some(Fullscreen::Borderless(
                                    win.current_monitor(),
                                )));
                            }
                        }
                        _ => {}
                    }
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.resize(width, height);
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                if self.pointer_down {
                    self.forward(Gesture::Pointer(PointerEvent {
                        phase: PointerPhase::Moved,
                        x: position.x,
                        y: position.y,
                    }));
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.pointer_phase(state == ElementState::Pressed);
            }
            WindowEvent::Touch(touch) => {
                self.cursor = (touch.location.x, touch.location.y);
                match touch.phase {
                    TouchPhase::Started => self.pointer_phase(true),
                    TouchPhase::Moved => {
                        self.forward(Gesture::Pointer(PointerEvent {
                            phase: PointerPhase::Moved,
                            x: touch.location.x,
                            y: touch.location.y,
                        }));
                    }
                    TouchPhase::Ended => self.pointer_phase(false),
                    TouchPhase::Cancelled => {
                        self.pointer_down = false;
                        self.forward(Gesture::Pointer(PointerEvent {
                            phase: PointerPhase::Cancelled,
                            x: touch.location.x,
                            y: touch.location.y,
                        }));
                    }
                }
            }
            WindowEvent::RedrawRequested => self.draw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _el: &ActiveEventLoop) {
        // loader results (non-blocking)
        let mut dirty = false;
        while let Ok(event) = self.res_rx.try_recv() {
            dirty |= self.view.on_source_event(event);
        }

        // folder changes -> wholesale rescan
        let mut rescan = false;
        while self.rescan_rx.try_recv().is_ok() {
            rescan = true;
        }
        if rescan {
            self.rescan();
            dirty = true;
        }

        if let Some(win) = &self.window {
            if dirty || self.view.is_animating() {
                win.request_redraw();
            }
        }
    }
}

impl App {
    fn draw(&mut self) {
        let Some(gpu) = &mut self.gpu else { return };

        self.view.render(&mut self.canvas);

        let (w, h) = (self.canvas.width(), self.canvas.height());
        if gpu.tex_size != (w, h) {
            let (tex, _) = make_canvas_texture(&gpu.device, w, h);
            gpu.tex = tex;
            gpu.tex_size = (w, h);
            let bind_group = make_bind_group(gpu);
            gpu.bind_group = bind_group;
        }
        gpu.queue.write_texture(
            gpu.tex.as_image_copy(),
            self.canvas.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );

        let Ok(frame) = gpu.surface.get_current_texture() else {
            return;
        };
        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rpass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&gpu.pipeline);
            rpass.set_bind_group(0, &gpu.bind_group, &[]);
            rpass.set_vertex_buffer(0, gpu.vbuf.slice(..));
            rpass.draw(0..4, 0..1);
        }
        gpu.queue.submit([encoder.finish()]);
        frame.present();
    }
}

fn make_canvas_texture(device: &wgpu::Device, w: u32, h: u32) -> (wgpu::Texture, (u32, u32)) {
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("canvas"),
        size: wgpu::Extent3d {
            width: w.max(1),
            height: h.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    (tex, (w.max(1), h.max(1)))
}

fn make_bind_group(gpu: &Gpu) -> wgpu::BindGroup {
    let tex_view = gpu.tex.create_view(&wgpu::TextureViewDescriptor::default());
    gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bind_group"),
        layout: &gpu.bind_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&tex_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&gpu.sampler),
            },
        ],
    })
}
