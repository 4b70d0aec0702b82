use crate::overlay::{Overlay, OverlayTarget};
use crate::pipeline::{self, DEPTH_FORMAT, VertexSource};
use slim_render::reflect::ProgramLayout;
use slim_render::{
    AttributeBinding, BindingState, BufferId, BufferKind, ContextInfo, GraphicsContext,
    PolygonMode, ProgramId, RenderError, ShaderStage, UniformLocation, UniformValue,
    VertexArrayId, VertexAttribute,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use wgpu::util::DeviceExt;

struct GpuProgram {
    layout: ProgramLayout,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffers: BTreeMap<u32, wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    vertex_array: VertexArrayId,
    polygon_mode: PolygonMode,
}

#[derive(Debug, Clone, Copy)]
struct DrawCall {
    key: PipelineKey,
    index_buffer: BufferId,
    count: u32,
}

/// A draw whose pipeline and vertex slots are resolved.
struct PreparedDraw {
    key: PipelineKey,
    vertex_buffers: Vec<BufferId>,
    index_buffer: BufferId,
    count: u32,
}

struct State {
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    next_id: u32,
    bindings: BindingState,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    programs: HashMap<ProgramId, GpuProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    /// Keys whose pipeline failed to build; not retried until invalidated.
    failed_pipelines: HashSet<PipelineKey>,
    clear_color: [f32; 4],
    polygon_mode: PolygonMode,
    clear_requested: bool,
    draws: Vec<DrawCall>,
}

impl State {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn invalidate_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.pipelines.retain(|k, _| k.vertex_array != vertex_array);
        self.failed_pipelines.retain(|k| k.vertex_array != vertex_array);
    }
}

/// Graphics context backed by wgpu, presenting to one window surface.
///
/// Calls are recorded against the binding state and replayed into a single
/// render pass at [`GraphicsContext::present`]. Render pipelines are built
/// lazily per program, vertex array and polygon mode, then cached.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    adapter_info: wgpu::AdapterInfo,
    line_mode_supported: bool,
    state: RefCell<State>,
    overlay: RefCell<Option<Box<dyn Overlay>>>,
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

impl WgpuContext {
    /// Open an adapter and device for `target` and configure its surface.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::Backend(format!("create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RenderError::Backend("no compatible graphics adapter".into()))?;

        let line_mode_supported = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if line_mode_supported {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("slim_device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Backend(format!("request device: {e}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Backend("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = pipeline::create_depth_texture(&device, config.width, config.height);

        let adapter_info = adapter.get_info();
        tracing::info!(
            "GPU initialized with {} backend on {}",
            adapter_info.backend.to_str(),
            adapter_info.name
        );
        if !line_mode_supported {
            tracing::debug!("adapter lacks POLYGON_MODE_LINE, wireframe falls back to fill");
        }

        Ok(Self {
            device,
            queue,
            surface,
            adapter_info,
            line_mode_supported,
            state: RefCell::new(State {
                config,
                depth_view,
                next_id: 0,
                bindings: BindingState::new(),
                buffers: HashMap::new(),
                programs: HashMap::new(),
                pipelines: HashMap::new(),
                failed_pipelines: HashSet::new(),
                clear_color: [0.0, 0.0, 0.0, 1.0],
                polygon_mode: PolygonMode::Fill,
                clear_requested: false,
                draws: Vec::new(),
            }),
            overlay: RefCell::new(None),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.state.borrow().config.format
    }

    /// Install a hook painted on top of every presented frame.
    pub fn set_overlay(&self, overlay: Box<dyn Overlay>) {
        *self.overlay.borrow_mut() = Some(overlay);
    }

    fn with_validation<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }

    fn create_module(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<wgpu::ShaderModule, RenderError> {
        let (module, error) = self.with_validation(|| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(match stage {
                        ShaderStage::Vertex => "vertex_shader",
                        ShaderStage::Fragment => "fragment_shader",
                    }),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
        });
        match error {
            Some(e) => Err(RenderError::Compile {
                stage,
                log: e.to_string(),
            }),
            None => Ok(module),
        }
    }

    fn build_pipeline(
        &self,
        program: &GpuProgram,
        sources: &[VertexSource],
        polygon_mode: PolygonMode,
        format: wgpu::TextureFormat,
    ) -> Result<wgpu::RenderPipeline, RenderError> {
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> =
            sources.iter().map(VertexSource::layout).collect();
        let (pipeline, error) = self.with_validation(|| {
            self.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("program_pipeline"),
                    layout: Some(&program.pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &program.vertex,
                        entry_point: Some(program.layout.vertex_entry.as_str()),
                        compilation_options: Default::default(),
                        buffers: &buffers,
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &program.fragment,
                        entry_point: Some(program.layout.fragment_entry.as_str()),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        polygon_mode: match polygon_mode {
                            PolygonMode::Fill => wgpu::PolygonMode::Fill,
                            PolygonMode::Line => wgpu::PolygonMode::Line,
                        },
                        ..Default::default()
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: Default::default(),
                        bias: Default::default(),
                    }),
                    multisample: Default::default(),
                    multiview: None,
                    cache: None,
                })
        });
        match error {
            Some(e) => Err(RenderError::Link {
                log: e.to_string(),
            }),
            None => Ok(pipeline),
        }
    }

    /// Resolve pipelines and vertex slots for every recorded draw. Draws that
    /// cannot be prepared are logged and dropped.
    fn prepare(&self, state: &mut State, draws: &[DrawCall]) -> Vec<PreparedDraw> {
        let mut prepared = Vec::with_capacity(draws.len());
        for draw in draws {
            if draw.count == 0 {
                continue;
            }
            let Some(array) = state.bindings.vertex_array(draw.key.vertex_array) else {
                tracing::warn!("skipping draw: vertex array deleted before present");
                continue;
            };
            let sources = match pipeline::vertex_sources(&array.attributes) {
                Ok(sources) => sources,
                Err(e) => {
                    tracing::warn!("skipping draw: {e}");
                    continue;
                }
            };
            let vertex_buffers: Vec<BufferId> = sources.iter().map(|s| s.buffer).collect();
            if !vertex_buffers
                .iter()
                .chain(std::iter::once(&draw.index_buffer))
                .all(|b| state.buffers.get(b).is_some_and(|buf| buf.size() > 0))
            {
                tracing::warn!("skipping draw: buffer empty or deleted before present");
                continue;
            }

            if state.failed_pipelines.contains(&draw.key) {
                continue;
            }
            if !state.pipelines.contains_key(&draw.key) {
                let Some(program) = state.programs.get(&draw.key.program) else {
                    tracing::warn!("skipping draw: program deleted before present");
                    continue;
                };
                match self.build_pipeline(
                    program,
                    &sources,
                    draw.key.polygon_mode,
                    state.config.format,
                ) {
                    Ok(pipeline) => {
                        tracing::debug!(
                            program = draw.key.program.0,
                            vertex_array = draw.key.vertex_array.0,
                            "built render pipeline"
                        );
                        state.pipelines.insert(draw.key, pipeline);
                    }
                    Err(e) => {
                        tracing::error!("skipping draws until the vertex array or program changes: {e}");
                        state.failed_pipelines.insert(draw.key);
                        continue;
                    }
                }
            }

            prepared.push(PreparedDraw {
                key: draw.key,
                vertex_buffers,
                index_buffer: draw.index_buffer,
                count: draw.count,
            });
        }
        prepared
    }

    fn reconfigure(&self, state: &mut State) {
        self.surface.configure(&self.device, &state.config);
        state.depth_view =
            pipeline::create_depth_texture(&self.device, state.config.width, state.config.height);
    }
}

impl GraphicsContext for WgpuContext {
    fn info(&self) -> ContextInfo {
        let info = &self.adapter_info;
        let version = if info.driver.is_empty() {
            info.name.clone()
        } else {
            format!("{} ({} {})", info.name, info.driver, info.driver_info)
        };
        ContextInfo {
            backend: info.backend.to_str().into(),
            version,
        }
    }

    fn create_buffer(&self, kind: BufferKind, data: &[u8]) -> Result<BufferId, RenderError> {
        let (label, usage) = match kind {
            BufferKind::Vertex => ("vertex_buffer", wgpu::BufferUsages::VERTEX),
            BufferKind::Index => ("index_buffer", wgpu::BufferUsages::INDEX),
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage,
            });
        let mut state = self.state.borrow_mut();
        let id = BufferId(state.next());
        state.bindings.add_buffer(id, kind, data.len());
        state.buffers.insert(id, buffer);
        Ok(id)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        state.bindings.remove_buffer(buffer);
        state.buffers.remove(&buffer);
    }

    fn bind_buffer(&self, kind: BufferKind, buffer: Option<BufferId>) -> Result<(), RenderError> {
        self.state.borrow_mut().bindings.bind_buffer(kind, buffer)
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, RenderError> {
        let mut state = self.state.borrow_mut();
        let id = VertexArrayId(state.next());
        state.bindings.add_vertex_array(id);
        Ok(id)
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        state.bindings.remove_vertex_array(vertex_array);
        state.invalidate_vertex_array(vertex_array);
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>) {
        self.state
            .borrow_mut()
            .bindings
            .bind_vertex_array(vertex_array);
    }

    fn enable_vertex_attribute(&self, slot: u32) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        state.bindings.enable_vertex_attribute(slot)?;
        if let Some(vertex_array) = state.bindings.bound_vertex_array() {
            state.invalidate_vertex_array(vertex_array);
        }
        Ok(())
    }

    fn vertex_attribute_pointer(&self, attribute: &VertexAttribute) -> Result<(), RenderError> {
        if attribute.normalized && attribute.base_type.is_integer() {
            tracing::warn!(
                slot = attribute.slot,
                "normalized 32-bit integer attributes are not supported, reading raw values"
            );
        }
        let mut state = self.state.borrow_mut();
        state.bindings.vertex_attribute_pointer(attribute)?;
        if let Some(vertex_array) = state.bindings.bound_vertex_array() {
            state.invalidate_vertex_array(vertex_array);
        }
        Ok(())
    }

    fn attribute_binding(
        &self,
        vertex_array: VertexArrayId,
        slot: u32,
    ) -> Option<AttributeBinding> {
        self.state
            .borrow()
            .bindings
            .attribute_binding(vertex_array, slot)
    }

    fn create_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError> {
        let layout = ProgramLayout::link(vertex, fragment)?;
        let vertex_module = self.create_module(ShaderStage::Vertex, vertex)?;
        let fragment_module = self.create_module(ShaderStage::Fragment, fragment)?;

        let entries: Vec<wgpu::BindGroupLayoutEntry> = layout
            .uniforms
            .values()
            .map(|u| wgpu::BindGroupLayoutEntry {
                binding: u.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        let uniform_buffers: BTreeMap<u32, wgpu::Buffer> = layout
            .uniforms
            .values()
            .map(|u| {
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(u.name.as_str()),
                    size: u.ty.padded_size(),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (u.binding, buffer)
            })
            .collect();

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("uniform_bind_group_layout"),
                    entries: &entries,
                });
        let bind_group = (!uniform_buffers.is_empty()).then(|| {
            let entries: Vec<wgpu::BindGroupEntry<'_>> = uniform_buffers
                .iter()
                .map(|(binding, buffer)| wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: buffer.as_entire_binding(),
                })
                .collect();
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("uniform_bind_group"),
                layout: &bind_group_layout,
                entries: &entries,
            })
        });
        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if bind_group.is_some() {
            vec![&bind_group_layout]
        } else {
            Vec::new()
        };
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("program_layout"),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        let mut state = self.state.borrow_mut();
        let id = ProgramId(state.next());
        tracing::debug!(
            program = id.0,
            uniforms = layout.uniforms.len(),
            "linked shader program"
        );
        state.programs.insert(
            id,
            GpuProgram {
                layout,
                vertex: vertex_module,
                fragment: fragment_module,
                pipeline_layout,
                uniform_buffers,
                bind_group,
            },
        );
        Ok(id)
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        state.pipelines.retain(|k, _| k.program != program);
        state.failed_pipelines.retain(|k| k.program != program);
        state.bindings.forget_program(program);
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().bindings.use_program(program);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let state = self.state.borrow();
        let info = state.programs.get(&program)?.layout.uniform(name)?;
        Some(UniformLocation(info.binding))
    }

    fn set_uniform(&self, program: ProgramId, location: UniformLocation, value: UniformValue) {
        let state = self.state.borrow();
        let Some(record) = state.programs.get(&program) else {
            tracing::warn!(program = program.0, "set_uniform on unknown program");
            return;
        };
        let (Some(info), Some(buffer)) = (
            record.layout.uniform_at(location.0),
            record.uniform_buffers.get(&location.0),
        ) else {
            tracing::warn!(binding = location.0, "set_uniform on unknown location");
            return;
        };
        if info.ty != value.ty() {
            tracing::warn!(
                "uniform `{}` is {:?}, ignoring {:?} value",
                info.name,
                info.ty,
                value.ty()
            );
            return;
        }
        self.queue.write_buffer(buffer, 0, &value.to_bytes());
    }

    fn set_clear_color(&self, color: [f32; 4]) {
        self.state.borrow_mut().clear_color = color;
    }

    fn set_polygon_mode(&self, mode: PolygonMode) {
        let mode = if mode == PolygonMode::Line && !self.line_mode_supported {
            tracing::warn!("wireframe is not supported by this adapter, drawing filled");
            PolygonMode::Fill
        } else {
            mode
        };
        self.state.borrow_mut().polygon_mode = mode;
    }

    fn set_viewport(&self, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        let (width, height) = (width.max(1), height.max(1));
        if state.config.width == width && state.config.height == height {
            return;
        }
        state.config.width = width;
        state.config.height = height;
        self.reconfigure(&mut state);
    }

    fn set_swap_interval(&self, vsync: bool) {
        let mut state = self.state.borrow_mut();
        let mode = present_mode(vsync);
        if state.config.present_mode == mode {
            return;
        }
        state.config.present_mode = mode;
        self.surface.configure(&self.device, &state.config);
    }

    fn clear(&self) {
        self.state.borrow_mut().clear_requested = true;
    }

    fn draw_indexed(&self, count: u32) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        let program = state
            .bindings
            .current_program()
            .ok_or(RenderError::NoProgramBound)?;
        let record = state.programs.get(&program).ok_or(RenderError::UnknownHandle {
            kind: "program",
            id: program.0,
        })?;
        let target = state
            .bindings
            .validate_draw(count, &record.layout.vertex_inputs)?;
        let call = DrawCall {
            key: PipelineKey {
                program: target.program,
                vertex_array: target.vertex_array,
                polygon_mode: state.polygon_mode,
            },
            index_buffer: target.index_buffer,
            count,
        };
        state.draws.push(call);
        Ok(())
    }

    fn present(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let draws = std::mem::take(&mut state.draws);
        let clear = std::mem::take(&mut state.clear_requested);

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure(state);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let prepared = self.prepare(state, &draws);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        {
            let [r, g, b, a] = state.clear_color;
            let (color_load, depth_load) = if clear {
                (
                    wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: a as f64,
                    }),
                    wgpu::LoadOp::Clear(1.0),
                )
            } else {
                (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &state.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &prepared {
                let (Some(pipeline), Some(program), Some(index_buffer)) = (
                    state.pipelines.get(&draw.key),
                    state.programs.get(&draw.key.program),
                    state.buffers.get(&draw.index_buffer),
                ) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                if let Some(bind_group) = &program.bind_group {
                    pass.set_bind_group(0, bind_group, &[]);
                }
                for (slot, id) in draw.vertex_buffers.iter().enumerate() {
                    if let Some(buffer) = state.buffers.get(id) {
                        pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                    }
                }
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.count, 0, 0..1);
            }
        }

        if let Some(overlay) = self.overlay.borrow_mut().as_mut() {
            overlay.paint(OverlayTarget {
                device: &self.device,
                queue: &self.queue,
                encoder: &mut encoder,
                view: &view,
                size_in_pixels: [state.config.width, state.config.height],
            });
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
