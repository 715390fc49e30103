use std::collections::HashMap;
use std::num::NonZeroU64;

use glam::Mat4;
use log::{debug, trace, warn};
use wgpu::util::DeviceExt;

use crate::config::ShadowConfig;
use crate::error::{ShadowError, ShadowResult};

use super::backend::{
    AddressMode, BorderColor, CompareOp, DepthFormat, FilterMode, FrontFace, ImageBarrier, LayeredImageDesc,
    ScissorRect, ShadowBackend, ShadowCommands, ShadowDevice, ShadowPipelineState, ShadowSamplerDesc, ViewDesc,
    ViewDimension, Viewport,
};
use super::shadow_pass::{ShadowRenderPass, ShadowUniform};
use super::MAX_SHADOW_CASCADES;

const SHADOW_DEPTH_SHADER: &str = "shadow_depth.wgsl";
const MATRIX_SIZE: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;
pub const DEFAULT_DRAW_CAPACITY: usize = 1024;

pub struct WgpuBackend;

impl ShadowBackend for WgpuBackend {
    type Image = wgpu::Texture;
    type View = wgpu::TextureView;
    type Sampler = wgpu::Sampler;
    type Mesh = WgpuMesh;
}

/// Position-only geometry for the depth pass.
pub struct WgpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub vertex_stride: u64,
}

impl WgpuMesh {
    pub fn from_positions(device: &wgpu::Device, label: &str, positions: &[[f32; 3]], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            vertex_stride: std::mem::size_of::<[f32; 3]>() as u64,
        }
    }
}

pub fn texture_format(format: DepthFormat) -> wgpu::TextureFormat {
    match format {
        DepthFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        DepthFormat::Depth24Plus => wgpu::TextureFormat::Depth24Plus,
        DepthFormat::Depth16Unorm => wgpu::TextureFormat::Depth16Unorm,
    }
}

fn compare_function(op: CompareOp) -> wgpu::CompareFunction {
    match op {
        CompareOp::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareOp::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
    }
}

fn matrix_entry(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer,
            offset: 0,
            size: NonZeroU64::new(MATRIX_SIZE),
        }),
    }
}

fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Slot count after growing `current` to hold at least `needed` slots.
fn grown_capacity(current: usize, needed: usize) -> usize {
    if needed <= current {
        current
    } else {
        needed.next_power_of_two()
    }
}

fn stage_matrix(staging: &mut Vec<u8>, stride: u64, slot: usize, matrix: Mat4) {
    let start = slot * stride as usize;
    let end = start + MATRIX_SIZE as usize;
    if staging.len() < start + stride as usize {
        staging.resize(start + stride as usize, 0);
    }
    staging[start..end].copy_from_slice(bytemuck::bytes_of(&matrix.to_cols_array_2d()));
}

/// Model matrices staged for one recording, one slot per distinct matrix.
///
/// Every cascade draws the same casters, so a caster's slot is reused by each cascade.
#[derive(Debug, Default)]
struct ModelSlots {
    slots: HashMap<[u32; 16], usize>,
    staging: Vec<u8>,
}

impl ModelSlots {
    /// Slot holding `model`, staging it on first use. `None` once `capacity` slots are taken.
    fn slot(&mut self, model: Mat4, stride: u64, capacity: usize) -> Option<usize> {
        let key = model.to_cols_array().map(f32::to_bits);
        if let Some(&slot) = self.slots.get(&key) {
            return Some(slot);
        }
        let slot = self.slots.len();
        if slot >= capacity {
            return None;
        }
        stage_matrix(&mut self.staging, stride, slot, model);
        self.slots.insert(key, slot);
        Some(slot)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Features the shadow pipelines and sampler rely on.
pub fn required_features() -> wgpu::Features {
    wgpu::Features::DEPTH_CLIP_CONTROL | wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER
}

pub struct WgpuShadowDevice<'a> {
    device: &'a wgpu::Device,
}

impl<'a> WgpuShadowDevice<'a> {
    pub fn new(device: &'a wgpu::Device) -> ShadowResult<Self> {
        if !device.features().contains(required_features()) {
            return Err(ShadowError::allocation(
                "shadow device",
                format!("device lacks required features {:?}", required_features()),
            ));
        }
        Ok(Self { device })
    }

    fn checked<T>(&self, what: &'static str, create: impl FnOnce(&wgpu::Device) -> T) -> ShadowResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let resource = create(self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(ShadowError::allocation(what, err.to_string())),
            None => Ok(resource),
        }
    }
}

impl ShadowDevice<WgpuBackend> for WgpuShadowDevice<'_> {
    fn create_layered_depth_image(&mut self, desc: &LayeredImageDesc) -> ShadowResult<wgpu::Texture> {
        let limits = self.device.limits();
        if desc.width > limits.max_texture_dimension_2d || desc.height > limits.max_texture_dimension_2d {
            return Err(ShadowError::allocation(
                desc.label,
                format!("{}x{} exceeds max texture size {}", desc.width, desc.height, limits.max_texture_dimension_2d),
            ));
        }
        if desc.layers > limits.max_texture_array_layers {
            return Err(ShadowError::allocation(
                desc.label,
                format!("{} layers exceeds limit {}", desc.layers, limits.max_texture_array_layers),
            ));
        }
        self.checked(desc.label, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(desc.label),
                size: wgpu::Extent3d { width: desc.width, height: desc.height, depth_or_array_layers: desc.layers },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: texture_format(desc.format),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        })
    }

    fn create_view(&mut self, image: &wgpu::Texture, desc: &ViewDesc) -> ShadowResult<wgpu::TextureView> {
        if desc.base_layer + desc.layer_count > image.depth_or_array_layers() {
            return Err(ShadowError::allocation(desc.label, "view exceeds image layers"));
        }
        let dimension = match desc.dimension {
            ViewDimension::D2 => wgpu::TextureViewDimension::D2,
            ViewDimension::D2Array => wgpu::TextureViewDimension::D2Array,
        };
        Ok(image.create_view(&wgpu::TextureViewDescriptor {
            label: Some(desc.label),
            format: Some(image.format()),
            dimension: Some(dimension),
            aspect: wgpu::TextureAspect::DepthOnly,
            base_mip_level: 0,
            mip_level_count: None,
            base_array_layer: desc.base_layer,
            array_layer_count: Some(desc.layer_count),
            ..Default::default()
        }))
    }

    fn create_comparison_sampler(&mut self, desc: &ShadowSamplerDesc) -> ShadowResult<wgpu::Sampler> {
        let filter = match desc.filter {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        };
        let address_mode = match desc.address_mode {
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::ClampToBorder => wgpu::AddressMode::ClampToBorder,
        };
        let border_color = match (desc.address_mode, desc.border_color) {
            (AddressMode::ClampToEdge, _) => None,
            (AddressMode::ClampToBorder, BorderColor::OpaqueBlack) => Some(wgpu::SamplerBorderColor::OpaqueBlack),
            (AddressMode::ClampToBorder, BorderColor::OpaqueWhite) => Some(wgpu::SamplerBorderColor::OpaqueWhite),
        };
        Ok(self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(compare_function(desc.compare)),
            border_color,
            ..Default::default()
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    front_face: FrontFace,
    cull_back_faces: bool,
    bias_constant: i32,
    bias_slope_bits: u32,
    bias_clamp_bits: u32,
    depth_clamp: bool,
    depth_compare: CompareOp,
    vertex_stride: u64,
}

impl PipelineKey {
    fn new(state: &ShadowPipelineState, vertex_stride: u64) -> Self {
        Self {
            front_face: state.front_face,
            cull_back_faces: state.cull_back_faces,
            bias_constant: state.depth_bias.constant,
            bias_slope_bits: state.depth_bias.slope_scale.to_bits(),
            bias_clamp_bits: state.depth_bias.clamp.to_bits(),
            depth_clamp: state.depth_clamp,
            depth_compare: state.depth_compare,
            vertex_stride,
        }
    }
}

/// Shader, bind group and cached pipelines shared by every shadow depth pass.
pub struct WgpuShadowPipelines {
    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    light_buffer: wgpu::Buffer,
    draw_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    draw_capacity: usize,
    matrix_uploads: u64,
}

impl WgpuShadowPipelines {
    /// `draw_capacity` is the initial number of model slots; it grows on demand.
    pub fn new(device: &wgpu::Device, config: &ShadowConfig, draw_capacity: usize) -> ShadowResult<Self> {
        if config.vertex_shader != SHADOW_DEPTH_SHADER {
            return Err(ShadowError::allocation(
                "shadow vertex shader",
                format!("unknown shader '{}'", config.vertex_shader),
            ));
        }
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../assets/shaders/shadow_depth.wgsl").into()),
        });

        let matrix_binding = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(MATRIX_SIZE),
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Depth BGL"),
            entries: &[matrix_binding(0), matrix_binding(1)],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Depth Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = align_to(MATRIX_SIZE, alignment);
        let draw_capacity = draw_capacity.max(1);
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Light Matrix Buffer"),
            size: uniform_stride * MAX_SHADOW_CASCADES as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_buffer = Self::create_draw_buffer(device, uniform_stride, draw_capacity);
        let bind_group = Self::create_bind_group(device, &bind_group_layout, &light_buffer, &draw_buffer);

        Ok(Self {
            shader,
            bind_group_layout,
            pipeline_layout,
            format: texture_format(config.depth_format),
            pipelines: HashMap::new(),
            light_buffer,
            draw_buffer,
            bind_group,
            uniform_stride,
            draw_capacity,
            matrix_uploads: 0,
        })
    }

    fn create_draw_buffer(device: &wgpu::Device, stride: u64, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Draw Buffer"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        light_buffer: &wgpu::Buffer,
        draw_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Depth BG"),
            layout,
            entries: &[matrix_entry(0, light_buffer), matrix_entry(1, draw_buffer)],
        })
    }

    /// Reallocates the draw buffer and its bind group when fewer than `slots` model slots exist.
    ///
    /// Encoders recorded earlier keep the old buffer alive until they are submitted.
    pub fn ensure_draw_capacity(&mut self, device: &wgpu::Device, slots: usize) {
        let capacity = grown_capacity(self.draw_capacity, slots);
        if capacity == self.draw_capacity {
            return;
        }
        debug!("[shadow] growing draw buffer from {} to {} slots", self.draw_capacity, capacity);
        self.draw_buffer = Self::create_draw_buffer(device, self.uniform_stride, capacity);
        self.bind_group =
            Self::create_bind_group(device, &self.bind_group_layout, &self.light_buffer, &self.draw_buffer);
        self.draw_capacity = capacity;
    }

    pub fn draw_capacity(&self) -> usize {
        self.draw_capacity
    }

    /// Number of times staged matrices were written to the GPU.
    pub fn matrix_uploads(&self) -> u64 {
        self.matrix_uploads
    }

    pub fn cached_pipelines(&self) -> usize {
        self.pipelines.len()
    }

    fn pipeline(&mut self, device: &wgpu::Device, key: PipelineKey) -> &wgpu::RenderPipeline {
        let (shader, layout, format) = (&self.shader, &self.pipeline_layout, self.format);
        self.pipelines.entry(key).or_insert_with(|| {
            debug!("[shadow] building depth pipeline {key:?}");
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Shadow Depth Pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: key.vertex_stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        }],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: None,
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: match key.front_face {
                        FrontFace::Ccw => wgpu::FrontFace::Ccw,
                        FrontFace::Cw => wgpu::FrontFace::Cw,
                    },
                    cull_mode: key.cull_back_faces.then_some(wgpu::Face::Back),
                    unclipped_depth: key.depth_clamp,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: true,
                    depth_compare: compare_function(key.depth_compare),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState {
                        constant: key.bias_constant,
                        slope_scale: f32::from_bits(key.bias_slope_bits),
                        clamp: f32::from_bits(key.bias_clamp_bits),
                    },
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }
}

/// Records shadow depth passes into a `CommandEncoder`.
///
/// wgpu transitions texture usage itself, so barriers are only tracked. Matrix
/// uniforms are staged while recording and uploaded by [`WgpuShadowCommands::finish`]
/// or on drop, which must happen before the encoder is submitted.
#[must_use = "staged matrices are uploaded by `finish` or on drop, before the encoder is submitted"]
pub struct WgpuShadowCommands<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    encoder: &'a mut wgpu::CommandEncoder,
    pipelines: &'a mut WgpuShadowPipelines,
    pass: Option<wgpu::RenderPass<'static>>,
    state: Option<ShadowPipelineState>,
    bound: Option<PipelineKey>,
    cascade: usize,
    light_staging: Vec<u8>,
    models: ModelSlots,
    draws: usize,
    skipped_draws: usize,
    barriers: usize,
    flushed: bool,
}

impl<'a> WgpuShadowCommands<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        encoder: &'a mut wgpu::CommandEncoder,
        pipelines: &'a mut WgpuShadowPipelines,
    ) -> Self {
        let light_staging = vec![0; (pipelines.uniform_stride * MAX_SHADOW_CASCADES as u64) as usize];
        Self {
            device,
            queue,
            encoder,
            pipelines,
            pass: None,
            state: None,
            bound: None,
            cascade: 0,
            light_staging,
            models: ModelSlots::default(),
            draws: 0,
            skipped_draws: 0,
            barriers: 0,
            flushed: false,
        }
    }

    pub fn barriers_recorded(&self) -> usize {
        self.barriers
    }

    /// Ends any open pass and uploads the staged matrices. Returns the number of draws recorded.
    pub fn finish(mut self) -> usize {
        self.flush();
        self.draws
    }

    fn flush(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;
        self.pass = None;
        self.queue.write_buffer(&self.pipelines.light_buffer, 0, &self.light_staging);
        if !self.models.staging.is_empty() {
            self.queue.write_buffer(&self.pipelines.draw_buffer, 0, &self.models.staging);
        }
        self.pipelines.matrix_uploads += 1;
        if self.skipped_draws > 0 {
            warn!(
                "[shadow] skipped {} draws past {} model slots; reserve_draws was not called with the caster count",
                self.skipped_draws, self.pipelines.draw_capacity
            );
        }
    }
}

impl Drop for WgpuShadowCommands<'_> {
    fn drop(&mut self) {
        if !self.flushed {
            debug!("[shadow] shadow commands dropped without finish; uploading staged matrices");
            self.flush();
        }
    }
}

impl ShadowCommands<WgpuBackend> for WgpuShadowCommands<'_> {
    fn image_barrier(&mut self, _view: &wgpu::TextureView, barrier: &ImageBarrier) {
        self.barriers += 1;
        trace!(
            "[shadow] barrier {:?} -> {:?} on {} layers",
            barrier.old_layout,
            barrier.new_layout,
            barrier.layer_count
        );
    }

    fn reserve_draws(&mut self, casters: usize) {
        if self.pass.is_some() {
            warn!("[shadow] reserve_draws inside a depth pass ignored");
            return;
        }
        let needed = self.models.len() + casters;
        if needed > self.pipelines.draw_capacity && !self.models.staging.is_empty() {
            // Passes recorded so far bind the buffer about to be replaced.
            self.queue.write_buffer(&self.pipelines.draw_buffer, 0, &self.models.staging);
        }
        self.pipelines.ensure_draw_capacity(self.device, needed);
    }

    fn begin_depth_pass(&mut self, target: &wgpu::TextureView, label: &str, clear_depth: f32) {
        self.pass = None;
        let pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_depth),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        self.pass = Some(pass.forget_lifetime());
        self.bound = None;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        if let Some(pass) = self.pass.as_mut() {
            pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                viewport.min_depth,
                viewport.max_depth,
            );
        }
    }

    fn set_scissor(&mut self, scissor: ScissorRect) {
        if let Some(pass) = self.pass.as_mut() {
            pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
        }
    }

    fn set_pipeline_state(&mut self, state: &ShadowPipelineState) {
        self.state = Some(*state);
    }

    fn set_light_matrix(&mut self, cascade: usize, light_view_proj: Mat4) {
        let cascade = cascade.min(MAX_SHADOW_CASCADES - 1);
        stage_matrix(&mut self.light_staging, self.pipelines.uniform_stride, cascade, light_view_proj);
        self.cascade = cascade;
    }

    fn draw_mesh(&mut self, mesh: &WgpuMesh, model: Mat4) {
        let Some(state) = self.state else {
            warn!("[shadow] draw without pipeline state skipped");
            return;
        };
        let Some(pass) = self.pass.as_mut() else {
            warn!("[shadow] draw outside a depth pass skipped");
            return;
        };
        let stride = self.pipelines.uniform_stride;
        let Some(slot) = self.models.slot(model, stride, self.pipelines.draw_capacity) else {
            self.skipped_draws += 1;
            return;
        };

        let key = PipelineKey::new(&state, mesh.vertex_stride);
        if self.bound != Some(key) {
            pass.set_pipeline(self.pipelines.pipeline(self.device, key));
            self.bound = Some(key);
        }
        self.draws += 1;

        let offsets = [(self.cascade as u64 * stride) as u32, (slot as u64 * stride) as u32];
        pass.set_bind_group(0, &self.pipelines.bind_group, &offsets);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }

    fn end_depth_pass(&mut self) {
        self.pass = None;
    }
}

/// Bind group the lighting pass uses to sample the cascades.
pub struct ShadowSampling {
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bind_groups: Vec<wgpu::BindGroup>,
}

impl ShadowSampling {
    pub fn new(device: &wgpu::Device, pass: &ShadowRenderPass<WgpuBackend>) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Sample BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Uniform Buffer"),
            size: std::mem::size_of::<ShadowUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_groups = (0..pass.frame_count())
            .map(|frame| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Shadow Sample BG"),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: uniform_buffer.as_entire_binding() },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(pass.array_view(frame)),
                        },
                        wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(pass.sampler()) },
                    ],
                })
            })
            .collect();
        Self { layout, uniform_buffer, bind_groups }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn write_uniform(&self, queue: &wgpu::Queue, uniform: &ShadowUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    pub fn bind_group(&self, frame: usize) -> &wgpu::BindGroup {
        &self.bind_groups[frame]
    }
}
