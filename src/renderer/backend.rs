//! Narrow interface between the shadow subsystem and the GPU substrate.
//!
//! The orchestrator never talks to a graphics API directly: a [`ShadowDevice`]
//! allocates the layered depth images, views and the comparison sampler, and a
//! [`ShadowCommands`] recorder receives barriers, depth passes and draws.

use bitflags::bitflags;
use glam::Mat4;
use serde::Deserialize;

use crate::error::ShadowResult;

/// Associated handle types of a GPU backend.
pub trait ShadowBackend {
    type Image;
    type View: Clone;
    type Sampler;
    type Mesh;
}

pub trait ShadowDevice<B: ShadowBackend> {
    fn create_layered_depth_image(&mut self, desc: &LayeredImageDesc) -> ShadowResult<B::Image>;

    fn create_view(&mut self, image: &B::Image, desc: &ViewDesc) -> ShadowResult<B::View>;

    fn create_comparison_sampler(&mut self, desc: &ShadowSamplerDesc) -> ShadowResult<B::Sampler>;
}

pub trait ShadowCommands<B: ShadowBackend> {
    /// Records an image memory barrier on the image behind `view`.
    fn image_barrier(&mut self, view: &B::View, barrier: &ImageBarrier);

    /// Sizes per-draw storage for `casters` distinct casters before any depth pass opens.
    ///
    /// Every cascade draws the same casters, so backends may share one slot per caster.
    fn reserve_draws(&mut self, _casters: usize) {}

    fn begin_depth_pass(&mut self, target: &B::View, label: &str, clear_depth: f32);

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_scissor(&mut self, scissor: ScissorRect);

    fn set_pipeline_state(&mut self, state: &ShadowPipelineState);

    /// Makes `light_view_proj` the camera for the draws that follow.
    fn set_light_matrix(&mut self, cascade: usize, light_view_proj: Mat4);

    fn draw_mesh(&mut self, mesh: &B::Mesh, model: Mat4);

    fn end_depth_pass(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepthFormat {
    #[default]
    Depth32Float,
    Depth24Plus,
    Depth16Unorm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayeredImageDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub format: DepthFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDimension {
    D2,
    D2Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewDesc {
    pub label: &'static str,
    pub dimension: ViewDimension,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl ViewDesc {
    pub fn whole_array(layers: u32) -> Self {
        Self { label: "Shadow Map Array View", dimension: ViewDimension::D2Array, base_layer: 0, layer_count: layers }
    }

    pub fn single_layer(layer: u32) -> Self {
        Self { label: "Shadow Map Cascade Layer", dimension: ViewDimension::D2, base_layer: layer, layer_count: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    LessEqual,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderColor {
    OpaqueBlack,
    OpaqueWhite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowSamplerDesc {
    pub filter: FilterMode,
    pub address_mode: AddressMode,
    pub compare: CompareOp,
    pub border_color: BorderColor,
}

impl Default for ShadowSamplerDesc {
    /// Hardware PCF over a reversed-Z shadow map; samples outside the map are lit.
    fn default() -> Self {
        Self {
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToBorder,
            compare: CompareOp::GreaterEqual,
            border_color: BorderColor::OpaqueWhite,
        }
    }
}

/// Layout of a shadow map image as seen by the barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Undefined,
    DepthAttachment,
    ShaderReadOnly,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const EARLY_FRAGMENT_TESTS = 1 << 1;
        const LATE_FRAGMENT_TESTS = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const DEPTH_STENCIL_READ = 1 << 0;
        const DEPTH_STENCIL_WRITE = 1 << 1;
        const SHADER_READ = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl ImageBarrier {
    /// Makes every layer writable as a depth attachment.
    pub fn to_depth_attachment(old_layout: ImageLayout, layer_count: u32) -> Self {
        Self {
            old_layout,
            new_layout: ImageLayout::DepthAttachment,
            src_stages: PipelineStages::TOP_OF_PIPE,
            dst_stages: PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS,
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::DEPTH_STENCIL_READ | AccessFlags::DEPTH_STENCIL_WRITE,
            base_layer: 0,
            layer_count,
        }
    }

    /// Publishes the depth writes of every layer to fragment shader reads.
    pub fn to_shader_read(layer_count: u32) -> Self {
        Self {
            old_layout: ImageLayout::DepthAttachment,
            new_layout: ImageLayout::ShaderReadOnly,
            src_stages: PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: AccessFlags::DEPTH_STENCIL_WRITE,
            dst_access: AccessFlags::SHADER_READ,
            base_layer: 0,
            layer_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn square(size: u32) -> Self {
        Self { x: 0.0, y: 0.0, width: size as f32, height: size as f32, min_depth: 0.0, max_depth: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn square(size: u32) -> Self {
        Self { x: 0, y: 0, width: size, height: size }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrontFace {
    Ccw,
    #[default]
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub constant: i32,
    pub slope_scale: f32,
    pub clamp: f32,
}

/// Fixed-function state of the depth-only shadow pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowPipelineState {
    pub front_face: FrontFace,
    pub cull_back_faces: bool,
    pub depth_bias: DepthBias,
    pub depth_clamp: bool,
    pub depth_compare: CompareOp,
}
