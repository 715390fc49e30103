//! Headless backend that hands out ids and records every command.

use glam::Mat4;

use crate::error::{ShadowError, ShadowResult};

use super::backend::{
    ImageBarrier, LayeredImageDesc, ScissorRect, ShadowBackend, ShadowCommands, ShadowDevice,
    ShadowPipelineState, ShadowSamplerDesc, ViewDesc, ViewDimension, Viewport,
};

pub struct RecordingBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedImage {
    pub id: u64,
    pub layers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedView {
    pub image: u64,
    pub dimension: ViewDimension,
    pub base_layer: u32,
    pub layer_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedMesh(pub u32);

impl ShadowBackend for RecordingBackend {
    type Image = RecordedImage;
    type View = RecordedView;
    type Sampler = ShadowSamplerDesc;
    type Mesh = RecordedMesh;
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub images: Vec<LayeredImageDesc>,
    pub views_created: usize,
    pub samplers: Vec<ShadowSamplerDesc>,
    /// Fails image creation once this many images exist.
    pub fail_images_after: Option<usize>,
}

impl ShadowDevice<RecordingBackend> for RecordingDevice {
    fn create_layered_depth_image(&mut self, desc: &LayeredImageDesc) -> ShadowResult<RecordedImage> {
        if self.fail_images_after.is_some_and(|limit| self.images.len() >= limit) {
            return Err(ShadowError::allocation(desc.label, "out of device memory"));
        }
        self.images.push(*desc);
        Ok(RecordedImage { id: self.images.len() as u64 - 1, layers: desc.layers })
    }

    fn create_view(&mut self, image: &RecordedImage, desc: &ViewDesc) -> ShadowResult<RecordedView> {
        if desc.base_layer + desc.layer_count > image.layers {
            return Err(ShadowError::allocation(desc.label, "view exceeds image layers"));
        }
        self.views_created += 1;
        Ok(RecordedView {
            image: image.id,
            dimension: desc.dimension,
            base_layer: desc.base_layer,
            layer_count: desc.layer_count,
        })
    }

    fn create_comparison_sampler(&mut self, desc: &ShadowSamplerDesc) -> ShadowResult<ShadowSamplerDesc> {
        self.samplers.push(*desc);
        Ok(*desc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Barrier { view: RecordedView, barrier: ImageBarrier },
    ReserveDraws(usize),
    BeginDepthPass { target: RecordedView, clear_depth: f32 },
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    SetPipelineState(ShadowPipelineState),
    SetLightMatrix { cascade: usize, light_view_proj: Mat4 },
    DrawMesh { mesh: RecordedMesh, model: Mat4 },
    EndDepthPass,
}

#[derive(Debug, Default)]
pub struct RecordingCommands {
    pub commands: Vec<RecordedCommand>,
}

impl RecordingCommands {
    pub fn barriers(&self) -> impl Iterator<Item = (&RecordedView, &ImageBarrier)> {
        self.commands.iter().filter_map(|command| match command {
            RecordedCommand::Barrier { view, barrier } => Some((view, barrier)),
            _ => None,
        })
    }

    pub fn depth_passes(&self) -> impl Iterator<Item = &RecordedView> {
        self.commands.iter().filter_map(|command| match command {
            RecordedCommand::BeginDepthPass { target, .. } => Some(target),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|command| matches!(command, RecordedCommand::DrawMesh { .. })).count()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl ShadowCommands<RecordingBackend> for RecordingCommands {
    fn image_barrier(&mut self, view: &RecordedView, barrier: &ImageBarrier) {
        self.commands.push(RecordedCommand::Barrier { view: *view, barrier: *barrier });
    }

    fn reserve_draws(&mut self, casters: usize) {
        self.commands.push(RecordedCommand::ReserveDraws(casters));
    }

    fn begin_depth_pass(&mut self, target: &RecordedView, _label: &str, clear_depth: f32) {
        self.commands.push(RecordedCommand::BeginDepthPass { target: *target, clear_depth });
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(RecordedCommand::SetViewport(viewport));
    }

    fn set_scissor(&mut self, scissor: ScissorRect) {
        self.commands.push(RecordedCommand::SetScissor(scissor));
    }

    fn set_pipeline_state(&mut self, state: &ShadowPipelineState) {
        self.commands.push(RecordedCommand::SetPipelineState(*state));
    }

    fn set_light_matrix(&mut self, cascade: usize, light_view_proj: Mat4) {
        self.commands.push(RecordedCommand::SetLightMatrix { cascade, light_view_proj });
    }

    fn draw_mesh(&mut self, mesh: &RecordedMesh, model: Mat4) {
        self.commands.push(RecordedCommand::DrawMesh { mesh: *mesh, model });
    }

    fn end_depth_pass(&mut self) {
        self.commands.push(RecordedCommand::EndDepthPass);
    }
}
