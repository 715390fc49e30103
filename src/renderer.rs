//! Cascaded shadow maps for a single directional light.
//!
//! [`ShadowRenderPass`] owns the per-frame layered depth images (through
//! [`ShadowRenderTargets`]), fits one orthographic light volume per cascade
//! with [`CascadeFitter`] and records the depth passes through a
//! [`ShadowCommands`] implementation.

pub mod backend;
pub mod cascade_fitter;
pub mod recording;
pub mod shadow_pass;
pub mod shadow_subpass;
pub mod shadow_targets;
#[cfg(feature = "wgpu_backend")]
pub mod wgpu_backend;

pub const MAX_SHADOW_CASCADES: usize = 4;

pub use backend::{
    AccessFlags, CompareOp, DepthBias, DepthFormat, FrontFace, ImageBarrier, ImageLayout, PipelineStages,
    ScissorRect, ShadowBackend, ShadowCommands, ShadowDevice, ShadowPipelineState, ShadowSamplerDesc, Viewport,
};
pub use cascade_fitter::{CascadeFit, CascadeFitter, CascadeSplits};
pub use shadow_pass::{Cascade, ShadowRenderPass, ShadowUniform, SHADOW_CLEAR_DEPTH};
pub use shadow_subpass::{ShadowCaster, ShadowSubpass};
pub use shadow_targets::{ShadowRenderTarget, ShadowRenderTargets};
