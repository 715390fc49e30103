use glam::Mat4;
use log::{debug, warn};

use crate::camera3d::{Camera, LightFrame, OrthographicCamera};
use crate::config::ShadowConfig;
use crate::error::{ShadowError, ShadowResult};

use super::backend::{
    ImageBarrier, ImageLayout, ScissorRect, ShadowBackend, ShadowCommands, ShadowDevice, ShadowSamplerDesc,
    Viewport,
};
use super::cascade_fitter::{clamp_planes, CascadeFit, CascadeFitter, CascadeSplits};
use super::shadow_subpass::{ShadowCaster, ShadowSubpass};
use super::shadow_targets::{ShadowRenderTarget, ShadowRenderTargets};
use super::MAX_SHADOW_CASCADES;

/// Reversed-Z depth every cascade layer is cleared to.
pub const SHADOW_CLEAR_DEPTH: f32 = 0.0;

/// One partition of the view frustum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cascade {
    pub split_near: f32,
    pub split_far: f32,
    light_camera: Option<OrthographicCamera>,
}

impl Cascade {
    pub fn light_camera(&self) -> Option<&OrthographicCamera> {
        self.light_camera.as_ref()
    }
}

/// Per-frame payload consumed by the lighting pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    pub light_view_proj: [[[f32; 4]; 4]; MAX_SHADOW_CASCADES],
    pub cascade_splits: [f32; 4],
    /// x: cascade count
    pub params: [f32; 4],
}

/// Orchestrates the cascaded shadow maps: fitting, storage, and the per-cascade depth passes.
pub struct ShadowRenderPass<B: ShadowBackend> {
    config: ShadowConfig,
    fitter: CascadeFitter,
    cascades: Vec<Cascade>,
    targets: Option<ShadowRenderTargets<B>>,
    sampler: Option<B::Sampler>,
    subpasses: Vec<ShadowSubpass>,
    light_view: Mat4,
    degenerate_reported: bool,
}

impl<B: ShadowBackend> ShadowRenderPass<B> {
    pub fn new(config: &ShadowConfig) -> Self {
        let fitter = CascadeFitter::new(config.sanitized_cascade_count()).with_lambda(config.split_lambda);
        Self {
            config: config.clone(),
            fitter,
            cascades: Vec::new(),
            targets: None,
            sampler: None,
            subpasses: Vec::new(),
            light_view: Mat4::IDENTITY,
            degenerate_reported: false,
        }
    }

    /// Fits the initial light cameras, then allocates the shadow maps.
    ///
    /// Nothing is allocated when the camera cannot be fitted.
    pub fn init(
        &mut self,
        device: &mut impl ShadowDevice<B>,
        camera: &Camera,
        light: &LightFrame,
    ) -> ShadowResult<()> {
        let perspective = camera.perspective().ok_or(ShadowError::NotPerspective)?;
        let fits = match self.fitter.fit(perspective, light) {
            Err(err @ ShadowError::DegenerateFrustum { .. }) => {
                warn!("[shadow] {err} at init; clamping camera planes");
                self.fitter.fit(&clamp_planes(perspective), light)?
            }
            result => result?,
        };

        let cascade_count = self.fitter.cascade_count();
        let targets = ShadowRenderTargets::initialize(
            device,
            self.config.sanitized_frame_count(),
            cascade_count,
            self.config.sanitized_resolution(),
            self.config.depth_format,
        )?;
        let sampler = device.create_comparison_sampler(&ShadowSamplerDesc::default())?;

        let subpass =
            ShadowSubpass::new(self.config.front_face, self.config.depth_bias(), self.config.vertex_shader.clone());
        let subpass_count = if self.config.share_subpass { 1 } else { cascade_count };
        self.subpasses = vec![subpass; subpass_count];

        self.cascades = vec![Cascade::default(); cascade_count];
        self.apply_fits(&fits, light);
        self.targets = Some(targets);
        self.sampler = Some(sampler);
        debug!(
            "[shadow] initialised {} cascades x {} frames at {}px",
            cascade_count,
            self.frame_count(),
            self.resolution()
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.targets.is_some()
    }

    /// Refits every cascade to the current camera and light.
    ///
    /// A degenerate frustum is reported once, then refitted with clamped planes.
    /// Any other failure, or a clamped refit that still fails, leaves the
    /// previous volumes in place and returns the error.
    pub fn update(&mut self, camera: &Camera, light: &LightFrame) -> ShadowResult<()> {
        assert!(self.is_initialized(), "shadow pass updated before init");
        let perspective = camera.perspective().ok_or(ShadowError::NotPerspective)?;
        let fits = match self.fitter.fit(perspective, light) {
            Ok(fits) => {
                self.degenerate_reported = false;
                fits
            }
            Err(err @ ShadowError::DegenerateFrustum { .. }) => {
                self.report_degenerate(&err, "clamping camera planes");
                self.fitter.fit(&clamp_planes(perspective), light)?
            }
            Err(err) => {
                self.report_degenerate(&err, "keeping previous cascades");
                return Err(err);
            }
        };
        self.apply_fits(&fits, light);
        Ok(())
    }

    fn report_degenerate(&mut self, err: &ShadowError, action: &str) {
        if !self.degenerate_reported {
            warn!("[shadow] {err}; {action}");
            self.degenerate_reported = true;
        }
    }

    fn apply_fits(&mut self, fits: &[CascadeFit], light: &LightFrame) {
        for (cascade, fit) in self.cascades.iter_mut().zip(fits) {
            cascade.split_near = fit.split_near;
            cascade.split_far = fit.split_far;
            cascade.light_camera = Some(fit.light_camera);
        }
        self.light_view = light.view_matrix();
    }

    /// Records the cascade depth passes for `frame`, bracketed by one entry and one exit barrier.
    pub fn draw(
        &mut self,
        frame: usize,
        commands: &mut impl ShadowCommands<B>,
        casters: &[ShadowCaster<'_, B::Mesh>],
    ) {
        let light_matrices = self.light_matrices();
        let targets = self.targets.as_mut().expect("shadow pass drawn before init");
        assert!(frame < targets.frame_count(), "frame {frame} out of range");
        let layer_count = targets.cascade_count() as u32;
        let resolution = targets.resolution();

        let entry = ImageBarrier::to_depth_attachment(targets.layout(frame), layer_count);
        commands.image_barrier(targets.array_view(frame), &entry);
        targets.set_layout(frame, ImageLayout::DepthAttachment);
        commands.reserve_draws(casters.len());

        for (index, light_view_proj) in light_matrices.iter().enumerate() {
            let target = targets.render_target(frame, index);
            commands.begin_depth_pass(&target.view, "Shadow Pass", SHADOW_CLEAR_DEPTH);
            commands.set_viewport(Viewport::square(resolution));
            commands.set_scissor(ScissorRect::square(resolution));
            let subpass = &self.subpasses[index.min(self.subpasses.len() - 1)];
            subpass.draw::<B>(commands, index, *light_view_proj, casters);
            commands.end_depth_pass();
        }

        commands.image_barrier(targets.array_view(frame), &ImageBarrier::to_shader_read(layer_count));
        targets.set_layout(frame, ImageLayout::ShaderReadOnly);
    }

    fn light_matrices(&self) -> Vec<Mat4> {
        self.cascades
            .iter()
            .enumerate()
            .map(|(index, cascade)| {
                let light_camera = cascade
                    .light_camera
                    .as_ref()
                    .unwrap_or_else(|| panic!("cascade {index} has no light camera"));
                light_camera.projection_matrix() * self.light_view
            })
            .collect()
    }

    pub fn light_camera(&self, cascade: usize) -> ShadowResult<&OrthographicCamera> {
        self.cascades
            .get(cascade)
            .and_then(|c| c.light_camera.as_ref())
            .ok_or(ShadowError::UninitializedCascade { cascade })
    }

    /// Light projection-view matrix of every cascade plus the split depths.
    pub fn shadow_uniform(&self) -> ShadowResult<ShadowUniform> {
        let mut uniform = ShadowUniform::identity();
        if self.cascades.is_empty() {
            return Err(ShadowError::UninitializedCascade { cascade: 0 });
        }
        for (index, cascade) in self.cascades.iter().enumerate() {
            let light_camera = self.light_camera(index)?;
            uniform.light_view_proj[index] = (light_camera.projection_matrix() * self.light_view).to_cols_array_2d();
            if index + 1 < self.cascades.len() {
                uniform.cascade_splits[index] = cascade.split_far;
            }
        }
        uniform.params[0] = self.cascades.len() as f32;
        Ok(uniform)
    }

    /// Interior split depths for `camera` (`cascade_count - 1` values).
    pub fn cascade_splits(&self, camera: &Camera) -> ShadowResult<CascadeSplits> {
        let perspective = camera.perspective().ok_or(ShadowError::NotPerspective)?;
        self.fitter.cascade_splits(perspective)
    }

    pub fn cascades(&self) -> &[Cascade] {
        &self.cascades
    }

    pub fn render_target(&self, frame: usize, cascade: usize) -> &ShadowRenderTarget<B> {
        self.targets().render_target(frame, cascade)
    }

    pub fn array_view(&self, frame: usize) -> &B::View {
        self.targets().array_view(frame)
    }

    pub fn image_layout(&self, frame: usize) -> ImageLayout {
        self.targets().layout(frame)
    }

    pub fn sampler(&self) -> &B::Sampler {
        self.sampler.as_ref().expect("shadow sampler requested before init")
    }

    pub fn cascade_count(&self) -> usize {
        self.fitter.cascade_count()
    }

    pub fn frame_count(&self) -> usize {
        self.targets.as_ref().map_or(0, |targets| targets.frame_count())
    }

    pub fn resolution(&self) -> u32 {
        self.config.sanitized_resolution()
    }

    pub fn subpass_count(&self) -> usize {
        self.subpasses.len()
    }

    fn targets(&self) -> &ShadowRenderTargets<B> {
        self.targets.as_ref().expect("shadow targets requested before init")
    }
}

impl ShadowUniform {
    fn identity() -> Self {
        Self {
            light_view_proj: [Mat4::IDENTITY.to_cols_array_2d(); MAX_SHADOW_CASCADES],
            cascade_splits: [0.0; 4],
            params: [0.0; 4],
        }
    }
}
