use glam::Mat4;

use super::backend::{CompareOp, DepthBias, FrontFace, ShadowBackend, ShadowCommands, ShadowPipelineState};

/// Mesh submitted by the scene for shadow rendering.
pub struct ShadowCaster<'a, M> {
    pub mesh: &'a M,
    pub model: Mat4,
    pub double_sided: bool,
}

impl<'a, M> ShadowCaster<'a, M> {
    pub fn new(mesh: &'a M, model: Mat4) -> Self {
        Self { mesh, model, double_sided: false }
    }

    pub fn double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }
}

impl<M> Clone for ShadowCaster<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for ShadowCaster<'_, M> {}

/// Depth-only geometry subpass.
///
/// Holds no camera: the light matrix of the cascade being rendered is passed to
/// [`ShadowSubpass::draw`], so one instance can serve every cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSubpass {
    front_face: FrontFace,
    depth_bias: DepthBias,
    vertex_shader: String,
}

impl ShadowSubpass {
    pub fn new(front_face: FrontFace, depth_bias: DepthBias, vertex_shader: impl Into<String>) -> Self {
        Self { front_face, depth_bias, vertex_shader: vertex_shader.into() }
    }

    pub fn vertex_shader(&self) -> &str {
        &self.vertex_shader
    }

    pub fn pipeline_state(&self, double_sided: bool) -> ShadowPipelineState {
        ShadowPipelineState {
            front_face: self.front_face,
            cull_back_faces: !double_sided,
            depth_bias: self.depth_bias,
            depth_clamp: true,
            depth_compare: CompareOp::GreaterEqual,
        }
    }

    pub fn draw<B: ShadowBackend>(
        &self,
        commands: &mut impl ShadowCommands<B>,
        cascade: usize,
        light_view_proj: Mat4,
        casters: &[ShadowCaster<'_, B::Mesh>],
    ) {
        commands.set_light_matrix(cascade, light_view_proj);
        let mut bound: Option<bool> = None;
        for caster in casters {
            if bound != Some(caster.double_sided) {
                commands.set_pipeline_state(&self.pipeline_state(caster.double_sided));
                bound = Some(caster.double_sided);
            }
            commands.draw_mesh(caster.mesh, caster.model);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::recording::{RecordedCommand, RecordedMesh, RecordingBackend, RecordingCommands};

    fn subpass() -> ShadowSubpass {
        ShadowSubpass::new(
            FrontFace::Cw,
            DepthBias { constant: -1, slope_scale: -1.7, clamp: 0.0 },
            "shadow_depth.wgsl",
        )
    }

    #[test]
    fn pipeline_state_is_depth_only_with_bias_and_clamp() {
        let state = subpass().pipeline_state(false);
        assert!(state.depth_clamp);
        assert!(state.cull_back_faces);
        assert_eq!(state.depth_compare, CompareOp::GreaterEqual);
        assert!(state.depth_bias.constant < 0 && state.depth_bias.slope_scale < 0.0);
        assert!(!subpass().pipeline_state(true).cull_back_faces);
    }

    #[test]
    fn pipeline_state_switches_only_on_material_change() {
        let meshes = [RecordedMesh(0), RecordedMesh(1), RecordedMesh(2)];
        let casters = [
            ShadowCaster::new(&meshes[0], Mat4::IDENTITY),
            ShadowCaster::new(&meshes[1], Mat4::IDENTITY),
            ShadowCaster::new(&meshes[2], Mat4::IDENTITY).double_sided(true),
        ];
        let mut commands = RecordingCommands::default();
        subpass().draw::<RecordingBackend>(&mut commands, 1, Mat4::IDENTITY, &casters);

        assert!(matches!(commands.commands[0], RecordedCommand::SetLightMatrix { cascade: 1, .. }));
        let state_changes = commands
            .commands
            .iter()
            .filter(|command| matches!(command, RecordedCommand::SetPipelineState(_)))
            .count();
        assert_eq!(state_changes, 2);
        assert_eq!(commands.draw_count(), 3);
    }

    #[test]
    fn shared_instance_draws_any_light_camera() {
        let shared = subpass();
        let mesh = RecordedMesh(7);
        let casters = [ShadowCaster::new(&mesh, Mat4::IDENTITY)];
        let mut commands = RecordingCommands::default();
        let first = Mat4::from_scale(glam::Vec3::splat(2.0));
        let second = Mat4::from_scale(glam::Vec3::splat(3.0));
        shared.draw::<RecordingBackend>(&mut commands, 0, first, &casters);
        shared.draw::<RecordingBackend>(&mut commands, 1, second, &casters);
        let matrices: Vec<_> = commands
            .commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::SetLightMatrix { light_view_proj, .. } => Some(*light_view_proj),
                _ => None,
            })
            .collect();
        assert_eq!(matrices, vec![first, second]);
    }
}
