use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};

const DEFAULT_UP: Vec3 = Vec3::Y;

/// Perspective camera using a reversed-Z projection (depth 1 at the near plane, 0 at the far plane).
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, aspect, near, far }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        // Swapping the planes turns glam's [0, 1] projection into reversed-Z.
        Mat4::perspective_rh(self.fov_y_radians, self.aspect.max(0.0001), self.far, self.near)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Axis-aligned orthographic volume expressed in a light's view space.
///
/// `near` and `far` are distances along the viewing axis (-Z), so a volume in
/// front of the light has `near < far`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrthographicCamera {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthographicCamera {
    /// Builds the tightest volume around a light-view-space box.
    pub fn from_light_space_bounds(min: Vec3, max: Vec3) -> Self {
        Self { left: min.x, right: max.x, bottom: min.y, top: max.y, near: -max.z, far: -min.z }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(self.left, self.right, self.bottom, self.top, self.far, self.near)
    }

    pub fn depth_extent(&self) -> f32 {
        self.far - self.near
    }

    pub fn is_finite(&self) -> bool {
        [self.left, self.right, self.bottom, self.top, self.near, self.far].iter().all(|v| v.is_finite())
    }
}

/// Camera handed to the shadow subsystem by the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Camera {
    Perspective(PerspectiveCamera),
    Orthographic { camera: OrthographicCamera, view: Mat4 },
}

impl Camera {
    pub fn perspective(&self) -> Option<&PerspectiveCamera> {
        match self {
            Camera::Perspective(camera) => Some(camera),
            Camera::Orthographic { .. } => None,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        match self {
            Camera::Perspective(camera) => camera.view_matrix(),
            Camera::Orthographic { view, .. } => *view,
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self {
            Camera::Perspective(camera) => camera.projection_matrix(),
            Camera::Orthographic { camera, .. } => camera.projection_matrix(),
        }
    }

    pub fn near(&self) -> f32 {
        match self {
            Camera::Perspective(camera) => camera.near,
            Camera::Orthographic { camera, .. } => camera.near,
        }
    }

    pub fn far(&self) -> f32 {
        match self {
            Camera::Perspective(camera) => camera.far,
            Camera::Orthographic { camera, .. } => camera.far,
        }
    }
}

impl From<PerspectiveCamera> for Camera {
    fn from(camera: PerspectiveCamera) -> Self {
        Camera::Perspective(camera)
    }
}

/// World transform of a directional light's node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFrame {
    pub rotation: Quat,
    pub position: Vec3,
}

impl Default for LightFrame {
    fn default() -> Self {
        Self { rotation: Quat::IDENTITY, position: Vec3::ZERO }
    }
}

impl LightFrame {
    pub fn new(rotation: Quat, position: Vec3) -> Self {
        Self { rotation: rotation.normalize(), position }
    }

    pub fn from_euler_degrees(angles: Vec3, position: Vec3) -> Self {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            angles.x.to_radians(),
            angles.y.to_radians(),
            angles.z.to_radians(),
        );
        Self::new(rotation, position)
    }

    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// Direction the light travels in world space.
    pub fn direction(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Light view matrix: inverse world transform followed by a Y flip.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)) * self.world_matrix().inverse()
    }
}

/// Transforms a point through `matrix` and performs the perspective divide.
pub fn project_point(matrix: Mat4, point: Vec4) -> Option<Vec3> {
    let clip = matrix * point;
    if clip.w.abs() < f32::EPSILON || !clip.is_finite() {
        return None;
    }
    Some(clip.truncate() / clip.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_z_maps_near_to_one_and_far_to_zero() {
        let camera = PerspectiveCamera::new(Vec3::ZERO, Vec3::NEG_Z, 60.0_f32.to_radians(), 1.0, 0.5, 50.0);
        let proj = camera.projection_matrix();
        let near = project_point(proj, Vec4::new(0.0, 0.0, -0.5, 1.0)).expect("near point");
        let far = project_point(proj, Vec4::new(0.0, 0.0, -50.0, 1.0)).expect("far point");
        assert!((near.z - 1.0).abs() < 1e-5);
        assert!(far.z.abs() < 1e-5);
    }

    #[test]
    fn orthographic_volume_maps_near_to_one() {
        let ortho = OrthographicCamera::from_light_space_bounds(
            Vec3::new(-2.0, -1.0, -30.0),
            Vec3::new(2.0, 1.0, -10.0),
        );
        assert_eq!(ortho.near, 10.0);
        assert_eq!(ortho.far, 30.0);
        let proj = ortho.projection_matrix();
        let near = proj.transform_point3(Vec3::new(2.0, 1.0, -10.0));
        let far = proj.transform_point3(Vec3::new(-2.0, -1.0, -30.0));
        assert!((near - Vec3::new(1.0, 1.0, 1.0)).length() < 1e-5);
        assert!((far - Vec3::new(-1.0, -1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn light_view_flips_y() {
        let light = LightFrame::default();
        let p = light.view_matrix().transform_point3(Vec3::new(1.0, 2.0, -3.0));
        assert!(p.abs_diff_eq(Vec3::new(1.0, -2.0, -3.0), 1e-6));
    }

    #[test]
    fn light_travels_along_rotated_negative_z() {
        assert!(LightFrame::default().direction().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        let tilted = LightFrame::from_euler_degrees(Vec3::new(-90.0, 0.0, 0.0), Vec3::ZERO);
        assert!(tilted.direction().abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn camera_enum_exposes_planes() {
        let perspective = PerspectiveCamera::new(Vec3::ZERO, Vec3::NEG_Z, 1.0, 1.5, 0.1, 500.0);
        let camera = Camera::from(perspective);
        assert!(camera.perspective().is_some());
        assert_eq!(camera.near(), 0.1);
        assert_eq!(camera.far(), 500.0);
        let ortho = Camera::Orthographic { camera: OrthographicCamera::default(), view: Mat4::IDENTITY };
        assert!(ortho.perspective().is_none());
    }
}
