use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;

use crate::camera3d::{LightFrame, OrthographicCamera, PerspectiveCamera};
use crate::error::{ShadowError, ShadowResult};

use super::MAX_SHADOW_CASCADES;

pub const DEFAULT_SPLIT_LAMBDA: f32 = 0.5;

/// Smallest near plane and depth range used when recovering from a degenerate frustum.
pub const MIN_NEAR_PLANE: f32 = 0.001;
pub const MIN_DEPTH_RANGE: f32 = 0.01;

/// Reversed-Z split depths between adjacent cascades (`cascade_count - 1` values).
pub type CascadeSplits = SmallVec<[f32; MAX_SHADOW_CASCADES]>;

/// One cascade's clip-space depth range and the light volume fitted to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeFit {
    pub split_near: f32,
    pub split_far: f32,
    pub light_camera: OrthographicCamera,
}

/// Partitions a perspective frustum into cascades and fits light-space volumes to each slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeFitter {
    cascade_count: usize,
    lambda: f32,
}

impl CascadeFitter {
    pub fn new(cascade_count: usize) -> Self {
        Self { cascade_count: cascade_count.clamp(1, MAX_SHADOW_CASCADES), lambda: DEFAULT_SPLIT_LAMBDA }
    }

    pub fn with_lambda(mut self, lambda: f32) -> Self {
        self.lambda = if lambda.is_finite() { lambda.clamp(0.0, 1.0) } else { DEFAULT_SPLIT_LAMBDA };
        self
    }

    pub fn cascade_count(&self) -> usize {
        self.cascade_count
    }

    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    /// View-space distance of cascade boundary `index` (0 is the near plane, `cascade_count` the far plane).
    pub fn split_distance(&self, index: usize, near: f32, far: f32) -> f32 {
        let ratio = index as f32 / self.cascade_count as f32;
        let log_split = near * (far / near).powf(ratio);
        let linear_split = near + ratio * (far - near);
        self.lambda * log_split + (1.0 - self.lambda) * linear_split
    }

    /// Reversed-Z clip depth of cascade boundary `index`.
    pub fn split_depth(&self, index: usize, near: f32, far: f32) -> f32 {
        reversed_z_depth(self.split_distance(index, near, far), near, far)
    }

    /// Interior split depths handed to the lighting shader for cascade selection.
    pub fn cascade_splits(&self, camera: &PerspectiveCamera) -> ShadowResult<CascadeSplits> {
        validate_planes(camera.near, camera.far)?;
        Ok((1..self.cascade_count).map(|index| self.split_depth(index, camera.near, camera.far)).collect())
    }

    /// Fits one orthographic volume per cascade for the camera as seen from `light`.
    pub fn fit(&self, camera: &PerspectiveCamera, light: &LightFrame) -> ShadowResult<Vec<CascadeFit>> {
        validate_planes(camera.near, camera.far)?;
        let inv_view_proj = camera.view_projection().inverse();
        let light_view = light.view_matrix();
        if !light_view.is_finite() {
            return Err(ShadowError::DegenerateLight);
        }
        let mut fits = Vec::with_capacity(self.cascade_count);
        let mut split_near = self.split_depth(0, camera.near, camera.far);
        for index in 0..self.cascade_count {
            let split_far = self.split_depth(index + 1, camera.near, camera.far);
            let corners = frustum_corners(inv_view_proj, split_near, split_far);
            if corners.iter().any(|corner| !corner.is_finite()) {
                return Err(ShadowError::DegenerateFrustum { near: camera.near, far: camera.far });
            }
            let (min, max) = light_space_bounds(&corners, light_view);
            if !(min.is_finite() && max.is_finite() && min.cmple(max).all()) {
                return Err(ShadowError::DegenerateLight);
            }
            let light_camera = OrthographicCamera::from_light_space_bounds(min, max);
            if !light_camera.is_finite() {
                return Err(ShadowError::DegenerateFrustum { near: camera.near, far: camera.far });
            }
            fits.push(CascadeFit { split_near, split_far, light_camera });
            split_near = split_far;
        }
        Ok(fits)
    }
}

impl Default for CascadeFitter {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Converts a view-space distance to the reversed-Z depth of a `[near, far]` projection.
pub fn reversed_z_depth(distance: f32, near: f32, far: f32) -> f32 {
    near / (near - far) - (far * near) / ((near - far) * distance)
}

fn validate_planes(near: f32, far: f32) -> ShadowResult<()> {
    let finite = near.is_finite() && far.is_finite();
    if !finite || near <= 0.0 || far - near <= f32::EPSILON * far.abs().max(1.0) {
        return Err(ShadowError::DegenerateFrustum { near, far });
    }
    Ok(())
}

/// Camera with its planes pushed apart far enough to fit cascades again.
pub fn clamp_planes(camera: &PerspectiveCamera) -> PerspectiveCamera {
    let mut clamped = camera.clone();
    let near = if clamped.near.is_finite() { clamped.near.max(MIN_NEAR_PLANE) } else { MIN_NEAR_PLANE };
    let far = if clamped.far.is_finite() { clamped.far } else { near + MIN_DEPTH_RANGE };
    clamped.near = near;
    clamped.far = far.max(near + MIN_DEPTH_RANGE.max(near * MIN_DEPTH_RANGE));
    clamped
}

/// World-space corners of the frustum slice between two clip depths.
///
/// Corner `i` uses x = +1 when bit 0 is set, y = +1 when bit 1 is set and the
/// near depth when bit 2 is set.
pub fn frustum_corners(inv_view_proj: Mat4, depth_near: f32, depth_far: f32) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let ndc = Vec4::new(
            if i & 1 != 0 { 1.0 } else { -1.0 },
            if i & 2 != 0 { 1.0 } else { -1.0 },
            if i & 4 != 0 { depth_near } else { depth_far },
            1.0,
        );
        let world = inv_view_proj * ndc;
        *corner = world.truncate() / world.w;
    }
    corners
}

/// Axis-aligned box of `corners` after transforming them by `light_view`.
///
/// NaN components are skipped by `min`/`max`, so an all-NaN input yields an
/// inverted box; callers check `min <= max` before using it.
pub fn light_space_bounds(corners: &[Vec3], light_view: Mat4) -> (Vec3, Vec3) {
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for corner in corners {
        let light_space = light_view.transform_point3(*corner);
        min = min.min(light_space);
        max = max.max(light_space);
    }
    (min, max)
}
