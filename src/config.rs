use anyhow::{Context, Result};
use glam::Vec3;
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::camera3d::{Camera, LightFrame, PerspectiveCamera};
use crate::renderer::{DepthBias, DepthFormat, FrontFace, MAX_SHADOW_CASCADES};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShadowConfig {
    #[serde(default = "ShadowConfig::default_cascade_count")]
    pub cascade_count: u32,
    #[serde(default = "ShadowConfig::default_resolution")]
    pub resolution: u32,
    #[serde(default = "ShadowConfig::default_split_lambda")]
    pub split_lambda: f32,
    #[serde(default = "ShadowConfig::default_frames_in_flight")]
    pub frames_in_flight: u32,
    #[serde(default)]
    pub depth_format: DepthFormat,
    #[serde(default = "ShadowConfig::default_depth_bias_constant")]
    pub depth_bias_constant: i32,
    #[serde(default = "ShadowConfig::default_depth_bias_slope")]
    pub depth_bias_slope: f32,
    #[serde(default)]
    pub depth_bias_clamp: f32,
    #[serde(default)]
    pub front_face: FrontFace,
    #[serde(default)]
    pub share_subpass: bool,
    #[serde(default = "ShadowConfig::default_vertex_shader")]
    pub vertex_shader: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_position")]
    pub position: [f32; 3],
    #[serde(default = "CameraConfig::default_target")]
    pub target: [f32; 3],
    #[serde(default = "CameraConfig::default_fov_degrees")]
    pub fov_y_degrees: f32,
    #[serde(default = "CameraConfig::default_aspect")]
    pub aspect: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
}

/// Sun node transform; rotation in XYZ Euler degrees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LightConfig {
    #[serde(default = "LightConfig::default_euler_degrees")]
    pub euler_degrees: [f32; 3],
    #[serde(default)]
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub shadow: ShadowConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub light: LightConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfigOverrides {
    pub cascade_count: Option<u32>,
    pub resolution: Option<u32>,
    pub near: Option<f32>,
    pub far: Option<f32>,
}

impl ShadowConfig {
    const fn default_cascade_count() -> u32 {
        3
    }

    const fn default_resolution() -> u32 {
        2048
    }

    const fn default_split_lambda() -> f32 {
        0.5
    }

    const fn default_frames_in_flight() -> u32 {
        2
    }

    const fn default_depth_bias_constant() -> i32 {
        -1
    }

    const fn default_depth_bias_slope() -> f32 {
        -1.7
    }

    fn default_vertex_shader() -> String {
        "shadow_depth.wgsl".to_string()
    }

    pub fn sanitized_cascade_count(&self) -> usize {
        (self.cascade_count as usize).clamp(1, MAX_SHADOW_CASCADES)
    }

    pub fn sanitized_resolution(&self) -> u32 {
        self.resolution.max(1)
    }

    pub fn sanitized_frame_count(&self) -> usize {
        self.frames_in_flight.max(1) as usize
    }

    pub fn depth_bias(&self) -> DepthBias {
        DepthBias {
            constant: self.depth_bias_constant,
            slope_scale: self.depth_bias_slope,
            clamp: self.depth_bias_clamp,
        }
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            cascade_count: Self::default_cascade_count(),
            resolution: Self::default_resolution(),
            split_lambda: Self::default_split_lambda(),
            frames_in_flight: Self::default_frames_in_flight(),
            depth_format: DepthFormat::default(),
            depth_bias_constant: Self::default_depth_bias_constant(),
            depth_bias_slope: Self::default_depth_bias_slope(),
            depth_bias_clamp: 0.0,
            front_face: FrontFace::default(),
            share_subpass: false,
            vertex_shader: Self::default_vertex_shader(),
        }
    }
}

impl CameraConfig {
    const fn default_position() -> [f32; 3] {
        [0.0, 1.5, 6.0]
    }

    const fn default_target() -> [f32; 3] {
        [0.0, 1.0, 0.0]
    }

    const fn default_fov_degrees() -> f32 {
        60.0
    }

    fn default_aspect() -> f32 {
        16.0 / 9.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        1000.0
    }

    pub fn to_camera(&self) -> Camera {
        PerspectiveCamera::new(
            Vec3::from(self.position),
            Vec3::from(self.target),
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
        .into()
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Self::default_position(),
            target: Self::default_target(),
            fov_y_degrees: Self::default_fov_degrees(),
            aspect: Self::default_aspect(),
            near: Self::default_near(),
            far: Self::default_far(),
        }
    }
}

impl LightConfig {
    const fn default_euler_degrees() -> [f32; 3] {
        [-43.0, -89.0, -43.0]
    }

    pub fn to_light_frame(&self) -> LightFrame {
        LightFrame::from_euler_degrees(Vec3::from(self.euler_degrees), Vec3::from(self.position))
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self { euler_degrees: Self::default_euler_degrees(), position: [0.0; 3] }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("[config] {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(cascade_count) = overrides.cascade_count {
            self.shadow.cascade_count = cascade_count;
        }
        if let Some(resolution) = overrides.resolution {
            self.shadow.resolution = resolution;
        }
        if let Some(near) = overrides.near {
            self.camera.near = near;
        }
        if let Some(far) = overrides.far {
            self.camera.far = far;
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.cascade_count.is_none() && self.resolution.is_none() && self.near.is_none() && self.far.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.cascade_count.is_some() {
            fields.push("cascade_count");
        }
        if self.resolution.is_some() {
            fields.push("resolution");
        }
        if self.near.is_some() {
            fields.push("near");
        }
        if self.far.is_some() {
            fields.push("far");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_sections_use_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "shadow": {{ "cascade_count": 4, "front_face": "ccw" }} }}"#).expect("write");
        let cfg = AppConfig::load(file.path()).expect("load config");
        assert_eq!(cfg.shadow.cascade_count, 4);
        assert_eq!(cfg.shadow.front_face, FrontFace::Ccw);
        assert_eq!(cfg.shadow.resolution, 2048);
        assert_eq!(cfg.shadow.depth_format, DepthFormat::Depth32Float);
        assert_eq!(cfg.camera, CameraConfig::default());
        assert_eq!(cfg.light.euler_degrees, [-43.0, -89.0, -43.0]);
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{ not json").expect("write");
        assert!(AppConfig::load(file.path()).is_err());
        assert_eq!(AppConfig::load_or_default(file.path()), AppConfig::default());
    }

    #[test]
    fn sanitizes_out_of_range_values() {
        let cfg = ShadowConfig { cascade_count: 9, resolution: 0, frames_in_flight: 0, ..ShadowConfig::default() };
        assert_eq!(cfg.sanitized_cascade_count(), MAX_SHADOW_CASCADES);
        assert_eq!(cfg.sanitized_resolution(), 1);
        assert_eq!(cfg.sanitized_frame_count(), 1);
        let none = ShadowConfig { cascade_count: 0, ..ShadowConfig::default() };
        assert_eq!(none.sanitized_cascade_count(), 1);
    }

    #[test]
    fn overrides_replace_selected_fields() {
        let mut cfg = AppConfig::default();
        let overrides = AppConfigOverrides { cascade_count: Some(2), far: Some(300.0), ..Default::default() };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.shadow.cascade_count, 2);
        assert_eq!(cfg.camera.far, 300.0);
        assert_eq!(cfg.camera.near, 0.1);
        assert_eq!(overrides.applied_fields(), vec!["cascade_count", "far"]);
        assert!(AppConfigOverrides::default().is_empty());
    }

    #[test]
    fn camera_section_builds_perspective_camera() {
        let camera = CameraConfig::default().to_camera();
        let perspective = camera.perspective().expect("perspective camera");
        assert!((perspective.fov_y_radians - 60.0_f32.to_radians()).abs() < 1e-6);
        assert_eq!(perspective.far, 1000.0);
    }
}
