//! Headless run of the shadow pass on the recording backend.

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use log::info;
use std::fmt;

use crate::cli::CliOverrides;
use crate::config::AppConfig;
use crate::renderer::recording::{RecordedMesh, RecordingBackend, RecordingCommands, RecordingDevice};
use crate::renderer::{CascadeSplits, ShadowCaster, ShadowRenderPass};

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeSummary {
    pub split_near: f32,
    pub split_far: f32,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub splits: CascadeSplits,
    pub cascades: Vec<CascadeSummary>,
    pub frames: u32,
    pub images: usize,
    pub barriers: usize,
    pub depth_passes: usize,
    pub draws: usize,
}

pub fn run(cli: &CliOverrides) -> Result<ProbeReport> {
    let mut config = AppConfig::load_or_default(cli.config_path());
    let overrides = cli.config_overrides();
    if !overrides.is_empty() {
        info!("[probe] overriding {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);
    run_with_config(&config, cli.frames())
}

pub fn run_with_config(config: &AppConfig, frames: u32) -> Result<ProbeReport> {
    let camera = config.camera.to_camera();
    let light = config.light.to_light_frame();
    let mut device = RecordingDevice::default();
    let mut pass = ShadowRenderPass::<RecordingBackend>::new(&config.shadow);
    pass.init(&mut device, &camera, &light).context("Failed to initialise shadow pass")?;

    let meshes = [RecordedMesh(0), RecordedMesh(1)];
    let casters = [
        ShadowCaster::new(&meshes[0], Mat4::from_scale(Vec3::new(20.0, 0.1, 20.0))),
        ShadowCaster::new(&meshes[1], Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))).double_sided(true),
    ];

    let mut commands = RecordingCommands::default();
    for frame in 0..frames as usize {
        pass.update(&camera, &light).context("Failed to fit cascades")?;
        pass.draw(frame % pass.frame_count(), &mut commands, &casters);
    }

    let splits = pass.cascade_splits(&camera).context("Failed to compute cascade splits")?;
    let cascades = pass
        .cascades()
        .iter()
        .filter_map(|cascade| {
            let volume = cascade.light_camera()?;
            Some(CascadeSummary {
                split_near: cascade.split_near,
                split_far: cascade.split_far,
                width: volume.right - volume.left,
                height: volume.top - volume.bottom,
                depth: volume.depth_extent(),
            })
        })
        .collect();

    Ok(ProbeReport {
        splits,
        cascades,
        frames,
        images: device.images.len(),
        barriers: commands.barriers().count(),
        depth_passes: commands.depth_passes().count(),
        draws: commands.draw_count(),
    })
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "splits: {:?}", self.splits.as_slice())?;
        for (index, cascade) in self.cascades.iter().enumerate() {
            writeln!(
                f,
                "cascade {index}: depth {:.6}..{:.6} volume {:.2} x {:.2} x {:.2}",
                cascade.split_near, cascade.split_far, cascade.width, cascade.height, cascade.depth
            )?;
        }
        write!(
            f,
            "{} frames: {} images, {} barriers, {} depth passes, {} draws",
            self.frames, self.images, self.barriers, self.depth_passes, self.draws
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_records_two_barriers_per_frame() {
        let report = run_with_config(&AppConfig::default(), 4).expect("probe run");
        assert_eq!(report.images, 2);
        assert_eq!(report.barriers, 8);
        assert_eq!(report.depth_passes, 12);
        assert_eq!(report.draws, 24);
        assert_eq!(report.splits.len(), 2);
        assert_eq!(report.cascades.len(), 3);
    }

    #[test]
    fn report_lists_every_cascade() {
        let report = run_with_config(&AppConfig::default(), 1).expect("probe run");
        let text = report.to_string();
        assert!(text.contains("cascade 2:"));
        assert!(text.contains("1 frames"));
    }
}
