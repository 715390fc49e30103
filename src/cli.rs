use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.json";
const DEFAULT_FRAMES: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct CliOverrides {
    config_path: PathBuf,
    cascade_count: Option<u32>,
    resolution: Option<u32>,
    near: Option<f32>,
    far: Option<f32>,
    frames: u32,
}

impl Default for CliOverrides {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            cascade_count: None,
            resolution: None,
            near: None,
            far: None,
            frames: DEFAULT_FRAMES,
        }
    }
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name <value>.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config_path = PathBuf::from(value),
                "cascades" => {
                    overrides.cascade_count =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid cascade count '{value}'"))?);
                }
                "resolution" => {
                    overrides.resolution =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid resolution '{value}'"))?);
                }
                "near" => overrides.near = Some(parse_plane("near", &value)?),
                "far" => overrides.far = Some(parse_plane("far", &value)?),
                "frames" => {
                    overrides.frames = value.parse::<u32>().with_context(|| format!("Invalid frame count '{value}'"))?;
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --cascades, --resolution, --near, --far, --frames."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn config_overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides {
            cascade_count: self.cascade_count,
            resolution: self.resolution,
            near: self.near,
            far: self.far,
        }
    }
}

fn parse_plane(flag: &str, value: &str) -> Result<f32> {
    let plane = value.parse::<f32>().with_context(|| format!("Invalid {flag} plane '{value}'"))?;
    if !plane.is_finite() {
        bail!("Invalid {flag} plane '{value}'. Use a finite distance.");
    }
    Ok(plane)
}
