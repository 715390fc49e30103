pub mod camera3d;
pub mod cli;
pub mod config;
pub mod error;
pub mod probe;
pub mod renderer;

pub use camera3d::{Camera, LightFrame, OrthographicCamera, PerspectiveCamera};
pub use error::{ShadowError, ShadowResult};
pub use renderer::{ShadowCaster, ShadowRenderPass, ShadowUniform};
