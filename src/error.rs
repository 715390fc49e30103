use thiserror::Error;

/// Failures surfaced by the shadow subsystem.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShadowError {
    #[error("degenerate camera frustum (near {near}, far {far})")]
    DegenerateFrustum { near: f32, far: f32 },

    #[error("light transform has no finite view matrix")]
    DegenerateLight,

    #[error("cascade {cascade} queried before the shadow pass was initialised")]
    UninitializedCascade { cascade: usize },

    #[error("failed to allocate {what}: {reason}")]
    ResourceAllocation { what: &'static str, reason: String },

    #[error("cascade splits require a perspective camera")]
    NotPerspective,
}

impl ShadowError {
    pub fn allocation<T: ToString>(what: &'static str, reason: T) -> Self {
        ShadowError::ResourceAllocation { what, reason: reason.to_string() }
    }

    /// Whether the caller may keep rendering with degraded shadows.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ShadowError::DegenerateFrustum { .. } | ShadowError::DegenerateLight)
    }
}

pub type ShadowResult<T> = Result<T, ShadowError>;
