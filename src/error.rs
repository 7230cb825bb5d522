//! Error taxonomy shared by the whole crate.
//!
//! Only [`CorridorError::SurfaceUnavailable`] is fatal once the frame loop is
//! running. Asset failures degrade the scene and configuration errors are
//! reported before the first frame.

/// Everything that can go wrong while building or driving the corridor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorridorError {
    /// A texture could not be fetched or decoded. The material keeps its
    /// fallback appearance.
    #[error("failed to load asset `{path}`: {reason}")]
    AssetLoad { path: String, reason: String },

    /// The drawing surface or GPU context is gone. Drawing again is undefined.
    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// A configuration value would break an invariant (e.g. a zero tile length).
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl CorridorError {
    pub fn asset(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::AssetLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Whether the frame loop has to stop because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SurfaceUnavailable(_))
    }
}
