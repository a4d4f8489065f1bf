//! Error type shared by the parameter registry, cameras and camera rigs.
//!
//! Geometric failures (points behind the camera, rays that never reach the
//! requested plane) are not errors: they are reported as NaN coordinates.
//! [`CameraError`] covers the remaining cases: unknown parameter names,
//! inconsistent rig layouts, degenerate rectification extents, optimizer
//! failures and persistence I/O.

/// Defines the possible errors that can occur while configuring, fitting or
/// persisting cameras.
#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    /// A parameter name that is not part of the parameter set was used.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    /// Construction or update arguments are inconsistent.
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    /// The extent or scaling of a rectification map cannot produce a grid.
    #[error("Invalid map extent: {0}")]
    InvalidExtent(String),
    /// The projection and orientation axes of a camera rig do not line up.
    #[error("Rig layout mismatch: {0}")]
    RigMismatch(String),
    /// The minimizer failed before producing a result.
    #[error("Optimizer error: {0}")]
    Optimizer(String),
    /// Reading or writing a parameter file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A JSON parameter file could not be parsed or written.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A YAML parameter file could not be parsed or written.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
