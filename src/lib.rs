//! Camera Transform Library
//!
//! Maps between image pixels and world coordinates for single cameras and
//! multi-camera rigs. The library provides:
//! - Rectilinear, cylindrical and equirectangular projection models
//! - A spatial orientation (elevation, tilt, heading, roll, position)
//! - Cameras with ray casting, plane intersection and ground-plane rectification
//! - Camera groups with namespaced parameters and two-view triangulation
//! - Bounded Nelder–Mead fitting of any selected parameters
//! - Flat JSON/YAML parameter persistence
//!
//! World coordinates are metres with x east, y north and z up; the ground is
//! the plane z = 0.

pub mod camera;
pub mod error;
pub mod fit;
pub mod orientation;
pub mod parameters;
pub mod projection;
pub mod util;

// Re-export commonly used types
pub use camera::{
    intersection_of_two_lines, intersection_of_two_lines_batch, load_camera, Camera, CameraGroup,
    Extent, RectificationMap, RigAxis, SpaceConstraint,
};
pub use error::CameraError;
pub use fit::{FitOptions, FitResult};
pub use orientation::SpatialOrientation;
pub use parameters::{Parameter, ParameterKind, ParameterSet, ParameterState, Parametrized};
pub use projection::{
    CameraProjection, CylindricalProjection, EquirectangularProjection, FieldOfView, Intrinsics,
    Projection, ProjectionKind, RectilinearProjection,
};
