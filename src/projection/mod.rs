//! This module defines the intrinsic projection models.
//!
//! A projection maps between image pixel coordinates and directions in the
//! camera frame. The camera looks along negative z: everything it sees has a
//! negative z coordinate. Positive camera x and y image left of and above the
//! image centre.
//!
//! Three models are provided, each in its own submodule:
//! - `rectilinear`: the pinhole model.
//! - `cylindrical`: angular horizontally, perspective vertically.
//! - `equirectangular`: angular on both axes.
//!
//! All models share the same five intrinsic parameters ([`Intrinsics`]) and
//! the same capability set ([`CameraProjection`]). [`Projection`] is the closed
//! enum a [`Camera`](crate::camera::Camera) owns.

use std::fmt;
use std::str::FromStr;

use log::info;
use nalgebra::{Matrix2xX, Matrix3xX, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::CameraError;
use crate::parameters::{Parameter, ParameterKind, ParameterSet, ParameterState, Parametrized};

pub mod cylindrical;
pub mod equirectangular;
pub mod rectilinear;

pub use cylindrical::CylindricalProjection;
pub use equirectangular::EquirectangularProjection;
pub use rectilinear::RectilinearProjection;

pub const FOCALLENGTH_MM: &str = "focallength_mm";
pub const IMAGE_HEIGHT_PX: &str = "image_height_px";
pub const IMAGE_WIDTH_PX: &str = "image_width_px";
pub const SENSOR_HEIGHT_MM: &str = "sensor_height_mm";
pub const SENSOR_WIDTH_MM: &str = "sensor_width_mm";

const DEFAULT_FOCALLENGTH_MM: f64 = 14.0;
const DEFAULT_IMAGE_HEIGHT_PX: f64 = 3456.0;
const DEFAULT_IMAGE_WIDTH_PX: f64 = 4608.0;
const DEFAULT_SENSOR_HEIGHT_MM: f64 = 13.0;
const DEFAULT_SENSOR_WIDTH_MM: f64 = 17.3;

/// Depths closer to zero than this are treated as exactly zero.
pub(crate) const DEPTH_EPSILON: f64 = 1e-10;

/// An angular field of view along one image axis, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FieldOfView {
    Horizontal(f64),
    Vertical(f64),
}

/// The raw intrinsic parameters and the quantities derived from them.
///
/// The derived values (`mm_per_px`, `focallength_px`, `offset_x`, `offset_y`)
/// are recomputed by every [`Parametrized::set_parameter`] call, which is the
/// only way to change a raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Intrinsics {
    parameters: ParameterSet,
    mm_per_px: f64,
    focallength_px: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self::from_values(None, None, None)
    }
}

impl Intrinsics {
    /// Creates intrinsics from a focal length and sensor size in mm and an
    /// image size in pixels.
    ///
    /// # Errors
    ///
    /// [`CameraError::InvalidParams`] if any value is not strictly positive.
    pub fn new(
        focallength_mm: f64,
        sensor_mm: (f64, f64),
        image_px: (u32, u32),
    ) -> Result<Self, CameraError> {
        let intrinsics = Self::from_values(Some(focallength_mm), Some(sensor_mm), Some(image_px));
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    fn from_values(
        focallength_mm: Option<f64>,
        sensor_mm: Option<(f64, f64)>,
        image_px: Option<(u32, u32)>,
    ) -> Self {
        let intrinsic = |value, default| Parameter::new(value, default, ParameterKind::Intrinsic);
        let parameters: ParameterSet = [
            (FOCALLENGTH_MM, intrinsic(focallength_mm, DEFAULT_FOCALLENGTH_MM)),
            (
                IMAGE_HEIGHT_PX,
                intrinsic(image_px.map(|(_, h)| h as f64), DEFAULT_IMAGE_HEIGHT_PX),
            ),
            (
                IMAGE_WIDTH_PX,
                intrinsic(image_px.map(|(w, _)| w as f64), DEFAULT_IMAGE_WIDTH_PX),
            ),
            (
                SENSOR_HEIGHT_MM,
                intrinsic(sensor_mm.map(|(_, h)| h), DEFAULT_SENSOR_HEIGHT_MM),
            ),
            (
                SENSOR_WIDTH_MM,
                intrinsic(sensor_mm.map(|(w, _)| w), DEFAULT_SENSOR_WIDTH_MM),
            ),
        ]
        .into_iter()
        .map(|(name, parameter)| (name.to_string(), parameter))
        .collect();

        let mut intrinsics = Intrinsics {
            parameters,
            mm_per_px: 0.0,
            focallength_px: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        };
        intrinsics.update_derived();
        intrinsics
    }

    /// Recomputes the pixel-unit quantities from the raw parameters.
    fn update_derived(&mut self) {
        self.mm_per_px = self.sensor_width_mm() / self.image_width_px();
        self.focallength_px = self.focallength_mm() / self.mm_per_px;
        self.offset_x = self.image_width_px() / 2.0;
        self.offset_y = self.image_height_px() / 2.0;
    }

    /// Checks that focal length, sensor and image sizes are positive and finite.
    pub fn validate(&self) -> Result<(), CameraError> {
        for name in [
            FOCALLENGTH_MM,
            IMAGE_HEIGHT_PX,
            IMAGE_WIDTH_PX,
            SENSOR_HEIGHT_MM,
            SENSOR_WIDTH_MM,
        ] {
            let value = self.raw(name);
            if !value.is_finite() || value <= 0.0 {
                return Err(CameraError::InvalidParams(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }

    fn raw(&self, name: &str) -> f64 {
        // every intrinsic name is inserted in `from_values`
        self.parameters.value(name).unwrap_or(f64::NAN)
    }

    pub fn focallength_mm(&self) -> f64 {
        self.raw(FOCALLENGTH_MM)
    }

    pub fn sensor_width_mm(&self) -> f64 {
        self.raw(SENSOR_WIDTH_MM)
    }

    pub fn sensor_height_mm(&self) -> f64 {
        self.raw(SENSOR_HEIGHT_MM)
    }

    pub fn image_width_px(&self) -> f64 {
        self.raw(IMAGE_WIDTH_PX)
    }

    pub fn image_height_px(&self) -> f64 {
        self.raw(IMAGE_HEIGHT_PX)
    }

    /// Sensor millimetres per image pixel.
    pub fn mm_per_px(&self) -> f64 {
        self.mm_per_px
    }

    /// Focal length in pixel units.
    pub fn focallength_px(&self) -> f64 {
        self.focallength_px
    }

    /// Principal point, the image centre.
    pub fn offset(&self) -> Vector2<f64> {
        Vector2::new(self.offset_x, self.offset_y)
    }
}

impl Parametrized for Intrinsics {
    fn parameter_set(&self) -> ParameterSet {
        self.parameters.clone()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), CameraError> {
        self.parameters.set_value(name, value)?;
        self.update_derived();
        Ok(())
    }

    fn set_parameter_state(&mut self, name: &str, state: ParameterState) -> Result<(), CameraError> {
        self.parameters.set_state(name, state)
    }
}

/// Snaps a near-zero depth to exactly zero.
pub(crate) fn snap_depth(z: f64) -> f64 {
    if z.abs() < DEPTH_EPSILON {
        0.0
    } else {
        z
    }
}

/// Applies the shared validity rule to a projected point.
///
/// A point with non-negative depth lies behind (or on) the lens plane and has
/// no image. Both image coordinates are invalid together.
pub(crate) fn finish_image_point(x_im: f64, y_im: f64, z: f64) -> Vector2<f64> {
    if z >= 0.0 || x_im.is_nan() || y_im.is_nan() {
        Vector2::new(f64::NAN, f64::NAN)
    } else {
        Vector2::new(x_im, y_im)
    }
}

/// Optionally normalizes the raw per-axis solve and turns it to face the scene.
pub(crate) fn finish_ray(ray: Vector3<f64>, normed: bool) -> Vector3<f64> {
    if normed {
        -ray / ray.norm()
    } else {
        -ray
    }
}

/// Capability set shared by every projection model.
///
/// The single-point methods carry the model; the batched methods apply them
/// column by column to 2×N and 3×N matrices.
pub trait CameraProjection {
    /// The intrinsic parameters of the model.
    fn intrinsics(&self) -> &Intrinsics;

    /// A short identifier such as `"rectilinear"`.
    fn model_name(&self) -> &'static str;

    /// Direction in the camera frame of the line of sight through `point`.
    ///
    /// The direction points into the scene (negative z for the central pixel).
    /// With `normed` the vector has unit length.
    fn get_ray(&self, point: &Vector2<f64>, normed: bool) -> Vector3<f64>;

    /// Image coordinates of a camera-frame point, NaN if it is not in front of the camera.
    fn image_from_camera(&self, point: &Vector3<f64>) -> Vector2<f64>;

    /// Horizontal and vertical field of view in degrees.
    fn field_of_view(&self) -> (f64, f64);

    /// Focal length in mm that produces the given field of view with the current sensor.
    fn field_of_view_to_focallength(&self, view: FieldOfView) -> f64;

    /// Rays for each column of `points`.
    fn get_rays(&self, points: &Matrix2xX<f64>, normed: bool) -> Matrix3xX<f64> {
        let mut rays = Matrix3xX::zeros(points.ncols());
        for (i, point) in points.column_iter().enumerate() {
            let ray = self.get_ray(&Vector2::new(point[0], point[1]), normed);
            rays.set_column(i, &ray);
        }
        rays
    }

    /// Image coordinates for each column of `points`.
    fn images_from_camera(&self, points: &Matrix3xX<f64>) -> Matrix2xX<f64> {
        let mut images = Matrix2xX::zeros(points.ncols());
        for (i, point) in points.column_iter().enumerate() {
            let image = self.image_from_camera(&Vector3::new(point[0], point[1], point[2]));
            images.set_column(i, &image);
        }
        images
    }
}

/// Selects one of the projection models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionKind {
    Rectilinear,
    Cylindrical,
    Equirectangular,
}

impl FromStr for ProjectionKind {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rectilinear" | "pinhole" => Ok(ProjectionKind::Rectilinear),
            "cylindrical" => Ok(ProjectionKind::Cylindrical),
            "equirectangular" => Ok(ProjectionKind::Equirectangular),
            _ => Err(CameraError::InvalidParams(format!(
                "unsupported projection '{s}', expected rectilinear, cylindrical or equirectangular"
            ))),
        }
    }
}

/// One of the three projection models.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Rectilinear(RectilinearProjection),
    Cylindrical(CylindricalProjection),
    Equirectangular(EquirectangularProjection),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Rectilinear(RectilinearProjection::default())
    }
}

impl Projection {
    /// Creates a projection of the given kind.
    pub fn new(kind: ProjectionKind, intrinsics: Intrinsics) -> Self {
        let projection = match kind {
            ProjectionKind::Rectilinear => Projection::Rectilinear(RectilinearProjection { intrinsics }),
            ProjectionKind::Cylindrical => Projection::Cylindrical(CylindricalProjection { intrinsics }),
            ProjectionKind::Equirectangular => {
                Projection::Equirectangular(EquirectangularProjection { intrinsics })
            }
        };
        info!("new projection is: {}", projection.summary());
        projection
    }

    /// Creates a projection whose focal length produces `view` on the given sensor.
    pub fn from_field_of_view(
        kind: ProjectionKind,
        view: FieldOfView,
        sensor_mm: (f64, f64),
        image_px: (u32, u32),
    ) -> Result<Self, CameraError> {
        let mut projection = Projection::new(
            kind,
            Intrinsics::new(DEFAULT_FOCALLENGTH_MM, sensor_mm, image_px)?,
        );
        let focallength_mm = projection.field_of_view_to_focallength(view);
        projection.set_parameter(FOCALLENGTH_MM, focallength_mm)?;
        projection.intrinsics().validate()?;
        Ok(projection)
    }

    pub fn kind(&self) -> ProjectionKind {
        match self {
            Projection::Rectilinear(_) => ProjectionKind::Rectilinear,
            Projection::Cylindrical(_) => ProjectionKind::Cylindrical,
            Projection::Equirectangular(_) => ProjectionKind::Equirectangular,
        }
    }

    fn model(&self) -> &dyn CameraProjection {
        match self {
            Projection::Rectilinear(p) => p,
            Projection::Cylindrical(p) => p,
            Projection::Equirectangular(p) => p,
        }
    }

    fn intrinsics_mut(&mut self) -> &mut Intrinsics {
        match self {
            Projection::Rectilinear(p) => &mut p.intrinsics,
            Projection::Cylindrical(p) => &mut p.intrinsics,
            Projection::Equirectangular(p) => &mut p.intrinsics,
        }
    }

    fn summary(&self) -> String {
        let i = self.intrinsics();
        format!(
            "{} [f: {} mm, sensor: {}x{} mm, image: {}x{} px]",
            self.model_name(),
            i.focallength_mm(),
            i.sensor_width_mm(),
            i.sensor_height_mm(),
            i.image_width_px(),
            i.image_height_px()
        )
    }
}

impl From<RectilinearProjection> for Projection {
    fn from(p: RectilinearProjection) -> Self {
        Projection::Rectilinear(p)
    }
}

impl From<CylindricalProjection> for Projection {
    fn from(p: CylindricalProjection) -> Self {
        Projection::Cylindrical(p)
    }
}

impl From<EquirectangularProjection> for Projection {
    fn from(p: EquirectangularProjection) -> Self {
        Projection::Equirectangular(p)
    }
}

impl CameraProjection for Projection {
    fn intrinsics(&self) -> &Intrinsics {
        self.model().intrinsics()
    }

    fn model_name(&self) -> &'static str {
        self.model().model_name()
    }

    fn get_ray(&self, point: &Vector2<f64>, normed: bool) -> Vector3<f64> {
        self.model().get_ray(point, normed)
    }

    fn image_from_camera(&self, point: &Vector3<f64>) -> Vector2<f64> {
        self.model().image_from_camera(point)
    }

    fn field_of_view(&self) -> (f64, f64) {
        self.model().field_of_view()
    }

    fn field_of_view_to_focallength(&self, view: FieldOfView) -> f64 {
        self.model().field_of_view_to_focallength(view)
    }
}

impl Parametrized for Projection {
    fn parameter_set(&self) -> ParameterSet {
        self.intrinsics().parameter_set()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), CameraError> {
        self.intrinsics_mut().set_parameter(name, value)
    }

    fn set_parameter_state(&mut self, name: &str, state: ParameterState) -> Result<(), CameraError> {
        self.intrinsics_mut().set_parameter_state(name, state)
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = self.intrinsics();
        writeln!(f, "  intrinsic ({}):", self.model_name())?;
        writeln!(f, "    f:\t\t{:.1} mm", i.focallength_mm())?;
        writeln!(
            f,
            "    sensor:\t{:.2}×{:.2} mm",
            i.sensor_width_mm(),
            i.sensor_height_mm()
        )?;
        writeln!(
            f,
            "    image:\t{}×{} px",
            i.image_width_px(),
            i.image_height_px()
        )
    }
}
