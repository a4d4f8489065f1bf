//! Extrinsic camera pose: position above the ground plane and viewing angles.
//!
//! World coordinates are x east, y north and z up, with the ground at z = 0.
//! The camera sits at `(pos_x_m, pos_y_m, elevation_m)`. With all angles at
//! zero it looks straight down with the image top towards north; `tilt_deg`
//! raises the view towards the horizon (90° is horizontal), `heading_deg`
//! turns it clockwise from north and `roll_deg` rotates it about the optical
//! axis.
//!
//! The world-to-camera map is `M · R_roll · R_tilt · R_heading` with
//! `M = diag(-1, 1, 1)`: world axes are right-handed while the projection
//! frame is not, and the reflection keeps images unmirrored. The translation
//! is the camera position. Both are refreshed on every parameter write.

use std::fmt;

use log::info;
use nalgebra::{Matrix3, Matrix3xX, Vector3};

use crate::error::CameraError;
use crate::parameters::{Parameter, ParameterKind, ParameterSet, ParameterState, Parametrized};

pub const ELEVATION_M: &str = "elevation_m";
pub const TILT_DEG: &str = "tilt_deg";
pub const HEADING_DEG: &str = "heading_deg";
pub const ROLL_DEG: &str = "roll_deg";
pub const POS_X_M: &str = "pos_x_m";
pub const POS_Y_M: &str = "pos_y_m";

/// Camera pose in world coordinates.
///
/// # Examples
///
/// ```rust
/// use camera_transform::orientation::SpatialOrientation;
/// use nalgebra::Vector3;
///
/// // 10 m above ground, looking at the horizon towards north
/// let orientation = SpatialOrientation::new(10.0, 90.0, 0.0, 0.0, 0.0, 0.0);
/// let forward = orientation.space_from_camera_direction(&Vector3::new(0.0, 0.0, -1.0));
/// assert!((forward - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialOrientation {
    parameters: ParameterSet,
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl Default for SpatialOrientation {
    fn default() -> Self {
        Self::from_values([None; 6])
    }
}

impl SpatialOrientation {
    /// Creates a pose from explicit values; lengths in metres, angles in degrees.
    pub fn new(
        elevation_m: f64,
        tilt_deg: f64,
        roll_deg: f64,
        heading_deg: f64,
        pos_x_m: f64,
        pos_y_m: f64,
    ) -> Self {
        let orientation = Self::from_values([
            Some(elevation_m),
            Some(tilt_deg),
            Some(heading_deg),
            Some(roll_deg),
            Some(pos_x_m),
            Some(pos_y_m),
        ]);
        info!("new orientation is: {orientation}");
        orientation
    }

    fn from_values(values: [Option<f64>; 6]) -> Self {
        let [elevation, tilt, heading, roll, pos_x, pos_y] = values;
        let extrinsic = |value, default| Parameter::new(value, default, ParameterKind::Extrinsic);
        let parameters: ParameterSet = [
            (ELEVATION_M, extrinsic(elevation, 30.0).with_range(Some(0.0), None)),
            (TILT_DEG, extrinsic(tilt, 85.0).with_range(Some(0.0), Some(180.0))),
            (
                HEADING_DEG,
                extrinsic(heading.map(wrap_heading), 0.0).with_range(Some(-360.0), Some(360.0)),
            ),
            (ROLL_DEG, extrinsic(roll, 0.0).with_range(Some(-180.0), Some(180.0))),
            (POS_X_M, extrinsic(pos_x, 0.0)),
            (POS_Y_M, extrinsic(pos_y, 0.0)),
        ]
        .into_iter()
        .map(|(name, parameter)| (name.to_string(), parameter))
        .collect();

        let mut orientation = SpatialOrientation {
            parameters,
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        };
        orientation.update_derived();
        orientation
    }

    fn raw(&self, name: &str) -> f64 {
        // every extrinsic name is inserted in `from_values`
        self.parameters.value(name).unwrap_or(f64::NAN)
    }

    fn update_derived(&mut self) {
        let tilt = self.raw(TILT_DEG).to_radians();
        let roll = self.raw(ROLL_DEG).to_radians();
        let heading = self.raw(HEADING_DEG).to_radians();

        #[rustfmt::skip]
        let r_tilt = Matrix3::new(
            1.0, 0.0, 0.0,
            0.0, tilt.cos(), tilt.sin(),
            0.0, -tilt.sin(), tilt.cos(),
        );
        #[rustfmt::skip]
        let r_roll = Matrix3::new(
            roll.cos(), roll.sin(), 0.0,
            -roll.sin(), roll.cos(), 0.0,
            0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let r_heading = Matrix3::new(
            heading.cos(), -heading.sin(), 0.0,
            heading.sin(), heading.cos(), 0.0,
            0.0, 0.0, 1.0,
        );

        let mirror = Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, 1.0));
        self.rotation = mirror * r_roll * r_tilt * r_heading;
        self.translation = Vector3::new(
            self.raw(POS_X_M),
            self.raw(POS_Y_M),
            self.raw(ELEVATION_M),
        );
    }

    pub fn elevation_m(&self) -> f64 {
        self.raw(ELEVATION_M)
    }

    pub fn tilt_deg(&self) -> f64 {
        self.raw(TILT_DEG)
    }

    pub fn heading_deg(&self) -> f64 {
        self.raw(HEADING_DEG)
    }

    pub fn roll_deg(&self) -> f64 {
        self.raw(ROLL_DEG)
    }

    /// World-to-camera linear map, a rotation followed by the x reflection.
    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    /// Camera position in world coordinates.
    pub fn position(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Camera-frame coordinates of a world point.
    pub fn camera_from_space(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * (point - self.translation)
    }

    /// World coordinates of a camera-frame point.
    pub fn space_from_camera(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.transpose() * point + self.translation
    }

    /// World direction of a camera-frame direction; translation is not applied.
    pub fn space_from_camera_direction(&self, direction: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.transpose() * direction
    }

    pub fn cameras_from_space(&self, points: &Matrix3xX<f64>) -> Matrix3xX<f64> {
        let shift = self.rotation * self.translation;
        let mut result = self.rotation * points;
        for mut column in result.column_iter_mut() {
            column -= shift;
        }
        result
    }

    pub fn spaces_from_camera_direction(&self, directions: &Matrix3xX<f64>) -> Matrix3xX<f64> {
        self.rotation.transpose() * directions
    }
}

/// Headings beyond a full turn are folded back into [0, 360).
fn wrap_heading(heading_deg: f64) -> f64 {
    if (-360.0..=360.0).contains(&heading_deg) {
        heading_deg
    } else {
        heading_deg.rem_euclid(360.0)
    }
}

impl Parametrized for SpatialOrientation {
    fn parameter_set(&self) -> ParameterSet {
        self.parameters.clone()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), CameraError> {
        let value = if name == HEADING_DEG {
            wrap_heading(value)
        } else {
            value
        };
        self.parameters.set_value(name, value)?;
        self.update_derived();
        Ok(())
    }

    fn set_parameter_state(&mut self, name: &str, state: ParameterState) -> Result<(), CameraError> {
        self.parameters.set_state(name, state)
    }
}

impl fmt::Display for SpatialOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  extrinsic (spatial):")?;
        writeln!(
            f,
            "    position:\t{:.2} {:.2} {:.2} m",
            self.translation.x, self.translation.y, self.translation.z
        )?;
        writeln!(
            f,
            "    orientation:\ttilt {:.2}° roll {:.2}° heading {:.2}°",
            self.tilt_deg(),
            self.roll_deg(),
            self.heading_deg()
        )
    }
}
