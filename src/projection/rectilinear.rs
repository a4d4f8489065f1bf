//! Rectilinear (pinhole) projection.
//!
//! # Mathematical Model
//!
//! ## Projection (camera frame → image)
//!
//! ```text
//! x_im = f · x / z + cx
//! y_im = f · y / z + cy
//! ```
//!
//! ## Ray (image → camera frame)
//!
//! ```text
//! ray = -(x_im - cx, y_im - cy, f)
//! ```
//!
//! where `f` is the focal length in pixels and `(cx, cy)` the image centre.
//! Straight lines in the scene stay straight in the image.

use nalgebra::{Vector2, Vector3};

use super::{finish_image_point, finish_ray, snap_depth, CameraProjection, FieldOfView, Intrinsics};

/// Pinhole projection without lens distortion.
///
/// # Examples
///
/// ```rust
/// use camera_transform::projection::{CameraProjection, Intrinsics, RectilinearProjection};
/// use nalgebra::Vector3;
///
/// let projection = RectilinearProjection::new(Intrinsics::default());
/// let center = projection.image_from_camera(&Vector3::new(0.0, 0.0, -1000.0));
/// assert_eq!(center.x, 2304.0);
/// assert_eq!(center.y, 1728.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectilinearProjection {
    pub intrinsics: Intrinsics,
}

impl RectilinearProjection {
    pub fn new(intrinsics: Intrinsics) -> Self {
        RectilinearProjection { intrinsics }
    }
}

impl CameraProjection for RectilinearProjection {
    fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    fn model_name(&self) -> &'static str {
        "rectilinear"
    }

    fn get_ray(&self, point: &Vector2<f64>, normed: bool) -> Vector3<f64> {
        let offset = self.intrinsics.offset();
        let ray = Vector3::new(
            point.x - offset.x,
            point.y - offset.y,
            self.intrinsics.focallength_px(),
        );
        finish_ray(ray, normed)
    }

    fn image_from_camera(&self, point: &Vector3<f64>) -> Vector2<f64> {
        let f = self.intrinsics.focallength_px();
        let offset = self.intrinsics.offset();
        let z = snap_depth(point.z);

        let x_im = point.x * f / z + offset.x;
        let y_im = point.y * f / z + offset.y;
        finish_image_point(x_im, y_im, z)
    }

    /// `2·atan(sensor / 2f)` on both axes.
    fn field_of_view(&self) -> (f64, f64) {
        let f = self.intrinsics.focallength_mm();
        (
            (2.0 * (self.intrinsics.sensor_width_mm() / (2.0 * f)).atan()).to_degrees(),
            (2.0 * (self.intrinsics.sensor_height_mm() / (2.0 * f)).atan()).to_degrees(),
        )
    }

    fn field_of_view_to_focallength(&self, view: FieldOfView) -> f64 {
        match view {
            FieldOfView::Horizontal(deg) => {
                self.intrinsics.sensor_width_mm() / (2.0 * (deg.to_radians() / 2.0).tan())
            }
            FieldOfView::Vertical(deg) => {
                self.intrinsics.sensor_height_mm() / (2.0 * (deg.to_radians() / 2.0).tan())
            }
        }
    }
}
