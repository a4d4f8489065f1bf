//! Cylindrical projection.
//!
//! The image is the unrolled surface of a cylinder around the vertical axis:
//! the horizontal pixel coordinate is proportional to the azimuth angle, the
//! vertical one is a perspective projection onto the cylinder wall.
//!
//! ```text
//! x_im =  f · atan2(-x, -z)        + cx
//! y_im = -f · y / sqrt(x² + z²)    + cy
//!
//! α    = (x_im - cx) / f
//! ray  = -(sin α, (y_im - cy) / f, cos α)
//! ```

use nalgebra::{Vector2, Vector3};

use super::{finish_image_point, finish_ray, snap_depth, CameraProjection, FieldOfView, Intrinsics};

/// Cylindrical projection, used for panoramas that wrap horizontally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CylindricalProjection {
    pub intrinsics: Intrinsics,
}

impl CylindricalProjection {
    pub fn new(intrinsics: Intrinsics) -> Self {
        CylindricalProjection { intrinsics }
    }
}

impl CameraProjection for CylindricalProjection {
    fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    fn model_name(&self) -> &'static str {
        "cylindrical"
    }

    fn get_ray(&self, point: &Vector2<f64>, normed: bool) -> Vector3<f64> {
        let f = self.intrinsics.focallength_px();
        let offset = self.intrinsics.offset();
        let alpha = (point.x - offset.x) / f;
        let ray = Vector3::new(alpha.sin(), (point.y - offset.y) / f, alpha.cos());
        finish_ray(ray, normed)
    }

    fn image_from_camera(&self, point: &Vector3<f64>) -> Vector2<f64> {
        let f = self.intrinsics.focallength_px();
        let offset = self.intrinsics.offset();
        let z = snap_depth(point.z);

        let x_im = f * (-point.x).atan2(-z) + offset.x;
        let y_im = -f * point.y / point.x.hypot(z) + offset.y;
        finish_image_point(x_im, y_im, z)
    }

    /// Horizontal: `sensor_width / focal` (radians). Vertical: `2·atan(sensor_height / 2f)`.
    fn field_of_view(&self) -> (f64, f64) {
        let f = self.intrinsics.focallength_mm();
        (
            (self.intrinsics.sensor_width_mm() / f).to_degrees(),
            (2.0 * (self.intrinsics.sensor_height_mm() / (2.0 * f)).atan()).to_degrees(),
        )
    }

    fn field_of_view_to_focallength(&self, view: FieldOfView) -> f64 {
        match view {
            FieldOfView::Horizontal(deg) => self.intrinsics.sensor_width_mm() / deg.to_radians(),
            FieldOfView::Vertical(deg) => {
                self.intrinsics.sensor_height_mm() / (2.0 * (deg.to_radians() / 2.0).tan())
            }
        }
    }
}
