//! Equirectangular projection.
//!
//! Both image axes are proportional to angles: azimuth horizontally and
//! elevation above the horizontal plane vertically.
//!
//! ```text
//! x_im =  f · atan2(-x, -z)                 + cx
//! y_im = -f · atan(y / sqrt(x² + z²))       + cy
//!
//! α    = (x_im - cx) / f
//! ray  = -(sin α, tan((y_im - cy) / f), cos α)
//! ```

use nalgebra::{Vector2, Vector3};

use super::{finish_image_point, finish_ray, snap_depth, CameraProjection, FieldOfView, Intrinsics};

/// Equirectangular (latitude/longitude) projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquirectangularProjection {
    pub intrinsics: Intrinsics,
}

impl EquirectangularProjection {
    pub fn new(intrinsics: Intrinsics) -> Self {
        EquirectangularProjection { intrinsics }
    }
}

impl CameraProjection for EquirectangularProjection {
    fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    fn model_name(&self) -> &'static str {
        "equirectangular"
    }

    fn get_ray(&self, point: &Vector2<f64>, normed: bool) -> Vector3<f64> {
        let f = self.intrinsics.focallength_px();
        let offset = self.intrinsics.offset();
        let alpha = (point.x - offset.x) / f;
        let ray = Vector3::new(
            alpha.sin(),
            ((point.y - offset.y) / f).tan(),
            alpha.cos(),
        );
        finish_ray(ray, normed)
    }

    fn image_from_camera(&self, point: &Vector3<f64>) -> Vector2<f64> {
        let f = self.intrinsics.focallength_px();
        let offset = self.intrinsics.offset();
        let z = snap_depth(point.z);

        let x_im = f * (-point.x).atan2(-z) + offset.x;
        let y_im = -f * (point.y / point.x.hypot(z)).atan() + offset.y;
        finish_image_point(x_im, y_im, z)
    }

    /// `sensor / focal` (radians) on both axes.
    fn field_of_view(&self) -> (f64, f64) {
        let f = self.intrinsics.focallength_mm();
        (
            (self.intrinsics.sensor_width_mm() / f).to_degrees(),
            (self.intrinsics.sensor_height_mm() / f).to_degrees(),
        )
    }

    fn field_of_view_to_focallength(&self, view: FieldOfView) -> f64 {
        match view {
            FieldOfView::Horizontal(deg) => self.intrinsics.sensor_width_mm() / deg.to_radians(),
            FieldOfView::Vertical(deg) => self.intrinsics.sensor_height_mm() / deg.to_radians(),
        }
    }
}
