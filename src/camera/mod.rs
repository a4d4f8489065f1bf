//! This module composes a projection and a spatial orientation into a camera.
//!
//! A [`Camera`] maps world points to image pixels and casts pixel rays back
//! into the world, where they can be intersected with an axis-aligned plane or
//! walked out to a fixed distance ([`SpaceConstraint`]). On top of these
//! transforms it samples the visible ground area ([`Camera::get_image_border`],
//! [`Camera::get_camera_cone`]), builds a cached ground-plane rectification
//! grid ([`Camera::get_map`]) and fits its own parameters to observations.
//!
//! Submodules:
//! - `group`: rigs of several cameras with namespaced parameters and
//!   two-view triangulation.
//! - `map`: the rectification grid types.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use log::{debug, info};
use nalgebra::{DMatrix, Matrix2xX, Matrix3xX, Vector2, Vector3};

use crate::error::CameraError;
use crate::fit::{self, FitOptions, FitResult};
use crate::orientation::SpatialOrientation;
use crate::parameters::{ParameterSet, ParameterState, Parametrized};
use crate::projection::{CameraProjection, Projection};
use crate::util;

pub mod group;
pub mod map;

pub use group::{intersection_of_two_lines, intersection_of_two_lines_batch, CameraGroup, RigAxis};
pub use map::{Extent, RectificationMap};

/// Where along a pixel ray the world point is taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpaceConstraint {
    /// Intersection with the plane `x = value`.
    X(f64),
    /// Intersection with the plane `y = value`.
    Y(f64),
    /// Intersection with the plane `z = value`.
    Z(f64),
    /// The point at this distance from the camera along the ray.
    Distance(f64),
}

impl Default for SpaceConstraint {
    fn default() -> Self {
        SpaceConstraint::Z(0.0)
    }
}

/// A projection placed in the world by a spatial orientation.
///
/// # Examples
///
/// ```rust
/// use camera_transform::{Camera, Intrinsics, Projection, ProjectionKind, SpaceConstraint, SpatialOrientation};
/// use nalgebra::Vector2;
///
/// let projection = Projection::new(
///     ProjectionKind::Rectilinear,
///     Intrinsics::new(6.0, (6.4, 4.8), (160, 120)).unwrap(),
/// );
/// // 10 m high, looking straight down
/// let camera = Camera::new(projection, SpatialOrientation::new(10.0, 0.0, 0.0, 0.0, 0.0, 0.0));
/// let ground = camera.space_from_image(&Vector2::new(80.0, 60.0), SpaceConstraint::Z(0.0));
/// assert!(ground.norm() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Projection,
    orientation: SpatialOrientation,
    map_cache: Option<Arc<RectificationMap>>,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            projection: Projection::default(),
            orientation: SpatialOrientation::default(),
            map_cache: None,
        }
    }
}

impl Camera {
    pub fn new(projection: Projection, orientation: SpatialOrientation) -> Self {
        info!(
            "new camera: {} projection at elevation {} m, tilt {}°",
            projection.model_name(),
            orientation.elevation_m(),
            orientation.tilt_deg()
        );
        Camera {
            projection,
            orientation,
            map_cache: None,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn orientation(&self) -> &SpatialOrientation {
        &self.orientation
    }

    /// Image coordinates of a world point, NaN if the camera cannot see it.
    pub fn image_from_space(&self, point: &Vector3<f64>) -> Vector2<f64> {
        self.projection
            .image_from_camera(&self.orientation.camera_from_space(point))
    }

    pub fn images_from_space(&self, points: &Matrix3xX<f64>) -> Matrix2xX<f64> {
        self.projection
            .images_from_camera(&self.orientation.cameras_from_space(points))
    }

    /// World-space origin and direction of the line of sight through `point`.
    pub fn get_ray(&self, point: &Vector2<f64>, normed: bool) -> (Vector3<f64>, Vector3<f64>) {
        let origin = self.orientation.space_from_camera(&Vector3::zeros());
        let direction = self
            .orientation
            .space_from_camera_direction(&self.projection.get_ray(point, normed));
        (origin, direction)
    }

    /// Shared origin and one direction per column of `points`.
    pub fn get_rays(&self, points: &Matrix2xX<f64>, normed: bool) -> (Vector3<f64>, Matrix3xX<f64>) {
        let origin = self.orientation.space_from_camera(&Vector3::zeros());
        let directions = self
            .orientation
            .spaces_from_camera_direction(&self.projection.get_rays(points, normed));
        (origin, directions)
    }

    /// World point seen at `point` that satisfies `constraint`.
    ///
    /// Returns NaN on every axis when the constraint lies behind the camera.
    pub fn space_from_image(&self, point: &Vector2<f64>, constraint: SpaceConstraint) -> Vector3<f64> {
        let normed = matches!(constraint, SpaceConstraint::Distance(_));
        let (origin, direction) = self.get_ray(point, normed);
        point_on_ray(&origin, &direction, constraint)
    }

    pub fn spaces_from_image(&self, points: &Matrix2xX<f64>, constraint: SpaceConstraint) -> Matrix3xX<f64> {
        let normed = matches!(constraint, SpaceConstraint::Distance(_));
        let (origin, directions) = self.get_rays(points, normed);
        let mut result = Matrix3xX::zeros(directions.ncols());
        for (i, direction) in directions.column_iter().enumerate() {
            let direction = Vector3::new(direction[0], direction[1], direction[2]);
            result.set_column(i, &point_on_ray(&origin, &direction, constraint));
        }
        result
    }

    /// Ground points (z = 0) seen along the image border.
    ///
    /// The border is walked down the left edge, right along the bottom edge, up
    /// the right edge and back left along the top edge, one sample every
    /// `resolution` pixels. Border pixels above the horizon are NaN.
    pub fn get_image_border(&self, resolution: u32) -> Matrix3xX<f64> {
        let (border, _) = self.border_pixels(resolution);
        self.spaces_from_image(&border, SpaceConstraint::Z(0.0))
    }

    /// The one-pixel image border on the ground, followed by one line from the
    /// camera to each image corner.
    ///
    /// Each corner line is three columns: a NaN separator, the camera
    /// position and the corner's ground point.
    pub fn get_camera_cone(&self) -> Matrix3xX<f64> {
        let (border, corners) = self.border_pixels(1);
        let ground = self.spaces_from_image(&border, SpaceConstraint::Z(0.0));
        let origin = self.orientation.space_from_camera(&Vector3::zeros());
        let separator = Vector3::repeat(f64::NAN);

        let mut columns: Vec<Vector3<f64>> = ground.column_iter().map(|c| c.into_owned()).collect();
        for corner in corners.into_iter().filter(|&c| c < ground.ncols()) {
            columns.extend([separator, origin, ground.column(corner).into_owned()]);
        }
        Matrix3xX::from_iterator(columns.len(), columns.iter().flat_map(|c| c.iter().copied()))
    }

    /// Border pixel coordinates and the index where each of the four edges starts.
    fn border_pixels(&self, resolution: u32) -> (Matrix2xX<f64>, [usize; 4]) {
        let step = f64::from(resolution.max(1));
        let intrinsics = self.projection.intrinsics();
        let (w, h) = (intrinsics.image_width_px(), intrinsics.image_height_px());

        let mut pixels = Vec::new();
        let mut corners = [0; 4];
        pixels.extend(map::arange(0.0, h, step).map(|y| Vector2::new(0.0, y)));
        corners[1] = pixels.len();
        pixels.extend(map::arange(0.0, w, step).map(|x| Vector2::new(x, h)));
        corners[2] = pixels.len();
        pixels.extend(map::arange(h, 0.0, -step).map(|y| Vector2::new(w, y)));
        corners[3] = pixels.len();
        pixels.extend(map::arange(w, 0.0, -step).map(|x| Vector2::new(x, 0.0)));
        let pixels = Matrix2xX::from_iterator(pixels.len(), pixels.iter().flat_map(|p| [p.x, p.y]));
        (pixels, corners)
    }

    /// Ground-plane rectification grid, rebuilt only when its inputs change.
    ///
    /// # Arguments
    ///
    /// * `extent` - Ground area to cover. Defaults to the bounding box of the
    ///   visible image border.
    /// * `scaling` - Grid spacing in metres. Defaults to the spacing that gives
    ///   the grid as many cells as the image has pixels.
    ///
    /// # Errors
    ///
    /// [`CameraError::InvalidExtent`] if the extent is empty or not finite, no
    /// border point reaches the ground, or the scaling is not positive.
    pub fn get_map(
        &mut self,
        extent: Option<Extent>,
        scaling: Option<f64>,
    ) -> Result<Arc<RectificationMap>, CameraError> {
        let extent = match extent {
            Some(extent) => extent,
            None => Extent::bounding_box(&self.get_image_border(1)).ok_or_else(|| {
                CameraError::InvalidExtent("no part of the image border reaches the ground".to_string())
            })?,
        };
        extent.validate()?;

        let intrinsics = self.projection.intrinsics();
        let scaling = scaling.unwrap_or_else(|| {
            (extent.area() / (intrinsics.image_width_px() * intrinsics.image_height_px())).sqrt()
        });
        if !scaling.is_finite() || scaling <= 0.0 {
            return Err(CameraError::InvalidExtent(format!(
                "scaling must be positive, got {scaling}"
            )));
        }

        if let Some(cached) = &self.map_cache {
            if cached.extent == extent && cached.scaling == scaling {
                debug!("reusing cached rectification map");
                return Ok(Arc::clone(cached));
            }
        }

        let xs: Vec<f64> = map::arange(extent.x_min, extent.x_max, scaling).collect();
        let ys: Vec<f64> = map::arange(extent.y_min, extent.y_max, scaling).collect();
        let (cols, rows) = (xs.len(), ys.len());

        let mut ground = Matrix3xX::zeros(rows * cols);
        for row in 0..rows {
            // row 0 is the largest y
            let y = ys[rows - 1 - row];
            for (col, &x) in xs.iter().enumerate() {
                ground.set_column(row * cols + col, &Vector3::new(x, y, 0.0));
            }
        }
        let image = self.images_from_space(&ground);
        let map_x = DMatrix::from_fn(rows, cols, |r, c| image[(0, r * cols + c)] as f32);
        let map_y = DMatrix::from_fn(rows, cols, |r, c| image[(1, r * cols + c)] as f32);

        info!("built {cols}x{rows} rectification map at {scaling:.4} m per cell");
        let map = Arc::new(RectificationMap {
            map_x,
            map_y,
            extent,
            scaling,
        });
        self.map_cache = Some(Arc::clone(&map));
        Ok(map)
    }

    /// Resamples `image` onto the ground grid of [`Camera::get_map`].
    ///
    /// Cells that the camera cannot see are transparent.
    pub fn get_top_view_of_image(
        &mut self,
        image: &DynamicImage,
        extent: Option<Extent>,
        scaling: Option<f64>,
    ) -> Result<RgbaImage, CameraError> {
        let map = self.get_map(extent, scaling)?;
        Ok(util::remap_image(&image.to_rgba8(), &map))
    }

    /// Fits the parameters in state `Fit` by minimizing `cost`.
    ///
    /// `cost` is evaluated on candidate copies of the camera; this camera is
    /// only written with the final result.
    pub fn fit<F>(&mut self, cost: F, options: &FitOptions) -> Result<FitResult, CameraError>
    where
        F: Fn(&Camera) -> f64,
    {
        fit::fit(self, cost, options)
    }
}

fn point_on_ray(origin: &Vector3<f64>, direction: &Vector3<f64>, constraint: SpaceConstraint) -> Vector3<f64> {
    let factor = match constraint {
        SpaceConstraint::X(value) => (value - origin.x) / direction.x,
        SpaceConstraint::Y(value) => (value - origin.y) / direction.y,
        SpaceConstraint::Z(value) => (value - origin.z) / direction.z,
        SpaceConstraint::Distance(distance) => distance,
    };
    if factor < 0.0 {
        Vector3::repeat(f64::NAN)
    } else {
        origin + direction * factor
    }
}

/// Creates a default rectilinear camera and loads a parameter file into it.
pub fn load_camera<P: AsRef<Path>>(path: P) -> Result<Camera, CameraError> {
    let mut camera = Camera::default();
    camera.load(path.as_ref())?;
    info!("loaded camera from {}", path.as_ref().display());
    Ok(camera)
}

impl Parametrized for Camera {
    /// Intrinsic parameters first, then extrinsic ones.
    fn parameter_set(&self) -> ParameterSet {
        let intrinsic = self.projection.parameter_set();
        let extrinsic = self.orientation.parameter_set();
        intrinsic
            .iter()
            .chain(extrinsic.iter())
            .map(|(name, parameter)| (name.to_string(), parameter.clone()))
            .collect()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), CameraError> {
        self.map_cache = None;
        if self.projection.parameter_set().contains(name) {
            self.projection.set_parameter(name, value)
        } else {
            self.orientation.set_parameter(name, value)
        }
    }

    fn set_parameter_state(&mut self, name: &str, state: ParameterState) -> Result<(), CameraError> {
        if self.projection.parameter_set().contains(name) {
            self.projection.set_parameter_state(name, state)
        } else {
            self.orientation.set_parameter_state(name, state)
        }
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "camera:")?;
        write!(f, "{}", self.projection)?;
        write!(f, "{}", self.orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::{ELEVATION_M, TILT_DEG};
    use crate::projection::{Intrinsics, ProjectionKind, FOCALLENGTH_MM};
    use approx::assert_relative_eq;
    use image::{Rgb, RgbImage};

    fn get_sample_camera() -> Camera {
        let projection = Projection::new(
            ProjectionKind::Rectilinear,
            Intrinsics::new(6.0, (6.4, 4.8), (160, 120)).unwrap(),
        );
        Camera::new(projection, SpatialOrientation::new(10.0, 60.0, 0.0, 0.0, 0.0, 0.0))
    }

    #[test]
    fn test_center_pixel_looks_forward() {
        let camera = get_sample_camera();
        let (origin, direction) = camera.get_ray(&Vector2::new(80.0, 60.0), true);
        assert_relative_eq!(origin, Vector3::new(0.0, 0.0, 10.0), epsilon = 1e-12);
        let tilt = 60f64.to_radians();
        assert_relative_eq!(direction, Vector3::new(0.0, tilt.sin(), -tilt.cos()), epsilon = 1e-12);

        let ground = camera.space_from_image(&Vector2::new(80.0, 60.0), SpaceConstraint::default());
        assert_relative_eq!(ground, Vector3::new(0.0, 10.0 * tilt.tan(), 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_ground_point_round_trip() {
        let camera = get_sample_camera();
        for point in [
            Vector3::new(1.0, 15.0, 0.0),
            Vector3::new(-2.0, 20.0, 0.0),
            Vector3::new(0.5, 12.0, 0.0),
        ] {
            let image = camera.image_from_space(&point);
            assert!(image.x > 0.0 && image.x < 160.0, "{image:?}");
            assert!(image.y > 0.0 && image.y < 120.0, "{image:?}");
            let recovered = camera.space_from_image(&image, SpaceConstraint::Z(0.0));
            assert_relative_eq!(recovered, point, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_image_is_not_mirrored() {
        let camera = get_sample_camera();
        // looking north, east is on the right and the far field at the top
        let east = camera.image_from_space(&Vector3::new(2.0, 17.0, 0.0));
        assert!(east.x > 80.0);
        let far = camera.image_from_space(&Vector3::new(0.0, 25.0, 0.0));
        assert!(far.y < 60.0);
    }

    #[test]
    fn test_plane_constraints() {
        let camera = get_sample_camera();
        let pixel = Vector2::new(30.0, 40.0);
        let on_x = camera.space_from_image(&pixel, SpaceConstraint::X(-1.0));
        assert_relative_eq!(on_x.x, -1.0, epsilon = 1e-12);
        let on_y = camera.space_from_image(&pixel, SpaceConstraint::Y(5.0));
        assert_relative_eq!(on_y.y, 5.0, epsilon = 1e-12);

        let (origin, direction) = camera.get_ray(&pixel, true);
        let at_distance = camera.space_from_image(&pixel, SpaceConstraint::Distance(7.5));
        assert_relative_eq!(at_distance, origin + direction * 7.5, epsilon = 1e-12);
        assert_relative_eq!((at_distance - origin).norm(), 7.5, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_behind_camera_is_nan() {
        let camera = get_sample_camera();
        // the ray points north and down, so the plane y = -5 lies behind it
        let point = camera.space_from_image(&Vector2::new(80.0, 60.0), SpaceConstraint::Y(-5.0));
        assert!(point.iter().all(|v| v.is_nan()));
        let above = camera.space_from_image(&Vector2::new(80.0, 60.0), SpaceConstraint::Z(20.0));
        assert!(above.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_batched_space_from_image() {
        let camera = get_sample_camera();
        let pixels = Matrix2xX::from_columns(&[
            Vector2::new(10.0, 100.0),
            Vector2::new(80.0, 60.0),
            Vector2::new(150.0, 5.0),
        ]);
        for constraint in [SpaceConstraint::Z(0.0), SpaceConstraint::Distance(3.0)] {
            let batch = camera.spaces_from_image(&pixels, constraint);
            for i in 0..pixels.ncols() {
                let single = camera.space_from_image(&Vector2::new(pixels[(0, i)], pixels[(1, i)]), constraint);
                assert_relative_eq!(batch.column(i).into_owned(), single, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_image_border_on_ground() {
        let camera = get_sample_camera();
        let border = camera.get_image_border(10);
        assert_eq!(border.ncols(), 2 * (12 + 16));
        for point in border.column_iter() {
            assert_relative_eq!(point[2], 0.0, epsilon = 1e-9);
        }
        // the far (top) edge lies beyond the near (bottom) edge
        let bottom_left = border.column(12).into_owned();
        let top_right = border.column(2 * 12 + 16).into_owned();
        assert!(top_right.y > bottom_left.y);
    }

    #[test]
    fn test_camera_cone_corners() {
        let camera = get_sample_camera();
        let border = camera.get_image_border(1);
        let cone = camera.get_camera_cone();
        assert_eq!(cone.ncols(), border.ncols() + 12);

        let corners = [0, 120, 120 + 160, 2 * 120 + 160];
        for (k, &corner) in corners.iter().enumerate() {
            let base = border.ncols() + 3 * k;
            assert!(cone.column(base).iter().all(|v| v.is_nan()));
            assert_relative_eq!(
                cone.column(base + 1).into_owned(),
                Vector3::new(0.0, 0.0, 10.0),
                epsilon = 1e-12
            );
            assert_relative_eq!(
                cone.column(base + 2).into_owned(),
                border.column(corner).into_owned(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_get_map_cache() {
        let mut camera = get_sample_camera();
        let extent = Extent::new(-5.0, 5.0, 10.0, 20.0);

        let first = camera.get_map(Some(extent), Some(0.5)).unwrap();
        assert_eq!(first.width(), 20);
        assert_eq!(first.height(), 20);
        let again = camera.get_map(Some(extent), Some(0.5)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let finer = camera.get_map(Some(extent), Some(0.25)).unwrap();
        assert!(!Arc::ptr_eq(&first, &finer));
        assert_eq!(finer.width(), 40);

        let moved = camera.get_map(Some(Extent::new(-5.0, 5.0, 11.0, 20.0)), Some(0.25)).unwrap();
        assert!(!Arc::ptr_eq(&finer, &moved));

        let cached = camera.get_map(Some(extent), Some(0.5)).unwrap();
        camera.set_parameter(ELEVATION_M, 12.0).unwrap();
        let rebuilt = camera.get_map(Some(extent), Some(0.5)).unwrap();
        assert!(!Arc::ptr_eq(&cached, &rebuilt));
        assert_ne!(cached.map_y, rebuilt.map_y);
    }

    #[test]
    fn test_get_map_rows_are_north_up() {
        let mut camera = get_sample_camera();
        let extent = Extent::new(-2.0, 2.0, 12.0, 20.0);
        let map = camera.get_map(Some(extent), Some(1.0)).unwrap();
        assert_eq!(map.height(), 8);

        // row 0 holds y = 19, the last row y = 12
        let top = camera.image_from_space(&Vector3::new(-2.0, 19.0, 0.0));
        let bottom = camera.image_from_space(&Vector3::new(-2.0, 12.0, 0.0));
        let (x, y) = map.lookup(0, 0).unwrap();
        assert_relative_eq!(x as f64, top.x, epsilon = 1e-3);
        assert_relative_eq!(y as f64, top.y, epsilon = 1e-3);
        let (_, y) = map.lookup(7, 0).unwrap();
        assert_relative_eq!(y as f64, bottom.y, epsilon = 1e-3);
        assert!(top.y < bottom.y);
    }

    #[test]
    fn test_get_map_default_extent() {
        let mut camera = get_sample_camera();
        let map = camera.get_map(None, None).unwrap();
        let border = Extent::bounding_box(&camera.get_image_border(1)).unwrap();
        assert_eq!(map.extent, border);
        let expected = (border.area() / (160.0 * 120.0)).sqrt();
        assert_relative_eq!(map.scaling, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_get_map_invalid_extent() {
        let mut camera = get_sample_camera();
        let flat = Extent::new(0.0, 0.0, 10.0, 20.0);
        assert!(matches!(
            camera.get_map(Some(flat), Some(1.0)),
            Err(CameraError::InvalidExtent(_))
        ));
        let extent = Extent::new(-1.0, 1.0, 10.0, 20.0);
        assert!(camera.get_map(Some(extent), Some(0.0)).is_err());
        assert!(camera.get_map(Some(extent), Some(-1.0)).is_err());

        // looking above the horizon no border pixel reaches the ground
        camera.set_parameter(TILT_DEG, 150.0).unwrap();
        assert!(matches!(camera.get_map(None, None), Err(CameraError::InvalidExtent(_))));
    }

    #[test]
    fn test_top_view_of_image() {
        let mut camera = get_sample_camera();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(160, 120, Rgb([200, 10, 10])));
        let top_view = camera.get_top_view_of_image(&image, None, None).unwrap();
        let map = camera.get_map(None, None).unwrap();
        assert_eq!(top_view.width() as usize, map.width());
        assert_eq!(top_view.height() as usize, map.height());

        assert!(top_view.pixels().any(|p| p.0 == [200, 10, 10, 255]));
        // the bounding box of the ground trapezoid has invisible corners
        assert!(top_view.pixels().any(|p| p.0[3] == 0));
    }

    #[test]
    fn test_parameter_routing() {
        let mut camera = get_sample_camera();
        let names: Vec<String> = camera.parameter_set().names().map(String::from).collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], FOCALLENGTH_MM);
        assert!(names[5..].contains(&ELEVATION_M.to_string()));

        camera.set_parameter(FOCALLENGTH_MM, 12.0).unwrap();
        assert_relative_eq!(camera.projection().intrinsics().focallength_px(), 300.0, epsilon = 1e-9);
        camera.set_parameter(TILT_DEG, 30.0).unwrap();
        assert_eq!(camera.orientation().tilt_deg(), 30.0);
        assert!(matches!(
            camera.set_parameter("C0_tilt_deg", 1.0),
            Err(CameraError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_display() {
        let text = get_sample_camera().to_string();
        assert!(text.contains("intrinsic (rectilinear)"));
        assert!(text.contains("extrinsic"));
        assert!(text.contains("tilt 60.00°"));
    }
}
