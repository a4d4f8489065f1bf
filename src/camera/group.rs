//! Rigs of several cameras.
//!
//! A [`CameraGroup`] is built from a projection axis and an orientation axis.
//! Each axis is either one instance shared by every camera or one instance per
//! camera ([`RigAxis`]). Parameters of a per-camera axis are exposed as
//! `C{index}_{name}`; parameters of a shared axis keep their plain name and a
//! write to them reaches every camera.

use std::fmt;
use std::ops::Index;

use log::info;
use nalgebra::{Matrix2xX, Matrix3xX, Vector2, Vector3};

use super::Camera;
use crate::error::CameraError;
use crate::fit::{self, FitOptions, FitResult};
use crate::orientation::SpatialOrientation;
use crate::parameters::{ParameterSet, ParameterState, Parametrized};
use crate::projection::Projection;

/// Relative tolerance below which the triangulation system counts as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// One component axis of a rig.
#[derive(Debug, Clone, PartialEq)]
pub enum RigAxis<T> {
    /// The same value for every camera.
    Shared(T),
    /// One value per camera, in rig order.
    PerCamera(Vec<T>),
}

impl<T> RigAxis<T> {
    fn is_shared(&self) -> bool {
        matches!(self, RigAxis::Shared(_))
    }

    fn len(&self) -> Option<usize> {
        match self {
            RigAxis::Shared(_) => None,
            RigAxis::PerCamera(values) => Some(values.len()),
        }
    }
}

impl<T: Clone> RigAxis<T> {
    fn get(&self, index: usize) -> Option<T> {
        match self {
            RigAxis::Shared(value) => Some(value.clone()),
            RigAxis::PerCamera(values) => values.get(index).cloned(),
        }
    }
}

/// Which half of a camera's parameters a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Projection,
    Orientation,
}

/// An ordered set of cameras with a joint parameter namespace.
#[derive(Debug, Clone)]
pub struct CameraGroup {
    cameras: Vec<Camera>,
    shared_projection: bool,
    shared_orientation: bool,
}

impl CameraGroup {
    /// Builds the rig.
    ///
    /// # Errors
    ///
    /// [`CameraError::RigMismatch`] if both axes are shared, a list is empty,
    /// or the two lists differ in length.
    pub fn new(
        projections: RigAxis<Projection>,
        orientations: RigAxis<SpatialOrientation>,
    ) -> Result<Self, CameraError> {
        let count = match (projections.len(), orientations.len()) {
            (None, None) => {
                return Err(CameraError::RigMismatch(
                    "at least one of projections and orientations must be given per camera".to_string(),
                ))
            }
            (Some(p), Some(o)) if p != o => {
                return Err(CameraError::RigMismatch(format!(
                    "{p} projections but {o} orientations"
                )))
            }
            (Some(n), _) | (None, Some(n)) => n,
        };
        if count == 0 {
            return Err(CameraError::RigMismatch("a rig needs at least one camera".to_string()));
        }

        let mut cameras = Vec::with_capacity(count);
        for index in 0..count {
            match (projections.get(index), orientations.get(index)) {
                (Some(projection), Some(orientation)) => {
                    cameras.push(Camera::new(projection, orientation))
                }
                _ => {
                    return Err(CameraError::RigMismatch(format!(
                        "camera {index} is missing a component"
                    )))
                }
            }
        }
        info!("new camera group with {count} cameras");

        Ok(CameraGroup {
            cameras,
            shared_projection: projections.is_shared(),
            shared_orientation: orientations.is_shared(),
        })
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Camera> {
        self.cameras.iter()
    }

    fn component_set(camera: &Camera, component: Component) -> ParameterSet {
        match component {
            Component::Projection => camera.projection().parameter_set(),
            Component::Orientation => camera.orientation().parameter_set(),
        }
    }

    fn is_shared(&self, component: Component) -> bool {
        match component {
            Component::Projection => self.shared_projection,
            Component::Orientation => self.shared_orientation,
        }
    }

    /// Cameras and local names a joint parameter name refers to.
    fn targets(&self, name: &str) -> Result<Vec<(usize, String)>, CameraError> {
        for component in [Component::Projection, Component::Orientation] {
            if self.is_shared(component) {
                let known = self
                    .cameras
                    .first()
                    .is_some_and(|c| Self::component_set(c, component).contains(name));
                if known {
                    return Ok((0..self.len()).map(|i| (i, name.to_string())).collect());
                }
            } else if let Some((index, local)) = split_prefixed(name) {
                let found = self
                    .cameras
                    .get(index)
                    .is_some_and(|c| Self::component_set(c, component).contains(local));
                if found {
                    return Ok(vec![(index, local.to_string())]);
                }
            }
        }
        Err(CameraError::UnknownParameter(name.to_string()))
    }

    /// Ray intersection of a pixel seen by camera 0 and one seen by camera 1.
    pub fn space_from_images(&self, point0: &Vector2<f64>, point1: &Vector2<f64>) -> Result<Vector3<f64>, CameraError> {
        let (first, second) = self.stereo_pair()?;
        let (p1, v1) = first.get_ray(point0, false);
        let (p2, v2) = second.get_ray(point1, false);
        Ok(intersection_of_two_lines(&p1, &v1, &p2, &v2))
    }

    /// Column-wise [`CameraGroup::space_from_images`].
    pub fn spaces_from_images(
        &self,
        points0: &Matrix2xX<f64>,
        points1: &Matrix2xX<f64>,
    ) -> Result<Matrix3xX<f64>, CameraError> {
        let (first, second) = self.stereo_pair()?;
        let (p1, v1) = first.get_rays(points0, false);
        let (p2, v2) = second.get_rays(points1, false);
        intersection_of_two_lines_batch(&p1, &v1, &p2, &v2)
    }

    fn stereo_pair(&self) -> Result<(&Camera, &Camera), CameraError> {
        match self.cameras.as_slice() {
            [first, second, ..] => Ok((first, second)),
            _ => Err(CameraError::RigMismatch(format!(
                "triangulation needs two cameras, the rig has {}",
                self.len()
            ))),
        }
    }

    /// Image coordinates of `point` in every camera, in rig order.
    pub fn images_from_point(&self, point: &Vector3<f64>) -> Vec<Vector2<f64>> {
        self.cameras.iter().map(|c| c.image_from_space(point)).collect()
    }

    /// Image coordinates of `points` in every camera, in rig order.
    pub fn images_from_space(&self, points: &Matrix3xX<f64>) -> Vec<Matrix2xX<f64>> {
        self.cameras.iter().map(|c| c.images_from_space(points)).collect()
    }

    /// Fits the joint parameters in state `Fit` by minimizing `cost`.
    pub fn fit<F>(&mut self, cost: F, options: &FitOptions) -> Result<FitResult, CameraError>
    where
        F: Fn(&CameraGroup) -> f64,
    {
        fit::fit(self, cost, options)
    }
}

/// Splits `C{index}_{name}` into its parts. Only the canonical spelling of
/// the index is accepted, so `C01_` and `C+1_` are not aliases of `C1_`.
fn split_prefixed(name: &str) -> Option<(usize, &str)> {
    let (index, local) = name.strip_prefix('C')?.split_once('_')?;
    let parsed: usize = index.parse().ok()?;
    (parsed.to_string() == index).then_some((parsed, local))
}

/// Midpoint of the shortest segment between two lines `p + s·v`.
///
/// Returns NaN when the lines are parallel.
pub fn intersection_of_two_lines(
    p1: &Vector3<f64>,
    v1: &Vector3<f64>,
    p2: &Vector3<f64>,
    v2: &Vector3<f64>,
) -> Vector3<f64> {
    let offset = p1 - p2;
    let (a1, b1, c1) = (v1.dot(v1), -v2.dot(v1), -v1.dot(&offset));
    let (a2, b2, c2) = (v1.dot(v2), -v2.dot(v2), -v2.dot(&offset));

    let det = a1 * b2 - b1 * a2;
    if !det.is_finite() || det.abs() <= SINGULAR_TOLERANCE * ((a1 * b2).abs() + (b1 * a2).abs()) {
        return Vector3::repeat(f64::NAN);
    }
    let s = (c1 * b2 - b1 * c2) / det;
    let t = (a1 * c2 - c1 * a2) / det;
    ((p1 + v1 * s) + (p2 + v2 * t)) / 2.0
}

/// [`intersection_of_two_lines`] for shared origins and one direction pair per column.
///
/// # Errors
///
/// [`CameraError::InvalidParams`] if the direction matrices differ in width.
pub fn intersection_of_two_lines_batch(
    p1: &Vector3<f64>,
    v1s: &Matrix3xX<f64>,
    p2: &Vector3<f64>,
    v2s: &Matrix3xX<f64>,
) -> Result<Matrix3xX<f64>, CameraError> {
    if v1s.ncols() != v2s.ncols() {
        return Err(CameraError::InvalidParams(format!(
            "{} directions for the first line but {} for the second",
            v1s.ncols(),
            v2s.ncols()
        )));
    }
    let mut result = Matrix3xX::zeros(v1s.ncols());
    for (i, (v1, v2)) in v1s.column_iter().zip(v2s.column_iter()).enumerate() {
        let point = intersection_of_two_lines(p1, &v1.into_owned(), p2, &v2.into_owned());
        result.set_column(i, &point);
    }
    Ok(result)
}

impl Parametrized for CameraGroup {
    /// Projection parameters first, then orientation parameters; per-camera
    /// axes list camera 0 first.
    fn parameter_set(&self) -> ParameterSet {
        let mut sets = Vec::new();
        for component in [Component::Projection, Component::Orientation] {
            if self.is_shared(component) {
                sets.extend(self.cameras.first().map(|c| Self::component_set(c, component)));
            } else {
                for (index, camera) in self.cameras.iter().enumerate() {
                    sets.push(Self::component_set(camera, component).prefixed(&format!("C{index}_")));
                }
            }
        }
        sets.iter()
            .flat_map(|set| set.iter())
            .map(|(name, parameter)| (name.to_string(), parameter.clone()))
            .collect()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), CameraError> {
        for (index, local) in self.targets(name)? {
            self.cameras[index].set_parameter(&local, value)?;
        }
        Ok(())
    }

    fn set_parameter_state(&mut self, name: &str, state: ParameterState) -> Result<(), CameraError> {
        for (index, local) in self.targets(name)? {
            self.cameras[index].set_parameter_state(&local, state)?;
        }
        Ok(())
    }
}

impl Index<usize> for CameraGroup {
    type Output = Camera;

    fn index(&self, index: usize) -> &Camera {
        &self.cameras[index]
    }
}

impl<'a> IntoIterator for &'a CameraGroup {
    type Item = &'a Camera;
    type IntoIter = std::slice::Iter<'a, Camera>;

    fn into_iter(self) -> Self::IntoIter {
        self.cameras.iter()
    }
}

impl fmt::Display for CameraGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, camera) in self.cameras.iter().enumerate() {
            writeln!(f, "C{index}:")?;
            write!(f, "{camera}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::{ELEVATION_M, TILT_DEG};
    use crate::projection::{CameraProjection, Intrinsics, ProjectionKind, FOCALLENGTH_MM};
    use approx::assert_relative_eq;

    fn get_sample_projection() -> Projection {
        Projection::new(
            ProjectionKind::Rectilinear,
            Intrinsics::new(6.0, (6.4, 4.8), (160, 120)).unwrap(),
        )
    }

    fn get_sample_group() -> CameraGroup {
        CameraGroup::new(
            RigAxis::Shared(get_sample_projection()),
            RigAxis::PerCamera(vec![
                SpatialOrientation::new(10.0, 60.0, 0.0, 0.0, -2.0, 0.0),
                SpatialOrientation::new(10.0, 60.0, 0.0, 0.0, 2.0, 0.0),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_intersection_of_crossing_lines() {
        let target = Vector3::new(1.0, 2.0, 3.0);
        let p1 = Vector3::new(0.0, 0.0, 0.0);
        let p2 = Vector3::new(5.0, -1.0, 1.0);
        let point = intersection_of_two_lines(&p1, &(target - p1), &p2, &((target - p2) * 2.0));
        assert_relative_eq!(point, target, epsilon = 1e-12);
    }

    #[test]
    fn test_intersection_of_skew_lines_is_midpoint() {
        let point = intersection_of_two_lines(
            &Vector3::new(0.0, 0.0, 0.0),
            &Vector3::new(1.0, 0.0, 0.0),
            &Vector3::new(0.0, 0.0, 1.0),
            &Vector3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(point, Vector3::new(0.0, 0.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_lines_give_nan() {
        let point = intersection_of_two_lines(
            &Vector3::new(0.0, 0.0, 0.0),
            &Vector3::new(1.0, 1.0, 0.0),
            &Vector3::new(0.0, 0.0, 1.0),
            &Vector3::new(-2.0, -2.0, 0.0),
        );
        assert!(point.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_intersection_batch() {
        let p1 = Vector3::new(0.0, 0.0, 10.0);
        let p2 = Vector3::new(4.0, 0.0, 10.0);
        let targets = [Vector3::new(1.0, 8.0, 0.0), Vector3::new(-3.0, 12.0, 0.5)];
        let v1s = Matrix3xX::from_columns(&targets.map(|t| t - p1));
        let v2s = Matrix3xX::from_columns(&targets.map(|t| t - p2));

        let points = intersection_of_two_lines_batch(&p1, &v1s, &p2, &v2s).unwrap();
        for (i, target) in targets.iter().enumerate() {
            assert_relative_eq!(points.column(i).into_owned(), *target, epsilon = 1e-10);
        }

        let short = Matrix3xX::from_columns(&[targets[0] - p2]);
        assert!(intersection_of_two_lines_batch(&p1, &v1s, &p2, &short).is_err());
    }

    #[test]
    fn test_rig_layout_errors() {
        let shared = CameraGroup::new(
            RigAxis::Shared(get_sample_projection()),
            RigAxis::Shared(SpatialOrientation::default()),
        );
        assert!(matches!(shared, Err(CameraError::RigMismatch(_))));

        let uneven = CameraGroup::new(
            RigAxis::PerCamera(vec![get_sample_projection(); 3]),
            RigAxis::PerCamera(vec![SpatialOrientation::default(); 2]),
        );
        assert!(matches!(uneven, Err(CameraError::RigMismatch(_))));

        let empty = CameraGroup::new(
            RigAxis::PerCamera(Vec::new()),
            RigAxis::Shared(SpatialOrientation::default()),
        );
        assert!(matches!(empty, Err(CameraError::RigMismatch(_))));
    }

    #[test]
    fn test_parameter_namespacing() {
        let group = get_sample_group();
        let names: Vec<String> = group.parameter_set().names().map(String::from).collect();
        assert_eq!(names.len(), 5 + 2 * 6);
        assert_eq!(names[0], FOCALLENGTH_MM);
        assert!(names.contains(&"C0_elevation_m".to_string()));
        assert!(names.contains(&"C1_pos_x_m".to_string()));
        assert!(!names.contains(&"elevation_m".to_string()));
        assert!(!names.contains(&"C0_focallength_mm".to_string()));
        assert_eq!(group.get_parameter("C1_pos_x_m").unwrap(), 2.0);
    }

    #[test]
    fn test_index_prefix_must_be_canonical() {
        let mut group = get_sample_group();
        for alias in ["C01_tilt_deg", "C+1_tilt_deg", "C1tilt_deg", "C_tilt_deg"] {
            assert!(matches!(
                group.set_parameter(alias, 20.0),
                Err(CameraError::UnknownParameter(_))
            ));
        }
        assert_eq!(group[1].orientation().tilt_deg(), 60.0);

        group.set_parameter("C1_tilt_deg", 20.0).unwrap();
        assert_eq!(group[1].orientation().tilt_deg(), 20.0);
        assert_eq!(split_prefixed("C10_roll_deg"), Some((10, "roll_deg")));
        assert_eq!(split_prefixed("C0_roll_deg"), Some((0, "roll_deg")));
    }

    #[test]
    fn test_shared_write_reaches_every_camera() {
        let mut group = get_sample_group();
        group.set_parameter(FOCALLENGTH_MM, 8.0).unwrap();
        for camera in &group {
            assert_eq!(camera.projection().intrinsics().focallength_mm(), 8.0);
        }

        group.set_parameter("C1_tilt_deg", 45.0).unwrap();
        assert_eq!(group[0].orientation().tilt_deg(), 60.0);
        assert_eq!(group[1].orientation().tilt_deg(), 45.0);

        for name in [ELEVATION_M, TILT_DEG, "C2_tilt_deg", "C0_focallength_mm", "Cx_tilt_deg"] {
            assert!(
                matches!(group.set_parameter(name, 1.0), Err(CameraError::UnknownParameter(_))),
                "{name}"
            );
        }
    }

    #[test]
    fn test_per_camera_projections() {
        let mut group = CameraGroup::new(
            RigAxis::PerCamera(vec![get_sample_projection(), get_sample_projection()]),
            RigAxis::Shared(SpatialOrientation::new(10.0, 60.0, 0.0, 0.0, 0.0, 0.0)),
        )
        .unwrap();
        group.set_parameter("C1_focallength_mm", 12.0).unwrap();
        assert_eq!(group[0].projection().intrinsics().focallength_mm(), 6.0);
        assert_eq!(group[1].projection().intrinsics().focallength_mm(), 12.0);

        group.set_parameter(ELEVATION_M, 20.0).unwrap();
        assert!(group.iter().all(|c| c.orientation().elevation_m() == 20.0));

        group.set_parameter_state("C0_focallength_mm", ParameterState::Fit).unwrap();
        assert_eq!(group.parameter_set().fit_parameter_names(), vec!["C0_focallength_mm".to_string()]);
    }

    #[test]
    fn test_space_from_images_recovers_point() {
        let group = get_sample_group();
        let target = Vector3::new(0.5, 16.0, 0.0);
        let images = group.images_from_point(&target);
        assert_eq!(images.len(), 2);

        let point = group.space_from_images(&images[0], &images[1]).unwrap();
        assert_relative_eq!(point, target, epsilon = 1e-8);

        let targets = Matrix3xX::from_columns(&[target, Vector3::new(-1.0, 14.0, 0.8)]);
        let images = group.images_from_space(&targets);
        let points = group.spaces_from_images(&images[0], &images[1]).unwrap();
        assert_relative_eq!(points, targets, epsilon = 1e-8);
    }

    #[test]
    fn test_triangulation_needs_two_cameras() {
        let group = CameraGroup::new(
            RigAxis::Shared(get_sample_projection()),
            RigAxis::PerCamera(vec![SpatialOrientation::default()]),
        )
        .unwrap();
        assert_eq!(group.len(), 1);
        assert!(matches!(
            group.space_from_images(&Vector2::new(1.0, 1.0), &Vector2::new(2.0, 2.0)),
            Err(CameraError::RigMismatch(_))
        ));
    }
}
