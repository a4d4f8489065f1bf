//! Integration tests for camera ray casting, border sampling and rectification maps

use std::sync::Arc;

use approx::assert_relative_eq;
use camera_transform::orientation::{HEADING_DEG, POS_X_M};
use camera_transform::{
    Camera, Extent, Intrinsics, Parametrized, Projection, ProjectionKind, SpaceConstraint,
    SpatialOrientation,
};
use image::{DynamicImage, Rgb, RgbImage};
use nalgebra::{Matrix3xX, Vector2, Vector3};

fn camera(kind: ProjectionKind) -> Camera {
    Camera::new(
        Projection::new(kind, Intrinsics::new(6.0, (6.4, 4.8), (160, 120)).unwrap()),
        SpatialOrientation::new(10.0, 55.0, 2.0, 20.0, 3.0, -4.0),
    )
}

fn ground_points() -> Matrix3xX<f64> {
    // around the optical axis of `camera`, which looks north-north-east
    let center = Vector3::new(3.0, -4.0, 0.0)
        + Vector3::new(20f64.to_radians().sin(), 20f64.to_radians().cos(), 0.0) * 10.0 * 55f64.to_radians().tan();
    Matrix3xX::from_columns(&[
        center,
        center + Vector3::new(1.0, 2.0, 0.0),
        center + Vector3::new(-2.0, -1.5, 0.0),
        center + Vector3::new(0.5, 4.0, 0.0),
    ])
}

#[test]
fn test_ground_round_trip_for_every_model() {
    for kind in [
        ProjectionKind::Rectilinear,
        ProjectionKind::Cylindrical,
        ProjectionKind::Equirectangular,
    ] {
        let camera = camera(kind);
        let points = ground_points();
        let images = camera.images_from_space(&points);
        for image in images.column_iter() {
            assert!(image[0] > 0.0 && image[0] < 160.0, "{kind:?} {image:?}");
            assert!(image[1] > 0.0 && image[1] < 120.0, "{kind:?} {image:?}");
        }
        let recovered = camera.spaces_from_image(&images, SpaceConstraint::Z(0.0));
        assert_relative_eq!(recovered, points, epsilon = 1e-8);
    }
}

#[test]
fn test_elevated_plane_round_trip() {
    let camera = camera(ProjectionKind::Rectilinear);
    let point = ground_points().column(0).into_owned() + Vector3::new(0.0, 0.0, 2.5);
    let image = camera.image_from_space(&point);
    let recovered = camera.space_from_image(&image, SpaceConstraint::Z(2.5));
    assert_relative_eq!(recovered, point, epsilon = 1e-8);

    let on_x = camera.space_from_image(&image, SpaceConstraint::X(point.x));
    assert_relative_eq!(on_x, point, epsilon = 1e-8);
}

#[test]
fn test_distance_mode_matches_normed_ray() {
    let camera = camera(ProjectionKind::Cylindrical);
    let pixel = Vector2::new(40.0, 90.0);
    let (origin, direction) = camera.get_ray(&pixel, true);
    assert_relative_eq!(direction.norm(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(origin, Vector3::new(3.0, -4.0, 10.0), epsilon = 1e-12);

    for distance in [0.0, 1.0, 42.0] {
        let point = camera.space_from_image(&pixel, SpaceConstraint::Distance(distance));
        assert_relative_eq!(point, origin + direction * distance, epsilon = 1e-10);
    }
    let behind = camera.space_from_image(&pixel, SpaceConstraint::Distance(-1.0));
    assert!(behind.iter().all(|v| v.is_nan()));
}

#[test]
fn test_horizon_pixels_do_not_reach_the_ground() {
    let camera = Camera::new(
        Projection::new(
            ProjectionKind::Rectilinear,
            Intrinsics::new(6.0, (6.4, 4.8), (160, 120)).unwrap(),
        ),
        SpatialOrientation::new(10.0, 90.0, 0.0, 0.0, 0.0, 0.0),
    );
    // the upper half of a level camera sees the sky
    let sky = camera.space_from_image(&Vector2::new(80.0, 10.0), SpaceConstraint::Z(0.0));
    assert!(sky.iter().all(|v| v.is_nan()));
    let ground = camera.space_from_image(&Vector2::new(80.0, 110.0), SpaceConstraint::Z(0.0));
    assert!(ground.iter().all(|v| v.is_finite()));

    let border = camera.get_image_border(10);
    let visible = border.column_iter().filter(|p| p[0].is_finite()).count();
    assert!(visible > 0 && visible < border.ncols());
}

#[test]
fn test_map_cache_follows_inputs() {
    let mut camera = camera(ProjectionKind::Rectilinear);
    let first = camera.get_map(None, None).unwrap();
    let second = camera.get_map(None, None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let explicit = camera.get_map(Some(first.extent), Some(first.scaling)).unwrap();
    assert!(Arc::ptr_eq(&first, &explicit));

    let coarse = camera.get_map(Some(first.extent), Some(first.scaling * 2.0)).unwrap();
    assert!(!Arc::ptr_eq(&first, &coarse));
    assert!(coarse.width() < first.width());

    camera.set_parameter(HEADING_DEG, 25.0).unwrap();
    let turned = camera.get_map(Some(first.extent), Some(first.scaling * 2.0)).unwrap();
    assert!(!Arc::ptr_eq(&coarse, &turned));
}

#[test]
fn test_map_entries_project_grid_points() {
    let mut camera = camera(ProjectionKind::Equirectangular);
    let extent = Extent::new(4.0, 10.0, 5.0, 15.0);
    let map = camera.get_map(Some(extent), Some(2.0)).unwrap();
    assert_eq!((map.width(), map.height()), (3, 5));

    for row in 0..map.height() {
        for col in 0..map.width() {
            let x = 4.0 + 2.0 * col as f64;
            let y = 13.0 - 2.0 * row as f64;
            let expected = camera.image_from_space(&Vector3::new(x, y, 0.0));
            match map.lookup(row, col) {
                Some((mx, my)) => {
                    assert_relative_eq!(mx as f64, expected.x, epsilon = 1e-3);
                    assert_relative_eq!(my as f64, expected.y, epsilon = 1e-3);
                }
                None => assert!(expected.x.is_nan()),
            }
        }
    }
}

#[test]
fn test_top_view_moves_with_the_camera() {
    let mut camera = camera(ProjectionKind::Rectilinear);
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(160, 120, |x, _| {
        if x < 80 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    }));
    let extent = Extent::new(-20.0, 40.0, -10.0, 50.0);

    let view = camera.get_top_view_of_image(&image, Some(extent), Some(0.5)).unwrap();
    assert_eq!(view.dimensions(), (120, 120));
    let opaque = view.pixels().filter(|p| p.0[3] == 255).count();
    assert!(opaque > 0);
    assert!(view.pixels().any(|p| p.0 == [255, 0, 0, 255]));
    assert!(view.pixels().any(|p| p.0 == [0, 0, 255, 255]));

    // the camera footprint shifts, so the visible area changes
    camera.set_parameter(POS_X_M, 15.0).unwrap();
    let moved = camera.get_top_view_of_image(&image, Some(extent), Some(0.5)).unwrap();
    assert_ne!(view, moved);
}
