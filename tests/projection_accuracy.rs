//! Integration tests for projection and ray accuracy across all models

use approx::assert_relative_eq;
use camera_transform::projection::FOCALLENGTH_MM;
use camera_transform::{
    CameraProjection, FieldOfView, Intrinsics, Parametrized, Projection, ProjectionKind,
};
use nalgebra::{Matrix2xX, Vector2, Vector3};

const KINDS: [ProjectionKind; 3] = [
    ProjectionKind::Rectilinear,
    ProjectionKind::Cylindrical,
    ProjectionKind::Equirectangular,
];

fn projection(kind: ProjectionKind) -> Projection {
    Projection::new(kind, Intrinsics::new(14.0, (17.3, 13.0), (4608, 3456)).unwrap())
}

#[test]
fn test_reference_camera_center() {
    let projection = projection(ProjectionKind::Rectilinear);
    let image = projection.image_from_camera(&Vector3::new(0.0, 0.0, -1000.0));
    assert_relative_eq!(image, Vector2::new(2304.0, 1728.0), epsilon = 1e-9);
}

#[test]
fn test_center_projects_to_center_for_every_model() {
    for kind in KINDS {
        let image = projection(kind).image_from_camera(&Vector3::new(0.0, 0.0, -3.0));
        assert_relative_eq!(image, Vector2::new(2304.0, 1728.0), epsilon = 1e-9);
    }
}

#[test]
fn test_ray_round_trip_for_every_model() {
    let pixels = Matrix2xX::from_columns(&[
        Vector2::new(0.0, 0.0),
        Vector2::new(4608.0, 3456.0),
        Vector2::new(1000.0, 2500.0),
        Vector2::new(3900.0, 400.0),
    ]);
    for kind in KINDS {
        let projection = projection(kind);
        for normed in [false, true] {
            let rays = projection.get_rays(&pixels, normed);
            for scale in [0.1, 1.0, 250.0] {
                let images = projection.images_from_camera(&(&rays * scale));
                assert_relative_eq!(images, pixels, epsilon = 1e-7);
            }
        }
    }
}

#[test]
fn test_rays_face_the_scene() {
    for kind in KINDS {
        let ray = projection(kind).get_ray(&Vector2::new(2304.0, 1728.0), true);
        assert_relative_eq!(ray, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }
}

#[test]
fn test_points_behind_camera_are_nan_for_every_model() {
    let points = [
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(2.0, -1.0, 0.5),
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(1.0, 1.0, 1e-11),
        Vector3::new(1.0, 1.0, -1e-11),
    ];
    for kind in KINDS {
        let projection = projection(kind);
        for point in &points {
            let image = projection.image_from_camera(point);
            assert!(image.x.is_nan() && image.y.is_nan(), "{kind:?} {point:?} -> {image:?}");
        }
    }
}

#[test]
fn test_field_of_view_round_trip_for_every_model() {
    for kind in KINDS {
        let projection = projection(kind);
        let (horizontal, vertical) = projection.field_of_view();
        assert!(horizontal > vertical);
        for view in [FieldOfView::Horizontal(horizontal), FieldOfView::Vertical(vertical)] {
            assert_relative_eq!(projection.field_of_view_to_focallength(view), 14.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_focal_length_write_changes_projection() {
    let mut projection = projection(ProjectionKind::Rectilinear);
    let point = Vector3::new(1.0, 0.5, -10.0);
    let before = projection.image_from_camera(&point) - Vector2::new(2304.0, 1728.0);

    projection.set_parameter(FOCALLENGTH_MM, 28.0).unwrap();
    let after = projection.image_from_camera(&point) - Vector2::new(2304.0, 1728.0);
    assert_relative_eq!(after, before * 2.0, epsilon = 1e-9);
}
