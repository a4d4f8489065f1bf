//! Orientation Fitting Example
//!
//! Recovers the elevation, tilt and heading of a camera from a handful of
//! ground markers with known positions and observed pixels.
//!
//! Run with: cargo run --example fit_orientation

use camera_transform::orientation::{ELEVATION_M, HEADING_DEG, TILT_DEG};
use camera_transform::util::{compute_reprojection_error, reprojection_cost};
use camera_transform::{
    Camera, FitOptions, Intrinsics, Parametrized, Projection, ProjectionKind, SpatialOrientation,
};
use nalgebra::{Matrix3xX, Vector3};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Orientation Fitting Example ===\n");

    let projection = Projection::new(
        ProjectionKind::Rectilinear,
        Intrinsics::new(14.0, (17.3, 13.0), (4608, 3456))?,
    );
    let truth = Camera::new(
        projection.clone(),
        SpatialOrientation::new(12.0, 70.0, 0.0, 10.0, 0.0, 0.0),
    );

    // surveyed ground markers and where the true camera sees them
    let world = Matrix3xX::from_columns(&[
        Vector3::new(-6.0, 25.0, 0.0),
        Vector3::new(0.0, 20.0, 0.0),
        Vector3::new(8.0, 35.0, 0.0),
        Vector3::new(3.0, 28.0, 0.0),
        Vector3::new(-2.0, 45.0, 0.0),
        Vector3::new(10.0, 50.0, 0.0),
    ]);
    let observed = truth.images_from_space(&world);

    // start from a rough guess
    let mut camera = Camera::new(projection, SpatialOrientation::new(10.0, 65.0, 0.0, 0.0, 0.0, 0.0));
    camera.mark_for_fit(&[ELEVATION_M, TILT_DEG, HEADING_DEG])?;

    let before = compute_reprojection_error(&camera, &world, &observed)?;
    println!("Before fit: {before:?}");

    let result = camera.fit(
        |candidate| reprojection_cost(candidate, &world, &observed, 1e8),
        &FitOptions::default(),
    )?;

    let after = compute_reprojection_error(&camera, &world, &observed)?;
    println!("After fit:  {after:?}\n");
    println!("{} iterations, cost {:.3e}", result.iterations, result.cost);
    for (name, value) in result.names.iter().zip(&result.x) {
        println!("  {name:<12} {value:>8.4}  (true {:>8.4})", truth.get_parameter(name)?);
    }
    Ok(())
}
