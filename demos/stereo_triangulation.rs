//! Stereo Triangulation Example
//!
//! Two cameras share one lens model and look at the same scene from different
//! positions. A point seen by both is recovered by intersecting the two pixel
//! rays.
//!
//! Run with: cargo run --example stereo_triangulation

use camera_transform::{
    CameraGroup, Intrinsics, Parametrized, Projection, ProjectionKind, RigAxis, SpatialOrientation,
};
use nalgebra::{Matrix3xX, Vector3};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Stereo Triangulation Example ===\n");

    let projection = Projection::new(
        ProjectionKind::Rectilinear,
        Intrinsics::new(8.0, (6.4, 4.8), (1280, 960))?,
    );
    let group = CameraGroup::new(
        RigAxis::Shared(projection),
        RigAxis::PerCamera(vec![
            SpatialOrientation::new(2.0, 85.0, 0.0, 5.0, -1.0, 0.0),
            SpatialOrientation::new(2.0, 85.0, 0.0, -5.0, 1.0, 0.0),
        ]),
    )?;

    println!("Rig with {} cameras, parameters:", group.len());
    for (name, parameter) in group.parameter_set().iter() {
        println!("  {name:<20} {:>10.3}", parameter.value);
    }
    println!();

    let targets = Matrix3xX::from_columns(&[
        Vector3::new(0.0, 20.0, 1.5),
        Vector3::new(-2.0, 15.0, 0.0),
        Vector3::new(3.0, 30.0, 4.0),
    ]);
    let images = group.images_from_space(&targets);
    let recovered = group.spaces_from_images(&images[0], &images[1])?;

    for i in 0..targets.ncols() {
        let target = targets.column(i);
        let point = recovered.column(i);
        println!(
            "target [{:6.2}, {:6.2}, {:6.2}]  C0 [{:7.1}, {:7.1}]  C1 [{:7.1}, {:7.1}]  → [{:6.2}, {:6.2}, {:6.2}]",
            target[0],
            target[1],
            target[2],
            images[0][(0, i)],
            images[0][(1, i)],
            images[1][(0, i)],
            images[1][(1, i)],
            point[0],
            point[1],
            point[2]
        );
    }

    let error = (recovered - targets).norm();
    println!("\nTotal triangulation error: {error:.2e} m");
    Ok(())
}
