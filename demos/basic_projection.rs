//! Basic Projection Example
//!
//! This example demonstrates the fundamental camera operations:
//! - Creating a camera from intrinsic and extrinsic parameters
//! - Projecting world points to image coordinates
//! - Casting pixel rays back onto the ground plane
//! - Sampling the visible ground area
//!
//! Run with: cargo run --example basic_projection

use camera_transform::{
    Camera, CameraProjection, Intrinsics, Projection, ProjectionKind, SpaceConstraint,
    SpatialOrientation,
};
use nalgebra::{Matrix2xX, Vector2, Vector3};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Basic Camera Projection Example ===\n");

    // 14 mm lens on a 17.3×13 mm sensor, 4608×3456 px
    let intrinsics = Intrinsics::new(14.0, (17.3, 13.0), (4608, 3456))?;
    let projection = Projection::new(ProjectionKind::Rectilinear, intrinsics);
    // 15 m above ground, 80° up from straight down, facing north-east
    let orientation = SpatialOrientation::new(15.0, 80.0, 0.0, 45.0, 0.0, 0.0);
    let camera = Camera::new(projection, orientation);

    print!("{camera}");
    let (horizontal, vertical) = camera.projection().field_of_view();
    println!("Field of view: {horizontal:.1}° × {vertical:.1}°\n");

    // Example 1: world → image
    println!("--- Example 1: Project world → image ---");
    let point = Vector3::new(40.0, 45.0, 0.0);
    let image = camera.image_from_space(&point);
    println!("World point: [{:.2}, {:.2}, {:.2}] m", point.x, point.y, point.z);
    println!("Image point: [{:.2}, {:.2}] px\n", image.x, image.y);

    // Example 2: image → ground
    println!("--- Example 2: Cast ray onto the ground ---");
    let recovered = camera.space_from_image(&image, SpaceConstraint::Z(0.0));
    println!("Recovered:   [{:.2}, {:.2}, {:.2}] m", recovered.x, recovered.y, recovered.z);
    println!("Error: {:.2e} m\n", (recovered - point).norm());

    // Example 3: a point 10 m along the centre ray
    println!("--- Example 3: Distance along a ray ---");
    let center = Vector2::new(2304.0, 1728.0);
    let ahead = camera.space_from_image(&center, SpaceConstraint::Distance(10.0));
    println!("10 m along the optical axis: [{:.2}, {:.2}, {:.2}] m\n", ahead.x, ahead.y, ahead.z);

    // Example 4: batch of pixels
    println!("--- Example 4: Batch of pixels ---");
    let pixels = Matrix2xX::from_columns(&[
        Vector2::new(0.0, 3456.0),
        Vector2::new(2304.0, 3456.0),
        Vector2::new(4608.0, 3456.0),
        Vector2::new(2304.0, 0.0),
    ]);
    let ground = camera.spaces_from_image(&pixels, SpaceConstraint::default());
    for (pixel, point) in pixels.column_iter().zip(ground.column_iter()) {
        println!(
            "  [{:6.0}, {:6.0}] px → [{:8.2}, {:8.2}] m",
            pixel[0], pixel[1], point[0], point[1]
        );
    }

    // Example 5: visible ground area
    println!("\n--- Example 5: Image border on the ground ---");
    let border = camera.get_image_border(500);
    let visible = border.column_iter().filter(|p| p[0].is_finite()).count();
    println!("{visible} of {} border samples reach the ground", border.ncols());

    println!("\n✓ Done");
    Ok(())
}
