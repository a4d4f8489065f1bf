//! Top View Tool
//!
//! Projects a camera image onto the ground plane using a saved camera parameter file.
//!
//! Usage:
//!   cargo run --bin top_view -- -i image.jpg -c camera.json -o top_view.png --extent -20 20 0 60 --scaling 0.05

use std::path::PathBuf;

use camera_transform::util::{load_image, save_image};
use camera_transform::{Camera, Extent, Intrinsics, Parametrized, Projection, ProjectionKind, SpatialOrientation};
use clap::Parser;

#[derive(Parser)]
#[command(author, version, about = "Project a camera image onto the ground plane")]
struct Cli {
    /// Input image path
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Camera parameter file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(short = 'c', long)]
    camera: PathBuf,

    /// Output image path; PNG keeps the transparent area
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Projection model (rectilinear, cylindrical, equirectangular)
    #[arg(short = 'p', long, default_value = "rectilinear")]
    projection: String,

    /// Ground area in metres: x_min x_max y_min y_max
    #[arg(
        long,
        num_args = 4,
        value_names = ["X_MIN", "X_MAX", "Y_MIN", "Y_MAX"],
        allow_negative_numbers = true
    )]
    extent: Option<Vec<f64>>,

    /// Metres per output pixel
    #[arg(short = 's', long)]
    scaling: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    println!("🗺️  Top View Tool");
    println!("=================");
    println!("Input: {:?}", cli.input);
    println!("Camera: {:?}", cli.camera);
    println!("Output: {:?}", cli.output);
    println!();

    let kind: ProjectionKind = cli.projection.parse()?;
    let mut camera = Camera::new(
        Projection::new(kind, Intrinsics::default()),
        SpatialOrientation::default(),
    );
    camera.load(&cli.camera)?;
    println!("✓ Loaded camera");
    print!("{camera}");
    println!();

    let image = load_image(&cli.input)?;
    println!("✓ Loaded input image: {}x{}", image.width(), image.height());

    let extent = cli
        .extent
        .as_deref()
        .map(|e| Extent::new(e[0], e[1], e[2], e[3]));

    println!("⏳ Building top view...");
    let top_view = camera.get_top_view_of_image(&image, extent, cli.scaling)?;
    let map = camera.get_map(extent, cli.scaling)?;
    println!(
        "✓ Ground area x [{:.2}, {:.2}] y [{:.2}, {:.2}] m at {:.4} m/px",
        map.extent.x_min, map.extent.x_max, map.extent.y_min, map.extent.y_max, map.scaling
    );

    save_image(&top_view, &cli.output)?;
    println!("✓ Saved {}x{} top view to: {:?}", top_view.width(), top_view.height(), cli.output);
    println!();
    println!("✅ Done!");

    Ok(())
}
