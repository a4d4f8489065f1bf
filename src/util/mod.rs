//! Helpers around cameras: image resampling, reprojection metrics and image I/O.

use std::fs;
use std::path::Path;

use image::{DynamicImage, RgbaImage};
use log::debug;

mod error_metrics;
mod remap;

pub use error_metrics::{compute_reprojection_error, reprojection_cost, ProjectionError};
pub use remap::{remap_image, remap_image_with, InterpolationMethod};

#[derive(thiserror::Error, Debug)]
pub enum UtilError {
    #[error("Zero projection points")]
    ZeroProjectionPoints,
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Loads an image file in any format the `image` crate can decode.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage, UtilError> {
    let path = path.as_ref();
    let image = image::open(path)?;
    debug!("loaded {}x{} image from {}", image.width(), image.height(), path.display());
    Ok(image)
}

/// Saves an RGBA image, creating the parent directory if needed.
///
/// The format follows the file extension.
pub fn save_image<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<(), UtilError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    image.save(path)?;
    debug!("saved {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}
