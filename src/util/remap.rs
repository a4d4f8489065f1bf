//! Resampling of images through a rectification map.

use image::{Rgba, RgbaImage};

use crate::camera::RectificationMap;

/// Colour written where the map has no source pixel.
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterpolationMethod {
    #[default]
    Nearest,
    Bilinear,
}

/// Nearest-neighbour resampling of `image` onto the grid of `map`.
///
/// The output has one pixel per map cell. Cells without a visible source
/// pixel, or whose source lies outside `image`, are fully transparent.
pub fn remap_image(image: &RgbaImage, map: &RectificationMap) -> RgbaImage {
    remap_image_with(image, map, InterpolationMethod::Nearest)
}

/// [`remap_image`] with a choice of interpolation.
pub fn remap_image_with(image: &RgbaImage, map: &RectificationMap, interpolation: InterpolationMethod) -> RgbaImage {
    let mut output = RgbaImage::from_pixel(map.width() as u32, map.height() as u32, TRANSPARENT);
    for row in 0..map.height() {
        for col in 0..map.width() {
            let Some((x, y)) = map.lookup(row, col) else {
                continue;
            };
            if let Some(color) = interpolate_pixel(image, f64::from(x), f64::from(y), interpolation) {
                output.put_pixel(col as u32, row as u32, color);
            }
        }
    }
    output
}

fn interpolate_pixel(image: &RgbaImage, x: f64, y: f64, method: InterpolationMethod) -> Option<Rgba<u8>> {
    let (width, height) = image.dimensions();

    match method {
        InterpolationMethod::Nearest => {
            let u = x.round();
            let v = y.round();
            if u >= 0.0 && u < f64::from(width) && v >= 0.0 && v < f64::from(height) {
                Some(*image.get_pixel(u as u32, v as u32))
            } else {
                None
            }
        }
        InterpolationMethod::Bilinear => {
            let x0 = x.floor();
            let y0 = y.floor();
            let x1 = x0 + 1.0;
            let y1 = y0 + 1.0;

            if x0 < 0.0 || x1 >= f64::from(width) || y0 < 0.0 || y1 >= f64::from(height) {
                return None;
            }

            let p00 = image.get_pixel(x0 as u32, y0 as u32);
            let p10 = image.get_pixel(x1 as u32, y0 as u32);
            let p01 = image.get_pixel(x0 as u32, y1 as u32);
            let p11 = image.get_pixel(x1 as u32, y1 as u32);

            let wx = x - x0;
            let wy = y - y0;

            let mut result = Rgba([0u8; 4]);
            for c in 0..4 {
                let val = f64::from(p00[c]) * (1.0 - wx) * (1.0 - wy)
                    + f64::from(p10[c]) * wx * (1.0 - wy)
                    + f64::from(p01[c]) * (1.0 - wx) * wy
                    + f64::from(p11[c]) * wx * wy;
                result[c] = val.round().clamp(0.0, 255.0) as u8;
            }
            Some(result)
        }
    }
}
