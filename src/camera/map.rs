//! Ground-plane rectification grid.
//!
//! A [`RectificationMap`] samples the ground plane `z = 0` on a regular grid
//! and stores, for every grid cell, the source-image pixel that sees it. Row 0
//! is the northernmost grid line so the resampled image is north up.

use nalgebra::{DMatrix, Matrix3xX};

use crate::error::CameraError;

/// Axis-aligned rectangle on the ground plane, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Extent {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Bounding box of the columns whose x and y are both finite.
    pub fn bounding_box(points: &Matrix3xX<f64>) -> Option<Self> {
        points
            .column_iter()
            .filter(|p| p[0].is_finite() && p[1].is_finite())
            .fold(None, |extent: Option<Extent>, p| {
                Some(match extent {
                    None => Extent::new(p[0], p[0], p[1], p[1]),
                    Some(e) => Extent::new(
                        e.x_min.min(p[0]),
                        e.x_max.max(p[0]),
                        e.y_min.min(p[1]),
                        e.y_max.max(p[1]),
                    ),
                })
            })
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Fails unless every bound is finite and both ranges are non-empty.
    pub fn validate(&self) -> Result<(), CameraError> {
        let finite = [self.x_min, self.x_max, self.y_min, self.y_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(CameraError::InvalidExtent(format!(
                "degenerate extent x [{}, {}] y [{}, {}]",
                self.x_min, self.x_max, self.y_min, self.y_max
            )));
        }
        Ok(())
    }
}

/// Lookup tables from ground grid cells to source-image coordinates.
///
/// Both tables have one row per grid line in y (descending) and one column per
/// grid line in x (ascending). Cells whose ground point is not visible hold NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct RectificationMap {
    /// Source-image x coordinate per cell.
    pub map_x: DMatrix<f32>,
    /// Source-image y coordinate per cell.
    pub map_y: DMatrix<f32>,
    /// Ground area covered by the grid.
    pub extent: Extent,
    /// Grid spacing in metres.
    pub scaling: f64,
}

impl RectificationMap {
    /// Number of grid columns.
    pub fn width(&self) -> usize {
        self.map_x.ncols()
    }

    /// Number of grid rows.
    pub fn height(&self) -> usize {
        self.map_x.nrows()
    }

    /// Source pixel for a grid cell, `None` if the cell is not visible.
    pub fn lookup(&self, row: usize, col: usize) -> Option<(f32, f32)> {
        let x = *self.map_x.get((row, col))?;
        let y = *self.map_y.get((row, col))?;
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }
}

/// `start, start + step, …` strictly before `stop`, computed without drift.
pub(crate) fn arange(start: f64, stop: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = ((stop - start) / step).ceil();
    let count = if count.is_finite() && count > 0.0 {
        count as usize
    } else {
        0
    };
    (0..count).map(move |k| start + k as f64 * step)
}
