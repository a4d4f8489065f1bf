//! Error metrics and reprojection error computation.
//!
//! This module provides functionality for measuring how well a camera maps
//! known world points onto their observed pixels, including statistical
//! measures like RMSE, mean, and median errors.

use nalgebra::{Matrix2xX, Matrix3xX};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::camera::Camera;

use super::UtilError;

/// Projection error statistics for camera evaluation.
///
/// Contains various statistical measures of reprojection errors in pixels,
/// useful for assessing a calibration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProjectionError {
    /// Root Mean Square Error of reprojection
    pub rmse: f64,
    /// Minimum reprojection error
    pub min: f64,
    /// Maximum reprojection error
    pub max: f64,
    /// Mean reprojection error
    pub mean: f64,
    /// Standard deviation of reprojection errors
    pub stddev: f64,
    /// Median reprojection error
    pub median: f64,
    /// Number of points the camera could see
    pub count: usize,
}

impl fmt::Debug for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Projection Error [ rmse: {}, min: {}, max: {}, mean: {}, stddev: {}, median: {}, points: {} ]",
            self.rmse, self.min, self.max, self.mean, self.stddev, self.median, self.count
        )
    }
}

/// Compute reprojection error statistics for a camera.
///
/// Every world point is projected through the camera and compared with its
/// observed pixel. Points the camera cannot see are skipped.
///
/// # Arguments
///
/// * `camera` - The camera to evaluate
/// * `points3d` - World points (3×N)
/// * `points2d` - Observed pixels of the same points (2×N)
///
/// # Errors
///
/// * `UtilError::InvalidParams` - If the point matrices differ in width
/// * `UtilError::ZeroProjectionPoints` - If no point is visible
pub fn compute_reprojection_error(
    camera: &Camera,
    points3d: &Matrix3xX<f64>,
    points2d: &Matrix2xX<f64>,
) -> Result<ProjectionError, UtilError> {
    if points3d.ncols() != points2d.ncols() {
        return Err(UtilError::InvalidParams(format!(
            "{} world points but {} image points",
            points3d.ncols(),
            points2d.ncols()
        )));
    }

    let projected = camera.images_from_space(points3d);
    let errors: Vec<f64> = projected
        .column_iter()
        .zip(points2d.column_iter())
        .map(|(p, o)| (p - o).norm())
        .filter(|e| e.is_finite())
        .collect();

    if errors.is_empty() {
        return Err(UtilError::ZeroProjectionPoints);
    }

    // Calculate statistics
    let n = errors.len() as f64;
    let mean = errors.iter().sum::<f64>() / n;

    let variance: f64 = errors.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let rmse = (errors.iter().map(|x| x.powi(2)).sum::<f64>() / n).sqrt();

    let min = errors.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = errors.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

    let mut sorted_errors = errors.clone();
    sorted_errors.sort_by(f64::total_cmp);
    let median = if sorted_errors.len() % 2 == 0 {
        let mid = sorted_errors.len() / 2;
        (sorted_errors[mid - 1] + sorted_errors[mid]) / 2.0
    } else {
        sorted_errors[sorted_errors.len() / 2]
    };

    Ok(ProjectionError {
        rmse,
        min,
        max,
        mean,
        stddev,
        median,
        count: errors.len(),
    })
}

/// Sum of squared pixel errors, usable directly as a fit cost.
///
/// Points that do not project are charged `penalty` each so the optimizer is
/// pushed back towards configurations where they are visible.
pub fn reprojection_cost(camera: &Camera, points3d: &Matrix3xX<f64>, points2d: &Matrix2xX<f64>, penalty: f64) -> f64 {
    camera
        .images_from_space(points3d)
        .column_iter()
        .zip(points2d.column_iter())
        .map(|(p, o)| {
            let error = (p - o).norm_squared();
            if error.is_finite() {
                error
            } else {
                penalty
            }
        })
        .sum()
}
