//! Coordinate axes from affine georeferencing transforms.
//!
//! Only north-up geographic grids are supported: both rotation terms must be
//! zero, longitude must increase eastwards, and latitude may run in either
//! direction (it decreases for the usual top-left origin).

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// Six-coefficient affine transform from cell indices to lon/lat.
///
/// Coefficient order follows the usual geotransform layout:
/// `(origin_x, pixel_width, rotation_x, origin_y, rotation_y, pixel_height)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub origin_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build from the six coefficients in geotransform order.
    pub fn from_coefficients(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            rotation_x: c[2],
            origin_y: c[3],
            rotation_y: c[4],
            pixel_height: c[5],
        }
    }

    /// Build a non-rotated transform.
    pub fn north_up(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self::from_coefficients([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    /// The six coefficients in geotransform order.
    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.rotation_x,
            self.origin_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Whether either shear term is non-zero.
    pub fn is_rotated(&self) -> bool {
        self.rotation_x != 0.0 || self.rotation_y != 0.0
    }
}

/// An ordered, strictly monotonic sequence of cell coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateAxis {
    values: Vec<f64>,
}

impl CoordinateAxis {
    /// Regularly spaced axis: `origin + i * step` for `i in 0..len`.
    fn regular(origin: f64, step: f64, len: usize) -> Self {
        let values = (0..len).map(|i| origin + i as f64 * step).collect();
        Self { values }
    }

    /// Coordinate values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of coordinates.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the axis has no coordinates.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check that every coordinate is greater than the one before it.
    pub fn is_increasing(&self) -> bool {
        self.values.windows(2).all(|w| w[1] > w[0])
    }

    /// Check that every coordinate is smaller than the one before it.
    pub fn is_decreasing(&self) -> bool {
        self.values.windows(2).all(|w| w[1] < w[0])
    }
}

/// Longitude and latitude axes of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxes {
    pub lon: CoordinateAxis,
    pub lat: CoordinateAxis,
}

/// Resolve the lon/lat axes of an `nlon` x `nlat` grid.
///
/// `lon[i] = origin_x + i * pixel_width`, `lat[j] = origin_y + j * pixel_height`.
pub fn resolve_axes(transform: &GeoTransform, nlon: usize, nlat: usize) -> Result<GridAxes> {
    if transform.is_rotated() {
        return Err(ArchiveError::unsupported_transform(format!(
            "rotation terms must be zero, got ({}, {})",
            transform.rotation_x, transform.rotation_y
        )));
    }

    if !transform.origin_x.is_finite() || !transform.origin_y.is_finite() {
        return Err(ArchiveError::unsupported_transform(
            "origin is not finite",
        ));
    }

    // Longitude must increase eastwards
    if !(transform.pixel_width.is_finite() && transform.pixel_width > 0.0) {
        return Err(ArchiveError::unsupported_transform(format!(
            "pixel width must be positive, got {}",
            transform.pixel_width
        )));
    }

    if !(transform.pixel_height.is_finite() && transform.pixel_height != 0.0) {
        return Err(ArchiveError::unsupported_transform(format!(
            "pixel height must be non-zero, got {}",
            transform.pixel_height
        )));
    }

    Ok(GridAxes {
        lon: CoordinateAxis::regular(transform.origin_x, transform.pixel_width, nlon),
        lat: CoordinateAxis::regular(transform.origin_y, transform.pixel_height, nlat),
    })
}
