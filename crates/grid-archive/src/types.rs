//! Core types for archive assembly.

use serde::{Deserialize, Serialize};

use crate::geotransform::GeoTransform;

/// Grid dimensions as `(nlat, nlon)`, i.e. rows by columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub nlat: usize,
    pub nlon: usize,
}

impl GridShape {
    /// Create a new grid shape.
    pub fn new(nlat: usize, nlon: usize) -> Self {
        Self { nlat, nlon }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.nlat * self.nlon
    }

    /// Check if the shape has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} lat x {} lon)", self.nlat, self.nlon)
    }
}

/// A single-band raster grid as produced by a raster reader.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    /// Sample values (row-major order, top-to-bottom).
    pub data: Vec<f32>,
    /// Width of the grid in cells (nlon).
    pub width: usize,
    /// Height of the grid in cells (nlat).
    pub height: usize,
    /// Declared nodata marker, if any.
    pub nodata: Option<f64>,
    /// Affine georeferencing transform.
    pub transform: GeoTransform,
}

impl RasterGrid {
    /// Create a new raster grid.
    pub fn new(
        data: Vec<f32>,
        width: usize,
        height: usize,
        nodata: Option<f64>,
        transform: GeoTransform,
    ) -> Self {
        Self {
            data,
            width,
            height,
            nodata,
            transform,
        }
    }

    /// Shape of this grid.
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.height, self.width)
    }

    /// Whether a sample should be stored as missing.
    ///
    /// NaN samples are always missing, whether or not a marker is declared.
    pub fn is_nodata(&self, value: f32) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.nodata {
            Some(marker) => value == marker as f32,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(nodata: Option<f64>) -> RasterGrid {
        let data: Vec<f32> = (0..6).map(|i| i as f32).collect();
        RasterGrid::new(data, 3, 2, nodata, GeoTransform::north_up(0.0, 1.0, 2.0, -1.0))
    }

    #[test]
    fn test_grid_shape() {
        let g = grid(None);
        assert_eq!(g.shape(), GridShape::new(2, 3));
        assert_eq!(g.shape().len(), 6);
        assert_eq!(g.shape().to_string(), "(2 lat x 3 lon)");
    }

    #[test]
    fn test_is_nodata() {
        let g = grid(Some(-9999.0));
        assert!(g.is_nodata(-9999.0));
        assert!(g.is_nodata(f32::NAN));
        assert!(!g.is_nodata(0.0));

        let g = grid(None);
        assert!(!g.is_nodata(-9999.0));
        assert!(g.is_nodata(f32::NAN));
    }
}
