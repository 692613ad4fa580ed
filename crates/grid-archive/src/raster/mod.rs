//! Raster sources feeding the archive.
//!
//! The pipeline only needs one grid per identifier together with its
//! georeferencing, so the reader is a single-method trait. The GeoTIFF
//! implementation covers single-band north-up files.

mod geotiff;

use std::path::Path;

use crate::error::Result;
use crate::types::RasterGrid;

pub use geotiff::GeoTiffReader;

/// Reads a single-band raster grid with its geotransform and nodata marker.
pub trait RasterSource {
    /// Read the grid stored at `path`.
    ///
    /// Failures are reported as [`crate::ArchiveError::RasterRead`].
    fn read(&self, path: &Path) -> Result<RasterGrid>;
}

impl<T: RasterSource + ?Sized> RasterSource for &T {
    fn read(&self, path: &Path) -> Result<RasterGrid> {
        (**self).read(path)
    }
}
