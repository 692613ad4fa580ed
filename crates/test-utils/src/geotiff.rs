//! GeoTIFF fixture writer.
//!
//! Writes single-band `f32` GeoTIFFs with the georeferencing tags the
//! archive reader understands, so tests can build input directories on the
//! fly instead of shipping binary test data.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::fixtures::grid::GridSpec;

// GeoTIFF Tag IDs
const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
const GEOTIFF_MODELTIEPOINT: u16 = 33922;
const GEOTIFF_MODELTRANSFORMATION: u16 = 34264;
const GDAL_NODATA: u16 = 42113;

/// How the fixture is georeferenced.
#[derive(Debug, Clone, Copy)]
pub enum Georeference {
    /// ModelPixelScale + ModelTiepoint anchored at the top-left corner.
    ScaleTiepoint,
    /// Full ModelTransformation matrix with the given rotation terms.
    Transformation { rotation_x: f64, rotation_y: f64 },
}

/// A single-band raster to be written as a GeoTIFF.
#[derive(Debug, Clone)]
pub struct GeoTiffFixture {
    pub spec: GridSpec,
    pub data: Vec<f32>,
    pub nodata: Option<f64>,
    pub georeference: Georeference,
}

impl GeoTiffFixture {
    /// Create a fixture for `spec` georeferenced by scale and tiepoint.
    pub fn new(spec: GridSpec, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            spec.size(),
            "fixture data does not match {}x{} grid",
            spec.width,
            spec.height
        );
        Self {
            spec,
            data,
            nodata: None,
            georeference: Georeference::ScaleTiepoint,
        }
    }

    /// Declare a GDAL nodata marker.
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Georeference with a ModelTransformation matrix instead.
    pub fn with_transformation(mut self, rotation_x: f64, rotation_y: f64) -> Self {
        self.georeference = Georeference::Transformation {
            rotation_x,
            rotation_y,
        };
        self
    }

    /// Write the fixture to `path`.
    pub fn write(&self, path: &Path) -> Result<(), tiff::TiffError> {
        let file = File::create(path)?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
        let mut image =
            encoder.new_image::<Gray32Float>(self.spec.width as u32, self.spec.height as u32)?;

        let spec = &self.spec;
        match self.georeference {
            Georeference::ScaleTiepoint => {
                let pixel_scale = [spec.pixel_width, -spec.pixel_height, 0.0];
                image
                    .encoder()
                    .write_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE), &pixel_scale[..])?;

                let tiepoint = [0.0, 0.0, 0.0, spec.origin_x, spec.origin_y, 0.0];
                image
                    .encoder()
                    .write_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT), &tiepoint[..])?;
            }
            Georeference::Transformation {
                rotation_x,
                rotation_y,
            } => {
                let matrix = [
                    spec.pixel_width,
                    rotation_x,
                    0.0,
                    spec.origin_x,
                    rotation_y,
                    spec.pixel_height,
                    0.0,
                    spec.origin_y,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    1.0,
                ];
                image
                    .encoder()
                    .write_tag(Tag::Unknown(GEOTIFF_MODELTRANSFORMATION), &matrix[..])?;
            }
        }

        if let Some(nodata) = self.nodata {
            let text = nodata.to_string();
            image
                .encoder()
                .write_tag(Tag::Unknown(GDAL_NODATA), text.as_str())?;
        }

        image.write_data(&self.data)?;
        Ok(())
    }
}

/// Write one GeoTIFF per `(year, month)` into `dir`, named by `name`.
///
/// `values` receives the index of the month in `months` and returns the
/// samples for that file. Returns the written paths in input order.
pub fn write_monthly_series<N, V>(
    dir: &Path,
    spec: GridSpec,
    months: &[(i32, u32)],
    nodata: Option<f64>,
    name: N,
    values: V,
) -> Result<Vec<PathBuf>, tiff::TiffError>
where
    N: Fn(i32, u32) -> String,
    V: Fn(usize) -> Vec<f32>,
{
    let mut paths = Vec::with_capacity(months.len());
    for (idx, &(year, month)) in months.iter().enumerate() {
        let path = dir.join(name(year, month));
        let mut fixture = GeoTiffFixture::new(spec, values(idx));
        if let Some(nodata) = nodata {
            fixture = fixture.with_nodata(nodata);
        }
        fixture.write(&path)?;
        paths.push(path);
    }
    Ok(paths)
}
