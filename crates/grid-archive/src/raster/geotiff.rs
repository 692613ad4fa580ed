//! GeoTIFF reader.
//!
//! Georeferencing comes from either the ModelPixelScale and ModelTiepoint
//! pair or a full ModelTransformation matrix. The nodata marker is the GDAL
//! ASCII tag.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

use super::RasterSource;
use crate::error::{ArchiveError, Result};
use crate::geotransform::GeoTransform;
use crate::types::RasterGrid;

// GeoTIFF and GDAL tag IDs
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GDAL_NODATA: u16 = 42113;

/// Reads the first band of a GeoTIFF file.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffReader;

impl GeoTiffReader {
    pub fn new() -> Self {
        Self
    }
}

impl RasterSource for GeoTiffReader {
    fn read(&self, path: &Path) -> Result<RasterGrid> {
        let name = path.display().to_string();
        let fail = |reason: String| ArchiveError::raster_read(name.clone(), reason);

        let file = File::open(path).map_err(|e| fail(e.to_string()))?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| fail(e.to_string()))?;

        let (width, height) = decoder.dimensions().map_err(|e| fail(e.to_string()))?;
        match decoder.colortype().map_err(|e| fail(e.to_string()))? {
            ColorType::Gray(_) => {}
            other => return Err(fail(format!("expected a single band, found {:?}", other))),
        }

        let transform = read_transform(&mut decoder).map_err(fail)?;
        let nodata = read_nodata(&mut decoder).map_err(fail)?;

        let image = decoder.read_image().map_err(|e| fail(e.to_string()))?;
        let data = to_f32(image).map_err(fail)?;

        let (width, height) = (width as usize, height as usize);
        if data.len() != width * height {
            return Err(fail(format!(
                "decoded {} samples for a {}x{} image",
                data.len(),
                width,
                height
            )));
        }

        debug!(
            path = %name,
            width,
            height,
            nodata = ?nodata,
            "Read GeoTIFF"
        );

        Ok(RasterGrid::new(data, width, height, nodata, transform))
    }
}

fn find_f64s(
    decoder: &mut Decoder<BufReader<File>>,
    tag: u16,
) -> std::result::Result<Option<Vec<f64>>, String> {
    let value = decoder
        .find_tag(Tag::from_u16_exhaustive(tag))
        .map_err(|e| e.to_string())?;
    match value {
        Some(value) => value
            .into_f64_vec()
            .map(Some)
            .map_err(|e| format!("tag {}: {}", tag, e)),
        None => Ok(None),
    }
}

fn read_transform(
    decoder: &mut Decoder<BufReader<File>>,
) -> std::result::Result<GeoTransform, String> {
    if let Some(m) = find_f64s(decoder, MODEL_TRANSFORMATION)? {
        if m.len() < 16 {
            return Err(format!("ModelTransformation has {} values, expected 16", m.len()));
        }
        return Ok(GeoTransform::from_coefficients([
            m[3], m[0], m[1], m[7], m[4], m[5],
        ]));
    }

    let scale = find_f64s(decoder, MODEL_PIXEL_SCALE)?
        .ok_or_else(|| "missing ModelPixelScale and ModelTransformation tags".to_string())?;
    let tiepoint = find_f64s(decoder, MODEL_TIEPOINT)?
        .ok_or_else(|| "missing ModelTiepoint tag".to_string())?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(format!(
            "malformed georeferencing: {} scale values, {} tiepoint values",
            scale.len(),
            tiepoint.len()
        ));
    }

    let (sx, sy) = (scale[0], scale[1]);
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);

    Ok(GeoTransform::north_up(x - i * sx, sx, y + j * sy, -sy))
}

fn read_nodata(decoder: &mut Decoder<BufReader<File>>) -> std::result::Result<Option<f64>, String> {
    let value = decoder
        .find_tag(Tag::from_u16_exhaustive(GDAL_NODATA))
        .map_err(|e| e.to_string())?;
    let Some(value) = value else {
        return Ok(None);
    };

    let text = value.into_string().map_err(|e| e.to_string())?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() {
        return Ok(None);
    }

    text.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("nodata value '{}' is not a number", text))
}

fn to_f32(image: DecodingResult) -> std::result::Result<Vec<f32>, String> {
    let data = match image {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => return Err("unsupported sample format".to_string()),
    };
    Ok(data)
}
