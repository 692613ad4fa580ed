//! Linear quantization of float samples into 16-bit integer codes.
//!
//! A sample `v` is stored as `round((v - add_offset) / scale_factor)` and read
//! back as `code * scale_factor + add_offset`. Missing samples are stored as
//! the fill sentinel, which no valid sample may quantize onto.

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};
use crate::types::{GridShape, RasterGrid};

/// Scale, offset and fill sentinel shared by every slice of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationParams {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub fill_value: i16,
}

impl Default for QuantizationParams {
    fn default() -> Self {
        Self {
            scale_factor: 0.01,
            add_offset: 0.0,
            fill_value: -9999,
        }
    }
}

/// Grid of stored integer codes, only produced by [`QuantizationParams::encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedGrid {
    data: Vec<i16>,
    shape: GridShape,
}

impl QuantizedGrid {
    /// Codes in row-major order.
    pub fn data(&self) -> &[i16] {
        &self.data
    }

    /// Shape of the grid.
    pub fn shape(&self) -> GridShape {
        self.shape
    }
}

impl QuantizationParams {
    /// Create new quantization parameters.
    pub fn new(scale_factor: f64, add_offset: f64, fill_value: i16) -> Self {
        Self {
            scale_factor,
            add_offset,
            fill_value,
        }
    }

    /// Validate the parameters.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.scale_factor.is_finite() || self.scale_factor == 0.0 {
            return Err(format!(
                "scale_factor must be finite and non-zero, got {}",
                self.scale_factor
            ));
        }
        if !self.add_offset.is_finite() {
            return Err(format!("add_offset must be finite, got {}", self.add_offset));
        }
        Ok(())
    }

    /// Quantize a single valid sample.
    ///
    /// On failure returns the offending rounded code and the reason.
    pub fn encode_value(&self, value: f64) -> std::result::Result<i16, (f64, &'static str)> {
        let code = ((value - self.add_offset) / self.scale_factor).round();

        if !code.is_finite() || code < i16::MIN as f64 || code > i16::MAX as f64 {
            return Err((code, "outside int16 range"));
        }

        let code = code as i16;
        if code == self.fill_value {
            return Err((code as f64, "collides with fill value"));
        }

        Ok(code)
    }

    /// Decode a stored code; the fill sentinel decodes to `None`.
    pub fn decode(&self, code: i16) -> Option<f64> {
        if code == self.fill_value {
            None
        } else {
            Some(code as f64 * self.scale_factor + self.add_offset)
        }
    }

    /// Quantize a whole grid, replacing nodata samples with the fill sentinel.
    pub fn encode(&self, grid: &RasterGrid) -> Result<QuantizedGrid> {
        let shape = grid.shape();
        if grid.data.len() != shape.len() {
            return Err(ArchiveError::raster_read(
                "<grid>",
                format!(
                    "grid holds {} samples but declares {}",
                    grid.data.len(),
                    shape
                ),
            ));
        }

        let mut data = Vec::with_capacity(grid.data.len());
        for (idx, &value) in grid.data.iter().enumerate() {
            if grid.is_nodata(value) {
                data.push(self.fill_value);
                continue;
            }

            match self.encode_value(value as f64) {
                Ok(code) => data.push(code),
                Err((code, reason)) => {
                    return Err(ArchiveError::RangeOverflow {
                        value: code,
                        row: idx / grid.width,
                        col: idx % grid.width,
                        reason,
                    })
                }
            }
        }

        Ok(QuantizedGrid { data, shape })
    }
}
