//! Zarr V3 writer for appending quantized time slices.
//!
//! Coordinates are written once at creation. Every append grows the `time`
//! and data arrays by one slice, writes the slice, then re-stores the array
//! metadata so the store on disk always describes only complete slices.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::codec::bytes_to_bytes::gzip::GzipCodec;
use zarrs::array::codec::BytesToBytesCodecTraits;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};

use crate::config::ArchiveCompression;
use crate::error::{ArchiveError, Result};
use crate::geotransform::CoordinateAxis;
use crate::quantize::QuantizedGrid;
use crate::schema::{ArchiveSchema, StorageType, VariableSchema};
use crate::types::GridShape;

/// Outcome of a finalized archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    /// Name of the data variable.
    pub variable: String,
    /// Grid shape of every slice.
    pub shape: GridShape,
    /// Number of appended slices.
    pub slices: u64,
    /// Index of the last appended slice.
    pub last_time_index: Option<u64>,
    /// Day offset of the first slice.
    pub first_day_offset: Option<f64>,
    /// Day offset of the last slice.
    pub last_day_offset: Option<f64>,
    /// Uncompressed bytes of data written.
    pub bytes_written: u64,
}

/// Writer owning an archive for the duration of a run.
pub struct ArchiveWriter<S: ReadableStorageTraits + WritableStorageTraits + 'static> {
    schema: ArchiveSchema,
    time: Array<S>,
    data: Array<S>,
    itime: u64,
    first_day_offset: Option<f64>,
    last_day_offset: Option<f64>,
    bytes_written: u64,
}

impl<S: ReadableStorageTraits + WritableStorageTraits + 'static> ArchiveWriter<S> {
    /// Create the archive and write the coordinate axes.
    ///
    /// # Arguments
    /// * `storage` - The storage backend (must be readable AND writable)
    /// * `schema` - Layout of the archive
    /// * `lon` - Longitude axis, one value per column
    /// * `lat` - Latitude axis, one value per row
    pub fn create(
        storage: Arc<S>,
        schema: ArchiveSchema,
        lon: &CoordinateAxis,
        lat: &CoordinateAxis,
    ) -> Result<Self> {
        let shape = schema.shape();
        if lon.len() != shape.nlon || lat.len() != shape.nlat {
            return Err(ArchiveError::ShapeMismatch {
                expected: shape,
                actual: GridShape::new(lat.len(), lon.len()),
            });
        }

        let group = GroupBuilder::new()
            .attributes(schema.global_attributes().clone())
            .build(storage.clone(), "/")
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;
        group
            .store_metadata()
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;

        let lon_array = build_array(&schema, &schema.lon(), storage.clone())?;
        let lat_array = build_array(&schema, &schema.lat(), storage.clone())?;
        let time = build_array(&schema, &schema.time(), storage.clone())?;
        let crs = build_array(&schema, &schema.crs(), storage.clone())?;
        let data = build_array(&schema, &schema.data(), storage)?;

        for array in [&lon_array, &lat_array, &time, &crs, &data] {
            array
                .store_metadata()
                .map_err(|e| ArchiveError::store_write(e.to_string()))?;
        }

        store_axis(&lon_array, lon)?;
        store_axis(&lat_array, lat)?;

        debug!(
            variable = %schema.variable_name(),
            nlat = shape.nlat,
            nlon = shape.nlon,
            chunks = ?schema.chunks(),
            compression = %schema.compression(),
            "Created archive"
        );

        Ok(Self {
            schema,
            time,
            data,
            itime: 0,
            first_day_offset: None,
            last_day_offset: None,
            bytes_written: 0,
        })
    }

    /// The archive schema.
    pub fn schema(&self) -> &ArchiveSchema {
        &self.schema
    }

    /// Index the next appended slice will receive.
    pub fn time_index(&self) -> u64 {
        self.itime
    }

    /// Append a slice at the next time index and return that index.
    ///
    /// On failure nothing is appended and the time index does not advance.
    pub fn append_slice(&mut self, day_offset: f64, grid: &QuantizedGrid) -> Result<u64> {
        let shape = self.schema.shape();
        if grid.shape() != shape {
            return Err(ArchiveError::ShapeMismatch {
                expected: shape,
                actual: grid.shape(),
            });
        }

        let itime = self.itime;
        self.resize(itime + 1);

        if let Err(e) = self.write_slice(itime, day_offset, grid) {
            warn!(itime, error = %e, "Slice write failed, rolling back time dimension");
            self.resize(itime);
            // The write error takes precedence over metadata errors
            let _ = self.time.store_metadata();
            let _ = self.data.store_metadata();
            return Err(e);
        }

        self.itime = itime + 1;
        self.first_day_offset.get_or_insert(day_offset);
        self.last_day_offset = Some(day_offset);
        self.bytes_written += (grid.data().len() * std::mem::size_of::<i16>()) as u64;

        Ok(itime)
    }

    /// Flush the final metadata and release the archive.
    pub fn finalize(self) -> Result<ArchiveSummary> {
        self.time
            .store_metadata()
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;
        self.data
            .store_metadata()
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;

        let summary = ArchiveSummary {
            variable: self.schema.variable_name().to_string(),
            shape: self.schema.shape(),
            slices: self.itime,
            last_time_index: self.itime.checked_sub(1),
            first_day_offset: self.first_day_offset,
            last_day_offset: self.last_day_offset,
            bytes_written: self.bytes_written,
        };

        info!(
            variable = %summary.variable,
            slices = summary.slices,
            bytes_written = summary.bytes_written,
            "Finalized archive"
        );

        Ok(summary)
    }

    fn resize(&mut self, time_len: u64) {
        let shape = self.schema.shape();
        self.time.set_shape(vec![time_len]);
        self.data
            .set_shape(vec![time_len, shape.nlat as u64, shape.nlon as u64]);
    }

    fn write_slice(&self, itime: u64, day_offset: f64, grid: &QuantizedGrid) -> Result<()> {
        let shape = grid.shape();

        let subset = ArraySubset::new_with_start_shape(
            vec![itime, 0, 0],
            vec![1, shape.nlat as u64, shape.nlon as u64],
        )
        .map_err(|e| ArchiveError::store_write(e.to_string()))?;
        self.data
            .store_array_subset_elements::<i16>(&subset, grid.data())
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;

        let subset = ArraySubset::new_with_start_shape(vec![itime], vec![1])
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;
        self.time
            .store_array_subset_elements::<f64>(&subset, &[day_offset])
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;

        // Shape is only published once the slice is complete
        self.time
            .store_metadata()
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;
        self.data
            .store_metadata()
            .map_err(|e| ArchiveError::store_write(e.to_string()))?;

        Ok(())
    }
}

/// Write a full coordinate axis into a 1-D array.
fn store_axis<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
    array: &Array<S>,
    axis: &CoordinateAxis,
) -> Result<()> {
    let subset = ArraySubset::new_with_start_shape(vec![0], vec![axis.len() as u64])
        .map_err(|e| ArchiveError::store_write(e.to_string()))?;
    array
        .store_array_subset_elements::<f64>(&subset, axis.values())
        .map_err(|e| ArchiveError::store_write(e.to_string()))
}

/// Build a Zarr array for a schema variable with zero time steps.
fn build_array<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
    schema: &ArchiveSchema,
    variable: &VariableSchema,
    storage: Arc<S>,
) -> Result<Array<S>> {
    let (data_type, fill_value) = match variable.storage_type {
        StorageType::Float64 => (DataType::Float64, FillValue::from(variable.fill_value)),
        StorageType::Int32 => (DataType::Int32, FillValue::from(variable.fill_value as i32)),
        StorageType::Int16 => (DataType::Int16, FillValue::from(variable.fill_value as i16)),
    };

    let chunk_grid: zarrs::array::ChunkGrid = variable
        .chunk_shape
        .clone()
        .try_into()
        .map_err(|e| ArchiveError::config(format!("{:?}", e)))?;

    let mut binding = ArrayBuilder::new(
        schema.variable_shape(variable, 0),
        data_type,
        chunk_grid,
        fill_value,
    );
    let mut builder = binding.attributes(variable.attributes.clone());

    if !variable.dimensions.is_empty() {
        builder = builder.dimension_names(Some(variable.dimensions.clone()));
    }

    if variable.compressed {
        let codec = create_compression_codec(schema, variable.storage_type.size())?;
        builder = builder.bytes_to_bytes_codecs(vec![codec]);
    }

    builder
        .build(storage, &format!("/{}", variable.name))
        .map_err(|e| ArchiveError::store_write(e.to_string()))
}

/// Create the compression codec based on the schema.
fn create_compression_codec(
    schema: &ArchiveSchema,
    typesize: usize,
) -> Result<Arc<dyn BytesToBytesCodecTraits>> {
    let compressor = match schema.compression() {
        ArchiveCompression::None => {
            return Err(ArchiveError::config("No compression configured"));
        }
        ArchiveCompression::Gzip => {
            let codec = GzipCodec::new(schema.compression_level() as u32)
                .map_err(|e| ArchiveError::config(e.to_string()))?;
            return Ok(Arc::new(codec));
        }
        ArchiveCompression::BloscLz4 => BloscCompressor::LZ4,
        ArchiveCompression::BloscZstd => BloscCompressor::Zstd,
    };

    let level = BloscCompressionLevel::try_from(schema.compression_level())
        .map_err(|_| ArchiveError::config("Invalid compression level"))?;

    let shuffle = if schema.shuffle() {
        BloscShuffleMode::Shuffle
    } else {
        BloscShuffleMode::NoShuffle
    };

    // typesize is required when shuffle is enabled
    let typesize = if schema.shuffle() { Some(typesize) } else { None };

    let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
        .map_err(|e| ArchiveError::config(e.to_string()))?;

    Ok(Arc::new(codec))
}
