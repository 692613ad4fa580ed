//! Raster time-series archive assembly with Zarr V3 output.
//!
//! This crate turns an ordered sequence of single-band, single-timestep
//! rasters into one chunked, compressed Zarr hierarchy with `lon`, `lat` and
//! unlimited `time` coordinates, following CF conventions:
//!
//! - **Coordinates**: derived once from the first grid's affine transform
//! - **Time**: parsed from identifiers, strictly increasing day offsets
//! - **Quantization**: float samples stored as scaled `int16` codes with a
//!   fill sentinel for missing data
//!
//! # Architecture
//!
//! ```text
//! sorted identifiers
//!      │
//!      ▼
//! ArchivePipeline::run
//!      │
//!      ├─► TemporalSequencer (date token → day offset)
//!      │
//!      ├─► RasterSource::read (GeoTIFF)
//!      │
//!      ├─► resolve_axes + ArchiveSchema::build (first raster only)
//!      │
//!      ├─► QuantizationParams::encode
//!      │
//!      └─► ArchiveWriter::append_slice
//!               │
//!               ▼
//!          Zarr V3 store
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_archive::{filesystem_store, run, ArchiveConfig, GeoTiffReader};
//!
//! let store = filesystem_store(Path::new("spi1.zarr"))?;
//! let summary = run(&files, &GeoTiffReader::new(), store, &ArchiveConfig::default())?;
//! println!("{} slices written", summary.slices);
//! ```

pub mod config;
pub mod error;
pub mod geotransform;
pub mod pipeline;
pub mod quantize;
pub mod raster;
pub mod schema;
pub mod time;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use config::{ArchiveCompression, ArchiveConfig, ChunkConfig, VariableConfig};
pub use error::{ArchiveError, Result};
pub use geotransform::{resolve_axes, CoordinateAxis, GeoTransform, GridAxes};
pub use pipeline::{run, ArchivePipeline, PipelineFailure, PipelineStage, PipelineState};
pub use quantize::{QuantizationParams, QuantizedGrid};
pub use raster::{GeoTiffReader, RasterSource};
pub use schema::ArchiveSchema;
pub use time::{DatePattern, TemporalSequencer, TimeStep};
pub use types::{GridShape, RasterGrid};
pub use writer::{filesystem_store, ArchiveSummary, ArchiveWriter};
