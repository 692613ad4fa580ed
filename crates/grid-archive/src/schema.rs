//! Archive layout: dimensions, variables, chunking and CF attributes.
//!
//! The schema is derived once from the first grid and the archive
//! configuration, and cannot be changed afterwards.

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::config::{ArchiveCompression, ArchiveConfig, ChunkConfig, VariableConfig};
use crate::error::{ArchiveError, Result};
use crate::quantize::QuantizationParams;
use crate::types::GridShape;

pub const LON: &str = "lon";
pub const LAT: &str = "lat";
pub const TIME: &str = "time";
pub const CRS: &str = "crs";

/// WGS84 geodetic parameters of the `crs` grid-mapping variable.
pub mod wgs84 {
    pub const GRID_MAPPING_NAME: &str = "latitude_longitude";
    pub const LONGITUDE_OF_PRIME_MERIDIAN: f64 = 0.0;
    pub const SEMI_MAJOR_AXIS: f64 = 6378137.0;
    pub const INVERSE_FLATTENING: f64 = 298.257223563;
    pub const LONG_NAME: &str = "Lon/Lat Coords in WGS84";
}

/// A named dimension; `size` is `None` for the unlimited dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: &'static str,
    pub size: Option<usize>,
}

impl Dimension {
    pub fn is_unlimited(&self) -> bool {
        self.size.is_none()
    }
}

/// Element type of a stored variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Float64,
    Int32,
    Int16,
}

impl StorageType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Float64 => 8,
            Self::Int32 => 4,
            Self::Int16 => 2,
        }
    }
}

/// Declaration of one stored variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSchema {
    pub name: String,
    /// Dimension names, slowest varying first. Empty for scalars.
    pub dimensions: Vec<&'static str>,
    pub storage_type: StorageType,
    /// Fill value, exactly representable in `storage_type`.
    pub fill_value: f64,
    pub chunk_shape: Vec<u64>,
    pub compressed: bool,
    pub attributes: Map<String, Value>,
}

/// Complete, immutable layout of an archive.
#[derive(Debug, Clone)]
pub struct ArchiveSchema {
    shape: GridShape,
    chunks: ChunkConfig,
    compression: ArchiveCompression,
    compression_level: u8,
    shuffle: bool,
    variable: VariableConfig,
    quantization: QuantizationParams,
    time_units: String,
    global_attributes: Map<String, Value>,
}

impl ArchiveSchema {
    /// Derive the schema for grids of `shape` from the configuration.
    pub fn build(config: &ArchiveConfig, shape: GridShape) -> Result<Self> {
        config.validate().map_err(ArchiveError::Config)?;

        if shape.is_empty() {
            return Err(ArchiveError::config(format!(
                "cannot build an archive for empty grid {}",
                shape
            )));
        }

        let mut global_attributes = Map::new();
        global_attributes.insert("Conventions".to_string(), json!(config.conventions));
        if let Some(title) = &config.title {
            global_attributes.insert("title".to_string(), json!(title));
        }
        if let Some(source) = &config.source {
            global_attributes.insert("source".to_string(), json!(source));
        }
        global_attributes.insert(
            "history".to_string(),
            json!(format!("{} created by raster-archiver", Utc::now().to_rfc3339())),
        );

        Ok(Self {
            shape,
            chunks: config.chunks,
            compression: config.compression,
            compression_level: config.compression_level,
            shuffle: config.shuffle,
            variable: config.variable.clone(),
            quantization: config.quantization,
            time_units: config.time_units(),
            global_attributes,
        })
    }

    /// Grid shape shared by every slice.
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Data variable chunk shape.
    pub fn chunks(&self) -> ChunkConfig {
        self.chunks
    }

    pub fn compression(&self) -> ArchiveCompression {
        self.compression
    }

    pub fn compression_level(&self) -> u8 {
        self.compression_level
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn quantization(&self) -> QuantizationParams {
        self.quantization
    }

    /// Name of the data variable.
    pub fn variable_name(&self) -> &str {
        &self.variable.name
    }

    /// Units of the time coordinate.
    pub fn time_units(&self) -> &str {
        &self.time_units
    }

    /// Global attributes of the root group.
    pub fn global_attributes(&self) -> &Map<String, Value> {
        &self.global_attributes
    }

    /// Dimensions in declaration order: `lon`, `lat`, then unlimited `time`.
    pub fn dimensions(&self) -> Vec<Dimension> {
        vec![
            Dimension {
                name: LON,
                size: Some(self.shape.nlon),
            },
            Dimension {
                name: LAT,
                size: Some(self.shape.nlat),
            },
            Dimension {
                name: TIME,
                size: None,
            },
        ]
    }

    /// Size of a dimension; `0` for the unlimited one before any append.
    pub fn dimension_size(&self, name: &str) -> u64 {
        self.dimensions()
            .into_iter()
            .find(|d| d.name == name)
            .and_then(|d| d.size)
            .unwrap_or(0) as u64
    }

    /// Longitude coordinate variable.
    pub fn lon(&self) -> VariableSchema {
        let mut attributes = Map::new();
        attributes.insert("units".to_string(), json!("degrees_east"));
        attributes.insert("standard_name".to_string(), json!("longitude"));
        attributes.insert("long_name".to_string(), json!("longitude"));
        attributes.insert("axis".to_string(), json!("X"));

        coordinate(LON, self.shape.nlon as u64, attributes)
    }

    /// Latitude coordinate variable.
    pub fn lat(&self) -> VariableSchema {
        let mut attributes = Map::new();
        attributes.insert("units".to_string(), json!("degrees_north"));
        attributes.insert("standard_name".to_string(), json!("latitude"));
        attributes.insert("long_name".to_string(), json!("latitude"));
        attributes.insert("axis".to_string(), json!("Y"));

        coordinate(LAT, self.shape.nlat as u64, attributes)
    }

    /// Time coordinate variable, chunked like the data variable along time.
    pub fn time(&self) -> VariableSchema {
        let mut attributes = Map::new();
        attributes.insert("units".to_string(), json!(self.time_units));
        attributes.insert("standard_name".to_string(), json!("time"));
        attributes.insert("long_name".to_string(), json!("time"));
        attributes.insert("calendar".to_string(), json!("standard"));
        attributes.insert("axis".to_string(), json!("T"));

        coordinate(TIME, self.chunks.time as u64, attributes)
    }

    /// Scalar grid-mapping variable carrying the WGS84 datum.
    pub fn crs(&self) -> VariableSchema {
        let mut attributes = Map::new();
        attributes.insert("long_name".to_string(), json!(wgs84::LONG_NAME));
        attributes.insert(
            "grid_mapping_name".to_string(),
            json!(wgs84::GRID_MAPPING_NAME),
        );
        attributes.insert(
            "longitude_of_prime_meridian".to_string(),
            json!(wgs84::LONGITUDE_OF_PRIME_MERIDIAN),
        );
        attributes.insert("semi_major_axis".to_string(), json!(wgs84::SEMI_MAJOR_AXIS));
        attributes.insert(
            "inverse_flattening".to_string(),
            json!(wgs84::INVERSE_FLATTENING),
        );

        VariableSchema {
            name: CRS.to_string(),
            dimensions: Vec::new(),
            storage_type: StorageType::Int32,
            fill_value: 0.0,
            chunk_shape: Vec::new(),
            compressed: false,
            attributes,
        }
    }

    /// Quantized data variable over `(time, lat, lon)`.
    pub fn data(&self) -> VariableSchema {
        let q = self.quantization;
        let mut attributes = Map::new();
        attributes.insert("units".to_string(), json!(self.variable.units));
        attributes.insert("long_name".to_string(), json!(self.variable.long_name));
        attributes.insert(
            "standard_name".to_string(),
            json!(self.variable.standard_name),
        );
        attributes.insert("grid_mapping".to_string(), json!(CRS));
        attributes.insert("scale_factor".to_string(), json!(q.scale_factor));
        attributes.insert("add_offset".to_string(), json!(q.add_offset));
        attributes.insert("missing_value".to_string(), json!(q.fill_value));

        VariableSchema {
            name: self.variable.name.clone(),
            dimensions: vec![TIME, LAT, LON],
            storage_type: StorageType::Int16,
            fill_value: q.fill_value as f64,
            chunk_shape: vec![
                self.chunks.time as u64,
                self.chunks.lat as u64,
                self.chunks.lon as u64,
            ],
            compressed: self.compression != ArchiveCompression::None,
            attributes,
        }
    }

    /// All variables in creation order.
    pub fn variables(&self) -> Vec<VariableSchema> {
        vec![self.lon(), self.lat(), self.time(), self.crs(), self.data()]
    }

    /// Shape of a variable holding `time_len` slices.
    pub fn variable_shape(&self, variable: &VariableSchema, time_len: u64) -> Vec<u64> {
        variable
            .dimensions
            .iter()
            .map(|&dim| {
                if dim == TIME {
                    time_len
                } else {
                    self.dimension_size(dim)
                }
            })
            .collect()
    }
}

fn coordinate(name: &'static str, chunk: u64, attributes: Map<String, Value>) -> VariableSchema {
    VariableSchema {
        name: name.to_string(),
        dimensions: vec![name],
        storage_type: StorageType::Float64,
        fill_value: f64::NAN,
        chunk_shape: vec![chunk.max(1)],
        compressed: false,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ArchiveSchema {
        ArchiveSchema::build(&ArchiveConfig::default(), GridShape::new(3, 4)).expect("schema")
    }

    #[test]
    fn test_dimensions() {
        let schema = schema();
        let dims = schema.dimensions();
        assert_eq!(dims.len(), 3);
        assert_eq!(dims[0], Dimension { name: "lon", size: Some(4) });
        assert_eq!(dims[1], Dimension { name: "lat", size: Some(3) });
        assert!(dims[2].is_unlimited());
        assert_eq!(schema.dimension_size("time"), 0);
    }

    #[test]
    fn test_crs_carries_geodetic_attributes() {
        let crs = schema().crs();
        assert_eq!(crs.name, "crs");
        assert!(crs.dimensions.is_empty());
        assert_eq!(crs.storage_type, StorageType::Int32);
        assert_eq!(crs.attributes["grid_mapping_name"], json!("latitude_longitude"));
        assert_eq!(crs.attributes["longitude_of_prime_meridian"], json!(0.0));
        assert_eq!(crs.attributes["semi_major_axis"], json!(6378137.0));
        assert_eq!(crs.attributes["inverse_flattening"], json!(298.257223563));
        assert_eq!(crs.attributes["long_name"], json!("Lon/Lat Coords in WGS84"));
    }

    #[test]
    fn test_data_variable() {
        let schema = schema();
        let data = schema.data();
        assert_eq!(data.name, "pcp");
        assert_eq!(data.dimensions, vec!["time", "lat", "lon"]);
        assert_eq!(data.storage_type, StorageType::Int16);
        assert_eq!(data.fill_value, -9999.0);
        assert_eq!(data.chunk_shape, vec![12, 16, 16]);
        assert!(data.compressed);
        assert_eq!(data.attributes["grid_mapping"], json!("crs"));
        assert_eq!(data.attributes["scale_factor"], json!(0.01));
        assert_eq!(data.attributes["add_offset"], json!(0.0));
        assert_eq!(data.attributes["units"], json!("mm"));
        assert_eq!(data.attributes["standard_name"], json!("precipitation"));
        assert_eq!(schema.variable_shape(&data, 5), vec![5, 3, 4]);
    }

    #[test]
    fn test_coordinate_attributes() {
        let schema = schema();
        assert_eq!(schema.lon().attributes["units"], json!("degrees_east"));
        assert_eq!(schema.lat().attributes["units"], json!("degrees_north"));
        let time = schema.time();
        assert_eq!(
            time.attributes["units"],
            json!("days since 1980-01-01 00:00:00")
        );
        assert_eq!(time.attributes["standard_name"], json!("time"));
        assert_eq!(schema.variable_shape(&time, 0), vec![0]);
        assert_eq!(schema.variable_shape(&schema.lon(), 0), vec![4]);
    }

    #[test]
    fn test_global_attributes() {
        let mut config = ArchiveConfig::default();
        config.title = Some("SPI-1".to_string());
        let schema = ArchiveSchema::build(&config, GridShape::new(2, 2)).expect("schema");
        let attrs = schema.global_attributes();
        assert_eq!(attrs["Conventions"], json!("CF-1.6"));
        assert_eq!(attrs["title"], json!("SPI-1"));
        assert!(attrs.contains_key("history"));
        assert!(!attrs.contains_key("source"));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let err =
            ArchiveSchema::build(&ArchiveConfig::default(), GridShape::new(0, 4)).unwrap_err();
        assert!(matches!(err, ArchiveError::Config(_)));

        let mut config = ArchiveConfig::default();
        config.chunks.time = 0;
        assert!(ArchiveSchema::build(&config, GridShape::new(2, 2)).is_err());
    }
}
