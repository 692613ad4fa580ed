//! Configuration for archive assembly.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::quantize::QuantizationParams;
use crate::time::DatePattern;

/// Names reserved for the coordinate and grid-mapping variables.
pub const RESERVED_NAMES: [&str; 4] = ["lon", "lat", "time", "crs"];

/// Configuration for building an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Data variable name and CF attributes.
    pub variable: VariableConfig,

    /// Scale, offset and fill sentinel of the stored integer codes.
    pub quantization: QuantizationParams,

    /// Chunk shape of the data variable.
    pub chunks: ChunkConfig,

    /// Compression codec for the data variable.
    pub compression: ArchiveCompression,

    /// Compression level (0-9).
    pub compression_level: u8,

    /// Enable byte shuffle (blosc codecs only).
    pub shuffle: bool,

    /// Regular expression with `year` and `month` (optional `day`) groups.
    pub date_pattern: String,

    /// Reference instant of the time axis.
    pub epoch: NaiveDateTime,

    /// Value of the global `Conventions` attribute.
    pub conventions: String,

    /// Optional global `title` attribute.
    pub title: Option<String>,

    /// Optional global `source` attribute.
    pub source: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            variable: VariableConfig::default(),
            quantization: QuantizationParams::default(),
            chunks: ChunkConfig::default(),
            compression: ArchiveCompression::Gzip,
            compression_level: 4,
            shuffle: false,
            date_pattern: DatePattern::DEFAULT.to_string(),
            epoch: default_epoch(),
            conventions: "CF-1.6".to_string(),
            title: None,
            source: None,
        }
    }
}

/// Default epoch: 1980-01-01 00:00:00.
pub fn default_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Parse an epoch given either as `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_epoch(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl ArchiveConfig {
    /// Apply `ARCHIVE_*` environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("ARCHIVE_VARIABLE_NAME") {
            self.variable.name = val;
        }

        if let Ok(val) = std::env::var("ARCHIVE_VARIABLE_UNITS") {
            self.variable.units = val;
        }

        if let Ok(val) = std::env::var("ARCHIVE_CHUNK_TIME") {
            if let Ok(size) = val.parse() {
                self.chunks.time = size;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_CHUNK_LAT") {
            if let Ok(size) = val.parse() {
                self.chunks.lat = size;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_CHUNK_LON") {
            if let Ok(size) = val.parse() {
                self.chunks.lon = size;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_COMPRESSION") {
            self.compression = ArchiveCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("ARCHIVE_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                self.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_SHUFFLE") {
            self.shuffle = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("ARCHIVE_DATE_PATTERN") {
            self.date_pattern = val;
        }

        if let Ok(val) = std::env::var("ARCHIVE_EPOCH") {
            if let Some(epoch) = parse_epoch(&val) {
                self.epoch = epoch;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_SCALE_FACTOR") {
            if let Ok(scale) = val.parse() {
                self.quantization.scale_factor = scale;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_ADD_OFFSET") {
            if let Ok(offset) = val.parse() {
                self.quantization.add_offset = offset;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_FILL_VALUE") {
            if let Ok(fill) = val.parse() {
                self.quantization.fill_value = fill;
            }
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunks.time == 0 || self.chunks.lat == 0 || self.chunks.lon == 0 {
            return Err("chunk sizes must be > 0".to_string());
        }

        if self.compression_level > 9 {
            return Err("compression_level must be 0-9".to_string());
        }

        let name = self.variable.name.as_str();
        if name.is_empty() {
            return Err("variable name must not be empty".to_string());
        }
        if RESERVED_NAMES.contains(&name) {
            return Err(format!("variable name '{}' is reserved", name));
        }

        self.quantization.validate()?;

        DatePattern::new(&self.date_pattern).map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Units attribute of the time coordinate, e.g. `days since 1980-01-01 00:00:00`.
    pub fn time_units(&self) -> String {
        format!("days since {}", self.epoch.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Name and CF attributes of the data variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableConfig {
    pub name: String,
    pub units: String,
    pub long_name: String,
    pub standard_name: String,
}

impl Default for VariableConfig {
    fn default() -> Self {
        Self {
            name: "pcp".to_string(),
            units: "mm".to_string(),
            long_name: "Climate Hazards group InfraRed Precipitation with Stations".to_string(),
            standard_name: "precipitation".to_string(),
        }
    }
}

/// Chunk shape of the data variable along (time, lat, lon).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub time: usize,
    pub lat: usize,
    pub lon: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            time: 12,
            lat: 16,
            lon: 16,
        }
    }
}

/// Compression codec for the data variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveCompression {
    /// No compression.
    None,
    /// Gzip (zlib deflate).
    #[default]
    Gzip,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    BloscZstd,
}

impl ArchiveCompression {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "gzip" | "zlib" => Self::Gzip,
            "blosc_lz4" => Self::BloscLz4,
            "blosc_zstd" => Self::BloscZstd,
            _ => Self::Gzip,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ArchiveCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArchiveConfig::default();
        assert_eq!(config.variable.name, "pcp");
        assert_eq!(config.chunks, ChunkConfig { time: 12, lat: 16, lon: 16 });
        assert_eq!(config.compression, ArchiveCompression::Gzip);
        assert_eq!(config.quantization.fill_value, -9999);
        assert_eq!(config.conventions, "CF-1.6");
        assert_eq!(config.time_units(), "days since 1980-01-01 00:00:00");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ArchiveConfig::default();
        config.chunks.lat = 0;
        assert!(config.validate().is_err());

        config = ArchiveConfig::default();
        config.compression_level = 10;
        assert!(config.validate().is_err());

        config = ArchiveConfig::default();
        config.variable.name = "time".to_string();
        assert!(config.validate().is_err());

        config = ArchiveConfig::default();
        config.quantization.scale_factor = 0.0;
        assert!(config.validate().is_err());

        config = ArchiveConfig::default();
        config.date_pattern = r"(?P<year>\d{4})".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!(ArchiveCompression::from_str("none"), ArchiveCompression::None);
        assert_eq!(ArchiveCompression::from_str("ZLIB"), ArchiveCompression::Gzip);
        assert_eq!(
            ArchiveCompression::from_str("blosc_lz4"),
            ArchiveCompression::BloscLz4
        );
        assert_eq!(
            ArchiveCompression::from_str("BLOSC_ZSTD"),
            ArchiveCompression::BloscZstd
        );
        assert_eq!(ArchiveCompression::from_str("invalid"), ArchiveCompression::Gzip);
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_epoch("1980-01-01"), Some(default_epoch()));
        assert_eq!(parse_epoch("1980-01-01T00:00:00"), Some(default_epoch()));
        assert_eq!(parse_epoch("1980-01-01 00:00:00"), Some(default_epoch()));
        assert_eq!(parse_epoch("not a date"), None);
    }

    #[test]
    fn test_config_from_yaml_like_json() {
        let json = serde_json::json!({
            "variable": { "name": "spi", "units": "1" },
            "chunks": { "time": 6 },
            "compression": "blosc_zstd"
        });
        let config: ArchiveConfig = serde_json::from_value(json).expect("deserialize");
        assert_eq!(config.variable.name, "spi");
        assert_eq!(config.variable.standard_name, "precipitation");
        assert_eq!(config.chunks.time, 6);
        assert_eq!(config.chunks.lat, 16);
        assert_eq!(config.compression, ArchiveCompression::BloscZstd);
    }
}
