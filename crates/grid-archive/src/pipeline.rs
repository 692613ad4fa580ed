//! Pipeline driving rasters into the archive, one time slice per raster.
//!
//! ```text
//! identifier
//!      │
//!      ├─► TemporalSequencer::accept ── no match ──► skipped
//!      │
//!      ├─► RasterSource::read
//!      │
//!      ├─► (first raster only) resolve_axes ─► ArchiveSchema::build ─► ArchiveWriter::create
//!      │
//!      ├─► shape check ─► QuantizationParams::encode
//!      │
//!      └─► ArchiveWriter::append_slice
//! ```
//!
//! The first failure stops the run. A writer that was already created is
//! still finalized so the slices appended so far remain readable.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};

use crate::config::ArchiveConfig;
use crate::error::ArchiveError;
use crate::geotransform::resolve_axes;
use crate::raster::RasterSource;
use crate::schema::ArchiveSchema;
use crate::time::{DatePattern, TemporalSequencer};
use crate::types::RasterGrid;
use crate::writer::{ArchiveSummary, ArchiveWriter};

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No raster processed yet.
    Init,
    /// Schema established and archive created, nothing appended.
    SchemaReady,
    /// At least one slice appended.
    Appending,
    /// Archive finalized successfully.
    Done,
    /// A step failed; terminal.
    Failed,
}

/// Step of the pipeline at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Configure,
    Sequence,
    Read,
    Resolve,
    Schema,
    Create,
    Validate,
    Encode,
    Append,
    Finalize,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Sequence => "sequence",
            Self::Read => "read",
            Self::Resolve => "resolve",
            Self::Schema => "schema",
            Self::Create => "create",
            Self::Validate => "validate",
            Self::Encode => "encode",
            Self::Append => "append",
            Self::Finalize => "finalize",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed run: which identifier, at which step, and how far it got.
#[derive(Error, Debug)]
#[error("{} step failed for '{}'", .stage, .identifier.as_deref().unwrap_or("<none>"))]
pub struct PipelineFailure {
    /// Identifier being processed, if any.
    pub identifier: Option<String>,
    pub stage: PipelineStage,
    pub source: ArchiveError,
    /// Index of the last slice that made it into the archive.
    pub last_time_index: Option<u64>,
}

impl PipelineFailure {
    fn new(identifier: Option<&str>, stage: PipelineStage, source: ArchiveError) -> Self {
        Self {
            identifier: identifier.map(str::to_string),
            stage,
            source,
            last_time_index: None,
        }
    }
}

/// Sequential archive assembly over an ordered list of identifiers.
pub struct ArchivePipeline<'a, S: ReadableStorageTraits + WritableStorageTraits + 'static> {
    config: &'a ArchiveConfig,
    reader: &'a dyn RasterSource,
    storage: Arc<S>,
    sequencer: TemporalSequencer,
    writer: Option<ArchiveWriter<S>>,
    state: PipelineState,
}

impl<'a, S: ReadableStorageTraits + WritableStorageTraits + 'static> ArchivePipeline<'a, S> {
    /// Create a pipeline writing into `storage`.
    pub fn new(
        reader: &'a dyn RasterSource,
        storage: Arc<S>,
        config: &'a ArchiveConfig,
    ) -> Result<Self, PipelineFailure> {
        config.validate().map_err(|e| {
            PipelineFailure::new(None, PipelineStage::Configure, ArchiveError::Config(e))
        })?;
        let pattern = DatePattern::new(&config.date_pattern)
            .map_err(|e| PipelineFailure::new(None, PipelineStage::Configure, e))?;

        Ok(Self {
            config,
            reader,
            storage,
            sequencer: TemporalSequencer::new(pattern, config.epoch),
            writer: None,
            state: PipelineState::Init,
        })
    }

    /// Current state of the run.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Process identifiers in the given order, then finalize the archive.
    pub fn run<I, T>(mut self, identifiers: I) -> Result<ArchiveSummary, PipelineFailure>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for identifier in identifiers {
            let identifier = identifier.as_ref();
            if let Err(failure) = self.process(identifier) {
                return Err(self.fail(failure));
            }
        }

        let Some(writer) = self.writer.take() else {
            self.state = PipelineState::Failed;
            return Err(PipelineFailure::new(
                None,
                PipelineStage::Sequence,
                ArchiveError::NoInputs,
            ));
        };

        match writer.finalize() {
            Ok(summary) => {
                self.state = PipelineState::Done;
                Ok(summary)
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(PipelineFailure::new(None, PipelineStage::Finalize, e))
            }
        }
    }

    fn process(&mut self, identifier: &str) -> Result<(), PipelineFailure> {
        let at = |stage: PipelineStage| {
            move |e: ArchiveError| PipelineFailure::new(Some(identifier), stage, e)
        };

        let Some(step) = self
            .sequencer
            .accept(identifier)
            .map_err(at(PipelineStage::Sequence))?
        else {
            debug!(identifier = %identifier, "Skipping identifier without date token");
            return Ok(());
        };

        let grid = self
            .reader
            .read(Path::new(identifier))
            .map_err(at(PipelineStage::Read))?;

        let writer = match &mut self.writer {
            Some(writer) => writer,
            None => {
                let writer = self.establish(identifier, &grid)?;
                self.state = PipelineState::SchemaReady;
                self.writer.insert(writer)
            }
        };

        let expected = writer.schema().shape();
        if grid.shape() != expected {
            return Err(at(PipelineStage::Validate)(ArchiveError::ShapeMismatch {
                expected,
                actual: grid.shape(),
            }));
        }

        let quantized = writer
            .schema()
            .quantization()
            .encode(&grid)
            .map_err(at(PipelineStage::Encode))?;

        let itime = writer
            .append_slice(step.day_offset, &quantized)
            .map_err(at(PipelineStage::Append))?;
        self.state = PipelineState::Appending;

        info!(
            identifier = %identifier,
            date = %step.date.format("%Y-%m-%d"),
            day_offset = step.day_offset,
            itime,
            "Appended slice"
        );

        Ok(())
    }

    /// Resolve the axes and create the archive from the first grid.
    fn establish(
        &self,
        identifier: &str,
        grid: &RasterGrid,
    ) -> Result<ArchiveWriter<S>, PipelineFailure> {
        let at = |stage: PipelineStage| {
            move |e: ArchiveError| PipelineFailure::new(Some(identifier), stage, e)
        };

        let axes = resolve_axes(&grid.transform, grid.width, grid.height)
            .map_err(at(PipelineStage::Resolve))?;
        let schema =
            ArchiveSchema::build(self.config, grid.shape()).map_err(at(PipelineStage::Schema))?;

        debug!(
            identifier = %identifier,
            shape = %schema.shape(),
            time_units = %schema.time_units(),
            "Established archive schema"
        );

        ArchiveWriter::create(self.storage.clone(), schema, &axes.lon, &axes.lat)
            .map_err(at(PipelineStage::Create))
    }

    /// Move to `Failed`, finalizing whatever was written.
    fn fail(&mut self, mut failure: PipelineFailure) -> PipelineFailure {
        self.state = PipelineState::Failed;

        if let Some(writer) = self.writer.take() {
            let last = writer.time_index().checked_sub(1);
            match writer.finalize() {
                Ok(summary) => {
                    warn!(
                        slices = summary.slices,
                        stage = %failure.stage,
                        "Finalized partial archive after failure"
                    );
                    failure.last_time_index = summary.last_time_index;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to finalize archive after failure");
                    failure.last_time_index = last;
                }
            }
        }

        failure
    }
}

/// Assemble an archive from `identifiers` in the given order.
pub fn run<I, T, S>(
    identifiers: I,
    reader: &dyn RasterSource,
    storage: Arc<S>,
    config: &ArchiveConfig,
) -> Result<ArchiveSummary, PipelineFailure>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
    S: ReadableStorageTraits + WritableStorageTraits + 'static,
{
    ArchivePipeline::new(reader, storage, config)?.run(identifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::geotransform::GeoTransform;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use zarrs::array::Array;
    use zarrs_filesystem::FilesystemStore;

    /// In-memory rasters keyed by identifier, recording every read.
    struct MemorySource {
        grids: HashMap<String, RasterGrid>,
        reads: RefCell<Vec<String>>,
    }

    impl MemorySource {
        fn new(entries: Vec<(&str, RasterGrid)>) -> Self {
            Self {
                grids: entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                reads: RefCell::new(Vec::new()),
            }
        }
    }

    impl RasterSource for MemorySource {
        fn read(&self, path: &Path) -> Result<RasterGrid> {
            let key = path.display().to_string();
            self.reads.borrow_mut().push(key.clone());
            self.grids
                .get(&key)
                .cloned()
                .ok_or_else(|| ArchiveError::raster_read(key, "not found"))
        }
    }

    fn grid(nlat: usize, nlon: usize, value: f32) -> RasterGrid {
        RasterGrid::new(
            vec![value; nlat * nlon],
            nlon,
            nlat,
            Some(-9999.0),
            GeoTransform::north_up(-20.0, 0.05, 40.0, -0.05),
        )
    }

    fn store() -> (tempfile::TempDir, Arc<FilesystemStore>) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = crate::writer::filesystem_store(&dir.path().join("out.zarr")).expect("store");
        (dir, store)
    }

    #[test]
    fn test_run_appends_in_order() {
        let source = MemorySource::new(vec![
            ("x_2020_01", grid(4, 4, 1.0)),
            ("x_2020_02", grid(4, 4, 2.0)),
            ("x_2020_03", grid(4, 4, 3.0)),
        ]);
        let (_dir, store) = store();
        let config = ArchiveConfig::default();

        let summary = run(
            ["x_2020_01", "x_2020_02", "x_2020_03"],
            &source,
            store.clone(),
            &config,
        )
        .expect("run");

        assert_eq!(summary.slices, 3);
        assert_eq!(summary.last_time_index, Some(2));
        let data = Array::open(store, "/pcp").expect("open");
        assert_eq!(data.shape(), &[3, 4, 4]);
    }

    #[test]
    fn test_non_matching_identifiers_never_read() {
        let source = MemorySource::new(vec![("x_2020_01", grid(2, 2, 1.0))]);
        let (_dir, store) = store();
        let config = ArchiveConfig::default();

        let summary = run(["notes", "x_2020_01", "readme"], &source, store, &config).expect("run");

        assert_eq!(summary.slices, 1);
        assert_eq!(*source.reads.borrow(), vec!["x_2020_01".to_string()]);
    }

    #[test]
    fn test_out_of_order_finalizes_partial_archive() {
        let source = MemorySource::new(vec![
            ("x_2020_01", grid(2, 2, 1.0)),
            ("x_2020_02", grid(2, 2, 1.0)),
            ("x_2019_12", grid(2, 2, 1.0)),
        ]);
        let (_dir, store) = store();
        let config = ArchiveConfig::default();

        let failure = run(
            ["x_2020_01", "x_2020_02", "x_2019_12"],
            &source,
            store.clone(),
            &config,
        )
        .unwrap_err();

        assert_eq!(failure.stage, PipelineStage::Sequence);
        assert_eq!(failure.identifier.as_deref(), Some("x_2019_12"));
        assert_eq!(failure.last_time_index, Some(1));
        assert!(matches!(failure.source, ArchiveError::NonMonotonicTime { .. }));

        let time = Array::open(store, "/time").expect("open");
        assert_eq!(time.shape(), &[2]);
    }

    #[test]
    fn test_shape_change_is_rejected() {
        let source = MemorySource::new(vec![
            ("x_2020_01", grid(2, 2, 1.0)),
            ("x_2020_02", grid(3, 2, 1.0)),
        ]);
        let (_dir, store) = store();
        let config = ArchiveConfig::default();

        let failure = run(["x_2020_01", "x_2020_02"], &source, store, &config).unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Validate);
        assert_eq!(failure.last_time_index, Some(0));
        assert!(matches!(failure.source, ArchiveError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_no_inputs() {
        let source = MemorySource::new(vec![]);
        let (_dir, store) = store();
        let config = ArchiveConfig::default();

        let failure = run(["a.txt", "b.txt"], &source, store, &config).unwrap_err();
        assert!(matches!(failure.source, ArchiveError::NoInputs));
        assert_eq!(failure.last_time_index, None);
    }

    #[test]
    fn test_invalid_config_rejected_before_run() {
        let source = MemorySource::new(vec![]);
        let (_dir, store) = store();
        let mut config = ArchiveConfig::default();
        config.date_pattern = r"(?P<year>\d{4})".to_string();

        let failure = ArchivePipeline::new(&source, store, &config)
            .err()
            .expect("config failure");
        assert_eq!(failure.stage, PipelineStage::Configure);
    }

    #[test]
    fn test_state_transitions() {
        let source = MemorySource::new(vec![("x_2020_01", grid(2, 2, 1.0))]);
        let (_dir, store) = store();
        let config = ArchiveConfig::default();

        let mut pipeline = ArchivePipeline::new(&source, store, &config).expect("pipeline");
        assert_eq!(pipeline.state(), PipelineState::Init);

        pipeline.process("x_2020_01").expect("process");
        assert_eq!(pipeline.state(), PipelineState::Appending);

        let failure = pipeline.process("x_2019_01").unwrap_err();
        let failure = pipeline.fail(failure);
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(failure.last_time_index, Some(0));
    }

    #[test]
    fn test_failure_display() {
        let failure =
            PipelineFailure::new(Some("x_2020_01"), PipelineStage::Read, ArchiveError::NoInputs);
        assert_eq!(failure.to_string(), "read step failed for 'x_2020_01'");

        let source = std::error::Error::source(&failure).expect("source");
        assert_eq!(source.to_string(), "no input matched the date pattern");
    }
}
