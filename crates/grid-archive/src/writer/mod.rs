//! Zarr writer for assembling the archive.
//!
//! The archive is a Zarr V3 hierarchy: the root group carries the global
//! attributes and each schema variable is an array in that group.

mod zarr_writer;

use std::path::Path;
use std::sync::Arc;

use zarrs_filesystem::FilesystemStore;

use crate::error::{ArchiveError, Result};

pub use zarr_writer::{ArchiveSummary, ArchiveWriter};

/// Open (creating if needed) a filesystem store rooted at `path`.
pub fn filesystem_store(path: &Path) -> Result<Arc<FilesystemStore>> {
    std::fs::create_dir_all(path)?;
    let store = FilesystemStore::new(path).map_err(|e| {
        ArchiveError::store_write(format!("failed to open store {}: {}", path.display(), e))
    })?;
    Ok(Arc::new(store))
}
