//! Temporary locations for test output.

use std::path::PathBuf;

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Creates a temporary directory with a specific prefix.
///
/// # Arguments
///
/// * `prefix` - A prefix for the directory name (e.g., "zarr_test")
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Input and output locations inside one temporary directory.
///
/// Returns the `TempDir` guard, an existing `inputs/` directory, and the
/// not-yet-created `archive.zarr` store path.
pub fn archive_test_dirs() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = temp_test_dir_with_prefix("archive_test_");
    let inputs = dir.path().join("inputs");
    std::fs::create_dir_all(&inputs).expect("Failed to create inputs directory");
    let store = dir.path().join("archive.zarr");
    (dir, inputs, store)
}
