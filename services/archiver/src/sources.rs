//! Input enumeration.
//!
//! Within each directory, files come before subdirectories and both are
//! sorted by name, which gives the pipeline the time-ordered identifier
//! sequence it expects for date-named inputs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

/// Recursively list files under `root` whose extension matches `extension`.
///
/// The extension comparison ignores case and a leading dot.
pub fn enumerate_inputs(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(root.is_dir(), "Input {:?} is not a directory", root);

    let wanted = extension.trim_start_matches('.').to_lowercase();
    let mut inputs = Vec::new();

    let walker = WalkDir::new(root).sort_by(|a, b| {
        (a.file_type().is_dir(), a.file_name()).cmp(&(b.file_type().is_dir(), b.file_name()))
    });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase() == wanted)
            .unwrap_or(false);

        if matches {
            inputs.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "Ignoring file with other extension");
        }
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_files_before_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("1982/x_1982_01.tif"));
        touch(&root.join("1981/x_1981_02.TIF"));
        touch(&root.join("1981/x_1981_01.tif"));
        touch(&root.join("1981/notes.txt"));
        touch(&root.join("x_1980_12.tif"));

        let inputs = enumerate_inputs(root, "tif").unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(
            names,
            vec![
                "x_1980_12.tif",
                "1981/x_1981_01.tif",
                "1981/x_1981_02.TIF",
                "1982/x_1982_01.tif",
            ]
        );
    }

    #[test]
    fn test_extension_with_dot() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.tiff"));
        touch(&dir.path().join("b.tif"));

        let inputs = enumerate_inputs(dir.path(), ".tiff").unwrap();
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].ends_with("a.tiff"));
    }

    #[test]
    fn test_missing_root() {
        assert!(enumerate_inputs(Path::new("/nonexistent/inputs"), "tif").is_err());
    }
}
