//! Configuration loader for the raster archiver.
//!
//! Reads an optional YAML file into [`ArchiveConfig`], applies `ARCHIVE_*`
//! environment overrides on top, and validates the result.
//!
//! Supports environment variable substitution using ${VAR} syntax.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use grid_archive::ArchiveConfig;

/// Load the archive configuration.
///
/// Without a file the defaults are used. Environment overrides apply in both
/// cases.
pub fn load_archive_config(path: Option<&Path>) -> Result<ArchiveConfig> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read archive config from {:?}", path))?;
            parse_archive_config(&content)
                .with_context(|| format!("Failed to parse archive config from {:?}", path))?
        }
        None => ArchiveConfig::default(),
    };

    let config = config.with_env_overrides();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid archive configuration: {}", e))?;

    Ok(config)
}

/// Parse YAML content after expanding environment variables.
fn parse_archive_config(content: &str) -> Result<ArchiveConfig> {
    let expanded = expand_env_vars(content)?;
    if expanded.trim().is_empty() {
        return Ok(ArchiveConfig::default());
    }
    let config: ArchiveConfig = serde_yaml::from_str(&expanded)?;
    Ok(config)
}

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed variable substitution: ${{{}", after))?;

        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
