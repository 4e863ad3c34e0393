//! I/O utility functions

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use apparun_core::ModelFormat;
use color_eyre::eyre::{WrapErr, eyre};
use serde::de::DeserializeOwned;

/// Sibling path used while writing `path`: `out.json` becomes `out.json.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write content to a file atomically using write-then-rename pattern.
///
/// The content is first written to a temporary file next to the target,
/// then renamed over it, so readers never see a partially written result.
///
/// # Example
/// ```ignore
/// atomic_write(Path::new("result.json"), &json)?;
/// ```
pub fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let temp = temp_path(path);
    fs::write(&temp, content)?;
    fs::rename(&temp, path)
}

/// Document format of a file, from its extension
pub fn format_of(path: &Path) -> color_eyre::Result<ModelFormat> {
    ModelFormat::from_path(path).ok_or_else(|| {
        eyre!(
            "cannot tell the format of {} (expected .yaml, .yml or .json)",
            path.display()
        )
    })
}

/// Read and deserialize a YAML or JSON file
pub fn read_document<T: DeserializeOwned>(path: &Path) -> color_eyre::Result<T> {
    let format = format_of(path)?;
    let source = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let parsed = match format {
        ModelFormat::Yaml => serde_saphyr::from_str(&source).map_err(|e| eyre!("{e}")),
        ModelFormat::Json => serde_json::from_str(&source).map_err(|e| eyre!("{e}")),
    };
    parsed.wrap_err_with(|| format!("failed to parse {}", path.display()))
}
