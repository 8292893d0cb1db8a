//! Document-to-markdown conversion for repository attachments.
//!
//! Conversion is delegated to an external tool (pandoc by default,
//! overridable via `generation.converter_path`), invoked as a child process
//! per file. A failed conversion aborts the attach workflow; any partial
//! artifact on disk is left in place.

use std::path::Path;
use tokio::process::Command;

/// File types the attach workflow accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "xlsx"];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("file has no extension: {0}")]
    MissingExtension(String),

    #[error("unsupported file type \"{0}\" (allowed: pdf, docx, xlsx)")]
    UnsupportedExtension(String),

    #[error("could not run converter \"{converter}\": {source}")]
    Spawn {
        converter: String,
        source: std::io::Error,
    },

    #[error("document conversion failed: {0}")]
    Convert(String),

    #[error("converter produced non-UTF-8 output")]
    Encoding,
}

/// Lowercased extension of `path`, checked against the allowed set.
pub fn validated_extension(path: &Path) -> Result<String, IngestError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| IngestError::MissingExtension(path.display().to_string()))?;

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(IngestError::UnsupportedExtension(ext));
    }
    Ok(ext)
}

/// Convert a local document to markdown suitable for prompt inclusion.
pub async fn to_markdown(converter: &str, path: &Path) -> Result<String, IngestError> {
    validated_extension(path)?;

    let output = Command::new(converter)
        .arg(path)
        .args(["-t", "gfm"])
        .output()
        .await
        .map_err(|source| IngestError::Spawn {
            converter: converter.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(IngestError::Convert(stderr));
    }

    String::from_utf8(output.stdout).map_err(|_| IngestError::Encoding)
}
