//! Publishing generated HTML as a static page.
//!
//! One fixed file, overwritten on every run. The write goes through a
//! temp file and rename so a reader never observes a half-written page.

use std::fs;
use std::path::{Path, PathBuf};

/// Fixed name of the published page; the link is `web_base` + this name.
pub const RESULT_FILE_NAME: &str = "resultado.html";

#[derive(Debug, thiserror::Error)]
#[error("could not publish result to {path}: {source}")]
pub struct PublishError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

/// Strip a leading code fence (with optional language tag) and a trailing
/// fence, plus surrounding whitespace. Text without fences is only trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the rest of the fence line (the language tag, if any).
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Write the cleaned content to the fixed path under `assets_dir` and
/// return the public URL.
pub fn publish(assets_dir: &Path, web_base: &str, content: &str) -> Result<String, PublishError> {
    let cleaned = strip_code_fences(content);

    let wrap = |source: std::io::Error, path: &Path| PublishError {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(assets_dir).map_err(|e| wrap(e, assets_dir))?;

    let target = assets_dir.join(RESULT_FILE_NAME);
    let staging = assets_dir.join(format!("{RESULT_FILE_NAME}.tmp"));
    fs::write(&staging, cleaned).map_err(|e| wrap(e, &staging))?;
    fs::rename(&staging, &target).map_err(|e| wrap(e, &target))?;

    tracing::info!("published {} bytes to {}", cleaned.len(), target.display());
    Ok(format!("{web_base}{RESULT_FILE_NAME}"))
}
