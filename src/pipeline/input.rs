//! Input resolution: normalise user-supplied paths or URLs to local files.
//!
//! Extractors need a file-system path (pdfium and calamine both open files
//! by name), so URL inputs are downloaded into a `TempDir` that lives as
//! long as the [`ResolvedInput`]. The download keeps the URL's file name so
//! extension-based dispatch still works, and records the response
//! `Content-Type` for the MIME fallback.

use crate::error::FormatterError;
use crate::pipeline::extract::InputFile;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{debug, info};

/// A document ready for extraction, plus anything that must outlive it.
pub struct ResolvedInput {
    pub file: InputFile,
    /// Keeps a downloaded file on disk until extraction finishes.
    _temp_dir: Option<TempDir>,
}

impl ResolvedInput {
    fn local(file: InputFile) -> Self {
        Self {
            file,
            _temp_dir: None,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        self._temp_dir.is_some()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve every input, in order. The first failure aborts.
pub async fn resolve_inputs(
    inputs: &[String],
    timeout_secs: u64,
) -> Result<Vec<ResolvedInput>, FormatterError> {
    let mut resolved = Vec::with_capacity(inputs.len());
    for input in inputs {
        resolved.push(resolve_input(input, timeout_secs).await?);
    }
    Ok(resolved)
}

/// Resolve a path or URL to a readable local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, FormatterError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, FormatterError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(FormatterError::FileNotFound { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(FormatterError::PermissionDenied { path });
        }
        Err(_) => return Err(FormatterError::FileNotFound { path }),
    }

    debug!("Resolved local file: {}", path.display());
    Ok(ResolvedInput::local(InputFile::from_path(path)))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, FormatterError> {
    info!("Downloading document from: {}", url);

    let failed = |reason: String| FormatterError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FormatterError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = filename_from_url(url);

    let temp_dir = TempDir::new().map_err(|e| FormatterError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| FormatterError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    let mut file = InputFile::from_path(file_path).with_name(filename);
    if let Some(mime) = mime {
        file = file.with_mime(mime);
    }
    Ok(ResolvedInput {
        file,
        _temp_dir: Some(temp_dir),
    })
}

/// Last path segment of `url` if it looks like a file name.
pub fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}
