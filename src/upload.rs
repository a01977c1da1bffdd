//! Multipart intake into per-request temporary files.

use axum::extract::Multipart;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::ApiError;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const TOO_LARGE: &str = "File is too large. Maximum size is 10MB.";

/// An uploaded file held in transient storage. The file is removed when this
/// value is dropped; removal errors are ignored.
#[derive(Debug)]
pub struct UploadedDocument {
    file: NamedTempFile,
    pub filename: String,
    pub size: u64,
}

impl UploadedDocument {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Fields of an upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub document: Option<UploadedDocument>,
    pub question: Option<String>,
}

impl UploadForm {
    /// Non-blank question, trimmed.
    pub fn question(&self) -> Option<&str> {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// Where uploads are written and how large they may be.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub dir: PathBuf,
    pub max_bytes: u64,
}

impl UploadLimits {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

/// Read every field of `multipart`, streaming the first `file` part to disk.
/// Only the first `question` field counts.
///
/// Fails as soon as the file exceeds the limit; any partial file is removed.
pub async fn receive(mut multipart: Multipart, limits: &UploadLimits) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") if form.document.is_none() => {
                let filename = field.file_name().unwrap_or("document").to_string();

                let file = tempfile::Builder::new()
                    .prefix("upload-")
                    .tempfile_in(&limits.dir)
                    .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;
                let std_file = file
                    .reopen()
                    .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;
                let mut writer = tokio::fs::File::from_std(std_file);

                let mut size: u64 = 0;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                {
                    size += chunk.len() as u64;
                    if size > limits.max_bytes {
                        info!("Rejecting upload '{}': over {} bytes", filename, limits.max_bytes);
                        return Err(ApiError::bad_request(TOO_LARGE));
                    }
                    writer
                        .write_all(&chunk)
                        .await
                        .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;
                }
                writer
                    .flush()
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;

                debug!("Stored upload '{}' ({} bytes) at {:?}", filename, size, file.path());
                form.document = Some(UploadedDocument { file, filename, size });
            }
            Some("question") if form.question.is_none() => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read question: {}", e)))?;
                form.question = Some(text);
            }
            _ => {
                // Drain anything else, including extra file parts.
                while field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
                    .is_some()
                {}
            }
        }
    }

    Ok(form)
}
