//! Media extraction
//!
//! Downloads an attachment through the messaging client and stores it under
//! the media root as `{unix_secs}-{uuid}{ext}`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::client::MessagingClient;
use crate::events::{MediaKind, MediaReference};
use crate::{Error, Result, storage};

/// Default upper bound for a single download
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Default size limit for a single download (500 MB)
pub const DEFAULT_MAX_DOWNLOAD_SIZE: u64 = 500_000_000;

/// A downloaded attachment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedMedia {
    /// Path of the stored file; empty when nothing was extracted
    pub media_path: String,
    pub mime_type: String,
    pub caption: String,
}

impl ExtractedMedia {
    /// Whether nothing was extracted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.media_path.is_empty()
    }
}

/// Stores attachments under a media root
#[derive(Debug, Clone)]
pub struct MediaExtractor {
    root: PathBuf,
    max_bytes: u64,
    timeout: Duration,
}

impl MediaExtractor {
    /// Create an extractor writing under `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: DEFAULT_MAX_DOWNLOAD_SIZE,
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// Set the download size limit
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the download timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Media root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Download `media` and store it
    ///
    /// A missing reference is not an error: it yields an empty result and
    /// touches nothing.
    ///
    /// # Errors
    ///
    /// Returns error if the download fails, times out, exceeds the size
    /// limit, or the file cannot be written
    pub async fn extract(
        &self,
        client: &dyn MessagingClient,
        kind: MediaKind,
        media: Option<&MediaReference>,
    ) -> Result<ExtractedMedia> {
        let Some(media) = media else {
            tracing::debug!(%kind, "no attachment, skipping download");
            return Ok(ExtractedMedia::default());
        };

        if let Some(len) = media.file_length {
            if len > self.max_bytes {
                return Err(Error::Media(format!(
                    "{kind} of {len} bytes exceeds limit of {} bytes",
                    self.max_bytes
                )));
            }
        }

        let data = tokio::time::timeout(self.timeout, client.download(media))
            .await
            .map_err(|_| {
                Error::Download(format!(
                    "{kind} download timed out after {:?}",
                    self.timeout
                ))
            })??;

        if data.len() as u64 > self.max_bytes {
            return Err(Error::Media(format!(
                "{kind} of {} bytes exceeds limit of {} bytes",
                data.len(),
                self.max_bytes
            )));
        }

        let mime_type = media.mime_type.clone();
        let caption = if kind.has_caption() {
            media.caption.clone().unwrap_or_default()
        } else {
            String::new()
        };

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(media_file_name(&mime_type));
        storage::write_private(&path, &data, false).await?;

        tracing::info!(
            %kind,
            path = %path.display(),
            size = data.len(),
            "media stored"
        );

        Ok(ExtractedMedia {
            media_path: path.display().to_string(),
            mime_type,
            caption,
        })
    }
}

/// Fresh file name for a download of the given MIME type
fn media_file_name(mime_type: &str) -> String {
    format!(
        "{}-{}{}",
        chrono::Utc::now().timestamp(),
        Uuid::new_v4(),
        extension_for_mime(mime_type)
    )
}

/// File extension (with leading dot) for a MIME type
///
/// Parameters such as `; codecs=opus` are ignored. Common attachment types
/// map to their usual extension (`audio/mpeg` is `.mp3`), other registered
/// types go through `mime_guess`. Unknown types fall back
/// to the subtype, so `application/x-custom` becomes `.x-custom`. An empty
/// MIME type has no extension.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> String {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let Some((_, subtype)) = essence.rsplit_once('/') else {
        return String::new();
    };

    if let Some(ext) = preferred_extension(&essence) {
        return format!(".{ext}");
    }

    let known = mime_guess::get_mime_extensions_str(&essence).and_then(|exts| {
        exts.iter()
            .find(|ext| **ext == subtype)
            .or_else(|| exts.first())
    });

    match known {
        Some(ext) => format!(".{ext}"),
        None if subtype.is_empty() => String::new(),
        None => format!(".{subtype}"),
    }
}

/// Canonical extension for MIME types whose `mime_guess` list does not lead
/// with the usual one
fn preferred_extension(essence: &str) -> Option<&'static str> {
    let ext = match essence {
        "image/jpeg" => "jpg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/ogg" => "ogg",
        "audio/aac" => "aac",
        "audio/amr" => "amr",
        "video/quicktime" => "mov",
        "video/3gpp" => "3gp",
        "text/plain" => "txt",
        "text/csv" => "csv",
        "application/octet-stream" => "bin",
        "application/zip" => "zip",
        "application/msword" => "doc",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.ms-powerpoint" => "ppt",
        _ => return None,
    };
    Some(ext)
}
