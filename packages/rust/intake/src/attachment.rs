//! Attachment ingestion: size ceiling, base64 encoding, ordered attachment list.
//!
//! Files in a batch are read one at a time in submission order. A rejected
//! file is recorded and skipped; it never aborts the rest of the batch.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, instrument, warn};

use underwriter_shared::{Attachment, AttachmentsConfig, Result, UnderwriterError};

const MIB: u64 = 1024 * 1024;

/// Fallback MIME type when the extension is unknown.
const OCTET_STREAM: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Turns raw files into [`Attachment`]s, enforcing a size ceiling.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentEncoder {
    max_bytes: u64,
}

impl AttachmentEncoder {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn from_config(config: &AttachmentsConfig) -> Self {
        Self::new(config.max_bytes)
    }

    /// Largest accepted file, in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Encode in-memory bytes.
    pub fn encode_bytes(&self, name: &str, mime_type: &str, bytes: &[u8]) -> Result<Attachment> {
        self.check_size(name, bytes.len() as u64)?;
        Ok(Attachment {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            encoded_content: STANDARD.encode(bytes),
        })
    }

    /// Build an attachment from a `data:<mime>;base64,<payload>` string.
    ///
    /// The size check uses the decoded length implied by the payload.
    pub fn encode_data_uri(&self, name: &str, mime_type: &str, uri: &str) -> Result<Attachment> {
        let payload = strip_data_uri(uri);
        let decoded_len = (payload.len() as u64 / 4) * 3;
        self.check_size(name, decoded_len)?;
        Ok(Attachment {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            encoded_content: payload.to_string(),
        })
    }

    /// Read and encode a file from disk.
    ///
    /// The size is checked from metadata before any bytes are read. The MIME
    /// type is guessed from the extension.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn encode_file(&self, path: &Path) -> Result<Attachment> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| read_error(&name, &e))?;
        self.check_size(&name, metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| read_error(&name, &e))?;
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        debug!(%name, %mime_type, size = bytes.len(), "attachment encoded");
        self.encode_bytes(&name, &mime_type, &bytes)
    }

    fn check_size(&self, name: &str, size: u64) -> Result<()> {
        if size > self.max_bytes {
            return Err(UnderwriterError::validation(format!(
                "File \"{name}\" exceeds {} limit.",
                describe_limit(self.max_bytes)
            )));
        }
        Ok(())
    }
}

impl Default for AttachmentEncoder {
    fn default() -> Self {
        Self::from_config(&AttachmentsConfig::default())
    }
}

fn read_error(name: &str, e: &std::io::Error) -> UnderwriterError {
    debug!(%name, error = %e, "attachment read failed");
    UnderwriterError::validation(format!("Could not read file \"{name}\"."))
}

/// Human-readable ceiling, e.g. `50MB`.
fn describe_limit(bytes: u64) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} byte")
    }
}

/// Remove a `data:...,` prefix if present, leaving only the payload.
pub fn strip_data_uri(s: &str) -> &str {
    if !s.starts_with("data:") {
        return s;
    }
    match s.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => payload,
        _ => s,
    }
}

// ---------------------------------------------------------------------------
// Attachment list
// ---------------------------------------------------------------------------

/// A file that was left out of the attachment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub name: String,
    pub reason: String,
}

/// Result of ingesting one batch of files.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Number of files appended to the list.
    pub accepted: usize,
    /// Files skipped, in submission order.
    pub rejected: Vec<RejectedFile>,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Ordered, session-owned list of encoded attachments.
#[derive(Debug, Clone, Default)]
pub struct AttachmentList {
    items: Vec<Attachment>,
}

impl AttachmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Attachment] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter()
    }

    pub fn push(&mut self, attachment: Attachment) {
        self.items.push(attachment);
    }

    /// Remove the attachment at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn into_vec(self) -> Vec<Attachment> {
        self.items
    }

    /// Encode `paths` one by one and append the accepted files.
    ///
    /// Existing entries are kept; new ones go to the end in submission order.
    pub async fn ingest<P: AsRef<Path>>(
        &mut self,
        encoder: &AttachmentEncoder,
        paths: impl IntoIterator<Item = P>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for path in paths {
            let path = path.as_ref();
            match encoder.encode_file(path).await {
                Ok(attachment) => {
                    self.items.push(attachment);
                    outcome.accepted += 1;
                }
                Err(e) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    warn!(%name, error = %e, "attachment rejected");
                    outcome.rejected.push(RejectedFile {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }

    /// Append attachments that arrived already encoded.
    ///
    /// Each goes through [`AttachmentEncoder::encode_data_uri`], so a data-URI
    /// prefix is dropped and the size ceiling applies as it does for files.
    pub fn adopt(
        &mut self,
        encoder: &AttachmentEncoder,
        attachments: impl IntoIterator<Item = Attachment>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for att in attachments {
            match encoder.encode_data_uri(&att.name, &att.mime_type, &att.encoded_content) {
                Ok(attachment) => {
                    self.items.push(attachment);
                    outcome.accepted += 1;
                }
                Err(e) => {
                    warn!(name = %att.name, error = %e, "attachment rejected");
                    outcome.rejected.push(RejectedFile {
                        name: att.name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
