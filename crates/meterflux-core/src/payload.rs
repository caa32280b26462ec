use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::ValidationError;
use crate::types::{ImportName, ImportRequest, UtilityType, IMPORT_FORMAT};

pub const CSV_MIME: &str = "text/csv";
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// A selected file whose bytes can be read on demand.
#[async_trait]
pub trait FileSource: Send + Sync {
    fn name(&self) -> &str;
    async fn read_bytes(&self) -> std::io::Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

#[async_trait]
impl FileSource for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// File content that already sits in memory, e.g. an uploaded form part.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    bytes: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl FileSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// The file currently chosen for import.
///
/// Only the most recent selection counts: a multi-file selection keeps its
/// last element, and an empty selection leaves the current file in place.
#[derive(Default)]
pub struct FileSelection {
    active: Option<Arc<dyn FileSource>>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<F, I>(&mut self, files: I)
    where
        F: FileSource + 'static,
        I: IntoIterator<Item = F>,
    {
        if let Some(last) = files.into_iter().last() {
            debug!(file = last.name(), "file selected");
            self.active = Some(Arc::new(last));
        }
    }

    pub fn active(&self) -> Option<Arc<dyn FileSource>> {
        self.active.clone()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|file| file.name())
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_none()
    }
}

impl std::fmt::Debug for FileSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSelection")
            .field("active", &self.active_name())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    max_file_bytes: usize,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl PayloadBuilder {
    pub fn new(max_file_bytes: usize) -> Self {
        Self { max_file_bytes }
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Validates the name, reads the file and frames the import request.
    /// The name is checked before any bytes are read.
    pub async fn build(
        &self,
        file: &dyn FileSource,
        utility_type: UtilityType,
        import_name: &str,
    ) -> Result<ImportRequest, ValidationError> {
        let meter_name = ImportName::parse(import_name)?;

        let bytes = file
            .read_bytes()
            .await
            .map_err(|source| ValidationError::ReadFailure {
                file: file.name().to_string(),
                source,
            })?;

        if bytes.len() > self.max_file_bytes {
            return Err(ValidationError::FileTooLarge {
                file: file.name().to_string(),
                size: bytes.len(),
                limit: self.max_file_bytes,
            });
        }

        debug!(
            file = file.name(),
            bytes = bytes.len(),
            %utility_type,
            %meter_name,
            "import payload built"
        );

        Ok(ImportRequest {
            utility_type,
            meter_name,
            content: encode_data_url(CSV_MIME, &bytes),
            format: IMPORT_FORMAT.to_string(),
        })
    }
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Splits a `data:` URL into its media type and decoded bytes.
/// Only base64 payloads are accepted.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), String> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| "content is not a data URL".to_string())?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URL has no payload separator".to_string())?;

    let mut params = meta.split(';');
    let mime = params.next().unwrap_or_default().trim();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err("data URL content must be base64 encoded".to_string());
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|err| format!("data URL payload is not valid base64: {err}"))?;

    let mime = if mime.is_empty() {
        "text/plain".to_string()
    } else {
        mime.to_ascii_lowercase()
    };
    Ok((mime, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_keeps_media_type_and_bytes() {
        let url = encode_data_url(CSV_MIME, b"2023-01-01,1\n");
        assert!(url.starts_with("data:text/csv;base64,"));

        let (mime, bytes) = decode_data_url(&url).expect("decode");
        assert_eq!(mime, "text/csv");
        assert_eq!(bytes, b"2023-01-01,1\n");
    }

    #[test]
    fn data_url_without_base64_marker_is_rejected() {
        let err = decode_data_url("data:text/csv,2023-01-01%2C1").unwrap_err();
        assert!(err.contains("base64"));
    }

    #[test]
    fn plain_text_is_not_a_data_url() {
        assert!(decode_data_url("2023-01-01,1").is_err());
    }

    #[test]
    fn data_url_with_charset_parameter_decodes() {
        let url = format!("data:text/csv;charset=utf-8;base64,{}", STANDARD.encode("a,b"));
        let (mime, bytes) = decode_data_url(&url).expect("decode");
        assert_eq!(mime, "text/csv");
        assert_eq!(bytes, b"a,b");
    }
}
