use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::document::{DocumentRecord, NormalizedDocument, Page};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported document format: {0}")]
    Unsupported(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document record in {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Formats known to the pipeline, keyed by file extension.
///
/// Binary formats are decoded upstream; only their parsed JSON records and
/// plain text can be normalized here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    ParsedJson,
    PlainText,
    Binary(&'static str),
}

const REGISTRY: &[(&str, DocumentFormat)] = &[
    ("json", DocumentFormat::ParsedJson),
    ("txt", DocumentFormat::PlainText),
    ("md", DocumentFormat::PlainText),
    ("pdf", DocumentFormat::Binary("pdf")),
    ("docx", DocumentFormat::Binary("docx")),
    ("xlsx", DocumentFormat::Binary("xlsx")),
    ("csv", DocumentFormat::Binary("csv")),
    ("jpg", DocumentFormat::Binary("jpg")),
    ("png", DocumentFormat::Binary("png")),
];

impl DocumentFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_ascii_lowercase();
        REGISTRY
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, format)| *format)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Load and normalize a document of this format.
    pub async fn normalize(self, path: &Path) -> Result<NormalizedDocument, DocumentError> {
        let source = path.to_string_lossy().to_string();

        match self {
            DocumentFormat::ParsedJson => {
                let raw = read(path).await?;
                let record: DocumentRecord =
                    serde_json::from_str(&raw).map_err(|source_err| DocumentError::Malformed {
                        path: source.clone(),
                        source: source_err,
                    })?;
                debug!(path = %source, pages = record.content.pages.len(), "Loaded parsed document");
                Ok(NormalizedDocument::from_record(source, record))
            }
            DocumentFormat::PlainText => {
                let text = read(path).await?;
                Ok(NormalizedDocument::new(source, vec![Page { text }]))
            }
            DocumentFormat::Binary(ext) => Err(DocumentError::Unsupported(format!(
                "{ext} must be decoded into a parsed JSON record first"
            ))),
        }
    }
}

async fn read(path: &Path) -> Result<String, DocumentError> {
    fs::read_to_string(path)
        .await
        .map_err(|source| DocumentError::Read {
            path: path.to_string_lossy().to_string(),
            source,
        })
}

/// Resolve the format of `path` from its extension and normalize it.
pub async fn normalize(path: &Path) -> Result<NormalizedDocument, DocumentError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match DocumentFormat::from_extension(extension) {
        Some(format) => format.normalize(path).await,
        None => Err(DocumentError::Unsupported(extension.to_string())),
    }
}
