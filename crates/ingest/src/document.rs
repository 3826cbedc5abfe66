use serde::{Deserialize, Serialize};

/// One page of already-decoded document text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// Parsed document record as produced by the upstream format decoders.
///
/// Only `content.pages[].text` is read; any other fields the decoders
/// attach (metadata, tables, images) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub content: DocumentContent,
}

#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    /// Path the document was loaded from, used to name the audit file.
    pub source: String,
    pub pages: Vec<Page>,
}

impl NormalizedDocument {
    pub fn new(source: String, pages: Vec<Page>) -> Self {
        Self { source, pages }
    }

    pub fn from_record(source: String, record: DocumentRecord) -> Self {
        Self::new(source, record.content.pages)
    }

    /// Concatenate page texts, each followed by a newline.
    pub fn full_text(&self) -> String {
        let mut text = String::with_capacity(self.pages.iter().map(|p| p.text.len() + 1).sum());
        for page in &self.pages {
            text.push_str(&page.text);
            text.push('\n');
        }
        text
    }

    /// File stem of the source path (`reports/q3.json` -> `q3`).
    pub fn source_stem(&self) -> String {
        std::path::Path::new(&self.source)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}
