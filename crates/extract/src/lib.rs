pub mod audit;
pub mod error;
pub mod llm;
pub mod merge;
pub mod model;
pub mod patterns;
pub mod prompt;
pub mod response;
pub mod schema;

pub use audit::{DEFAULT_AUDIT_DIR, read_triplet_file, write_audit_file};
pub use error::{LlmError, ParseFailure};
pub use llm::{ModelParameters, OllamaClient, TextGenerator};
pub use merge::{TripletMerger, merge_triplets, primary_entities};
pub use model::{ModelAssistedExtractor, ModelExtraction, ModelExtractionConfig};
pub use patterns::{PatternExtractor, PatternSet};
pub use schema::{ExtractionMethod, Triplet, TripletKey};

use anyhow::Result;
use ingest::NormalizedDocument;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub source: String,
    pub pattern_based: usize,
    pub llm_based: usize,
    pub total: usize,
    pub dropped_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_file: Option<PathBuf>,
    #[serde(skip)]
    pub triplets: Vec<Triplet>,
}

/// Runs both extractors over a document and merges their output.
pub struct TripletExtractor<G> {
    pattern: PatternExtractor,
    model: ModelAssistedExtractor<G>,
}

impl<G: TextGenerator> TripletExtractor<G> {
    pub fn new(patterns: Arc<PatternSet>, model: ModelAssistedExtractor<G>) -> Self {
        Self {
            pattern: PatternExtractor::new(patterns),
            model,
        }
    }

    /// Pattern extraction, then model extraction, then merge. The two
    /// extractors never run concurrently.
    pub async fn extract_text(&self, source: &str, text: &str) -> ExtractionReport {
        let pattern = self.pattern.extract(text);
        let model = self.model.extract_detailed(text).await;
        let (pattern_based, llm_based) = (pattern.len(), model.triplets.len());

        let triplets = merge_triplets(pattern, model.triplets);

        info!(
            source,
            pattern_based,
            llm_based,
            merged = triplets.len(),
            "Triplet extraction complete"
        );

        ExtractionReport {
            source: source.to_string(),
            pattern_based,
            llm_based,
            total: triplets.len(),
            dropped_chunks: model.dropped_chunks,
            audit_file: None,
            triplets,
        }
    }

    /// Extract from a normalized document and write the audit file.
    /// Failing to persist the audit file fails the whole extraction.
    pub async fn extract_document(
        &self,
        document: &NormalizedDocument,
        audit_dir: &Path,
    ) -> Result<ExtractionReport> {
        let mut report = self.extract_text(&document.source, &document.full_text()).await;
        let path = write_audit_file(audit_dir, &document.source_stem(), &report.triplets).await?;
        report.audit_file = Some(path);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingest::Page;
    use std::time::Duration;

    struct FixedReply(&'static str);

    #[async_trait]
    impl TextGenerator for FixedReply {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn extractor(reply: &'static str) -> TripletExtractor<FixedReply> {
        let model = ModelAssistedExtractor::new(
            FixedReply(reply),
            ModelExtractionConfig {
                chunk_delay: Duration::ZERO,
                ..Default::default()
            },
        );
        TripletExtractor::new(Arc::new(PatternSet::business().unwrap()), model)
    }

    #[tokio::test]
    async fn test_extract_document_merges_and_persists() {
        let reply = r#"[
            {"subject": "Microsoft", "subject_type": "company", "predicate": "acquired",
             "object": "GitHub", "object_type": "company", "confidence": 0.95},
            {"subject": "GitHub", "subject_type": "company", "predicate": "launched",
             "object": "Copilot", "object_type": "product", "confidence": 0.85}
        ]"#;
        let document = NormalizedDocument::new(
            "reports/annual.json".to_string(),
            vec![
                Page {
                    text: "Microsoft acquired GitHub.".to_string(),
                },
                Page {
                    text: "Later on, GitHub launched Copilot for developers everywhere.".to_string(),
                },
            ],
        );
        let dir = tempfile::tempdir().unwrap();

        let report = extractor(reply)
            .extract_document(&document, dir.path())
            .await
            .unwrap();

        assert!(report.pattern_based >= 1);
        assert_eq!(report.llm_based, 2);
        assert_eq!(report.total, report.triplets.len());
        assert_eq!(report.dropped_chunks, 0);

        let acquisitions: Vec<_> = report
            .triplets
            .iter()
            .filter(|t| t.key() == ("Microsoft".into(), "acquired".into(), "GitHub".into()))
            .collect();
        assert_eq!(acquisitions.len(), 1);
        assert_eq!(acquisitions[0].extraction_method, ExtractionMethod::PatternBased);

        let path = report.audit_file.unwrap();
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("triplets_annual_"));
        assert_eq!(read_triplet_file(&path).await.unwrap().len(), report.total);
    }
}
