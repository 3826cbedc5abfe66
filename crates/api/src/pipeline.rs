use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use extract::{ExtractionReport, OllamaClient, TripletExtractor, primary_entities};
use index::{GraphIngestor, ImportReport};
use ingest::DocumentError;

use crate::metrics::{Metrics, TimedOperation};

const PRIMARY_MIN_MENTIONS: usize = 3;
const PRIMARY_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input not found: {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ProcessReport {
    pub extraction: ExtractionReport,
    pub import: ImportReport,
    pub primary_entities: Vec<String>,
}

/// Document to graph pipeline. Runs are serialized: one document is
/// extracted or imported at a time.
pub struct Pipeline {
    extractor: TripletExtractor<OllamaClient>,
    ingestor: GraphIngestor,
    audit_dir: PathBuf,
    metrics: Arc<Metrics>,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        extractor: TripletExtractor<OllamaClient>,
        ingestor: GraphIngestor,
        audit_dir: PathBuf,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            extractor,
            ingestor,
            audit_dir,
            metrics,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn extract(&self, path: &Path) -> Result<ExtractionReport, PipelineError> {
        let _guard = self.run_lock.lock().await;
        self.extract_locked(path).await
    }

    pub async fn import(&self, triplet_file: &Path) -> Result<ImportReport, PipelineError> {
        let _guard = self.run_lock.lock().await;
        self.import_locked(triplet_file).await
    }

    /// Extract, persist, then ingest the persisted triplets.
    pub async fn process(&self, path: &Path) -> Result<ProcessReport, PipelineError> {
        let _guard = self.run_lock.lock().await;

        let extraction = self.extract_locked(path).await?;
        let import = match &extraction.audit_file {
            Some(file) => self.import_locked(file).await?,
            None => ImportReport::default(),
        };
        let primary = primary_entities(&extraction.triplets, PRIMARY_MIN_MENTIONS, PRIMARY_LIMIT);

        info!(
            source = %extraction.source,
            triplets = extraction.total,
            imported = import.imported,
            primary_entities = ?primary,
            "Document processed"
        );

        Ok(ProcessReport {
            extraction,
            import,
            primary_entities: primary,
        })
    }

    async fn extract_locked(&self, path: &Path) -> Result<ExtractionReport, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }

        let timer = TimedOperation::start();
        let document = ingest::normalize(path).await?;
        let report = self
            .extractor
            .extract_document(&document, &self.audit_dir)
            .await?;

        self.metrics.record_extract(timer.elapsed(), &report);
        Ok(report)
    }

    async fn import_locked(&self, triplet_file: &Path) -> Result<ImportReport, PipelineError> {
        if !triplet_file.is_file() {
            return Err(PipelineError::NotFound(triplet_file.to_path_buf()));
        }

        let timer = TimedOperation::start();
        let triplets = extract::read_triplet_file(triplet_file).await?;
        let report = self.ingestor.import(&triplets).await;

        self.metrics.record_import(timer.elapsed(), &report);
        Ok(report)
    }
}
