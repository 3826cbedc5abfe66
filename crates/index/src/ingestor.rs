use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use extract::Triplet;

use crate::plan::BatchPlan;
use crate::store::GraphStore;

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Relationships actually created.
    pub imported: usize,
    /// Triplets belonging to batches that failed.
    pub errors: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Writes triplets to a [`GraphStore`] in fixed-size, independently
/// committed batches.
pub struct GraphIngestor {
    store: Arc<dyn GraphStore>,
    batch_size: usize,
}

impl GraphIngestor {
    pub fn new(store: Arc<dyn GraphStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Batches run strictly in order. A failed batch is counted in full
    /// under `errors` and the remaining batches are still attempted.
    pub async fn import(&self, triplets: &[Triplet]) -> ImportReport {
        let mut report = ImportReport::default();

        for (i, batch) in triplets.chunks(self.batch_size).enumerate() {
            report.batches += 1;
            let plan = BatchPlan::build(batch);

            match self.store.write_batch(&plan).await {
                Ok(created) => {
                    info!(batch = i, triplets = batch.len(), created, "Batch imported");
                    report.imported += created;
                }
                Err(e) => {
                    warn!(batch = i, triplets = batch.len(), error = %e, "Batch failed");
                    report.errors += batch.len();
                    report.failed_batches += 1;
                }
            }
        }

        info!(
            imported = report.imported,
            errors = report.errors,
            batches = report.batches,
            "Import complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraphStore;
    use crate::store::GraphStats;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;
    use extract::ExtractionMethod;
    use std::sync::Mutex;

    /// Delegates to an inner store but fails chosen batch numbers.
    struct FlakyStore {
        inner: MemoryGraphStore,
        fail_on: Vec<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl FlakyStore {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                inner: MemoryGraphStore::new(),
                fail_on,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn init_schema(&self) -> Result<()> {
            self.inner.init_schema().await
        }

        async fn write_batch(&self, plan: &BatchPlan) -> Result<usize> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(plan.triplet_count);
                calls.len()
            };
            if self.fail_on.contains(&call) {
                anyhow::bail!("injected failure on batch {call}");
            }
            self.inner.write_batch(plan).await
        }

        async fn stats(&self) -> Result<GraphStats> {
            self.inner.stats().await
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn triplets(n: usize) -> Vec<Triplet> {
        (0..n)
            .map(|i| Triplet {
                subject: format!("Company {i}"),
                subject_type: "company".to_string(),
                predicate: "acquired".to_string(),
                object: format!("Target {i}"),
                object_type: "company".to_string(),
                context: Some(format!("Company {i} acquired Target {i}.")),
                confidence: 1.0,
                extraction_method: ExtractionMethod::PatternBased,
                timestamp: Utc::now(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_failed_middle_batch_is_counted_and_skipped() {
        let store = Arc::new(FlakyStore::new(vec![2]));
        let ingestor = GraphIngestor::new(store.clone(), 100);

        let report = ingestor.import(&triplets(250)).await;

        assert_eq!(*store.calls.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(
            report,
            ImportReport {
                imported: 150,
                errors: 100,
                batches: 3,
                failed_batches: 1,
            }
        );

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.relationship_count, 150);
        assert_eq!(stats.entity_count, 300);
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let store = Arc::new(MemoryGraphStore::new());
        let ingestor = GraphIngestor::new(store.clone(), DEFAULT_BATCH_SIZE);
        let input = triplets(120);

        let first = ingestor.import(&input).await;
        let entities_after_first = store.stats().await.unwrap().entity_count;
        let second = ingestor.import(&input).await;

        assert_eq!(first.imported, 120);
        assert_eq!(second.imported, 0);
        assert_eq!(second.errors, 0);
        assert_eq!(store.stats().await.unwrap().entity_count, entities_after_first);
    }

    #[tokio::test]
    async fn test_empty_input_and_zero_batch_size() {
        let store = Arc::new(MemoryGraphStore::new());
        let ingestor = GraphIngestor::new(store, 0);

        assert_eq!(ingestor.import(&[]).await, ImportReport::default());
        assert_eq!(ingestor.import(&triplets(3)).await.batches, 3);
    }
}
