use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::plan::BatchPlan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub entity_count: usize,
    pub relationship_count: usize,
}

/// A property graph that can apply a [`BatchPlan`] atomically.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create indexes. Safe to call repeatedly.
    async fn init_schema(&self) -> Result<()>;

    /// Apply one batch in a single transaction and return the number of
    /// relationships created. On error nothing from the batch is kept.
    async fn write_batch(&self, plan: &BatchPlan) -> Result<usize>;

    async fn stats(&self) -> Result<GraphStats>;

    async fn health_check(&self) -> Result<()>;
}
