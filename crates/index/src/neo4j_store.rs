use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::{BoltType, Graph, Query, Txn};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::plan::{BatchPlan, EntityRow, RelationshipGroup};
use crate::store::{GraphStats, GraphStore};

pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .with_context(|| format!("Failed to connect to Neo4j at {uri}"))?;
        Ok(Self::new(graph))
    }

    async fn count(&self, cypher: &str) -> Result<usize> {
        let mut result = self.graph.execute(Query::new(cypher.to_string())).await?;
        let count = if let Some(row) = result.next().await? {
            to_count(row.get::<i64>("count"), "count")?
        } else {
            0
        };
        Ok(count)
    }

    async fn apply(txn: &mut Txn, plan: &BatchPlan) -> Result<usize> {
        for (label, rows) in plan.entities_by_label() {
            txn.run(entity_query(label, &rows, &plan.written_at))
                .await
                .context("Failed to upsert entities")?;
        }

        let batch_id = uuid::Uuid::new_v4().to_string();
        let mut created = 0;

        for group in &plan.relationships {
            let mut result = txn
                .execute(relationship_query(group, &batch_id, &plan.written_at))
                .await
                .with_context(|| format!("Failed to create {} relationships", group.rel_type))?;

            if let Some(row) = result.next(txn.handle()).await? {
                let n = to_count(row.get::<i64>("created"), "created")?;
                debug!(rel_type = %group.rel_type, created = n, "Relationship group written");
                created += n;
            }
        }

        Ok(created)
    }
}

/// An unreadable count column fails the batch instead of reading as zero.
fn to_count<E>(value: std::result::Result<i64, E>, column: &str) -> Result<usize>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let n = value.with_context(|| format!("Failed to read {column} column"))?;
    usize::try_from(n).with_context(|| format!("Negative {column} column: {n}"))
}

fn entity_cypher(label: Option<&str>) -> String {
    let tag = label.map(|l| format!(", e:`{l}`")).unwrap_or_default();
    format!(
        r#"
        UNWIND $entities AS ent
        MERGE (e:Entity {{name: ent.name}})
        ON CREATE SET e.entity_type = ent.entity_type,
                      e.created_at = $timestamp{tag}
        "#
    )
}

/// Upsert one label group. Type, timestamp and subtype label are only set
/// when the node is created.
fn entity_query(label: Option<&str>, rows: &[&EntityRow], timestamp: &str) -> Query {
    let entities: Vec<HashMap<String, BoltType>> = rows
        .iter()
        .map(|row| {
            HashMap::from([
                ("name".to_string(), BoltType::from(row.name.clone())),
                ("entity_type".to_string(), BoltType::from(row.entity_type.clone())),
            ])
        })
        .collect();

    Query::new(entity_cypher(label))
        .param("entities", entities)
        .param("timestamp", timestamp.to_string())
}

fn relationship_cypher(rel_type: &str) -> String {
    format!(
        r#"
        UNWIND $rows AS row
        MATCH (s:Entity {{name: row.subject}})
        MATCH (o:Entity {{name: row.object}})
        MERGE (s)-[r:`{rel_type}` {{context: row.context}}]->(o)
        ON CREATE SET r.confidence = row.confidence,
                      r.source = row.source,
                      r.extracted_at = row.extracted_at,
                      r.timestamp = $timestamp,
                      r.batch_id = $batch_id
        WITH r WHERE r.batch_id = $batch_id
        RETURN count(DISTINCT r) AS created
        "#
    )
}

/// Create relationships of one type unless an identical-context edge
/// already links the pair. Edges stamped with this batch's id are the new
/// ones.
fn relationship_query(group: &RelationshipGroup, batch_id: &str, timestamp: &str) -> Query {
    let rows: Vec<HashMap<String, BoltType>> = group
        .rows
        .iter()
        .map(|row| {
            HashMap::from([
                ("subject".to_string(), BoltType::from(row.subject.clone())),
                ("object".to_string(), BoltType::from(row.object.clone())),
                ("context".to_string(), BoltType::from(row.context.clone())),
                ("confidence".to_string(), BoltType::from(row.confidence)),
                ("source".to_string(), BoltType::from(row.source.clone())),
                ("extracted_at".to_string(), BoltType::from(row.extracted_at.clone())),
            ])
        })
        .collect();

    Query::new(relationship_cypher(&group.rel_type))
        .param("rows", rows)
        .param("batch_id", batch_id.to_string())
        .param("timestamp", timestamp.to_string())
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn init_schema(&self) -> Result<()> {
        let query = Query::new(
            "CREATE INDEX entity_name_index IF NOT EXISTS FOR (e:Entity) ON (e.name)".to_string(),
        );
        self.graph
            .run(query)
            .await
            .context("Failed to create index on Entity.name")?;

        info!("Neo4j indexes created");
        Ok(())
    }

    async fn write_batch(&self, plan: &BatchPlan) -> Result<usize> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .context("Failed to start transaction")?;

        match Self::apply(&mut txn, plan).await {
            Ok(created) => {
                txn.commit().await.context("Failed to commit batch")?;
                Ok(created)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn stats(&self) -> Result<GraphStats> {
        let entity_count = self
            .count("MATCH (e:Entity) RETURN count(e) AS count")
            .await
            .context("Failed to count entities")?;
        let relationship_count = self
            .count("MATCH (:Entity)-[r]->(:Entity) RETURN count(r) AS count")
            .await
            .context("Failed to count relationships")?;

        Ok(GraphStats {
            entity_count,
            relationship_count,
        })
    }

    async fn health_check(&self) -> Result<()> {
        self.graph
            .run(neo4rs::query("RETURN 1"))
            .await
            .context("Neo4j is unreachable")?;
        Ok(())
    }
}
