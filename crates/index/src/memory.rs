//! In-process graph store. Used when no Neo4j instance is configured and
//! by the ingestion tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::plan::BatchPlan;
use crate::store::{GraphStats, GraphStore};

pub type EntityId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntity {
    pub name: String,
    pub entity_type: String,
    pub labels: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRelationship {
    pub from: EntityId,
    pub to: EntityId,
    pub rel_type: String,
    pub context: String,
    pub confidence: f64,
    pub source: String,
    /// Write time of the batch that created the edge.
    pub timestamp: String,
    pub extracted_at: String,
}

/// Relationship identity: one edge per pair, type and context.
type EdgeKey = (EntityId, String, EntityId, String);

#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    entities: Vec<StoredEntity>,
    by_name: HashMap<String, EntityId>,
    relationships: Vec<StoredRelationship>,
    edges: HashSet<EdgeKey>,
}

impl MemoryGraph {
    /// Resolve `name`, creating a bare `Entity` node when absent.
    pub fn upsert_entity(&mut self, name: &str) -> (EntityId, bool) {
        if let Some(&id) = self.by_name.get(name) {
            return (id, false);
        }
        let id = self.entities.len();
        self.entities.push(StoredEntity {
            name: name.to_string(),
            entity_type: String::new(),
            labels: vec!["Entity".to_string()],
            created_at: String::new(),
        });
        self.by_name.insert(name.to_string(), id);
        (id, true)
    }

    pub fn tag_entity(&mut self, id: EntityId, label: &str) {
        if let Some(entity) = self.entities.get_mut(id) {
            if !entity.labels.iter().any(|l| l == label) {
                entity.labels.push(label.to_string());
            }
        }
    }

    /// Returns whether a new relationship was created.
    pub fn create_relationship_if_absent(&mut self, relationship: StoredRelationship) -> bool {
        let key = (
            relationship.from,
            relationship.rel_type.clone(),
            relationship.to,
            relationship.context.clone(),
        );
        if !self.edges.insert(key) {
            return false;
        }
        self.relationships.push(relationship);
        true
    }

    pub fn entity(&self, name: &str) -> Option<&StoredEntity> {
        self.by_name.get(name).map(|&id| &self.entities[id])
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationships(&self) -> &[StoredRelationship] {
        &self.relationships
    }

    fn apply(&mut self, plan: &BatchPlan) -> Result<usize> {
        for row in &plan.entities {
            let (id, created) = self.upsert_entity(&row.name);
            if created {
                let entity = &mut self.entities[id];
                entity.entity_type = row.entity_type.clone();
                entity.created_at = plan.written_at.clone();
                if let Some(label) = &row.label {
                    self.tag_entity(id, label);
                }
            }
        }

        let mut created = 0;
        for group in &plan.relationships {
            for row in &group.rows {
                let from = self.resolve(&row.subject)?;
                let to = self.resolve(&row.object)?;
                let relationship = StoredRelationship {
                    from,
                    to,
                    rel_type: group.rel_type.clone(),
                    context: row.context.clone(),
                    confidence: row.confidence,
                    source: row.source.clone(),
                    timestamp: plan.written_at.clone(),
                    extracted_at: row.extracted_at.clone(),
                };
                if self.create_relationship_if_absent(relationship) {
                    created += 1;
                }
            }
        }
        Ok(created)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entities: self.entities.len(),
            relationships: self.relationships.len(),
        }
    }

    /// Undo everything appended since `checkpoint`. Batches only append
    /// entities and relationships, and only tag entities they created.
    fn rollback(&mut self, checkpoint: Checkpoint) {
        for entity in self.entities.drain(checkpoint.entities..) {
            self.by_name.remove(&entity.name);
        }
        for r in self.relationships.drain(checkpoint.relationships..) {
            self.edges.remove(&(r.from, r.rel_type, r.to, r.context));
        }
    }

    fn resolve(&self, name: &str) -> Result<EntityId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Entity {name:?} missing from batch plan"))
    }
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    entities: usize,
    relationships: usize,
}

#[derive(Default)]
pub struct MemoryGraphStore {
    graph: RwLock<MemoryGraph>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current graph, for inspection.
    pub async fn snapshot(&self) -> MemoryGraph {
        self.graph.read().await.clone()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn init_schema(&self) -> Result<()> {
        Ok(())
    }

    /// A failing batch is rolled back to where it started.
    async fn write_batch(&self, plan: &BatchPlan) -> Result<usize> {
        let mut graph = self.graph.write().await;
        let checkpoint = graph.checkpoint();
        match graph.apply(plan) {
            Ok(created) => Ok(created),
            Err(e) => {
                graph.rollback(checkpoint);
                Err(e)
            }
        }
    }

    async fn stats(&self) -> Result<GraphStats> {
        let graph = self.graph.read().await;
        Ok(GraphStats {
            entity_count: graph.entities.len(),
            relationship_count: graph.relationships.len(),
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
