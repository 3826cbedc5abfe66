pub mod ingestor;
pub mod memory;
pub mod neo4j_store;
pub mod plan;
pub mod store;

pub use ingestor::{DEFAULT_BATCH_SIZE, GraphIngestor, ImportReport};
pub use memory::MemoryGraphStore;
pub use neo4j_store::Neo4jGraphStore;
pub use plan::{BatchPlan, entity_label, relationship_type};
pub use store::{GraphStats, GraphStore};
