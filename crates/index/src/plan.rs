//! Turning a batch of triplets into store-ready rows.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;

use extract::Triplet;

pub const DEFAULT_RELATIONSHIP_TYPE: &str = "RELATED_TO";

/// Subtype label for an entity category: `financial_metric` becomes
/// `FinancialMetric`. `None` when nothing alphanumeric is left.
pub fn entity_label(category: &str) -> Option<String> {
    let label: String = category
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    match label.chars().next() {
        None => None,
        Some(c) if c.is_numeric() => Some(format!("_{label}")),
        Some(_) => Some(label),
    }
}

/// Relationship type for a predicate: `partnered with` becomes
/// `PARTNERED_WITH`.
pub fn relationship_type(predicate: &str) -> String {
    let mut out = String::with_capacity(predicate.len());
    for c in predicate.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    let trimmed = out.trim_matches('_');
    match trimmed.chars().next() {
        None => DEFAULT_RELATIONSHIP_TYPE.to_string(),
        Some(c) if c.is_numeric() => format!("_{trimmed}"),
        Some(_) => trimmed.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRow {
    pub name: String,
    /// Raw category as extracted.
    pub entity_type: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipRow {
    pub subject: String,
    pub object: String,
    pub context: String,
    pub confidence: f64,
    pub source: String,
    /// When the triplet was extracted, not when it is written.
    pub extracted_at: String,
}

#[derive(Debug, Clone)]
pub struct RelationshipGroup {
    pub rel_type: String,
    pub rows: Vec<RelationshipRow>,
}

/// Everything one transaction writes.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    /// Unique by name; the first mention decides type and label.
    pub entities: Vec<EntityRow>,
    /// Grouped by sanitized type, in order of first appearance.
    pub relationships: Vec<RelationshipGroup>,
    pub triplet_count: usize,
    /// Stamped on entities and relationships created by this batch.
    pub written_at: String,
}

impl BatchPlan {
    pub fn build(triplets: &[Triplet]) -> Self {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        let mut relationships: Vec<RelationshipGroup> = Vec::new();

        for t in triplets {
            for (name, category) in [(&t.subject, &t.subject_type), (&t.object, &t.object_type)] {
                if seen.insert(name.as_str()) {
                    entities.push(EntityRow {
                        name: name.clone(),
                        entity_type: category.clone(),
                        label: entity_label(category),
                    });
                }
            }

            let row = RelationshipRow {
                subject: t.subject.clone(),
                object: t.object.clone(),
                context: t.context_str().to_string(),
                confidence: t.confidence,
                source: t.extraction_method.to_string(),
                extracted_at: t.timestamp.to_rfc3339(),
            };

            let rel_type = relationship_type(&t.predicate);
            match relationships.iter_mut().find(|g| g.rel_type == rel_type) {
                Some(group) => group.rows.push(row),
                None => relationships.push(RelationshipGroup {
                    rel_type,
                    rows: vec![row],
                }),
            }
        }

        Self {
            entities,
            relationships,
            triplet_count: triplets.len(),
            written_at: Utc::now().to_rfc3339(),
        }
    }

    /// Entities grouped by subtype label, in order of first appearance.
    pub fn entities_by_label(&self) -> Vec<(Option<&str>, Vec<&EntityRow>)> {
        let mut groups: Vec<(Option<&str>, Vec<&EntityRow>)> = Vec::new();
        for entity in &self.entities {
            let label = entity.label.as_deref();
            match groups.iter_mut().find(|(l, _)| *l == label) {
                Some((_, rows)) => rows.push(entity),
                None => groups.push((label, vec![entity])),
            }
        }
        groups
    }
}
