//! Deterministic, lexicon-driven triplet extraction.
//!
//! Entities are found with category-tagged regexes, relation phrases with
//! predicate-tagged trigger regexes. Each trigger is paired with the nearest
//! entity ending before it (subject) and the nearest entity starting after
//! it (object). Precision is traded for recall; duplicates are left for the
//! merger.

use chrono::Utc;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::debug;

use crate::schema::{ExtractionMethod, Triplet};

const ENTITY_PATTERNS: &[(&str, &[&str])] = &[
    (
        "company",
        &[
            r"([A-Z][a-z]+ )?([A-Z][a-z]+ )?([A-Z][a-zA-Z0-9'\-&]+(?: Inc\.| Corp\.| LLC| Ltd\.| Limited| GmbH)?)",
            // Acronyms: IBM, AT&T
            r"([A-Z][A-Z&]+)",
        ],
    ),
    (
        "financial_metric",
        &[
            r"revenue",
            r"profit",
            r"income",
            r"EBITDA",
            r"margin",
            r"cash flow",
            r"ROI",
            r"ROE",
            r"debt",
            r"equity",
            r"assets",
            r"liabilities",
        ],
    ),
    ("percentage", &[r"(\d+\.?\d*)%", r"(\d+\.?\d*) percent"]),
    (
        "monetary_value",
        &[
            r"\$(\d+\.?\d*)(?: million| billion| trillion)?",
            r"(\d+\.?\d*) (million|billion|trillion) dollars",
        ],
    ),
    (
        "date",
        &[
            r"\b(January|February|March|April|May|June|July|August|September|October|November|December) \d{1,2},? \d{4}\b",
            r"\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b",
            r"\b\d{4}\b",
        ],
    ),
];

const RELATION_PATTERNS: &[(&str, &[&str])] = &[
    (
        "increased",
        &[r"increased (by )?", r"grew (by )?", r"rose (by )?", r"gained", r"improved"],
    ),
    (
        "decreased",
        &[
            r"decreased (by )?",
            r"declined (by )?",
            r"fell (by )?",
            r"dropped (by )?",
            r"reduced (by )?",
        ],
    ),
    ("acquired", &[r"acquired", r"purchased", r"bought", r"took over"]),
    (
        "partnered",
        &[
            r"partnered with",
            r"formed (a|an) (partnership|alliance) with",
            r"collaborated with",
        ],
    ),
    ("launched", &[r"launched", r"released", r"introduced", r"unveiled"]),
    ("invested", &[r"invested", r"funded", r"financed"]),
];

struct Category {
    name: String,
    patterns: Vec<Regex>,
}

fn compile(table: &[(&str, &[&str])], case_insensitive: bool) -> Result<Vec<Category>, regex::Error> {
    table
        .iter()
        .map(|(name, patterns)| -> Result<Category, regex::Error> {
            let patterns = patterns
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(case_insensitive).build())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Category {
                name: name.to_string(),
                patterns,
            })
        })
        .collect()
}

/// Immutable entity and relation lexicon, compiled once and shared.
pub struct PatternSet {
    entities: Vec<Category>,
    relations: Vec<Category>,
}

impl PatternSet {
    /// Compile a pattern set. Entity patterns are case-sensitive, relation
    /// triggers case-insensitive. Table order is significant for tie-breaks.
    pub fn new(
        entities: &[(&str, &[&str])],
        relations: &[(&str, &[&str])],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            entities: compile(entities, false)?,
            relations: compile(relations, true)?,
        })
    }

    /// Business-document lexicon: companies, financial metrics, percentages,
    /// monetary values, dates; increased/decreased/acquired/partnered/
    /// launched/invested triggers.
    pub fn business() -> Result<Self, regex::Error> {
        Self::new(ENTITY_PATTERNS, RELATION_PATTERNS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOccurrence<'a> {
    pub text: &'a str,
    pub category: &'a str,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationOccurrence<'a> {
    pub predicate: &'a str,
    pub start: usize,
    pub end: usize,
}

pub struct PatternExtractor {
    patterns: Arc<PatternSet>,
}

impl PatternExtractor {
    pub fn new(patterns: Arc<PatternSet>) -> Self {
        Self { patterns }
    }

    pub fn extract(&self, text: &str) -> Vec<Triplet> {
        let timestamp = Utc::now();
        let mut triplets = Vec::new();

        for sentence in ingest::split_sentences(text) {
            let entities = self.find_entities(sentence);
            if entities.is_empty() {
                continue;
            }

            for relation in self.find_relations(sentence) {
                let (Some(subject), Some(object)) = (
                    nearest_before(&entities, &relation),
                    nearest_after(&entities, &relation),
                ) else {
                    continue;
                };

                triplets.push(Triplet {
                    subject: subject.text.to_string(),
                    subject_type: subject.category.to_string(),
                    predicate: relation.predicate.to_string(),
                    object: object.text.to_string(),
                    object_type: object.category.to_string(),
                    context: Some(sentence.to_string()),
                    confidence: 1.0,
                    extraction_method: ExtractionMethod::PatternBased,
                    timestamp,
                });
            }
        }

        debug!(count = triplets.len(), "Pattern extraction finished");
        triplets
    }

    /// Entity occurrences in category order, then pattern order, then
    /// position.
    pub fn find_entities<'a>(&'a self, sentence: &'a str) -> Vec<EntityOccurrence<'a>> {
        let mut found = Vec::new();
        for category in &self.patterns.entities {
            for pattern in &category.patterns {
                for m in pattern.find_iter(sentence) {
                    found.push(EntityOccurrence {
                        text: m.as_str(),
                        category: &category.name,
                        start: m.start(),
                        end: m.end(),
                    });
                }
            }
        }
        found
    }

    pub fn find_relations<'a>(&'a self, sentence: &str) -> Vec<RelationOccurrence<'a>> {
        let mut found = Vec::new();
        for predicate in &self.patterns.relations {
            for pattern in &predicate.patterns {
                for m in pattern.find_iter(sentence) {
                    found.push(RelationOccurrence {
                        predicate: &predicate.name,
                        start: m.start(),
                        end: m.end(),
                    });
                }
            }
        }
        found
    }
}

/// Entity whose span ends closest to (at or before) the phrase start.
/// Ties go to the first occurrence scanned.
pub fn nearest_before<'e, 'a>(
    entities: &'e [EntityOccurrence<'a>],
    relation: &RelationOccurrence<'_>,
) -> Option<&'e EntityOccurrence<'a>> {
    let mut best: Option<(&EntityOccurrence, usize)> = None;
    for entity in entities.iter().filter(|e| e.end <= relation.start) {
        let distance = relation.start - entity.end;
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((entity, distance));
        }
    }
    best.map(|(e, _)| e)
}

/// Entity whose span starts closest to (at or after) the phrase end.
pub fn nearest_after<'e, 'a>(
    entities: &'e [EntityOccurrence<'a>],
    relation: &RelationOccurrence<'_>,
) -> Option<&'e EntityOccurrence<'a>> {
    let mut best: Option<(&EntityOccurrence, usize)> = None;
    for entity in entities.iter().filter(|e| e.start >= relation.end) {
        let distance = entity.start - relation.end;
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((entity, distance));
        }
    }
    best.map(|(e, _)| e)
}
