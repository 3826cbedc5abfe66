use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PatternBased,
    LlmBased,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::PatternBased => "pattern_based",
            ExtractionMethod::LlmBased => "llm_based",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subject-predicate-object assertion with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triplet {
    pub subject: String,
    pub subject_type: String,
    pub predicate: String,
    pub object: String,
    pub object_type: String,
    /// Sentence or passage supporting the assertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub confidence: f64,
    pub extraction_method: ExtractionMethod,
    pub timestamp: DateTime<Utc>,
}

/// Dedup identity: exact, case-sensitive `(subject, predicate, object)`.
pub type TripletKey = (String, String, String);

impl Triplet {
    /// Subject and object must be non-empty after trimming.
    pub fn is_valid(&self) -> bool {
        !self.subject.trim().is_empty() && !self.object.trim().is_empty()
    }

    pub fn key(&self) -> TripletKey {
        (
            self.subject.clone(),
            self.predicate.clone(),
            self.object.clone(),
        )
    }

    /// Context as stored on graph relationships; absent context is "".
    pub fn context_str(&self) -> &str {
        self.context.as_deref().unwrap_or("")
    }
}
