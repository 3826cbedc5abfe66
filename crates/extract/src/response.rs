//! Turning free-form model replies into candidate triplets.
//!
//! Replies are tried against an ordered list of strategies; the first that
//! yields structured data wins. Anything else is `NoStructuredResult`.
//! No strategy repairs a truncated or partial reply.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ParseFailure;

/// One triplet as the model reported it, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTriplet {
    pub subject: String,
    pub subject_type: String,
    pub predicate: String,
    pub object: String,
    pub object_type: String,
    confidence: Option<Value>,
}

impl RawTriplet {
    /// Numeric or numeric-string confidence; anything else counts as 0.0.
    pub fn confidence(&self) -> f64 {
        match &self.confidence {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

#[derive(Debug)]
pub enum ParseOutcome {
    Parsed(Vec<RawTriplet>),
    NoStructuredResult(Vec<ParseFailure>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Substring from the first `[` to the last `]`.
    BracketedArray,
}

pub const STRATEGIES: &[ParseStrategy] = &[ParseStrategy::BracketedArray];

impl ParseStrategy {
    pub fn apply(self, reply: &str) -> Result<Vec<RawTriplet>, ParseFailure> {
        match self {
            ParseStrategy::BracketedArray => {
                let slice = enclosed(reply, '[', ']').ok_or(ParseFailure::NoArray)?;
                let items: Vec<Value> = serde_json::from_str(slice)?;
                Ok(items.into_iter().filter_map(to_raw).collect())
            }
        }
    }
}

fn enclosed(reply: &str, open: char, close: char) -> Option<&str> {
    let start = reply.find(open)?;
    let end = reply.rfind(close)?;
    (end > start).then(|| &reply[start..=end])
}

fn to_raw(value: Value) -> Option<RawTriplet> {
    if !value.is_object() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(raw) => Some(raw),
        Err(e) => {
            debug!(error = %e, "Skipping malformed triplet element");
            None
        }
    }
}

pub fn parse_reply(reply: &str) -> ParseOutcome {
    let mut failures = Vec::new();
    for strategy in STRATEGIES {
        match strategy.apply(reply) {
            Ok(triplets) => return ParseOutcome::Parsed(triplets),
            Err(failure) => failures.push(failure),
        }
    }
    ParseOutcome::NoStructuredResult(failures)
}
