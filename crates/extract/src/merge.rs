use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::schema::{Triplet, TripletKey};

/// Order-preserving union of triplet lists, deduplicated on
/// `(subject, predicate, object)`. The first occurrence of a key wins.
#[derive(Default)]
pub struct TripletMerger {
    seen: HashSet<TripletKey>,
    merged: Vec<Triplet>,
    discarded: usize,
}

impl TripletMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of triplets. Invalid triplets and already-seen keys are
    /// dropped. Returns how many were kept.
    pub fn extend<I>(&mut self, triplets: I) -> usize
    where
        I: IntoIterator<Item = Triplet>,
    {
        let before = self.merged.len();
        for triplet in triplets {
            if !triplet.is_valid() {
                self.discarded += 1;
                continue;
            }
            if self.seen.insert(triplet.key()) {
                self.merged.push(triplet);
            }
        }
        self.merged.len() - before
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn finish(self) -> Vec<Triplet> {
        debug!(
            kept = self.merged.len(),
            invalid = self.discarded,
            "Triplets merged"
        );
        self.merged
    }
}

/// Merge pattern output then model output.
pub fn merge_triplets(pattern: Vec<Triplet>, model: Vec<Triplet>) -> Vec<Triplet> {
    let mut merger = TripletMerger::new();
    merger.extend(pattern);
    merger.extend(model);
    merger.finish()
}

/// Entities mentioned at least `min_mentions` times as subject or object,
/// most frequent first, ties broken by first appearance.
pub fn primary_entities(triplets: &[Triplet], min_mentions: usize, limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut order = 0;
    for triplet in triplets {
        for name in [triplet.subject.as_str(), triplet.object.as_str()] {
            let entry = counts.entry(name).or_insert_with(|| {
                order += 1;
                (0, order)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .filter(|(_, (count, _))| *count >= min_mentions)
        .map(|(name, (count, first))| (name, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(name, _, _)| name.to_string())
        .collect()
}
