use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

use ingest::{Chunker, ChunkerConfig};

use crate::llm::TextGenerator;
use crate::prompt::build_triplet_prompt;
use crate::response::{ParseOutcome, RawTriplet, parse_reply};
use crate::schema::{ExtractionMethod, Triplet};

#[derive(Debug, Clone)]
pub struct ModelExtractionConfig {
    /// Trimmed text shorter than this is not sent to the model.
    pub min_text_chars: usize,
    pub max_chunk_chars: usize,
    pub min_confidence: f64,
    /// Pause between consecutive chunk requests.
    pub chunk_delay: Duration,
}

impl Default for ModelExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 50,
            max_chunk_chars: 3000,
            min_confidence: 0.6,
            chunk_delay: Duration::from_millis(500),
        }
    }
}

/// Model output for one text plus how many chunks were lost.
#[derive(Debug, Default)]
pub struct ModelExtraction {
    pub triplets: Vec<Triplet>,
    pub chunks: usize,
    pub dropped_chunks: usize,
}

pub struct ModelAssistedExtractor<G> {
    generator: G,
    chunker: Chunker,
    config: ModelExtractionConfig,
}

impl<G: TextGenerator> ModelAssistedExtractor<G> {
    pub fn new(generator: G, config: ModelExtractionConfig) -> Self {
        let chunker = Chunker::new(ChunkerConfig {
            max_chars: config.max_chunk_chars,
        });
        Self {
            generator,
            chunker,
            config,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Extract triplets chunk by chunk. Failing chunks are logged and
    /// skipped; this never returns an error.
    pub async fn extract(&self, text: &str) -> Vec<Triplet> {
        self.extract_detailed(text).await.triplets
    }

    pub async fn extract_detailed(&self, text: &str) -> ModelExtraction {
        if text.trim().chars().count() < self.config.min_text_chars {
            debug!("Text below minimum length, skipping model extraction");
            return ModelExtraction::default();
        }

        let chunks = self.chunker.chunk_text(text);
        let total = chunks.len();
        let mut dropped = 0;
        let mut triplets = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            match self.extract_chunk(i, chunk).await {
                Some(found) => triplets.extend(found),
                None => dropped += 1,
            }

            if i + 1 < total && !self.config.chunk_delay.is_zero() {
                tokio::time::sleep(self.config.chunk_delay).await;
            }
        }

        let before = triplets.len();
        triplets.retain(|t| t.confidence >= self.config.min_confidence);

        info!(
            chunks = total,
            dropped,
            kept = triplets.len(),
            below_threshold = before - triplets.len(),
            "Model extraction finished"
        );

        ModelExtraction {
            triplets,
            chunks: total,
            dropped_chunks: dropped,
        }
    }

    /// `None` when the chunk was dropped.
    async fn extract_chunk(&self, index: usize, chunk: &str) -> Option<Vec<Triplet>> {
        let prompt = build_triplet_prompt(chunk);

        let reply = match self.generator.generate(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(chunk = index, error = %e, "Model request failed, dropping chunk");
                return None;
            }
        };

        let raw = match parse_reply(&reply) {
            ParseOutcome::Parsed(raw) => raw,
            ParseOutcome::NoStructuredResult(failures) => {
                let reasons: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
                warn!(chunk = index, reasons = ?reasons, "Unparseable model reply, dropping chunk");
                return None;
            }
        };

        let timestamp = Utc::now();
        let triplets: Vec<Triplet> = raw
            .into_iter()
            .map(|r| to_triplet(r, chunk, timestamp))
            .filter(Triplet::is_valid)
            .collect();

        debug!(chunk = index, count = triplets.len(), "Chunk parsed");
        Some(triplets)
    }
}

fn to_triplet(raw: RawTriplet, chunk: &str, timestamp: chrono::DateTime<Utc>) -> Triplet {
    let confidence = raw.confidence().clamp(0.0, 1.0);
    let subject = raw.subject.trim().to_string();
    let object = raw.object.trim().to_string();
    let context = recover_context(chunk, &subject, &object).map(str::to_string);

    Triplet {
        subject,
        subject_type: raw.subject_type,
        predicate: raw.predicate.trim().to_string(),
        object,
        object_type: raw.object_type,
        context,
        confidence,
        extraction_method: ExtractionMethod::LlmBased,
        timestamp,
    }
}

/// First sentence of `chunk` mentioning both `subject` and `object`.
pub fn recover_context<'a>(chunk: &'a str, subject: &str, object: &str) -> Option<&'a str> {
    if subject.is_empty() || object.is_empty() {
        return None;
    }
    ingest::split_sentences(chunk)
        .into_iter()
        .find(|s| s.contains(subject) && s.contains(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays canned replies in order and records the prompts it saw.
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("[]".to_string()))
        }
    }

    fn config(max_chunk_chars: usize) -> ModelExtractionConfig {
        ModelExtractionConfig {
            max_chunk_chars,
            chunk_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    const TEXT: &str = "Acme Corporation acquired Widget Industries in a landmark deal. \
                        Globex partnered with Initech on research.";

    #[tokio::test]
    async fn test_short_text_makes_no_request() {
        let extractor = ModelAssistedExtractor::new(ScriptedGenerator::new(vec![]), config(3000));
        assert!(extractor.extract("Too short.").await.is_empty());
        assert_eq!(extractor.generator().calls(), 0);
    }

    #[tokio::test]
    async fn test_confidence_floor_and_context_recovery() {
        let reply = r#"[
            {"subject": "Acme Corporation", "subject_type": "company", "predicate": "acquired",
             "object": "Widget Industries", "object_type": "company", "confidence": 0.9},
            {"subject": "Globex", "subject_type": "company", "predicate": "partnered",
             "object": "Initech", "object_type": "company", "confidence": 0.4},
            {"subject": "Acme Corporation", "subject_type": "company", "predicate": "rivals",
             "object": "Umbrella", "object_type": "company", "confidence": 0.6}
        ]"#;
        let extractor = ModelAssistedExtractor::new(
            ScriptedGenerator::new(vec![Ok(reply.to_string())]),
            config(3000),
        );

        let triplets = extractor.extract(TEXT).await;

        assert_eq!(triplets.len(), 2);
        assert!(triplets.iter().all(|t| t.confidence >= 0.6));
        assert!(triplets.iter().all(|t| t.extraction_method == ExtractionMethod::LlmBased));
        assert_eq!(
            triplets[0].context.as_deref(),
            Some("Acme Corporation acquired Widget Industries in a landmark deal.")
        );
        // Umbrella never appears in the text
        assert_eq!(triplets[1].context, None);
    }

    #[tokio::test]
    async fn test_failing_chunk_does_not_abort_others() {
        let good = r#"[{"subject": "Globex", "predicate": "partnered", "object": "Initech", "confidence": 0.95}]"#;
        let extractor = ModelAssistedExtractor::new(
            ScriptedGenerator::new(vec![
                Err(LlmError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)),
                Ok(good.to_string()),
            ]),
            config(70),
        );

        let result = extractor.extract_detailed(TEXT).await;
        let triplets = result.triplets;

        assert_eq!(extractor.generator().calls(), 2);
        assert_eq!(result.chunks, 2);
        assert_eq!(result.dropped_chunks, 1);
        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].subject, "Globex");
        assert_eq!(
            triplets[0].context.as_deref(),
            Some("Globex partnered with Initech on research.")
        );
    }

    #[tokio::test]
    async fn test_unparseable_reply_drops_chunk() {
        let extractor = ModelAssistedExtractor::new(
            ScriptedGenerator::new(vec![Ok("no relationships here".to_string())]),
            config(3000),
        );
        assert!(extractor.extract(TEXT).await.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_reply_drops_chunk() {
        let truncated = r#"[{"subject": "Globex", "predicate": "partnered", "object": "Initech", "confidence": 0.9}, {"subject": "Ac"#;
        let extractor = ModelAssistedExtractor::new(
            ScriptedGenerator::new(vec![Ok(truncated.to_string())]),
            config(3000),
        );

        let result = extractor.extract_detailed(TEXT).await;

        assert!(result.triplets.is_empty());
        assert_eq!(result.chunks, 1);
        assert_eq!(result.dropped_chunks, 1);
    }

    /// Records the (paused) clock at every request.
    struct ClockedGenerator {
        calls: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl TextGenerator for ClockedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(Instant::now());
            Ok("[]".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_chunks_but_not_after_last() {
        let text = "Acme Corporation acquired Widget Industries in a landmark deal. \
                    Globex partnered with Initech on research. \
                    Initech hired Umbrella for its supply chain.";
        let delay = Duration::from_millis(500);
        let extractor = ModelAssistedExtractor::new(
            ClockedGenerator {
                calls: Mutex::new(Vec::new()),
            },
            ModelExtractionConfig {
                max_chunk_chars: 70,
                chunk_delay: delay,
                ..Default::default()
            },
        );

        let started = Instant::now();
        let result = extractor.extract_detailed(text).await;
        let elapsed = started.elapsed();

        let calls = extractor.generator().calls.lock().unwrap().clone();
        assert_eq!(result.chunks, 3);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], started);
        assert_eq!(calls[1] - calls[0], delay);
        assert_eq!(calls[2] - calls[1], delay);
        // Two pauses for three chunks
        assert_eq!(elapsed, delay * 2);
    }

    #[tokio::test]
    async fn test_empty_subject_is_discarded() {
        let reply = r#"[{"subject": "  ", "predicate": "acquired", "object": "Widget Industries", "confidence": 1.0}]"#;
        let extractor = ModelAssistedExtractor::new(
            ScriptedGenerator::new(vec![Ok(reply.to_string())]),
            config(3000),
        );
        assert!(extractor.extract(TEXT).await.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_is_clamped() {
        let reply = r#"[{"subject": "Globex", "predicate": "partnered", "object": "Initech", "confidence": 7}]"#;
        let extractor = ModelAssistedExtractor::new(
            ScriptedGenerator::new(vec![Ok(reply.to_string())]),
            config(3000),
        );
        let triplets = extractor.extract(TEXT).await;
        assert_eq!(triplets[0].confidence, 1.0);
    }

    #[test]
    fn test_recover_context_either_order() {
        let chunk = "Nothing here. Widgets were bought by Acme. Acme acquired Widgets.";
        assert_eq!(
            recover_context(chunk, "Acme", "Widgets"),
            Some("Widgets were bought by Acme.")
        );
        assert_eq!(recover_context(chunk, "Acme", "Hooli"), None);
        assert_eq!(recover_context(chunk, "", "Widgets"), None);
    }
}
