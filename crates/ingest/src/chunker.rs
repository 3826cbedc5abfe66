use crate::sentences::split_sentences;

pub struct ChunkerConfig {
    /// Advisory upper bound in characters. A single sentence longer than
    /// this is kept whole as its own chunk.
    pub max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_chars: 3000 }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn max_chars(&self) -> usize {
        self.config.max_chars
    }

    /// Split `text` into chunks of whole sentences.
    ///
    /// Text within the limit comes back as a single chunk. Longer text is
    /// split into sentences which are packed greedily, joined by one space.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.config.max_chars {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_chars = 0;

        for sentence in split_sentences(text) {
            let sentence_chars = sentence.chars().count();

            // Flush when appending (plus the joining space) would overflow
            if !buffer.is_empty() && buffer_chars + 1 + sentence_chars > self.config.max_chars {
                chunks.push(std::mem::take(&mut buffer));
                buffer_chars = 0;
            }

            if !buffer.is_empty() {
                buffer.push(' ');
                buffer_chars += 1;
            }
            buffer.push_str(sentence);
            buffer_chars += sentence_chars;
        }

        if !buffer.is_empty() {
            chunks.push(buffer);
        }

        chunks
    }
}
