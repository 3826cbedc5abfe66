pub mod chunker;
pub mod document;
pub mod reader;
pub mod sentences;

pub use chunker::{Chunker, ChunkerConfig};
pub use document::{DocumentRecord, NormalizedDocument, Page};
pub use reader::{DocumentError, DocumentFormat, normalize};
pub use sentences::split_sentences;
