use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use extract::{ModelExtractionConfig, ModelParameters};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub graph: GraphConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub min_text_chars: usize,
    pub max_chunk_chars: usize,
    pub min_confidence: f64,
    pub chunk_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    Neo4j,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub backend: GraphBackend,
    pub uri: String,
    pub user: String,
    pub password: String,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub audit_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let params = ModelParameters::default();
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "deepseek-r1:8b".to_string(),
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
            request_timeout_secs: 120,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let model = ModelExtractionConfig::default();
        Self {
            min_text_chars: model.min_text_chars,
            max_chunk_chars: model.max_chunk_chars,
            min_confidence: model.min_confidence,
            chunk_delay_ms: model.chunk_delay.as_millis() as u64,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: GraphBackend::Neo4j,
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            batch_size: index::DEFAULT_BATCH_SIZE,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            audit_dir: PathBuf::from(extract::DEFAULT_AUDIT_DIR),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file named by `KG_CONFIG`, then environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("KG_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.graph.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.graph.password = password;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.llm.model = model;
        }
        if let Some(size) = lookup("KG_BATCH_SIZE") {
            self.graph.batch_size = size
                .parse()
                .with_context(|| format!("KG_BATCH_SIZE is not a number: {size}"))?;
        }
        if let Some(threshold) = lookup("KG_MIN_CONFIDENCE") {
            self.extraction.min_confidence = threshold
                .parse()
                .with_context(|| format!("KG_MIN_CONFIDENCE is not a number: {threshold}"))?;
        }
        if let Some(chars) = lookup("KG_MAX_CHUNK_CHARS") {
            self.extraction.max_chunk_chars = chars
                .parse()
                .with_context(|| format!("KG_MAX_CHUNK_CHARS is not a number: {chars}"))?;
        }
        if let Some(dir) = lookup("KG_OUTPUT_DIR") {
            self.output.audit_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup("KG_BIND") {
            self.server.bind = bind;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.graph.batch_size == 0 {
            bail!("graph.batch_size must be at least 1");
        }
        if self.extraction.max_chunk_chars == 0 {
            bail!("extraction.max_chunk_chars must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.extraction.min_confidence) {
            bail!(
                "extraction.min_confidence must be within [0, 1], got {}",
                self.extraction.min_confidence
            );
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) || !(0.0..=1.0).contains(&self.llm.top_p) {
            bail!("llm sampling parameters out of range");
        }
        Ok(())
    }

    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters {
            temperature: self.llm.temperature,
            top_p: self.llm.top_p,
            max_tokens: self.llm.max_tokens,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs)
    }

    pub fn model_extraction(&self) -> ModelExtractionConfig {
        ModelExtractionConfig {
            min_text_chars: self.extraction.min_text_chars,
            max_chunk_chars: self.extraction.max_chunk_chars,
            min_confidence: self.extraction.min_confidence,
            chunk_delay: Duration::from_millis(self.extraction.chunk_delay_ms),
        }
    }
}
