//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use paperflow_catalog::CsvColumns;
use paperflow_core::RunConfig;
use paperflow_embed::EmbeddingConfig;
use paperflow_extract::LlmConfig;
use paperflow_mineru::ConvertConfig;
use serde::Deserialize;

/// Global configuration for paperflow
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub runner: RunnerSection,
    pub llm: LlmSection,
    pub embedding: EmbeddingSection,
    pub mineru: MineruSection,
    pub catalog: CatalogSection,
}

/// Where each stage reads and writes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub pdf_dir: PathBuf,
    pub mineru_dir: PathBuf,
    pub info_dir: PathBuf,
    pub index: PathBuf,
    pub catalog: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("./data/pdfs"),
            mineru_dir: PathBuf::from("./data/mineru"),
            info_dir: PathBuf::from("./data/info"),
            index: PathBuf::from("./data/chunks.lance"),
            catalog: PathBuf::from("./data/catalog.duckdb"),
        }
    }
}

/// Runner settings; unset fields fall back to the stage's defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub batch_interval_secs: Option<f64>,
    pub delay_scale_secs: Option<f64>,
    pub skip_existing: Option<bool>,
    pub verify: Option<bool>,
    pub verify_attempts: Option<u32>,
    pub seed: Option<u64>,
}

impl RunnerSection {
    pub fn apply(&self, mut base: RunConfig) -> Result<RunConfig> {
        if let Some(n) = self.workers {
            base.num_workers = n;
        }
        if let Some(n) = self.batch_size {
            base.batch_size = n;
        }
        if let Some(s) = self.batch_interval_secs {
            base.batch_interval = secs("batch_interval_secs", s)?;
        }
        if let Some(s) = self.delay_scale_secs {
            base.delay_scale = secs("delay_scale_secs", s)?;
        }
        if let Some(b) = self.skip_existing {
            base.skip_existing = b;
        }
        if let Some(b) = self.verify {
            base.verify = b;
        }
        if let Some(n) = self.verify_attempts {
            base.verify_attempts = n;
        }
        if self.seed.is_some() {
            base.seed = self.seed;
        }
        Ok(base)
    }
}

/// Non-negative, finite seconds
pub fn secs(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("{name} must be >= 0, got {value}"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    #[serde(deserialize_with = "deserialize_env_string")]
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub max_retries: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        let d = LlmConfig::default();
        Self {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(d.base_url),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: std::env::var("LLM_MODEL").unwrap_or(d.model),
            max_tokens: d.max_tokens,
            max_retries: d.max_retries,
        }
    }
}

impl LlmSection {
    pub fn to_llm_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            max_retries: self.max_retries,
            ..LlmConfig::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    #[serde(deserialize_with = "deserialize_env_string")]
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
    pub model: String,
    pub dimensions: Option<u32>,
    pub batch_size: usize,
    pub max_retries: u32,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        let d = EmbeddingConfig::default();
        Self {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(d.base_url),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: std::env::var("EMBEDDING_MODEL").unwrap_or(d.model),
            dimensions: d.dimensions,
            batch_size: d.batch_size,
            max_retries: d.max_retries,
        }
    }
}

impl EmbeddingSection {
    pub fn to_embedding_config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            batch_size: self.batch_size,
            max_retries: self.max_retries,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MineruSection {
    pub command: String,
    pub backend: String,
    pub method: String,
    pub lang: String,
    pub timeout_secs: Option<u64>,
    /// Runner overrides for conversion (serial by default)
    pub runner: RunnerSection,
}

impl Default for MineruSection {
    fn default() -> Self {
        let d = ConvertConfig::default();
        Self {
            command: d.command,
            backend: d.backend,
            method: d.method,
            lang: d.lang,
            timeout_secs: None,
            runner: RunnerSection::default(),
        }
    }
}

impl MineruSection {
    /// Conversion is CPU/GPU bound: one paper at a time with a short pause.
    pub fn run_defaults() -> RunConfig {
        RunConfig {
            num_workers: 1,
            batch_size: 1,
            batch_interval: Duration::from_secs(1),
            delay_scale: Duration::ZERO,
            ..RunConfig::default()
        }
    }

    pub fn to_convert_config(&self, pdf_dir: &Path, output_dir: &Path) -> ConvertConfig {
        ConvertConfig {
            pdf_dir: pdf_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            command: self.command.clone(),
            backend: self.backend.clone(),
            method: self.method.clone(),
            lang: self.lang.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    pub columns: ColumnsSection,
}

/// CSV header names (default: Scopus export)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnsSection {
    pub title: String,
    pub doi: String,
    pub year: String,
    pub authors: String,
    pub journal: String,
}

impl Default for ColumnsSection {
    fn default() -> Self {
        let d = CsvColumns::default();
        Self {
            title: d.title,
            doi: d.doi,
            year: d.year,
            authors: d.authors,
            journal: d.journal,
        }
    }
}

impl From<&ColumnsSection> for CsvColumns {
    fn from(c: &ColumnsSection) -> Self {
        Self {
            title: c.title.clone(),
            doi: c.doi.clone(),
            year: c.year.clone(),
            authors: c.authors.clone(),
            journal: c.journal.clone(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Like [`deserialize_env_var`] for required values; an unset variable is an error.
fn deserialize_env_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    expand_env_var(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("environment variable in {s} is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./paperflow.toml (current directory)
    /// 2. ~/.config/paperflow/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("paperflow.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "paperflow") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.paths.mineru_dir, PathBuf::from("./data/mineru"));
        assert_eq!(config.mineru.command, "mineru");
        assert_eq!(config.catalog.columns.title, "Title");
        assert!(config.runner.workers.is_none());
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("PAPERFLOW_TEST_VAR", "test_value");
        assert_eq!(
            expand_env_var("${PAPERFLOW_TEST_VAR}"),
            Some("test_value".to_string())
        );
        std::env::remove_var("PAPERFLOW_TEST_VAR");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[paths]
mineru_dir = "/srv/mineru"

[runner]
workers = 4
batch_interval_secs = 0.5

[llm]
model = "gemini-2.5-flash"
api_key = "sk-literal"

[embedding]
dimensions = 1024

[mineru]
backend = "vlm"

[mineru.runner]
workers = 2

[catalog.columns]
title = "文献标题"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.paths.mineru_dir, PathBuf::from("/srv/mineru"));
        assert_eq!(config.paths.info_dir, PathBuf::from("./data/info"));
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-literal"));
        assert_eq!(config.embedding.dimensions, Some(1024));
        assert_eq!(config.mineru.backend, "vlm");
        assert_eq!(config.catalog.columns.title, "文献标题");
        assert_eq!(config.catalog.columns.doi, "DOI");

        let run = config.runner.apply(RunConfig::default()).unwrap();
        assert_eq!(run.num_workers, 4);
        assert_eq!(run.batch_interval, Duration::from_millis(500));
        assert_eq!(run.batch_size, 200);

        let convert = config.mineru.runner.apply(MineruSection::run_defaults()).unwrap();
        assert_eq!(convert.num_workers, 2);
        assert_eq!(convert.batch_size, 1);
    }

    #[test]
    fn negative_interval_rejected() {
        let section = RunnerSection {
            batch_interval_secs: Some(-1.0),
            ..RunnerSection::default()
        };
        assert!(section.apply(RunConfig::default()).is_err());
    }

    #[test]
    fn unset_required_env_is_error() {
        let toml = "[llm]\nbase_url = \"${NONEXISTENT_VAR_67890}\"\n";
        let err = toml::from_str::<Config>(toml).unwrap_err();
        assert!(err.to_string().contains("NONEXISTENT_VAR_67890"));
    }

    #[test]
    fn from_file_reports_path_on_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[paths]\nindex = \"idx.lance\"\n").unwrap();
        assert_eq!(
            Config::from_file(&good).unwrap().paths.index,
            PathBuf::from("idx.lance")
        );

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[paths\n").unwrap();
        let err = Config::from_file(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }
}
