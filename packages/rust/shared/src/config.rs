//! Application configuration for Tenderlens.
//!
//! User config lives at `~/.tenderlens/tenderlens.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file; the config names the env var.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TenderlensError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tenderlens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tenderlens";

// ---------------------------------------------------------------------------
// Config structs (matching tenderlens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Chunk assembly bounds.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Completion provider settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory for per-document index artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Number of chunks returned by retrieval.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            top_k: default_top_k(),
        }
    }
}

fn default_data_dir() -> String {
    "~/tenderlens-data".into()
}
fn default_top_k() -> usize {
    5
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk for tree-walk assembly.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Overlap characters seeded across a length split.
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Window size for the page-text fallback.
    #[serde(default = "default_page_max_chars")]
    pub page_max_chars: usize,

    /// Window overlap for the page-text fallback.
    #[serde(default = "default_overlap")]
    pub page_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap: default_overlap(),
            page_max_chars: default_page_max_chars(),
            page_overlap: default_overlap(),
        }
    }
}

fn default_max_chars() -> usize {
    2500
}
fn default_overlap() -> usize {
    200
}
fn default_page_max_chars() -> usize {
    2000
}

/// `[embeddings]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Provider: "openai" or "local" (deterministic dev fallback).
    #[serde(default = "default_emb_provider")]
    pub provider: String,

    /// Embedding model identifier.
    #[serde(default = "default_emb_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_emb_key_env")]
    pub api_key_env: String,

    /// Optional API base override (e.g. a proxy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_emb_provider(),
            model: default_emb_model(),
            api_key_env: default_emb_key_env(),
            api_base: None,
        }
    }
}

fn default_emb_provider() -> String {
    "openai".into()
}
fn default_emb_model() -> String {
    "text-embedding-3-small".into()
}
fn default_emb_key_env() -> String {
    "OPENAI_API_KEY".into()
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Completion model identifier.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    /// Optional API base override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Character budget for the extraction context window.
    #[serde(default = "default_context_chars")]
    pub max_context_chars: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            api_key_env: default_llm_key_env(),
            api_base: None,
            max_context_chars: default_context_chars(),
        }
    }
}

fn default_llm_model() -> String {
    "llama3-70b-8192".into()
}
fn default_llm_key_env() -> String {
    "GROQ_API_KEY".into()
}
fn default_context_chars() -> usize {
    8000
}

impl AppConfig {
    /// Resolved root directory for per-document index artifacts.
    pub fn index_root(&self) -> PathBuf {
        expand_home(&self.defaults.data_dir).join("index")
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tenderlens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TenderlensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tenderlens/tenderlens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TenderlensError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TenderlensError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TenderlensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TenderlensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TenderlensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the env var a config section names.
pub fn api_key_from_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(TenderlensError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("GROQ_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.top_k, 5);
        assert_eq!(parsed.chunking.max_chars, 2500);
        assert_eq!(parsed.embeddings.provider, "openai");
        assert_eq!(parsed.completion.max_context_chars, 8000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
data_dir = "/tmp/tl"

[embeddings]
provider = "local"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.data_dir, "/tmp/tl");
        assert_eq!(config.defaults.top_k, 5);
        assert_eq!(config.embeddings.provider, "local");
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.index_root(), PathBuf::from("/tmp/tl/index"));
    }

    #[test]
    fn api_key_validation() {
        // Unique env var name to avoid interfering with other tests
        let result = api_key_from_env("TL_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
