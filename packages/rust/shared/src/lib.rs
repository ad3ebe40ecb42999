//! Shared types, error model, and configuration for Tenderlens.
//!
//! This crate is the foundation depended on by all other Tenderlens crates.
//! It provides:
//! - [`TenderlensError`] — the unified error type
//! - Domain types ([`Chunk`], [`Citation`], [`SummaryRecord`], [`IndexMeta`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkingConfig, CompletionConfig, DefaultsConfig, EmbeddingsConfig,
    api_key_from_env, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, TenderlensError};
pub use types::{Chunk, Citation, IndexMeta, SNIPPET_MAX_CHARS, SummaryRecord, truncate_chars};
