//! Embedding capability: trait, HTTP client, and deterministic local fallback.
//!
//! The contract is order-preserving — one vector per input text, and the
//! embedding of a text is independent of which batch it was sent in.

use std::future::Future;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use tenderlens_shared::{EmbeddingsConfig, Result, TenderlensError, api_key_from_env};

/// Dimension of the deterministic local embedding.
pub const LOCAL_EMBED_DIM: usize = 384;

/// Texts per embedding request. Tuning only — results do not depend on it.
const EMBED_BATCH: usize = 64;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

/// An order-preserving embedding capability.
///
/// Must be deterministic for identical `(text, model)` pairs within one
/// build/query pair; mixing models between build and query is a caller error.
pub trait EmbeddingClient {
    fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible HTTP client
// ---------------------------------------------------------------------------

/// Embedding client for the OpenAI `/embeddings` endpoint (or a compatible proxy).
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    http: reqwest::Client,
    api_base: Url,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is valid"),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Override the API base (must end with a trailing slash).
    pub fn with_api_base(mut self, base: Url) -> Self {
        self.api_base = base;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .api_base
            .join("embeddings")
            .map_err(|e| TenderlensError::Embedding(format!("bad API base: {e}")))?;

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TenderlensError::Embedding(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| TenderlensError::Embedding(format!("provider returned error: {e}")))?;

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| TenderlensError::Embedding(format!("invalid response body: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(TenderlensError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // Re-place rows by index so response ordering never matters.
        let mut rows = parsed.data;
        rows.sort_by_key(|r| r.index);
        Ok(rows.into_iter().map(|r| r.embedding).collect())
    }
}

impl EmbeddingClient for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        debug!(texts = texts.len(), model = %self.model, "embedded batch");
        Ok(vectors)
    }
}

// ---------------------------------------------------------------------------
// Deterministic local fallback
// ---------------------------------------------------------------------------

/// Deterministic hash-expansion embeddings (dev/test only).
///
/// Each text hashes to a fixed 384-dim vector with components in `[0, 1)`.
/// No semantic signal — exists so the pipeline runs without a provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEmbeddings;

impl HashEmbeddings {
    fn vector(text: &str) -> Vec<f32> {
        let mut vals = Vec::with_capacity(LOCAL_EMBED_DIM);
        let mut pool: [u8; 32] = Sha256::digest(text.as_bytes()).into();

        while vals.len() < LOCAL_EMBED_DIM {
            pool = Sha256::digest(pool).into();
            for word in pool.chunks_exact(4) {
                let v = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
                vals.push((v % 100_000) as f32 / 100_000.0);
                if vals.len() == LOCAL_EMBED_DIM {
                    break;
                }
            }
        }
        vals
    }
}

impl EmbeddingClient for HashEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

// ---------------------------------------------------------------------------
// Config-selected embedder
// ---------------------------------------------------------------------------

/// The embedding provider selected by configuration.
///
/// The same variant must serve both index build and query for a given
/// document; the store records which one built each index.
#[derive(Debug, Clone)]
pub enum Embedder {
    OpenAi(OpenAiEmbeddings),
    Local(HashEmbeddings),
}

impl Embedder {
    /// Build an embedder from the `[embeddings]` config section.
    ///
    /// The OpenAI variant requires its API key env var to be set.
    pub fn from_config(cfg: &EmbeddingsConfig) -> Result<Self> {
        match cfg.provider.as_str() {
            "openai" => {
                let key = api_key_from_env(&cfg.api_key_env)?;
                let mut client = OpenAiEmbeddings::new(key, cfg.model.clone());
                if let Some(base) = &cfg.api_base {
                    let url = Url::parse(base).map_err(|e| {
                        TenderlensError::config(format!("bad embeddings api_base '{base}': {e}"))
                    })?;
                    client = client.with_api_base(url);
                }
                Ok(Self::OpenAi(client))
            }
            "local" => Ok(Self::Local(HashEmbeddings)),
            other => Err(TenderlensError::config(format!(
                "unknown embeddings provider '{other}': expected 'openai' or 'local'"
            ))),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::Local(_) => "local",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            Self::OpenAi(client) => client.model(),
            Self::Local(_) => "sha256-expand",
        }
    }
}

impl EmbeddingClient for Embedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::OpenAi(client) => client.embed(texts).await,
            Self::Local(client) => client.embed(texts).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embeddings_shape_and_range() {
        let vecs = HashEmbeddings
            .embed(&["EMD clause".to_string(), "scope".to_string()])
            .await
            .unwrap();
        assert_eq!(vecs.len(), 2);
        for v in &vecs {
            assert_eq!(v.len(), LOCAL_EMBED_DIM);
            assert!(v.iter().all(|x| (0.0..1.0).contains(x)));
        }
    }

    #[tokio::test]
    async fn hash_embeddings_deterministic() {
        let a = HashEmbeddings.embed(&["same text".to_string()]).await.unwrap();
        let b = HashEmbeddings.embed(&["same text".to_string()]).await.unwrap();
        assert_eq!(a, b);

        let c = HashEmbeddings.embed(&["other text".to_string()]).await.unwrap();
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn batch_boundaries_do_not_change_results() {
        let texts: Vec<String> = (0..3).map(|i| format!("text {i}")).collect();
        let whole = HashEmbeddings.embed(&texts).await.unwrap();

        let mut parts = HashEmbeddings.embed(&texts[..1]).await.unwrap();
        parts.extend(HashEmbeddings.embed(&texts[1..]).await.unwrap());
        assert_eq!(whole, parts);
    }

    #[test]
    fn embedding_request_serializes() {
        let input = vec!["a".to_string()];
        let req = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &input,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""model":"text-embedding-3-small""#));
        assert!(json.contains(r#""input":["a"]"#));
    }

    #[test]
    fn embedding_response_rows_reorder_by_index() {
        let json = r#"{"data":[
            {"index":1,"embedding":[0.5]},
            {"index":0,"embedding":[0.25]}
        ]}"#;
        let mut parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        parsed.data.sort_by_key(|r| r.index);
        assert_eq!(parsed.data[0].embedding, vec![0.25]);
        assert_eq!(parsed.data[1].embedding, vec![0.5]);
    }

    #[test]
    fn embedder_from_config_rejects_unknown_provider() {
        let cfg = EmbeddingsConfig {
            provider: "cohere".into(),
            ..Default::default()
        };
        assert!(Embedder::from_config(&cfg).is_err());
    }

    #[test]
    fn embedder_from_config_local_needs_no_key() {
        let cfg = EmbeddingsConfig {
            provider: "local".into(),
            ..Default::default()
        };
        let embedder = Embedder::from_config(&cfg).unwrap();
        assert_eq!(embedder.provider_name(), "local");
        assert_eq!(embedder.model_name(), "sha256-expand");
    }
}
