//! Core domain types for Tenderlens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length (in characters) of a citation text snippet.
pub const SNIPPET_MAX_CHARS: usize = 160;

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A bounded unit of extracted text with page and section provenance.
///
/// The atomic unit of retrieval and citation. Immutable once created;
/// identity is `chunk_id`. Produced only by the chunk assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Opaque identifier, unique within one assembly run.
    pub chunk_id: String,
    /// 1-based page number the chunk starts on.
    pub page: u32,
    /// Chunk body text (non-empty after trimming).
    pub text: String,
    /// Breadcrumb of the heading hierarchy, e.g. `"A > B > C"`.
    #[serde(default)]
    pub section_hint: Option<String>,
}

// ---------------------------------------------------------------------------
// Citation
// ---------------------------------------------------------------------------

/// A pointer back to the chunk a statement was drawn from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_hint: Option<String>,
    /// Leading snippet of the chunk text, at most [`SNIPPET_MAX_CHARS`] chars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_snippet: Option<String>,
}

impl Citation {
    /// Build a citation from a chunk, truncating the snippet on a char boundary.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            page: Some(chunk.page),
            chunk_id: Some(chunk.chunk_id.clone()),
            section_hint: chunk.section_hint.clone(),
            text_snippet: Some(truncate_chars(&chunk.text, SNIPPET_MAX_CHARS)),
        }
    }
}

/// Truncate a string to at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ---------------------------------------------------------------------------
// SummaryRecord
// ---------------------------------------------------------------------------

/// The fixed-schema structured extraction result for a tender document.
///
/// Computed once per document after ingestion and cached as `summary.json`;
/// recomputed only when absent or empty. Partial records are valid output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub tender_name: Option<String>,
    pub issuer: Option<String>,
    pub emd_amount: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub scope_of_work: Option<String>,
    #[serde(default)]
    pub compliance_notes: Vec<String>,
}

impl SummaryRecord {
    /// A record is empty iff every scalar field is null/blank and the
    /// compliance notes list is empty.
    pub fn is_empty(&self) -> bool {
        self.scalar_fields()
            .iter()
            .all(|v| v.map(str::trim).unwrap_or("").is_empty())
            && self.compliance_notes.is_empty()
    }

    fn scalar_fields(&self) -> [Option<&str>; 6] {
        [
            self.tender_name.as_deref(),
            self.issuer.as_deref(),
            self.emd_amount.as_deref(),
            self.location.as_deref(),
            self.duration.as_deref(),
            self.scope_of_work.as_deref(),
        ]
    }
}

// ---------------------------------------------------------------------------
// IndexMeta
// ---------------------------------------------------------------------------

/// Per-document metadata stored as `meta.json` next to the index artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// The document identifier the index was built for (unsanitized).
    pub document_id: String,
    /// Source filename, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Number of distinct pages chunks were drawn from.
    pub page_count: usize,
    /// Number of chunks in the paired chunk list.
    pub chunk_count: usize,
    /// Embedding provider the vectors were produced with.
    pub embedding_provider: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Vector dimension.
    pub dim: usize,
    /// SHA-256 of the raw source bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sha256: Option<String>,
    /// When the index was built.
    pub created_at: DateTime<Utc>,
}
