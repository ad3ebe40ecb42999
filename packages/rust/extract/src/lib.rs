//! Structured extraction: completion-backed summary extraction with a
//! multi-stage fallback chain, plus Q&A over retrieved chunks.
//!
//! The engine always returns a [`SummaryRecord`] — a failing completion
//! degrades to empty output, unparseable output falls through JSON
//! recovery, and an empty record triggers rule-based extraction.

mod heuristics;
mod prompt;
mod recover;
pub mod qa;

use tracing::{debug, instrument, warn};

use tenderlens_providers::CompletionClient;
use tenderlens_shared::{Chunk, SummaryRecord};

pub use heuristics::extract_summary_rules;
pub use prompt::{SUMMARY_FIELDS, build_summary_prompt};
pub use qa::{NOT_FOUND_ANSWER, QaAnswer, answer_question, build_qa_prompt};

/// Sampling temperature for extraction completions.
const EXTRACTION_TEMPERATURE: f32 = 0.0;

/// Token cap for extraction completions.
const EXTRACTION_MAX_TOKENS: u32 = 600;

/// Number of leading chunks cited for the model path.
const CITED_CHUNKS: usize = 5;

/// Extract a summary record from a document's chunks.
///
/// Stages, terminal on first success:
/// 1. prompt-bounded completion at near-zero temperature
/// 2. JSON recovery from the free-form output
/// 3. schema coercion into the fixed field set
/// 4. rule-based fallback when recovery fails or the record is empty
///
/// Citations are the first five input chunks on either path — coarse
/// provenance, not the chunks the model actually used.
#[instrument(skip_all, fields(chunks = chunks.len()))]
pub async fn extract_summary<C: CompletionClient>(
    client: &C,
    chunks: &[Chunk],
    max_context_chars: usize,
) -> (SummaryRecord, Vec<Chunk>) {
    if chunks.is_empty() {
        return (SummaryRecord::default(), Vec::new());
    }

    let prompt = build_summary_prompt(chunks, max_context_chars);

    let raw = match client
        .complete(&prompt, EXTRACTION_TEMPERATURE, EXTRACTION_MAX_TOKENS)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "completion unavailable, treating output as empty");
            String::new()
        }
    };

    let record = recover::recover_object(&raw)
        .map(|value| recover::coerce_record(&value))
        .unwrap_or_default();

    if record.is_empty() {
        debug!("model extraction empty or unparseable, using rule-based fallback");
        return extract_summary_rules(chunks);
    }

    let cited = chunks.iter().take(CITED_CHUNKS).cloned().collect();
    (record, cited)
}
