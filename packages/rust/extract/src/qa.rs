//! Question answering over retrieved chunks.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{instrument, warn};

use tenderlens_providers::CompletionClient;
use tenderlens_shared::{Chunk, Citation};

/// Canonical reply when the context does not contain an answer.
pub const NOT_FOUND_ANSWER: &str = "Not found in tender";

const QA_TEMPERATURE: f32 = 0.0;
const QA_MAX_TOKENS: u32 = 256;

static ANSWER_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^answer\s*:\s*").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static PDF_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.pdf\b").unwrap());

/// An answer with the chunks it was drawn from.
#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Build the answer-from-context prompt.
///
/// Context blocks carry bare chunk text — no headers, so the model has
/// nothing to echo back as filenames or ids.
pub fn build_qa_prompt(question: &str, chunks: &[Chunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "You are a helpful tender Q&A assistant.\n\
         - Answer strictly from the context. If the answer is not present, reply exactly: {NOT_FOUND_ANSWER}.\n\
         - Return only the answer text. Do not include filenames, IDs, or any preamble.\n\
         - Be concise.\n\n\
         Context:\n{context}\n\nQuestion: {question}\nAnswer:"
    )
}

/// Answer a question against already-ranked chunks.
///
/// A failed completion degrades to [`NOT_FOUND_ANSWER`]; this never errors.
#[instrument(skip_all, fields(ranked = ranked.len()))]
pub async fn answer_question<C: CompletionClient>(
    client: &C,
    question: &str,
    ranked: &[(Chunk, f32)],
    document_id: &str,
) -> QaAnswer {
    let chunks: Vec<Chunk> = ranked.iter().map(|(c, _)| c.clone()).collect();
    let prompt = build_qa_prompt(question, &chunks);

    let raw = match client.complete(&prompt, QA_TEMPERATURE, QA_MAX_TOKENS).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "completion unavailable for Q&A");
            String::new()
        }
    };

    QaAnswer {
        answer: postprocess_answer(&raw, document_id),
        citations: chunks.iter().map(Citation::from_chunk).collect(),
    }
}

/// Clean a raw model answer and suppress filename/id echoes.
fn postprocess_answer(raw: &str, document_id: &str) -> String {
    let ans = ANSWER_LABEL.replace(raw.trim(), "");
    let ans = WHITESPACE_RUN.replace_all(ans.trim(), " ").to_string();

    if ans.is_empty() || ans == document_id || PDF_TOKEN.is_match(&ans) {
        NOT_FOUND_ANSWER.to_string()
    } else {
        ans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderlens_shared::{Result, TenderlensError};

    struct FixedCompletion(&'static str);

    impl CompletionClient for FixedCompletion {
        async fn complete(&self, _: &str, _: f32, _: u32) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct DownCompletion;

    impl CompletionClient for DownCompletion {
        async fn complete(&self, _: &str, _: f32, _: u32) -> Result<String> {
            Err(TenderlensError::Completion("timeout".into()))
        }
    }

    fn ranked() -> Vec<(Chunk, f32)> {
        vec![(
            Chunk {
                chunk_id: "s0_0".into(),
                page: 4,
                text: "The EMD is Rs. 50,000.".into(),
                section_hint: Some("Terms".into()),
            },
            0.92,
        )]
    }

    #[test]
    fn prompt_separates_context_blocks() {
        let chunks: Vec<Chunk> = ranked().into_iter().map(|(c, _)| c).collect();
        let prompt = build_qa_prompt("What is the EMD?", &chunks);
        assert!(prompt.contains("The EMD is Rs. 50,000."));
        assert!(prompt.contains("Question: What is the EMD?"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn postprocess_strips_label_and_collapses_whitespace() {
        assert_eq!(
            postprocess_answer("Answer:   Rs. 50,000\n(refundable)", "doc"),
            "Rs. 50,000 (refundable)"
        );
    }

    #[test]
    fn postprocess_suppresses_echoes() {
        assert_eq!(postprocess_answer("", "doc"), NOT_FOUND_ANSWER);
        assert_eq!(
            postprocess_answer("tenders/abc.pdf", "doc"),
            NOT_FOUND_ANSWER
        );
        assert_eq!(postprocess_answer("doc-42", "doc-42"), NOT_FOUND_ANSWER);
    }

    #[tokio::test]
    async fn answer_carries_citations() {
        let result = answer_question(
            &FixedCompletion("Answer: Rs. 50,000"),
            "What is the EMD?",
            &ranked(),
            "doc",
        )
        .await;
        assert_eq!(result.answer, "Rs. 50,000");
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].page, Some(4));
        assert_eq!(result.citations[0].chunk_id.as_deref(), Some("s0_0"));
    }

    #[tokio::test]
    async fn failed_completion_degrades_to_not_found() {
        let result = answer_question(&DownCompletion, "anything", &ranked(), "doc").await;
        assert_eq!(result.answer, NOT_FOUND_ANSWER);
        assert_eq!(result.citations.len(), 1);
    }
}
