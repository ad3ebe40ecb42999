//! Prompt construction for structured summary extraction.

use tenderlens_shared::Chunk;

/// The fixed field set the extraction prompt demands.
pub const SUMMARY_FIELDS: [&str; 7] = [
    "tender_name",
    "issuer",
    "emd_amount",
    "location",
    "duration",
    "scope_of_work",
    "compliance_notes",
];

/// Build the instruction + context prompt for summary extraction.
///
/// Chunks are concatenated in their original order, each tagged with its
/// provenance, until the next whole chunk would exceed `max_chars`. A chunk
/// is either fully included or excluded — never truncated mid-chunk.
pub fn build_summary_prompt(chunks: &[Chunk], max_chars: usize) -> String {
    let mut context = String::new();
    let mut total = 0usize;

    for c in chunks {
        let span = format!(
            "[page {} | {} | {}]\n{}\n\n",
            c.page,
            c.chunk_id,
            c.section_hint.as_deref().unwrap_or(""),
            c.text
        );
        let len = span.chars().count();
        if total + len > max_chars {
            break;
        }
        context.push_str(&span);
        total += len;
    }

    let instructions = format!(
        "You are a tender document analyzer. Extract the following fields as JSON with keys: {}.\n\
         - tender_name: Short name or title of the tender.\n\
         - issuer: The issuing organization.\n\
         - emd_amount: Earnest Money Deposit value (with currency in rupees).\n\
         - location: Primary location(s) of work.\n\
         - duration: Contract/project duration.\n\
         - scope_of_work: 1-3 sentence summary of key scope.\n\
         - compliance_notes: array of 3-8 short bullets for critical compliance/eligibility/financial terms.\n\n\
         Return ONLY valid JSON. If a value is not found, use null (or [] for arrays).",
        SUMMARY_FIELDS.join(", ")
    );

    format!("{instructions}\n\nContext:\n{context}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, page: u32, text: &str) -> Chunk {
        Chunk {
            chunk_id: id.into(),
            page,
            text: text.into(),
            section_hint: Some("Notice".into()),
        }
    }

    #[test]
    fn prompt_tags_chunk_provenance() {
        let prompt = build_summary_prompt(&[chunk("s0_0", 2, "body")], 8000);
        assert!(prompt.contains("[page 2 | s0_0 | Notice]\nbody"));
        assert!(prompt.contains("Return ONLY valid JSON"));
        for field in SUMMARY_FIELDS {
            assert!(prompt.contains(field), "prompt must name {field}");
        }
    }

    #[test]
    fn chunks_are_whole_or_absent() {
        let big = "x".repeat(300);
        let chunks = vec![
            chunk("s0_0", 1, &big),
            chunk("s1_1", 1, &big),
            chunk("s2_2", 1, &big),
        ];
        // Budget fits one tagged chunk but not two.
        let prompt = build_summary_prompt(&chunks, 400);
        assert!(prompt.contains("s0_0"));
        assert!(!prompt.contains("s1_1"));
        assert!(!prompt.contains("s2_2"));
    }

    #[test]
    fn missing_hint_renders_empty_slot() {
        let c = Chunk {
            chunk_id: "p1_0".into(),
            page: 1,
            text: "t".into(),
            section_hint: None,
        };
        let prompt = build_summary_prompt(&[c], 8000);
        assert!(prompt.contains("[page 1 | p1_0 | ]"));
    }
}
