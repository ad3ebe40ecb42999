//! Rule-based summary extraction, the safety net behind the model path.
//!
//! Operates only on the first five chunks' concatenated text. Every field
//! rule is independent; a field with no match stays empty, and a partial
//! record is valid output.

use std::sync::LazyLock;

use regex::Regex;

use tenderlens_shared::{Chunk, SummaryRecord, truncate_chars};

/// Chunks scanned by the heuristic rules (and cited as coarse provenance).
pub(crate) const HEAD_CHUNKS: usize = 5;

/// Longest `scope_of_work` extract, in characters.
const SCOPE_MAX_CHARS: usize = 300;

/// Most compliance note lines collected.
const MAX_COMPLIANCE_NOTES: usize = 6;

static SKIP_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(page\s*\d+|table of contents)\b").unwrap());

static ISSUER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:Corporation|Company|Department|Ministry|Government|Govt\.?|Ltd\.?|Limited|Authority|NMDC|BIOM)[:\s,\-]*([^\n]{3,80})",
    )
    .unwrap()
});

static EMD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:EMD|Earnest Money(?: Deposit)?)[^\n:]*[:\-]?\s*(₹|INR|Rs\.?|RUPEES)?\s*([\d,]+(?:\.\d{1,2})?)",
    )
    .unwrap()
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Duration|Period)[^\n:]*[:\-]?\s*(\d+\s*(?:day|month|year)s?)").unwrap()
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Location|Place of work)[^\n:]*[:\-]?\s*([^\n]{3,80})").unwrap()
});

static SCOPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)Scope of Work[\s\-:]*(.{0,500})").unwrap());

static COMPLIANCE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(eligibility|turnover|experience|bid security|emd|bank guarantee|penalty|liquidated damages)",
    )
    .unwrap()
});

/// Extract a summary from the first few chunks by line scans and regexes.
///
/// Returns the record together with the chunks it scanned, as citations.
pub fn extract_summary_rules(chunks: &[Chunk]) -> (SummaryRecord, Vec<Chunk>) {
    let head: Vec<Chunk> = chunks.iter().take(HEAD_CHUNKS).cloned().collect();
    let text = head
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let record = SummaryRecord {
        tender_name: tender_name(&text),
        issuer: ISSUER.find(&text).map(|m| m.as_str().trim().to_string()),
        emd_amount: emd_amount(&text),
        location: LOCATION
            .captures(&text)
            .map(|c| c[1].trim().to_string()),
        duration: DURATION.captures(&text).map(|c| c[1].to_string()),
        scope_of_work: scope_of_work(&text),
        compliance_notes: compliance_notes(&text),
    };

    (record, head)
}

/// First non-empty, reasonably short, header-ish line.
fn tender_name(text: &str) -> Option<String> {
    text.lines().map(str::trim).find_map(|s| {
        let len = s.chars().count();
        if (6..=140).contains(&len) && !SKIP_HEADER.is_match(s) {
            Some(s.to_string())
        } else {
            None
        }
    })
}

/// Currency marker plus numeric value following an EMD keyword.
fn emd_amount(text: &str) -> Option<String> {
    EMD.captures(text).map(|c| {
        let currency = c.get(1).map(|m| m.as_str()).unwrap_or("");
        let value = &c[2];
        format!("{currency} {value}").trim().to_string()
    })
}

/// Up to two sentences following a "Scope of Work" heading, capped in length.
fn scope_of_work(text: &str) -> Option<String> {
    SCOPE.captures(text).map(|c| {
        let snippet = c[1].trim();
        truncate_chars(first_sentences(snippet, 2).trim(), SCOPE_MAX_CHARS)
    })
}

/// Join the first `count` sentences, splitting where a terminator is
/// followed by whitespace.
fn first_sentences(text: &str, count: usize) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut rest = text;

    while parts.len() < count && !rest.is_empty() {
        let mut split_at = None;
        let mut prev_terminator = false;
        for (i, ch) in rest.char_indices() {
            if prev_terminator && ch.is_whitespace() {
                split_at = Some(i);
                break;
            }
            prev_terminator = matches!(ch, '.' | '!' | '?');
        }
        match split_at {
            Some(i) => {
                parts.push(rest[..i].trim_end());
                rest = rest[i..].trim_start();
            }
            None => {
                parts.push(rest);
                rest = "";
            }
        }
    }
    parts.join(" ")
}

/// Short bullet-like lines mentioning a compliance-related keyword.
fn compliance_notes(text: &str) -> Vec<String> {
    let mut notes = Vec::new();
    for line in text.lines() {
        let s = line.trim_matches([' ', '-', '*', '•', '\t']);
        let len = s.chars().count();
        if (6..=160).contains(&len) && COMPLIANCE_TERMS.is_match(s) {
            notes.push(s.to_string());
            if notes.len() >= MAX_COMPLIANCE_NOTES {
                break;
            }
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            chunk_id: "s0_0".into(),
            page: 1,
            text: text.into(),
            section_hint: None,
        }
    }

    #[test]
    fn picks_first_header_like_line() {
        let text = "Page 3\nTOC\nTender for Road Construction\nmore body text here";
        let chunks = vec![chunk(text)];
        let (record, cited) = extract_summary_rules(&chunks);
        assert_eq!(
            record.tender_name.as_deref(),
            Some("Tender for Road Construction")
        );
        assert_eq!(cited.len(), 1);
    }

    #[test]
    fn skips_page_and_toc_lines() {
        assert_eq!(tender_name("   Page 12 of 40   \nTable of Contents\n"), None);
    }

    #[test]
    fn emd_with_currency_marker() {
        let (record, _) = extract_summary_rules(&[chunk("EMD: Rs. 50,000 payable at Raipur")]);
        let emd = record.emd_amount.unwrap();
        assert!(emd.contains("50,000"));
        assert!(emd.starts_with("Rs."));
    }

    #[test]
    fn emd_without_currency_marker() {
        let (record, _) = extract_summary_rules(&[chunk("Earnest Money Deposit: 125000.50")]);
        assert_eq!(record.emd_amount.as_deref(), Some("125000.50"));
    }

    #[test]
    fn issuer_keyword_anchor() {
        let (record, _) =
            extract_summary_rules(&[chunk("Issued by the National Mineral Development Corporation Ltd. Hyderabad")]);
        let issuer = record.issuer.unwrap();
        assert!(issuer.contains("Corporation"));
    }

    #[test]
    fn duration_and_location() {
        let text = "Period of completion: 18 months\nLocation of site: Bailadila, Chhattisgarh";
        let (record, _) = extract_summary_rules(&[chunk(text)]);
        assert_eq!(record.duration.as_deref(), Some("18 months"));
        assert_eq!(
            record.location.as_deref(),
            Some("Bailadila, Chhattisgarh")
        );
    }

    #[test]
    fn scope_takes_two_sentences_capped() {
        let text = "Scope of Work: Construction of approach road. Widening of existing carriageway. Drainage works follow.";
        let (record, _) = extract_summary_rules(&[chunk(text)]);
        let scope = record.scope_of_work.unwrap();
        assert!(scope.starts_with("Construction of approach road."));
        assert!(scope.contains("Widening"));
        assert!(!scope.contains("Drainage"));
        assert!(scope.chars().count() <= 300);
    }

    #[test]
    fn compliance_lines_collected_and_capped() {
        let lines: Vec<String> = (0..10)
            .map(|i| format!("- Bidder turnover requirement number {i}"))
            .collect();
        let (record, _) = extract_summary_rules(&[chunk(&lines.join("\n"))]);
        assert_eq!(record.compliance_notes.len(), 6);
        assert!(record.compliance_notes[0].starts_with("Bidder turnover"));
    }

    #[test]
    fn only_first_five_chunks_are_scanned() {
        let mut chunks: Vec<Chunk> = (0..5).map(|_| chunk("filler body text line")).collect();
        chunks.push(chunk("EMD: Rs. 99,999"));
        let (record, cited) = extract_summary_rules(&chunks);
        assert_eq!(record.emd_amount, None);
        assert_eq!(cited.len(), 5);
    }

    #[test]
    fn no_matches_yield_partial_record() {
        let (record, _) = extract_summary_rules(&[chunk("x")]);
        assert_eq!(record.tender_name, None);
        assert!(record.compliance_notes.is_empty());
    }
}
