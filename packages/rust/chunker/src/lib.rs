//! Chunk assembly: parsed-document tree (or raw page text) → ordered,
//! provenance-tagged chunks.
//!
//! Two entry points:
//! - [`assemble_tree`] walks the JSON-like tree returned by the document
//!   parser, collecting spans with page/section provenance, then merges them
//!   into bounded chunks with overlap across length splits.
//! - [`assemble_pages`] is the fallback when no structural parse is
//!   available: a fixed window slid over each page's raw text.
//!
//! All size arithmetic is in characters, never bytes.

mod node;

use serde_json::Value;
use tracing::{debug, instrument};

use tenderlens_shared::Chunk;

use crate::node::NodeFacet;

/// Bounds for chunk assembly.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    /// Maximum characters accumulated before a chunk is flushed.
    pub max_chars: usize,
    /// Trailing characters carried into the next chunk across a length split.
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_chars: 2500,
            overlap: 200,
        }
    }
}

impl ChunkOptions {
    pub fn new(max_chars: usize, overlap: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            overlap,
        }
    }
}

/// A transient text span produced while walking the parsed tree.
#[derive(Debug, Clone)]
struct Span {
    text: String,
    page: Option<u32>,
    path: Option<String>,
}

// ---------------------------------------------------------------------------
// Tree assembly
// ---------------------------------------------------------------------------

/// Assemble chunks from a parsed-document tree.
///
/// A root that is not a container, or a walk that yields no spans, degrades
/// to a single chunk holding the stringified input — non-empty input never
/// produces zero chunks.
#[instrument(skip_all, fields(max_chars = opts.max_chars, overlap = opts.overlap))]
pub fn assemble_tree(root: &Value, opts: &ChunkOptions) -> Vec<Chunk> {
    let mut spans = Vec::new();

    if root.is_object() || root.is_array() {
        let mut stack: Vec<String> = Vec::new();
        collect_spans(root, &mut stack, &mut spans);
        debug_assert!(stack.is_empty(), "section stack must be balanced");
    }

    if spans.is_empty() {
        debug!("no spans collected, emitting whole-input chunk");
        return degenerate_chunk(root);
    }

    let chunks = merge_spans(&spans, opts);
    debug!(spans = spans.len(), chunks = chunks.len(), "tree assembly complete");
    chunks
}

/// Walk a tree value, threading the section-path stack explicitly.
///
/// Facets at the current node are consumed before recursing into children;
/// a section pushed here is popped on the single exit below.
fn collect_spans(value: &Value, stack: &mut Vec<String>, out: &mut Vec<Span>) {
    match value {
        Value::Object(map) => {
            let mut pushed = false;

            for facet in node::classify(map) {
                match facet {
                    NodeFacet::Section { title } => {
                        stack.push(title);
                        pushed = true;
                    }
                    NodeFacet::TextSpan { text, page } => out.push(Span {
                        text,
                        page,
                        path: joined_path(stack, None),
                    }),
                    NodeFacet::Table { rendered, page } => out.push(Span {
                        text: rendered,
                        page,
                        path: joined_path(stack, Some("Table")),
                    }),
                    NodeFacet::Figure { caption, page } => out.push(Span {
                        text: caption,
                        page,
                        path: joined_path(stack, Some("Figure")),
                    }),
                }
            }

            for child in map.values() {
                collect_spans(child, stack, out);
            }

            if pushed {
                stack.pop();
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_spans(item, stack, out);
            }
        }
        _ => {}
    }
}

/// Breadcrumb for the current stack, or the facet's default label.
fn joined_path(stack: &[String], default: Option<&str>) -> Option<String> {
    if stack.is_empty() {
        default.map(String::from)
    } else {
        Some(stack.join(" > "))
    }
}

/// Single-chunk fallback for input the walker could not interpret.
fn degenerate_chunk(root: &Value) -> Vec<Chunk> {
    let text = match root {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        return Vec::new();
    }
    vec![Chunk {
        chunk_id: "doc_0".into(),
        page: 1,
        text,
        section_hint: None,
    }]
}

// ---------------------------------------------------------------------------
// Merge/split
// ---------------------------------------------------------------------------

/// Merge the ordered span sequence into bounded chunks.
///
/// Spans accumulate while they share a section path; a path change flushes
/// the buffer as one chunk tagged with the run's first page and path. When
/// the accumulated length reaches `max_chars` the buffer flushes and the
/// next one is seeded with the trailing `overlap` characters.
fn merge_spans(spans: &[Span], opts: &ChunkOptions) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut buf: Vec<String> = Vec::new();
    let mut start = 0usize;
    let mut cur_len = 0usize;
    let mut current_path: Option<String> = None;
    let mut current_page: Option<u32> = None;

    for (i, span) in spans.iter().enumerate() {
        if buf.is_empty() {
            start = i;
            current_path = span.path.clone();
            current_page = span.page;
        }

        if span.path != current_path && !buf.is_empty() {
            flush(&mut chunks, &buf, start, current_page, current_path.as_deref());
            buf.clear();
            start = i;
            cur_len = 0;
            current_path = span.path.clone();
            current_page = span.page;
        }

        cur_len += span.text.chars().count();
        buf.push(span.text.clone());

        if cur_len >= opts.max_chars {
            flush(&mut chunks, &buf, start, current_page, current_path.as_deref());
            if opts.overlap > 0 {
                let tail = tail_chars(&buf.join("\n\n"), opts.overlap);
                cur_len = tail.chars().count();
                buf.clear();
                buf.push(tail);
            } else {
                buf.clear();
                cur_len = 0;
            }
            start = i;
            current_path = span.path.clone();
            current_page = span.page;
        }
    }

    flush(&mut chunks, &buf, start, current_page, current_path.as_deref());
    chunks
}

/// Emit the buffered run as one chunk. Blank buffers are dropped.
fn flush(
    chunks: &mut Vec<Chunk>,
    buf: &[String],
    start: usize,
    page: Option<u32>,
    path: Option<&str>,
) {
    if buf.is_empty() {
        return;
    }
    let text = buf.join("\n\n").trim().to_string();
    if text.is_empty() {
        return;
    }
    chunks.push(Chunk {
        chunk_id: format!("s{start}_{}", chunks.len()),
        page: page.unwrap_or(1),
        text,
        section_hint: path.map(String::from),
    });
}

/// Last `n` characters of `s`, on a char boundary.
fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

// ---------------------------------------------------------------------------
// Page-window fallback
// ---------------------------------------------------------------------------

/// Assemble chunks from raw per-page text when no structural parse exists.
///
/// A window of `max_chars` slides over each page independently, stepping by
/// `max_chars - overlap`; windows never cross page boundaries.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn assemble_pages(pages: &[(u32, String)], opts: &ChunkOptions) -> Vec<Chunk> {
    // Overlap must leave forward progress within a page.
    let max_chars = opts.max_chars.max(1);
    let overlap = opts.overlap.min(max_chars - 1);
    let mut chunks = Vec::new();

    for (page_num, text) in pages {
        let page = (*page_num).max(1);
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let mut start = 0usize;

        while start < n {
            let end = (start + max_chars).min(n);
            let window: String = chars[start..end].iter().collect();
            if !window.trim().is_empty() {
                chunks.push(Chunk {
                    chunk_id: format!("p{page}_{start}"),
                    page,
                    text: window,
                    section_hint: None,
                });
            }
            if end == n {
                break;
            }
            start = end - overlap;
        }
    }

    debug!(chunks = chunks.len(), "page-window assembly complete");
    chunks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
