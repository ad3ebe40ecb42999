//! Classification of parsed-document nodes.
//!
//! The document-parsing service returns a weakly-typed JSON tree whose node
//! shapes vary by parser version. Classification happens once per node,
//! ahead of traversal: each object node maps to an ordered list of tagged
//! facets, and the walker consumes facets without re-probing fields.

use serde_json::{Map, Value};

/// Keys that mark a node as a section header, in priority order.
const TITLE_KEYS: [&str; 3] = ["title", "heading", "name"];

/// Keys that may carry a page number, in priority order.
const PAGE_KEYS: [&str; 4] = ["page", "page_no", "page_index", "pageNumber"];

/// Keys that may carry a figure caption, in priority order.
const CAPTION_KEYS: [&str; 3] = ["caption", "alt", "title"];

/// What a single parsed node contributes to extraction.
///
/// One node can carry several facets at once (a section header that also
/// holds body text, a table node with a caption). Facets are emitted in the
/// order spans must appear: text, then table, then figure.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeFacet {
    /// Pushes a heading onto the section path for the node's subtree.
    Section { title: String },
    /// A paragraph-like body text span.
    TextSpan { text: String, page: Option<u32> },
    /// A tabular grid, rendered as pipe-delimited rows.
    Table { rendered: String, page: Option<u32> },
    /// A figure or image caption.
    Figure { caption: String, page: Option<u32> },
}

/// Classify an object node into its ordered facets.
///
/// Returns an empty vec for nodes that contribute nothing (pure containers).
pub(crate) fn classify(map: &Map<String, Value>) -> Vec<NodeFacet> {
    let mut facets = Vec::new();

    if let Some(title) = first_string(map, &TITLE_KEYS) {
        facets.push(NodeFacet::Section { title });
    }

    if let Some(text) = non_blank_string(map.get("text")) {
        facets.push(NodeFacet::TextSpan {
            text,
            page: node_page(map),
        });
    }

    let kind = map.get("type").and_then(Value::as_str);

    if kind == Some("table") {
        if let Some(Value::Array(rows)) = map.get("cells") {
            if let Some(rendered) = render_grid(rows) {
                facets.push(NodeFacet::Table {
                    rendered,
                    page: page_key_only(map),
                });
            }
        }
    }

    if matches!(kind, Some("figure") | Some("image")) {
        if let Some(caption) = first_string(map, &CAPTION_KEYS) {
            facets.push(NodeFacet::Figure {
                caption,
                page: page_key_only(map),
            });
        }
    }

    facets
}

/// First non-blank string among the given keys, trimmed.
fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| non_blank_string(map.get(*k)))
}

fn non_blank_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Page number from any of the known page keys.
fn node_page(map: &Map<String, Value>) -> Option<u32> {
    PAGE_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(page_value))
}

/// Page number from the bare `page` key only (tables and figures).
fn page_key_only(map: &Map<String, Value>) -> Option<u32> {
    map.get("page").and_then(page_value)
}

fn page_value(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .filter(|p| *p >= 1)
        .and_then(|p| u32::try_from(p).ok())
}

/// Render a 2-D cell grid as pipe-delimited rows, one line per row.
///
/// Non-array rows are skipped; null cells render empty. Returns `None` when
/// no row survives.
fn render_grid(rows: &[Value]) -> Option<String> {
    let lines: Vec<String> = rows
        .iter()
        .filter_map(|row| {
            row.as_array().map(|cells| {
                cells
                    .iter()
                    .map(render_cell)
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn render_cell(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn section_title_priority() {
        let facets = classify(&obj(json!({"heading": "Eligibility", "name": "ignored"})));
        assert_eq!(
            facets,
            vec![NodeFacet::Section {
                title: "Eligibility".into()
            }]
        );
    }

    #[test]
    fn blank_title_is_not_a_section() {
        assert!(classify(&obj(json!({"title": "   "}))).is_empty());
    }

    #[test]
    fn text_span_with_page_alias() {
        let facets = classify(&obj(json!({"text": " body ", "page_no": 4})));
        assert_eq!(
            facets,
            vec![NodeFacet::TextSpan {
                text: "body".into(),
                page: Some(4)
            }]
        );
    }

    #[test]
    fn header_node_can_also_produce_text() {
        let facets = classify(&obj(json!({"title": "Scope", "text": "All civil works."})));
        assert_eq!(facets.len(), 2);
        assert!(matches!(facets[0], NodeFacet::Section { .. }));
        assert!(matches!(facets[1], NodeFacet::TextSpan { .. }));
    }

    #[test]
    fn table_grid_renders_pipe_rows() {
        let facets = classify(&obj(json!({
            "type": "table",
            "page": 2,
            "cells": [["Item", "Qty"], ["Cement", 40], [null, "x"], "bad row"]
        })));
        assert_eq!(
            facets,
            vec![NodeFacet::Table {
                rendered: "Item | Qty\nCement | 40\n | x".into(),
                page: Some(2)
            }]
        );
    }

    #[test]
    fn figure_caption_fallback_keys() {
        let facets = classify(&obj(json!({"type": "image", "alt": "Site layout"})));
        assert_eq!(
            facets,
            vec![NodeFacet::Figure {
                caption: "Site layout".into(),
                page: None
            }]
        );
    }

    #[test]
    fn zero_page_is_ignored() {
        let facets = classify(&obj(json!({"text": "t", "page": 0})));
        assert_eq!(
            facets,
            vec![NodeFacet::TextSpan {
                text: "t".into(),
                page: None
            }]
        );
    }

    #[test]
    fn container_node_has_no_facets() {
        assert!(classify(&obj(json!({"children": [1, 2, 3]}))).is_empty());
    }
}
