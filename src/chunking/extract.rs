//! Pre-order walk that classifies document nodes into raw chunks.

use super::Chunk;
use crate::markdown::{Node, NodeKind};

/// Walk the tree in reading order and emit one chunk per qualifying node.
///
/// Rules, applied when a node is first entered:
///
/// - Level 1/2 headings emit nothing for the heading itself; their text is prepended to the
///   paragraph that immediately follows them.
/// - A paragraph without a previous sibling is skipped. A paragraph after a level 1/2 heading
///   yields `"<heading>\n<inline text>\n"`, any other paragraph `"\n<inline text>\n"`.
/// - Fenced code blocks yield their literal lines concatenated; an empty block yields nothing.
/// - Text, string and code-span leaves outside paragraphs yield their literal value.
/// - Lists yield a single chunk with `" - "` before each item's text runs.
///
/// Paragraphs, code blocks and lists are consumed whole; every other node is descended into.
pub fn extract(root: &Node) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    visit(root, None, &mut chunks);
    chunks
}

fn visit(node: &Node, previous: Option<&Node>, chunks: &mut Vec<Chunk>) {
    tracing::trace!(kind = node.kind.name(), "Node");

    match &node.kind {
        NodeKind::Paragraph => {
            if let Some(text) = paragraph_chunk_text(node, previous) {
                emit(chunks, text);
            }
            return;
        }
        NodeKind::FencedCode { lines, .. } => {
            let code = lines.concat();
            if !code.is_empty() {
                emit(chunks, code);
            }
            return;
        }
        NodeKind::Text(value) | NodeKind::String(value) | NodeKind::CodeSpan(value) => {
            emit(chunks, value.clone());
            return;
        }
        NodeKind::List { .. } => {
            let mut buffer = String::new();
            append_list_text(node, &mut buffer);
            emit(chunks, buffer);
            return;
        }
        _ => {}
    }

    for (index, child) in node.children.iter().enumerate() {
        let previous = index.checked_sub(1).map(|prev| &node.children[prev]);
        visit(child, previous, chunks);
    }
}

fn emit(chunks: &mut Vec<Chunk>, text: String) {
    tracing::debug!(chunk = %text, "Chunk from markdown");
    chunks.push(Chunk::new(text));
}

// A paragraph with no previous sibling is dropped, which mostly hits the first paragraph of a
// document without front matter.
fn paragraph_chunk_text(paragraph: &Node, previous: Option<&Node>) -> Option<String> {
    let previous = previous?;
    let body = paragraph_text(paragraph);
    match previous.heading_level() {
        Some(1 | 2) => Some(format!("{}\n{}\n", previous.plain_text(), body)),
        _ => Some(format!("\n{body}\n")),
    }
}

/// Inline text of a paragraph.
///
/// Text, string and code-span children contribute their literal value, emphasis contributes its
/// direct text/string children only, links contribute nothing. A space follows each child while
/// the buffer is non-empty and another sibling remains.
fn paragraph_text(paragraph: &Node) -> String {
    let mut buffer = String::new();
    let count = paragraph.children.len();

    for (index, child) in paragraph.children.iter().enumerate() {
        match &child.kind {
            NodeKind::Text(value) | NodeKind::String(value) | NodeKind::CodeSpan(value) => {
                buffer.push_str(value);
            }
            NodeKind::Emphasis { .. } => {
                for inner in &child.children {
                    if let NodeKind::Text(value) | NodeKind::String(value) = &inner.kind {
                        buffer.push_str(value);
                    }
                }
            }
            // Link labels are not part of the paragraph text.
            _ => {}
        }
        if !buffer.is_empty() && index + 1 < count {
            buffer.push(' ');
        }
    }

    buffer
}

fn append_list_text(node: &Node, buffer: &mut String) {
    match &node.kind {
        NodeKind::ListItem => buffer.push_str(" - "),
        NodeKind::Text(value) | NodeKind::String(value) | NodeKind::CodeSpan(value) => {
            buffer.push_str(value);
            return;
        }
        _ => {}
    }
    for child in &node.children {
        append_list_text(child, buffer);
    }
}
