//! Typed markdown node tree consumed by the chunk extractor.
//!
//! The extractor never looks at markdown syntax. It only walks a [`Node`] tree in which every
//! parent owns its children as a plain `Vec`, so sibling look-back is an index lookup rather than
//! a pointer chase. [`parse`] builds such a tree with `pulldown-cmark`; callers with their own
//! parser can assemble the tree directly through the constructors below.

mod parse;

pub use parse::{parse, split_front_matter};

/// Classification of a node in the parsed document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of a parsed document.
    Document,
    /// ATX or setext heading with its level (1-6).
    Heading {
        /// Heading depth, `1` for `#`.
        level: u8,
    },
    /// Block paragraph containing inline runs.
    Paragraph,
    /// Fenced code block with its literal source lines (line terminators included).
    FencedCode {
        /// Info string following the opening fence.
        info: String,
        /// Literal content lines in order.
        lines: Vec<String>,
    },
    /// Indented code block; carries no children and yields no chunk.
    IndentedCode,
    /// Plain run of text.
    Text(String),
    /// Literal string leaf produced by parsers that resolve entities or escapes separately.
    String(String),
    /// Inline code span with its unwrapped contents.
    CodeSpan(String),
    /// Emphasis (`level == 1`) or strong emphasis (`level == 2`).
    Emphasis {
        /// Number of delimiter characters.
        level: u8,
    },
    /// Inline link; its label lives in the children.
    Link {
        /// Link target.
        destination: String,
    },
    /// Bullet or ordered list.
    List {
        /// Whether the list is numbered.
        ordered: bool,
    },
    /// Single list item.
    ListItem,
    /// Leading metadata block; its raw contents are kept out of the child list.
    FrontMatter(String),
    /// Any other node, labelled for diagnostics.
    Other(&'static str),
}

impl NodeKind {
    /// Short label used in trace output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Heading { .. } => "heading",
            Self::Paragraph => "paragraph",
            Self::FencedCode { .. } => "fenced_code_block",
            Self::IndentedCode => "code_block",
            Self::Text(_) => "text",
            Self::String(_) => "string",
            Self::CodeSpan(_) => "code_span",
            Self::Emphasis { .. } => "emphasis",
            Self::Link { .. } => "link",
            Self::List { .. } => "list",
            Self::ListItem => "list_item",
            Self::FrontMatter(_) => "front_matter",
            Self::Other(label) => label,
        }
    }
}

/// Node of a parsed markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// What this node represents.
    pub kind: NodeKind,
    /// Children in document order.
    pub children: Vec<Node>,
}

impl Node {
    /// Build a node with the given children.
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    /// Build a childless node.
    pub fn leaf(kind: NodeKind) -> Self {
        Self::new(kind, Vec::new())
    }

    /// Document root.
    pub fn document(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Document, children)
    }

    /// Heading of the given level.
    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Heading { level }, children)
    }

    /// Paragraph with inline children.
    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Paragraph, children)
    }

    /// Plain text run.
    pub fn text(value: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text(value.into()))
    }

    /// Inline code span.
    pub fn code_span(value: impl Into<String>) -> Self {
        Self::leaf(NodeKind::CodeSpan(value.into()))
    }

    /// Fenced code block from literal lines.
    pub fn fenced_code<I, S>(info: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::leaf(NodeKind::FencedCode {
            info: info.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        })
    }

    /// List whose children are list items.
    pub fn list(ordered: bool, items: Vec<Node>) -> Self {
        Self::new(NodeKind::List { ordered }, items)
    }

    /// List item.
    pub fn list_item(children: Vec<Node>) -> Self {
        Self::new(NodeKind::ListItem, children)
    }

    /// Heading level when this node is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            NodeKind::Heading { level } => Some(level),
            _ => None,
        }
    }

    /// Concatenated literal text of every text, string and code-span leaf below this node.
    pub fn plain_text(&self) -> String {
        let mut buffer = String::new();
        self.collect_plain_text(&mut buffer);
        buffer
    }

    fn collect_plain_text(&self, buffer: &mut String) {
        match &self.kind {
            NodeKind::Text(value) | NodeKind::String(value) | NodeKind::CodeSpan(value) => {
                buffer.push_str(value);
            }
            _ => {
                for child in &self.children {
                    child.collect_plain_text(buffer);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_collects_nested_leaves() {
        let heading = Node::heading(
            2,
            vec![
                Node::text("Install "),
                Node::new(NodeKind::Emphasis { level: 1 }, vec![Node::text("the")]),
                Node::code_span(" cli"),
            ],
        );
        assert_eq!(heading.plain_text(), "Install the cli");
        assert_eq!(heading.heading_level(), Some(2));
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(Node::paragraph(vec![]).kind.name(), "paragraph");
        assert_eq!(Node::leaf(NodeKind::Other("block_quote")).kind.name(), "block_quote");
    }
}
