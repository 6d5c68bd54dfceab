//! `pulldown-cmark` adapter that folds the event stream into a [`Node`] tree.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TextMergeStream};

use super::{Node, NodeKind};

/// Parse markdown source into an owned node tree.
///
/// Front matter found by [`split_front_matter`] becomes a single [`NodeKind::FrontMatter`] leaf
/// and only the body after it is handed to the markdown parser. Soft and hard line breaks split
/// text runs so each source line of a paragraph is its own text node.
pub fn parse(source: &str) -> Node {
    let mut builder = TreeBuilder::new();
    let body = match split_front_matter(source) {
        Some((block, body)) => {
            builder.append(Node::leaf(NodeKind::FrontMatter(block.to_string())));
            body
        }
        None => source,
    };

    for event in TextMergeStream::new(Parser::new(body)) {
        builder.push(event);
    }
    builder.finish()
}

/// Split a leading `---` delimited block from the rest of `source`.
///
/// The block opens with a `---` line at the very start (after an optional BOM) and closes at the
/// next `---` or `...` line. Returns the block contents and the body that follows the closing
/// line, or `None` when no closed block opens the source.
pub fn split_front_matter(source: &str) -> Option<(&str, &str)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let rest = source.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let delimiter = line.trim_end_matches(['\r', '\n']);
        if delimiter == "---" || delimiter == "..." {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

struct Frame {
    kind: NodeKind,
    children: Vec<Node>,
}

impl Frame {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    fn into_node(self) -> Node {
        match self.kind {
            NodeKind::FencedCode { info, .. } => {
                let literal = literal_of(&self.children);
                let lines = literal.split_inclusive('\n').map(str::to_string).collect();
                Node::leaf(NodeKind::FencedCode { info, lines })
            }
            NodeKind::IndentedCode => Node::leaf(NodeKind::IndentedCode),
            kind => Node::new(kind, self.children),
        }
    }
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::new(NodeKind::Document)],
        }
    }

    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.stack.push(Frame::new(kind_for(tag))),
            Event::End(_) => self.close(),
            Event::Text(text) => self.append(Node::text(text.into_string())),
            Event::Code(code) => self.append(Node::code_span(code.into_string())),
            Event::Rule => self.append(Node::leaf(NodeKind::Other("thematic_break"))),
            _ => {}
        }
    }

    fn close(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some(frame) = self.stack.pop() {
            self.append(frame.into_node());
        }
    }

    fn append(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack
            .pop()
            .map(Frame::into_node)
            .unwrap_or_else(|| Node::document(Vec::new()))
    }
}

fn kind_for(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Heading { level, .. } => NodeKind::Heading { level: level as u8 },
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::FencedCode {
            info: info.into_string(),
            lines: Vec::new(),
        },
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::IndentedCode,
        Tag::Emphasis => NodeKind::Emphasis { level: 1 },
        Tag::Strong => NodeKind::Emphasis { level: 2 },
        Tag::Link { dest_url, .. } => NodeKind::Link {
            destination: dest_url.into_string(),
        },
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
        },
        Tag::Item => NodeKind::ListItem,
        Tag::HtmlBlock => NodeKind::Other("html_block"),
        Tag::Image { .. } => NodeKind::Other("image"),
        _ => NodeKind::Other("block"),
    }
}

fn literal_of(children: &[Node]) -> String {
    children.iter().map(Node::plain_text).collect()
}
