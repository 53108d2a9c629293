//! Markdown parser building the document tree from pulldown-cmark events.

use std::ops::Range;

use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd,
};

use crate::ast::{ColumnAlign, Document, Node, NodeKind};
use crate::position::LineIndex;

/// Parser options: GFM tables, strikethrough, task lists, footnotes, math and
/// front matter. Wiki links, callouts and breaks are tree passes in
/// [`crate::extensions`].
#[must_use]
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_MATH
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
}

/// Parse markdown into a [`Document`].
///
/// Never fails: syntax pulldown-cmark does not recognise ends up as text.
#[must_use]
pub fn parse(source: &str) -> Document {
    let index = LineIndex::new(source);
    let mut builder = TreeBuilder::new(&index);
    for (event, range) in Parser::new_ext(source, parser_options()).into_offset_iter() {
        builder.event(event, range);
    }
    Document {
        source: source.to_owned(),
        children: builder.finish(),
    }
}

struct Frame {
    kind: NodeKind,
    children: Vec<Node>,
    range: Range<usize>,
}

struct TreeBuilder<'a> {
    index: &'a LineIndex<'a>,
    root: Vec<Node>,
    stack: Vec<Frame>,
    in_metadata: bool,
}

impl<'a> TreeBuilder<'a> {
    fn new(index: &'a LineIndex<'a>) -> Self {
        Self {
            index,
            root: Vec::new(),
            stack: Vec::new(),
            in_metadata: false,
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        if self.in_metadata {
            if matches!(event, Event::End(TagEnd::MetadataBlock(_))) {
                self.in_metadata = false;
            }
            return;
        }
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text, range),
            Event::Code(code) => self.leaf(
                NodeKind::InlineCode {
                    value: code.into_string(),
                },
                range,
            ),
            Event::InlineMath(math) => self.leaf(
                NodeKind::InlineMath {
                    value: math.into_string(),
                },
                range,
            ),
            // Lifted to block math by the math pass when alone in a paragraph.
            Event::DisplayMath(math) => self.leaf(
                NodeKind::Math {
                    value: math.into_string(),
                },
                range,
            ),
            Event::Html(html) => self.html(&html, range),
            Event::InlineHtml(html) => self.leaf(
                NodeKind::Html {
                    value: html.into_string(),
                },
                range,
            ),
            Event::FootnoteReference(label) => self.leaf(
                NodeKind::FootnoteReference {
                    label: label.into_string(),
                },
                range,
            ),
            Event::SoftBreak => self.leaf(NodeKind::SoftBreak, range),
            Event::HardBreak => self.leaf(NodeKind::Break, range),
            Event::Rule => self.leaf(NodeKind::ThematicBreak, range),
            Event::TaskListMarker(checked) => self.task_marker(checked),
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let kind = match tag {
            Tag::MetadataBlock(_) => {
                self.in_metadata = true;
                return;
            }
            Tag::Paragraph => NodeKind::Paragraph,
            Tag::Heading { level, .. } => NodeKind::Heading {
                depth: heading_level_to_num(level),
            },
            Tag::BlockQuote(_) => NodeKind::Blockquote { callout: None },
            Tag::CodeBlock(kind) => {
                let (lang, meta) = match kind {
                    CodeBlockKind::Fenced(info) => parse_fence_info(&info),
                    CodeBlockKind::Indented => (None, None),
                };
                NodeKind::Code {
                    lang,
                    meta,
                    value: String::new(),
                }
            }
            Tag::HtmlBlock => NodeKind::Html {
                value: String::new(),
            },
            Tag::List(start) => NodeKind::List {
                ordered: start.is_some(),
                start,
            },
            Tag::Item => NodeKind::ListItem { checked: None },
            Tag::FootnoteDefinition(label) => NodeKind::FootnoteDefinition {
                label: label.into_string(),
            },
            Tag::Table(alignments) => NodeKind::Table {
                align: alignments.into_iter().map(column_align).collect(),
            },
            Tag::TableHead => NodeKind::TableRow { header: true },
            Tag::TableRow => NodeKind::TableRow { header: false },
            Tag::TableCell => NodeKind::TableCell,
            Tag::Emphasis => NodeKind::Emphasis,
            Tag::Strong => NodeKind::Strong,
            Tag::Strikethrough => NodeKind::Delete,
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let url = if link_type == LinkType::Email {
                    format!("mailto:{dest_url}")
                } else {
                    dest_url.into_string()
                };
                NodeKind::Link {
                    url,
                    title: title.into_string(),
                }
            }
            Tag::Image {
                dest_url, title, ..
            } => NodeKind::Image {
                url: dest_url.into_string(),
                alt: String::new(),
                title: title.into_string(),
                hint: None,
            },
            // Not enabled in `parser_options`; treated as plain containers.
            Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::Superscript
            | Tag::Subscript => NodeKind::Paragraph,
        };
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
            range,
        });
    }

    fn end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let position = Some(self.index.position(frame.range));
        let mut kind = frame.kind;
        let mut children = frame.children;

        match &mut kind {
            NodeKind::Image { alt, .. } => {
                *alt = children.iter().map(Node::plain_text).collect();
                children.clear();
            }
            NodeKind::Code { value, .. } => {
                if value.ends_with('\n') {
                    value.pop();
                }
            }
            _ => {}
        }

        self.push(Node {
            kind,
            children,
            position,
        });
    }

    fn text(&mut self, text: &str, range: Range<usize>) {
        if let Some(Frame {
            kind: NodeKind::Code { value, .. } | NodeKind::Html { value },
            ..
        }) = self.stack.last_mut()
        {
            value.push_str(text);
            return;
        }

        let position = self.index.position(range);
        let siblings = self.siblings();
        if let Some(Node {
            kind: NodeKind::Text { value },
            position: Some(last),
            ..
        }) = siblings.last_mut()
        {
            value.push_str(text);
            last.end = position.end;
            return;
        }
        siblings.push(Node::text(text).at(Some(position)));
    }

    fn html(&mut self, html: &str, range: Range<usize>) {
        if let Some(Frame {
            kind: NodeKind::Html { value },
            ..
        }) = self.stack.last_mut()
        {
            value.push_str(html);
        } else {
            self.leaf(
                NodeKind::Html {
                    value: html.to_owned(),
                },
                range,
            );
        }
    }

    fn task_marker(&mut self, checked: bool) {
        let item = self
            .stack
            .iter_mut()
            .rev()
            .find(|frame| matches!(frame.kind, NodeKind::ListItem { .. }));
        if let Some(frame) = item {
            frame.kind = NodeKind::ListItem {
                checked: Some(checked),
            };
        }
    }

    fn leaf(&mut self, kind: NodeKind, range: Range<usize>) {
        let position = Some(self.index.position(range));
        self.push(Node {
            kind,
            children: Vec::new(),
            position,
        });
    }

    fn push(&mut self, node: Node) {
        self.siblings().push(node);
    }

    fn siblings(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.stack.is_empty() {
            self.end();
        }
        self.root
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn column_align(alignment: Alignment) -> ColumnAlign {
    match alignment {
        Alignment::None => ColumnAlign::None,
        Alignment::Left => ColumnAlign::Left,
        Alignment::Center => ColumnAlign::Center,
        Alignment::Right => ColumnAlign::Right,
    }
}

/// Split a fence info string into language and the remaining meta text.
fn parse_fence_info(info: &str) -> (Option<String>, Option<String>) {
    let info = info.trim();
    if info.is_empty() {
        return (None, None);
    }
    match info.split_once(char::is_whitespace) {
        Some((lang, meta)) => {
            let meta = meta.trim();
            (
                Some(lang.to_owned()),
                (!meta.is_empty()).then(|| meta.to_owned()),
            )
        }
        None => (Some(info.to_owned()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(nodes: &[Node]) -> Vec<&NodeKind> {
        nodes.iter().map(|n| &n.kind).collect()
    }

    #[test]
    fn test_parse_paragraph_text_is_merged() {
        let doc = parse("Hello [world] here");
        let para = &doc.children[0];
        assert_eq!(para.kind, NodeKind::Paragraph);
        assert_eq!(para.children.len(), 1);
        assert_eq!(para.plain_text(), "Hello [world] here");
    }

    #[test]
    fn test_parse_positions() {
        let doc = parse("a\n\n## Title");
        let heading = &doc.children[1];
        assert_eq!(heading.kind, NodeKind::Heading { depth: 2 });
        let position = heading.position.unwrap();
        assert_eq!(position.start.line, 3);
        assert_eq!(position.start.column, 1);
        assert_eq!(position.start.offset, 3);
    }

    #[test]
    fn test_parse_code_block() {
        let doc = parse("```rust title=main\nfn main() {}\n```");
        assert_eq!(
            doc.children[0].kind,
            NodeKind::Code {
                lang: Some("rust".to_owned()),
                meta: Some("title=main".to_owned()),
                value: "fn main() {}".to_owned(),
            }
        );
    }

    #[test]
    fn test_parse_image_alt() {
        let doc = parse("![a *b*](pic.png \"t\")");
        let image = &doc.children[0].children[0];
        assert_eq!(
            image.kind,
            NodeKind::Image {
                url: "pic.png".to_owned(),
                alt: "a b".to_owned(),
                title: "t".to_owned(),
                hint: None,
            }
        );
        assert!(image.children.is_empty());
    }

    #[test]
    fn test_parse_link_title() {
        let doc = parse("[Text](http://x \"card\")");
        assert_eq!(
            doc.children[0].children[0].kind,
            NodeKind::Link {
                url: "http://x".to_owned(),
                title: "card".to_owned(),
            }
        );
    }

    #[test]
    fn test_parse_math() {
        let doc = parse("inline $a+b$ here");
        assert_eq!(
            doc.children[0].children[1].kind,
            NodeKind::InlineMath {
                value: "a+b".to_owned()
            }
        );
    }

    #[test]
    fn test_parse_table_rows() {
        let doc = parse("| a | b |\n|:--|--:|\n| 1 | 2 |");
        let table = &doc.children[0];
        assert_eq!(
            table.kind,
            NodeKind::Table {
                align: vec![ColumnAlign::Left, ColumnAlign::Right]
            }
        );
        assert_eq!(
            kinds(&table.children),
            vec![
                &NodeKind::TableRow { header: true },
                &NodeKind::TableRow { header: false }
            ]
        );
    }

    #[test]
    fn test_parse_task_list() {
        let doc = parse("- [x] done\n- [ ] todo");
        let list = &doc.children[0];
        assert_eq!(
            kinds(&list.children),
            vec![
                &NodeKind::ListItem {
                    checked: Some(true)
                },
                &NodeKind::ListItem {
                    checked: Some(false)
                }
            ]
        );
    }

    #[test]
    fn test_parse_footnotes() {
        let doc = parse("text[^a]\n\n[^a]: note");
        assert_eq!(
            doc.children[0].children[1].kind,
            NodeKind::FootnoteReference {
                label: "a".to_owned()
            }
        );
        assert_eq!(
            doc.children[1].kind,
            NodeKind::FootnoteDefinition {
                label: "a".to_owned()
            }
        );
    }

    #[test]
    fn test_parse_skips_front_matter() {
        let doc = parse("---\nzhihu-link: https://x\n---\n\nbody");
        assert_eq!(doc.children.len(), 1);
        assert_eq!(doc.children[0].plain_text(), "body");
    }

    #[test]
    fn test_parse_html_block() {
        let doc = parse("<div align=\"center\">\nhi\n</div>");
        let NodeKind::Html { value } = &doc.children[0].kind else {
            panic!("expected html block");
        };
        assert!(value.starts_with("<div align=\"center\">"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "# T\n\n> quote with [[Link]]\n\n- a\n- b $x$";
        assert_eq!(parse(source), parse(source));
    }

    #[test]
    fn test_fence_info() {
        assert_eq!(parse_fence_info(""), (None, None));
        assert_eq!(parse_fence_info("mermaid"), (Some("mermaid".to_owned()), None));
    }
}
