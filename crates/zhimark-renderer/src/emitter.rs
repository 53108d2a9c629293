//! Structural emitter producing the platform's HTML dialect.
//!
//! [`emit`] is a pure function of the resolved tree. Every node kind is
//! handled in one exhaustive match in [`Emitter::node`].

use std::collections::HashMap;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::ast::{ColumnAlign, Document, ImageHint, Node, NodeKind, walk};
use crate::extensions::IGNORE_KINDS;
use crate::footnote::{FootnoteNumbering, normalize_label};
use crate::html::{Element, HtmlNode};
use crate::position::is_alone_on_line;

/// Equation renderer path. The TeX source goes into the `tex` parameter.
pub const EQUATION_ENDPOINT: &str = "//www.zhihu.com/equation?tex=";

/// Profile URL prefix removed from member mention links.
const PROFILE_URL_PREFIX: &str = "https://www.zhihu.com/people/";

const MEMBER_MENTION: &str = "member_mention";

/// Link title that turns a link into a block-level card.
const CARD_TITLE: &str = "card";

/// Characters `encodeURI` leaves alone are everything except these (plus
/// non-ASCII, which is always encoded).
const URI_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Looks up the published URL of a note referenced by a wiki link.
pub trait LinkResolver: Send + Sync {
    /// Published URL for the note named `name`, if it has one.
    fn lookup_published_link(&self, name: &str) -> Option<String>;
}

/// [`LinkResolver`] for documents rendered outside a vault.
pub struct NoPublishedLinks;

impl LinkResolver for NoPublishedLinks {
    fn lookup_published_link(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Emitter settings.
#[derive(Clone, Copy, Debug)]
pub struct EmitOptions {
    /// Map heading depth 1 and 2 to `h2`/`h3` and deeper headings to bold
    /// paragraphs.
    pub dialect_headings: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            dialect_headings: true,
        }
    }
}

/// Emit a resolved document as HTML nodes.
#[must_use]
pub fn emit(document: &Document, options: &EmitOptions, links: &dyn LinkResolver) -> Vec<HtmlNode> {
    let mut emitter = Emitter::new(document, *options, links);
    let nodes = emitter.blocks(&document.children);
    tracing::debug!(footnotes = emitter.footnotes.len(), "emitted document");
    nodes
}

/// Percent-encode like JavaScript's `encodeURI`.
#[must_use]
pub fn encode_uri(text: &str) -> String {
    utf8_percent_encode(text, URI_ENCODE_SET).to_string()
}

struct Emitter<'a> {
    source: &'a str,
    options: EmitOptions,
    links: &'a dyn LinkResolver,
    definitions: HashMap<String, &'a Node>,
    footnotes: FootnoteNumbering,
}

impl<'a> Emitter<'a> {
    fn new(document: &'a Document, options: EmitOptions, links: &'a dyn LinkResolver) -> Self {
        let mut definitions = HashMap::new();
        walk(&document.children, &mut |node| {
            if let NodeKind::FootnoteDefinition { label } = &node.kind {
                definitions.entry(normalize_label(label)).or_insert(node);
            }
        });
        Self {
            source: &document.source,
            options,
            links,
            definitions,
            footnotes: FootnoteNumbering::default(),
        }
    }

    /// Emit inline content with no separators.
    fn inlines(&mut self, nodes: &'a [Node]) -> Vec<HtmlNode> {
        let mut out = Vec::new();
        for node in nodes {
            out.extend(self.node(node));
        }
        out
    }

    /// Emit block content separated by newlines.
    fn blocks(&mut self, nodes: &'a [Node]) -> Vec<HtmlNode> {
        let mut out = Vec::new();
        for node in nodes {
            let emitted = self.node(node);
            if emitted.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(newline());
            }
            out.extend(emitted);
        }
        out
    }

    /// Block content with a leading and trailing newline, as inside
    /// `blockquote` and lists.
    fn wrapped_blocks(&mut self, nodes: &'a [Node]) -> Vec<HtmlNode> {
        let mut out = self.blocks(nodes);
        if !out.is_empty() {
            out.insert(0, newline());
            out.push(newline());
        }
        out
    }

    fn node(&mut self, node: &'a Node) -> Vec<HtmlNode> {
        let children = &node.children;
        let element = match &node.kind {
            NodeKind::Paragraph => Element::new("p").children(self.inlines(children)),
            NodeKind::Heading { depth } => self.heading(*depth, children),
            NodeKind::Text { value } => return vec![HtmlNode::Text(value.clone())],
            NodeKind::Emphasis => Element::new("em").children(self.inlines(children)),
            NodeKind::Strong => Element::new("strong").children(self.inlines(children)),
            NodeKind::Delete => Element::new("del").children(self.inlines(children)),
            NodeKind::InlineCode { value } => Element::new("code").text(value.clone()),
            NodeKind::SoftBreak => return vec![newline()],
            NodeKind::Break => return vec![Element::new("br").into(), newline()],
            NodeKind::ThematicBreak => Element::new("hr"),
            NodeKind::Blockquote { callout } => {
                return match callout {
                    Some(callout) if is_ignored(&callout.kind) => vec![Element::new("p").into()],
                    Some(callout) => {
                        let title = Element::new("p")
                            .children(vec![Element::new("strong").text(callout.title.clone()).into()]);
                        let mut out = vec![HtmlNode::from(title)];
                        let body = self.blocks(children);
                        if !body.is_empty() {
                            out.push(newline());
                            out.extend(body);
                        }
                        out
                    }
                    None => vec![
                        Element::new("blockquote")
                            .children(self.wrapped_blocks(children))
                            .into(),
                    ],
                };
            }
            NodeKind::List { ordered, start } => {
                let mut list = Element::new(if *ordered { "ol" } else { "ul" });
                if let Some(start) = start.filter(|&s| *ordered && s != 1) {
                    list = list.attr("start", start.to_string());
                }
                list.children(self.wrapped_blocks(children))
            }
            NodeKind::ListItem { checked } => self.list_item(*checked, children),
            NodeKind::Code { lang, value, .. } => {
                Element::new("pre")
                    .attr("lang", lang.clone().unwrap_or_default())
                    .text(value.trim())
            }
            NodeKind::Html { value } => return vec![HtmlNode::Raw(value.clone())],
            NodeKind::Link { url, title } => self.link(node, url, title),
            NodeKind::Image {
                url,
                alt,
                title,
                hint,
            } => image(url, alt, title, hint.as_ref()),
            NodeKind::Table { align } => self.table(align, children),
            NodeKind::TableRow { header } => self.table_row(*header, &[], children),
            NodeKind::TableCell => Element::new("td").children(self.inlines(children)),
            NodeKind::FootnoteReference { label } => self.footnote_reference(label),
            NodeKind::FootnoteDefinition { .. } => return Vec::new(),
            NodeKind::InlineMath { value } => equation_image(value, "1"),
            NodeKind::Math { value } => {
                Element::new("p").children(vec![equation_image(value, "2").into()])
            }
            NodeKind::WikiLink { target, alias } => self.wiki_link(node, target, alias.as_deref()),
            NodeKind::WikiImageLink { target, alias } => {
                let literal = match alias {
                    Some(alias) => format!("![[{target}|{alias}]]"),
                    None => format!("![[{target}]]"),
                };
                return vec![HtmlNode::Text(literal)];
            }
        };
        vec![element.into()]
    }

    fn heading(&mut self, depth: u8, children: &'a [Node]) -> Element {
        let content = self.inlines(children);
        if !self.options.dialect_headings {
            return Element::new(format!("h{depth}")).children(content);
        }
        match depth {
            1 => Element::new("h2").children(content),
            2 => Element::new("h3").children(content),
            _ => Element::new("p").children(vec![Element::new("strong").children(content).into()]),
        }
    }

    fn list_item(&mut self, checked: Option<bool>, children: &'a [Node]) -> Element {
        let mut content = Vec::new();
        if let Some(checked) = checked {
            let mut checkbox = Element::new("input").attr("type", "checkbox");
            if checked {
                checkbox = checkbox.attr("checked", "");
            }
            content.push(checkbox.attr("disabled", "").into());
            content.push(HtmlNode::Text(" ".to_owned()));
        }
        if children.iter().any(Node::is_block) {
            content.extend(self.wrapped_blocks(children));
        } else {
            content.extend(self.inlines(children));
        }
        Element::new("li").children(content)
    }

    fn link(&mut self, node: &'a Node, url: &str, title: &str) -> Element {
        let content = self.inlines(&node.children);
        if title == CARD_TITLE {
            return link_card(url, &node.plain_text()).children(content);
        }
        if title.contains(MEMBER_MENTION) {
            let id = url.replace(PROFILE_URL_PREFIX, "");
            return Element::new("a")
                .attr("class", MEMBER_MENTION)
                .attr("href", format!("/people/{id}"))
                .attr("data-hash", title.replace("member_mention_", ""))
                .children(content);
        }
        Element::new("a").attr("href", url).children(content)
    }

    fn table(&mut self, align: &[ColumnAlign], rows: &'a [Node]) -> Element {
        let mut body = Vec::new();
        for row in rows {
            let header = matches!(row.kind, NodeKind::TableRow { header: true });
            body.push(newline());
            body.push(self.table_row(header, align, &row.children).into());
        }
        if !body.is_empty() {
            body.push(newline());
        }
        Element::new("table")
            .attr("data-draft-node", "block")
            .attr("data-draft-type", "table")
            .attr("data-size", "normal")
            .children(vec![Element::new("tbody").children(body).into()])
    }

    fn table_row(&mut self, header: bool, align: &[ColumnAlign], cells: &'a [Node]) -> Element {
        let tag = if header { "th" } else { "td" };
        let mut out = Vec::new();
        for (index, cell) in cells.iter().enumerate() {
            let mut element = Element::new(tag);
            if let Some(value) = align.get(index).and_then(|a| align_value(*a)) {
                element = element.attr("align", value);
            }
            out.push(element.children(self.inlines(&cell.children)).into());
        }
        Element::new("tr").children(out)
    }

    fn footnote_reference(&mut self, label: &str) -> Element {
        let number = self.footnotes.number(label);
        let marker = format!("[{number}]");
        let Some(definition) = self.definitions.get(&normalize_label(label)) else {
            return Element::new("sup").text(marker);
        };
        let (text, url) = footnote_summary(definition);
        Element::new("sup")
            .attr("data-text", text)
            .attr("data-url", url)
            .attr("data-draft-node", "inline")
            .attr("data-draft-type", "reference")
            .attr("data-numero", number.to_string())
            .text(marker)
    }

    fn wiki_link(&self, node: &Node, target: &str, alias: Option<&str>) -> Element {
        let label = alias.unwrap_or(target);
        let name = target.split('#').next().unwrap_or(target).trim();
        let Some(url) = self.links.lookup_published_link(name) else {
            return Element::new("u").text(target);
        };
        let alone = node
            .position
            .is_some_and(|position| is_alone_on_line(self.source, &position));
        let anchor = if alone {
            link_card(&url, label)
        } else {
            Element::new("a").attr("href", url)
        };
        anchor.text(label)
    }
}

fn newline() -> HtmlNode {
    HtmlNode::Text("\n".to_owned())
}

fn is_ignored(kind: &str) -> bool {
    IGNORE_KINDS.iter().any(|ignored| ignored.eq_ignore_ascii_case(kind))
}

fn link_card(url: &str, title: &str) -> Element {
    Element::new("a")
        .attr("href", url)
        .attr("data-draft-node", "block")
        .attr("data-draft-type", "link-card")
        .attr("data-draft-title", title)
        .attr("data-draft-cover", "")
}

fn image(url: &str, alt: &str, title: &str, hint: Option<&ImageHint>) -> Element {
    let Some(hint) = hint else {
        let img = Element::new("img").attr("src", url).attr("alt", alt);
        return if title.is_empty() {
            img
        } else {
            img.attr("title", title)
        };
    };
    Element::new("img")
        .attr("src", url)
        .attr("data-caption", hint.caption.clone())
        .attr("data-size", "normal")
        .attr("data-rawwidth", hint.raw_width.to_string())
        .attr("data-rawheight", hint.raw_height.to_string())
        .attr("data-watermark", "watermark")
        .attr("data-original-src", hint.original_src.clone())
        .attr("data-watermark-src", hint.watermark_src.clone())
        .attr("data-private-watermark-src", hint.private_watermark_src.clone())
}

fn equation_image(tex: &str, eeimg: &str) -> Element {
    Element::new("img")
        .attr("eeimg", eeimg)
        .attr("src", format!("{EQUATION_ENDPOINT}{}", encode_uri(tex)))
        .attr("alt", tex.replace(['\n', '\r'], " "))
}

fn align_value(align: ColumnAlign) -> Option<&'static str> {
    match align {
        ColumnAlign::None => None,
        ColumnAlign::Left => Some("left"),
        ColumnAlign::Center => Some("center"),
        ColumnAlign::Right => Some("right"),
    }
}

/// Trimmed text of the definition's first paragraph and its link URL.
///
/// When the paragraph holds several links the last one wins, matching the
/// editor's reference cards.
fn footnote_summary(definition: &Node) -> (String, String) {
    let Some(paragraph) = definition
        .children
        .first()
        .filter(|n| n.kind == NodeKind::Paragraph)
    else {
        return (String::new(), String::new());
    };
    let text = paragraph
        .children
        .iter()
        .filter_map(|child| match &child.kind {
            NodeKind::Text { value } => Some(value.trim()),
            _ => None,
        })
        .collect();
    let url = paragraph
        .children
        .iter()
        .rev()
        .find_map(|child| match &child.kind {
            NodeKind::Link { url, .. } => Some(url.clone()),
            _ => None,
        })
        .unwrap_or_default();
    (text, url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Callout;
    use crate::extensions::{extend_breaks, extend_callouts, extend_math, extend_wiki_links};
    use crate::html::{text_content, to_html};
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    struct Published(&'static str, &'static str);

    impl LinkResolver for Published {
        fn lookup_published_link(&self, name: &str) -> Option<String> {
            (name == self.0).then(|| self.1.to_owned())
        }
    }

    fn prepare(source: &str) -> Document {
        extend_breaks(extend_callouts(extend_wiki_links(extend_math(parse(source)))))
    }

    fn render(source: &str) -> String {
        to_html(&emit(&prepare(source), &EmitOptions::default(), &NoPublishedLinks))
    }

    fn render_with(source: &str, options: EmitOptions, links: &dyn LinkResolver) -> String {
        to_html(&emit(&prepare(source), &options, links))
    }

    #[test]
    fn test_paragraphs_joined_by_newline() {
        assert_eq!(render("a\n\nb"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn test_link_card() {
        assert_eq!(
            render("[Text](http://x \"card\")"),
            r#"<p><a href="http://x" data-draft-node="block" data-draft-type="link-card" data-draft-title="Text" data-draft-cover="">Text</a></p>"#
        );
    }

    #[test]
    fn test_plain_link_has_only_href() {
        assert_eq!(render("[Text](http://x)"), r#"<p><a href="http://x">Text</a></p>"#);
    }

    #[test]
    fn test_member_mention() {
        assert_eq!(
            render("[@someone](https://www.zhihu.com/people/abc \"member_mention_hash123\")"),
            r#"<p><a class="member_mention" href="/people/abc" data-hash="hash123">@someone</a></p>"#
        );
    }

    #[test]
    fn test_dialect_headings() {
        assert_eq!(render("# One"), "<h2>One</h2>");
        assert_eq!(render("## Two"), "<h3>Two</h3>");
        for depth in 3..=6 {
            let html = render(&format!("{} Deep", "#".repeat(depth)));
            assert_eq!(html, "<p><strong>Deep</strong></p>");
            assert!(!html.contains("<h"));
        }
    }

    #[test]
    fn test_literal_headings() {
        let options = EmitOptions {
            dialect_headings: false,
        };
        assert_eq!(render_with("### Three", options, &NoPublishedLinks), "<h3>Three</h3>");
        assert_eq!(render_with("# One", options, &NoPublishedLinks), "<h1>One</h1>");
    }

    #[test]
    fn test_inline_math() {
        assert_eq!(
            render("$a^2 + b$"),
            r#"<p><img eeimg="1" src="//www.zhihu.com/equation?tex=a%5E2%20+%20b" alt="a^2 + b"></p>"#
        );
    }

    #[test]
    fn test_block_math() {
        assert_eq!(
            render("$$\n\\frac{1}{2}\n$$"),
            r#"<p><img eeimg="2" src="//www.zhihu.com/equation?tex=%5Cfrac%7B1%7D%7B2%7D" alt="\frac{1}{2}"></p>"#
        );
    }

    #[test]
    fn test_math_alt_collapses_newlines() {
        let element = equation_image("a\\\\\nb", "2");
        assert_eq!(element.get_attr("alt"), Some("a\\\\ b"));

        let crlf = equation_image("a\r\nb", "1");
        assert_eq!(crlf.get_attr("alt"), Some("a  b"));
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            render("```python\n  print(1)  \n```"),
            r#"<pre lang="python">print(1)</pre>"#
        );
        assert_eq!(render("```\nplain\n```"), r#"<pre lang="">plain</pre>"#);
    }

    #[test]
    fn test_table() {
        let html = render("| a | b |\n|---|:-:|\n| 1 | 2 |");
        assert_eq!(
            html,
            "<table data-draft-node=\"block\" data-draft-type=\"table\" data-size=\"normal\"><tbody>\n\
             <tr><th>a</th><th align=\"center\">b</th></tr>\n\
             <tr><td>1</td><td align=\"center\">2</td></tr>\n\
             </tbody></table>"
        );
    }

    #[test]
    fn test_footnote_numbering() {
        let html = render("text[^a] more[^b] again[^a]\n\n[^a]: first\n\n[^b]: second");
        let numbers: Vec<_> = html
            .match_indices("data-numero=\"")
            .map(|(i, _)| &html[i + 13..i + 14])
            .collect();
        assert_eq!(numbers, vec!["1", "2", "1"]);
    }

    #[test]
    fn test_footnote_reference_attributes() {
        let html = render("claim[^src]\n\n[^src]: See [docs](https://docs.rs) here");
        assert_eq!(
            html,
            r#"<p>claim<sup data-text="Seehere" data-url="https://docs.rs" data-draft-node="inline" data-draft-type="reference" data-numero="1">[1]</sup></p>"#
        );
    }

    #[test]
    fn test_footnote_uses_last_link() {
        let html = render("x[^a]\n\n[^a]: [one](https://a.test) and [two](https://b.test)");
        assert!(html.contains(r#"data-url="https://b.test""#));
    }

    #[test]
    fn test_footnote_without_definition() {
        let doc = Document {
            source: String::new(),
            children: vec![Node::with_children(
                NodeKind::Paragraph,
                vec![Node::new(NodeKind::FootnoteReference {
                    label: "missing".to_owned(),
                })],
            )],
        };
        let html = to_html(&emit(&doc, &EmitOptions::default(), &NoPublishedLinks));
        assert_eq!(html, "<p><sup>[1]</sup></p>");
    }

    #[test]
    fn test_callout_ignore_collapses() {
        for kind in IGNORE_KINDS {
            let html = render(&format!("> [!{kind}] Title\n> secret **body**"));
            assert_eq!(html, "<p></p>");
        }
    }

    #[test]
    fn test_callout_flattened() {
        assert_eq!(
            render("> [!note] Heads up\n>\n> body"),
            "<p><strong>Heads up</strong></p>\n<p>body</p>"
        );
    }

    #[test]
    fn test_callout_built_by_hand() {
        let doc = Document {
            source: String::new(),
            children: vec![Node::with_children(
                NodeKind::Blockquote {
                    callout: Some(Callout {
                        kind: "warning".to_owned(),
                        title: "Careful".to_owned(),
                        folded: None,
                    }),
                },
                Vec::new(),
            )],
        };
        let html = to_html(&emit(&doc, &EmitOptions::default(), &NoPublishedLinks));
        assert_eq!(html, "<p><strong>Careful</strong></p>");
    }

    #[test]
    fn test_plain_blockquote() {
        assert_eq!(render("> quoted"), "<blockquote>\n<p>quoted</p>\n</blockquote>");
    }

    #[test]
    fn test_wiki_link_unpublished() {
        assert_eq!(render("see [[Draft Note]]"), "<p>see <u>Draft Note</u></p>");
    }

    #[test]
    fn test_wiki_link_published_inline() {
        let links = Published("Post", "https://zhuanlan.zhihu.com/p/1");
        assert_eq!(
            render_with("see [[Post|my post]]", EmitOptions::default(), &links),
            r#"<p>see <a href="https://zhuanlan.zhihu.com/p/1">my post</a></p>"#
        );
    }

    #[test]
    fn test_wiki_link_published_alone_is_card() {
        let links = Published("Post", "https://zhuanlan.zhihu.com/p/1");
        assert_eq!(
            render_with("intro\n\n[[Post#Section|my post]]", EmitOptions::default(), &links),
            "<p>intro</p>\n<p><a href=\"https://zhuanlan.zhihu.com/p/1\" data-draft-node=\"block\" data-draft-type=\"link-card\" data-draft-title=\"my post\" data-draft-cover=\"\">my post</a></p>"
        );
    }

    #[test]
    fn test_unresolved_wiki_image_is_literal() {
        assert_eq!(render("![[pic.png|cap]]"), "<p>![[pic.png|cap]]</p>");
    }

    #[test]
    fn test_image_with_hint() {
        let doc = Document {
            source: String::new(),
            children: vec![Node::new(NodeKind::Image {
                url: "https://picx.zhimg.com/v2-abc.png".to_owned(),
                alt: String::new(),
                title: String::new(),
                hint: Some(ImageHint {
                    caption: "cap".to_owned(),
                    raw_width: 10,
                    raw_height: 20,
                    original_src: "https://picx.zhimg.com/v2-abc.png".to_owned(),
                    watermark_src: String::new(),
                    private_watermark_src: String::new(),
                }),
            })],
        };
        assert_eq!(
            to_html(&emit(&doc, &EmitOptions::default(), &NoPublishedLinks)),
            r#"<img src="https://picx.zhimg.com/v2-abc.png" data-caption="cap" data-size="normal" data-rawwidth="10" data-rawheight="20" data-watermark="watermark" data-original-src="https://picx.zhimg.com/v2-abc.png" data-watermark-src="" data-private-watermark-src="">"#
        );
    }

    #[test]
    fn test_image_without_hint() {
        assert_eq!(render("![alt](a.png)"), r#"<p><img src="a.png" alt="alt"></p>"#);
    }

    #[test]
    fn test_raw_html_passthrough() {
        assert_eq!(
            render("a <span style=\"color:red\">red</span> b"),
            "<p>a <span style=\"color:red\">red</span> b</p>"
        );
    }

    #[test]
    fn test_breaks() {
        assert_eq!(render("one\ntwo"), "<p>one<br>\ntwo</p>");
    }

    #[test]
    fn test_task_list() {
        assert_eq!(
            render("- [x] done"),
            "<ul>\n<li><input type=\"checkbox\" checked=\"\" disabled=\"\"> done</li>\n</ul>"
        );
    }

    #[test]
    fn test_round_trip_text() {
        let source = "Plain *emphasis* and **strong** text.\n\nSecond _para_ here.";
        let nodes = emit(&prepare(source), &EmitOptions::default(), &NoPublishedLinks);
        assert_eq!(
            text_content(&nodes),
            "Plain emphasis and strong text.\nSecond para here."
        );
    }

    #[test]
    fn test_encode_uri() {
        assert_eq!(encode_uri("a b/c?d=1&e"), "a%20b/c?d=1&e");
        assert_eq!(encode_uri("中"), "%E4%B8%AD");
        assert_eq!(encode_uri("x_{i}"), "x_%7Bi%7D");
    }
}
