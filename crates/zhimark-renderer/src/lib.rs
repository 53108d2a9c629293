//! Extended markdown parser and HTML emitter for the Zhihu article dialect.
//!
//! This crate is pure: it parses markdown into a [`Document`], rewrites it
//! with the syntax extensions in [`extensions`], and emits the resolved tree
//! as [`HtmlNode`]s. Nothing here performs I/O. Image upload, diagrams and
//! formula typesetting live in `zhimark-pipeline`.
//!
//! # Example
//!
//! ```
//! use zhimark_renderer::{
//!     EmitOptions, NoPublishedLinks, emit, extend_breaks, extend_callouts, extend_math,
//!     extend_wiki_links, merge_raw, parse, to_html,
//! };
//!
//! let document = parse("# Hello\n\n**Bold** and $x^2$");
//! let document = extend_breaks(extend_callouts(extend_wiki_links(extend_math(document))));
//! let html = to_html(&merge_raw(emit(&document, &EmitOptions::default(), &NoPublishedLinks)));
//! assert!(html.starts_with("<h2>Hello</h2>"));
//! ```

mod ast;
mod emitter;
pub mod extensions;
mod footnote;
mod html;
mod parser;
mod position;

pub use ast::{Callout, ColumnAlign, Document, ImageHint, Node, NodeKind, rewrite, walk};
pub use emitter::{
    EQUATION_ENDPOINT, EmitOptions, LinkResolver, NoPublishedLinks, emit, encode_uri,
};
pub use extensions::{
    IGNORE_KINDS, extend_autolinks, extend_breaks, extend_callouts, extend_math, extend_wiki_links,
};
pub use html::{Element, HtmlNode, escape_html, merge_raw, text_content, to_html};
pub use parser::{parse, parser_options};
pub use position::{LineIndex, Point, Position, is_alone_on_line};
