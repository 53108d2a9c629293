//! Syntax extensions applied as tree passes after parsing.
//!
//! Each pass takes a [`Document`](crate::Document) by value and returns the
//! rewritten document. None of them perform I/O.

mod autolink;
mod breaks;
mod callout;
mod math;
mod wiki_link;

pub use autolink::extend_autolinks;
pub use breaks::extend_breaks;
pub use callout::{IGNORE_KINDS, extend_callouts};
pub use math::extend_math;
pub use wiki_link::extend_wiki_links;
