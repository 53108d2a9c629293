//! CLI commands.

mod localize;
mod render;
mod typst_version;

pub(crate) use localize::LocalizeArgs;
pub(crate) use render::RenderArgs;
pub(crate) use typst_version::TypstVersionArgs;
