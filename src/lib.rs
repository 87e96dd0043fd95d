//! Markdown to a typed document tree, and inline content to styled text.
//!
//! [`parse_document`] turns Markdown into [`BlockNode`]s. Paragraphs,
//! headings and table cells hold [`InlineNode`]s, which [`render_inline`]
//! folds into a single [`StyledText`] for presentation.

mod block;
mod config;
mod directive;
mod error;
mod markup;
mod math;
mod parser;
mod render;
mod source;
mod style;
mod styled;
pub mod terminal;

pub use block::{Alignment, BlockNode, InlineNode, ListItem, TableCell, TableRow, TaskListItem};
pub use config::{Config, MathConfig};
pub use error::{Error, Result};
pub use markup::{Markup, ParseOptions};
pub use math::{
    BlockRenderParams, ComponentBlock, ErrorMode, MathCacheKey, MathParams, MathRenderer,
    ParsingMode, SourceComponent, SourceMath,
};
pub use parser::parse_source;
pub use render::{InlineRenderer, MathOptions, render_inline};
pub use source::{Checkbox, SourceAlignment, SourceKind, SourceNode};
pub use style::{SoftBreak, StyleDelta, StyleTable, TextStyles, resolve_link};
pub use styled::{Color, ImageHandle, Run, StyledText, TextRun, TextStyle};

/// Parse markdown text into a vector of blocks.
pub fn parse_document(markdown: &str) -> Vec<BlockNode> {
    parser::parse(markdown, &ParseOptions::default())
}

/// Parse markdown text with explicit preprocessing options.
pub fn parse_document_with(markdown: &str, options: &ParseOptions) -> Vec<BlockNode> {
    parser::parse(markdown, options)
}
