//! The narrow view of a low-level Markdown syntax tree that the document
//! parser walks.
//!
//! Any tokenizer can feed the parser by exposing its nodes through
//! [`SourceNode`]. The bundled implementation is [`crate::markup::Markup`],
//! built from pulldown-cmark events.

/// State of a task-list checkbox on a list item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkbox {
    Checked,
    Unchecked,
}

/// Alignment marker of a table column as written in the delimiter row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAlignment {
    Left,
    Center,
    Right,
}

/// Node kind plus its kind-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind<'a> {
    Document,
    BlockQuote,
    CodeBlock {
        language: Option<&'a str>,
        code: &'a str,
    },
    Heading {
        level: u8,
    },
    ThematicBreak,
    HtmlBlock {
        html: &'a str,
    },
    OrderedList {
        start: u64,
        tight: bool,
    },
    UnorderedList {
        tight: bool,
    },
    ListItem {
        checkbox: Option<Checkbox>,
    },
    Paragraph,
    Text(&'a str),
    SoftBreak,
    LineBreak,
    InlineHtml(&'a str),
    InlineCode(&'a str),
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        destination: Option<&'a str>,
    },
    Image {
        source: Option<&'a str>,
    },
    /// Inline or display math with delimiters already removed
    Math(&'a str),
    /// `None` entries are columns without an alignment marker
    Table {
        alignments: &'a [Option<SourceAlignment>],
    },
    TableHead,
    TableRow,
    TableCell,
    /// Anything without a dedicated handler; its children are kept
    Other,
}

pub trait SourceNode: Sized {
    fn kind(&self) -> SourceKind<'_>;

    fn children(&self) -> &[Self];
}
