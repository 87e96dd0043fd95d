//! Owned syntax tree built from the pulldown-cmark event stream.

use pulldown_cmark::{
    Alignment as CmarkAlignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag,
    TextMergeStream,
};
use serde::Deserialize;

use crate::directive::{Segment, split_directives};
use crate::source::{Checkbox, SourceAlignment, SourceKind, SourceNode};

/// Switches for source-level preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Keep `@Directive` blocks verbatim as HTML blocks
    pub block_directives: bool,
    /// Drop a leading YAML front matter block
    pub strip_frontmatter: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            block_directives: true,
            strip_frontmatter: false,
        }
    }
}

/// A node of the low-level Markdown tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup {
    kind: MarkupKind,
    children: Vec<Markup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MarkupKind {
    Document,
    BlockQuote,
    CodeBlock { info: Option<String>, code: String },
    Heading(u8),
    ThematicBreak,
    HtmlBlock(String),
    List { start: Option<u64>, tight: bool },
    Item { checkbox: Option<Checkbox> },
    Paragraph,
    Text(String),
    SoftBreak,
    HardBreak,
    InlineHtml(String),
    Code(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
    Image(String),
    Math(String),
    Table(Vec<Option<SourceAlignment>>),
    TableHead,
    TableRow,
    TableCell,
    Other,
}

impl MarkupKind {
    fn is_inline_container(&self) -> bool {
        matches!(
            self,
            Self::Emphasis | Self::Strong | Self::Strikethrough | Self::Link(_) | Self::Image(_)
        )
    }
}

impl Markup {
    fn new(kind: MarkupKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Parse markdown into a document node.
    pub fn parse(markdown: &str, options: &ParseOptions) -> Self {
        let markdown = if options.strip_frontmatter {
            strip_frontmatter(markdown)
        } else {
            markdown
        };

        let mut builder = Builder::new();
        if options.block_directives {
            for segment in split_directives(markdown) {
                match segment {
                    Segment::Markdown(text) => builder.feed(text),
                    Segment::Directive(raw) => {
                        builder.attach(Markup::new(MarkupKind::HtmlBlock(raw.to_string())))
                    }
                }
            }
        } else {
            builder.feed(markdown);
        }
        builder.finish()
    }
}

impl SourceNode for Markup {
    fn kind(&self) -> SourceKind<'_> {
        match &self.kind {
            MarkupKind::Document => SourceKind::Document,
            MarkupKind::BlockQuote => SourceKind::BlockQuote,
            MarkupKind::CodeBlock { info, code } => SourceKind::CodeBlock {
                language: info.as_deref(),
                code,
            },
            MarkupKind::Heading(level) => SourceKind::Heading { level: *level },
            MarkupKind::ThematicBreak => SourceKind::ThematicBreak,
            MarkupKind::HtmlBlock(html) => SourceKind::HtmlBlock { html },
            MarkupKind::List {
                start: Some(start),
                tight,
            } => SourceKind::OrderedList {
                start: *start,
                tight: *tight,
            },
            MarkupKind::List { start: None, tight } => SourceKind::UnorderedList { tight: *tight },
            MarkupKind::Item { checkbox } => SourceKind::ListItem {
                checkbox: *checkbox,
            },
            MarkupKind::Paragraph => SourceKind::Paragraph,
            MarkupKind::Text(text) => SourceKind::Text(text),
            MarkupKind::SoftBreak => SourceKind::SoftBreak,
            MarkupKind::HardBreak => SourceKind::LineBreak,
            MarkupKind::InlineHtml(html) => SourceKind::InlineHtml(html),
            MarkupKind::Code(code) => SourceKind::InlineCode(code),
            MarkupKind::Emphasis => SourceKind::Emphasis,
            MarkupKind::Strong => SourceKind::Strong,
            MarkupKind::Strikethrough => SourceKind::Strikethrough,
            MarkupKind::Link(dest) => SourceKind::Link {
                destination: non_empty(dest),
            },
            MarkupKind::Image(src) => SourceKind::Image {
                source: non_empty(src),
            },
            MarkupKind::Math(math) => SourceKind::Math(math),
            MarkupKind::Table(alignments) => SourceKind::Table { alignments },
            MarkupKind::TableHead => SourceKind::TableHead,
            MarkupKind::TableRow => SourceKind::TableRow,
            MarkupKind::TableCell => SourceKind::TableCell,
            MarkupKind::Other => SourceKind::Other,
        }
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Strip YAML frontmatter from the beginning of markdown content
fn strip_frontmatter(markdown: &str) -> &str {
    if !markdown.starts_with("---") {
        return markdown;
    }
    // Find the closing ---
    if let Some(end) = markdown[3..].find("\n---") {
        // Skip past the closing --- and any trailing newline
        let after_frontmatter = &markdown[3 + end + 4..];
        after_frontmatter.trim_start_matches('\n')
    } else {
        markdown
    }
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_MATH);
    options
}

struct OpenNode {
    node: Markup,
    // Paragraph synthesized around the bare inline content of a tight list item
    implicit: bool,
}

/// Folds pulldown-cmark events into a tree using a stack of open nodes.
/// The bottom of the stack is always the document.
struct Builder {
    stack: Vec<OpenNode>,
}

impl Builder {
    fn new() -> Self {
        Self {
            stack: vec![OpenNode {
                node: Markup::new(MarkupKind::Document),
                implicit: false,
            }],
        }
    }

    fn feed(&mut self, markdown: &str) {
        for event in TextMergeStream::new(Parser::new_ext(markdown, options())) {
            self.process_event(event);
        }
        while self.stack.len() > 1 {
            self.close();
        }
    }

    fn finish(mut self) -> Markup {
        while self.stack.len() > 1 {
            self.close();
        }
        match self.stack.pop() {
            Some(open) => open.node,
            None => Markup::new(MarkupKind::Document),
        }
    }

    fn top(&mut self) -> &mut Markup {
        let last = self.stack.len() - 1;
        &mut self.stack[last].node
    }

    fn attach(&mut self, node: Markup) {
        self.top().children.push(node);
    }

    fn open(&mut self, kind: MarkupKind, implicit: bool) {
        self.stack.push(OpenNode {
            node: Markup::new(kind),
            implicit,
        });
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            if let Some(open) = self.stack.pop() {
                self.attach(open.node);
            }
        }
    }

    fn close_implicit(&mut self) {
        if self.stack.last().is_some_and(|open| open.implicit) {
            self.close();
        }
    }

    /// Inline content must live in a block; wrap it when it lands in an item.
    fn ensure_inline_parent(&mut self) {
        if matches!(self.top().kind, MarkupKind::Item { .. }) {
            self.open(MarkupKind::Paragraph, true);
        }
    }

    fn leaf_inline(&mut self, kind: MarkupKind) {
        self.ensure_inline_parent();
        self.attach(Markup::new(kind));
    }

    fn leaf_block(&mut self, kind: MarkupKind) {
        self.close_implicit();
        self.attach(Markup::new(kind));
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => {
                let kind = tag_kind(tag);
                if kind.is_inline_container() {
                    self.ensure_inline_parent();
                } else {
                    self.close_implicit();
                    if kind == MarkupKind::Paragraph {
                        self.mark_enclosing_list_loose();
                    }
                }
                self.open(kind, false);
            }
            Event::End(_) => {
                self.close_implicit();
                self.close();
            }

            Event::Text(text) => match &mut self.top().kind {
                MarkupKind::CodeBlock { code, .. } => code.push_str(&text),
                MarkupKind::HtmlBlock(html) => html.push_str(&text),
                _ => self.leaf_inline(MarkupKind::Text(text.into_string())),
            },
            Event::Code(code) => self.leaf_inline(MarkupKind::Code(code.into_string())),
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.leaf_inline(MarkupKind::Math(math.into_string()))
            }

            Event::Html(html) => match &mut self.top().kind {
                MarkupKind::HtmlBlock(block) => block.push_str(&html),
                _ => self.leaf_block(MarkupKind::HtmlBlock(html.into_string())),
            },
            Event::InlineHtml(html) => self.leaf_inline(MarkupKind::InlineHtml(html.into_string())),

            Event::SoftBreak => self.leaf_inline(MarkupKind::SoftBreak),
            Event::HardBreak => self.leaf_inline(MarkupKind::HardBreak),
            Event::Rule => self.leaf_block(MarkupKind::ThematicBreak),

            Event::TaskListMarker(checked) => {
                let state = if checked {
                    Checkbox::Checked
                } else {
                    Checkbox::Unchecked
                };
                for open in self.stack.iter_mut().rev() {
                    if let MarkupKind::Item { checkbox } = &mut open.node.kind {
                        *checkbox = Some(state);
                        break;
                    }
                }
            }

            // Footnotes are not enabled
            _ => {}
        }
    }

    /// A paragraph opened directly inside an item makes the list loose.
    fn mark_enclosing_list_loose(&mut self) {
        let depth = self.stack.len();
        if depth < 2 || !matches!(self.stack[depth - 1].node.kind, MarkupKind::Item { .. }) {
            return;
        }
        if let MarkupKind::List { tight, .. } = &mut self.stack[depth - 2].node.kind {
            *tight = false;
        }
    }
}

fn tag_kind(tag: Tag) -> MarkupKind {
    match tag {
        Tag::Paragraph => MarkupKind::Paragraph,
        Tag::Heading { level, .. } => MarkupKind::Heading(heading_level_to_u8(level)),
        Tag::BlockQuote(_) => MarkupKind::BlockQuote,
        Tag::CodeBlock(kind) => MarkupKind::CodeBlock {
            info: match kind {
                CodeBlockKind::Fenced(info) => {
                    let info = info.into_string();
                    if info.is_empty() { None } else { Some(info) }
                }
                CodeBlockKind::Indented => None,
            },
            code: String::new(),
        },
        Tag::HtmlBlock => MarkupKind::HtmlBlock(String::new()),
        Tag::List(start) => MarkupKind::List { start, tight: true },
        Tag::Item => MarkupKind::Item { checkbox: None },
        Tag::Table(alignments) => MarkupKind::Table(
            alignments
                .into_iter()
                .map(|alignment| match alignment {
                    CmarkAlignment::Left => Some(SourceAlignment::Left),
                    CmarkAlignment::Center => Some(SourceAlignment::Center),
                    CmarkAlignment::Right => Some(SourceAlignment::Right),
                    CmarkAlignment::None => None,
                })
                .collect(),
        ),
        Tag::TableHead => MarkupKind::TableHead,
        Tag::TableRow => MarkupKind::TableRow,
        Tag::TableCell => MarkupKind::TableCell,
        Tag::Emphasis => MarkupKind::Emphasis,
        Tag::Strong => MarkupKind::Strong,
        Tag::Strikethrough => MarkupKind::Strikethrough,
        Tag::Link { dest_url, .. } => MarkupKind::Link(dest_url.into_string()),
        Tag::Image { dest_url, .. } => MarkupKind::Image(dest_url.into_string()),
        _ => MarkupKind::Other,
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(markdown: &str) -> Markup {
        Markup::parse(markdown, &ParseOptions::default())
    }

    fn kinds(node: &Markup) -> Vec<SourceKind<'_>> {
        node.children().iter().map(SourceNode::kind).collect()
    }

    #[test]
    fn empty_document() {
        let doc = parse("");
        assert_eq!(doc.kind(), SourceKind::Document);
        assert!(doc.children().is_empty());
    }

    #[test]
    fn merges_adjacent_text() {
        let doc = parse("a\\*b");
        let paragraph = &doc.children()[0];
        assert_eq!(kinds(paragraph), vec![SourceKind::Text("a*b")]);
    }

    #[test]
    fn tight_item_content_is_wrapped_in_paragraph() {
        let doc = parse("- one\n- two");
        let list = &doc.children()[0];
        assert_eq!(list.kind(), SourceKind::UnorderedList { tight: true });
        let item = &list.children()[0];
        assert_eq!(kinds(item), vec![SourceKind::Paragraph]);
        assert_eq!(kinds(&item.children()[0]), vec![SourceKind::Text("one")]);
    }

    #[test]
    fn loose_list() {
        let doc = parse("3. one\n\n4. two");
        assert_eq!(
            doc.children()[0].kind(),
            SourceKind::OrderedList {
                start: 3,
                tight: false
            }
        );
    }

    #[test]
    fn nested_list_stays_inside_item() {
        let doc = parse("- outer\n  - inner\n- next");
        let list = &doc.children()[0];
        assert_eq!(list.children().len(), 2);
        assert_eq!(
            kinds(&list.children()[0]),
            vec![
                SourceKind::Paragraph,
                SourceKind::UnorderedList { tight: true }
            ]
        );
    }

    #[test]
    fn task_markers_attach_to_items() {
        let doc = parse("- [x] done\n- [ ] open\n- plain");
        let list = &doc.children()[0];
        assert_eq!(
            kinds(list),
            vec![
                SourceKind::ListItem {
                    checkbox: Some(Checkbox::Checked)
                },
                SourceKind::ListItem {
                    checkbox: Some(Checkbox::Unchecked)
                },
                SourceKind::ListItem { checkbox: None },
            ]
        );
    }

    #[test]
    fn math_loses_delimiters() {
        let doc = parse("Inline $x^2$ and\n\n$$\\sum_i i$$");
        assert_eq!(
            kinds(&doc.children()[0]),
            vec![SourceKind::Text("Inline "), SourceKind::Math("x^2"), SourceKind::Text(" and")]
        );
        assert_eq!(kinds(&doc.children()[1]), vec![SourceKind::Math("\\sum_i i")]);
    }

    #[test]
    fn code_block_keeps_text() {
        let doc = parse("```rust\nlet x = 1;\n    indented\n```");
        assert_eq!(
            doc.children()[0].kind(),
            SourceKind::CodeBlock {
                language: Some("rust"),
                code: "let x = 1;\n    indented\n"
            }
        );
    }

    #[test]
    fn html_block_is_concatenated() {
        let doc = parse("<div>\n<p>hi</p>\n</div>\n");
        assert_eq!(
            kinds(&doc),
            vec![SourceKind::HtmlBlock {
                html: "<div>\n<p>hi</p>\n</div>\n"
            }]
        );
    }

    #[test]
    fn directives_become_html_blocks_in_place() {
        let doc = parse("First\n\n@Comment {\nhidden *text*\n}\nLast");
        assert_eq!(
            kinds(&doc),
            vec![
                SourceKind::Paragraph,
                SourceKind::HtmlBlock {
                    html: "@Comment {\nhidden *text*\n}\n"
                },
                SourceKind::Paragraph,
            ]
        );
    }

    #[test]
    fn directives_can_be_disabled() {
        let options = ParseOptions {
            block_directives: false,
            ..ParseOptions::default()
        };
        let doc = Markup::parse("@Comment", &options);
        assert_eq!(kinds(&doc), vec![SourceKind::Paragraph]);
    }

    #[test]
    fn strips_frontmatter_when_asked() {
        let options = ParseOptions {
            strip_frontmatter: true,
            ..ParseOptions::default()
        };
        let doc = Markup::parse("---\ntitle: x\n---\n\n# Hi", &options);
        assert_eq!(kinds(&doc), vec![SourceKind::Heading { level: 1 }]);
    }

    #[test]
    fn table_structure() {
        let doc = parse("| A | B |\n|:--|--:|\n| 1 | 2 |");
        let table = &doc.children()[0];
        assert_eq!(
            table.kind(),
            SourceKind::Table {
                alignments: &[Some(SourceAlignment::Left), Some(SourceAlignment::Right)]
            }
        );
        assert_eq!(kinds(table), vec![SourceKind::TableHead, SourceKind::TableRow]);
        assert_eq!(
            kinds(&table.children()[0]),
            vec![SourceKind::TableCell, SourceKind::TableCell]
        );
    }
}
