use tracing::{debug, trace};

use crate::block::{Alignment, BlockNode, InlineNode, ListItem, TableCell, TableRow, TaskListItem};
use crate::markup::{Markup, ParseOptions};
use crate::source::{Checkbox, SourceAlignment, SourceKind, SourceNode};

/// Parse markdown text into a list of blocks
pub fn parse(markdown: &str, options: &ParseOptions) -> Vec<BlockNode> {
    let document = Markup::parse(markdown, options);
    let blocks = parse_source(&document);
    debug!(
        input_len = markdown.len(),
        blocks = blocks.len(),
        "parsed markdown document"
    );
    blocks
}

/// Project any source tree onto block nodes, keeping top-level order.
pub fn parse_source<N: SourceNode>(root: &N) -> Vec<BlockNode> {
    let mut out = Vec::with_capacity(root.children().len());
    visit(root, &mut out);
    blocks(out)
}

/// Result of visiting one source node
#[derive(Debug)]
enum Parsed {
    Block(BlockNode),
    Inline(InlineNode),
}

fn blocks(nodes: Vec<Parsed>) -> Vec<BlockNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            Parsed::Block(block) => Some(block),
            Parsed::Inline(_) => None,
        })
        .collect()
}

fn inlines(nodes: Vec<Parsed>) -> Vec<InlineNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            Parsed::Inline(inline) => Some(inline),
            Parsed::Block(_) => None,
        })
        .collect()
}

fn visit_children<N: SourceNode>(node: &N) -> Vec<Parsed> {
    let mut out = Vec::new();
    for child in node.children() {
        visit(child, &mut out);
    }
    out
}

fn block_children<N: SourceNode>(node: &N) -> Vec<BlockNode> {
    blocks(visit_children(node))
}

fn inline_children<N: SourceNode>(node: &N) -> Vec<InlineNode> {
    inlines(visit_children(node))
}

/// Visit a node and append what it produces to `out`.
fn visit<N: SourceNode>(node: &N, out: &mut Vec<Parsed>) {
    let parsed = match node.kind() {
        SourceKind::BlockQuote => Parsed::Block(BlockNode::Blockquote {
            children: block_children(node),
        }),
        SourceKind::CodeBlock { language, code } => Parsed::Block(BlockNode::CodeBlock {
            fence_info: language.map(str::to_string),
            content: code.to_string(),
        }),
        SourceKind::Heading { level } => Parsed::Block(BlockNode::Heading {
            level: level.clamp(1, 6),
            content: inline_children(node),
        }),
        SourceKind::ThematicBreak => Parsed::Block(BlockNode::ThematicBreak),
        SourceKind::HtmlBlock { html } => Parsed::Block(BlockNode::HtmlBlock {
            content: html.to_string(),
        }),
        SourceKind::OrderedList { start, tight } => {
            Parsed::Block(list(node, tight, ListKind::Numbered { start }))
        }
        SourceKind::UnorderedList { tight } => Parsed::Block(list(node, tight, ListKind::Bulleted)),
        SourceKind::Paragraph => Parsed::Block(BlockNode::Paragraph {
            content: inline_children(node),
        }),
        SourceKind::Table { alignments } => Parsed::Block(table(node, alignments)),

        SourceKind::Text(text) => Parsed::Inline(InlineNode::Text(text.to_string())),
        SourceKind::SoftBreak => Parsed::Inline(InlineNode::SoftBreak),
        SourceKind::LineBreak => Parsed::Inline(InlineNode::LineBreak),
        SourceKind::InlineHtml(html) => Parsed::Inline(InlineNode::Html(html.to_string())),
        SourceKind::InlineCode(code) => Parsed::Inline(InlineNode::Code(code.to_string())),
        SourceKind::Math(math) => Parsed::Inline(InlineNode::Math(math.to_string())),
        SourceKind::Emphasis => Parsed::Inline(InlineNode::Emphasis(inline_children(node))),
        SourceKind::Strong => Parsed::Inline(InlineNode::Strong(inline_children(node))),
        SourceKind::Strikethrough => {
            Parsed::Inline(InlineNode::Strikethrough(inline_children(node)))
        }
        SourceKind::Link { destination } => Parsed::Inline(InlineNode::Link {
            destination: destination.unwrap_or_default().to_string(),
            children: inline_children(node),
        }),
        SourceKind::Image { source } => Parsed::Inline(InlineNode::Image {
            source: source.unwrap_or_default().to_string(),
            children: inline_children(node),
        }),

        // Structural nodes only meaningful under their parent, and unknown
        // kinds: keep whatever their children produce.
        kind @ (SourceKind::Document
        | SourceKind::ListItem { .. }
        | SourceKind::TableHead
        | SourceKind::TableRow
        | SourceKind::TableCell
        | SourceKind::Other) => {
            trace!(?kind, "flattening node without a dedicated handler");
            for child in node.children() {
                visit(child, out);
            }
            return;
        }
    };
    out.push(parsed);
}

#[derive(Clone, Copy)]
enum ListKind {
    Numbered { start: u64 },
    Bulleted,
}

fn list<N: SourceNode>(node: &N, is_tight: bool, kind: ListKind) -> BlockNode {
    let mut items = Vec::with_capacity(node.children().len());
    let mut is_task_list = false;

    for item in node.children() {
        let checkbox = match item.kind() {
            SourceKind::ListItem { checkbox } => checkbox,
            _ => None,
        };
        is_task_list |= checkbox.is_some();
        items.push(TaskListItem {
            is_completed: checkbox == Some(Checkbox::Checked),
            children: block_children(item),
        });
    }

    if is_task_list {
        return BlockNode::TaskList { is_tight, items };
    }

    let items = items
        .into_iter()
        .map(|item| ListItem {
            children: item.children,
        })
        .collect();
    match kind {
        ListKind::Numbered { start } => BlockNode::NumberedList {
            is_tight,
            start,
            items,
        },
        ListKind::Bulleted => BlockNode::BulletedList { is_tight, items },
    }
}

fn table<N: SourceNode>(node: &N, alignments: &[Option<SourceAlignment>]) -> BlockNode {
    let column_alignments = alignments
        .iter()
        .map(|alignment| match alignment {
            Some(SourceAlignment::Left) => Alignment::Left,
            Some(SourceAlignment::Center) => Alignment::Center,
            Some(SourceAlignment::Right) => Alignment::Right,
            None => Alignment::None,
        })
        .collect();

    let mut header = TableRow { cells: Vec::new() };
    let mut body = Vec::new();
    for section in node.children() {
        match section.kind() {
            SourceKind::TableHead => header = table_row(section),
            SourceKind::TableRow => body.push(table_row(section)),
            _ => {}
        }
    }

    let mut rows = Vec::with_capacity(body.len() + 1);
    rows.push(header);
    rows.extend(body);
    BlockNode::Table {
        column_alignments,
        rows,
    }
}

/// Cells are inline-only; block content inside a cell is dropped.
fn table_row<N: SourceNode>(row: &N) -> TableRow {
    let cells = row
        .children()
        .iter()
        .filter(|cell| cell.kind() == SourceKind::TableCell)
        .map(|cell| TableCell {
            content: inline_children(cell),
        })
        .collect();
    TableRow { cells }
}
