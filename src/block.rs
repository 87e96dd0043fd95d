/// Inline-level nodes that flow within a line of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineNode {
    Text(String),
    SoftBreak,
    LineBreak,
    Html(String),
    Image {
        source: String,
        children: Vec<InlineNode>,
    },
    /// Math expression without its `$`/`$$` delimiters
    Math(String),
    Code(String),
    Emphasis(Vec<InlineNode>),
    Strong(Vec<InlineNode>),
    Strikethrough(Vec<InlineNode>),
    Link {
        destination: String,
        children: Vec<InlineNode>,
    },
}

/// A plain list item holding block content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub children: Vec<BlockNode>,
}

/// An item of a task list; items without a checkbox are not completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListItem {
    pub is_completed: bool,
    pub children: Vec<BlockNode>,
}

/// Column alignment of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    Left,
    Center,
    Right,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub content: Vec<InlineNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// Block-level elements parsed from Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockNode {
    Blockquote {
        children: Vec<BlockNode>,
    },
    CodeBlock {
        fence_info: Option<String>,
        content: String,
    },
    Heading {
        level: u8,
        content: Vec<InlineNode>,
    },
    ThematicBreak,
    HtmlBlock {
        content: String,
    },
    NumberedList {
        is_tight: bool,
        start: u64,
        items: Vec<ListItem>,
    },
    BulletedList {
        is_tight: bool,
        items: Vec<ListItem>,
    },
    TaskList {
        is_tight: bool,
        items: Vec<TaskListItem>,
    },
    Paragraph {
        content: Vec<InlineNode>,
    },
    /// The first row is always the header row
    Table {
        column_alignments: Vec<Alignment>,
        rows: Vec<TableRow>,
    },
}
