//! Property-based tests for document parsing and inline rendering

use std::collections::HashMap;

use marktext::{
    BlockNode, InlineNode, SourceMath, TextStyle, TextStyles, parse_document, render_inline,
};
use proptest::prelude::*;

/// Markdown-heavy character soup
fn markdown_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        ".{0,200}",
        "[-*_#>`$|:\\[\\]()!<>/@{}~ \na-z0-9\t]{0,200}",
    ]
}

fn word_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

/// `None` = no checkbox, `Some(done)` = `[x]` or `[ ]`
fn items_strategy() -> impl Strategy<Value = Vec<(Option<bool>, String)>> {
    prop::collection::vec((prop::option::of(any::<bool>()), word_strategy()), 1..6)
}

fn list_markdown(items: &[(Option<bool>, String)], ordered: bool) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, (checkbox, word))| {
            let marker = if ordered {
                format!("{}.", i + 1)
            } else {
                "-".to_string()
            };
            let checkbox = match checkbox {
                Some(true) => "[x] ",
                Some(false) => "[ ] ",
                None => "",
            };
            format!("{} {}{}\n", marker, checkbox, word)
        })
        .collect()
}

proptest! {
    #[test]
    fn parsing_never_panics(markdown in markdown_strategy()) {
        let _ = parse_document(&markdown);
    }

    #[test]
    fn any_checkbox_makes_every_item_a_task(items in items_strategy(), ordered in any::<bool>()) {
        let blocks = parse_document(&list_markdown(&items, ordered));
        prop_assert_eq!(blocks.len(), 1);

        let has_checkbox = items.iter().any(|(checkbox, _)| checkbox.is_some());
        match &blocks[0] {
            BlockNode::TaskList { items: parsed, .. } => {
                prop_assert!(has_checkbox);
                let completed: Vec<bool> = parsed.iter().map(|item| item.is_completed).collect();
                let expected: Vec<bool> = items
                    .iter()
                    .map(|(checkbox, _)| *checkbox == Some(true))
                    .collect();
                prop_assert_eq!(completed, expected);
            }
            BlockNode::NumberedList { items: parsed, .. } => {
                prop_assert!(!has_checkbox && ordered);
                prop_assert_eq!(parsed.len(), items.len());
            }
            BlockNode::BulletedList { items: parsed, .. } => {
                prop_assert!(!has_checkbox && !ordered);
                prop_assert_eq!(parsed.len(), items.len());
            }
            other => prop_assert!(false, "unexpected block {:?}", other),
        }
    }

    #[test]
    fn tables_always_have_a_header(columns in 1usize..5, body_rows in 0usize..4) {
        let row = |cell: &str| format!("|{}\n", format!(" {} |", cell).repeat(columns));
        let mut markdown = row("h");
        markdown.push_str(&format!("|{}\n", "---|".repeat(columns)));
        for _ in 0..body_rows {
            markdown.push_str(&row("b"));
        }

        let blocks = parse_document(&markdown);
        let BlockNode::Table { column_alignments, rows } = &blocks[0] else {
            return Err(TestCaseError::fail(format!("expected table, got {:?}", blocks)));
        };
        prop_assert_eq!(rows.len(), body_rows + 1);
        prop_assert_eq!(column_alignments.len(), rows[0].cells.len());
        prop_assert_eq!(rows[0].cells.len(), columns);
    }

    #[test]
    fn br_collapses_following_whitespace(spaces in " {0,4}", word in word_strategy()) {
        let nodes = [
            InlineNode::Html("<br>".to_string()),
            InlineNode::SoftBreak,
            InlineNode::Text(format!("{}{}", spaces, word)),
        ];
        let out = render_inline(
            &nodes,
            &TextStyles::default(),
            &HashMap::new(),
            &SourceMath::new(),
            &TextStyle::default(),
            1.0,
        );
        prop_assert_eq!(out.plain_text(), format!("\n{}", word));
    }
}
