use serde::Deserialize;
use url::Url;

use crate::block::InlineNode;
use crate::styled::{Color, StyledText, TextStyle};

/// Maps an inline node to its attributed text.
///
/// The inline renderer calls this for every node it has no special handling
/// for; all styling policy lives behind this trait. `base_url` is the
/// document location that relative link destinations resolve against.
pub trait StyleTable {
    fn attributed(
        &self,
        node: &InlineNode,
        base: &TextStyle,
        base_url: Option<&Url>,
    ) -> StyledText;
}

/// Resolve a link destination against `base_url`.
///
/// Empty destinations and ones that fail to join are kept as written.
pub fn resolve_link(destination: &str, base_url: Option<&Url>) -> String {
    match base_url {
        Some(base) if !destination.is_empty() => base
            .join(destination)
            .map(String::from)
            .unwrap_or_else(|_| destination.to_string()),
        _ => destination.to_string(),
    }
}

/// How a soft line break is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoftBreak {
    #[default]
    Space,
    Newline,
}

/// Attribute overrides layered on top of the inherited style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StyleDelta {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub monospace: Option<bool>,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}

impl StyleDelta {
    pub fn apply(&self, base: &TextStyle) -> TextStyle {
        TextStyle {
            bold: self.bold.unwrap_or(base.bold),
            italic: self.italic.unwrap_or(base.italic),
            underline: self.underline.unwrap_or(base.underline),
            strikethrough: self.strikethrough.unwrap_or(base.strikethrough),
            monospace: self.monospace.unwrap_or(base.monospace),
            foreground: self.foreground.or(base.foreground),
            background: self.background.or(base.background),
            link: base.link.clone(),
        }
    }
}

/// Configurable style table, one delta per inline node kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TextStyles {
    pub code: StyleDelta,
    pub emphasis: StyleDelta,
    pub strong: StyleDelta,
    pub strikethrough: StyleDelta,
    pub link: StyleDelta,
    pub html: StyleDelta,
    pub soft_break: SoftBreak,
}

impl Default for TextStyles {
    fn default() -> Self {
        Self {
            code: StyleDelta {
                monospace: Some(true),
                ..StyleDelta::default()
            },
            emphasis: StyleDelta {
                italic: Some(true),
                ..StyleDelta::default()
            },
            strong: StyleDelta {
                bold: Some(true),
                ..StyleDelta::default()
            },
            strikethrough: StyleDelta {
                strikethrough: Some(true),
                ..StyleDelta::default()
            },
            link: StyleDelta {
                underline: Some(true),
                foreground: Some(Color::rgb(0x1a, 0x4f, 0x8b)),
                ..StyleDelta::default()
            },
            html: StyleDelta::default(),
            soft_break: SoftBreak::Space,
        }
    }
}

/// Per-call state threaded through the recursion
struct Target<'a> {
    base_url: Option<&'a Url>,
    out: StyledText,
}

impl TextStyles {
    fn render_into(&self, node: &InlineNode, style: &TextStyle, target: &mut Target<'_>) {
        let out = &mut target.out;
        match node {
            InlineNode::Text(text) => out.push_str(text, style),
            InlineNode::SoftBreak => match self.soft_break {
                SoftBreak::Space => out.push_str(" ", style),
                SoftBreak::Newline => out.push_str("\n", style),
            },
            InlineNode::LineBreak => out.push_str("\n", style),
            InlineNode::Html(html) => out.push_str(html, &self.html.apply(style)),
            InlineNode::Code(code) => out.push_str(code, &self.code.apply(style)),
            InlineNode::Math(source) => out.push_str(&format!("${source}$"), style),
            // Nested images show their alt text
            InlineNode::Image { children, .. } => self.render_children(children, style, target),
            InlineNode::Emphasis(children) => {
                self.render_children(children, &self.emphasis.apply(style), target)
            }
            InlineNode::Strong(children) => {
                self.render_children(children, &self.strong.apply(style), target)
            }
            InlineNode::Strikethrough(children) => {
                self.render_children(children, &self.strikethrough.apply(style), target)
            }
            InlineNode::Link {
                destination,
                children,
            } => {
                let mut link_style = self.link.apply(style);
                link_style.link = Some(resolve_link(destination, target.base_url));
                self.render_children(children, &link_style, target);
            }
        }
    }

    fn render_children(
        &self,
        children: &[InlineNode],
        style: &TextStyle,
        target: &mut Target<'_>,
    ) {
        for child in children {
            self.render_into(child, style, target);
        }
    }
}

impl StyleTable for TextStyles {
    fn attributed(
        &self,
        node: &InlineNode,
        base: &TextStyle,
        base_url: Option<&Url>,
    ) -> StyledText {
        let mut target = Target {
            base_url,
            out: StyledText::new(),
        };
        self.render_into(node, base, &mut target);
        target.out
    }
}
