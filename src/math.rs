//! Math rendering collaborator.
//!
//! The inline renderer hands every math span to a [`MathRenderer`] as a
//! `$`-delimited LaTeX string and splices the returned components into its
//! output. [`SourceMath`] is the bundled implementation: it keeps the LaTeX
//! source as monospace text and memoises results per [`MathCacheKey`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use tracing::trace;

use crate::styled::{Color, StyledText, TextStyle};

/// Which parts of the input are treated as math
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParsingMode {
    /// Only delimited equations; everything else is text
    #[default]
    OnlyEquations,
    /// The whole input is one equation
    All,
}

/// How a component that failed to render is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorMode {
    /// The original input, unstyled
    #[default]
    Original,
    /// The error message, highlighted
    Error,
    /// Whatever could be rendered
    Rendered,
}

/// Parameters of one render request.
#[derive(Debug, Clone, PartialEq)]
pub struct MathParams {
    pub unencode_html: bool,
    pub parsing_mode: ParsingMode,
    pub error_mode: ErrorMode,
    pub process_escapes: bool,
    pub style: TextStyle,
    pub display_scale: f32,
}

impl MathParams {
    pub fn cache_key(&self, expression: &str) -> MathCacheKey {
        MathCacheKey {
            expression: expression.to_string(),
            unencode_html: self.unencode_html,
            parsing_mode: self.parsing_mode,
            error_mode: self.error_mode,
            process_escapes: self.process_escapes,
            style: self.style.clone(),
            display_scale_bits: self.display_scale.to_bits(),
        }
    }
}

/// Identity of a rendering: the expression plus every parameter affecting it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MathCacheKey {
    expression: String,
    unencode_html: bool,
    parsing_mode: ParsingMode,
    error_mode: ErrorMode,
    process_escapes: bool,
    style: TextStyle,
    display_scale_bits: u32,
}

/// Parameters for turning a component into styled text
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRenderParams {
    pub style: TextStyle,
    pub display_scale: f32,
    pub error_mode: ErrorMode,
}

pub trait ComponentBlock {
    /// Display equations get their own line unless the caller forces inline
    fn is_equation_block(&self) -> bool;

    fn to_styled_text(&self, params: &BlockRenderParams) -> StyledText;
}

/// Renders LaTeX expressions into component blocks.
///
/// Implementations that cache must tolerate concurrent calls.
pub trait MathRenderer {
    type Block: ComponentBlock;

    fn is_cached(&self, expression: &str, params: &MathParams) -> bool;

    /// Finished components, in input order
    fn render_sync(&self, expression: &str, params: &MathParams) -> Vec<Self::Block>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ComponentKind {
    Text,
    InlineEquation,
    BlockEquation,
    Error { message: String },
}

/// One component of an expression as produced by [`SourceMath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceComponent {
    kind: ComponentKind,
    /// Equation body without delimiters, literal text, or the failed input
    text: String,
}

impl SourceComponent {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ComponentKind::Error { .. })
    }
}

const ERROR_COLOR: Color = Color::rgb(0xd0, 0x30, 0x30);

impl ComponentBlock for SourceComponent {
    fn is_equation_block(&self) -> bool {
        self.kind == ComponentKind::BlockEquation
    }

    fn to_styled_text(&self, params: &BlockRenderParams) -> StyledText {
        let monospace = TextStyle {
            monospace: true,
            ..params.style.clone()
        };
        match &self.kind {
            ComponentKind::Text => StyledText::plain(&self.text, &params.style),
            ComponentKind::InlineEquation | ComponentKind::BlockEquation => {
                StyledText::plain(&self.text, &monospace)
            }
            ComponentKind::Error { message } => match params.error_mode {
                ErrorMode::Original => StyledText::plain(&self.text, &params.style),
                ErrorMode::Rendered => StyledText::plain(&self.text, &monospace),
                ErrorMode::Error => StyledText::plain(
                    message,
                    &TextStyle {
                        foreground: Some(ERROR_COLOR),
                        ..params.style.clone()
                    },
                ),
            },
        }
    }
}

/// Caching renderer that shows equations as their LaTeX source.
#[derive(Debug, Default)]
pub struct SourceMath {
    cache: Mutex<HashMap<MathCacheKey, Arc<Vec<SourceComponent>>>>,
}

impl SourceMath {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MathRenderer for SourceMath {
    type Block = SourceComponent;

    fn is_cached(&self, expression: &str, params: &MathParams) -> bool {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.contains_key(&params.cache_key(expression))
    }

    fn render_sync(&self, expression: &str, params: &MathParams) -> Vec<SourceComponent> {
        let key = params.cache_key(expression);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let components = cache
            .entry(key)
            .or_insert_with(|| {
                trace!(expression, "populating math cache");
                Arc::new(split_components(expression, params))
            })
            .clone();
        drop(cache);
        components.as_ref().clone()
    }
}

static DELIMITERS: [(&str, &str, ComponentKind); 4] = [
    ("$$", "$$", ComponentKind::BlockEquation),
    ("\\[", "\\]", ComponentKind::BlockEquation),
    ("$", "$", ComponentKind::InlineEquation),
    ("\\(", "\\)", ComponentKind::InlineEquation),
];

fn split_components(expression: &str, params: &MathParams) -> Vec<SourceComponent> {
    let input = if params.unencode_html {
        unencode_html(expression)
    } else {
        expression.to_string()
    };

    if params.parsing_mode == ParsingMode::All {
        return vec![SourceComponent {
            kind: ComponentKind::InlineEquation,
            text: input,
        }];
    }

    let mut components = Vec::new();
    let mut text = String::new();
    let mut rest = input.as_str();

    while let Some(ch) = rest.chars().next() {
        if rest.starts_with("\\\\") {
            text.push_str("\\\\");
            rest = &rest[2..];
            continue;
        }
        if ch == '\\' && rest[1..].starts_with('$') {
            if !params.process_escapes {
                text.push('\\');
            }
            text.push('$');
            rest = &rest[2..];
            continue;
        }

        let mut openers = DELIMITERS
            .iter()
            .filter(|(open, _, _)| rest.starts_with(open))
            .peekable();
        let Some((_, first_close, _)) = openers.peek().copied() else {
            text.push(ch);
            rest = &rest[ch.len_utf8()..];
            continue;
        };

        if !text.is_empty() {
            components.push(SourceComponent {
                kind: ComponentKind::Text,
                text: std::mem::take(&mut text),
            });
        }

        // `$$` with no closing `$$` may still be an empty `$…$` pair
        let closed = openers.find_map(|(open, close, kind)| {
            let body = &rest[open.len()..];
            find_unescaped(body, close).map(|end| (body, end, close, kind))
        });
        match closed {
            Some((body, end, close, kind)) => {
                components.push(SourceComponent {
                    kind: kind.clone(),
                    text: body[..end].to_string(),
                });
                rest = &body[end + close.len()..];
            }
            None => {
                components.push(SourceComponent {
                    kind: ComponentKind::Error {
                        message: format!("missing closing {first_close}"),
                    },
                    text: rest.to_string(),
                });
                rest = "";
            }
        }
    }

    if !text.is_empty() {
        components.push(SourceComponent {
            kind: ComponentKind::Text,
            text,
        });
    }
    components
}

/// Byte offset of the first `close` in `body` not escaped by a backslash.
///
/// A `$` is escaped only by an odd run of backslashes; `\\$` closes.
fn find_unescaped(body: &str, close: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = body[from..].find(close) {
        let at = from + found;
        let backslashes = body[..at].bytes().rev().take_while(|b| *b == b'\\').count();
        if close.starts_with('$') && backslashes % 2 == 1 {
            from = at + close.len();
            continue;
        }
        return Some(at);
    }
    None
}

fn unencode_html(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
