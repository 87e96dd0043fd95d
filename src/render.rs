use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use crate::block::InlineNode;
use crate::math::{
    BlockRenderParams, ComponentBlock, ErrorMode, MathParams, MathRenderer, ParsingMode,
};
use crate::style::StyleTable;
use crate::styled::{ImageHandle, StyledText, TextStyle};

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<\s*/?\s*([A-Za-z][A-Za-z0-9-]*)").unwrap());

/// How math components are placed in the flow of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MathOptions {
    /// Keep display equations on the current line
    pub force_inline: bool,
    /// Passed through to the math renderer when components become text
    pub error_mode: ErrorMode,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            force_inline: false,
            error_mode: ErrorMode::Error,
        }
    }
}

/// Flattens inline nodes into one [`StyledText`].
///
/// Images are looked up in a caller-supplied map, math spans go to a
/// [`MathRenderer`], and everything else is styled by a [`StyleTable`].
/// Link destinations are resolved against an optional base URL.
pub struct InlineRenderer<'a, S: ?Sized, M: ?Sized> {
    styles: &'a S,
    images: &'a HashMap<String, ImageHandle>,
    math: &'a M,
    base: &'a TextStyle,
    display_scale: f32,
    math_options: MathOptions,
    base_url: Option<&'a Url>,
}

/// State of a single render pass
#[derive(Default)]
struct Pass {
    result: StyledText,
    // Set after a `<br>`; swallows the next soft break or leading whitespace
    skip_next_whitespace: bool,
}

impl<'a, S, M> InlineRenderer<'a, S, M>
where
    S: StyleTable + ?Sized,
    M: MathRenderer + ?Sized,
{
    pub fn new(
        styles: &'a S,
        images: &'a HashMap<String, ImageHandle>,
        math: &'a M,
        base: &'a TextStyle,
        display_scale: f32,
    ) -> Self {
        Self {
            styles,
            images,
            math,
            base,
            display_scale,
            math_options: MathOptions::default(),
            base_url: None,
        }
    }

    #[must_use]
    pub fn math_options(mut self, options: MathOptions) -> Self {
        self.math_options = options;
        self
    }

    /// Resolve relative link destinations against `url`.
    #[must_use]
    pub fn base_url(mut self, url: Option<&'a Url>) -> Self {
        self.base_url = url;
        self
    }

    pub fn render(&self, nodes: &[InlineNode]) -> StyledText {
        let pass = nodes
            .iter()
            .fold(Pass::default(), |pass, node| self.step(pass, node));
        debug!(
            nodes = nodes.len(),
            runs = pass.result.runs().len(),
            base_url = self.base_url.map(Url::as_str),
            "rendered inline content"
        );
        pass.result
    }

    fn step(&self, mut pass: Pass, node: &InlineNode) -> Pass {
        match node {
            InlineNode::Text(content) => {
                if std::mem::take(&mut pass.skip_next_whitespace) {
                    let trimmed = InlineNode::Text(content.trim_start().to_string());
                    self.default_render(&mut pass, &trimmed);
                } else {
                    self.default_render(&mut pass, node);
                }
            }
            InlineNode::SoftBreak => {
                if !std::mem::take(&mut pass.skip_next_whitespace) {
                    self.default_render(&mut pass, node);
                }
            }
            InlineNode::Html(html) => {
                if is_line_break_tag(html) {
                    self.default_render(&mut pass, &InlineNode::LineBreak);
                    pass.skip_next_whitespace = true;
                } else {
                    self.default_render(&mut pass, node);
                }
            }
            InlineNode::Image { source, .. } => {
                if let Some(image) = self.images.get(source) {
                    pass.result.push_image(image.clone());
                }
            }
            InlineNode::Math(source) => {
                pass.result += self.render_math(source);
            }
            _ => self.default_render(&mut pass, node),
        }
        pass
    }

    fn default_render(&self, pass: &mut Pass, node: &InlineNode) {
        pass.result += self.styles.attributed(node, self.base, self.base_url);
    }

    fn render_math(&self, source: &str) -> StyledText {
        let latex = format!("${source}$");
        let params = MathParams {
            unencode_html: false,
            parsing_mode: ParsingMode::OnlyEquations,
            error_mode: ErrorMode::Original,
            process_escapes: false,
            style: self.base.clone(),
            display_scale: self.display_scale,
        };
        let cached = self.math.is_cached(&latex, &params);
        trace!(%latex, cached, "rendering math span");

        let block_params = BlockRenderParams {
            style: self.base.clone(),
            display_scale: self.display_scale,
            error_mode: self.math_options.error_mode,
        };
        self.math
            .render_sync(&latex, &params)
            .iter()
            .map(|block| {
                let text = block.to_styled_text(&block_params);
                if block.is_equation_block() && !self.math_options.force_inline {
                    StyledText::plain("\n", self.base) + text + StyledText::plain("\n", self.base)
                } else {
                    text
                }
            })
            .fold(StyledText::new(), |acc, text| acc + text)
    }
}

/// `<br>`, `<br/>`, `<BR />` and the stray `</br>`
fn is_line_break_tag(html: &str) -> bool {
    HTML_TAG
        .captures(html)
        .and_then(|captures| captures.get(1))
        .is_some_and(|name| name.as_str().eq_ignore_ascii_case("br"))
}

/// Render inline nodes in one pass with default math placement.
pub fn render_inline<S, M>(
    nodes: &[InlineNode],
    styles: &S,
    images: &HashMap<String, ImageHandle>,
    math: &M,
    base: &TextStyle,
    display_scale: f32,
) -> StyledText
where
    S: StyleTable + ?Sized,
    M: MathRenderer + ?Sized,
{
    InlineRenderer::new(styles, images, math, base, display_scale).render(nodes)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::block::BlockNode;
    use crate::math::SourceMath;
    use crate::parse_document;
    use crate::style::TextStyles;
    use crate::styled::{Run, TextRun};

    fn text(s: &str) -> InlineNode {
        InlineNode::Text(s.to_string())
    }

    fn render(nodes: &[InlineNode]) -> StyledText {
        render_inline(
            nodes,
            &TextStyles::default(),
            &HashMap::new(),
            &SourceMath::new(),
            &TextStyle::default(),
            1.0,
        )
    }

    #[test]
    fn plain_text() {
        assert_eq!(
            render(&[text("hello"), InlineNode::SoftBreak, text("world")]).plain_text(),
            "hello world"
        );
    }

    #[test]
    fn br_swallows_soft_break_and_leading_whitespace() {
        let out = render(&[
            InlineNode::Html("<br>".to_string()),
            InlineNode::SoftBreak,
            text("  hello"),
        ]);
        assert_eq!(out.plain_text(), "\nhello");
    }

    #[test]
    fn br_trims_only_the_next_text() {
        let out = render(&[
            text("a"),
            InlineNode::Html("<BR />".to_string()),
            text("  b"),
            text("  c"),
        ]);
        assert_eq!(out.plain_text(), "a\nb  c");
    }

    #[test]
    fn br_from_parsed_markdown() {
        let blocks = parse_document("one<br/>\n   two");
        let BlockNode::Paragraph { content } = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(render(content).plain_text(), "one\ntwo");
    }

    #[test]
    fn other_html_is_literal() {
        let out = render(&[
            InlineNode::Html("<span>".to_string()),
            text("x"),
            InlineNode::Html("</span>".to_string()),
        ]);
        assert_eq!(out.plain_text(), "<span>x</span>");
    }

    #[test]
    fn skip_flag_starts_cleared() {
        assert_eq!(render(&[text("  indented")]).plain_text(), "  indented");
    }

    #[test]
    fn trailing_br_does_not_leak_into_the_next_render() {
        let styles = TextStyles::default();
        let images = HashMap::new();
        let math = SourceMath::new();
        let base = TextStyle::default();
        let renderer = InlineRenderer::new(&styles, &images, &math, &base, 1.0);

        let first = renderer.render(&[text("a"), InlineNode::Html("<br>".to_string())]);
        assert_eq!(first.plain_text(), "a\n");
        assert_eq!(renderer.render(&[text("  x")]).plain_text(), "  x");
    }

    #[test]
    fn missing_image_is_skipped() {
        let out = render(&[InlineNode::Image {
            source: "missing.png".to_string(),
            children: vec![],
        }]);
        assert!(out.is_empty());
    }

    #[test]
    fn resolved_image_is_spliced_in() {
        let logo = ImageHandle {
            key: "logo".to_string(),
            width: 32,
            height: 32,
        };
        let images = HashMap::from([("logo.png".to_string(), logo.clone())]);
        let out = render_inline(
            &[
                text("a "),
                InlineNode::Image {
                    source: "logo.png".to_string(),
                    children: vec![text("alt")],
                },
            ],
            &TextStyles::default(),
            &images,
            &SourceMath::new(),
            &TextStyle::default(),
            1.0,
        );
        assert_eq!(
            out.runs(),
            &[
                Run::Text(TextRun {
                    text: "a ".to_string(),
                    style: TextStyle::default(),
                }),
                Run::Image(logo),
            ]
        );
    }

    #[test]
    fn styled_containers_go_through_the_style_table() {
        let out = render(&[
            InlineNode::Strong(vec![text("bold")]),
            InlineNode::LineBreak,
            InlineNode::Code("c".to_string()),
        ]);
        let styles: Vec<_> = out
            .runs()
            .iter()
            .map(|run| match run {
                Run::Text(run) => (run.text.as_str(), run.style.bold, run.style.monospace),
                Run::Image(_) => ("", false, false),
            })
            .collect();
        assert_eq!(
            styles,
            vec![("bold", true, false), ("\n", false, false), ("c", false, true)]
        );
    }

    /// Records every call and returns canned components.
    #[derive(Default)]
    struct RecordingMath {
        checks: RefCell<Vec<String>>,
        renders: RefCell<Vec<String>>,
        block: bool,
    }

    struct Canned {
        block: bool,
        text: String,
    }

    impl ComponentBlock for Canned {
        fn is_equation_block(&self) -> bool {
            self.block
        }

        fn to_styled_text(&self, params: &BlockRenderParams) -> StyledText {
            StyledText::plain(&self.text, &params.style)
        }
    }

    impl MathRenderer for RecordingMath {
        type Block = Canned;

        fn is_cached(&self, expression: &str, _params: &MathParams) -> bool {
            self.checks.borrow_mut().push(expression.to_string());
            false
        }

        fn render_sync(&self, expression: &str, _params: &MathParams) -> Vec<Canned> {
            self.renders.borrow_mut().push(expression.to_string());
            vec![Canned {
                block: self.block,
                text: "M".to_string(),
            }]
        }
    }

    fn render_with(math: &RecordingMath, nodes: &[InlineNode], options: MathOptions) -> String {
        let base = TextStyle::default();
        let images = HashMap::new();
        let styles = TextStyles::default();
        InlineRenderer::new(&styles, &images, math, &base, 2.0)
            .math_options(options)
            .render(nodes)
            .plain_text()
    }

    #[test]
    fn math_is_wrapped_in_dollars_and_rendered_once() {
        let math = RecordingMath::default();
        let out = render_with(
            &math,
            &[text("a "), InlineNode::Math("x^2".to_string())],
            MathOptions::default(),
        );
        assert_eq!(out, "a M");
        assert_eq!(*math.renders.borrow(), vec!["$x^2$".to_string()]);
        assert_eq!(*math.checks.borrow(), vec!["$x^2$".to_string()]);
    }

    #[test]
    fn equation_blocks_get_their_own_line() {
        let math = RecordingMath {
            block: true,
            ..RecordingMath::default()
        };
        let nodes = [InlineNode::Math("x".to_string())];
        assert_eq!(render_with(&math, &nodes, MathOptions::default()), "\nM\n");

        let inline = MathOptions {
            force_inline: true,
            ..MathOptions::default()
        };
        assert_eq!(render_with(&math, &nodes, inline), "M");
    }

    #[test]
    fn source_math_shows_expression() {
        assert_eq!(
            render(&[text("Area "), InlineNode::Math("\\pi r^2".to_string())]).plain_text(),
            "Area \\pi r^2"
        );
    }

    #[test]
    fn empty_and_backslash_math_render_without_errors() {
        let blocks = parse_document("$$$$\n");
        let BlockNode::Paragraph { content } = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(content, &vec![InlineNode::Math(String::new())]);
        assert!(render(content).is_empty());

        let out = render(&[InlineNode::Math("a \\\\".to_string())]);
        let Run::Text(run) = &out.runs()[0] else {
            panic!("expected text run");
        };
        assert_eq!(run.text, "a \\\\");
        assert!(run.style.monospace);
        assert_eq!(run.style.foreground, None);
    }

    #[test]
    fn links_resolve_against_the_base_url() {
        let styles = TextStyles::default();
        let images = HashMap::new();
        let math = SourceMath::new();
        let base = TextStyle::default();
        let base_url = Url::parse("https://example.com/guide/intro.md").unwrap();
        let link = |destination: &str| InlineNode::Link {
            destination: destination.to_string(),
            children: vec![text("x")],
        };
        let target = |out: StyledText| match &out.runs()[0] {
            Run::Text(run) => run.style.link.clone(),
            Run::Image(_) => None,
        };

        let renderer =
            InlineRenderer::new(&styles, &images, &math, &base, 1.0).base_url(Some(&base_url));
        assert_eq!(
            target(renderer.render(&[link("docs/a.md")])).as_deref(),
            Some("https://example.com/guide/docs/a.md")
        );
        assert_eq!(
            target(renderer.render(&[link("https://other.org/x")])).as_deref(),
            Some("https://other.org/x")
        );

        let unresolved = InlineRenderer::new(&styles, &images, &math, &base, 1.0);
        assert_eq!(
            target(unresolved.render(&[link("docs/a.md")])).as_deref(),
            Some("docs/a.md")
        );
    }

    #[test]
    fn recognises_line_break_tags() {
        for tag in ["<br>", "<br/>", "<BR />", "< br >", "</br>"] {
            assert!(is_line_break_tag(tag), "{tag}");
        }
        for tag in ["<b>", "<brk>", "br", "<span>"] {
            assert!(!is_line_break_tag(tag), "{tag}");
        }
    }
}
