use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use marktext::{
    BlockNode, Config, ImageHandle, InlineNode, InlineRenderer, SourceMath, StyledText, TextStyle,
    terminal,
};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "marktext")]
#[command(about = "Parse Markdown into a document tree and render it as styled text")]
struct Cli {
    /// Input Markdown file
    input: PathBuf,

    /// Style and parser config (TOML); bundled defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the parsed block tree instead of rendered text
    #[arg(long)]
    tree: bool,

    /// Resolve relative link destinations against this URL
    #[arg(long)]
    base_url: Option<Url>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::compiled_default(),
    };

    // Read input file
    let markdown = match fs::read_to_string(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.input.display(), e);
            std::process::exit(1);
        }
    };

    let blocks = marktext::parse_document_with(&markdown, &config.parse);

    if cli.tree {
        println!("{:#?}", blocks);
        return;
    }

    let printer = Printer {
        config: &config,
        images: HashMap::new(),
        math: SourceMath::new(),
        base_url: cli.base_url.as_ref(),
    };
    let mut out = String::new();
    printer.blocks(&blocks, "", &mut out);
    print!("{}", out);
}

/// Minimal terminal layout: one rendered line group per block.
struct Printer<'a> {
    config: &'a Config,
    // Image fetching is out of scope for the CLI
    images: HashMap<String, ImageHandle>,
    math: SourceMath,
    base_url: Option<&'a Url>,
}

impl Printer<'_> {
    fn inline(&self, content: &[InlineNode], base: &TextStyle) -> String {
        let text: StyledText = InlineRenderer::new(
            &self.config.styles,
            &self.images,
            &self.math,
            base,
            self.config.math.display_scale,
        )
        .math_options(self.config.math.options())
        .base_url(self.base_url)
        .render(content);
        terminal::to_ansi(&text)
    }

    fn push_lines(text: &str, prefix: &str, out: &mut String) {
        for line in text.lines() {
            out.push_str(prefix);
            out.push_str(line);
            out.push('\n');
        }
    }

    fn blocks(&self, blocks: &[BlockNode], prefix: &str, out: &mut String) {
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                out.push_str(prefix.trim_end());
                out.push('\n');
            }
            self.block(block, prefix, out);
        }
    }

    fn block(&self, block: &BlockNode, prefix: &str, out: &mut String) {
        let plain = TextStyle::default();
        match block {
            BlockNode::Heading { level, content } => {
                let bold = TextStyle {
                    bold: true,
                    ..TextStyle::default()
                };
                let marker = "#".repeat(usize::from(*level));
                let line = format!("{} {}", marker, self.inline(content, &bold));
                Self::push_lines(&line, prefix, out);
            }
            BlockNode::Paragraph { content } => {
                Self::push_lines(&self.inline(content, &plain), prefix, out);
            }
            BlockNode::CodeBlock { content, .. } => {
                Self::push_lines(content, &format!("{}    ", prefix), out);
            }
            BlockNode::HtmlBlock { content } => Self::push_lines(content, prefix, out),
            BlockNode::ThematicBreak => Self::push_lines("----", prefix, out),
            BlockNode::Blockquote { children } => {
                self.blocks(children, &format!("{}> ", prefix), out);
            }
            BlockNode::BulletedList { items, .. } => {
                for item in items {
                    self.item("- ", &item.children, prefix, out);
                }
            }
            BlockNode::NumberedList { start, items, .. } => {
                for (number, item) in (*start..).zip(items) {
                    self.item(&format!("{}. ", number), &item.children, prefix, out);
                }
            }
            BlockNode::TaskList { items, .. } => {
                for item in items {
                    let marker = if item.is_completed { "[x] " } else { "[ ] " };
                    self.item(marker, &item.children, prefix, out);
                }
            }
            BlockNode::Table { rows, .. } => {
                for (i, row) in rows.iter().enumerate() {
                    let base = if i == 0 {
                        TextStyle {
                            bold: true,
                            ..TextStyle::default()
                        }
                    } else {
                        plain.clone()
                    };
                    let cells: Vec<String> = row
                        .cells
                        .iter()
                        .map(|cell| self.inline(&cell.content, &base))
                        .collect();
                    Self::push_lines(&format!("| {} |", cells.join(" | ")), prefix, out);
                }
            }
        }
    }

    fn item(&self, marker: &str, children: &[BlockNode], prefix: &str, out: &mut String) {
        let mut body = String::new();
        let indent = " ".repeat(marker.chars().count());
        self.blocks(children, &indent, &mut body);
        for (i, line) in body.lines().enumerate() {
            out.push_str(prefix);
            if i == 0 {
                out.push_str(marker);
                out.push_str(line.strip_prefix(indent.as_str()).unwrap_or(line));
            } else {
                out.push_str(line);
            }
            out.push('\n');
        }
    }
}
