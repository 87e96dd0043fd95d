use once_cell::sync::Lazy;
use regex::Regex;

static DIRECTIVE_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@[A-Za-z_][A-Za-z0-9_-]*").unwrap());

// Groups: comment, processing instruction, CDATA, declaration, raw-text tag
static HTML_BLOCK_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^ {0,3}<(?:(!--)|(\?)|(!\[CDATA\[)|(![A-Za-z])",
        r"|(?i:(script|pre|style|textarea))(?:[\s>]|$)",
        r"|/?[A-Za-z][A-Za-z0-9-]*(?:[\s/>]|$))",
    ))
    .unwrap()
});

/// A slice of the input, either ordinary Markdown or a block directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Markdown(&'a str),
    Directive(&'a str),
}

/// Split markdown into ordinary text and block directives.
///
/// A directive starts at column 0 with `@Name`, optionally followed by
/// arguments. If the line ends with `{` the directive extends to the matching
/// `}` line, counting nested directive blocks. Lines inside fenced code or
/// an HTML block are never directives.
pub fn split_directives(markdown: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut fence: Option<Fence> = None;
    let mut html: Option<HtmlEnd> = None;
    let mut markdown_start = 0;
    let mut offset = 0;
    let mut lines = markdown.split_inclusive('\n');

    while let Some(line) = lines.next() {
        let line_start = offset;
        offset += line.len();

        if let Some(open) = fence {
            if open.is_closed_by(line) {
                fence = None;
            }
            continue;
        }
        if let Some(end) = html {
            if end.is_closed_by(line) {
                html = None;
            }
            continue;
        }
        if let Some(open) = Fence::open(line) {
            fence = Some(open);
            continue;
        }
        if let Some(end) = HtmlEnd::open(line) {
            html = (!end.is_closed_by(line)).then_some(end);
            continue;
        }
        if !is_directive_head(line) {
            continue;
        }

        if markdown_start < line_start {
            segments.push(Segment::Markdown(&markdown[markdown_start..line_start]));
        }

        let mut depth = usize::from(opens_block(line));
        while depth > 0 {
            let Some(next) = lines.next() else { break };
            offset += next.len();
            let trimmed = next.trim();
            if trimmed == "}" {
                depth -= 1;
            } else if is_directive_head(next.trim_start()) && opens_block(next) {
                depth += 1;
            }
        }

        segments.push(Segment::Directive(&markdown[line_start..offset]));
        markdown_start = offset;
    }

    if markdown_start < markdown.len() {
        segments.push(Segment::Markdown(&markdown[markdown_start..]));
    }

    segments
}

fn is_directive_head(line: &str) -> bool {
    DIRECTIVE_HEAD.is_match(line)
}

fn opens_block(line: &str) -> bool {
    line.trim_end().ends_with('{')
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let body = strip_indent(line)?;
        let marker = body.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = body.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some(Self { marker, len })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let Some(body) = strip_indent(line) else {
            return false;
        };
        let len = body.chars().take_while(|c| *c == self.marker).count();
        len >= self.len && body[len * self.marker.len_utf8()..].trim().is_empty()
    }
}

/// How an open HTML block ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HtmlEnd {
    /// First line containing the marker, compared case-insensitively
    Marker(&'static str),
    BlankLine,
}

impl HtmlEnd {
    fn open(line: &str) -> Option<Self> {
        let captures = HTML_BLOCK_START.captures(line)?;
        let end = if captures.get(1).is_some() {
            Self::Marker("-->")
        } else if captures.get(2).is_some() {
            Self::Marker("?>")
        } else if captures.get(3).is_some() {
            Self::Marker("]]>")
        } else if captures.get(4).is_some() {
            Self::Marker(">")
        } else if let Some(tag) = captures.get(5) {
            match tag.as_str().to_ascii_lowercase().as_str() {
                "script" => Self::Marker("</script>"),
                "pre" => Self::Marker("</pre>"),
                "style" => Self::Marker("</style>"),
                _ => Self::Marker("</textarea>"),
            }
        } else {
            Self::BlankLine
        };
        Some(end)
    }

    fn is_closed_by(self, line: &str) -> bool {
        match self {
            Self::Marker(marker) => line.to_ascii_lowercase().contains(marker),
            Self::BlankLine => line.trim().is_empty(),
        }
    }
}

/// Strip up to three leading spaces; more makes the line indented code.
fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.chars().take_while(|c| *c == ' ').count();
    (indent <= 3).then(|| &line[indent..])
}
