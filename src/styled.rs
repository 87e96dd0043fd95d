//! Styled text: literal runs carrying presentation attributes.

use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

/// 24-bit color, written as `#rgb` or `#rrggbb` in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Color(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());

        match hex.len() {
            3 => {
                let mut parts = [0u8; 3];
                for (part, digit) in parts.iter_mut().zip(hex.chars()) {
                    let value = digit.to_digit(16).ok_or_else(invalid)?;
                    *part = value as u8 * 17;
                }
                Ok(Self::rgb(parts[0], parts[1], parts[2]))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Presentation attributes of a text run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub monospace: bool,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    /// Target of the link this run belongs to
    pub link: Option<String>,
}

/// A pre-resolved image, supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    pub key: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Text(TextRun),
    Image(ImageHandle),
}

/// Concatenation of styled runs. Adjacent text with equal style is merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledText {
    runs: Vec<Run>,
}

impl StyledText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: &str, style: &TextStyle) -> Self {
        let mut out = Self::new();
        out.push_str(text, style);
        out
    }

    pub fn push_str(&mut self, text: &str, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        if let Some(Run::Text(last)) = self.runs.last_mut() {
            if last.style == *style {
                last.text.push_str(text);
                return;
            }
        }
        self.runs.push(Run::Text(TextRun {
            text: text.to_string(),
            style: style.clone(),
        }));
    }

    pub fn push_image(&mut self, image: ImageHandle) {
        self.runs.push(Run::Image(image));
    }

    pub fn append(&mut self, other: StyledText) {
        for run in other.runs {
            match run {
                Run::Text(run) => self.push_str(&run.text, &run.style),
                Run::Image(image) => self.push_image(image),
            }
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The text without attributes; images become U+FFFC.
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .map(|run| match run {
                Run::Text(run) => run.text.as_str(),
                Run::Image(_) => "\u{FFFC}",
            })
            .collect()
    }
}

impl Add for StyledText {
    type Output = StyledText;

    fn add(mut self, rhs: StyledText) -> StyledText {
        self.append(rhs);
        self
    }
}

impl AddAssign for StyledText {
    fn add_assign(&mut self, rhs: StyledText) {
        self.append(rhs);
    }
}
