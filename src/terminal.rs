//! ANSI escape output for styled text.

use crate::styled::{Run, StyledText, TextStyle};

const RESET: &str = "\x1b[0m";

/// Convert styled text to a string with SGR escape sequences.
pub fn to_ansi(text: &StyledText) -> String {
    let mut out = String::new();
    for run in text.runs() {
        match run {
            Run::Text(run) => {
                let sgr = sgr_codes(&run.style);
                if sgr.is_empty() {
                    out.push_str(&run.text);
                } else {
                    out.push_str(&format!("\x1b[{}m", sgr.join(";")));
                    out.push_str(&run.text);
                    out.push_str(RESET);
                }
            }
            Run::Image(image) => {
                out.push_str(&format!("[image {} {}x{}]", image.key, image.width, image.height));
            }
        }
    }
    out
}

fn sgr_codes(style: &TextStyle) -> Vec<String> {
    let mut codes = Vec::new();
    if style.bold {
        codes.push("1".to_string());
    }
    if style.italic {
        codes.push("3".to_string());
    }
    if style.underline {
        codes.push("4".to_string());
    }
    if style.strikethrough {
        codes.push("9".to_string());
    }
    if let Some(color) = style.foreground {
        codes.push(format!("38;2;{};{};{}", color.r, color.g, color.b));
    }
    if let Some(color) = style.background {
        codes.push(format!("48;2;{};{};{}", color.r, color.g, color.b));
    }
    // Terminals have no monospace attribute; dim it so code stands out
    if style.monospace && codes.is_empty() {
        codes.push("2".to_string());
    }
    codes
}
