use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::markup::ParseOptions;
use crate::math::ErrorMode;
use crate::render::MathOptions;
use crate::style::TextStyles;

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parse: ParseOptions,
    pub styles: TextStyles,
    pub math: MathConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MathConfig {
    pub display_scale: f32,
    pub force_inline: bool,
    pub error_mode: ErrorMode,
}

impl Default for MathConfig {
    fn default() -> Self {
        let options = MathOptions::default();
        Self {
            display_scale: 1.0,
            force_inline: options.force_inline,
            error_mode: options.error_mode,
        }
    }
}

impl MathConfig {
    pub fn options(&self) -> MathOptions {
        MathOptions {
            force_inline: self.force_inline,
            error_mode: self.error_mode,
        }
    }
}

impl Config {
    /// The bundled defaults from `default_config.toml`.
    pub fn compiled_default() -> Self {
        // build.rs only checks the section layout; field types are checked here
        Self::from_toml(DEFAULT_CONFIG).unwrap_or_else(|err| {
            warn!(error = %err, "bundled config rejected, using code defaults");
            Self::default()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::SoftBreak;
    use crate::styled::Color;

    #[test]
    fn compiled_default_matches_code_defaults() {
        assert_eq!(Config::compiled_default(), Config::default());
    }

    #[test]
    fn partial_override() {
        let config = Config::from_toml(
            r##"
            [parse]
            strip_frontmatter = true

            [styles]
            soft_break = "newline"

            [styles.link]
            foreground = "#f00"

            [math]
            force_inline = true
            error_mode = "original"
            "##,
        )
        .unwrap();

        assert!(config.parse.strip_frontmatter);
        assert!(config.parse.block_directives);
        assert_eq!(config.styles.soft_break, SoftBreak::Newline);
        assert_eq!(config.styles.link.foreground, Some(Color::rgb(255, 0, 0)));
        assert_eq!(config.styles.link.underline, None);
        assert_eq!(config.styles.strong, TextStyles::default().strong);
        assert_eq!(
            config.math.options(),
            MathOptions {
                force_inline: true,
                error_mode: ErrorMode::Original,
            }
        );
    }

    #[test]
    fn rejects_bad_color() {
        let err = Config::from_toml("[styles.code]\nforeground = \"blue\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_unknown_enum_value() {
        let err = Config::from_toml("[math]\nerror_mode = \"loud\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file() {
        let path = Path::new("definitely/not/here.toml");
        assert!(matches!(Config::load(path), Err(Error::Io { .. })));
    }
}
