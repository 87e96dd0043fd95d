use std::path::PathBuf;

use thiserror::Error;

/// Errors from the fallible edges of the crate: configuration and I/O.
///
/// Parsing and inline rendering never fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid color {0:?}, expected #rgb or #rrggbb")]
    Color(String),
}

pub type Result<T> = std::result::Result<T, Error>;
