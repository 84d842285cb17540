//! Configuration errors shared by the core and the server.

use std::path::PathBuf;

/// Errors raised while turning a configuration document into live objects.
///
/// All variants are fatal at startup: nothing is served until the
/// configuration has been accepted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The ordered-map strategy name is not one of the known strategies.
    #[error("unknown map strategy: {name}")]
    UnknownStrategy { name: String },

    /// The storage engine name is not one of the known engines.
    #[error("unknown storage engine: {name}")]
    UnknownEngine { name: String },

    /// A tuning option is outside its accepted range.
    #[error("invalid value for `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    /// The document is not valid JSON or does not match the expected shape.
    #[error("malformed configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
