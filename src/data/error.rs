use thiserror::Error;

/// Structured failures raised while parsing measurement and `.quad` files.
///
/// Loaders wrap these in `anyhow` with file context, so callers usually only
/// see them through `{e:#}` formatting.
#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("missing '{column}' column (looked for {aliases})")]
    MissingColumn { column: &'static str, aliases: String },

    #[error("row {row}: '{field}' value '{raw}' is not a number")]
    NotANumber {
        row: usize,
        field: &'static str,
        raw: String,
    },

    #[error("row {row}: '{field}' value {value} is outside {min}..={max}")]
    OutOfRange {
        row: usize,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("no measurement rows found")]
    NoSamples,

    #[error("no channel curves found in .quad data")]
    NoChannels,

    #[error("channel '{0}' has no draw values")]
    EmptyChannel(String),
}
