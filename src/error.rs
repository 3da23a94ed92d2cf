//! Error types shared by the writers in this crate.

/// Errors produced by [`Print`](crate::Print) implementations and by
/// [`CheckedWriter`](crate::CheckedWriter) construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The wrapped writer reported its error flag at a checkpoint. `message` is the
    /// configured template filled with `count`.
    #[error("{message}")]
    Write { count: u64, message: String },

    /// Rejected configuration, reported at construction time.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed printf template or an argument that does not fit its conversion.
    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

/// Problems found while expanding a printf-style template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unknown conversion '{conversion}' at offset {offset}")]
    UnknownConversion { conversion: char, offset: usize },

    #[error("incomplete format specifier at offset {0}")]
    Incomplete(usize),

    #[error("missing argument {index} for format specifier at offset {offset}")]
    MissingArgument { index: usize, offset: usize },

    #[error("conversion '{conversion}' cannot format a {kind} argument")]
    Mismatch {
        conversion: char,
        kind: &'static str,
    },

    #[error("flag '{flag}' is not allowed with conversion '{conversion}'")]
    IllegalFlag { flag: char, conversion: char },

    #[error("flag '{0}' requires a width")]
    MissingWidth(char),

    #[error("width not allowed at offset {0}")]
    Width(usize),

    #[error("width, precision or index too large at offset {0}")]
    TooLarge(usize),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::InvalidArgument(_) | Error::Format(_) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
            }
            Error::Write { .. } => std::io::Error::new(std::io::ErrorKind::Other, error),
        }
    }
}
