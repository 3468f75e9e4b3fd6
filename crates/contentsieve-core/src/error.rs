//! Error types for contentsieve

use thiserror::Error;

/// Main error type for filtering operations
#[derive(Error, Debug)]
pub enum FilterError {
    /// IO error while reading or writing a buffer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes do not match the container or packet grammar
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// A codec header field is outside the range the codec allows
    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    /// The logical stream was flagged invalid earlier and stays rejected
    #[error("Stream {serial:#010x} has been invalidated")]
    StreamInvalidated {
        /// Serial number of the logical stream
        serial: u32,
    },

    /// No valid packet survived on the primary stream
    #[error("No valid streams found in container")]
    NoValidStreams,

    /// A value cannot be emitted safely in its output context.
    ///
    /// The message is meant to be shown inside an HTML comment after the
    /// offending tag, see `contentsieve_markup::comment`.
    #[error("{0}")]
    Comment(String),

    /// A URI could not be parsed
    #[error("URI syntax error: {0}")]
    UriSyntax(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FilterError {
    /// Shorthand for a [`FilterError::Malformed`] error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Shorthand for a [`FilterError::UnknownContentType`] error.
    pub fn unknown_content(msg: impl Into<String>) -> Self {
        Self::UnknownContentType(msg.into())
    }

    /// Shorthand for a [`FilterError::Comment`] error.
    pub fn comment(msg: impl Into<String>) -> Self {
        Self::Comment(msg.into())
    }

    /// Whether this error means a value could not be placed in its context,
    /// as opposed to a structural failure.
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_))
    }
}

/// Result type alias for filtering operations
pub type Result<T> = std::result::Result<T, FilterError>;
