use thiserror::Error;

#[cfg(doc)]
use super::KeyTable;

/// An [`struct@Error`] that can occur while parsing `authorized_keys` data
/// into a [`KeyTable`].
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct Error {
    line: usize,
    kind: ErrorKind,
}

impl Error {
    /// Create a new error for the 1-based `line` from it's kind.
    pub fn new(line: usize, kind: impl Into<ErrorKind>) -> Self {
        Self {
            line,
            kind: kind.into(),
        }
    }

    /// The 1-based line number the error occured on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Access the `kind` of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// The kind of [`struct@Error`]s that can occur while parsing a line.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The line is not valid _UTF-8_.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),

    #[error("A quoted option is never closed")]
    UnterminatedQuote,

    #[error("The line has no key material after `{0}`")]
    MissingKey(String),

    #[error("Unknown key type `{0}`")]
    UnknownAlgorithm(String),

    /// The key material could not be decoded.
    #[error("Malformed key: {0}")]
    Key(#[from] ssh_key::Error),
}
