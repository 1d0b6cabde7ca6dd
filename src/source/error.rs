use thiserror::Error;

#[cfg(doc)]
use super::{Source, Target};

use super::Provider;

/// An [`enum@Error`] that can occur while fetching keys from a [`Source`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("`{url}` answered with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// An error that can happen during the parsing of a [`Target`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("Expected `<source>:<identity>`, got `{0}`")]
    MissingSeparator(String),

    #[error("Unknown source `{0}`, expected one of: {}", Provider::names())]
    UnknownSource(String),

    #[error("The identity is empty")]
    EmptyIdentity,

    #[error("An identity may only contain [a-zA-Z0-9-_.], got `{0}`")]
    IllegalIdentity(String),
}
