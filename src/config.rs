use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::source::{Provider, Target};

/// The name of the environment variable overriding `--output`.
pub const OUTPUT_ENV: &str = "SSH_GET_ID_OUTPUT";

/// The name of the environment variable overriding `--no-warn`.
pub const NO_WARN_ENV: &str = "SSH_GET_ID_NO_WARN";

/// The name of the environment variable overriding `--local`.
pub const LOCAL_ENV: &str = "SSH_GET_ID_LOCAL";

/// The sentinel value of `--local` to skip reading local keys.
pub const NO_LOCAL: &str = "NONE";

/// An [`enum@Error`] that can occur while resolving the [`Config`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to locate the home directory, pass an explicit path instead")]
    NoHome,
}

/// Where the merged keys are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl std::str::FromStr for Output {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "-" => Self::Stdout,
            path => Self::File(path.into()),
        })
    }
}

/// Where the local keys are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Local {
    Skip,
    File(PathBuf),
}

impl std::str::FromStr for Local {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            NO_LOCAL => Self::Skip,
            path => Self::File(path.into()),
        })
    }
}

/// Fetch the public keys of identities on code-hosting services,
/// and merge them into an `authorized_keys` file.
#[derive(Debug, Parser)]
#[command(author, version, about, rename_all = "kebab-case", after_help = after_help())]
pub struct Config {
    /// Destination of the keys, `-` for the standard output
    /// [default: ~/.ssh/authorized_keys].
    #[arg(short, long, env = OUTPUT_ENV)]
    pub output: Option<Output>,

    /// Do not warn about fetched keys that are already authorized.
    #[arg(short = 'w', long, env = NO_WARN_ENV)]
    pub no_warn: bool,

    /// The local keys to merge into, `NONE` to start from scratch
    /// [default: ~/.ssh/authorized_keys].
    #[arg(short, long, env = LOCAL_ENV)]
    pub local: Option<Local>,

    /// The identities to fetch the keys of.
    #[arg(value_name = "SOURCE:IDENTITY")]
    pub targets: Vec<Target>,
}

impl Config {
    /// The resolved `--output` destination.
    pub fn output(&self) -> Result<Output, Error> {
        match &self.output {
            Some(output) => Ok(output.clone()),
            None => authorized_keys().map(Output::File),
        }
    }

    /// The resolved `--local` keys.
    pub fn local(&self) -> Result<Local, Error> {
        match &self.local {
            Some(local) => Ok(local.clone()),
            None => authorized_keys().map(Local::File),
        }
    }
}

/// The path of the current user's `~/.ssh/authorized_keys`.
pub fn authorized_keys() -> Result<PathBuf, Error> {
    dirs::home_dir()
        .map(|home| home.join(".ssh").join("authorized_keys"))
        .ok_or(Error::NoHome)
}

fn after_help() -> String {
    format!("Known sources: {}", Provider::names())
}
