//! Remote providers of public keys, and the `<source>:<identity>` targets to query them.

use async_trait::async_trait;
use parse_display::{Display, FromStr};
use strum::{EnumIter, IntoEnumIterator};

mod error;
pub use error::{Error, TargetError};

mod http;
pub use http::Http;

/// A code-hosting service exposing the public keys of it's users.
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Provider {
    #[display("gh")]
    GitHub,
    #[display("gl")]
    GitLab,
    #[display("lp")]
    Launchpad,
}

impl Provider {
    /// The URL serving the `authorized_keys` of `identity` on this provider.
    pub fn url(&self, identity: &str) -> String {
        match self {
            Self::GitHub => format!("https://github.com/{identity}.keys"),
            Self::GitLab => format!("https://gitlab.com/{identity}.keys"),
            Self::Launchpad => format!("https://launchpad.net/~{identity}/+sshkeys"),
        }
    }

    /// The comma-separated tags of every known provider.
    pub fn names() -> String {
        Self::iter()
            .map(|provider| provider.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// An identity on a [`Provider`], written `<source>:<identity>` on the command-line.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{provider}:{identity}")]
pub struct Target {
    provider: Provider,
    identity: String,
}

impl Target {
    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn url(&self) -> String {
        self.provider.url(&self.identity)
    }

    /// The comment stamped on keys fetched from this [`Target`].
    pub fn provenance(&self) -> String {
        format!("#{} {self}", env!("CARGO_PKG_NAME"))
    }

    fn is_authorized(c: char) -> bool {
        matches!(c, '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' | '-' | '.')
    }
}

impl std::str::FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, identity) = s
            .split_once(':')
            .ok_or_else(|| TargetError::MissingSeparator(s.into()))?;

        let provider = provider
            .parse()
            .map_err(|_| TargetError::UnknownSource(provider.into()))?;

        if identity.is_empty() {
            return Err(TargetError::EmptyIdentity);
        }

        if !identity.chars().all(Self::is_authorized) {
            return Err(TargetError::IllegalIdentity(identity.into()));
        }

        Ok(Self {
            provider,
            identity: identity.into(),
        })
    }
}

/// The capability of fetching the raw `authorized_keys` data of a [`Target`].
#[async_trait]
pub trait Source: Send + Sync {
    async fn fetch(&self, target: &Target) -> Result<Vec<u8>, Error>;
}
