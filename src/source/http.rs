use std::time::Duration;

use async_trait::async_trait;

use super::{Error, Source, Target};

/// A [`Source`] querying the providers over HTTPS.
#[derive(Debug, Clone)]
pub struct Http {
    client: reqwest::Client,
}

impl Http {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Source for Http {
    async fn fetch(&self, target: &Target) -> Result<Vec<u8>, Error> {
        let url = target.url();

        tracing::debug!("Fetching the keys of `{target}` from `{url}`");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::Status { url, status });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
