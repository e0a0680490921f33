//! Feed transport.
//!
//! A [`FeedSource`] produces the raw bytes of the remote marker document.
//! Decoding happens later, inside the sync cycle.

use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;

/// Anything that can deliver the marker feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the full feed document.
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Fetches the feed over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    /// Build a client with the given connect and read timeouts.
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(concat!("markersync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        tracing::debug!(url = %self.url, bytes = body.len(), "Feed fetched");
        Ok(body.to_vec())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
