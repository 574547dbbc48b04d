// src/page.rs
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::error::{Error, Result};

/// A fetched page: what the extractor gets to look at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub status: u16,
    pub html: String,
}

/// Loads one player page. The harvest loop only sees this trait, so tests
/// script pages without a network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// `Err` means the page could not be loaded at all. A throttle page is a
    /// successful load.
    async fn fetch(&self, url: &Url) -> Result<RenderedPage>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<RenderedPage> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::fetch(url, e))?;

        let status = resp.status();
        debug!(%url, %status, "page fetched");

        // 429 carries the throttle page; let the extractor classify it.
        if !status.is_success() && status != StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::fetch(url, format!("HTTP {status}")));
        }

        let html = resp.text().await.map_err(|e| Error::fetch(url, e))?;
        Ok(RenderedPage { url: url.to_string(), status: status.as_u16(), html })
    }
}
