// src/steam.rs
// Vanity → SteamID64 lookup via the community profile XML.

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::config::consts::STEAM_ORIGIN;
use crate::error::{Error, Result};
use crate::specs::steam_profile::parse_steam_id64;

#[async_trait]
pub trait VanityResolver: Send + Sync {
    /// `Ok(None)` when Steam has no such profile.
    async fn resolve(&self, vanity: &str) -> Result<Option<String>>;
}

pub struct SteamResolver {
    client: reqwest::Client,
    origin: Url,
}

impl SteamResolver {
    pub fn new(client: reqwest::Client) -> Result<Self> {
        Self::with_origin(client, STEAM_ORIGIN)
    }

    pub fn with_origin(client: reqwest::Client, origin: &str) -> Result<Self> {
        Ok(Self { client, origin: Url::parse(origin)? })
    }

    fn profile_url(&self, vanity: &str) -> Result<Url> {
        let mut url = self.origin.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("id")
            .push(vanity)
            .push("");
        url.set_query(Some("xml=1"));
        Ok(url)
    }
}

#[async_trait]
impl VanityResolver for SteamResolver {
    async fn resolve(&self, vanity: &str) -> Result<Option<String>> {
        let url = self.profile_url(vanity)?;
        let resp = self.client.get(url.clone()).send().await.map_err(|e| Error::fetch(&url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::fetch(&url, format!("HTTP {status}")));
        }
        let xml = resp.text().await.map_err(|e| Error::fetch(&url, e))?;
        let id = parse_steam_id64(&xml);
        debug!(vanity, resolved = ?id, "steam vanity lookup");
        Ok(id)
    }
}
