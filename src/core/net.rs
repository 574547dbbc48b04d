// src/core/net.rs
use std::time::Duration;

use reqwest::Url;

use crate::config::consts::HTTP_TIMEOUT_SECS;
use crate::error::Result;

/// Shared HTTP client. One per run; reqwest pools connections internally.
pub fn client(user_agent: &str) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .gzip(true)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

/// `<origin>/<game>/<id>` with the id percent-encoded as a single segment.
pub fn player_url(origin: &str, game: &str, id: &str) -> Result<Url> {
    let mut url = Url::parse(origin)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(game)
        .push(id);
    Ok(url)
}

/// `<origin>/<game>/api.php`
pub fn api_url(origin: &str, game: &str) -> Result<Url> {
    let mut url = Url::parse(origin)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(game)
        .push("api.php");
    Ok(url)
}
