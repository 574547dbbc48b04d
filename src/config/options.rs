// src/config/options.rs
use std::path::PathBuf;
use std::time::Duration;

use super::consts::*;

/// Where the run gets its list of player ids from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorklistSource {
    /// Category listing through the wiki's MediaWiki API.
    Wiki { category: String },
    /// Local JSON array of `{ "id": ... }` objects.
    File(PathBuf),
}

impl Default for WorklistSource {
    fn default() -> Self {
        WorklistSource::Wiki { category: PLAYER_CATEGORY.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarvestOptions {
    pub origin: String,
    pub game: String,
    pub worklist: WorklistSource,
    pub state_path: PathBuf,
    pub requests_per_hour: u32,
    pub cooldown: Duration,
    pub max_cooldowns_per_item: u32,
    pub retry_transient: bool,
    pub resolve_vanity: bool,
    pub limit: Option<usize>,
    pub user_agent: String,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            origin: SITE_ORIGIN.into(),
            game: GAME_SLUG.into(),
            worklist: WorklistSource::default(),
            state_path: PathBuf::from(STORE_DIR).join(STORE_FILE),
            requests_per_hour: REQUESTS_PER_HOUR,
            cooldown: Duration::from_secs(COOLDOWN_SECS),
            max_cooldowns_per_item: MAX_COOLDOWNS_PER_ITEM,
            retry_transient: false,
            resolve_vanity: false,
            limit: None,
            user_agent: USER_AGENT.into(),
        }
    }
}

impl HarvestOptions {
    /// Debug log lives next to the state file.
    pub fn log_path(&self) -> PathBuf {
        match self.state_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(LOG_FILE),
            _ => PathBuf::from(LOG_FILE),
        }
    }
}
