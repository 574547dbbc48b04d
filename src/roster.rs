// src/roster.rs
// Where the worklist comes from: the wiki's category listing, or a local file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::consts::API_PAGE_PAUSE_MS;
use crate::core::net;
use crate::error::{Error, Result};

/// One player to process.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
}

impl WorkItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
pub trait PlayerSource: Send + Sync {
    /// Full roster, in source order, without duplicates.
    async fn list_players(&self) -> Result<Vec<WorkItem>>;
}

/* ---------------- MediaWiki category listing ---------------- */

pub struct WikiRoster {
    client: reqwest::Client,
    api: Url,
    category: String,
    page_pause: Duration,
}

impl WikiRoster {
    pub fn new(client: reqwest::Client, origin: &str, game: &str, category: &str) -> Result<Self> {
        Ok(Self {
            client,
            api: net::api_url(origin, game)?,
            category: category.to_string(),
            page_pause: Duration::from_millis(API_PAGE_PAUSE_MS),
        })
    }

    /// Pause between continuation requests.
    pub fn with_page_pause(mut self, pause: Duration) -> Self {
        self.page_pause = pause;
        self
    }

    async fn fetch_batch(&self, cont: Option<&Continue>) -> Result<CategoryResponse> {
        let cmtitle = format!("Category:{}", self.category);
        let mut query: Vec<(&str, &str)> = vec![
            ("action", "query"),
            ("list", "categorymembers"),
            ("cmtitle", cmtitle.as_str()),
            ("cmnamespace", "0"),
            ("cmlimit", "500"),
            ("format", "json"),
        ];
        match cont {
            Some(c) => {
                query.push(("continue", c.token.as_str()));
                query.push(("cmcontinue", c.cmcontinue.as_str()));
            }
            None => query.push(("continue", "")),
        }

        let resp = self
            .client
            .get(self.api.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", self.api)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::SourceUnavailable(format!("{}: HTTP {status}", self.api)));
        }

        resp.json::<CategoryResponse>()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("{}: bad listing: {e}", self.api)))
    }
}

#[async_trait]
impl PlayerSource for WikiRoster {
    async fn list_players(&self) -> Result<Vec<WorkItem>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cont: Option<Continue> = None;

        loop {
            let batch = self.fetch_batch(cont.as_ref()).await?;
            let members = batch.query.map(|q| q.categorymembers).unwrap_or_default();
            debug!(count = members.len(), "category batch");

            for m in members {
                let id = title_to_id(&m.title);
                if !id.is_empty() && seen.insert(id.clone()) {
                    out.push(WorkItem { id });
                }
            }

            match batch.cont {
                Some(next) => {
                    cont = Some(next);
                    tokio::time::sleep(self.page_pause).await;
                }
                None => break,
            }
        }

        info!(category = %self.category, players = out.len(), "roster listed");
        Ok(out)
    }
}

/// Page titles use spaces; page URLs use underscores.
pub fn title_to_id(title: &str) -> String {
    title.trim().replace(' ', "_")
}

#[derive(Debug, Deserialize)]
struct CategoryResponse {
    #[serde(rename = "continue")]
    cont: Option<Continue>,
    query: Option<CategoryQuery>,
}

#[derive(Debug, Deserialize)]
struct Continue {
    cmcontinue: String,
    #[serde(rename = "continue")]
    token: String,
}

#[derive(Debug, Deserialize)]
struct CategoryQuery {
    #[serde(default)]
    categorymembers: Vec<CategoryMember>,
}

#[derive(Debug, Deserialize)]
struct CategoryMember {
    title: String,
}

/* ---------------- Local file ---------------- */

/// JSON array of `{ "id": ... }`; other fields are ignored.
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PlayerSource for FileRoster {
    async fn list_players(&self) -> Result<Vec<WorkItem>> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Worklist { path: self.path.clone(), detail: e.to_string() })?;
        let items: Vec<WorkItem> = serde_json::from_str(&text)
            .map_err(|e| Error::Worklist { path: self.path.clone(), detail: e.to_string() })?;

        let mut seen = HashSet::new();
        Ok(items.into_iter().filter(|w| seen.insert(w.id.clone())).collect())
    }
}
