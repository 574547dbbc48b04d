// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The worklist could not be obtained from the wiki (or a local file).
    #[error("worklist source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("could not read worklist {path}: {detail}")]
    Worklist { path: PathBuf, detail: String },

    /// A single page could not be loaded. Never fatal to a run.
    #[error("fetch failed for {url}: {detail}")]
    Fetch { url: String, detail: String },

    #[error("store I/O on {path}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is not valid JSON: {source}")]
    StoreFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn store_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StoreIo { path: path.into(), source }
    }

    pub fn fetch(url: impl ToString, detail: impl ToString) -> Self {
        Error::Fetch { url: url.to_string(), detail: detail.to_string() }
    }

    /// Errors the runner answers with one cooldown-and-retry. A broken local
    /// worklist file won't heal by waiting, so it is not one of them.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Error::SourceUnavailable(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
