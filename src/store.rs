// src/store.rs
//! Durable record of harvested and skipped players.
//!
//! One JSON file, rewritten whole on every [`PlayerStore::flush`] through a
//! temp file in the same directory, so a crash leaves either the previous or
//! the new contents, never a truncated file.
//!
//! Invariants:
//! - `completed` and `skipped` are disjoint (a later record for the same id
//!   moves it, last write wins).
//! - Ids are never dropped: `completed ∪ skipped` only grows.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::consts::PLAYER_TYPE;
use crate::error::{Error, Result};
use crate::roster::WorkItem;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub steamid: String,
    #[serde(rename = "type", default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
}

fn default_category() -> String {
    PLAYER_TYPE.to_string()
}

impl PlayerRecord {
    pub fn pro(steamid: impl Into<String>, image: Option<String>) -> Self {
        Self { steamid: steamid.into(), category: default_category(), image }
    }
}

/// Why an id was taken off the worklist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Page loaded, no Steam account on it. Won't change.
    NotFound,
    /// Fetch or parse failed. Worth another look with `--retry-transient`.
    Transient,
}

/// Counts for `--status`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub completed: usize,
    pub with_image: usize,
    pub not_found: usize,
    pub transient: usize,
}

#[derive(Debug)]
pub struct PlayerStore {
    path: PathBuf,
    completed: BTreeMap<String, PlayerRecord>,
    skipped: BTreeMap<String, SkipReason>,
}

/* ---------------- on-disk layout ---------------- */

/// Both layouts the loader accepts. `Current` must come first: a legacy flat
/// map never has a `players` key holding a map of records.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoreFile {
    Current {
        players: BTreeMap<String, PlayerRecord>,
        #[serde(default)]
        skipped_players: Vec<String>,
        #[serde(default)]
        skip_reasons: BTreeMap<String, SkipReason>,
    },
    Legacy(BTreeMap<String, PlayerRecord>),
}

#[derive(Serialize)]
struct StoreFileOut<'a> {
    players: &'a BTreeMap<String, PlayerRecord>,
    skipped_players: Vec<&'a str>,
    skip_reasons: &'a BTreeMap<String, SkipReason>,
}

impl PlayerStore {
    /// Empty store bound to `path`; nothing is read or written.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), completed: BTreeMap::new(), skipped: BTreeMap::new() }
    }

    /// Read `path`. A missing or blank file is an empty store; a file that
    /// doesn't parse is an error, so it never gets overwritten by a flush.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self::empty(&path);

        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no store file yet");
                return Ok(store);
            }
            Err(e) => return Err(Error::store_io(&path, e)),
        };
        if text.trim().is_empty() {
            return Ok(store);
        }

        let file: StoreFile = serde_json::from_str(&text)
            .map_err(|source| Error::StoreFormat { path: path.clone(), source })?;

        match file {
            StoreFile::Current { players, skipped_players, skip_reasons } => {
                store.completed = players;
                for id in skipped_players {
                    let reason = skip_reasons.get(&id).copied().unwrap_or(SkipReason::NotFound);
                    store.insert_skip(id, reason);
                }
                // reasons for ids missing from the list still count as skips
                for (id, reason) in skip_reasons {
                    if !store.skipped.contains_key(&id) {
                        store.insert_skip(id, reason);
                    }
                }
            }
            StoreFile::Legacy(players) => {
                info!(path = %path.display(), "loaded legacy flat store layout");
                store.completed = players;
            }
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn completed(&self) -> &BTreeMap<String, PlayerRecord> {
        &self.completed
    }

    pub fn skipped(&self) -> &BTreeMap<String, SkipReason> {
        &self.skipped
    }

    pub fn get(&self, id: &str) -> Option<&PlayerRecord> {
        self.completed.get(id)
    }

    pub fn skip_reason(&self, id: &str) -> Option<SkipReason> {
        self.skipped.get(id).copied()
    }

    /// Already handled by an earlier run. Transient skips count as done
    /// unless the caller asks to retry them.
    pub fn is_done(&self, id: &str, retry_transient: bool) -> bool {
        if self.completed.contains_key(id) {
            return true;
        }
        match self.skipped.get(id) {
            Some(SkipReason::NotFound) => true,
            Some(SkipReason::Transient) => !retry_transient,
            None => false,
        }
    }

    /// `worklist − completed − skipped`, in worklist order, first occurrence
    /// of each id only.
    pub fn pending(&self, worklist: &[WorkItem], retry_transient: bool) -> Vec<WorkItem> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for w in worklist {
            if !self.is_done(&w.id, retry_transient) && seen.insert(w.id.as_str()) {
                out.push(w.clone());
            }
        }
        out
    }

    /// Distinct worklist ids an earlier run already handled.
    pub fn done_count(&self, worklist: &[WorkItem], retry_transient: bool) -> usize {
        let ids: HashSet<&str> = worklist.iter().map(|w| w.id.as_str()).collect();
        ids.into_iter().filter(|id| self.is_done(id, retry_transient)).count()
    }

    pub fn record_success(&mut self, id: &str, steamid: &str, image: Option<String>) {
        self.skipped.remove(id);
        self.completed.insert(id.to_string(), PlayerRecord::pro(steamid, image));
    }

    pub fn record_skip(&mut self, id: &str, reason: SkipReason) {
        self.completed.remove(id);
        self.insert_skip(id.to_string(), reason);
    }

    fn insert_skip(&mut self, id: String, reason: SkipReason) {
        if !self.completed.contains_key(&id) {
            self.skipped.insert(id, reason);
        }
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            completed: self.completed.len(),
            with_image: self.completed.values().filter(|r| r.image.is_some()).count(),
            not_found: self.skipped.values().filter(|r| **r == SkipReason::NotFound).count(),
            transient: self.skipped.values().filter(|r| **r == SkipReason::Transient).count(),
        }
    }

    /// Write the whole state: temp file next to the target, fsync, rename.
    pub fn flush(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| Error::store_io(&dir, e))?;

        let out = StoreFileOut {
            players: &self.completed,
            skipped_players: self.skipped.keys().map(String::as_str).collect(),
            skip_reasons: &self.skipped,
        };

        let tmp = NamedTempFile::new_in(&dir).map_err(|e| Error::store_io(&dir, e))?;
        {
            let mut w = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut w, &out)
                .map_err(|e| Error::store_io(&self.path, e.into()))?;
            w.write_all(b"\n").map_err(|e| Error::store_io(&self.path, e))?;
            w.flush().map_err(|e| Error::store_io(&self.path, e))?;
        }
        tmp.as_file().sync_all().map_err(|e| Error::store_io(&self.path, e))?;
        tmp.persist(&self.path).map_err(|e| Error::store_io(&self.path, e.error))?;

        debug!(
            path = %self.path.display(),
            completed = self.completed.len(),
            skipped = self.skipped.len(),
            "store flushed"
        );
        Ok(())
    }
}
