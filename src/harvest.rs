// src/harvest.rs
//! The harvesting loop.
//!
//! ```text
//! worklist ─▶ store filter ─▶ for each pending id:
//!     pace ─▶ fetch + extract ─┬─ Found       ─▶ record_success ─▶ flush
//!                              ├─ NotFound    ─▶ record_skip     ─▶ flush
//!                              ├─ fetch error ─▶ record_skip     ─▶ flush
//!                              └─ RateLimited ─▶ flush ─▶ cooldown ─▶ retry
//! ```
//!
//! One item is in flight at a time. Every terminal outcome is flushed before
//! the next item starts, so killing the process loses at most that item.
//! Per-item failures never stop the run; only a store that can't be written
//! does.

use reqwest::Url;
use tracing::{info, warn};

use crate::config::HarvestOptions;
use crate::cooldown::Cooldown;
use crate::core::net::player_url;
use crate::error::Result;
use crate::pacer::Pacer;
use crate::page::PageFetcher;
use crate::progress::{Progress, ProgressEvent};
use crate::roster::WorkItem;
use crate::specs::player_page::{self, PageOutcome};
use crate::specs::steam_profile::is_steam_id64;
use crate::steam::VanityResolver;
use crate::store::{PlayerStore, SkipReason};

/// Outcome of one attempt at one player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HarvestResult {
    Success { id: String, external_account_id: String, image_url: Option<String> },
    NotFound { id: String },
    Transient { id: String, error_detail: String },
    /// Not terminal: cool down and try the same id again.
    RateLimited { id: String },
}

impl HarvestResult {
    pub fn id(&self) -> &str {
        match self {
            HarvestResult::Success { id, .. }
            | HarvestResult::NotFound { id }
            | HarvestResult::Transient { id, .. }
            | HarvestResult::RateLimited { id } => id,
        }
    }
}

/// Per-run counters. Built at the start of [`Harvester::run`], never global.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunContext {
    pub total: usize,
    pub already_done: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub not_found: usize,
    pub transient: usize,
    pub cooldowns: usize,
    pub fetches: usize,
}

impl RunContext {
    pub fn skipped(&self) -> usize {
        self.not_found + self.transient
    }
}

/// Knobs the loop needs, lifted out of [`HarvestOptions`].
#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub origin: Url,
    pub game: String,
    pub max_cooldowns_per_item: u32,
    pub retry_transient: bool,
    pub limit: Option<usize>,
}

impl LoopSettings {
    pub fn from_options(opts: &HarvestOptions) -> Result<Self> {
        Ok(Self {
            origin: Url::parse(&opts.origin)?,
            game: opts.game.clone(),
            max_cooldowns_per_item: opts.max_cooldowns_per_item,
            retry_transient: opts.retry_transient,
            limit: opts.limit,
        })
    }
}

pub struct Harvester<'a> {
    settings: LoopSettings,
    store: &'a mut PlayerStore,
    fetcher: &'a dyn PageFetcher,
    resolver: Option<&'a dyn VanityResolver>,
    pacer: Pacer,
    cooldown: Cooldown,
    progress: &'a mut dyn Progress,
}

impl<'a> Harvester<'a> {
    pub fn new(
        settings: LoopSettings,
        store: &'a mut PlayerStore,
        fetcher: &'a dyn PageFetcher,
        pacer: Pacer,
        cooldown: Cooldown,
        progress: &'a mut dyn Progress,
    ) -> Self {
        Self { settings, store, fetcher, resolver: None, pacer, cooldown, progress }
    }

    /// Turn vanity Steam links into SteamID64s before saving.
    pub fn with_resolver(mut self, resolver: &'a dyn VanityResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub async fn run(&mut self, worklist: &[WorkItem]) -> Result<RunContext> {
        let pending = self.store.pending(worklist, self.settings.retry_transient);
        let total = match self.settings.limit {
            Some(n) => pending.len().min(n),
            None => pending.len(),
        };
        let already_done = self.store.done_count(worklist, self.settings.retry_transient);
        let mut ctx = RunContext { total, already_done, ..Default::default() };
        // ETA counts from here, not from whenever the pacer was built
        self.pacer.restart_clock();

        info!(total, already_done = ctx.already_done, "harvest starting");
        self.progress.on_progress(&ProgressEvent::Begin { total, already_done: ctx.already_done });

        for (index, item) in pending.iter().take(total).enumerate() {
            self.progress.on_progress(&ProgressEvent::Fetching { id: item.id.clone(), index, total });

            self.pacer.wait_if_needed().await;
            let mut result = self.attempt(item, &mut ctx).await;

            let mut cooldowns = 0u32;
            while let HarvestResult::RateLimited { id } = &result {
                cooldowns += 1;
                warn!(id = %id, attempt = cooldowns, "rate limited");
                self.progress.on_progress(&ProgressEvent::RateLimited { id: id.clone(), attempt: cooldowns });

                if cooldowns > self.settings.max_cooldowns_per_item {
                    result = HarvestResult::Transient {
                        id: id.clone(),
                        error_detail: format!("still rate limited after {} cooldowns", cooldowns - 1),
                    };
                    break;
                }

                // progress is already on disk after every item; make it explicit
                // before a pause long enough to invite a restart
                self.store.flush()?;
                ctx.cooldowns += 1;

                let (pacer, done) = (&self.pacer, ctx.processed);
                let eta = || pacer.eta(done, total);
                self.cooldown.wait(&mut *self.progress, &eta).await;

                // a full cooldown outlasts the interval, so this only waits when
                // the operator cut the cooldown short
                self.pacer.wait_if_needed().await;
                result = self.attempt(item, &mut ctx).await;
            }

            self.commit(result, &mut ctx)?;
            self.progress.on_progress(&ProgressEvent::Advanced {
                processed: ctx.processed,
                total,
                eta: self.pacer.eta(ctx.processed, total),
            });
        }

        info!(
            processed = ctx.processed,
            succeeded = ctx.succeeded,
            not_found = ctx.not_found,
            transient = ctx.transient,
            cooldowns = ctx.cooldowns,
            "harvest finished"
        );
        self.progress.on_progress(&ProgressEvent::Finished {
            processed: ctx.processed,
            succeeded: ctx.succeeded,
            skipped: ctx.skipped(),
        });
        Ok(ctx)
    }

    /// Fetch and read one page. Never fails: load errors become `Transient`.
    async fn attempt(&self, item: &WorkItem, ctx: &mut RunContext) -> HarvestResult {
        let id = item.id.clone();
        let url = match player_url(self.settings.origin.as_str(), &self.settings.game, &item.id) {
            Ok(u) => u,
            Err(e) => return HarvestResult::Transient { id, error_detail: e.to_string() },
        };

        ctx.fetches += 1;
        let page = match self.fetcher.fetch(&url).await {
            Ok(p) => p,
            Err(e) => return HarvestResult::Transient { id, error_detail: e.to_string() },
        };

        match player_page::extract(&page, &self.settings.origin) {
            PageOutcome::RateLimited => HarvestResult::RateLimited { id },
            PageOutcome::NotFound => HarvestResult::NotFound { id },
            PageOutcome::Found { account_id, image_url } => {
                let external_account_id = self.resolve(&id, account_id).await;
                HarvestResult::Success { id, external_account_id, image_url }
            }
        }
    }

    /// Vanity → SteamID64 when a resolver is configured. Keeps the vanity
    /// name if the lookup fails.
    async fn resolve(&self, id: &str, account_id: String) -> String {
        let Some(resolver) = self.resolver else { return account_id };
        if is_steam_id64(&account_id) {
            return account_id;
        }
        match resolver.resolve(&account_id).await {
            Ok(Some(id64)) => id64,
            Ok(None) => {
                warn!(id, vanity = %account_id, "steam has no profile for vanity name");
                account_id
            }
            Err(e) => {
                warn!(id, vanity = %account_id, error = %e, "vanity lookup failed");
                account_id
            }
        }
    }

    fn commit(&mut self, result: HarvestResult, ctx: &mut RunContext) -> Result<()> {
        match result {
            HarvestResult::Success { id, external_account_id, image_url } => {
                self.store.record_success(&id, &external_account_id, image_url.clone());
                self.store.flush()?;
                ctx.succeeded += 1;
                info!(id = %id, steamid = %external_account_id, "saved");
                self.progress.on_progress(&ProgressEvent::Saved {
                    id,
                    steamid: external_account_id,
                    image: image_url,
                });
            }
            HarvestResult::NotFound { id } => {
                self.store.record_skip(&id, SkipReason::NotFound);
                self.store.flush()?;
                ctx.not_found += 1;
                info!(id = %id, "no steam link, skipped");
                self.progress.on_progress(&ProgressEvent::Skipped { id, reason: SkipReason::NotFound, detail: None });
            }
            HarvestResult::Transient { id, error_detail } => {
                self.store.record_skip(&id, SkipReason::Transient);
                self.store.flush()?;
                ctx.transient += 1;
                warn!(id = %id, error = %error_detail, "skipped after error");
                self.progress.on_progress(&ProgressEvent::Skipped {
                    id,
                    reason: SkipReason::Transient,
                    detail: Some(error_detail),
                });
            }
            HarvestResult::RateLimited { id } => {
                let error_detail = "rate limited".to_string();
                return self.commit(HarvestResult::Transient { id, error_detail }, ctx);
            }
        }
        ctx.processed += 1;
        Ok(())
    }
}
