// src/runner.rs
// Top-level run: options in, collaborators built, worklist fetched, loop run.

use tracing::{error, info, warn};

use crate::config::{HarvestOptions, WorklistSource};
use crate::cooldown::{Cooldown, SkipSignal};
use crate::core::net;
use crate::error::Result;
use crate::harvest::{Harvester, LoopSettings, RunContext};
use crate::pacer::{Eta, Pacer};
use crate::page::HttpFetcher;
use crate::progress::{Progress, ProgressEvent};
use crate::roster::{FileRoster, PlayerSource, WikiRoster, WorkItem};
use crate::steam::SteamResolver;
use crate::store::{PlayerStore, StoreStats};

/// Harvest with the real network collaborators.
pub async fn run(opts: &HarvestOptions, signal: SkipSignal, progress: &mut dyn Progress) -> Result<RunContext> {
    let client = net::client(&opts.user_agent)?;

    let source: Box<dyn PlayerSource> = match &opts.worklist {
        WorklistSource::Wiki { category } => {
            Box::new(WikiRoster::new(client.clone(), &opts.origin, &opts.game, category)?)
        }
        WorklistSource::File(path) => Box::new(FileRoster::new(path)),
    };
    let fetcher = HttpFetcher::new(client.clone());
    let resolver = if opts.resolve_vanity { Some(SteamResolver::new(client)?) } else { None };

    // load first: a corrupt store should stop us before any request goes out
    let mut store = PlayerStore::load(&opts.state_path)?;
    let cooldown = Cooldown::new(opts.cooldown, signal);

    let worklist = fetch_worklist(source.as_ref(), &cooldown, progress).await?;

    let mut harvester = Harvester::new(
        LoopSettings::from_options(opts)?,
        &mut store,
        &fetcher,
        Pacer::new(opts.requests_per_hour),
        cooldown,
        progress,
    );
    if let Some(r) = resolver.as_ref() {
        harvester = harvester.with_resolver(r);
    }
    harvester.run(&worklist).await
}

/// Ask the source once; if it is unavailable, cool down and ask exactly one
/// more time. The second failure is returned to the caller.
pub async fn fetch_worklist(
    source: &dyn PlayerSource,
    cooldown: &Cooldown,
    progress: &mut dyn Progress,
) -> Result<Vec<WorkItem>> {
    match source.list_players().await {
        Ok(list) => Ok(list),
        Err(e) if e.is_source_unavailable() => {
            warn!(error = %e, "worklist unavailable, cooling down before one retry");
            progress.on_progress(&ProgressEvent::SourceRetry { detail: e.to_string() });
            cooldown.wait(progress, &|| Eta::Calculating).await;
            source.list_players().await.inspect_err(|e| error!(error = %e, "worklist still unavailable"))
        }
        Err(e) => Err(e),
    }
}

/// Counts from the store file without touching the network.
pub fn status(opts: &HarvestOptions) -> Result<StoreStats> {
    let store = PlayerStore::load(&opts.state_path)?;
    let stats = store.stats();
    info!(?stats, path = %opts.state_path.display(), "store status");
    Ok(stats)
}
