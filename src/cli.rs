// src/cli.rs
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};

use crate::config::consts::*;
use crate::config::{HarvestOptions, WorklistSource};
use crate::cooldown::{SkipSignal, spawn_line_listener};
use crate::pacer::fmt_hms;
use crate::progress::{Progress, ProgressEvent};
use crate::store::SkipReason;

/// Harvest Steam ids and portraits of pro players from Liquipedia.
///
/// Progress is saved after every player; stop at any time and run again to
/// continue. Press Enter during a cooldown to end it early.
#[derive(Debug, Parser)]
#[command(name = "pro_scrape", version, about)]
pub struct Args {
    /// State file (players found + skipped)
    #[arg(long, env = "PRO_SCRAPE_STATE", default_value_os_t = PathBuf::from(STORE_DIR).join(STORE_FILE))]
    pub state: PathBuf,

    /// Wiki origin
    #[arg(long, env = "PRO_SCRAPE_ORIGIN", default_value = SITE_ORIGIN)]
    pub origin: String,

    /// Wiki game slug
    #[arg(long, env = "PRO_SCRAPE_GAME", default_value = GAME_SLUG)]
    pub game: String,

    /// Player category listed through the wiki API
    #[arg(long, default_value = PLAYER_CATEGORY)]
    pub category: String,

    /// Read the worklist from a JSON file instead of the wiki API
    #[arg(long, value_name = "FILE")]
    pub worklist: Option<PathBuf>,

    /// Page requests per hour (the wiki allows 60)
    #[arg(long, env = "PRO_SCRAPE_RPH", default_value_t = REQUESTS_PER_HOUR,
          value_parser = clap::value_parser!(u32).range(1..=3600))]
    pub requests_per_hour: u32,

    /// Cooldown after the wiki throttles us, in seconds
    #[arg(long, default_value_t = COOLDOWN_SECS)]
    pub cooldown_secs: u64,

    /// Cooldowns allowed per player before it is skipped as transient
    #[arg(long, default_value_t = MAX_COOLDOWNS_PER_ITEM)]
    pub max_cooldowns: u32,

    /// Re-attempt players previously skipped after an error
    #[arg(long)]
    pub retry_transient: bool,

    /// Resolve vanity Steam links to SteamID64 via steamcommunity.com
    #[arg(long)]
    pub resolve_vanity: bool,

    /// Process at most N players this run
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Print a summary of the state file and exit
    #[arg(long)]
    pub status: bool,

    /// Mirror the debug log to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn to_options(&self) -> HarvestOptions {
        let worklist = match &self.worklist {
            Some(p) => WorklistSource::File(p.clone()),
            None => WorklistSource::Wiki { category: self.category.clone() },
        };
        HarvestOptions {
            origin: self.origin.clone(),
            game: self.game.clone(),
            worklist,
            state_path: self.state.clone(),
            requests_per_hour: self.requests_per_hour,
            cooldown: Duration::from_secs(self.cooldown_secs),
            max_cooldowns_per_item: self.max_cooldowns,
            retry_transient: self.retry_transient,
            resolve_vanity: self.resolve_vanity,
            limit: self.limit,
            ..HarvestOptions::default()
        }
    }
}

/// Run with Enter on stdin skipping cooldowns.
pub async fn run(args: Args) -> Result<()> {
    run_with_input(args, io::BufReader::new(io::stdin())).await
}

/// Same as [`run`], with cooldown skips read from `input`. The listener
/// thread is left detached: returning never waits on a pending read.
pub async fn run_with_input<R>(args: Args, input: R) -> Result<()>
where
    R: BufRead + Send + 'static,
{
    let opts = args.to_options();
    crate::log::init(&opts.log_path(), args.verbose)
        .wrap_err_with(|| format!("opening log {}", opts.log_path().display()))?;

    if args.status {
        let s = crate::runner::status(&opts)?;
        println!("{}", opts.state_path.display());
        println!("  completed:            {} ({} with image)", s.completed, s.with_image);
        println!("  skipped (no account): {}", s.not_found);
        println!("  skipped (transient):  {}", s.transient);
        return Ok(());
    }

    let signal = SkipSignal::new();
    spawn_line_listener(input, signal.clone()).wrap_err("starting the Enter listener")?;

    let mut console = ConsoleProgress::default();
    let ctx = crate::runner::run(&opts, signal, &mut console).await.wrap_err("harvest aborted")?;
    if ctx.total == 0 {
        println!("Nothing to do: {} players already handled.", ctx.already_done);
    }
    Ok(())
}

/// Renders progress events as console lines.
#[derive(Default)]
pub struct ConsoleProgress {
    in_cooldown: bool,
}

impl Progress for ConsoleProgress {
    fn on_progress(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Begin { total, already_done } => {
                println!("{total} players to fetch ({already_done} already done)");
            }
            ProgressEvent::Fetching { id, index, total } => {
                println!("[{}/{}] {id}", index + 1, total);
            }
            ProgressEvent::Saved { steamid, image, .. } => {
                let img = if image.is_some() { "with image" } else { "no image" };
                println!("    steam {steamid} ({img})");
            }
            ProgressEvent::Skipped { reason: SkipReason::NotFound, .. } => {
                println!("    no steam account, skipped");
            }
            ProgressEvent::Skipped { reason: SkipReason::Transient, detail, .. } => {
                println!("    error, skipped: {}", detail.as_deref().unwrap_or("unknown"));
            }
            ProgressEvent::RateLimited { attempt, .. } => {
                println!("    rate limited (attempt {attempt})");
            }
            ProgressEvent::CooldownStarted { duration } => {
                self.in_cooldown = true;
                println!("Cooling down for {}. Press Enter to skip.", fmt_hms(*duration));
            }
            ProgressEvent::CooldownTick { remaining, eta } => {
                print!("\r    {} left, ETA {eta}    ", fmt_hms(*remaining));
                let _ = std::io::stdout().flush();
            }
            ProgressEvent::CooldownEnded { skipped } => {
                if self.in_cooldown {
                    println!();
                }
                self.in_cooldown = false;
                println!("{}", if *skipped { "Cooldown skipped, resuming." } else { "Cooldown over, resuming." });
            }
            ProgressEvent::Advanced { processed, total, eta } => {
                println!("    {processed}/{total} done, ETA {eta}");
            }
            ProgressEvent::SourceRetry { detail } => {
                println!("Player list unavailable ({detail}); retrying once after a cooldown.");
            }
            ProgressEvent::Finished { processed, succeeded, skipped } => {
                println!("Finished: {processed} processed, {succeeded} saved, {skipped} skipped.");
            }
        }
    }
}
