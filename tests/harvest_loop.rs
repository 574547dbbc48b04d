// tests/harvest_loop.rs
// Loop scenarios against scripted pages. Paused tokio time: pacing and
// cooldown sleeps advance a virtual clock instantly.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pro_scrape::cooldown::{Cooldown, SkipSignal};
use pro_scrape::harvest::{Harvester, LoopSettings, RunContext};
use pro_scrape::pacer::Pacer;
use pro_scrape::page::{PageFetcher, RenderedPage};
use pro_scrape::progress::{ProgressEvent, RecordingProgress};
use pro_scrape::roster::WorkItem;
use pro_scrape::steam::VanityResolver;
use pro_scrape::store::{PlayerStore, SkipReason};
use pro_scrape::{Error, Result};
use reqwest::Url;
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_secs(60);
const COOLDOWN: Duration = Duration::from_secs(3600);

#[derive(Clone)]
enum Reply {
    Steam(&'static str),
    NoSteam,
    Throttled,
    Fail,
}

/// Answers per id from a script; the last reply repeats once the script
/// runs out. Records when each fetch happened and, if watching a store file,
/// what was on disk at that moment.
#[derive(Default)]
struct ScriptedFetcher {
    script: HashMap<String, Vec<Reply>>,
    calls: Mutex<HashMap<String, usize>>,
    log: Mutex<Vec<(String, Instant)>>,
    watch: Option<PathBuf>,
    snapshots: Mutex<Vec<(usize, usize)>>,
}

impl ScriptedFetcher {
    fn with(mut self, id: &str, replies: &[Reply]) -> Self {
        self.script.insert(id.to_string(), replies.to_vec());
        self
    }

    fn watching(mut self, path: &Path) -> Self {
        self.watch = Some(path.to_path_buf());
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    fn instants(&self) -> Vec<Instant> {
        self.log.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<RenderedPage> {
        let id = url.path_segments().and_then(|mut s| s.next_back()).unwrap_or_default().to_string();
        self.log.lock().unwrap().push((id.clone(), Instant::now()));

        if let Some(path) = &self.watch {
            let s = PlayerStore::load(path).unwrap();
            assert!(s.completed().keys().all(|k| !s.skipped().contains_key(k)), "store not disjoint");
            self.snapshots.lock().unwrap().push((s.completed().len(), s.skipped().len()));
        }

        let n = {
            let mut calls = self.calls.lock().unwrap();
            let c = calls.entry(id.clone()).or_default();
            *c += 1;
            *c - 1
        };
        let replies = self.script.get(&id).cloned().unwrap_or_else(|| vec![Reply::NoSteam]);
        let reply = replies.get(n).or(replies.last()).cloned().unwrap_or(Reply::NoSteam);

        let (status, html) = match reply {
            Reply::Steam(account) => (
                200,
                format!(
                    r#"<div class="infobox-image-wrapper"><div class="infobox-image darkmode">
                       <img src="/commons/images/{id}.png"></div></div>
                       <div class="infobox-center infobox-icons">
                       <a href="https://steamcommunity.com/profiles/{account}/"></a></div>"#
                ),
            ),
            Reply::NoSteam => (200, "<div class=\"infobox-center infobox-icons\"></div>".to_string()),
            Reply::Throttled => (429, "<h1>Too Many Requests</h1>".to_string()),
            Reply::Fail => return Err(Error::fetch(url, "connection reset")),
        };
        Ok(RenderedPage { url: url.to_string(), status, html })
    }
}

struct FakeSteam;

#[async_trait]
impl VanityResolver for FakeSteam {
    async fn resolve(&self, vanity: &str) -> Result<Option<String>> {
        match vanity {
            "zywoo" => Ok(Some("76561198113666193".into())),
            "down" => Err(Error::fetch("https://steamcommunity.com/id/down/?xml=1", "HTTP 503")),
            _ => Ok(None),
        }
    }
}

fn settings() -> LoopSettings {
    LoopSettings {
        origin: Url::parse("https://liquipedia.net").unwrap(),
        game: "counterstrike".into(),
        max_cooldowns_per_item: 2,
        retry_transient: false,
        limit: None,
    }
}

fn worklist(ids: &[&str]) -> Vec<WorkItem> {
    ids.iter().map(|id| WorkItem::new(*id)).collect()
}

async fn harvest(
    path: &Path,
    fetcher: &ScriptedFetcher,
    ids: &[&str],
    settings: LoopSettings,
    signal: SkipSignal,
) -> (RunContext, RecordingProgress) {
    let mut store = PlayerStore::load(path).unwrap();
    let mut progress = RecordingProgress::default();
    let ctx = Harvester::new(
        settings,
        &mut store,
        fetcher,
        Pacer::with_interval(INTERVAL),
        Cooldown::new(COOLDOWN, signal),
        &mut progress,
    )
    .run(&worklist(ids))
    .await
    .unwrap();
    (ctx, progress)
}

fn state_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("pro_players.json")
}

#[tokio::test(start_paused = true)]
async fn success_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default().with("a", &[Reply::Steam("123")]);

    let (ctx, _) = harvest(&path, &f, &["a"], settings(), SkipSignal::new()).await;
    assert_eq!(ctx.succeeded, 1);

    let s = PlayerStore::load(&path).unwrap();
    let rec = s.get("a").unwrap();
    assert_eq!(rec.steamid, "123");
    assert_eq!(rec.category, "pro");
    assert_eq!(rec.image.as_deref(), Some("https://liquipedia.net/commons/images/a.png"));
    assert!(s.skipped().is_empty());
}

#[tokio::test(start_paused = true)]
async fn throttle_then_success_cools_down_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default().with("a", &[Reply::Throttled, Reply::Steam("123")]);

    let t0 = Instant::now();
    let (ctx, progress) = harvest(&path, &f, &["a"], settings(), SkipSignal::new()).await;

    assert_eq!(ctx.cooldowns, 1);
    assert_eq!(progress.count(|e| matches!(e, ProgressEvent::CooldownStarted { .. })), 1);
    assert_eq!(f.fetched(), ["a", "a"]);
    assert!(Instant::now() - t0 >= COOLDOWN);

    let s = PlayerStore::load(&path).unwrap();
    assert_eq!(s.get("a").unwrap().steamid, "123");
    assert!(s.skipped().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_link_is_a_permanent_skip() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default().with("a", &[Reply::Steam("1")]).with("b", &[Reply::NoSteam]);

    let (ctx, _) = harvest(&path, &f, &["a", "b"], settings(), SkipSignal::new()).await;
    assert_eq!((ctx.succeeded, ctx.not_found), (1, 1));

    let s = PlayerStore::load(&path).unwrap();
    assert_eq!(s.skip_reason("b"), Some(SkipReason::NotFound));
    assert_eq!(s.completed().keys().collect::<Vec<_>>(), ["a"]);
}

#[tokio::test(start_paused = true)]
async fn completed_ids_are_not_fetched_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let mut seed = PlayerStore::load(&path).unwrap();
    seed.record_success("a", "1", None);
    seed.record_skip("b", SkipReason::NotFound);
    seed.flush().unwrap();

    let f = ScriptedFetcher::default().with("c", &[Reply::Steam("3")]);
    let (ctx, progress) = harvest(&path, &f, &["a", "b", "c"], settings(), SkipSignal::new()).await;

    assert_eq!(f.fetched(), ["c"]);
    assert_eq!((ctx.total, ctx.already_done), (1, 2));
    assert_eq!(progress.events[0], ProgressEvent::Begin { total: 1, already_done: 2 });
}

#[tokio::test(start_paused = true)]
async fn second_run_has_nothing_to_do() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let ids = ["a", "b", "c"];
    let first = ScriptedFetcher::default()
        .with("a", &[Reply::Steam("1")])
        .with("b", &[Reply::NoSteam])
        .with("c", &[Reply::Fail]);
    harvest(&path, &first, &ids, settings(), SkipSignal::new()).await;
    let before = std::fs::read_to_string(&path).unwrap();

    let second = ScriptedFetcher::default();
    let (ctx, _) = harvest(&path, &second, &ids, settings(), SkipSignal::new()).await;
    assert_eq!(ctx.processed, 0);
    assert!(second.fetched().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn requests_respect_the_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default()
        .with("a", &[Reply::Steam("1")])
        .with("b", &[Reply::Throttled, Reply::Steam("2")])
        .with("c", &[Reply::Fail])
        .with("d", &[Reply::NoSteam]);

    harvest(&path, &f, &["a", "b", "c", "d"], settings(), SkipSignal::new()).await;

    let at = f.instants();
    assert_eq!(at.len(), 5);
    for pair in at.windows(2) {
        assert!(pair[1] - pair[0] >= INTERVAL, "fetches {:?} apart", pair[1] - pair[0]);
    }
}

#[tokio::test(start_paused = true)]
async fn skipped_cooldown_still_honours_spacing() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default().with("a", &[Reply::Throttled, Reply::Steam("1")]);

    let signal = SkipSignal::new();
    let presser = {
        let signal = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            signal.trigger();
        })
    };
    let (ctx, progress) = harvest(&path, &f, &["a"], settings(), signal).await;
    presser.await.unwrap();

    assert_eq!(ctx.succeeded, 1);
    assert!(progress.events.contains(&ProgressEvent::CooldownEnded { skipped: true }));
    let at = f.instants();
    assert!(at[1] - at[0] >= INTERVAL);
    assert!(at[1] - at[0] < COOLDOWN);
}

#[tokio::test(start_paused = true)]
async fn endless_throttle_gives_up_after_max_cooldowns() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default().with("a", &[Reply::Throttled]).with("b", &[Reply::Steam("2")]);

    let (ctx, progress) = harvest(&path, &f, &["a", "b"], settings(), SkipSignal::new()).await;

    assert_eq!(ctx.cooldowns, 2);
    assert_eq!(f.fetched(), ["a", "a", "a", "b"]);
    assert_eq!(progress.count(|e| matches!(e, ProgressEvent::RateLimited { .. })), 3);

    let s = PlayerStore::load(&path).unwrap();
    assert_eq!(s.skip_reason("a"), Some(SkipReason::Transient));
    assert_eq!(s.get("b").unwrap().steamid, "2");
}

#[tokio::test(start_paused = true)]
async fn fetch_error_is_transient_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default().with("a", &[Reply::Fail]).with("b", &[Reply::Steam("2")]);

    let (ctx, progress) = harvest(&path, &f, &["a", "b"], settings(), SkipSignal::new()).await;
    assert_eq!((ctx.transient, ctx.succeeded, ctx.cooldowns), (1, 1, 0));

    let skipped = progress.events.iter().find_map(|e| match e {
        ProgressEvent::Skipped { id, reason, detail } => Some((id.clone(), *reason, detail.clone())),
        _ => None,
    });
    let (id, reason, detail) = skipped.unwrap();
    assert_eq!((id.as_str(), reason), ("a", SkipReason::Transient));
    assert!(detail.unwrap().contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn retry_transient_only_revisits_transient_skips() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let mut seed = PlayerStore::load(&path).unwrap();
    seed.record_skip("flaky", SkipReason::Transient);
    seed.record_skip("nolink", SkipReason::NotFound);
    seed.flush().unwrap();

    let f = ScriptedFetcher::default().with("flaky", &[Reply::Steam("7")]);
    let ids = ["flaky", "nolink"];

    let (ctx, _) = harvest(&path, &f, &ids, settings(), SkipSignal::new()).await;
    assert_eq!(ctx.total, 0);

    let retry = LoopSettings { retry_transient: true, ..settings() };
    let (ctx, _) = harvest(&path, &f, &ids, retry, SkipSignal::new()).await;
    assert_eq!(ctx.succeeded, 1);
    assert_eq!(f.fetched(), ["flaky"]);

    let s = PlayerStore::load(&path).unwrap();
    assert_eq!(s.get("flaky").unwrap().steamid, "7");
    assert_eq!(s.skip_reason("flaky"), None);
    assert_eq!(s.skip_reason("nolink"), Some(SkipReason::NotFound));
}

#[tokio::test(start_paused = true)]
async fn store_grows_monotonically_and_stays_disjoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default()
        .with("a", &[Reply::Steam("1")])
        .with("b", &[Reply::NoSteam])
        .with("c", &[Reply::Throttled, Reply::Steam("3")])
        .with("d", &[Reply::Fail])
        .watching(&path);

    harvest(&path, &f, &["a", "b", "c", "d", "e"], settings(), SkipSignal::new()).await;

    let snaps = f.snapshots.lock().unwrap().clone();
    let totals: Vec<usize> = snaps.iter().map(|(c, s)| c + s).collect();
    // each fetch sees every earlier terminal outcome already on disk
    assert_eq!(totals, [0, 1, 2, 2, 3, 4]);

    let s = PlayerStore::load(&path).unwrap();
    assert_eq!(s.completed().len() + s.skipped().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn limit_caps_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default();
    let capped = LoopSettings { limit: Some(2), ..settings() };

    let (ctx, _) = harvest(&path, &f, &["a", "b", "c"], capped, SkipSignal::new()).await;
    assert_eq!((ctx.total, ctx.processed), (2, 2));
    assert_eq!(f.fetched(), ["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn vanity_links_resolve_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default()
        .with("ZywOo", &[Reply::Steam("zywoo")])
        .with("ghost", &[Reply::Steam("unknown")])
        .with("outage", &[Reply::Steam("down")])
        .with("s1mple", &[Reply::Steam("76561198034202275")]);

    let mut store = PlayerStore::load(&path).unwrap();
    let mut progress = RecordingProgress::default();
    let ctx = Harvester::new(
        settings(),
        &mut store,
        &f,
        Pacer::with_interval(INTERVAL),
        Cooldown::new(COOLDOWN, SkipSignal::new()),
        &mut progress,
    )
    .with_resolver(&FakeSteam)
    .run(&worklist(&["ZywOo", "ghost", "outage", "s1mple"]))
    .await
    .unwrap();

    assert_eq!(ctx.succeeded, 4);
    assert_eq!(store.get("ZywOo").unwrap().steamid, "76561198113666193");
    assert_eq!(store.get("ghost").unwrap().steamid, "unknown");
    assert_eq!(store.get("outage").unwrap().steamid, "down");
    assert_eq!(store.get("s1mple").unwrap().steamid, "76561198034202275");
}

#[tokio::test(start_paused = true)]
async fn duplicate_ids_are_not_counted_as_done() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let mut seed = PlayerStore::load(&path).unwrap();
    seed.record_success("a", "1", None);
    seed.flush().unwrap();

    let f = ScriptedFetcher::default();
    let (ctx, progress) = harvest(&path, &f, &["a", "a", "b", "b"], settings(), SkipSignal::new()).await;

    assert_eq!((ctx.total, ctx.already_done), (1, 1));
    assert_eq!(progress.events[0], ProgressEvent::Begin { total: 1, already_done: 1 });
    assert_eq!(f.fetched(), ["b"]);
}

#[tokio::test(start_paused = true)]
async fn eta_counts_from_the_start_of_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_path(&dir);
    let f = ScriptedFetcher::default();

    // built long before the run begins
    let pacer = Pacer::with_interval(INTERVAL);
    tokio::time::sleep(Duration::from_secs(10_000)).await;

    let mut store = PlayerStore::load(&path).unwrap();
    let mut progress = RecordingProgress::default();
    Harvester::new(
        settings(),
        &mut store,
        &f,
        pacer,
        Cooldown::new(COOLDOWN, SkipSignal::new()),
        &mut progress,
    )
    .run(&worklist(&["a", "b"]))
    .await
    .unwrap();

    let first_eta = progress.events.iter().find_map(|e| match e {
        ProgressEvent::Advanced { eta, .. } => Some(*eta),
        _ => None,
    });
    let left = first_eta.and_then(|eta| eta.remaining()).unwrap();
    assert!(left < INTERVAL, "eta {left:?} includes time before the run");
}
