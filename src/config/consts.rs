// src/config/consts.rs

// Site
pub const SITE_ORIGIN: &str = "https://liquipedia.net";
pub const GAME_SLUG: &str = "counterstrike";
pub const PLAYER_CATEGORY: &str = "Players";
pub const PLAYER_TYPE: &str = "pro";
pub const USER_AGENT: &str = concat!(
    "pro_scrape/",
    env!("CARGO_PKG_VERSION"),
    " (Steam ID harvester; contact via repository issues)"
);

// Steam
pub const STEAM_ORIGIN: &str = "https://steamcommunity.com";
pub const STEAM_ID64_PREFIX: &str = "7656119";
pub const STEAM_ID64_LEN: usize = 17;

// Local state
pub const STORE_DIR: &str = ".store";
pub const STORE_FILE: &str = "pro_players.json";
pub const LOG_FILE: &str = "debug.log";

// Pacing. The wiki allows 60 page views an hour; stay under it.
pub const HOURLY_QUOTA: u32 = 60;
pub const REQUESTS_PER_HOUR: u32 = 55;
pub const COOLDOWN_SECS: u64 = 3600;
pub const MAX_COOLDOWNS_PER_ITEM: u32 = 2;
pub const API_PAGE_PAUSE_MS: u64 = 2_000;
pub const HTTP_TIMEOUT_SECS: u64 = 30;

// Throttle detection: markers matched case-insensitively against the page
// title and top-level headings only, never the article body
pub const RATE_LIMIT_MARKERS: &[&str] = &["rate limited", "too many requests"];
pub const SEL_THROTTLE_HEADING: &str = "title, h1";

// Player page selectors
pub const SEL_ACCOUNT_LINK: &str = r#".infobox-center.infobox-icons a[href*="steamcommunity.com"]"#;
pub const SEL_IMAGE_DARK: &str = ".infobox-image-wrapper .infobox-image.darkmode img";
pub const SEL_IMAGE_LIGHT: &str = ".infobox-image-wrapper .infobox-image.lightmode img";
