// src/specs/player_page.rs
use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::config::consts::{
    RATE_LIMIT_MARKERS, SEL_ACCOUNT_LINK, SEL_IMAGE_DARK, SEL_IMAGE_LIGHT, SEL_THROTTLE_HEADING,
};
use crate::core::html::contains_ci;
use crate::page::RenderedPage;

static ACCOUNT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(SEL_ACCOUNT_LINK).expect("static account link selector is valid"));
static IMAGE_DARK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(SEL_IMAGE_DARK).expect("static dark image selector is valid"));
static IMAGE_LIGHT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(SEL_IMAGE_LIGHT).expect("static light image selector is valid"));
static THROTTLE_HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(SEL_THROTTLE_HEADING).expect("static heading selector is valid"));

/// What one player page says, before the harvest loop decides what to do
/// with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    Found { account_id: String, image_url: Option<String> },
    /// Page loaded, no Steam link in the infobox.
    NotFound,
    /// The wiki served its throttle page instead of the player.
    RateLimited,
}

/// Read a loaded player page. `origin` resolves site-relative image paths.
pub fn extract(page: &RenderedPage, origin: &Url) -> PageOutcome {
    if page.status == 429 {
        return PageOutcome::RateLimited;
    }

    let doc = Html::parse_document(&page.html);
    if has_throttle_heading(&doc) {
        return PageOutcome::RateLimited;
    }

    let Some(account_id) = account_id(&doc, origin) else {
        return PageOutcome::NotFound;
    };
    let image_url = image_url(&doc, origin);

    PageOutcome::Found { account_id, image_url }
}

/// Throttle page: HTTP 429, or a marker in the title or an `h1`. Body text
/// is ignored so a bio mentioning "rate limited" stays a player page.
pub fn is_rate_limited(page: &RenderedPage) -> bool {
    page.status == 429 || has_throttle_heading(&Html::parse_document(&page.html))
}

fn has_throttle_heading(doc: &Html) -> bool {
    doc.select(&THROTTLE_HEADING).any(|el| {
        let text: String = el.text().collect();
        RATE_LIMIT_MARKERS.iter().any(|m| contains_ci(&text, m))
    })
}

/// First Steam link in the icon row whose URL has a usable last segment.
fn account_id(doc: &Html, origin: &Url) -> Option<String> {
    doc.select(&ACCOUNT_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| account_id_from_href(href, origin))
}

/// Last non-empty path segment of the link, trailing slashes ignored.
pub fn account_id_from_href(href: &str, origin: &Url) -> Option<String> {
    let url = origin.join(href.trim()).ok()?;
    url.path_segments()?
        .filter(|seg| !seg.is_empty())
        .last()
        .map(str::to_string)
}

fn image_url(doc: &Html, origin: &Url) -> Option<String> {
    first_src(doc, &IMAGE_DARK)
        .or_else(|| first_src(doc, &IMAGE_LIGHT))
        .and_then(|src| absolutize(src, origin))
}

fn first_src<'a>(doc: &'a Html, sel: &Selector) -> Option<&'a str> {
    doc.select(sel)
        .filter_map(|img: ElementRef<'a>| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
}

/// `/images/x.png` → `<origin>/images/x.png`; absolute URLs pass through.
pub fn absolutize(src: &str, origin: &Url) -> Option<String> {
    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src.to_string());
    }
    origin.join(src).ok().map(String::from)
}
