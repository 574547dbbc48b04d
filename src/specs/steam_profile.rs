// src/specs/steam_profile.rs
use crate::config::consts::{STEAM_ID64_LEN, STEAM_ID64_PREFIX};
use crate::core::html::tag_text_ci;

/// `7656119` followed by ten digits.
pub fn is_steam_id64(s: &str) -> bool {
    s.len() == STEAM_ID64_LEN
        && s.starts_with(STEAM_ID64_PREFIX)
        && s.bytes().all(|b| b.is_ascii_digit())
}

/// `<steamID64>` from a community profile's `?xml=1` document, if it looks
/// like a real id. Steam answers unknown vanity names with an `<error>` body.
pub fn parse_steam_id64(xml: &str) -> Option<String> {
    tag_text_ci(xml, "steamID64")
        .filter(|id| is_steam_id64(id))
        .map(str::to_string)
}
