// src/specs/mod.rs
//! # Page specs
//!
//! Page-specific extraction: *where the ground truth lives in the markup* and
//! *how to read it robustly*. Everything here is a pure function over a page that
//! has already been fetched.
//!
//! ## What lives here
//! - **Player page** (`player_page`): throttle detection, the Steam link in the
//!   infobox icon row, and the infobox portrait (dark variant first, light as
//!   fallback).
//! - **Steam profile XML** (`steam_profile`): the `<steamID64>` field used to
//!   turn a vanity link into a numeric id, and the SteamID64 shape check.
//!
//! ## What does **not** live here
//! - Fetching, pacing, cooldowns: see `page`, `pacer`, `cooldown`.
//! - Deciding what an outcome *means* for the store: see `harvest`.
//!
//! ## Conventions
//! - A missing element is an absent field, never an error. A page that loaded
//!   always yields an outcome.
//! - Selectors are kept in `config::consts` so a wiki skin change is a
//!   one-line fix.
//! - Specs are tested offline against captured fixtures in `tests/fixtures/`.
pub mod player_page;
pub mod steam_profile;
