// src/lib.rs

pub mod config;
pub mod core;
pub mod specs;

pub mod cooldown;
pub mod error;
pub mod harvest;
pub mod log;
pub mod pacer;
pub mod page;
pub mod progress;
pub mod roster;
pub mod runner;
pub mod steam;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};
