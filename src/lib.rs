//! # MPRIS Scrobbler
//!
//! Scrobbles music played by MPRIS media players on Linux to Last.fm.
//!
//! This crate provides:
//! - A playback tracking engine that accumulates listened time per player,
//!   tolerant of seeking, and scrobbles a track once two thirds of it were heard
//! - MPRIS D-Bus monitoring that feeds the engine
//! - A Last.fm client, including the one-time web authorization flow

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod mpris;
pub mod scrobbler;
pub mod session;
pub mod track;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "mpris-scrobbler";
