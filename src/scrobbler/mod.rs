//! Scrobbling service interface and the Last.fm implementation

mod auth;
mod lastfm;

pub use auth::{authorize, AUTH_URL};
pub use lastfm::LastFmClient;

use async_trait::async_trait;

use crate::error::Result;

/// A "now playing" update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub artist: String,
    pub title: String,
    pub album: String,
}

/// A scrobble submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scrobble {
    pub artist: String,
    pub title: String,
    /// Unix time (seconds) at which the track started
    pub timestamp: i64,
    pub album: String,
}

/// A listening-history service that accepts now-playing updates and scrobbles
#[async_trait]
pub trait ScrobbleService: Send + Sync {
    /// Update the "now playing" indicator. Repeated identical calls are fine.
    async fn update_now_playing(&self, track: &NowPlaying) -> Result<()>;

    /// Record that a track was played
    async fn scrobble(&self, scrobble: &Scrobble) -> Result<()>;
}
