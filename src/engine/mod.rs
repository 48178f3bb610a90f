//! Playback tracking and scrobble decisions
//!
//! The [`Engine`] owns the player registry and reacts to two kinds of input:
//!
//! - [`PlayerNotification`]s from the bus, handled by the track-change
//!   detector (`detector.rs`), which loads tracks, updates playback status
//!   and announces tracks that start playing.
//! - Poll ticks (`poller.rs`), which sample the position of every playing
//!   session, accumulate listened time and scrobble a track once two thirds
//!   of it have been heard.
//!
//! Both run to completion on the caller's task; the engine is never shared,
//! so no locking is involved.

mod detector;
mod notifier;
mod poller;
mod registry;

pub use detector::Notified;
pub use notifier::Notifier;
pub use poller::TickReport;
pub use registry::Registry;

use async_trait::async_trait;

use crate::error::Result;
use crate::scrobbler::ScrobbleService;
use crate::session::PlaybackSession;
use crate::track::{ArtistNormalizer, Track};
use crate::types::{Microseconds, SessionId};

/// A `PropertiesChanged` notification from one player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerNotification {
    /// Bus sender
    pub session: SessionId,

    /// Interface whose properties changed
    pub interface: String,

    /// Parsed `Metadata`, if it changed
    pub metadata: Option<Track>,

    /// Raw `PlaybackStatus`, if it changed
    pub playback_status: Option<String>,
}

/// Reads the current playback position of a session
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Fails when the session is no longer reachable
    async fn position(&self, session: &SessionId) -> Result<Microseconds>;
}

/// Playback tracking engine
pub struct Engine<S> {
    registry: Registry,
    notifier: Notifier<S>,
    artists: ArtistNormalizer,
}

impl<S: ScrobbleService> Engine<S> {
    pub fn new(service: S, artists: ArtistNormalizer) -> Self {
        Self {
            registry: Registry::new(),
            notifier: Notifier::new(service),
            artists,
        }
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn session(&self, id: &SessionId) -> Option<&PlaybackSession> {
        self.registry.get(id)
    }

    pub const fn service(&self) -> &S {
        self.notifier.service()
    }
}
