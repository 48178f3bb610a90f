//! Now-playing and scrobble submission
//!
//! Failures are logged and swallowed. Nothing is deduplicated or retried.

use tracing::{error, info, warn};

use crate::scrobbler::{NowPlaying, Scrobble, ScrobbleService};
use crate::types::SessionId;

/// Thin wrapper around a [`ScrobbleService`] that never propagates errors
pub struct Notifier<S> {
    service: S,
}

impl<S: ScrobbleService> Notifier<S> {
    pub const fn new(service: S) -> Self {
        Self { service }
    }

    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Send a now-playing update
    pub async fn now_playing(&self, session: &SessionId, track: &NowPlaying) {
        info!(
            "[{}] Now playing {} - {} [{}]",
            session, track.artist, track.title, track.album
        );

        if let Err(e) = self.service.update_now_playing(track).await {
            warn!(
                "[{}] Failed update_now_playing for {} - {} [{}]: {}",
                session, track.artist, track.title, track.album, e
            );
        }
    }

    /// Submit a scrobble
    pub async fn scrobble(&self, session: &SessionId, scrobble: &Scrobble) {
        if let Err(e) = self.service.scrobble(scrobble).await {
            error!(
                "[{}] Failed scrobble for {} - {} [{}]: {}",
                session, scrobble.artist, scrobble.title, scrobble.album, e
            );
        }
    }
}
