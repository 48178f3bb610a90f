//! Track-change detection

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::mpris::MPRIS_PLAYER_IFACE;
use crate::scrobbler::ScrobbleService;
use crate::track::PlaybackStatus;

use super::{Engine, PlayerNotification};

/// What a notification did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notified {
    /// Not a player-interface notification
    Ignored,
    /// Applied to a session; `created` is set when the session is new
    Applied { created: bool },
}

impl<S: ScrobbleService> Engine<S> {
    /// Apply a `PropertiesChanged` notification.
    ///
    /// `now` is the current Unix time in seconds, recorded as the start time
    /// of a newly loaded track. An unknown playback status is logged and
    /// skipped; the rest of the notification still applies.
    pub async fn handle_notification(
        &mut self,
        notification: &PlayerNotification,
        now: i64,
    ) -> Result<Notified> {
        if notification.interface != MPRIS_PLAYER_IFACE {
            return Ok(Notified::Ignored);
        }

        let id = &notification.session;
        let created = !self.registry.contains(id);
        let session = self.registry.upsert(id);

        if let Some(track) = &notification.metadata {
            session.load_track(track, &self.artists, now);
            info!(
                "[{}] Track changed: {} - {} ({})",
                id, session.artist, session.title, session.length
            );
        }

        let status = match notification
            .playback_status
            .as_deref()
            .map(str::parse::<PlaybackStatus>)
        {
            Some(Ok(status)) => Some(status),
            Some(Err(e)) => {
                warn!("[{}] Keeping status {}: {}", id, session.status, e);
                None
            }
            None => None,
        };

        let mut announce = None;
        if let Some(status) = status {
            session.status = status;
            info!("[{}] Status -> {}", id, status);

            if status.is_playing() {
                announce = session.now_playing();
            } else {
                debug!("[{}] Waiting for paused/stopped track to start playing", id);
            }
        }

        if let Some(track) = announce {
            self.notifier.now_playing(id, &track).await;
        }

        Ok(Notified::Applied { created })
    }
}
