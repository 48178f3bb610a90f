//! Position polling, listened-time accumulation and scrobble decisions

use tracing::{debug, info, warn};

use crate::scrobbler::ScrobbleService;
use crate::types::{Microseconds, SessionId};

use super::{Engine, PositionSource};

/// Summary of one poll tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sessions whose position was queried
    pub polled: usize,
    /// Sessions evicted because their position could not be read
    pub evicted: Vec<SessionId>,
    /// Sessions whose track was scrobbled during this tick
    pub scrobbled: Vec<SessionId>,
}

impl<S: ScrobbleService> Engine<S> {
    /// Run one poll tick over every playing session with a known length.
    ///
    /// A session whose position cannot be read is evicted; the remaining
    /// sessions are still processed.
    pub async fn poll<P>(&mut self, positions: &P) -> TickReport
    where
        P: PositionSource + ?Sized,
    {
        let mut report = TickReport::default();

        for id in self.registry.ids() {
            if !self.registry.get(&id).is_some_and(|s| s.is_pollable()) {
                continue;
            }
            report.polled += 1;

            let position = match positions.position(&id).await {
                Ok(position) => position,
                Err(e) => {
                    warn!("Lost connection to {}, removing: {}", id, e);
                    self.registry.remove(&id);
                    report.evicted.push(id);
                    continue;
                }
            };

            let Some(session) = self.registry.get_mut(&id) else {
                continue;
            };

            session.renormalize_artist(&self.artists);
            let now_playing = session.now_playing();

            let added = session.accumulate(position);
            debug!(
                "[{}] Position {}, +{} listened ({} of {})",
                id, position, added, session.listened, session.length
            );

            let scrobble = session.should_scrobble().then(|| {
                info!(
                    "[{}] Scrobbling after {:.1}% play: {} - {} [{}]",
                    id,
                    position.percent_of(session.length),
                    session.artist,
                    session.title,
                    session.album
                );
                // Set before submitting: a failed scrobble is not retried
                session.scrobbled = true;
                session.scrobble()
            });

            // Keeps the indicator alive on the service side during long tracks
            if let Some(track) = now_playing {
                self.notifier.now_playing(&id, &track).await;
            }

            if let Some(scrobble) = scrobble {
                self.notifier.scrobble(&id, &scrobble).await;
                report.scrobbled.push(id);
            }
        }

        report
    }

    /// Move a session's reference point to `position` without counting the
    /// distance as listened time.
    pub fn resync(&mut self, id: &SessionId, position: Microseconds) {
        if let Some(session) = self.registry.get_mut(id) {
            session.last_position = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{artists, metadata, status, track, FakePositions, RecordingService};
    use super::*;
    use crate::types::Microseconds;

    const THREE_MINUTES: i64 = 180_000_000;

    async fn playing_engine(
        ids: &[&SessionId],
        service: RecordingService,
        length_us: i64,
    ) -> Engine<RecordingService> {
        let mut engine = Engine::new(service, artists());
        for id in ids {
            engine
                .handle_notification(&metadata(id, track("Artist", "Song", length_us)), 1_000)
                .await
                .unwrap();
            engine.handle_notification(&status(id, "Playing"), 1_000).await.unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn test_three_minute_scenario() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::default(), THREE_MINUTES).await;
        let positions = FakePositions::default();

        positions.set(&id, 0);
        let report = engine.poll(&positions).await;
        assert!(report.scrobbled.is_empty());
        assert_eq!(engine.session(&id).unwrap().listened, Microseconds::new(0));

        positions.set(&id, 60_000_000);
        engine.poll(&positions).await;
        assert_eq!(engine.session(&id).unwrap().listened, Microseconds::new(60_000_000));
        assert!(engine.service().scrobbles().is_empty());

        positions.set(&id, 121_000_000);
        let report = engine.poll(&positions).await;
        assert_eq!(report.scrobbled, vec![id.clone()]);
        assert_eq!(engine.session(&id).unwrap().listened, Microseconds::new(121_000_000));

        let scrobbles = engine.service().scrobbles();
        assert_eq!(scrobbles.len(), 1);
        assert_eq!(scrobbles[0].artist, "Artist");
        assert_eq!(scrobbles[0].title, "Song");
        assert_eq!(scrobbles[0].album, "Album");
        assert_eq!(scrobbles[0].timestamp, 1_000);

        // Seek back: no new scrobble, no negative accumulation
        positions.set(&id, 5_000_000);
        let report = engine.poll(&positions).await;
        assert!(report.scrobbled.is_empty());

        let session = engine.session(&id).unwrap();
        assert!(session.scrobbled);
        assert_eq!(session.listened, Microseconds::new(121_000_000));
        assert_eq!(session.last_position, Microseconds::new(5_000_000));
        assert_eq!(engine.service().scrobbles().len(), 1);
    }

    #[tokio::test]
    async fn test_scrobble_never_fires_before_threshold() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::default(), THREE_MINUTES).await;
        let positions = FakePositions::default();

        positions.set(&id, 119_999_999);
        engine.poll(&positions).await;
        assert!(engine.service().scrobbles().is_empty());

        positions.set(&id, 120_000_000);
        engine.poll(&positions).await;
        assert_eq!(engine.service().scrobbles().len(), 1);
    }

    #[tokio::test]
    async fn test_rewinding_does_not_count_twice() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::default(), THREE_MINUTES).await;
        let positions = FakePositions::default();

        // Listen to the first minute three times
        for _ in 0..3 {
            positions.set(&id, 0);
            engine.poll(&positions).await;
            positions.set(&id, 40_000_000);
            engine.poll(&positions).await;
        }

        // 3 x 40s forward progress = 120s, exactly the threshold
        assert_eq!(engine.session(&id).unwrap().listened, Microseconds::new(120_000_000));
        assert_eq!(engine.service().scrobbles().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_renotifies_now_playing() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::default(), THREE_MINUTES).await;
        let positions = FakePositions::default();
        assert_eq!(engine.service().now_playing_count(), 1);

        positions.set(&id, 5_000_000);
        engine.poll(&positions).await;
        positions.set(&id, 10_000_000);
        engine.poll(&positions).await;

        assert_eq!(engine.service().now_playing_count(), 3);
    }

    #[tokio::test]
    async fn test_paused_sessions_are_not_polled() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::default(), THREE_MINUTES).await;
        engine.handle_notification(&status(&id, "Paused"), 0).await.unwrap();
        let positions = FakePositions::default();
        positions.set(&id, 170_000_000);

        let report = engine.poll(&positions).await;

        assert_eq!(report.polled, 0);
        assert_eq!(positions.query_count(), 0);
        assert!(engine.session(&id).unwrap().listened.is_zero());
    }

    #[tokio::test]
    async fn test_zero_length_is_never_polled_or_scrobbled() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::default(), 0).await;
        let positions = FakePositions::default();
        positions.set(&id, 500_000_000);

        for _ in 0..3 {
            engine.poll(&positions).await;
        }

        assert_eq!(positions.query_count(), 0);
        assert!(engine.service().scrobbles().is_empty());
    }

    #[tokio::test]
    async fn test_lost_session_is_evicted_others_continue() {
        let gone = SessionId::new(":1.1");
        let alive = SessionId::new(":1.2");
        let mut engine =
            playing_engine(&[&gone, &alive], RecordingService::default(), THREE_MINUTES).await;
        let positions = FakePositions::default();

        positions.set(&gone, 30_000_000);
        positions.set(&alive, 30_000_000);
        engine.poll(&positions).await;

        positions.disconnect(&gone);
        positions.set(&alive, 130_000_000);
        let report = engine.poll(&positions).await;

        assert_eq!(report.polled, 2);
        assert_eq!(report.evicted, vec![gone.clone()]);
        assert_eq!(report.scrobbled, vec![alive.clone()]);
        assert!(engine.session(&gone).is_none());

        let session = engine.session(&alive).unwrap();
        assert_eq!(session.listened, Microseconds::new(130_000_000));
        assert!(session.scrobbled);
    }

    #[tokio::test]
    async fn test_sessions_keep_separate_counters() {
        let a = SessionId::new(":1.1");
        let b = SessionId::new(":1.2");
        let mut engine = playing_engine(&[&a, &b], RecordingService::default(), THREE_MINUTES).await;
        let positions = FakePositions::default();

        positions.set(&a, 100_000_000);
        positions.set(&b, 10_000_000);
        engine.poll(&positions).await;

        assert_eq!(engine.session(&a).unwrap().listened, Microseconds::new(100_000_000));
        assert_eq!(engine.session(&b).unwrap().listened, Microseconds::new(10_000_000));

        // New track on one player leaves the other alone
        engine
            .handle_notification(&metadata(&b, track("Other", "Tune", THREE_MINUTES)), 2_000)
            .await
            .unwrap();
        assert_eq!(engine.session(&a).unwrap().listened, Microseconds::new(100_000_000));
        assert!(engine.session(&b).unwrap().listened.is_zero());
    }

    #[tokio::test]
    async fn test_failed_scrobble_is_not_retried() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::failing(), THREE_MINUTES).await;
        let positions = FakePositions::default();

        positions.set(&id, 150_000_000);
        let report = engine.poll(&positions).await;
        assert_eq!(report.scrobbled, vec![id.clone()]);
        assert!(engine.session(&id).unwrap().scrobbled);

        positions.set(&id, 170_000_000);
        engine.poll(&positions).await;

        assert_eq!(engine.service().scrobbles().len(), 1);
    }

    #[tokio::test]
    async fn test_resync_skips_progress_made_before() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::default(), THREE_MINUTES).await;
        let positions = FakePositions::default();

        engine.resync(&id, Microseconds::new(150_000_000));
        positions.set(&id, 155_000_000);
        engine.poll(&positions).await;

        assert_eq!(engine.session(&id).unwrap().listened, Microseconds::new(5_000_000));
        assert!(engine.service().scrobbles().is_empty());
    }

    #[tokio::test]
    async fn test_new_track_can_scrobble_again() {
        let id = SessionId::new(":1.1");
        let mut engine = playing_engine(&[&id], RecordingService::default(), THREE_MINUTES).await;
        let positions = FakePositions::default();

        positions.set(&id, 150_000_000);
        engine.poll(&positions).await;

        engine
            .handle_notification(&metadata(&id, track("Artist", "Song", THREE_MINUTES)), 5_000)
            .await
            .unwrap();
        positions.set(&id, 0);
        engine.poll(&positions).await;
        positions.set(&id, 125_000_000);
        engine.poll(&positions).await;

        let scrobbles = engine.service().scrobbles();
        assert_eq!(scrobbles.len(), 2);
        assert_eq!(scrobbles[1].timestamp, 5_000);
    }
}
