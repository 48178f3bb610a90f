//! Per-player playback state
//!
//! One [`PlaybackSession`] exists per connected player. It remembers the
//! current track, how much of it has actually been listened to and whether it
//! has already been scrobbled.

use crate::scrobbler::{NowPlaying, Scrobble};
use crate::track::{ArtistNormalizer, PlaybackStatus, Track};
use crate::types::Microseconds;

/// Playback state of one player connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSession {
    /// Whether a track is currently loaded
    pub metadata_present: bool,

    /// First artist exactly as the player reported it
    pub raw_artist: String,

    /// Normalized artist of the current track
    pub artist: String,
    pub title: String,
    pub album: String,

    /// Track length; zero when the player does not report one
    pub length: Microseconds,

    pub status: PlaybackStatus,

    /// Unix time (seconds) at which the current track was loaded
    pub start_time: i64,

    /// Most recent position sample
    pub last_position: Microseconds,

    /// Forward progress accumulated on the current track
    pub listened: Microseconds,

    /// Whether the current track has been scrobbled
    pub scrobbled: bool,
}

impl PlaybackSession {
    /// Create an empty, stopped session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a new track, resetting all per-track counters.
    ///
    /// Applies even when the track is identical to the current one: a player
    /// re-sending metadata means the track was restarted.
    pub fn load_track(&mut self, track: &Track, artists: &ArtistNormalizer, now: i64) {
        // Players send an empty map when nothing is loaded
        self.metadata_present = *track != Track::default();
        self.raw_artist = track.first_artist().to_string();
        self.artist = artists.normalize(&self.raw_artist);
        self.title = track.title.clone().unwrap_or_default();
        self.album = track.album.clone().unwrap_or_default();
        self.length = track
            .length
            .filter(|len| len.is_positive())
            .unwrap_or_default();

        self.start_time = now;
        self.scrobbled = false;
        self.last_position = Microseconds::default();
        self.listened = Microseconds::default();
    }

    /// Whether the poller should sample this session
    #[must_use]
    pub const fn is_pollable(&self) -> bool {
        self.status.is_playing() && self.length.is_positive()
    }

    /// Feed a position sample, returning the listened time it added.
    ///
    /// Only forward movement counts; rewinds and restarts add nothing but
    /// still move the reference point.
    pub fn accumulate(&mut self, position: Microseconds) -> Microseconds {
        let delta = position - self.last_position;
        self.last_position = position;

        if delta.is_positive() {
            self.listened += delta;
            delta
        } else {
            Microseconds::default()
        }
    }

    /// Listened time required before the track may be scrobbled
    #[must_use]
    pub const fn scrobble_threshold(&self) -> Microseconds {
        self.length.two_thirds()
    }

    /// Whether a scrobble is due for the current track
    #[must_use]
    pub fn should_scrobble(&self) -> bool {
        !self.scrobbled && self.length.is_positive() && self.listened >= self.scrobble_threshold()
    }

    /// Re-derive the artist from the reported one with `artists`.
    pub fn renormalize_artist(&mut self, artists: &ArtistNormalizer) {
        self.artist = artists.normalize(&self.raw_artist);
    }

    /// Now-playing payload, if a track is loaded
    #[must_use]
    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.metadata_present.then(|| NowPlaying {
            artist: self.artist.clone(),
            title: self.title.clone(),
            album: self.album.clone(),
        })
    }

    /// Scrobble payload for the current track
    #[must_use]
    pub fn scrobble(&self) -> Scrobble {
        Scrobble {
            artist: self.artist.clone(),
            title: self.title.clone(),
            timestamp: self.start_time,
            album: self.album.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_MINUTES: i64 = 180_000_000;

    fn normalizer() -> ArtistNormalizer {
        ArtistNormalizer::new(vec!["Tyler, the Creator".to_string()])
    }

    fn make_track(artist: &str, title: &str, length_us: Option<i64>) -> Track {
        Track {
            artists: vec![artist.to_string()],
            title: Some(title.to_string()),
            album: Some("Album".to_string()),
            length: length_us.map(Microseconds::new),
        }
    }

    fn make_loaded_session(length_us: i64) -> PlaybackSession {
        let mut session = PlaybackSession::new();
        session.load_track(&make_track("Artist", "Song", Some(length_us)), &normalizer(), 1_000);
        session.status = PlaybackStatus::Playing;
        session
    }

    #[test]
    fn test_new_session_is_stopped_and_empty() {
        let session = PlaybackSession::new();
        assert_eq!(session.status, PlaybackStatus::Stopped);
        assert!(!session.metadata_present);
        assert!(session.now_playing().is_none());
        assert!(!session.is_pollable());
    }

    #[test]
    fn test_load_track_normalizes_artist() {
        let mut session = PlaybackSession::new();
        session.load_track(&make_track("Foo, Bar", "Song", None), &normalizer(), 0);
        assert_eq!(session.artist, "Foo");

        session.load_track(&make_track("Tyler, the Creator", "EARFQUAKE", None), &normalizer(), 0);
        assert_eq!(session.artist, "Tyler, the Creator");
    }

    #[test]
    fn test_empty_metadata_is_not_a_loaded_track() {
        let mut session = make_loaded_session(THREE_MINUTES);
        session.accumulate(Microseconds::new(30_000_000));

        session.load_track(&Track::default(), &normalizer(), 2_000);

        assert!(!session.metadata_present);
        assert!(session.now_playing().is_none());
        assert!(session.listened.is_zero());
        assert!(session.length.is_zero());
    }

    #[test]
    fn test_renormalize_artist_uses_reported_artist() {
        let mut session = PlaybackSession::new();
        session.load_track(&make_track("Dream, Ivory", "Song", None), &normalizer(), 0);
        assert_eq!(session.artist, "Dream");
        assert_eq!(session.raw_artist, "Dream, Ivory");

        let wider = ArtistNormalizer::new(vec!["Dream, Ivory".to_string()]);
        session.renormalize_artist(&wider);
        assert_eq!(session.artist, "Dream, Ivory");

        session.renormalize_artist(&normalizer());
        assert_eq!(session.artist, "Dream");
    }

    #[test]
    fn test_load_track_resets_counters_for_same_track() {
        let mut session = make_loaded_session(THREE_MINUTES);
        session.accumulate(Microseconds::new(130_000_000));
        session.scrobbled = true;

        session.load_track(
            &make_track("Artist", "Song", Some(THREE_MINUTES)),
            &normalizer(),
            2_000,
        );

        assert_eq!(session.listened, Microseconds::default());
        assert_eq!(session.last_position, Microseconds::default());
        assert!(!session.scrobbled);
        assert_eq!(session.start_time, 2_000);
        // Status is left alone
        assert_eq!(session.status, PlaybackStatus::Playing);
    }

    #[test]
    fn test_load_track_unknown_length_is_zero() {
        let mut session = PlaybackSession::new();
        session.load_track(&make_track("A", "B", None), &normalizer(), 0);
        assert!(session.length.is_zero());

        session.load_track(&make_track("A", "B", Some(-5)), &normalizer(), 0);
        assert!(session.length.is_zero());
    }

    #[test]
    fn test_accumulate_counts_forward_progress_only() {
        let mut session = make_loaded_session(THREE_MINUTES);

        assert_eq!(session.accumulate(Microseconds::new(10_000_000)), Microseconds::new(10_000_000));
        assert_eq!(session.accumulate(Microseconds::new(4_000_000)), Microseconds::default());
        assert_eq!(session.listened, Microseconds::new(10_000_000));
        assert_eq!(session.last_position, Microseconds::new(4_000_000));

        assert_eq!(session.accumulate(Microseconds::new(9_000_000)), Microseconds::new(5_000_000));
        assert_eq!(session.listened, Microseconds::new(15_000_000));
    }

    #[test]
    fn test_accumulate_same_position_adds_nothing() {
        let mut session = make_loaded_session(THREE_MINUTES);
        session.accumulate(Microseconds::new(10_000_000));
        session.accumulate(Microseconds::new(10_000_000));
        assert_eq!(session.listened, Microseconds::new(10_000_000));
    }

    #[test]
    fn test_should_scrobble_at_threshold() {
        let mut session = make_loaded_session(THREE_MINUTES);
        assert_eq!(session.scrobble_threshold(), Microseconds::new(120_000_000));

        session.accumulate(Microseconds::new(119_999_999));
        assert!(!session.should_scrobble());

        session.accumulate(Microseconds::new(120_000_000));
        assert!(session.should_scrobble());

        session.scrobbled = true;
        assert!(!session.should_scrobble());
    }

    #[test]
    fn test_zero_length_never_scrobbles() {
        let mut session = make_loaded_session(0);
        session.listened = Microseconds::new(i64::MAX);
        assert!(!session.should_scrobble());
        assert!(!session.is_pollable());
    }

    #[test]
    fn test_payloads() {
        let session = make_loaded_session(THREE_MINUTES);

        let now_playing = session.now_playing().unwrap();
        assert_eq!(now_playing.artist, "Artist");
        assert_eq!(now_playing.title, "Song");
        assert_eq!(now_playing.album, "Album");

        let scrobble = session.scrobble();
        assert_eq!(scrobble.timestamp, 1_000);
        assert_eq!(scrobble.title, "Song");
    }
}
