//! Track metadata, playback status and artist normalization

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::Microseconds;

/// Track metadata as reported by an MPRIS player
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    /// `xesam:artist`, in player order
    pub artists: Vec<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    /// `mpris:length`
    pub length: Option<Microseconds>,
}

impl Track {
    /// First entry of the artist list, or an empty string.
    #[must_use]
    pub fn first_artist(&self) -> &str {
        self.artists.first().map_or("", String::as_str)
    }
}

/// MPRIS `PlaybackStatus`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlaybackStatus {
    #[must_use]
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybackStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Playing" => Ok(Self::Playing),
            "Paused" => Ok(Self::Paused),
            "Stopped" => Ok(Self::Stopped),
            other => Err(Error::InvalidMetadata(format!(
                "unknown playback status '{other}'"
            ))),
        }
    }
}

/// Turns a raw `xesam:artist` entry into the artist name sent to Last.fm.
///
/// Some players pack several artists into one comma separated string, so
/// only the part before the first comma is kept. Artists whose actual name
/// contains a comma are listed explicitly and kept verbatim.
#[derive(Debug, Clone, Default)]
pub struct ArtistNormalizer {
    artists_with_commas: Vec<String>,
}

impl ArtistNormalizer {
    #[must_use]
    pub const fn new(artists_with_commas: Vec<String>) -> Self {
        Self {
            artists_with_commas,
        }
    }

    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        if self.artists_with_commas.iter().any(|a| a == raw) {
            return raw.to_string();
        }
        raw.split(',').next().unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> ArtistNormalizer {
        ArtistNormalizer::new(vec![
            "Tyler, the Creator".to_string(),
            "Dream, Ivory".to_string(),
        ])
    }

    #[test]
    fn test_normalize_keeps_allow_listed_artist() {
        assert_eq!(normalizer().normalize("Tyler, the Creator"), "Tyler, the Creator");
        assert_eq!(normalizer().normalize("Dream, Ivory"), "Dream, Ivory");
    }

    #[test]
    fn test_normalize_splits_other_artists() {
        assert_eq!(normalizer().normalize("Foo, Bar"), "Foo");
        assert_eq!(normalizer().normalize("Foo,Bar,Baz"), "Foo");
    }

    #[test]
    fn test_normalize_requires_exact_membership() {
        // Prefix of an allow-listed name is not a member
        assert_eq!(normalizer().normalize("Tyler, the"), "Tyler");
        assert_eq!(normalizer().normalize("tyler, the creator"), "tyler");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let n = normalizer();
        for raw in ["Tyler, the Creator", "Foo, Bar", "Plain", ""] {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once);
        }
    }

    #[test]
    fn test_playback_status_parse() {
        assert_eq!("Playing".parse::<PlaybackStatus>().unwrap(), PlaybackStatus::Playing);
        assert_eq!("Paused".parse::<PlaybackStatus>().unwrap(), PlaybackStatus::Paused);
        assert_eq!("Stopped".parse::<PlaybackStatus>().unwrap(), PlaybackStatus::Stopped);
        assert!("Buffering".parse::<PlaybackStatus>().is_err());
    }

    #[test]
    fn test_first_artist() {
        let mut track = Track::default();
        assert_eq!(track.first_artist(), "");
        track.artists = vec!["A".to_string(), "B".to_string()];
        assert_eq!(track.first_artist(), "A");
    }
}
