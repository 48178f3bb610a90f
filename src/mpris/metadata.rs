//! MPRIS metadata parsing

use std::collections::HashMap;
use zbus::zvariant::OwnedValue;

use crate::engine::PlayerNotification;
use crate::error::{Error, Result};
use crate::track::Track;
use crate::types::{Microseconds, SessionId};

use super::{extract, extract_string};

/// Parse an MPRIS `Metadata` map into a Track
pub fn parse_metadata(metadata: &HashMap<String, OwnedValue>) -> Track {
    let mut track = Track::default();

    // Artist (array of strings, occasionally a bare string)
    if let Some(value) = metadata.get("xesam:artist") {
        if let Some(artists) = extract::<Vec<String>>(value) {
            track.artists = artists;
        } else if let Some(artist) = extract_string(value) {
            track.artists = vec![artist];
        }
    }

    if let Some(value) = metadata.get("xesam:title") {
        track.title = extract_string(value);
    }

    if let Some(value) = metadata.get("xesam:album") {
        track.album = extract_string(value);
    }

    // Length (microseconds)
    if let Some(value) = metadata.get("mpris:length") {
        track.length = extract::<i64>(value).map(Microseconds::new);
    }

    track
}

/// Build an engine notification from the body of a `PropertiesChanged` signal.
///
/// Only `Metadata` and `PlaybackStatus` are picked up; other changed
/// properties are dropped.
pub fn notification_from_changes(
    session: SessionId,
    interface: String,
    changed: &HashMap<String, OwnedValue>,
) -> Result<PlayerNotification> {
    let metadata = changed
        .get("Metadata")
        .map(|value| {
            HashMap::<String, OwnedValue>::try_from(value.clone())
                .map(|map| parse_metadata(&map))
                .map_err(|e| Error::InvalidMetadata(format!("Metadata is not a dict: {e}")))
        })
        .transpose()?;

    let playback_status = changed
        .get("PlaybackStatus")
        .map(|value| {
            extract_string(value)
                .ok_or_else(|| Error::InvalidMetadata("PlaybackStatus is not a string".into()))
        })
        .transpose()?;

    Ok(PlayerNotification {
        session,
        interface,
        metadata,
        playback_status,
    })
}
