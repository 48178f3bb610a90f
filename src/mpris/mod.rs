//! MPRIS D-Bus plumbing
//!
//! Turns `PropertiesChanged` signals of MPRIS players into engine
//! notifications, answers position queries, and drives the event loop.

mod directory;
mod metadata;
mod monitor;
mod position;

pub use directory::PlayerDirectory;
pub use metadata::{notification_from_changes, parse_metadata};
pub use monitor::{MprisMonitor, StopHandle};
pub use position::BusPositions;

use std::future::Future;
use std::time::Duration;

use zbus::zvariant::{OwnedValue, Value};

use crate::error::{Error, Result};

/// MPRIS D-Bus constants
pub const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";
pub const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
pub const MPRIS_PLAYER_IFACE: &str = "org.mpris.MediaPlayer2.Player";
pub const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";

/// Strip the MPRIS prefix from a well-known bus name
#[must_use]
pub fn player_id(well_known_name: &str) -> &str {
    well_known_name
        .strip_prefix(MPRIS_PREFIX)
        .unwrap_or(well_known_name)
}

/// Run a bus call, failing with [`Error::Timeout`] if the peer does not
/// answer in time. Misbehaving players otherwise stall the event loop.
pub(crate) async fn with_timeout<T, E, F>(timeout: Duration, what: &str, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    Error: From<E>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| Error::Timeout(what.to_string()))?
        .map_err(Error::from)
}

/// Trait for extracting typed values from D-Bus variants
pub trait ExtractValue: Sized {
    /// Extract a value from a D-Bus OwnedValue
    fn extract(value: &OwnedValue) -> Option<Self>;
}

impl ExtractValue for String {
    fn extract(value: &OwnedValue) -> Option<Self> {
        if let Ok(Value::Str(s)) = value.try_into() {
            return Some(s.to_string());
        }
        <&str>::try_from(value)
            .map(String::from)
            .or_else(|_| String::try_from(value.clone()))
            .ok()
    }
}

impl ExtractValue for Vec<String> {
    fn extract(value: &OwnedValue) -> Option<Self> {
        Vec::<String>::try_from(value.clone())
            .ok()
            .filter(|arr| !arr.is_empty())
            .or_else(|| {
                if let Value::Array(arr) = Value::from(value.clone()) {
                    let strings: Vec<_> = arr
                        .iter()
                        .filter_map(|v| match v {
                            Value::Str(s) => Some(s.to_string()),
                            _ => None,
                        })
                        .collect();
                    (!strings.is_empty()).then_some(strings)
                } else {
                    None
                }
            })
    }
}

// Players disagree on the integer type of `mpris:length` and `Position`
impl ExtractValue for i64 {
    fn extract(value: &OwnedValue) -> Option<Self> {
        Self::try_from(value.clone())
            .ok()
            .or_else(|| match Value::from(value.clone()) {
                Value::I64(v) => Some(v),
                Value::I32(v) => Some(Self::from(v)),
                Value::U64(v) => Self::try_from(v).ok(),
                Value::U32(v) => Some(Self::from(v)),
                Value::I16(v) => Some(Self::from(v)),
                Value::U16(v) => Some(Self::from(v)),
                Value::F64(v) if v.is_finite() => Some(v as Self),
                _ => None,
            })
    }
}

/// Convenience function to extract a value using the ExtractValue trait
pub fn extract<T: ExtractValue>(value: &OwnedValue) -> Option<T> {
    T::extract(value)
}

/// Extract a string from a D-Bus value.
pub fn extract_string(value: &OwnedValue) -> Option<String> {
    String::extract(value)
}
