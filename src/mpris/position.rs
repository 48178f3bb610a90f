//! Position and property queries against player objects

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use zbus::fdo::PropertiesProxy;
use zbus::names::InterfaceName;
use zbus::zvariant::OwnedValue;
use zbus::Connection;

use crate::engine::PositionSource;
use crate::error::{Error, Result};
use crate::types::{Microseconds, SessionId};

use super::{extract, with_timeout, MPRIS_PATH, MPRIS_PLAYER_IFACE};

/// Reads player properties over the session bus
#[derive(Clone)]
pub struct BusPositions {
    connection: Connection,
    timeout: Duration,
}

impl BusPositions {
    pub const fn new(connection: Connection, timeout: Duration) -> Self {
        Self {
            connection,
            timeout,
        }
    }

    /// Read one `org.mpris.MediaPlayer2.Player` property from `destination`
    pub async fn get_property(&self, destination: &str, property: &str) -> Result<OwnedValue> {
        let proxy = with_timeout(self.timeout, "properties proxy", async {
            PropertiesProxy::builder(&self.connection)
                .destination(destination)?
                .path(MPRIS_PATH)?
                .build()
                .await
        })
        .await?;

        let iface = InterfaceName::try_from(MPRIS_PLAYER_IFACE)
            .map_err(|e| Error::InvalidMetadata(e.to_string()))?;

        with_timeout(self.timeout, property, proxy.get(iface, property)).await
    }

    /// Current `Metadata` and `PlaybackStatus` of a player, as a
    /// `PropertiesChanged`-style map
    pub async fn snapshot(&self, destination: &str) -> Result<HashMap<String, OwnedValue>> {
        let mut changed = HashMap::new();
        changed.insert(
            "Metadata".to_string(),
            self.get_property(destination, "Metadata").await?,
        );
        changed.insert(
            "PlaybackStatus".to_string(),
            self.get_property(destination, "PlaybackStatus").await?,
        );
        Ok(changed)
    }
}

#[async_trait]
impl PositionSource for BusPositions {
    async fn position(&self, session: &SessionId) -> Result<Microseconds> {
        let value = self.get_property(session.as_str(), "Position").await?;
        extract::<i64>(&value)
            .map(Microseconds::new)
            .ok_or_else(|| Error::InvalidMetadata("Position is not an integer".into()))
    }
}
