//! Sender to player name resolution

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;
use zbus::fdo::DBusProxy;
use zbus::names::BusName;
use zbus::Connection;

use crate::error::{Error, Result};
use crate::types::SessionId;

use super::{with_timeout, MPRIS_PREFIX};

/// Maps unique bus names (e.g. `:1.500`) to the well-known MPRIS name of the
/// player that owns them (e.g. `org.mpris.MediaPlayer2.vlc`).
///
/// Lookups are cached; entries are dropped with [`forget`](Self::forget) when
/// the session goes away.
pub struct PlayerDirectory {
    connection: Connection,
    timeout: Duration,
    names: HashMap<SessionId, String>,
}

impl PlayerDirectory {
    pub fn new(connection: Connection, timeout: Duration) -> Self {
        Self {
            connection,
            timeout,
            names: HashMap::new(),
        }
    }

    /// Well-known name of the player behind `sender`
    pub async fn resolve(&mut self, sender: &SessionId) -> Result<String> {
        if let Some(name) = self.names.get(sender) {
            return Ok(name.clone());
        }

        for (name, owner) in self.list_players().await? {
            if owner == *sender {
                debug!("Resolved {} to {}", sender, name);
                self.names.insert(sender.clone(), name.clone());
                return Ok(name);
            }
        }

        Err(Error::other(format!("{sender} does not own an MPRIS name")))
    }

    /// Cache a name learned elsewhere (startup discovery)
    pub fn remember(&mut self, sender: &SessionId, name: &str) {
        self.names.insert(sender.clone(), name.to_string());
    }

    /// Drop the cached name of an evicted session
    pub fn forget(&mut self, sender: &SessionId) {
        self.names.remove(sender);
    }

    /// All MPRIS players currently on the bus, with their unique owner
    pub async fn list_players(&self) -> Result<Vec<(String, SessionId)>> {
        let dbus = DBusProxy::new(&self.connection).await?;
        let names = with_timeout(self.timeout, "ListNames", dbus.list_names()).await?;

        let mut players = Vec::new();
        for name in names {
            let name_str = name.as_str();
            if !name_str.starts_with(MPRIS_PREFIX) {
                continue;
            }

            let bus_name = BusName::try_from(name_str)
                .map_err(|e| Error::other(format!("Invalid bus name: {e}")))?;

            // The player may exit between ListNames and GetNameOwner
            match with_timeout(self.timeout, "GetNameOwner", dbus.get_name_owner(bus_name)).await {
                Ok(owner) => players.push((name_str.to_string(), SessionId::new(owner.as_str()))),
                Err(e) => debug!("Skipping {}: {}", name_str, e),
            }
        }

        Ok(players)
    }
}
