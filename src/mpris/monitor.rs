//! MPRIS event loop

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use zbus::message::Type as MessageType;
use zbus::zvariant::OwnedValue;
use zbus::{Connection, MatchRule, MessageStream};

use crate::config::{Config, PlayerConfig};
use crate::engine::{Engine, Notified, PositionSource};
use crate::error::Result;
use crate::scrobbler::ScrobbleService;
use crate::track::ArtistNormalizer;
use crate::types::SessionId;

use super::{
    notification_from_changes, player_id, BusPositions, PlayerDirectory, MPRIS_PATH,
    MPRIS_PLAYER_IFACE, PROPERTIES_IFACE,
};

/// How often the loop checks the stop flag while idle
const STOP_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Stops a running [`MprisMonitor`] from another task
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Feeds bus signals and poll ticks into the engine, one at a time
pub struct MprisMonitor<S> {
    connection: Connection,
    engine: Engine<S>,
    directory: PlayerDirectory,
    positions: BusPositions,
    player_config: PlayerConfig,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
}

impl<S: ScrobbleService> MprisMonitor<S> {
    /// Connect to the session bus
    pub async fn new(service: S, config: &Config) -> Result<Self> {
        let connection = Connection::session().await?;
        let timeout = config.tracking.dbus_timeout();

        Ok(Self {
            directory: PlayerDirectory::new(connection.clone(), timeout),
            positions: BusPositions::new(connection.clone(), timeout),
            connection,
            engine: Engine::new(
                service,
                ArtistNormalizer::new(config.tracking.artists_with_commas.clone()),
            ),
            player_config: config.players.clone(),
            poll_interval: config.tracking.poll_interval(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    /// Run until stopped or the bus connection closes
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting MPRIS monitor...");

        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .interface(PROPERTIES_IFACE)?
            .member("PropertiesChanged")?
            .path(MPRIS_PATH)?
            .build();
        let mut stream = MessageStream::for_match_rule(rule, &self.connection, Some(100)).await?;

        // Subscribe before discovery so no change slips through in between
        self.discover_players().await;

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                msg = stream.next() => match msg {
                    Some(Ok(msg)) => self.handle_message(&msg).await,
                    Some(Err(e)) => warn!("D-Bus stream error: {}", e),
                    None => {
                        warn!("D-Bus message stream closed");
                        break;
                    }
                },
                _ = ticker.tick() => self.tick().await,
                () = tokio::time::sleep(STOP_CHECK_INTERVAL) => {}
            }
        }

        info!("MPRIS monitor stopped");
        Ok(())
    }

    /// Feed players that were already running into the engine
    async fn discover_players(&mut self) {
        let players = match self.directory.list_players().await {
            Ok(players) => players,
            Err(e) => {
                warn!("Failed to list players: {}", e);
                return;
            }
        };

        for (name, owner) in players {
            if !self.player_config.should_track(player_id(&name)) {
                debug!("Ignoring player {}", name);
                continue;
            }
            self.directory.remember(&owner, &name);

            let changed = match self.positions.snapshot(&name).await {
                Ok(changed) => changed,
                Err(e) => {
                    warn!("Failed to read state of {}: {}", name, e);
                    continue;
                }
            };

            if let Err(e) = self
                .handle_changes(owner.clone(), MPRIS_PLAYER_IFACE.to_string(), &changed)
                .await
            {
                warn!("Failed to add player {}: {}", name, e);
                continue;
            }

            // Progress made before startup is not ours to count
            match self.positions.position(&owner).await {
                Ok(position) => self.engine.resync(&owner, position),
                Err(e) => debug!("No position for {}: {}", name, e),
            }
        }
    }

    /// Handle a `PropertiesChanged` signal
    async fn handle_message(&mut self, msg: &zbus::Message) {
        let header = msg.header();
        let Some(sender) = header.sender().map(|s| SessionId::new(s.as_str())) else {
            return;
        };

        let body = msg
            .body()
            .deserialize::<(String, HashMap<String, OwnedValue>, Vec<String>)>();
        let (iface, changed, _invalidated) = match body {
            Ok(body) => body,
            Err(e) => {
                debug!("Malformed PropertiesChanged from {}: {}", sender, e);
                return;
            }
        };

        if let Err(e) = self.handle_changes(sender.clone(), iface, &changed).await {
            warn!("Error handling PropertiesChanged from {}: {}", sender, e);
        }
    }

    async fn handle_changes(
        &mut self,
        sender: SessionId,
        iface: String,
        changed: &HashMap<String, OwnedValue>,
    ) -> Result<()> {
        if iface != MPRIS_PLAYER_IFACE {
            return Ok(());
        }

        let name = self.directory.resolve(&sender).await?;
        let player = player_id(&name);
        if !self.player_config.should_track(player) {
            return Ok(());
        }

        if !self.engine.registry().contains(&sender) {
            info!("Detected player: {} ({})", player, sender);
        }

        let notification = notification_from_changes(sender, iface, changed)?;
        match self
            .engine
            .handle_notification(&notification, Utc::now().timestamp())
            .await?
        {
            Notified::Ignored => debug!("Ignored notification from {}", player),
            Notified::Applied { .. } => {}
        }

        Ok(())
    }

    /// One poll tick
    async fn tick(&mut self) {
        let report = self.engine.poll(&self.positions).await;

        for id in &report.evicted {
            self.directory.forget(id);
        }

        debug!(
            "Tick: {} polled, {} evicted, {} scrobbled, {} sessions",
            report.polled,
            report.evicted.len(),
            report.scrobbled.len(),
            self.engine.registry().len()
        );
    }
}
