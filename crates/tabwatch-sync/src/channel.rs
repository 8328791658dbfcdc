//! Command channel: commands in, acks out, with reconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tabwatch_protocols::{CommandExecutor, PeerCommand, PeerSink, SyncError};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

/// One open connection carrying text frames.
#[async_trait]
pub trait CommandSocket: Send {
    /// Next text frame; `None` once the connection is gone.
    async fn recv(&mut self) -> Option<String>;

    async fn send(&mut self, text: String) -> Result<(), SyncError>;
}

/// Opens command connections.
#[async_trait]
pub trait CommandConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn CommandSocket>, SyncError>;
}

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub reconnect_delay: Duration,
    pub health_interval: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(5000),
            health_interval: Duration::from_secs(10),
        }
    }
}

/// Connection counters, readable while the channel runs.
#[derive(Debug, Default)]
pub struct ChannelStats {
    attempts: AtomicU64,
    connects: AtomicU64,
    disconnects: AtomicU64,
    reconnects_cancelled: AtomicU64,
    connected: AtomicBool,
}

impl ChannelStats {
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Pending reconnects made redundant by an earlier successful connect.
    pub fn reconnects_cancelled(&self) -> u64 {
        self.reconnects_cancelled.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Persistent command connection to the companion app.
///
/// At most one reconnect is ever pending. It is armed when a connection
/// drops or an attempt fails, and disarmed by any successful connect,
/// including one triggered by the health probe.
pub struct CommandChannel {
    connector: Arc<dyn CommandConnector>,
    executor: Arc<dyn CommandExecutor>,
    peer: Arc<dyn PeerSink>,
    settings: ChannelSettings,
    stats: Arc<ChannelStats>,
    socket: Option<Box<dyn CommandSocket>>,
    reconnect_at: Option<Instant>,
}

impl CommandChannel {
    pub fn new(
        connector: Arc<dyn CommandConnector>,
        executor: Arc<dyn CommandExecutor>,
        peer: Arc<dyn PeerSink>,
        settings: ChannelSettings,
    ) -> Self {
        Self {
            connector,
            executor,
            peer,
            settings,
            stats: Arc::new(ChannelStats::default()),
            socket: None,
            reconnect_at: None,
        }
    }

    pub fn stats(&self) -> Arc<ChannelStats> {
        self.stats.clone()
    }

    /// Connect and serve commands until shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "Command channel starting (reconnect: {:?}, health: {:?})",
            self.settings.reconnect_delay, self.settings.health_interval
        );
        self.connect().await;

        let period = self.settings.health_interval;
        let mut health = interval_at(Instant::now() + period, period);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                frame = next_frame(&mut self.socket) => match frame {
                    Some(text) => self.handle_frame(&text).await,
                    None => self.disconnected("connection closed"),
                },
                _ = reconnect_due(self.reconnect_at) => {
                    self.reconnect_at = None;
                    debug!("Reconnecting command channel");
                    self.connect().await;
                }
                _ = health.tick() => {
                    if self.socket.is_none() && self.peer.health().await {
                        debug!("Peer is alive, connecting command channel");
                        self.connect().await;
                    }
                }
            }
        }

        self.socket = None;
        self.stats.connected.store(false, Ordering::SeqCst);
        info!("Command channel stopped");
    }

    async fn connect(&mut self) {
        self.stats.attempts.fetch_add(1, Ordering::SeqCst);
        match self.connector.connect().await {
            Ok(socket) => {
                self.socket = Some(socket);
                self.stats.connects.fetch_add(1, Ordering::SeqCst);
                self.stats.connected.store(true, Ordering::SeqCst);
                if self.reconnect_at.take().is_some() {
                    self.stats.reconnects_cancelled.fetch_add(1, Ordering::SeqCst);
                }
                info!("Command channel connected");
            }
            Err(e) => {
                warn!("Command channel connect failed: {}", e);
                self.schedule_reconnect();
            }
        }
    }

    fn disconnected(&mut self, reason: &str) {
        warn!("Command channel disconnected: {}", reason);
        self.socket = None;
        self.stats.connected.store(false, Ordering::SeqCst);
        self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect_at.is_some() {
            return;
        }
        self.reconnect_at = Some(Instant::now() + self.settings.reconnect_delay);
    }

    async fn handle_frame(&mut self, text: &str) {
        let command: PeerCommand = match text.parse() {
            Ok(command) => command,
            Err(e) => {
                warn!("Ignoring command frame: {}", e);
                return;
            }
        };

        debug!("Received command {:?}", command);
        let ack = self.executor.execute(command).await;
        let Some(socket) = self.socket.as_mut() else {
            return;
        };
        if let Err(e) = socket.send(ack.to_string()).await {
            self.disconnected(&e.to_string());
        }
    }
}

async fn next_frame(socket: &mut Option<Box<dyn CommandSocket>>) -> Option<String> {
    match socket {
        Some(socket) => socket.recv().await,
        None => std::future::pending().await,
    }
}

async fn reconnect_due(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
