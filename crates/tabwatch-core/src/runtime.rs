//! The tracker task.
//!
//! [`TrackerRuntime`] owns the [`Tracker`] and drains one inbox: host
//! signals, peer commands, control requests, dwell notices and the flush
//! and resync timers. Each message runs to completion before the next one
//! is looked at, so state transitions never interleave.

use std::time::Duration;

use async_trait::async_trait;
use tabwatch_protocols::{CommandAck, CommandExecutor, PeerCommand, TabId, TabSignal};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::tracker::{Tracker, TrackerStatus};
use crate::tracker_capture::CaptureOutcome;
use crate::tracker_resync::ResyncSummary;

/// The tracker task has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Tracker runtime is not running")]
pub struct RuntimeStopped;

/// Timer configuration for the runtime loop.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub flush_interval: Duration,
    /// `None` disables periodic resync.
    pub resync_interval: Option<Duration>,
    pub resync_on_start: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(10),
            resync_interval: Some(Duration::from_secs(300)),
            resync_on_start: true,
        }
    }
}

enum TrackerMessage {
    Signal(TabSignal),
    Command(PeerCommand, oneshot::Sender<CommandAck>),
    CaptureActive(oneshot::Sender<Option<CaptureOutcome>>),
    Resync(oneshot::Sender<ResyncSummary>),
    Status(oneshot::Sender<TrackerStatus>),
    Shutdown,
}

/// Operations the local control surface needs from the tracker.
#[async_trait]
pub trait TrackerControl: Send + Sync {
    async fn status(&self) -> Result<TrackerStatus, RuntimeStopped>;

    /// Forced capture of the active tab; `None` when no tab is active.
    async fn capture_active(&self) -> Result<Option<CaptureOutcome>, RuntimeStopped>;

    async fn resync(&self) -> Result<ResyncSummary, RuntimeStopped>;
}

/// Cloneable sender side of the runtime.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::UnboundedSender<TrackerMessage>,
}

impl TrackerHandle {
    /// Queue a host signal. Returns `false` once the runtime is gone.
    pub fn signal(&self, signal: TabSignal) -> bool {
        self.tx.send(TrackerMessage::Signal(signal)).is_ok()
    }

    /// Ask the runtime to stop after the messages already queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(TrackerMessage::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> TrackerMessage,
    ) -> Result<T, RuntimeStopped> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(build(reply_tx)).map_err(|_| RuntimeStopped)?;
        reply_rx.await.map_err(|_| RuntimeStopped)
    }
}

#[async_trait]
impl TrackerControl for TrackerHandle {
    async fn status(&self) -> Result<TrackerStatus, RuntimeStopped> {
        self.request(TrackerMessage::Status).await
    }

    async fn capture_active(&self) -> Result<Option<CaptureOutcome>, RuntimeStopped> {
        self.request(TrackerMessage::CaptureActive).await
    }

    async fn resync(&self) -> Result<ResyncSummary, RuntimeStopped> {
        self.request(TrackerMessage::Resync).await
    }
}

#[async_trait]
impl CommandExecutor for TrackerHandle {
    async fn execute(&self, command: PeerCommand) -> CommandAck {
        let fallback = match command {
            PeerCommand::RefreshAll => CommandAck::RefreshAllDone,
            PeerCommand::CloseTab(tab_id) => CommandAck::CloseTabError(tab_id),
        };
        match self
            .request(|reply| TrackerMessage::Command(command, reply))
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                warn!("Command {:?} not executed: {}", command, e);
                fallback
            }
        }
    }
}

pub struct TrackerRuntime {
    tracker: Tracker,
    due_rx: mpsc::UnboundedReceiver<TabId>,
    inbox: mpsc::UnboundedReceiver<TrackerMessage>,
    settings: RuntimeSettings,
}

impl TrackerRuntime {
    pub fn new(
        tracker: Tracker,
        due_rx: mpsc::UnboundedReceiver<TabId>,
        settings: RuntimeSettings,
    ) -> (Self, TrackerHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let runtime = Self {
            tracker,
            due_rx,
            inbox,
            settings,
        };
        (runtime, TrackerHandle { tx })
    }

    /// Run until shutdown is requested or every handle is dropped.
    pub async fn run(self) {
        let Self {
            mut tracker,
            mut due_rx,
            mut inbox,
            settings,
        } = self;

        info!(
            "Tracker runtime started (flush: {:?}, resync: {:?})",
            settings.flush_interval, settings.resync_interval
        );
        tracker.recover().await;
        if settings.resync_on_start {
            tracker.full_resync().await;
        }

        let mut flush = periodic(settings.flush_interval);
        let mut resync = settings.resync_interval.map(periodic);

        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(TrackerMessage::Shutdown) | None => break,
                    Some(message) => handle(&mut tracker, message).await,
                },
                Some(tab_id) = due_rx.recv() => {
                    tracker.on_capture_due(tab_id).await;
                }
                _ = flush.tick() => {
                    tracker.flush().await;
                }
                _ = next_tick(resync.as_mut()) => {
                    debug!("Periodic resync");
                    tracker.full_resync().await;
                }
            }
        }

        tracker.flush().await;
        info!("Tracker runtime stopped");
    }
}

async fn handle(tracker: &mut Tracker, message: TrackerMessage) {
    match message {
        TrackerMessage::Signal(signal) => tracker.dispatch(signal).await,
        TrackerMessage::Command(command, reply) => {
            info!("Executing peer command {:?}", command);
            let _ = reply.send(tracker.execute(command).await);
        }
        TrackerMessage::CaptureActive(reply) => {
            let _ = reply.send(tracker.capture_active().await);
        }
        TrackerMessage::Resync(reply) => {
            let _ = reply.send(tracker.full_resync().await);
        }
        TrackerMessage::Status(reply) => {
            let _ = reply.send(tracker.status().await);
        }
        TrackerMessage::Shutdown => {}
    }
}

fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
