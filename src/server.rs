//! Wiring for `tabwatch run`.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use tabwatch_config::{Config, ConfigLoader};
use tabwatch_core::{
    DeliveryMetrics, FileStateStore, PeerRelay, RuntimeSettings, SystemClock, Tracker,
    TrackerRuntime, TrackerSettings,
};
use tabwatch_host_cdp::{CdpHostSettings, CdpTabHost, TabWatcher};
use tabwatch_sync::{ChannelSettings, CommandChannel, HttpPeer, TungsteniteConnector};

use crate::control::{self, ControlState};

/// Run the tracker in foreground until Ctrl-C.
pub(crate) async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting tabwatch v{}", env!("CARGO_PKG_VERSION"));

    let state_path = ConfigLoader::expand_path(&config.store.path);
    let store = Arc::new(FileStateStore::open(&state_path).await?);
    info!("State file: {}", state_path);

    let peer = Arc::new(HttpPeer::new(
        config.peer.base_url.as_str(),
        config.peer.request_timeout(),
    )?);
    let delivery = Arc::new(DeliveryMetrics::new());
    let relay = PeerRelay::new(peer.clone(), delivery.clone());
    info!("Companion app at {}", peer.base_url());

    let host = Arc::new(CdpTabHost::new(CdpHostSettings {
        endpoint: config.host.cdp_endpoint.clone(),
        screenshot_quality: config.host.screenshot_quality,
    }));

    let (tracker, due_rx) = Tracker::new(
        store,
        host.clone(),
        relay,
        Arc::new(SystemClock),
        TrackerSettings {
            dwell_threshold: config.tracker.dwell_threshold(),
            description_max_words: config.tracker.description_max_words,
        },
    );
    let (runtime, handle) = TrackerRuntime::new(
        tracker,
        due_rx,
        RuntimeSettings {
            flush_interval: config.tracker.flush_interval(),
            resync_interval: config.tracker.resync_interval(),
            resync_on_start: true,
        },
    );
    let runtime_task = tokio::spawn(runtime.run());

    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let channel = CommandChannel::new(
        Arc::new(TungsteniteConnector::new(config.peer.ws_url.as_str())),
        Arc::new(handle.clone()),
        peer.clone(),
        ChannelSettings {
            reconnect_delay: config.peer.reconnect_delay(),
            health_interval: config.peer.health_interval(),
        },
    );
    let channel_stats = channel.stats();
    let channel_task = tokio::spawn(channel.run(shutdown_tx.subscribe()));

    let watcher = TabWatcher::new(host.clone(), config.host.poll_interval());
    let signals = handle.clone();
    let watcher_task = tokio::spawn(watcher.run(
        move |signal| signals.signal(signal),
        shutdown_tx.subscribe(),
    ));

    let control_task = if config.control.enabled {
        let state = Arc::new(ControlState {
            tracker: Arc::new(handle.clone()),
            peer: peer.clone(),
            channel: channel_stats,
            delivery,
        });
        let shutdown = shutdown_tx.subscribe();
        let control_config = config.control.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = control::serve(control_config, state, shutdown).await {
                error!("Control API failed: {}", e);
            }
        }))
    } else {
        info!("Control API disabled");
        None
    };

    info!("Tabwatch running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    let _ = shutdown_tx.send(());
    handle.shutdown();

    for (name, task) in [
        ("command channel", channel_task),
        ("tab watcher", watcher_task),
        ("tracker runtime", runtime_task),
    ] {
        if let Err(e) = task.await {
            warn!("{} task ended abnormally: {}", name, e);
        }
    }
    if let Some(task) = control_task {
        if let Err(e) = task.await {
            warn!("control API task ended abnormally: {}", e);
        }
    }

    info!("Tabwatch stopped");
    Ok(())
}
