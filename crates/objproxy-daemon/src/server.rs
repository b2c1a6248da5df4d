//! Daemon orchestrator: listeners, per-connection tasks, lifecycle.

use crate::crypto::SealedStreamDecrypter;
use crate::dispatcher::Dispatcher;
use crate::lifecycle::{self, LifecycleEvent};
use crate::logging::LogHandle;
use crate::monitor;
use crate::notifier::Notifier;
use crate::registry::{ClientRegistry, ConnectedClient};
use crate::storage;
use anyhow::{Context, Result};
use objproxy_config::Config;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Listener settings for [`Daemon::bind`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    /// `None` runs without a monitoring listener.
    pub monitor_addr: Option<SocketAddr>,
    pub heartbeat_interval: Duration,
}

impl ServerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            socket_path: config.daemon.socket_path.clone(),
            monitor_addr: Some(SocketAddr::from(([127, 0, 0, 1], config.daemon.stat_port))),
            heartbeat_interval: config.supervisor.heartbeat_interval(),
        }
    }
}

pub struct Daemon {
    listener: UnixListener,
    monitor: Option<TcpListener>,
    socket_path: PathBuf,
    registry: Arc<ClientRegistry>,
    dispatcher: Arc<Dispatcher>,
    notifier: Arc<Notifier>,
    heartbeat_interval: Duration,
    events_tx: mpsc::Sender<LifecycleEvent>,
    events_rx: mpsc::Receiver<LifecycleEvent>,
    log: LogHandle,
}

impl Daemon {
    /// Bind the object socket and, when configured, the monitoring listener.
    ///
    /// A stale socket file is replaced. Failing to bind the monitoring
    /// listener only disables monitoring.
    pub async fn bind(config: ServerConfig, dispatcher: Dispatcher, notifier: Notifier) -> Result<Self> {
        let path = &config.socket_path;

        // Remove stale socket
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to remove stale socket {}", path.display()))?;
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create socket directory {}", parent.display()))?;
        }

        let listener = UnixListener::bind(path)
            .with_context(|| format!("failed to bind {}", path.display()))?;

        let monitor = match config.monitor_addr {
            Some(addr) => match TcpListener::bind(addr).await {
                Ok(monitor) => Some(monitor),
                Err(e) => {
                    warn!(%addr, error = %e, "Failed to bind monitoring listener, monitoring disabled");
                    None
                }
            },
            None => None,
        };

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        info!("Daemon listening on {:?}", path);
        Ok(Self {
            listener,
            monitor,
            socket_path: config.socket_path,
            registry: Arc::new(ClientRegistry::new()),
            dispatcher: Arc::new(dispatcher),
            notifier: Arc::new(notifier),
            heartbeat_interval: config.heartbeat_interval,
            events_tx,
            events_rx,
            log: LogHandle::default(),
        })
    }

    /// Build collaborators from configuration and bind.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let storage = storage::from_config(&config.storage)
            .await
            .context("failed to initialize storage")?;

        let mut dispatcher = Dispatcher::new(storage);
        if let Some(key_path) = &config.crypto.key_path {
            let decrypter = SealedStreamDecrypter::from_key_file(key_path)
                .context("failed to initialize decryption")?;
            dispatcher = dispatcher.with_decrypter(Arc::new(decrypter));
            info!("Object decryption enabled");
        }

        let notifier = Notifier::from_config(&config.supervisor)
            .context("failed to connect to supervisor notify socket")?;

        Self::bind(ServerConfig::from_config(config), dispatcher, notifier).await
    }

    /// Reopen this log sink on rotation requests.
    pub fn with_log_handle(mut self, log: LogHandle) -> Self {
        self.log = log;
        self
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        self.registry.clone()
    }

    /// Sender for lifecycle events, used by the signal boundary and tests.
    pub fn event_sender(&self) -> mpsc::Sender<LifecycleEvent> {
        self.events_tx.clone()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn monitor_addr(&self) -> Option<SocketAddr> {
        self.monitor.as_ref().and_then(|m| m.local_addr().ok())
    }

    /// Serve until a shutdown event arrives.
    ///
    /// On shutdown the socket file is removed and in-flight connection tasks
    /// are left to finish on their own.
    pub async fn run(self) -> Result<()> {
        let Daemon {
            listener,
            monitor,
            socket_path,
            registry,
            dispatcher,
            notifier,
            heartbeat_interval,
            events_tx,
            mut events_rx,
            log,
        } = self;
        // Held so the event channel only closes once `run` returns.
        let _events_tx = events_tx;

        let shutdown = CancellationToken::new();

        if let Err(e) = notifier.ready() {
            warn!(error = %e, "Failed to send readiness notification");
        }

        let lifecycle_task = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                lifecycle::run_until_shutdown(&mut events_rx, || {
                    if let Err(e) = log.reopen() {
                        error!(error = %e, "Failed to reopen log file");
                    }
                })
                .await;
                shutdown.cancel();
            })
        };

        let heartbeat_task = tokio::spawn(heartbeat(
            notifier.clone(),
            heartbeat_interval,
            shutdown.clone(),
        ));

        if let Some(monitor) = monitor {
            tokio::spawn(monitor::serve(monitor, registry.clone(), shutdown.clone()));
        }

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let client = registry.register();
                            let registry = registry.clone();
                            let dispatcher = dispatcher.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, client, &registry, &dispatcher).await;
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept error");
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        drop(listener);
        objproxy_protocol::remove_socket(&socket_path);

        if let Err(e) = notifier.stopping() {
            debug!(error = %e, "Failed to send stopping notification");
        }

        if let Err(e) = heartbeat_task.await {
            warn!("Heartbeat task panicked: {}", e);
        }
        if let Err(e) = lifecycle_task.await {
            warn!("Lifecycle task panicked: {}", e);
        }

        info!(live_clients = registry.len(), "Daemon stopped");
        Ok(())
    }
}

/// Serve one connection and drop its registry entry.
async fn handle_connection(
    mut stream: UnixStream,
    client: Arc<ConnectedClient>,
    registry: &ClientRegistry,
    dispatcher: &Dispatcher,
) {
    let id = client.id();
    debug!(client_id = %id, "accepted client connection");

    if let Err(e) = dispatcher.serve(&mut stream, &client).await {
        let record = client.record();
        warn!(
            client_id = %id,
            op = %record.op_type,
            path = %record.external_path,
            error = %e,
            "Client request failed"
        );
    }

    if registry.remove(id).is_none() {
        error!(client_id = %id, "Client missing from registry on disconnect");
    }
}

async fn heartbeat(notifier: Arc<Notifier>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; readiness was just reported.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = notifier.watchdog() {
                    warn!(error = %e, "Failed to send watchdog notification");
                }
            }
            _ = shutdown.cancelled() => break,
        }
    }
}
