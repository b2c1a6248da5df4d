//! Shared harness for daemon integration tests.

#![allow(dead_code)]

use objproxy_client::ObjectClient;
use objproxy_daemon::{
    ClientRegistry, Daemon, Dispatcher, LifecycleEvent, MemoryStorage, Notifier, ServerConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A daemon serving on a socket inside its own temporary directory.
pub struct TestDaemon {
    pub socket_path: PathBuf,
    pub monitor_addr: Option<SocketAddr>,
    pub registry: Arc<ClientRegistry>,
    events: mpsc::Sender<LifecycleEvent>,
    task: JoinHandle<anyhow::Result<()>>,
    _tmp: TempDir,
}

impl TestDaemon {
    pub async fn start(storage: MemoryStorage) -> Self {
        Self::start_with(Dispatcher::new(Arc::new(storage))).await
    }

    pub async fn start_with(dispatcher: Dispatcher) -> Self {
        let tmp = TempDir::new().unwrap();
        let config = ServerConfig {
            socket_path: tmp.path().join("objproxy.sock"),
            monitor_addr: Some("127.0.0.1:0".parse().unwrap()),
            heartbeat_interval: Duration::from_secs(5),
        };
        let daemon = Daemon::bind(config, dispatcher, Notifier::disabled())
            .await
            .unwrap();
        Self::spawn(daemon, tmp)
    }

    /// Run an already-bound daemon; `tmp` is kept alive with it.
    pub fn spawn(daemon: Daemon, tmp: TempDir) -> Self {
        let socket_path = daemon.socket_path().to_path_buf();
        let monitor_addr = daemon.monitor_addr();
        let registry = daemon.registry();
        let events = daemon.event_sender();
        let task = tokio::spawn(async move { daemon.run().await });

        Self {
            socket_path,
            monitor_addr,
            registry,
            events,
            task,
            _tmp: tmp,
        }
    }

    pub fn client(&self) -> ObjectClient {
        ObjectClient::connect_to(&self.socket_path)
    }

    pub async fn send(&self, event: LifecycleEvent) {
        self.events.send(event).await.unwrap();
    }

    /// Read one monitoring snapshot.
    pub async fn monitor_snapshot(&self) -> String {
        let addr = self.monitor_addr.expect("monitoring listener bound");
        let mut conn = TcpStream::connect(addr).await.unwrap();
        let mut snapshot = String::new();
        conn.read_to_string(&mut snapshot).await.unwrap();
        snapshot
    }

    /// Wait until exactly `count` clients are registered.
    pub async fn wait_for_clients(&self, count: usize) {
        for _ in 0..200 {
            if self.registry.len() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} live clients, registry has {}",
            count,
            self.registry.len()
        );
    }

    /// Request shutdown and wait for `run` to return.
    pub async fn shutdown(&mut self) {
        self.send(LifecycleEvent::Shutdown).await;
        tokio::time::timeout(Duration::from_secs(5), &mut self.task)
            .await
            .expect("daemon did not stop")
            .unwrap()
            .unwrap();
    }
}
