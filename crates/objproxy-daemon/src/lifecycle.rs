//! Process lifecycle events.
//!
//! OS signals are translated into [`LifecycleEvent`]s on an mpsc channel so
//! the daemon only ever sees typed events and tests can inject them
//! directly.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Stop accepting connections and exit.
    Shutdown,
    /// Reopen the log file.
    RotateLog,
    /// Reload configuration. Accepted and ignored.
    Reload,
}

/// Map OS signals onto lifecycle events.
///
/// SIGINT, SIGTERM and SIGUSR2 request shutdown, SIGUSR1 rotates the log and
/// SIGHUP is a reload. The task ends when the receiving side is dropped.
pub fn spawn_signal_listener(
    tx: mpsc::Sender<LifecycleEvent>,
) -> std::io::Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    let mut sigusr2 = signal(SignalKind::user_defined2())?;
    let mut sighup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            let (name, event) = tokio::select! {
                _ = sigint.recv() => ("SIGINT", LifecycleEvent::Shutdown),
                _ = sigterm.recv() => ("SIGTERM", LifecycleEvent::Shutdown),
                _ = sigusr2.recv() => ("SIGUSR2", LifecycleEvent::Shutdown),
                _ = sigusr1.recv() => ("SIGUSR1", LifecycleEvent::RotateLog),
                _ = sighup.recv() => ("SIGHUP", LifecycleEvent::Reload),
            };
            debug!(signal = name, ?event, "signal received");
            if tx.send(event).await.is_err() {
                break;
            }
        }
    }))
}

/// Handle lifecycle events until shutdown is requested.
///
/// A closed channel counts as a shutdown request.
pub async fn run_until_shutdown<F>(rx: &mut mpsc::Receiver<LifecycleEvent>, mut rotate_log: F)
where
    F: FnMut(),
{
    loop {
        match rx.recv().await {
            Some(LifecycleEvent::Shutdown) => {
                info!("Shutdown requested");
                return;
            }
            Some(LifecycleEvent::RotateLog) => {
                info!("Reopening log file");
                rotate_log();
            }
            Some(LifecycleEvent::Reload) => {
                info!("Reload requested; configuration reload is not supported");
            }
            None => {
                warn!("Lifecycle channel closed, shutting down");
                return;
            }
        }
    }
}
