//! Plaintext monitoring listener.
//!
//! Each accepted TCP connection receives one snapshot of the client registry
//! and is closed. Nothing is read from the monitoring client.

use crate::registry::{ClientRecord, ClientRegistry};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const GREETING: &str = "objproxy stats server\n";
pub const HEADER: &str = "Client id | Optype | External Path\n";

fn render_record(out: &mut String, record: &ClientRecord) -> std::fmt::Result {
    writeln!(
        out,
        "{} | {} | {}",
        record.id, record.op_type, record.external_path
    )
}

/// Render the greeting, header and one line per live client.
pub fn render_snapshot(registry: &ClientRegistry) -> String {
    let mut out = String::with_capacity(GREETING.len() + HEADER.len() + 64 * registry.len());
    out.push_str(GREETING);
    out.push_str(HEADER);
    // Writing into a String cannot fail.
    let _ = registry.for_each(|record| render_record(&mut out, record));
    out
}

/// Accept monitoring connections until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted monitoring connection");
                        let registry = registry.clone();
                        tokio::spawn(async move {
                            if let Err(e) = write_snapshot(stream, &registry).await {
                                debug!(%peer, error = %e, "failed to write monitoring snapshot");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "monitoring accept error");
                    }
                }
            }
            _ = shutdown.cancelled() => {
                info!("Monitoring listener stopped");
                break;
            }
        }
    }
}

async fn write_snapshot(mut stream: TcpStream, registry: &ClientRegistry) -> std::io::Result<()> {
    let snapshot = render_snapshot(registry);
    stream.write_all(snapshot.as_bytes()).await?;
    stream.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OpType;
    use objproxy_protocol::MessageType;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_empty_snapshot_has_greeting_and_header() {
        let registry = ClientRegistry::new();
        assert_eq!(render_snapshot(&registry), format!("{}{}", GREETING, HEADER));
    }

    #[test]
    fn test_snapshot_lists_every_client() {
        let registry = ClientRegistry::new();
        let busy = registry.register();
        busy.set_operation(OpType::Request(MessageType::Cat), "backup/chunk1");
        let idle = registry.register();

        let snapshot = render_snapshot(&registry);
        let lines: Vec<&str> = snapshot.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], HEADER.trim_end());
        assert!(lines.contains(&format!("{} | CAT | backup/chunk1", busy.id()).as_str()));
        assert!(lines.contains(&format!("{} | IDLE | ", idle.id()).as_str()));
    }

    #[tokio::test]
    async fn test_serve_writes_snapshot_and_closes() {
        let registry = Arc::new(ClientRegistry::new());
        for name in ["a", "b", "c"] {
            registry
                .register()
                .set_operation(OpType::Request(MessageType::Cat), name);
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(serve(listener, registry.clone(), shutdown.clone()));

        let mut conn = TcpStream::connect(addr).await.unwrap();
        let mut response = String::new();
        conn.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with(GREETING));
        assert_eq!(response.lines().count(), 2 + 3);

        shutdown.cancel();
        task.await.unwrap();
    }
}
