//! Per-connection request handling.
//!
//! One connection carries exactly one request frame. The dispatcher reads
//! it, routes on the message type, streams the answer and returns; registry
//! bookkeeping stays with the caller.

use crate::crypto::Decrypter;
use crate::registry::{ConnectedClient, OpType};
use crate::storage::{StorageError, StorageReader};
use objproxy_protocol::{
    read_frame, CatRequest, MessageType, ProtocolError, Request, FAILURE_PREFIX,
    WRONG_REQUEST_TYPE,
};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to stream object {name}: {source}")]
    Stream {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Serves single-request connections against the storage and crypto
/// collaborators.
#[derive(Clone)]
pub struct Dispatcher {
    storage: Arc<dyn StorageReader>,
    decrypter: Option<Arc<dyn Decrypter>>,
}

impl Dispatcher {
    pub fn new(storage: Arc<dyn StorageReader>) -> Self {
        Self {
            storage,
            decrypter: None,
        }
    }

    /// Decrypt every object on its way to the client.
    pub fn with_decrypter(mut self, decrypter: Arc<dyn Decrypter>) -> Self {
        self.decrypter = Some(decrypter);
        self
    }

    pub fn decrypts(&self) -> bool {
        self.decrypter.is_some()
    }

    /// Read one request from `conn` and answer it.
    ///
    /// - Malformed frame: nothing is written, the error is returned.
    /// - Unknown message type: the fixed rejection is written, `Ok(())`.
    /// - Storage failure: a readable failure line is written, the error is
    ///   returned.
    pub async fn serve<S>(&self, conn: &mut S, client: &ConnectedClient) -> DispatchResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + ?Sized,
    {
        let frame = match read_frame(conn).await {
            Ok(frame) => frame,
            Err(e) => {
                debug!(client_id = %client.id(), error = %e, "failed to read request frame");
                return Err(e.into());
            }
        };

        match Request::from_frame(&frame) {
            Request::Cat(request) => {
                debug!(client_id = %client.id(), msg_type = %MessageType::Cat, "received client request");
                client.set_operation(OpType::Request(MessageType::Cat), request.name.clone());
                self.serve_cat(conn, client, request).await
            }
            Request::Unsupported(tag) => {
                debug!(client_id = %client.id(), tag, "rejecting unsupported request type");
                client.set_operation(OpType::Unsupported(tag), String::new());
                conn.write_all(WRONG_REQUEST_TYPE.as_bytes()).await?;
                conn.shutdown().await?;
                Ok(())
            }
        }
    }

    async fn serve_cat<S>(
        &self,
        conn: &mut S,
        client: &ConnectedClient,
        request: CatRequest,
    ) -> DispatchResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + ?Sized,
    {
        debug!(client_id = %client.id(), path = %request.name, "cat object");

        let reader = match self.storage.open_object(&request.name).await {
            Ok(reader) => reader,
            Err(e) => {
                let message = format!("{}{}", FAILURE_PREFIX, e);
                // Best effort; the storage error is what the caller needs.
                let _ = conn.write_all(message.as_bytes()).await;
                let _ = conn.shutdown().await;
                return Err(e.into());
            }
        };

        let mut reader = match &self.decrypter {
            Some(decrypter) => decrypter.decrypt(reader),
            None => reader,
        };

        let copied = tokio::io::copy(&mut reader, conn)
            .await
            .map_err(|source| DispatchError::Stream {
                name: request.name.clone(),
                source,
            })?;
        conn.shutdown().await?;

        debug!(client_id = %client.id(), path = %request.name, bytes = copied, "object streamed");
        Ok(())
    }
}
