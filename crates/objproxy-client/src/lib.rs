//! objproxy client
//!
//! Sends one request per connection to the daemon's object socket and
//! streams the answer back. The daemon does not frame responses, so a
//! failed request is recognised by its fixed text prefix.

use objproxy_protocol::{CatRequest, FAILURE_PREFIX, WRONG_REQUEST_TYPE};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Request(String),

    #[error("daemon rejected the request type")]
    WrongRequestType,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Client bound to one daemon socket path.
#[derive(Debug, Clone)]
pub struct ObjectClient {
    socket_path: PathBuf,
}

impl ObjectClient {
    /// Client for the default socket path
    pub fn new() -> Self {
        Self::connect_to(&objproxy_protocol::socket_path())
    }

    pub fn connect_to(path: &Path) -> Self {
        Self {
            socket_path: path.to_path_buf(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn connect(&self) -> ClientResult<UnixStream> {
        UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| ClientError::Connect {
                path: self.socket_path.clone(),
                source,
            })
    }

    /// Fetch object `name` into `out`, returning the number of bytes written.
    pub async fn cat<W>(&self, name: &str, out: &mut W) -> ClientResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut stream = self.connect().await?;
        debug!(name, socket = %self.socket_path.display(), "sending cat request");
        stream.write_all(&CatRequest::new(name).encode()).await?;
        read_response(&mut stream, out).await
    }

    /// Fetch object `name` into memory.
    pub async fn cat_to_vec(&self, name: &str) -> ClientResult<Vec<u8>> {
        let mut out = Vec::new();
        self.cat(name, &mut out).await?;
        Ok(out)
    }

    /// Send pre-encoded bytes and return the raw response.
    pub async fn send_raw(&self, request: &[u8]) -> ClientResult<Vec<u8>> {
        let mut stream = self.connect().await?;
        stream.write_all(request).await?;
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok(response)
    }
}

impl Default for ObjectClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy a daemon response into `out`, turning failure text into errors.
///
/// Only the leading bytes are inspected; the rest of a successful response
/// is streamed without buffering.
pub async fn read_response<R, W>(reader: &mut R, out: &mut W) -> ClientResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let probe_len = FAILURE_PREFIX.len().max(WRONG_REQUEST_TYPE.len());
    let mut head = vec![0u8; probe_len];
    let mut filled = 0;
    while filled < probe_len {
        let n = reader.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    head.truncate(filled);

    if head.starts_with(FAILURE_PREFIX.as_bytes()) {
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await?;
        head.extend_from_slice(&rest);
        let message = String::from_utf8_lossy(&head[FAILURE_PREFIX.len()..]).into_owned();
        return Err(ClientError::Request(message));
    }
    if head == WRONG_REQUEST_TYPE.as_bytes() {
        return Err(ClientError::WrongRequestType);
    }

    out.write_all(&head).await?;
    let copied = tokio::io::copy(reader, out).await?;
    out.flush().await?;
    Ok(filled as u64 + copied)
}
