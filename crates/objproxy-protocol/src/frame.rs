//! Length-prefixed frame codec.
//!
//! All multi-byte integers on the wire are big-endian.

use crate::error::{FrameSection, ProtocolError, ProtocolResult};
use crate::message::MessageType;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 8;

/// Largest body a peer may declare (1 MiB).
pub const MAX_FRAME_LEN: u64 = 1 << 20;

/// One decoded request frame.
///
/// `body[0]` is the message type tag and `body[1..]` the operation payload.
/// A decoded frame always has a non-empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    body: Vec<u8>,
}

impl Frame {
    /// Raw message type tag.
    pub fn tag(&self) -> u8 {
        self.body[0]
    }

    /// Known message type, or `None` for a tag this build does not recognize.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.tag()).ok()
    }

    /// Full body including the tag byte.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Operation payload (body without the tag byte).
    pub fn payload(&self) -> &[u8] {
        &self.body[1..]
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Encode a frame from a raw tag byte and payload.
///
/// Used directly only when a caller needs to emit a tag outside
/// [`MessageType`], e.g. to exercise rejection of unknown requests.
pub fn encode_frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let body_len = 1 + payload.len();
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_LEN + body_len);
    buf.extend_from_slice(&(body_len as u64).to_be_bytes());
    buf.push(tag);
    buf.extend_from_slice(payload);
    buf
}

/// Encode a frame for a known message type.
///
/// The payload is written verbatim; name-carrying payloads should already
/// include their NUL terminator (see [`crate::CatRequest::encode`]).
pub fn encode(message_type: MessageType, payload: &[u8]) -> Vec<u8> {
    encode_frame(message_type.tag(), payload)
}

/// Read exactly one frame from `reader`.
///
/// The declared length is checked against [`MAX_FRAME_LEN`] before any body
/// buffer is allocated.
pub async fn read_frame<R>(reader: &mut R) -> ProtocolResult<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    read_section(reader, &mut prefix, FrameSection::Header).await?;

    let len = u64::from_be_bytes(prefix);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::TooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    if len == 0 {
        return Err(ProtocolError::EmptyFrame);
    }

    let mut body = vec![0u8; len as usize];
    read_section(reader, &mut body, FrameSection::Body).await?;

    Ok(Frame { body })
}

async fn read_section<R>(reader: &mut R, buf: &mut [u8], section: FrameSection) -> ProtocolResult<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ProtocolError::Truncated {
            section,
            expected: buf.len() as u64,
        }),
        Err(e) => Err(ProtocolError::Io(e)),
    }
}

/// Extract a NUL-terminated name starting at `offset`.
///
/// Stops at the first zero byte or the end of the buffer; a missing
/// terminator is not an error. Non-UTF-8 bytes are replaced.
pub fn extract_nul_terminated_name(body: &[u8], offset: usize) -> String {
    let rest = body.get(offset..).unwrap_or_default();
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    String::from_utf8_lossy(&rest[..end]).into_owned()
}
