//! Message types and request payloads.

use crate::frame::{encode, extract_nul_terminated_name, Frame};
use std::fmt;

/// Prefix written to the connection when a request fails after parsing.
pub const FAILURE_PREFIX: &str = "failed to complete request: ";

/// Fixed response for a tag the daemon does not serve.
pub const WRONG_REQUEST_TYPE: &str = "wrong request type";

/// Closed set of request types.
///
/// New operations get a new variant and tag; unknown tags are rejected
/// explicitly by the daemon, never ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Fetch an object's bytes by name.
    Cat = 42,
}

impl MessageType {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            42 => Ok(MessageType::Cat),
            other => Err(other),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Cat => f.write_str("CAT"),
        }
    }
}

/// Payload of a [`MessageType::Cat`] request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatRequest {
    /// Object name; must not contain NUL.
    pub name: String,
}

impl CatRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Encode as a complete frame, appending the NUL terminator.
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.name.len() + 1);
        payload.extend_from_slice(self.name.as_bytes());
        payload.push(0);
        encode(MessageType::Cat, &payload)
    }

    /// Parse from a frame body; the name starts right after the tag byte.
    pub fn from_body(body: &[u8]) -> Self {
        Self {
            name: extract_nul_terminated_name(body, 1),
        }
    }
}

/// A decoded request, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Cat(CatRequest),
    /// A well-formed frame with a tag outside [`MessageType`].
    Unsupported(u8),
}

impl Request {
    pub fn from_frame(frame: &Frame) -> Self {
        match frame.message_type() {
            Some(MessageType::Cat) => Request::Cat(CatRequest::from_body(frame.body())),
            None => Request::Unsupported(frame.tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_frame, read_frame};

    #[test]
    fn test_message_type_tag() {
        assert_eq!(MessageType::Cat.tag(), 42);
        assert_eq!(MessageType::try_from(42), Ok(MessageType::Cat));
        assert_eq!(MessageType::try_from(0), Err(0));
        assert_eq!(MessageType::Cat.to_string(), "CAT");
    }

    #[test]
    fn test_cat_request_encode_appends_nul() {
        let bytes = CatRequest::new("backup/chunk1").encode();
        assert_eq!(bytes.last(), Some(&0));
        assert_eq!(u64::from_be_bytes(bytes[..8].try_into().unwrap()), 15);
    }

    #[tokio::test]
    async fn test_request_from_frame_cat() {
        let bytes = CatRequest::new("backup/chunk1").encode();
        let frame = read_frame(&mut bytes.as_slice()).await.unwrap();
        assert_eq!(
            Request::from_frame(&frame),
            Request::Cat(CatRequest::new("backup/chunk1"))
        );
    }

    #[tokio::test]
    async fn test_request_from_frame_unknown_tag() {
        let bytes = encode_frame(7, b"whatever\0");
        let frame = read_frame(&mut bytes.as_slice()).await.unwrap();
        assert_eq!(Request::from_frame(&frame), Request::Unsupported(7));
    }

    #[tokio::test]
    async fn test_cat_request_with_empty_name() {
        let bytes = CatRequest::new("").encode();
        let frame = read_frame(&mut bytes.as_slice()).await.unwrap();
        assert_eq!(
            Request::from_frame(&frame),
            Request::Cat(CatRequest::new(""))
        );
    }
}
