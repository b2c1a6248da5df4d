use std::fmt;

/// Which part of a frame was being read when the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSection {
    Header,
    Body,
}

impl fmt::Display for FrameSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSection::Header => f.write_str("header"),
            FrameSection::Body => f.write_str("body"),
        }
    }
}

/// Errors raised while reading a request frame.
///
/// All of these are connection-fatal: the peer violated the protocol (or
/// went away) and no response is owed.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("truncated frame {section}: expected {expected} bytes")]
    Truncated {
        section: FrameSection,
        expected: u64,
    },

    #[error("frame too large: {len} bytes exceeds limit of {max}")]
    TooLarge { len: u64, max: u64 },

    #[error("empty frame: body carries no message type")]
    EmptyFrame,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
