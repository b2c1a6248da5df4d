//! objproxy wire protocol
//!
//! Shared between the daemon and request producers. A request is a single
//! length-prefixed frame:
//!
//! ```text
//! +-----------------------------+----------+---------------------+
//! | Length (8 bytes, BE, u64)   | Tag (u8) | Payload             |
//! +-----------------------------+----------+---------------------+
//!                               |<------- length bytes -------->|
//! ```
//!
//! - Maximum body length: 1 MiB ([`MAX_FRAME_LEN`])
//! - Tag `42` is [`MessageType::Cat`]; its payload is a NUL-terminated name
//! - Responses are not framed: the daemon streams raw bytes and closes

mod error;
mod frame;
mod lifecycle;
mod message;

pub use error::{FrameSection, ProtocolError, ProtocolResult};
pub use frame::{
    encode, encode_frame, extract_nul_terminated_name, read_frame, Frame, LENGTH_PREFIX_LEN,
    MAX_FRAME_LEN,
};
pub use lifecycle::{remove_socket, socket_path};
pub use message::{CatRequest, MessageType, Request, FAILURE_PREFIX, WRONG_REQUEST_TYPE};
