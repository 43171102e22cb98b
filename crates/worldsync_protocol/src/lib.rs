//! # WorldSync Protocol
//!
//! Wire messages and frame codec for WorldSync.
//!
//! This crate provides:
//! - `Commit` records shared by every component
//! - The closed message set (pull, history, error)
//! - Length-prefixed frame encoding/decoding
//!
//! This is a pure protocol crate with no I/O beyond buffer manipulation.
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------------+------------------+
//! | Length (4 bytes, BE)       | UTF-8 JSON body  |
//! +----------------------------+------------------+
//! ```
//!
//! One message per frame. The JSON body carries a `type` discriminator
//! that is inspected before the matching shape is decoded.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod commit;
mod error;
mod framing;
mod messages;

pub use commit::Commit;
pub use error::{ProtocolError, ProtocolResult};
pub use framing::{decode_frame, encode_frame, HEADER_LEN, MAX_FRAME_SIZE};
pub use messages::{
    ErrorResponse, HistoryRequest, HistoryResponse, Message, MessageType, PullRequest,
    PullResponse,
};
