//! # WorldSync Server
//!
//! The central repository server for WorldSync.
//!
//! This crate provides:
//! - A framed TCP endpoint serving pull and history requests
//! - A read-only HTTP API for browsing history and snapshot blobs
//!
//! # Trust Boundary
//!
//! The TCP endpoint accepts loopback connections only; anything else is
//! closed before a single byte is answered. Pushes never cross the wire at
//! all — the authoring client writes to the repository store directly, so
//! the whole write path stays on the local machine.
//!
//! # Failure Policy
//!
//! Storage and protocol failures become `ErrorResponse` messages on the
//! same connection; they never take the listening process down. Only an
//! unrecoverable decode failure (a frame the stream cannot skip) closes a
//! connection.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handler;
pub mod http;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use server::SyncServer;
