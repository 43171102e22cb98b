//! # WorldSync Store
//!
//! SQLite-backed repository store for WorldSync.
//!
//! This crate owns the durable commit graph: commit rows, snapshot blobs,
//! and branch-head pointers. A [`CommitStore`] is an explicit object owning
//! its database connection; servers and clients receive one by injection
//! rather than through shared global state.
//!
//! ## Consistency
//!
//! `save_commit` writes the commit row, the snapshot blob, and the branch
//! head in one SQL transaction: either all three land or none do. Writes
//! serialize through the store's connection lock; a reader never observes
//! a partially-written commit/snapshot/branch triple.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::CommitStore;
