//! Plume Core - Strongly-typed identifiers and limits for the Plume append log.
//!
//! This crate provides the identifier types and hard bounds shared by the
//! log substrate and anything built on top of it. It holds no I/O and no
//! concurrency machinery.
//!
//! # Design Principles (`TigerStyle`)
//!
//! - **Strongly-typed IDs**: Prevent mixing up a `StreamId` with a `SessionId`
//! - **Explicit limits**: Every buffer has a bounded size
//! - **No unsafe code**: the unsafe core lives in `plume-log`, not here

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod limits;
mod types;

pub use limits::{LOG_LENGTH_BYTES_MAX, TERM_LENGTH_BYTES_MAX, TERM_LENGTH_BYTES_MIN};
pub use types::{SessionId, StreamId, TermId};
