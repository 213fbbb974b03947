//! Plume Log - a multi-producer, single-consumer shared-memory append log.
//!
//! A memory-mapped file, partitioned into three rotating *terms*, serves as
//! a lock-free ring: publishers claim bounded byte ranges, fill them, and
//! commit them; a poller reads committed frames in order and delivers them
//! to a consumer callback. Low-latency inter-process messaging is the
//! target: claims are a slot CAS on the happy path, commits are one release
//! store, and the consumer never takes a lock.
//!
//! # Design Principles (`TigerStyle`)
//!
//! - **Explicit limits**: term lengths are bounded and validated, every spin
//!   loop has an escape hatch
//! - **Publication order**: a frame is visible if and only if its length
//!   word is positive; release on commit pairs with acquire on read
//! - **Contained unsafety**: all raw-pointer access is confined to
//!   [`AtomicBuffer`] with the invariants stated at each unsafe block
//!
//! # Example
//!
//! ```ignore
//! use plume_log::{AppendLog, AppendLogConfig};
//!
//! let mut log = AppendLog::new("/dev/shm/example.log", 48 * 1024 * 1024)?;
//!
//! log.on_append(|payload| println!("got {} bytes", payload.len()));
//! log.start_polling()?;
//!
//! // Claim, fill, commit: zero-copy publication.
//! let mut claim = log.claim(5)?;
//! claim.payload_mut().copy_from_slice(b"hello");
//! claim.commit();
//!
//! log.stop();
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// The on-disk format is little-endian and field accesses go through native
// atomics, so a big-endian host would write an incompatible file.
#[cfg(target_endian = "big")]
compile_error!("plume-log supports little-endian targets only");

mod appender;
mod buffer;
mod claim;
pub mod descriptor;
mod error;
pub mod frame;
mod header;
mod log;
mod log_buffers;
mod reader;
mod scanner;

pub use appender::{ClaimOutcome, TermAppender};
pub use buffer::AtomicBuffer;
pub use claim::BufferClaim;
pub use error::{LogError, LogResult};
pub use header::HeaderWriter;
pub use log::{
    AppendLog, AppendLogConfig, POLL_FRAGMENT_LIMIT_DEFAULT, SPIN_LIMIT_BEFORE_UNBLOCK_DEFAULT,
    TERM_LENGTH_BYTES_DEFAULT,
};
pub use log_buffers::LogBuffers;
pub use reader::{read, ReadOutcome};
pub use scanner::{scan_for_gap, GapReport};
