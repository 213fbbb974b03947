//! Log layout descriptor.
//!
//! Describes how the mapped file is carved up and how the per-term metadata
//! words are packed:
//!
//! ```text
//! +-----------------------+
//! | Term buffer 0         |  (term_length bytes)
//! +-----------------------+
//! | Term buffer 1         |
//! +-----------------------+
//! | Term buffer 2         |
//! +-----------------------+
//! | Term metadata 0       |  (one page: raw tail + status)
//! +-----------------------+
//! | Term metadata 1       |
//! +-----------------------+
//! | Term metadata 2       |
//! +-----------------------+
//! | Log metadata          |  (one page: active index, initial term id,
//! +-----------------------+   default frame header template)
//! ```
//!
//! The raw tail packs `(term_id << 32) | tail_offset` into one atomic word so
//! producers read both halves consistently. Position arithmetic turns a
//! `(term_id, term_offset)` pair into the strictly monotonic 64-bit stream
//! coordinate the public API exposes.

use plume_core::{TermId, LOG_LENGTH_BYTES_MAX, TERM_LENGTH_BYTES_MAX, TERM_LENGTH_BYTES_MIN};

use crate::error::{LogError, LogResult};

/// Number of term partitions in a log.
pub const PARTITION_COUNT: usize = 3;

/// Offset of the raw tail counter within a term metadata block.
pub const TERM_TAIL_COUNTER_OFFSET: usize = 0;

/// Offset of the status word within a term metadata block.
pub const TERM_STATUS_OFFSET: usize = 8;

/// Partition status: zeroed and ready to become active.
pub const PARTITION_CLEAN: i32 = 0;
/// Partition status: retired and awaiting the cleaner.
pub const PARTITION_NEEDS_CLEANING: i32 = 1;
/// Partition status: currently (or most recently) active.
pub const PARTITION_IN_USE: i32 = 2;

/// Offset of `active_partition_index` within the log metadata block.
///
/// Each log metadata field sits on its own cache line so producers hammering
/// the active index never false-share with the rest.
pub const LOG_ACTIVE_PARTITION_INDEX_OFFSET: usize = 0;
/// Offset of `initial_term_id` within the log metadata block.
pub const LOG_INITIAL_TERM_ID_OFFSET: usize = 64;
/// Offset of the 32-byte default frame header template.
pub const LOG_DEFAULT_FRAME_HEADER_OFFSET: usize = 128;

/// Packs a term ID and a tail offset into a raw tail word.
#[inline]
#[must_use]
pub fn pack_tail(term_id: TermId, tail_offset: i32) -> i64 {
    (i64::from(term_id.get()) << 32) | (i64::from(tail_offset) & 0xFFFF_FFFF)
}

/// Extracts the term ID from a raw tail word.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // High half is exactly the term ID.
pub fn tail_term_id(raw_tail: i64) -> TermId {
    TermId::new((raw_tail >> 32) as i32)
}

/// Extracts the tail offset from a raw tail word.
///
/// The offset can exceed the term length once producers have tripped past
/// the end of the term.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Low half is bounded by 2 * term length < 2^31.
pub fn tail_offset(raw_tail: i64) -> i32 {
    (raw_tail & 0xFFFF_FFFF) as i32
}

/// Extracts the tail offset, capped at the term length.
#[inline]
#[must_use]
pub fn tail_offset_bounded(raw_tail: i64, term_length: i32) -> i32 {
    tail_offset(raw_tail).min(term_length)
}

/// Number of bits a term count is shifted by in a position.
#[inline]
#[must_use]
pub fn position_bits_to_shift(term_length: i32) -> u32 {
    debug_assert!((term_length as u32).is_power_of_two());
    term_length.trailing_zeros()
}

/// Computes the stream position for a `(term_id, term_offset)` coordinate.
#[inline]
#[must_use]
pub fn compute_position(
    term_id: TermId,
    term_offset: i32,
    position_bits_to_shift: u32,
    initial_term_id: TermId,
) -> i64 {
    (term_id.count_since(initial_term_id) << position_bits_to_shift) + i64::from(term_offset)
}

/// Maps a count of completed terms onto a partition index.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
// Remainder is in 0..3.
pub fn partition_index(term_count: i64) -> usize {
    debug_assert!(term_count >= 0);
    (term_count % PARTITION_COUNT as i64) as usize
}

/// The partition after `index` in the rotation ring.
#[inline]
#[must_use]
pub const fn next_partition_index(index: usize) -> usize {
    (index + 1) % PARTITION_COUNT
}

/// Validates a requested term length.
///
/// # Errors
/// Returns [`LogError::InvalidTermLength`] if the length is not a power of
/// two or lies outside the supported range.
pub fn check_term_length(term_length: i64) -> LogResult<()> {
    if term_length < i64::from(TERM_LENGTH_BYTES_MIN) {
        return Err(LogError::InvalidTermLength {
            requested: term_length,
            reason: "below minimum term length",
        });
    }
    if term_length > i64::from(TERM_LENGTH_BYTES_MAX) {
        return Err(LogError::InvalidTermLength {
            requested: term_length,
            reason: "above maximum term length",
        });
    }
    if term_length.count_ones() != 1 {
        return Err(LogError::InvalidTermLength {
            requested: term_length,
            reason: "not a power of two",
        });
    }
    Ok(())
}

/// Length of one term metadata block for the given page size.
#[inline]
#[must_use]
pub const fn term_metadata_length(page_size: usize) -> usize {
    page_size
}

/// Length of the log metadata block for the given page size.
#[inline]
#[must_use]
pub const fn log_metadata_length(page_size: usize) -> usize {
    page_size
}

/// Total mapped file length for the given term length and page size.
///
/// # Errors
/// Returns [`LogError::InvalidTermLength`] if the total would not fit a
/// 32-bit offset space (the single-mapping limit this crate enforces at
/// construction).
#[allow(clippy::cast_possible_wrap)] // Partition count and page sizes are small.
pub fn compute_log_length(term_length: i64, page_size: usize) -> LogResult<i64> {
    let metadata = PARTITION_COUNT as i64 * term_metadata_length(page_size) as i64
        + log_metadata_length(page_size) as i64;
    let total = PARTITION_COUNT as i64 * term_length + metadata;
    if total > LOG_LENGTH_BYTES_MAX {
        return Err(LogError::InvalidTermLength {
            requested: term_length,
            reason: "log length would exceed 2^31 bytes",
        });
    }
    Ok(total)
}
