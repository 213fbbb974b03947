//! Multi-producer term appender.
//!
//! The appender reserves frame slots in one term buffer under concurrent
//! claims from any number of producer threads, without locks.
//!
//! # Reservation protocol
//!
//! The raw tail in the term metadata is a hint: it tells a producer where
//! the next free slot probably starts. The source of truth is a 32-bit CAS
//! on the slot's own length word, `0 -> -frame_length`. A stale tail just
//! means the CAS fails and the producer retries from a fresh tail, so
//! non-conflicting reservations stay wait-free on the happy path and two
//! producers can never both own one slot.
//!
//! After a won CAS the tail is advanced with a plain store; the CAS already
//! fenced the slot, and every later claim re-validates against the slot CAS
//! anyway.
//!
//! # End of term
//!
//! A claim that would run past the term end covers the remaining bytes with
//! exactly one padding frame and bumps the tail past the term length so
//! every other producer trips as well. The padding remainder is reserved
//! through the same slot CAS before it is written, so a padding write can
//! never land on top of a concurrently claimed frame.
//!
//! # Stall recovery
//!
//! A producer that wins the slot CAS and dies before advancing the tail
//! leaves the tail frozen. Any producer that watches the tail sit unchanged
//! through `spin_limit_before_unblock` failed retries restores the stalled
//! slot's length word to zero with release ordering, and claiming proceeds.

use plume_core::TermId;
use tracing::warn;

use crate::buffer::AtomicBuffer;
use crate::claim::BufferClaim;
use crate::descriptor::{pack_tail, tail_offset, tail_term_id, TERM_TAIL_COUNTER_OFFSET};
use crate::frame::{align_up, frame_length_ordered, FRAME_ALIGNMENT, HEADER_LENGTH};
use crate::header::HeaderWriter;

/// Result of one claim attempt against a term.
pub enum ClaimOutcome<'a> {
    /// A slot was reserved; fill the claim and commit it.
    Claimed {
        /// The reserved slot.
        claim: BufferClaim<'a>,
        /// The term the slot lives in.
        term_id: TermId,
        /// Tail offset after this claim.
        resulting_offset: i32,
    },
    /// The term is exhausted; rotate and retry in the next partition.
    Tripped {
        /// The term that tripped.
        term_id: TermId,
    },
    /// The frame cannot fit in an empty term of this length.
    Failed {
        /// The term the claim was attempted in.
        term_id: TermId,
        /// The aligned frame length that did not fit.
        aligned_length: i32,
    },
}

/// Appends frames to one `(term_buffer, term_metadata)` pair.
pub struct TermAppender {
    term: AtomicBuffer,
    metadata: AtomicBuffer,
    term_length: i32,
}

impl TermAppender {
    /// Binds an appender to a partition's buffers.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)] // Term length < 2^31.
    pub fn new(term: AtomicBuffer, metadata: AtomicBuffer) -> Self {
        let term_length = term.capacity() as i32;
        assert!(term_length > 0 && term_length % FRAME_ALIGNMENT == 0);
        Self {
            term,
            metadata,
            term_length,
        }
    }

    /// Loads the raw tail with acquire ordering.
    #[must_use]
    pub fn raw_tail(&self) -> i64 {
        self.metadata.get_i64_acquire(TERM_TAIL_COUNTER_OFFSET)
    }

    /// Returns this appender's term buffer length in bytes.
    #[must_use]
    pub const fn term_length(&self) -> i32 {
        self.term_length
    }

    /// Claims `length` payload bytes in this term.
    ///
    /// Blocks with bounded spinning under contention; see the module docs
    /// for the reservation, trip, and stall-recovery behaviour.
    #[allow(clippy::cast_sign_loss)] // Term offsets are non-negative and < 2^31.
    pub fn claim<'a>(
        &'a self,
        header: &HeaderWriter,
        length: i32,
        spin_limit_before_unblock: u32,
    ) -> ClaimOutcome<'a> {
        debug_assert!(length >= 0);
        let frame_length = length + HEADER_LENGTH;
        let aligned_length = align_up(frame_length, FRAME_ALIGNMENT);

        let mut observed_tail = self.raw_tail();
        if aligned_length > self.term_length {
            return ClaimOutcome::Failed {
                term_id: tail_term_id(observed_tail),
                aligned_length,
            };
        }

        let mut stalled_spins: u32 = 0;
        loop {
            let term_id = tail_term_id(observed_tail);
            let term_offset = tail_offset(observed_tail);
            let resulting_offset = term_offset + aligned_length;

            if resulting_offset > self.term_length {
                if self.trip(header, term_id, term_offset, resulting_offset) {
                    return ClaimOutcome::Tripped { term_id };
                }
                // Lost the padding slot to a claimer; resolve from a fresh tail.
            } else if self.term.cas_i32(term_offset as usize, 0, -frame_length) {
                // Plain store: the winning CAS fenced this slot, and the tail
                // is only a hint that later claims re-validate anyway.
                self.metadata.put_i64(
                    TERM_TAIL_COUNTER_OFFSET,
                    pack_tail(term_id, resulting_offset),
                );
                header.write(&self.term, term_offset, term_id);
                let frame = self
                    .term
                    .view(term_offset as usize, frame_length as usize);
                return ClaimOutcome::Claimed {
                    claim: BufferClaim::new(frame, frame_length),
                    term_id,
                    resulting_offset,
                };
            }

            std::hint::spin_loop();
            let reloaded = self.raw_tail();
            if reloaded == observed_tail {
                stalled_spins += 1;
                if stalled_spins > spin_limit_before_unblock {
                    self.unblock(tail_offset(reloaded));
                    stalled_spins = 0;
                }
            } else {
                stalled_spins = 0;
                observed_tail = reloaded;
            }
        }
    }

    /// Handles a claim that would run past the end of the term.
    ///
    /// Returns true once the term is fully tripped: the remainder (if any)
    /// is covered by a committed padding frame and the tail points past the
    /// term length. Returns false if another producer claimed the remainder
    /// slot first.
    #[allow(clippy::cast_sign_loss)] // Term offsets are non-negative.
    fn trip(
        &self,
        header: &HeaderWriter,
        term_id: TermId,
        term_offset: i32,
        resulting_offset: i32,
    ) -> bool {
        // A tail at or past the term length means an earlier tripper already
        // covered the remainder (or none existed); nothing left to pad.
        let remainder = self.term_length - term_offset;
        if remainder <= 0 {
            return true;
        }
        debug_assert!(remainder >= FRAME_ALIGNMENT && remainder % FRAME_ALIGNMENT == 0);

        if !self.term.cas_i32(term_offset as usize, 0, -remainder) {
            return false;
        }

        self.metadata.put_i64(
            TERM_TAIL_COUNTER_OFFSET,
            pack_tail(term_id, resulting_offset),
        );
        header.write_padding(&self.term, term_offset, term_id);
        frame_length_ordered(&self.term, term_offset as usize, remainder);
        true
    }

    /// Restores a stalled reservation's length word to zero.
    #[allow(clippy::cast_sign_loss)] // Term offsets are non-negative.
    fn unblock(&self, term_offset: i32) {
        if term_offset >= self.term_length {
            return;
        }
        let current = self.term.get_i32_acquire(term_offset as usize);
        if current < 0 && self.term.cas_i32(term_offset as usize, current, 0) {
            warn!(
                term_offset,
                stalled_length = current,
                "released stalled claim slot"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::test_support::HeapBuffer;
    use crate::frame;
    use plume_core::{SessionId, StreamId};

    const TERM_LENGTH: usize = 4096;
    const SPIN_LIMIT: u32 = 100;

    struct Fixture {
        _term_mem: HeapBuffer,
        _metadata_mem: HeapBuffer,
        appender: TermAppender,
    }

    fn fixture(initial_term_id: i32) -> Fixture {
        let mut term_mem = HeapBuffer::new(TERM_LENGTH);
        let mut metadata_mem = HeapBuffer::new(64);
        let term = term_mem.buffer();
        let metadata = metadata_mem.buffer();
        metadata.put_i64(
            TERM_TAIL_COUNTER_OFFSET,
            pack_tail(TermId::new(initial_term_id), 0),
        );
        Fixture {
            appender: TermAppender::new(term, metadata),
            _term_mem: term_mem,
            _metadata_mem: metadata_mem,
        }
    }

    fn header() -> HeaderWriter {
        HeaderWriter::new(SessionId::new(1), StreamId::new(1))
    }

    fn commit_claim(outcome: ClaimOutcome<'_>) -> i32 {
        match outcome {
            ClaimOutcome::Claimed {
                claim,
                resulting_offset,
                ..
            } => {
                claim.commit();
                resulting_offset
            }
            ClaimOutcome::Tripped { .. } => panic!("unexpected trip"),
            ClaimOutcome::Failed { .. } => panic!("unexpected failure"),
        }
    }

    #[test]
    fn test_first_claim_lands_at_offset_zero() {
        let fx = fixture(7);
        let hdr = header();

        // 16 byte payload => 48 byte frame, advancing the tail by 64.
        let resulting = commit_claim(fx.appender.claim(&hdr, 16, SPIN_LIMIT));
        assert_eq!(resulting, 64);

        let term = fx.appender.term;
        assert_eq!(frame::frame_length_volatile(&term, 0), 48);
        assert_eq!(term.get_i32(frame::TERM_ID_FIELD_OFFSET), 7);
        assert_eq!(tail_offset(fx.appender.raw_tail()), 64);
    }

    #[test]
    fn test_claims_are_contiguous_and_aligned() {
        let fx = fixture(7);
        let hdr = header();

        let mut expected_offset = 0;
        for _ in 0..8 {
            let resulting = commit_claim(fx.appender.claim(&hdr, 96, SPIN_LIMIT));
            expected_offset += 128;
            assert_eq!(resulting, expected_offset);
            assert_eq!(resulting % FRAME_ALIGNMENT, 0);
        }
    }

    #[test]
    fn test_exact_fill_trips_without_padding() {
        let fx = fixture(7);
        let hdr = header();

        // 32 frames of 128 bytes fill the 4096-byte term exactly.
        for _ in 0..32 {
            let _ = commit_claim(fx.appender.claim(&hdr, 96, SPIN_LIMIT));
        }
        assert_eq!(tail_offset(fx.appender.raw_tail()), 4096);

        let outcome = fx.appender.claim(&hdr, 96, SPIN_LIMIT);
        assert!(matches!(
            outcome,
            ClaimOutcome::Tripped { term_id } if term_id.get() == 7
        ));
        // No padding frame: the term ended on an exact boundary, so the last
        // committed frame sits flush against the term end.
        assert_eq!(
            frame::frame_length_volatile(&fx.appender.term, 4096 - 128),
            128
        );
    }

    #[test]
    fn test_trip_covers_remainder_with_one_padding_frame() {
        let fx = fixture(7);
        let hdr = header();

        // 3000 byte payload => 3032 byte frame, aligned to 3040.
        let resulting = commit_claim(fx.appender.claim(&hdr, 3000, SPIN_LIMIT));
        assert_eq!(resulting, 3040);

        // A second 3000 byte claim needs 3040 bytes but only 1056 remain.
        let outcome = fx.appender.claim(&hdr, 3000, SPIN_LIMIT);
        assert!(matches!(outcome, ClaimOutcome::Tripped { .. }));

        let term = fx.appender.term;
        assert_eq!(frame::frame_length_volatile(&term, 3040), 1056);
        assert!(frame::is_padding_frame(&term, 3040));
        assert!(tail_offset(fx.appender.raw_tail()) > 4096);
    }

    #[test]
    fn test_aborted_claim_becomes_padding() {
        let fx = fixture(7);
        let hdr = header();

        match fx.appender.claim(&hdr, 100, SPIN_LIMIT) {
            ClaimOutcome::Claimed { claim, .. } => claim.abort(),
            _ => panic!("claim should succeed"),
        }

        let term = fx.appender.term;
        assert_eq!(frame::frame_length_volatile(&term, 0), 132);
        assert!(frame::is_padding_frame(&term, 0));
    }

    #[test]
    fn test_oversized_claim_fails() {
        let fx = fixture(7);
        let hdr = header();

        let outcome = fx.appender.claim(&hdr, TERM_LENGTH as i32, SPIN_LIMIT);
        assert!(matches!(outcome, ClaimOutcome::Failed { .. }));
    }

    #[test]
    fn test_stalled_reservation_is_unblocked() {
        let fx = fixture(7);
        let hdr = header();

        // Simulate a producer that won the slot CAS and died before
        // advancing the tail or committing.
        assert!(fx.appender.term.cas_i32(0, 0, -64));

        // The next claim spins past the unblock threshold, restores the
        // slot, and then wins it.
        let resulting = commit_claim(fx.appender.claim(&hdr, 16, 10));
        assert_eq!(resulting, 64);
        assert_eq!(frame::frame_length_volatile(&fx.appender.term, 0), 48);
    }

    #[test]
    fn test_concurrent_claims_reserve_distinct_slots() {
        let fx = fixture(7);
        let appender = &fx.appender;

        let offsets: Vec<i32> = std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..4 {
                handles.push(scope.spawn(|| {
                    let hdr = header();
                    let mut resulting = Vec::new();
                    for _ in 0..4 {
                        resulting.push(commit_claim(appender.claim(&hdr, 32, SPIN_LIMIT)));
                    }
                    resulting
                }));
            }
            handles
                .into_iter()
                .flat_map(|h| h.join().expect("claimer panicked"))
                .collect()
        });

        // 16 claims of 64 aligned bytes: resulting offsets are exactly the
        // multiples of 64 up to 1024, each claimed once.
        let mut sorted = offsets;
        sorted.sort_unstable();
        let expected: Vec<i32> = (1..=16).map(|i| i * 64).collect();
        assert_eq!(sorted, expected);
    }
}
