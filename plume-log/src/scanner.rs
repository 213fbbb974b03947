//! Diagnostic gap scanner.
//!
//! Walks a term from a rebuild offset and reports the first run of
//! unreserved bytes below a high-water mark: a region some producer has
//! reserved past but never filled. Purely observational; nothing in the
//! data path depends on it.

use plume_core::TermId;

use crate::buffer::AtomicBuffer;
use crate::frame::{align_up, frame_length_volatile, FRAME_ALIGNMENT};

/// A hole between committed frames, below the high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapReport {
    /// Term the gap was found in.
    pub term_id: TermId,
    /// Term offset where the gap begins.
    pub gap_offset: i32,
    /// Length of the gap in bytes.
    pub gap_length: i32,
}

/// Scans for the first gap in `[rebuild_offset, high_water_mark)`.
///
/// Walks contiguous frames from `rebuild_offset` until a zero length word,
/// then measures the run of zero length words in frame-alignment steps up
/// to the high-water mark. Returns `None` if the committed frames reach the
/// high-water mark.
#[allow(clippy::cast_sign_loss)] // Term offsets are non-negative.
pub fn scan_for_gap(
    term: &AtomicBuffer,
    term_id: TermId,
    rebuild_offset: i32,
    high_water_mark: i32,
) -> Option<GapReport> {
    debug_assert!(rebuild_offset >= 0 && rebuild_offset <= high_water_mark);
    debug_assert!(high_water_mark as usize <= term.capacity());

    let mut offset = rebuild_offset;
    while offset < high_water_mark {
        let frame_length = frame_length_volatile(term, offset as usize);
        if frame_length <= 0 {
            break;
        }
        offset += align_up(frame_length, FRAME_ALIGNMENT);
    }

    if offset >= high_water_mark {
        return None;
    }

    let gap_offset = offset;
    let mut cursor = gap_offset;
    while cursor < high_water_mark && frame_length_volatile(term, cursor as usize) == 0 {
        cursor += FRAME_ALIGNMENT;
    }

    Some(GapReport {
        term_id,
        gap_offset,
        gap_length: cursor - gap_offset,
    })
}
