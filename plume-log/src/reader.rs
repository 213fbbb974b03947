//! Single-consumer scan of committed frames in one term.

use crate::buffer::AtomicBuffer;
use crate::frame::{
    align_up, frame_length_volatile, is_padding_frame, FRAME_ALIGNMENT, HEADER_LENGTH,
};

/// Result of one scan over a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Term offset after the last frame traversed.
    pub new_offset: i32,
    /// Number of data frames delivered (padding is traversed, not counted).
    pub fragments_read: usize,
}

/// Scans committed frames starting at `term_offset`.
///
/// Delivers the payload of each data frame to `on_frame` in order, skips
/// padding frames, and stops at the first length word `<= 0` (no more
/// visible frames), at the end of the term, or after `fragment_limit` data
/// frames. The payload slice is valid only for the duration of the call.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
// Term offsets and lengths are non-negative and < 2^31.
pub fn read<F>(
    term: &AtomicBuffer,
    term_offset: i32,
    fragment_limit: usize,
    on_frame: &mut F,
) -> ReadOutcome
where
    F: FnMut(&[u8]),
{
    let term_length = term.capacity() as i32;
    debug_assert!(term_offset >= 0 && term_offset <= term_length);

    let mut offset = term_offset;
    let mut fragments_read = 0;

    while fragments_read < fragment_limit && offset < term_length {
        let frame_length = frame_length_volatile(term, offset as usize);
        if frame_length <= 0 {
            break;
        }

        if !is_padding_frame(term, offset as usize) {
            let payload = term.slice_at(
                offset as usize + HEADER_LENGTH as usize,
                (frame_length - HEADER_LENGTH) as usize,
            );
            on_frame(payload);
            fragments_read += 1;
        }

        offset += align_up(frame_length, FRAME_ALIGNMENT);
    }

    ReadOutcome {
        new_offset: offset,
        fragments_read,
    }
}
