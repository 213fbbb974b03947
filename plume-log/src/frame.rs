//! Frame protocol: header layout and length-word accessors.
//!
//! Every record in a term is a frame: a fixed 32-byte header followed by the
//! payload, padded so the next frame starts 32-byte aligned.
//!
//! ```text
//! +--------------+---------+-------+------+-------------+
//! | frame_length | version | flags | type | term_offset |
//! |   (4 bytes)  |  (1)    |  (1)  | (2)  |    (4)      |
//! +--------------+---------+-------+------+-------------+
//! | session_id   | stream_id | term_id | reserved_value |
//! |    (4)       |    (4)    |   (4)   |      (8)       |
//! +--------------+-----------+---------+----------------+
//! | payload ...                                         |
//! +-----------------------------------------------------+
//! ```
//!
//! The length word is the publication point: it is negative while a slot is
//! reserved and becomes positive, written with release ordering, at commit.
//! Readers load it with acquire ordering; a value `<= 0` means "not yet
//! visible". All integers are little-endian on disk (enforced by the
//! little-endian-only build check in `lib.rs`).

use crate::buffer::AtomicBuffer;

/// Length of the fixed frame header in bytes.
pub const HEADER_LENGTH: i32 = 32;

/// Every frame starts at a multiple of this and occupies a multiple of it.
pub const FRAME_ALIGNMENT: i32 = 32;

/// Offset of the `frame_length` field within a frame.
pub const LENGTH_FIELD_OFFSET: usize = 0;
/// Offset of the `version` field within a frame.
pub const VERSION_FIELD_OFFSET: usize = 4;
/// Offset of the `flags` field within a frame.
pub const FLAGS_FIELD_OFFSET: usize = 5;
/// Offset of the `type` field within a frame.
pub const TYPE_FIELD_OFFSET: usize = 6;
/// Offset of the `term_offset` field within a frame.
pub const TERM_OFFSET_FIELD_OFFSET: usize = 8;
/// Offset of the `session_id` field within a frame.
pub const SESSION_ID_FIELD_OFFSET: usize = 12;
/// Offset of the `stream_id` field within a frame.
pub const STREAM_ID_FIELD_OFFSET: usize = 16;
/// Offset of the `term_id` field within a frame.
pub const TERM_ID_FIELD_OFFSET: usize = 20;
/// Offset of the `reserved_value` field within a frame.
pub const RESERVED_VALUE_FIELD_OFFSET: usize = 24;

/// Frame type for padding at the end of a term (and aborted claims).
pub const HDR_TYPE_PAD: i16 = 0x00;
/// Frame type for application data.
pub const HDR_TYPE_DATA: i16 = 0x01;
/// Frame type reserved for flow-control status messages. Never emitted.
pub const HDR_TYPE_SM: i16 = 0x03;

/// Current frame format version.
pub const FRAME_VERSION: u8 = 0;

/// Rounds `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two.
#[inline]
#[must_use]
pub const fn align_up(value: i32, alignment: i32) -> i32 {
    (value + (alignment - 1)) & !(alignment - 1)
}

/// Largest payload that can be claimed in a term of the given length.
#[inline]
#[must_use]
pub const fn max_payload_length(term_length: i32) -> i32 {
    term_length - HEADER_LENGTH - FRAME_ALIGNMENT
}

/// Loads a frame's length word with acquire ordering.
///
/// Pairs with the release store in [`frame_length_ordered`]: a positive
/// result guarantees every header field and payload byte of the frame is
/// visible.
#[inline]
#[must_use]
pub fn frame_length_volatile(term: &AtomicBuffer, frame_offset: usize) -> i32 {
    term.get_i32_acquire(frame_offset + LENGTH_FIELD_OFFSET)
}

/// Publishes a frame's length word with release ordering.
#[inline]
pub fn frame_length_ordered(term: &AtomicBuffer, frame_offset: usize, length: i32) {
    term.put_i32_release(frame_offset + LENGTH_FIELD_OFFSET, length);
}

/// Reads a frame's type field.
#[inline]
#[must_use]
pub fn frame_type(term: &AtomicBuffer, frame_offset: usize) -> i16 {
    term.get_i16(frame_offset + TYPE_FIELD_OFFSET)
}

/// Rewrites a frame's type field.
#[inline]
pub fn set_frame_type(term: &AtomicBuffer, frame_offset: usize, frame_type: i16) {
    term.put_i16(frame_offset + TYPE_FIELD_OFFSET, frame_type);
}

/// Returns true if the frame at `frame_offset` is padding.
#[inline]
#[must_use]
pub fn is_padding_frame(term: &AtomicBuffer, frame_offset: usize) -> bool {
    frame_type(term, frame_offset) == HDR_TYPE_PAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::test_support::HeapBuffer;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 32), 0);
        assert_eq!(align_up(1, 32), 32);
        assert_eq!(align_up(32, 32), 32);
        assert_eq!(align_up(33, 32), 64);
        assert_eq!(align_up(48, 32), 64);
        assert_eq!(align_up(3032, 32), 3040);
    }

    #[test]
    fn test_header_fields_cover_header_length() {
        // The reserved value is the last field and ends exactly at the
        // header boundary.
        assert_eq!(RESERVED_VALUE_FIELD_OFFSET + 8, HEADER_LENGTH as usize);
    }

    #[test]
    fn test_length_word_roundtrip() {
        let mut mem = HeapBuffer::new(128);
        let term = mem.buffer();

        frame_length_ordered(&term, 64, 96);
        assert_eq!(frame_length_volatile(&term, 64), 96);
    }

    #[test]
    fn test_frame_type_roundtrip() {
        let mut mem = HeapBuffer::new(64);
        let term = mem.buffer();

        set_frame_type(&term, 0, HDR_TYPE_DATA);
        assert!(!is_padding_frame(&term, 0));

        set_frame_type(&term, 0, HDR_TYPE_PAD);
        assert!(is_padding_frame(&term, 0));
    }

    #[test]
    fn test_max_payload_length() {
        // A max-length payload always frames and aligns within the term.
        let term_length = 65_536;
        let max = max_payload_length(term_length);
        assert!(align_up(max + HEADER_LENGTH, FRAME_ALIGNMENT) <= term_length);
    }
}
