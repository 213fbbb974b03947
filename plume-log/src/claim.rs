//! A reserved, not-yet-committed byte range in a term.

use std::marker::PhantomData;

use crate::buffer::AtomicBuffer;
use crate::frame::{
    frame_length_ordered, set_frame_type, HDR_TYPE_PAD, HEADER_LENGTH, LENGTH_FIELD_OFFSET,
};

/// A claimed slot awaiting its payload.
///
/// Produced by [`AppendLog::claim`](crate::AppendLog::claim). The claim
/// exposes the payload range for writing; [`commit`](Self::commit) publishes
/// the frame to the reader and [`abort`](Self::abort) turns it into padding
/// the reader skips. Both consume the claim, so the payload view cannot
/// outlive publication. A claim dropped without either call is aborted, so
/// an early return in producer code cannot leave the reader stalled on a
/// reserved slot.
///
/// The lifetime ties the claim to the log it was claimed from; the mapping
/// cannot be unmapped while a claim is outstanding.
#[must_use = "a claim publishes nothing until commit() is called"]
pub struct BufferClaim<'a> {
    frame: AtomicBuffer,
    frame_length: i32,
    committed: bool,
    _log: PhantomData<&'a ()>,
}

impl<'a> BufferClaim<'a> {
    /// Wraps an exclusively reserved frame slot.
    ///
    /// `frame` must be a window over exactly the frame (header + payload)
    /// whose length word the caller has CASed negative.
    pub(crate) fn new(frame: AtomicBuffer, frame_length: i32) -> Self {
        debug_assert_eq!(frame.capacity(), frame_length as usize);
        Self {
            frame,
            frame_length,
            committed: false,
            _log: PhantomData,
        }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // Frame length is > HEADER_LENGTH by construction.
    pub const fn len(&self) -> usize {
        (self.frame_length - HEADER_LENGTH) as usize
    }

    /// Returns true if the claimed payload range is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the mutable payload range of exactly the claimed length.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // Header length is positive.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.frame.slice_at_mut(HEADER_LENGTH as usize, self.len())
    }

    /// Publishes the frame.
    ///
    /// Writes the positive frame length with release ordering; a reader that
    /// observes it is guaranteed to observe the header and payload too.
    pub fn commit(mut self) {
        self.committed = true;
        frame_length_ordered(&self.frame, LENGTH_FIELD_OFFSET, self.frame_length);
    }

    /// Discards the frame.
    ///
    /// Rewrites the type to padding before publishing the length, so the
    /// reader steps over the slot without delivering it.
    pub fn abort(mut self) {
        self.committed = true;
        self.abort_in_place();
    }

    fn abort_in_place(&self) {
        set_frame_type(&self.frame, 0, HDR_TYPE_PAD);
        frame_length_ordered(&self.frame, LENGTH_FIELD_OFFSET, self.frame_length);
    }
}

impl Drop for BufferClaim<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.abort_in_place();
        }
    }
}
