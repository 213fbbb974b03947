//! Default frame header stamping.

use plume_core::{SessionId, StreamId, TermId};

use crate::buffer::AtomicBuffer;
use crate::descriptor::LOG_DEFAULT_FRAME_HEADER_OFFSET;
use crate::frame::{
    FLAGS_FIELD_OFFSET, FRAME_VERSION, HDR_TYPE_DATA, HDR_TYPE_PAD, RESERVED_VALUE_FIELD_OFFSET,
    SESSION_ID_FIELD_OFFSET, STREAM_ID_FIELD_OFFSET, TERM_ID_FIELD_OFFSET,
    TERM_OFFSET_FIELD_OFFSET, TYPE_FIELD_OFFSET, VERSION_FIELD_OFFSET,
};

/// Stateless writer that stamps every header field except the length word.
///
/// The length word belongs to the reservation protocol: the slot CAS writes
/// it negative and [`BufferClaim::commit`](crate::BufferClaim::commit) flips
/// it positive with release ordering, after everything stamped here.
#[derive(Debug, Clone, Copy)]
pub struct HeaderWriter {
    version: u8,
    flags: u8,
    session_id: SessionId,
    stream_id: StreamId,
}

impl HeaderWriter {
    /// Creates a header writer for one publisher of one stream.
    #[must_use]
    pub const fn new(session_id: SessionId, stream_id: StreamId) -> Self {
        Self {
            version: FRAME_VERSION,
            flags: 0,
            session_id,
            stream_id,
        }
    }

    /// Returns the session ID stamped into every frame.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns the stream ID stamped into every frame.
    #[must_use]
    pub const fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Stamps a data frame header at `term_offset`.
    ///
    /// The slot must be exclusively reserved by the caller.
    pub fn write(&self, term: &AtomicBuffer, term_offset: i32, term_id: TermId) {
        self.write_with_type(term, term_offset, term_id, HDR_TYPE_DATA);
    }

    /// Stamps a padding frame header at `term_offset`.
    pub fn write_padding(&self, term: &AtomicBuffer, term_offset: i32, term_id: TermId) {
        self.write_with_type(term, term_offset, term_id, HDR_TYPE_PAD);
    }

    #[allow(clippy::cast_sign_loss)] // Term offsets are non-negative by construction.
    fn write_with_type(
        &self,
        term: &AtomicBuffer,
        term_offset: i32,
        term_id: TermId,
        frame_type: i16,
    ) {
        debug_assert!(term_offset >= 0);
        let base = term_offset as usize;

        term.put_u8(base + VERSION_FIELD_OFFSET, self.version);
        term.put_u8(base + FLAGS_FIELD_OFFSET, self.flags);
        term.put_i16(base + TYPE_FIELD_OFFSET, frame_type);
        term.put_i32(base + TERM_OFFSET_FIELD_OFFSET, term_offset);
        term.put_i32(base + SESSION_ID_FIELD_OFFSET, self.session_id.get());
        term.put_i32(base + STREAM_ID_FIELD_OFFSET, self.stream_id.get());
        term.put_i32(base + TERM_ID_FIELD_OFFSET, term_id.get());
        term.put_i64(base + RESERVED_VALUE_FIELD_OFFSET, 0);
    }

    /// Persists the template into the log metadata block.
    ///
    /// Lets a process reopening the file reconstruct the writer that created
    /// it.
    pub fn store_defaults(&self, log_metadata: &AtomicBuffer) {
        let base = LOG_DEFAULT_FRAME_HEADER_OFFSET;
        log_metadata.put_u8(base + VERSION_FIELD_OFFSET, self.version);
        log_metadata.put_u8(base + FLAGS_FIELD_OFFSET, self.flags);
        log_metadata.put_i16(base + TYPE_FIELD_OFFSET, HDR_TYPE_DATA);
        log_metadata.put_i32(base + SESSION_ID_FIELD_OFFSET, self.session_id.get());
        log_metadata.put_i32(base + STREAM_ID_FIELD_OFFSET, self.stream_id.get());
    }

    /// Reconstructs a writer from the template in the log metadata block.
    #[must_use]
    pub fn from_defaults(log_metadata: &AtomicBuffer) -> Self {
        let base = LOG_DEFAULT_FRAME_HEADER_OFFSET;
        Self {
            version: log_metadata.get_u8(base + VERSION_FIELD_OFFSET),
            flags: log_metadata.get_u8(base + FLAGS_FIELD_OFFSET),
            session_id: SessionId::new(log_metadata.get_i32(base + SESSION_ID_FIELD_OFFSET)),
            stream_id: StreamId::new(log_metadata.get_i32(base + STREAM_ID_FIELD_OFFSET)),
        }
    }
}
