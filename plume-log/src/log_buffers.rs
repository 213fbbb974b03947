//! Mapped region and partitioning.
//!
//! Owns the memory-mapped log file and carves it into the three term
//! buffers, three term metadata blocks, and one log metadata block described
//! in [`descriptor`](crate::descriptor). Everything else in the crate works
//! on [`AtomicBuffer`] windows handed out here; the mapping outlives all of
//! them because the structs holding views also hold (directly or through
//! their parent) the `LogBuffers`.

use std::fs::OpenOptions;
use std::path::Path;

use memmap2::MmapMut;
use tracing::debug;

use crate::buffer::AtomicBuffer;
use crate::descriptor::{
    check_term_length, compute_log_length, log_metadata_length, term_metadata_length,
    PARTITION_COUNT,
};
use crate::error::{LogError, LogResult};

/// The mapped log file, partitioned into terms and metadata blocks.
pub struct LogBuffers {
    mmap: MmapMut,
    ptr: *mut u8,
    term_length: i32,
    page_size: usize,
    created: bool,
}

// Safety: the raw pointer aliases the mapping owned by this struct; all
// concurrent access to it goes through `AtomicBuffer`.
unsafe impl Send for LogBuffers {}
unsafe impl Sync for LogBuffers {}

impl LogBuffers {
    /// Creates or opens a mapped log file.
    ///
    /// A fresh file is sized to `3 * (term_length + metadata)` plus one log
    /// metadata page and zero-filled by the filesystem. An existing file must
    /// have exactly the length implied by `term_length`; two processes
    /// sharing a log must agree on the term length.
    ///
    /// # Errors
    /// Returns [`LogError::InvalidTermLength`] for an unusable term length or
    /// a length mismatch with an existing file, and [`LogError::Io`] for file
    /// or mapping failures.
    pub fn open(path: &Path, term_length: i32) -> LogResult<Self> {
        check_term_length(i64::from(term_length))?;

        let page_size = os_page_size();
        let total_length = compute_log_length(i64::from(term_length), page_size)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| LogError::io("open log file", e))?;

        let existing_length = file
            .metadata()
            .map_err(|e| LogError::io("stat log file", e))?
            .len();
        let created = existing_length == 0;

        #[allow(clippy::cast_sign_loss)] // Total length is positive and < 2^31.
        let total_length = total_length as u64;
        if !created && existing_length != total_length {
            return Err(LogError::InvalidTermLength {
                requested: i64::from(term_length),
                reason: "existing file length does not match this term length",
            });
        }

        file.set_len(total_length)
            .map_err(|e| LogError::io("size log file", e))?;

        // Safety: the file is held open for the lifetime of the mapping and
        // sized above; concurrent mappings of the same file are the point.
        let mut mmap =
            unsafe { MmapMut::map_mut(&file) }.map_err(|e| LogError::io("map log file", e))?;
        let ptr = mmap.as_mut_ptr();
        assert_eq!(ptr as usize % 8, 0, "mapping must be 8-byte aligned");

        debug!(
            path = %path.display(),
            term_length,
            total_length,
            created,
            "opened log buffers"
        );

        Ok(Self {
            mmap,
            ptr,
            term_length,
            page_size,
            created,
        })
    }

    /// Returns the term length in bytes.
    #[must_use]
    pub const fn term_length(&self) -> i32 {
        self.term_length
    }

    /// Returns the OS page size the metadata blocks were sized with.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the total mapped length in bytes.
    #[must_use]
    pub fn log_length(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if `open` created the file rather than reopening it.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.created
    }

    #[allow(clippy::cast_sign_loss)] // Term length is positive.
    const fn term_length_usize(&self) -> usize {
        self.term_length as usize
    }

    /// Returns the term buffer for a partition.
    ///
    /// # Panics
    /// Panics if `index` is not a valid partition index.
    #[must_use]
    pub fn term_buffer(&self, index: usize) -> AtomicBuffer {
        assert!(index < PARTITION_COUNT, "partition index out of range");
        let offset = index * self.term_length_usize();
        // Safety: offset and length lie inside the mapping by construction.
        AtomicBuffer::new(
            unsafe { self.ptr.add(offset) },
            self.term_length_usize(),
        )
    }

    /// Returns the term metadata block for a partition.
    ///
    /// # Panics
    /// Panics if `index` is not a valid partition index.
    #[must_use]
    pub fn term_metadata(&self, index: usize) -> AtomicBuffer {
        assert!(index < PARTITION_COUNT, "partition index out of range");
        let metadata_length = term_metadata_length(self.page_size);
        let offset = PARTITION_COUNT * self.term_length_usize() + index * metadata_length;
        // Safety: as `term_buffer`.
        AtomicBuffer::new(unsafe { self.ptr.add(offset) }, metadata_length)
    }

    /// Returns the log metadata block.
    #[must_use]
    pub fn log_metadata(&self) -> AtomicBuffer {
        let offset = PARTITION_COUNT
            * (self.term_length_usize() + term_metadata_length(self.page_size));
        // Safety: as `term_buffer`.
        AtomicBuffer::new(
            unsafe { self.ptr.add(offset) },
            log_metadata_length(self.page_size),
        )
    }
}

/// Queries the OS page size, falling back to 4 KiB.
fn os_page_size() -> usize {
    #[cfg(unix)]
    {
        // Safety: sysconf reads a system constant and touches no memory.
        let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if value > 0 {
            #[allow(clippy::cast_sign_loss)] // Checked positive above.
            return value as usize;
        }
    }
    4096
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::TERM_LENGTH_BYTES_MIN;

    fn temp_log_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join("test.log")
    }

    #[test]
    fn test_open_creates_file_with_expected_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);

        let buffers = LogBuffers::open(&path, TERM_LENGTH_BYTES_MIN).unwrap();
        assert!(buffers.is_created());

        let expected = 3 * (TERM_LENGTH_BYTES_MIN as usize + buffers.page_size())
            + buffers.page_size();
        assert_eq!(buffers.log_length(), expected);
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, expected);
    }

    #[test]
    fn test_views_have_expected_capacities() {
        let dir = tempfile::tempdir().unwrap();
        let buffers = LogBuffers::open(&temp_log_path(&dir), TERM_LENGTH_BYTES_MIN).unwrap();

        for index in 0..PARTITION_COUNT {
            assert_eq!(
                buffers.term_buffer(index).capacity(),
                TERM_LENGTH_BYTES_MIN as usize
            );
            assert_eq!(
                buffers.term_metadata(index).capacity(),
                buffers.page_size()
            );
        }
        assert_eq!(buffers.log_metadata().capacity(), buffers.page_size());
    }

    #[test]
    fn test_fresh_mapping_is_zeroed() {
        let dir = tempfile::tempdir().unwrap();
        let buffers = LogBuffers::open(&temp_log_path(&dir), TERM_LENGTH_BYTES_MIN).unwrap();

        for index in 0..PARTITION_COUNT {
            assert_eq!(buffers.term_metadata(index).get_i64(0), 0);
            assert_eq!(buffers.term_buffer(index).get_i32(0), 0);
        }
    }

    #[test]
    fn test_reopen_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);

        {
            let buffers = LogBuffers::open(&path, TERM_LENGTH_BYTES_MIN).unwrap();
            buffers.term_buffer(0).put_i32(0, 77);
        }

        let reopened = LogBuffers::open(&path, TERM_LENGTH_BYTES_MIN).unwrap();
        assert!(!reopened.is_created());
        assert_eq!(reopened.term_buffer(0).get_i32(0), 77);
    }

    #[test]
    fn test_reopen_with_mismatched_term_length_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);

        let _buffers = LogBuffers::open(&path, TERM_LENGTH_BYTES_MIN).unwrap();

        let result = LogBuffers::open(&path, TERM_LENGTH_BYTES_MIN * 2);
        assert!(matches!(
            result,
            Err(LogError::InvalidTermLength { .. })
        ));
    }

    #[test]
    fn test_invalid_term_length_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);

        // Not a power of two.
        assert!(LogBuffers::open(&path, TERM_LENGTH_BYTES_MIN + 1).is_err());
        // Below the minimum.
        assert!(LogBuffers::open(&path, 4096).is_err());
    }
}
