//! The append-log facade.
//!
//! [`AppendLog`] binds the substrate together: one [`LogBuffers`] mapping,
//! three term appenders, a poller thread delivering committed frames to the
//! consumer callback, and a background cleaner that zero-fills retired
//! partitions.
//!
//! # Threads
//!
//! Any number of producer threads may call [`claim`](AppendLog::claim) and
//! [`append`](AppendLog::append) concurrently. Exactly one consumer owns the
//! subscriber position: either the poller thread started with
//! [`start_polling`](AppendLog::start_polling), or manual calls to
//! [`poll`](AppendLog::poll), never both. The cleaner runs on its own named
//! thread and is woken on every rotation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use plume_core::{SessionId, StreamId, TermId, TERM_LENGTH_BYTES_MAX, TERM_LENGTH_BYTES_MIN};
use tracing::{debug, error, info, warn};

use crate::appender::{ClaimOutcome, TermAppender};
use crate::buffer::AtomicBuffer;
use crate::claim::BufferClaim;
use crate::descriptor::{
    compute_position, next_partition_index, pack_tail, partition_index, position_bits_to_shift,
    tail_offset_bounded, tail_term_id, LOG_ACTIVE_PARTITION_INDEX_OFFSET, LOG_INITIAL_TERM_ID_OFFSET,
    PARTITION_CLEAN, PARTITION_COUNT, PARTITION_IN_USE, PARTITION_NEEDS_CLEANING,
    TERM_STATUS_OFFSET, TERM_TAIL_COUNTER_OFFSET,
};
use crate::error::{LogError, LogResult};
use crate::frame::max_payload_length;
use crate::header::HeaderWriter;
use crate::log_buffers::LogBuffers;
use crate::reader;

/// Default term length: 16 MiB.
pub const TERM_LENGTH_BYTES_DEFAULT: i32 = 16 * 1024 * 1024;

/// Default number of failed retries before a stalled slot is unblocked.
pub const SPIN_LIMIT_BEFORE_UNBLOCK_DEFAULT: u32 = 100;

/// Default number of fragments delivered per poll iteration.
pub const POLL_FRAGMENT_LIMIT_DEFAULT: usize = 10;

/// Configuration for an [`AppendLog`].
#[derive(Debug, Clone)]
pub struct AppendLogConfig {
    /// Path of the mapped log file.
    pub path: PathBuf,
    /// Term length in bytes; power of two within the supported range.
    pub term_length: i32,
    /// Term ID the first term is numbered with. Only used when the file is
    /// created; a reopened log keeps the creator's value.
    pub initial_term_id: TermId,
    /// Stream ID stamped into every frame. Only used when the file is
    /// created.
    pub stream_id: StreamId,
    /// Failed claim retries with an unchanged tail before the stalled slot
    /// is unblocked.
    pub spin_limit_before_unblock: u32,
    /// Fragments delivered per poll iteration.
    pub poll_fragment_limit: usize,
}

impl AppendLogConfig {
    /// Creates a configuration with defaults for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            term_length: TERM_LENGTH_BYTES_DEFAULT,
            initial_term_id: TermId::new(0),
            stream_id: StreamId::new(1),
            spin_limit_before_unblock: SPIN_LIMIT_BEFORE_UNBLOCK_DEFAULT,
            poll_fragment_limit: POLL_FRAGMENT_LIMIT_DEFAULT,
        }
    }

    /// Sets the term length in bytes.
    #[must_use]
    pub const fn with_term_length(mut self, term_length: i32) -> Self {
        self.term_length = term_length;
        self
    }

    /// Sets the initial term ID.
    #[must_use]
    pub const fn with_initial_term_id(mut self, term_id: TermId) -> Self {
        self.initial_term_id = term_id;
        self
    }

    /// Sets the stream ID.
    #[must_use]
    pub const fn with_stream_id(mut self, stream_id: StreamId) -> Self {
        self.stream_id = stream_id;
        self
    }

    /// Sets the stall-unblock spin limit.
    ///
    /// # Panics
    /// Panics if the limit is zero.
    #[must_use]
    pub const fn with_spin_limit_before_unblock(mut self, limit: u32) -> Self {
        assert!(limit > 0, "spin limit must be positive");
        self.spin_limit_before_unblock = limit;
        self
    }

    /// Sets the per-iteration poll fragment limit.
    ///
    /// # Panics
    /// Panics if the limit is zero.
    #[must_use]
    pub const fn with_poll_fragment_limit(mut self, limit: usize) -> Self {
        assert!(limit > 0, "fragment limit must be positive");
        self.poll_fragment_limit = limit;
        self
    }
}

type AppendHandler = Box<dyn FnMut(&[u8]) + Send>;
type ErrorHandler = Box<dyn FnMut(&str) + Send>;
type HandlerSlot<T> = Arc<Mutex<Option<T>>>;

/// A multi-producer, single-consumer shared-memory append log.
///
/// Producers claim byte ranges with [`claim`](Self::claim), fill them, and
/// commit; the consumer receives committed payloads in order, either through
/// the poller thread and [`on_append`](Self::on_append) or through manual
/// [`poll`](Self::poll) calls.
pub struct AppendLog {
    buffers: Arc<LogBuffers>,
    appenders: [TermAppender; PARTITION_COUNT],
    header: HeaderWriter,
    log_metadata: AtomicBuffer,
    initial_term_id: TermId,
    position_bits: u32,
    spin_limit_before_unblock: u32,
    poll_fragment_limit: usize,
    subscriber_position: Arc<AtomicI64>,
    on_append: HandlerSlot<AppendHandler>,
    on_error: HandlerSlot<ErrorHandler>,
    running: Arc<AtomicBool>,
    poller: Option<JoinHandle<()>>,
    cleaner: Option<JoinHandle<()>>,
    cleaner_tx: Option<Sender<()>>,
}

impl AppendLog {
    /// Opens an append log sized to roughly `buffer_size_bytes`.
    ///
    /// The term length is derived as a third of the requested size, rounded
    /// up to the next power of two and clamped to the supported range.
    ///
    /// # Errors
    /// As [`open`](Self::open).
    pub fn new(path: impl AsRef<Path>, buffer_size_bytes: u64) -> LogResult<Self> {
        let term_length = derive_term_length(buffer_size_bytes);
        Self::open(AppendLogConfig::new(path.as_ref()).with_term_length(term_length))
    }

    /// Opens an append log with explicit configuration.
    ///
    /// Creates and initializes the mapped file if it does not exist;
    /// otherwise reopens it, keeping the creator's initial term ID and
    /// stream ID. A reopened consumer joins at the current producer
    /// position; frames published before the reopen are not replayed.
    ///
    /// # Errors
    /// Returns [`LogError::InvalidTermLength`] or [`LogError::Io`] from the
    /// mapping, or [`LogError::Io`] if the cleaner thread cannot start.
    pub fn open(config: AppendLogConfig) -> LogResult<Self> {
        let buffers = Arc::new(LogBuffers::open(&config.path, config.term_length)?);
        let created = buffers.is_created();
        let log_metadata = buffers.log_metadata();

        let (initial_term_id, stream_id) = if created {
            log_metadata.put_i32(LOG_INITIAL_TERM_ID_OFFSET, config.initial_term_id.get());
            (config.initial_term_id, config.stream_id)
        } else {
            let restored = HeaderWriter::from_defaults(&log_metadata);
            (
                TermId::new(log_metadata.get_i32(LOG_INITIAL_TERM_ID_OFFSET)),
                restored.stream_id(),
            )
        };

        // Each opener publishes under its own session; the stream follows
        // the file.
        let header = HeaderWriter::new(generate_session_id(), stream_id);

        if created {
            header.store_defaults(&log_metadata);
            initialize_partitions(&buffers, initial_term_id);
            log_metadata.put_i32_release(LOG_ACTIVE_PARTITION_INDEX_OFFSET, 0);
        }

        let appenders = [
            TermAppender::new(buffers.term_buffer(0), buffers.term_metadata(0)),
            TermAppender::new(buffers.term_buffer(1), buffers.term_metadata(1)),
            TermAppender::new(buffers.term_buffer(2), buffers.term_metadata(2)),
        ];

        let (cleaner_tx, cleaner_rx) = mpsc::channel();
        let cleaner = spawn_cleaner(Arc::clone(&buffers), cleaner_rx)?;

        let log = Self {
            header,
            log_metadata,
            initial_term_id,
            position_bits: position_bits_to_shift(buffers.term_length()),
            spin_limit_before_unblock: config.spin_limit_before_unblock,
            poll_fragment_limit: config.poll_fragment_limit,
            subscriber_position: Arc::new(AtomicI64::new(0)),
            on_append: Arc::new(Mutex::new(None)),
            on_error: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            poller: None,
            cleaner: Some(cleaner),
            cleaner_tx: Some(cleaner_tx),
            appenders,
            buffers,
        };

        if !created {
            log.subscriber_position
                .store(log.position(), Ordering::Release);
        }

        info!(
            path = %config.path.display(),
            term_length = log.buffers.term_length(),
            session_id = log.header.session_id().get(),
            created,
            "opened append log"
        );
        Ok(log)
    }

    /// Claims `length` payload bytes in the active term.
    ///
    /// Blocks with bounded spinning under contention. When the active term
    /// cannot fit the frame, the remainder is padded, the log rotates, and
    /// the claim retries in the fresh term; rotation is invisible to the
    /// caller.
    ///
    /// # Errors
    /// Returns [`LogError::InvalidFrameLength`] if `length` is zero or too
    /// large for a term.
    pub fn claim(&self, length: u32) -> LogResult<BufferClaim<'_>> {
        let max = max_payload_length(self.buffers.term_length());
        #[allow(clippy::cast_sign_loss)] // Max payload is positive for any valid term length.
        let max_unsigned = max as u32;
        if length == 0 || length > max_unsigned {
            return Err(LogError::InvalidFrameLength {
                length: i64::from(length),
                max,
            });
        }
        #[allow(clippy::cast_possible_wrap)] // Bounded by max payload above.
        let length = length as i32;

        loop {
            let active = self.active_partition_index();
            let outcome = self.appenders[active].claim(
                &self.header,
                length,
                self.spin_limit_before_unblock,
            );
            match outcome {
                ClaimOutcome::Claimed { claim, .. } => return Ok(claim),
                ClaimOutcome::Tripped { term_id } => self.rotate(active, term_id),
                ClaimOutcome::Failed {
                    term_id,
                    aligned_length,
                } => {
                    return Err(LogError::LogFull {
                        term_id: term_id.get(),
                        length: aligned_length,
                    })
                }
            }
        }
    }

    /// Claims, fills, and commits a frame in one call.
    ///
    /// # Errors
    /// As [`claim`](Self::claim).
    #[allow(clippy::cast_possible_wrap)] // Only for error reporting of oversized payloads.
    pub fn append(&self, payload: &[u8]) -> LogResult<()> {
        let length = u32::try_from(payload.len()).map_err(|_| LogError::InvalidFrameLength {
            length: payload.len() as i64,
            max: max_payload_length(self.buffers.term_length()),
        })?;
        let mut claim = self.claim(length)?;
        claim.payload_mut().copy_from_slice(payload);
        claim.commit();
        Ok(())
    }

    /// Registers the consumer callback for committed payloads.
    ///
    /// Single slot: a second call replaces the first handler. The payload
    /// view is valid only for the duration of the callback.
    pub fn on_append<F>(&self, handler: F)
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        *self.on_append.lock() = Some(Box::new(handler));
    }

    /// Registers the callback for errors caught inside the poll loop.
    pub fn on_error<F>(&self, handler: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        *self.on_error.lock() = Some(Box::new(handler));
    }

    /// Starts the poller thread.
    ///
    /// Idempotent while running. The poller delivers committed payloads to
    /// the [`on_append`](Self::on_append) handler, backing off with a
    /// spin-then-sleep cadence when idle. A handler panic is caught,
    /// surfaced through [`on_error`](Self::on_error), and the loop resumes.
    ///
    /// # Errors
    /// Returns [`LogError::Io`] if the thread cannot be spawned.
    pub fn start_polling(&mut self) -> LogResult<()> {
        if self.poller.is_some() {
            return Ok(());
        }
        self.running.store(true, Ordering::Release);

        let poller = Poller {
            buffers: Arc::clone(&self.buffers),
            subscriber_position: Arc::clone(&self.subscriber_position),
            on_append: Arc::clone(&self.on_append),
            on_error: Arc::clone(&self.on_error),
            running: Arc::clone(&self.running),
            position_bits: self.position_bits,
            fragment_limit: self.poll_fragment_limit,
        };
        let handle = thread::Builder::new()
            .name("plume-poller".to_string())
            .spawn(move || poller.run())
            .map_err(|e| LogError::io("spawn poller", e))?;

        self.poller = Some(handle);
        info!("started poller");
        Ok(())
    }

    /// Stops the poller thread and joins it.
    ///
    /// Idempotent; polling can be started again afterwards.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.poller.take() {
            if handle.join().is_err() {
                warn!("poller thread panicked");
            }
            info!("stopped poller");
        }
    }

    /// Polls committed frames manually, without the poller thread.
    ///
    /// Delivers up to `fragment_limit` payloads to `on_frame` and advances
    /// the subscriber position. For callers that own their consumer thread.
    ///
    /// # Panics
    /// Panics if the poller thread is running; the subscriber position has
    /// exactly one owner.
    pub fn poll<F>(&mut self, on_frame: &mut F, fragment_limit: usize) -> usize
    where
        F: FnMut(&[u8]),
    {
        assert!(
            self.poller.is_none(),
            "poll() must not race the poller thread"
        );
        let position = self.subscriber_position.load(Ordering::Acquire);
        let (new_position, fragments) = scan_once(
            &self.buffers,
            position,
            self.position_bits,
            fragment_limit,
            on_frame,
        );
        if new_position != position {
            self.subscriber_position.store(new_position, Ordering::Release);
        }
        fragments
    }

    /// Returns the producer position: the stream coordinate of the tail of
    /// the active term.
    #[must_use]
    pub fn position(&self) -> i64 {
        let active = self.active_partition_index();
        let raw_tail = self.appenders[active].raw_tail();
        compute_position(
            tail_term_id(raw_tail),
            tail_offset_bounded(raw_tail, self.buffers.term_length()),
            self.position_bits,
            self.initial_term_id,
        )
    }

    /// Returns the consumer position: the stream coordinate the next poll
    /// resumes from.
    #[must_use]
    pub fn subscriber_position(&self) -> i64 {
        self.subscriber_position.load(Ordering::Acquire)
    }

    /// Returns the session ID this instance publishes under.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.header.session_id()
    }

    /// Returns the term length in bytes.
    #[must_use]
    pub fn term_length(&self) -> i32 {
        self.buffers.term_length()
    }

    #[allow(clippy::cast_sign_loss)] // The active index is always in 0..3.
    fn active_partition_index(&self) -> usize {
        let index = self
            .log_metadata
            .get_i32_acquire(LOG_ACTIVE_PARTITION_INDEX_OFFSET);
        debug_assert!((0..PARTITION_COUNT as i32).contains(&index));
        index as usize
    }

    /// Advances the active partition after a trip of `term_id`.
    ///
    /// The tail reset of the incoming partition is a CAS, so exactly one
    /// trip-observer performs the rotation; the rest see the reset tail (or
    /// the moved active index) and simply retry their claim.
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)] // Indices are in 0..3.
    fn rotate(&self, observed_active: usize, term_id: TermId) {
        let next = next_partition_index(observed_active);
        let next_next = next_partition_index(next);
        let next_term_id = term_id.next();

        let next_metadata = self.buffers.term_metadata(next);

        // The incoming partition must be fully zeroed before producers claim
        // in it. The acquire read pairs with the cleaner's release store of
        // CLEAN, so the zero-fill is visible before the tail CAS activates
        // the partition.
        while next_metadata.get_i32_acquire(TERM_STATUS_OFFSET) == PARTITION_NEEDS_CLEANING {
            std::hint::spin_loop();
        }

        let old_tail = next_metadata.get_i64_acquire(TERM_TAIL_COUNTER_OFFSET);
        if tail_term_id(old_tail).get() >= next_term_id.get() {
            return;
        }
        if !next_metadata.cas_i64(
            TERM_TAIL_COUNTER_OFFSET,
            old_tail,
            pack_tail(next_term_id, 0),
        ) {
            return;
        }

        next_metadata.put_i32_release(TERM_STATUS_OFFSET, PARTITION_IN_USE);
        self.buffers
            .term_metadata(next_next)
            .put_i32_release(TERM_STATUS_OFFSET, PARTITION_NEEDS_CLEANING);
        self.log_metadata.cas_i32(
            LOG_ACTIVE_PARTITION_INDEX_OFFSET,
            observed_active as i32,
            next as i32,
        );
        if let Some(tx) = &self.cleaner_tx {
            let _ = tx.send(());
        }

        debug!(
            term_id = next_term_id.get(),
            active_partition = next,
            "rotated log"
        );
    }
}

impl Drop for AppendLog {
    fn drop(&mut self) {
        self.stop();
        // Closing the channel ends the cleaner at its next receive.
        self.cleaner_tx = None;
        if let Some(handle) = self.cleaner.take() {
            let _ = handle.join();
        }
    }
}

/// Stamps fresh tails and statuses into a newly created log.
fn initialize_partitions(buffers: &LogBuffers, initial_term_id: TermId) {
    for index in 0..PARTITION_COUNT {
        let metadata = buffers.term_metadata(index);
        // Partition 0 carries the initial term; the others carry the term
        // IDs they would have held one full cycle earlier, which is what
        // the rotation CAS expects to replace.
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)] // Index is in 0..3.
        let term_id = if index == 0 {
            initial_term_id
        } else {
            TermId::new(initial_term_id.get() + index as i32 - PARTITION_COUNT as i32)
        };
        metadata.put_i64(TERM_TAIL_COUNTER_OFFSET, pack_tail(term_id, 0));
        metadata.put_i32(
            TERM_STATUS_OFFSET,
            if index == 0 {
                PARTITION_IN_USE
            } else {
                PARTITION_CLEAN
            },
        );
    }
}

/// Derives a term length from a requested total buffer size.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)] // Clamped below i32::MAX.
fn derive_term_length(buffer_size_bytes: u64) -> i32 {
    let per_term = buffer_size_bytes.div_ceil(PARTITION_COUNT as u64);
    per_term
        .next_power_of_two()
        .clamp(TERM_LENGTH_BYTES_MIN as u64, TERM_LENGTH_BYTES_MAX as u64) as i32
}

/// Builds a session ID from the process ID and start time.
///
/// The 64-bit `(pid << 32) | start_seconds` pack is folded into the header's
/// 32-bit field by XORing the halves, so two publishers on one host get
/// distinct sessions even within the same second.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)] // Folding is intentional.
fn generate_session_id() -> SessionId {
    let pid = u64::from(std::process::id());
    let start_seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    let packed = (pid << 32) | (start_seconds & 0xFFFF_FFFF);
    SessionId::new(((packed >> 32) ^ (packed & 0xFFFF_FFFF)) as i32)
}

/// Scans from `position`, delivering committed payloads in order.
///
/// Returns the advanced position and the number of fragments delivered.
/// Consuming a term's trailing padding advances the position to the term
/// boundary, so the next scan naturally lands at offset zero of the next
/// partition.
#[allow(clippy::cast_possible_truncation)] // Offsets are masked below the term length.
fn scan_once<F>(
    buffers: &LogBuffers,
    position: i64,
    position_bits: u32,
    fragment_limit: usize,
    on_frame: &mut F,
) -> (i64, usize)
where
    F: FnMut(&[u8]),
{
    let term_length = buffers.term_length();
    let index = partition_index(position >> position_bits);
    let term_offset = (position & i64::from(term_length - 1)) as i32;

    let term = buffers.term_buffer(index);
    let outcome = reader::read(&term, term_offset, fragment_limit, on_frame);

    (
        position + i64::from(outcome.new_offset - term_offset),
        outcome.fragments_read,
    )
}

/// The consumer-side poll loop.
struct Poller {
    buffers: Arc<LogBuffers>,
    subscriber_position: Arc<AtomicI64>,
    on_append: HandlerSlot<AppendHandler>,
    on_error: HandlerSlot<ErrorHandler>,
    running: Arc<AtomicBool>,
    position_bits: u32,
    fragment_limit: usize,
}

impl Poller {
    fn run(self) {
        let mut idle = IdleStrategy::new();
        while self.running.load(Ordering::Acquire) {
            if self.poll_once() == 0 {
                idle.idle();
            } else {
                idle.reset();
            }
        }
    }

    /// One poll iteration. Handler panics are contained here; the loop
    /// itself never unwinds.
    fn poll_once(&self) -> usize {
        let position = self.subscriber_position.load(Ordering::Acquire);
        let mut on_append = self.on_append.lock();

        let (new_position, fragments) = scan_once(
            &self.buffers,
            position,
            self.position_bits,
            self.fragment_limit,
            &mut |payload| {
                let Some(handler) = on_append.as_mut() else {
                    return;
                };
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                    let message = panic_message(panic.as_ref());
                    error!(message, "append handler panicked; poll loop continues");
                    if let Some(on_error) = self.on_error.lock().as_mut() {
                        let _ = catch_unwind(AssertUnwindSafe(|| on_error(message)));
                    }
                }
            },
        );

        if new_position != position {
            self.subscriber_position
                .store(new_position, Ordering::Release);
        }
        fragments
    }
}

/// Extracts a printable message from a caught panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("append handler panicked")
}

/// Spin-then-sleep idle cadence for the poll loop.
struct IdleStrategy {
    count: u32,
}

impl IdleStrategy {
    const SPIN_ITERATIONS: u32 = 64;
    const YIELD_ITERATIONS: u32 = 96;

    const fn new() -> Self {
        Self { count: 0 }
    }

    fn reset(&mut self) {
        self.count = 0;
    }

    fn idle(&mut self) {
        if self.count < Self::SPIN_ITERATIONS {
            std::hint::spin_loop();
        } else if self.count < Self::YIELD_ITERATIONS {
            thread::yield_now();
        } else {
            // Escalate from 1us to ~1ms and hold there.
            let exponent = (self.count - Self::YIELD_ITERATIONS).min(10);
            thread::sleep(Duration::from_micros(1u64 << exponent));
        }
        self.count = self.count.saturating_add(1);
    }
}

/// Starts the cleaner thread.
///
/// The cleaner zero-fills any partition marked for cleaning each time a
/// rotation wakes it, and exits when the log is dropped. A partition that
/// cannot be cleaned would serve torn frames once reused, so a panic on
/// this thread halts the process instead of resuming.
fn spawn_cleaner(
    buffers: Arc<LogBuffers>,
    work_rx: Receiver<()>,
) -> LogResult<JoinHandle<()>> {
    thread::Builder::new()
        .name("plume-cleaner".to_string())
        .spawn(move || {
            if catch_unwind(AssertUnwindSafe(|| cleaner_loop(&buffers, &work_rx))).is_err() {
                error!("cleaner failed; aborting process");
                std::process::abort();
            }
        })
        .map_err(|e| LogError::io("spawn cleaner", e))
}

fn cleaner_loop(buffers: &LogBuffers, work_rx: &Receiver<()>) {
    while work_rx.recv().is_ok() {
        for index in 0..PARTITION_COUNT {
            let metadata = buffers.term_metadata(index);
            if metadata.get_i32_acquire(TERM_STATUS_OFFSET) == PARTITION_NEEDS_CLEANING {
                let term = buffers.term_buffer(index);
                term.set_memory(0, term.capacity(), 0);
                metadata.put_i32_release(TERM_STATUS_OFFSET, PARTITION_CLEAN);
                debug!(partition = index, "cleaned retired term");
            }
        }
    }
}
