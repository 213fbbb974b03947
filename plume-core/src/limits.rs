//! Hard bounds for log geometry.
//!
//! Following `TigerStyle`: put limits on everything. Term lengths outside
//! these bounds are rejected at construction, never clamped silently.

/// Minimum length of a single term buffer in bytes (64 KiB).
pub const TERM_LENGTH_BYTES_MIN: i32 = 64 * 1024;

/// Maximum length of a single term buffer in bytes (512 MiB).
///
/// Chosen so that three terms plus metadata always fit below
/// [`LOG_LENGTH_BYTES_MAX`] without a multi-segment mapping.
pub const TERM_LENGTH_BYTES_MAX: i32 = 512 * 1024 * 1024;

/// Maximum total length of the mapped log file in bytes.
///
/// Frame offsets and tail offsets travel as 32-bit signed values, so the
/// whole mapping must stay below 2^31.
pub const LOG_LENGTH_BYTES_MAX: i64 = i32::MAX as i64;
