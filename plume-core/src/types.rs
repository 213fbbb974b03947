//! Strongly-typed identifiers for Plume entities.
//!
//! Following `TigerStyle`: explicit types prevent bugs from mixing up IDs.
//! All IDs are 32-bit signed values because that is exactly how they travel
//! in the frame header.

use std::fmt;

/// Macro to generate strongly-typed ID wrappers over `i32`.
///
/// Each ID type provides:
/// - Type safety (can't mix a `StreamId` with a `SessionId`)
/// - Debug/Display formatting
/// - Zero-cost abstraction (same layout as a raw i32)
macro_rules! define_id {
    ($name:ident, $prefix:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Creates a new ID from a raw i32 value.
            #[inline]
            #[must_use]
            pub const fn new(value: i32) -> Self {
                Self(value)
            }

            /// Returns the raw i32 value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.get()
            }
        }
    };
}

define_id!(SessionId, "session", "Identifies one publisher instance of a log.");
define_id!(StreamId, "stream", "Identifies the logical stream carried by a log.");
define_id!(TermId, "term", "Identifies one term of the rotating log.");

impl TermId {
    /// Returns the ID of the following term.
    ///
    /// # Panics
    /// Panics if the term ID would overflow. A log would need 2^31 rotations
    /// to get here.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        assert!(self.0 < i32::MAX, "term ID overflow");
        Self(self.0 + 1)
    }

    /// Returns how many terms this ID lies past `initial`.
    #[inline]
    #[must_use]
    pub const fn count_since(self, initial: Self) -> i64 {
        self.0 as i64 - initial.0 as i64
    }
}
