//! UUIDv7 utilities for time-ordered identifiers.
//!
//! Note ids are UUIDv7: the first 48 bits embed a millisecond Unix
//! timestamp, so ids sort roughly by creation time and make a stable
//! tiebreak for creation-order sorting.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
