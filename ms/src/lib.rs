//! musestore - generic persistent record and checkpoint storage
//!
//! A small SQLite-backed store with two surfaces:
//!
//! - **Records**: JSON documents implementing the [`Record`] trait, grouped
//!   into collections, with a side table of indexed fields for filtered
//!   listing (status, owner, parent, ...).
//! - **Checkpoints**: opaque JSON blobs keyed by a continuation/thread id,
//!   used by callers to persist resumable state between process restarts.
//!
//! The store is single-writer: `open` takes an exclusive advisory lock on the
//! data directory so two processes cannot corrupt each other's indexes.

mod error;
mod record;
mod store;

pub use error::StoreError;
pub use record::{Filter, FilterOp, IndexValue, Record};
pub use store::Store;

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        // 2020-01-01 in Unix millis; anything older means a broken clock source
        assert!(now_ms() > 1_577_836_800_000);
    }
}
