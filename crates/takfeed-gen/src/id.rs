//! Unique token sources
//!
//! Converters ask for a token only when a record has no natural key, and the
//! drone simulator asks once for its serial. Passing the source in keeps both
//! reproducible under test.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait IdSource: Send + Sync {
    /// Return a token no earlier call has returned
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// UUID-shaped tokens counting up from 1
#[derive(Debug, Default)]
pub struct SequentialIdSource {
    next: AtomicU64,
}

impl SequentialIdSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        Uuid::from_u128(u128::from(n)).to_string()
    }
}
