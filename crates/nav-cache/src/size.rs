//! Approximate memory accounting for cached values

use serde::Serialize;
use std::io;

/// `io::Write` sink that only counts bytes
#[derive(Debug, Default)]
struct ByteCounter(u64);

impl io::Write for ByteCounter {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len() as u64;
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Estimate the size of a value from the length of its JSON encoding.
///
/// Values that cannot be encoded (non-string map keys, failing custom
/// `Serialize` impls) fall back to their in-memory size; the error is
/// logged and never returned.
#[must_use]
pub fn estimate_value_size<V: Serialize>(value: &V) -> u64 {
    let mut counter = ByteCounter::default();
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        Err(err) => {
            let fallback = std::mem::size_of::<V>() as u64;
            tracing::warn!(
                error = %err,
                fallback_bytes = fallback,
                "value not serializable, using in-memory size estimate"
            );
            fallback
        }
    }
}

/// Estimated size of a stored entry: key bytes plus value estimate
#[inline]
#[must_use]
pub fn estimate_entry_size<V: Serialize>(key: &str, value: &V) -> u64 {
    key.len() as u64 + estimate_value_size(value)
}
