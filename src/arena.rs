use crate::error::ConfigError;
use std::ops::Range;

/// Bump allocator over a fixed window of word addresses.
///
/// Hands out consecutive, non-overlapping ranges; nothing is ever freed
/// individually, the whole window is reclaimed with `reset`.
#[derive(Debug, Clone)]
pub struct Arena {
    base: usize,
    cursor: usize,
    limit: usize,
}

impl Arena {
    pub fn new(window: Range<usize>) -> Arena {
        Arena {
            base: window.start,
            cursor: window.start,
            limit: window.end,
        }
    }

    /// Takes the next `len` words.
    pub fn take(&mut self, len: usize) -> Option<Range<usize>> {
        let end = self.cursor.checked_add(len)?;
        if end > self.limit {
            return None;
        }
        let range = self.cursor..end;
        self.cursor = end;
        Some(range)
    }

    /// Takes the next `len` words of private memory, reporting the total
    /// requirement on overflow.
    pub fn take_local(&mut self, len: usize) -> Result<Range<usize>, ConfigError> {
        let used = self.used();
        let available = self.capacity();
        self.take(len).ok_or(ConfigError::OutOfLocalMemory {
            required: used.saturating_add(len),
            available,
        })
    }

    /// Takes the next `len` words of DRAM.
    pub fn take_dram(&mut self, len: usize) -> Result<Range<usize>, ConfigError> {
        let available = self.limit - self.cursor;
        self.take(len)
            .ok_or(ConfigError::OutOfDram { required: len, available })
    }

    pub fn reset(&mut self) {
        self.cursor = self.base;
    }

    pub fn used(&self) -> usize {
        self.cursor - self.base
    }

    pub fn capacity(&self) -> usize {
        self.limit - self.base
    }
}
