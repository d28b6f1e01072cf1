use parking_lot::Mutex;

use crate::{LodestoneError, Result};

/// Issues permanent, never-reused accession values.
///
/// Implementations must be safe under concurrent callers: two allocations
/// may interleave but must never overlap, and a value stays burned even
/// if the caller crashes before using it.
pub trait AccessionAllocator: Send + Sync {
    /// Reserve an ordered block of `count` unused accessions.
    fn allocate(&self, count: usize) -> Result<Vec<u64>>;
}

/// Mutex-guarded high-water-mark allocator with an exclusive upper bound.
///
/// Restart safety comes from constructing it above the highest accession
/// already persisted; the mark only ever moves forward.
pub struct MonotonicBlockAllocator {
    next: Mutex<u64>,
    end: u64,
}

impl MonotonicBlockAllocator {
    /// Allocator over the full range starting at `first`.
    pub fn new(first: u64) -> Self {
        Self::with_range(first, u64::MAX)
    }

    /// Allocator issuing values in `first..end`.
    pub fn with_range(first: u64, end: u64) -> Self {
        Self {
            next: Mutex::new(first),
            end,
        }
    }

    /// The next value that would be issued; persist this across restarts.
    pub fn high_water_mark(&self) -> u64 {
        *self.next.lock()
    }
}

impl AccessionAllocator for MonotonicBlockAllocator {
    fn allocate(&self, count: usize) -> Result<Vec<u64>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut next = self.next.lock();
        let block_end = next
            .checked_add(count as u64)
            .filter(|end| *end <= self.end)
            .ok_or_else(|| {
                LodestoneError::Allocation(format!(
                    "accession space exhausted: block of {} starting at {} exceeds {}",
                    count, *next, self.end
                ))
            })?;
        let block: Vec<u64> = (*next..block_end).collect();
        *next = block_end;
        Ok(block)
    }
}
