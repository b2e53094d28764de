use std::collections::BTreeMap;
use std::fmt;

use crate::memory::{MemoryError, Observation, Pointer, Range};

/// Default arena for temporary buffers; high enough to stay clear of captured pointers.
pub const DEFAULT_TEMP_BASE: u64 = 0x7f00_0000_0000;
pub const DEFAULT_TEMP_SIZE: u64 = 64 << 20;

/// Round `value` up to the nearest multiple of `alignment`.
///
/// `alignment` must be > 0.
pub(crate) fn align_up(value: u64, alignment: u64) -> Option<u64> {
    debug_assert!(alignment > 0);
    let add = alignment - 1;
    value.checked_add(add).map(|v| v / alignment * alignment)
}

/// First-fit allocator handing out ranges of the shadow pool for synthesized atoms.
///
/// Tracks address ranges only; the bytes reach the pool through the read observations of
/// the atoms that use them.
#[derive(Clone)]
pub struct Allocator {
    base: u64,
    capacity: u64,
    /// base -> size of every live allocation.
    live: BTreeMap<u64, u64>,
}

impl Allocator {
    /// Create an allocator over `[base, base + capacity)`.
    pub fn new(base: u64, capacity: u64) -> Self {
        Self {
            base,
            capacity,
            live: BTreeMap::new(),
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    fn end(&self) -> u64 {
        self.base.saturating_add(self.capacity)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_allocated(&self, range: Range) -> bool {
        self.live.get(&range.base) == Some(&range.size.max(1))
    }

    /// Allocate `size` bytes aligned to `alignment`.
    ///
    /// Zero-sized requests still reserve one byte so every allocation has a distinct address.
    pub fn alloc(&mut self, size: u64, alignment: u64) -> Result<Range, MemoryError> {
        let alignment = alignment.max(1);
        let reserve = size.max(1);
        let err = MemoryError::OutOfMemory {
            requested: size,
            align: alignment,
        };

        let mut cursor = self.base;
        let mut gap = None;
        for (&start, &len) in &self.live {
            let candidate = align_up(cursor, alignment).ok_or_else(|| err.clone())?;
            let candidate_end = candidate.checked_add(reserve).ok_or_else(|| err.clone())?;
            if candidate_end <= start {
                gap = Some(candidate);
                break;
            }
            cursor = cursor.max(start + len);
        }

        let candidate = match gap {
            Some(candidate) => candidate,
            None => {
                let candidate = align_up(cursor, alignment).ok_or_else(|| err.clone())?;
                let candidate_end = candidate.checked_add(reserve).ok_or_else(|| err.clone())?;
                if candidate_end > self.end() {
                    return Err(err);
                }
                candidate
            }
        };
        self.live.insert(candidate, reserve);
        Ok(Range::new(candidate, size))
    }

    pub fn free(&mut self, range: Range) -> Result<(), MemoryError> {
        match self.live.get(&range.base) {
            Some(&reserved) if reserved == range.size.max(1) => {
                self.live.remove(&range.base);
                Ok(())
            }
            _ => Err(MemoryError::NotAllocated(range)),
        }
    }

    /// Allocate a buffer holding `data` and return a handle usable as an atom argument.
    pub fn alloc_data(&mut self, data: Vec<u8>, alignment: u64) -> Result<TempAlloc, MemoryError> {
        let range = self.alloc(data.len() as u64, alignment)?;
        Ok(TempAlloc { range, data })
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_BASE, DEFAULT_TEMP_SIZE)
    }
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("base", &self.base)
            .field("capacity", &self.capacity)
            .field("live", &self.live.len())
            .finish()
    }
}

/// A temporary buffer reserved in the shadow pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TempAlloc {
    range: Range,
    data: Vec<u8>,
}

impl TempAlloc {
    pub fn ptr(&self) -> Pointer {
        Pointer(self.range.base)
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The buffer contents as an observation to attach to the atom that reads or writes it.
    pub fn observation(&self) -> Observation {
        Observation::new(self.range, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_multiple() {
        assert_eq!(align_up(0, 4), Some(0));
        assert_eq!(align_up(1, 4), Some(4));
        assert_eq!(align_up(5, 8), Some(8));
        assert_eq!(align_up(u64::MAX, 16), None);
    }

    #[test]
    fn alloc_respects_alignment_and_capacity() {
        let mut a = Allocator::new(0x1000, 64);
        let first = a.alloc(1, 1).unwrap();
        assert_eq!(first.base, 0x1000);
        let second = a.alloc(1, 16).unwrap();
        assert_eq!(second.base, 0x1010);
        let third = a.alloc(16, 32).unwrap();
        assert_eq!(third.base, 0x1020);
        assert!(matches!(a.alloc(33, 1), Err(MemoryError::OutOfMemory { .. })));
    }

    #[test]
    fn freed_space_is_reused_first_fit() {
        let mut a = Allocator::new(0, 32);
        let x = a.alloc(8, 1).unwrap();
        let y = a.alloc(8, 1).unwrap();
        a.free(x).unwrap();
        assert!(!a.is_allocated(x));
        assert!(a.is_allocated(y));
        assert_eq!(a.alloc(4, 1).unwrap().base, 0);
    }

    #[test]
    fn double_free_is_rejected() {
        let mut a = Allocator::new(0, 32);
        let x = a.alloc(4, 4).unwrap();
        a.free(x).unwrap();
        assert_eq!(a.free(x), Err(MemoryError::NotAllocated(x)));
    }

    #[test]
    fn zero_sized_allocations_are_distinct() {
        let mut a = Allocator::new(0, 8);
        let x = a.alloc(0, 1).unwrap();
        let y = a.alloc(0, 1).unwrap();
        assert_ne!(x.base, y.base);
        a.free(x).unwrap();
    }

    #[test]
    fn alloc_data_observation_matches_range() {
        let mut a = Allocator::new(0x2000, 64);
        let tmp = a.alloc_data(vec![1, 2, 3, 4], 4).unwrap();
        assert_eq!(tmp.ptr(), Pointer(0x2000));
        let obs = tmp.observation();
        assert_eq!(obs.range, Range::new(0x2000, 4));
        assert_eq!(obs.data, vec![1, 2, 3, 4]);
    }
}
