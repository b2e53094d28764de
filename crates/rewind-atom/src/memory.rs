//! Shadow memory observed by atoms.
//!
//! Pointer-style atom arguments (strings, id arrays, vertex data) live in a sparse
//! [`Pool`]. An atom carries the byte ranges it reads and writes as [`Observation`]s;
//! reads are applied to the pool before the command takes effect, writes after.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("read of unobserved memory at 0x{address:x}")]
    Unmapped { address: u64 },
    #[error("address range overflow: base=0x{base:x} size=0x{size:x}")]
    Overflow { base: u64, size: u64 },
    #[error("observation at 0x{base:x} declares {declared} bytes but carries {actual}")]
    SizeMismatch {
        base: u64,
        declared: u64,
        actual: usize,
    },
    #[error("out of temporary memory: requested {requested} bytes (align {align})")]
    OutOfMemory { requested: u64, align: u64 },
    #[error("release of unallocated range {0}")]
    NotAllocated(Range),
}

/// Address in the shadow pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pointer(pub u64);

impl Pointer {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self, bytes: u64) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub base: u64,
    pub size: u64,
}

impl Range {
    pub fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    pub fn end(&self) -> Result<u64, MemoryError> {
        self.base.checked_add(self.size).ok_or(MemoryError::Overflow {
            base: self.base,
            size: self.size,
        })
    }

}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:x}, +0x{:x})", self.base, self.size)
    }
}

/// A byte range of the pool together with the bytes observed there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub range: Range,
    pub data: Vec<u8>,
}

impl Observation {
    pub fn new(range: Range, data: Vec<u8>) -> Self {
        Self { range, data }
    }

    /// Observation covering exactly `data` starting at `base`.
    pub fn at(base: Pointer, data: Vec<u8>) -> Self {
        let range = Range::new(base.0, data.len() as u64);
        Self { range, data }
    }

    /// Checks everything [`Pool::apply`] can reject, without touching a pool.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.range.size != self.data.len() as u64 {
            return Err(MemoryError::SizeMismatch {
                base: self.range.base,
                declared: self.range.size,
                actual: self.data.len(),
            });
        }
        self.range.end().map(drop)
    }
}

/// Segments replaced by logged writes; hand back to [`Pool::restore`] to undo them.
#[derive(Debug, Default)]
pub struct Displaced {
    /// One entry per write, oldest first.
    writes: Vec<DisplacedWrite>,
}

#[derive(Debug)]
struct DisplacedWrite {
    inserted: Vec<u64>,
    removed: Vec<(u64, Vec<u8>)>,
}

/// Sparse byte store backing pointer arguments.
///
/// Segments never overlap; a write replaces whatever it covers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pool {
    segments: BTreeMap<u64, Vec<u8>>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, observation: &Observation) -> Result<(), MemoryError> {
        observation.validate()?;
        self.write(observation.range.base, &observation.data)
    }

    /// Like [`Pool::apply`], recording what the write replaced into `log`.
    pub fn apply_logged(&mut self, observation: &Observation, log: &mut Displaced) -> Result<(), MemoryError> {
        observation.validate()?;
        let displaced = self.write_inner(observation.range.base, &observation.data)?;
        log.writes.push(displaced);
        Ok(())
    }

    /// Undo logged writes, newest first.
    pub fn restore(&mut self, log: Displaced) {
        for write in log.writes.into_iter().rev() {
            for start in write.inserted {
                self.segments.remove(&start);
            }
            self.segments.extend(write.removed);
        }
    }

    pub fn write(&mut self, base: u64, data: &[u8]) -> Result<(), MemoryError> {
        self.write_inner(base, data).map(drop)
    }

    fn write_inner(&mut self, base: u64, data: &[u8]) -> Result<DisplacedWrite, MemoryError> {
        let mut displaced = DisplacedWrite {
            inserted: Vec::new(),
            removed: Vec::new(),
        };
        if data.is_empty() {
            return Ok(displaced);
        }
        let end = Range::new(base, data.len() as u64).end()?;

        // Sorted and disjoint: walking backwards from `end`, the first segment that ends at or
        // before `base` means every earlier one does too.
        let overlapping: Vec<u64> = self
            .segments
            .range(..end)
            .rev()
            .take_while(|(&start, seg)| start + seg.len() as u64 > base)
            .map(|(&start, _)| start)
            .collect();

        for start in overlapping {
            let Some(seg) = self.segments.remove(&start) else {
                continue;
            };
            let seg_end = start + seg.len() as u64;
            if start < base {
                self.segments
                    .insert(start, seg[..(base - start) as usize].to_vec());
                displaced.inserted.push(start);
            }
            if seg_end > end {
                self.segments
                    .insert(end, seg[(end - start) as usize..].to_vec());
                displaced.inserted.push(end);
            }
            displaced.removed.push((start, seg));
        }

        self.segments.insert(base, data.to_vec());
        displaced.inserted.push(base);
        Ok(displaced)
    }

    /// Copies `range` out of the pool. The result only grows as far as observed bytes
    /// reach, so an oversized range fails at its first gap.
    pub fn read(&self, range: Range) -> Result<Vec<u8>, MemoryError> {
        let end = range.end()?;
        let mut out = Vec::new();
        let mut cursor = range.base;
        while cursor < end {
            let (&start, seg) = self
                .segments
                .range(..=cursor)
                .next_back()
                .ok_or(MemoryError::Unmapped { address: cursor })?;
            let seg_end = start + seg.len() as u64;
            if seg_end <= cursor {
                return Err(MemoryError::Unmapped { address: cursor });
            }
            let copy_end = seg_end.min(end);
            out.extend_from_slice(&seg[(cursor - start) as usize..(copy_end - start) as usize]);
            cursor = copy_end;
        }
        Ok(out)
    }

    pub fn read_u32s(&self, ptr: Pointer, count: usize) -> Result<Vec<u32>, MemoryError> {
        let bytes = self.read(Range::new(ptr.0, array_size(ptr, count, 4)?))?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    pub fn read_i32s(&self, ptr: Pointer, count: usize) -> Result<Vec<i32>, MemoryError> {
        Ok(self
            .read_u32s(ptr, count)?
            .into_iter()
            .map(|v| v as i32)
            .collect())
    }

    pub fn read_pointers(&self, ptr: Pointer, count: usize) -> Result<Vec<Pointer>, MemoryError> {
        let bytes = self.read(Range::new(ptr.0, array_size(ptr, count, 8)?))?;
        Ok(bytes
            .chunks_exact(8)
            .map(|c| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(c);
                Pointer(u64::from_le_bytes(raw))
            })
            .collect())
    }

    /// Reads a NUL-terminated string, scanning at most `limit` bytes.
    pub fn read_cstr(&self, ptr: Pointer, limit: u64) -> Result<Vec<u8>, MemoryError> {
        let mut out = Vec::new();
        for offset in 0..limit {
            let byte = self.read(Range::new(ptr.offset(offset).0, 1))?[0];
            if byte == 0 {
                break;
            }
            out.push(byte);
        }
        Ok(out)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

fn array_size(ptr: Pointer, count: usize, stride: u64) -> Result<u64, MemoryError> {
    u64::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(stride))
        .ok_or(MemoryError::Overflow {
            base: ptr.0,
            size: u64::MAX,
        })
}
