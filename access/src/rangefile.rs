//! Read-only binary range-file store.
//!
//! Little-endian header: `magic(4B) | version:u16 | s2_level:u8 |
//! mode:u8 (1=allow-list, 0=deny-list) | range_count:u32`, followed by
//! `range_count` ascending, disjoint `(start:u64, end:u64)` pairs. The
//! file is memory-mapped and searched without ever materializing the
//! whole range list into a heap allocation.

use memmap2::{Mmap, MmapOptions};
use shared::Mode;
use std::fs::File;
use std::path::Path;

const MAGIC: &[u8; 4] = b"SRNG";
const SUPPORTED_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4;
const ENTRY_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum RangeFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file too short to contain a header ({len} bytes)")]
    TruncatedHeader { len: usize },
    #[error("bad magic bytes, not a range file")]
    BadMagic,
    #[error("unsupported range file version {0}")]
    UnsupportedVersion(u16),
    #[error("S2 level {0} outside the valid range 4..=30")]
    InvalidLevel(u8),
    #[error("declared range_count {declared} doesn't match body length")]
    BodyLengthMismatch { declared: u32 },
    #[error("range {index} is empty or inverted (start >= end)")]
    EmptyOrInvertedRange { index: u32 },
    #[error("ranges are not strictly increasing/disjoint at index {index}")]
    RangesNotSorted { index: u32 },
}

/// A `[start, end)` S2-cell-id interval, at the file's declared level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct S2Range {
    pub start: u64,
    pub end: u64,
}

/// A validated, memory-mapped range file.
pub struct RangeFile {
    mmap: Mmap,
    level: u8,
    mode: Mode,
    range_count: u32,
}

impl RangeFile {
    /// Opens and fully validates `path`. Every structural invariant
    /// (magic, version, level range, strictly-increasing disjoint ranges)
    /// is checked here, up front, so a successfully-returned `RangeFile`
    /// never needs to re-validate on `find`.
    pub fn open(path: &Path) -> Result<Self, RangeFileError> {
        let file = File::open(path)?;
        // SAFETY: the file is not expected to be concurrently truncated
        // or rewritten while mapped; this matches the read-only,
        // externally-delivered-then-immutable lifecycle of a range file
        // under `configstore`'s private directory.
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        if mmap.len() < HEADER_LEN {
            return Err(RangeFileError::TruncatedHeader { len: mmap.len() });
        }
        if &mmap[0..4] != MAGIC {
            return Err(RangeFileError::BadMagic);
        }
        let version = u16::from_le_bytes([mmap[4], mmap[5]]);
        if version != SUPPORTED_VERSION {
            return Err(RangeFileError::UnsupportedVersion(version));
        }
        let level = mmap[6];
        if !(crate::s2::MIN_LEVEL..=crate::s2::MAX_LEVEL).contains(&level) {
            return Err(RangeFileError::InvalidLevel(level));
        }
        let mode = if mmap[7] != 0 {
            Mode::AllowList
        } else {
            Mode::DenyList
        };
        let range_count = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]);

        let expected_len = HEADER_LEN + range_count as usize * ENTRY_LEN;
        if mmap.len() != expected_len {
            return Err(RangeFileError::BodyLengthMismatch {
                declared: range_count,
            });
        }

        let file = RangeFile {
            mmap,
            level,
            mode,
            range_count,
        };
        file.validate_ranges()?;
        Ok(file)
    }

    fn validate_ranges(&self) -> Result<(), RangeFileError> {
        let mut previous_end: Option<u64> = None;
        for index in 0..self.range_count {
            let range = self.range_at(index);
            if range.start >= range.end {
                return Err(RangeFileError::EmptyOrInvertedRange { index });
            }
            if let Some(prev_end) = previous_end
                && range.start < prev_end
            {
                return Err(RangeFileError::RangesNotSorted { index });
            }
            previous_end = Some(range.end);
        }
        Ok(())
    }

    fn range_at(&self, index: u32) -> S2Range {
        let offset = HEADER_LEN + index as usize * ENTRY_LEN;
        let bytes = &self.mmap[offset..offset + ENTRY_LEN];
        let start = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let end = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        S2Range { start, end }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_allowed_list(&self) -> bool {
        self.mode == Mode::AllowList
    }

    pub fn range_count(&self) -> u32 {
        self.range_count
    }

    /// Binary search for the range containing `cell_id`, if any.
    pub fn find(&self, cell_id: u64) -> Option<S2Range> {
        let mut lo = 0u32;
        let mut hi = self.range_count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let range = self.range_at(mid);
            if cell_id < range.start {
                hi = mid;
            } else if cell_id >= range.end {
                lo = mid + 1;
            } else {
                return Some(range);
            }
        }
        None
    }

    /// Releases the memory mapping. Equivalent to dropping the value;
    /// provided so call sites can express "close the file" explicitly
    /// rather than relying on scope exit.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use std::io::Write;

    pub fn write_range_file(path: &Path, level: u8, mode: Mode, ranges: &[(u64, u64)]) {
        let mut buf = Vec::with_capacity(HEADER_LEN + ranges.len() * ENTRY_LEN);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&SUPPORTED_VERSION.to_le_bytes());
        buf.push(level);
        buf.push(if mode == Mode::AllowList { 1 } else { 0 });
        buf.extend_from_slice(&(ranges.len() as u32).to_le_bytes());
        for (start, end) in ranges {
            buf.extend_from_slice(&start.to_le_bytes());
            buf.extend_from_slice(&end.to_le_bytes());
        }
        std::fs::File::create(path)
            .unwrap()
            .write_all(&buf)
            .unwrap();
    }
}
