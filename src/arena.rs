//! Per-worker bump allocator over a file-backed memory mapping.
//!
//! Each worker owns exactly one `Arena`, created against a sparse scratch
//! file sized to the configured capacity. Allocation only ever advances an
//! offset; nothing is ever freed individually, and the whole mapping is
//! reclaimed by the OS at process exit. This gives O(1) allocation with a
//! predictable footprint and lets the OS page scratch out to disk when
//! physical RAM is tight, at the cost of never being able to shrink.
//!
//! The arena is used to intern the owner-uuid and object-uuid strings that
//! `Owner`/`Object` records reference: once written, those bytes never move
//! or get copied again, which is the pointer stability property merging
//! depends on. The `Owner`/`Object` records themselves stay small and
//! fixed-size, and are moved by value between containers during merge.

use crate::error::ReduceError;
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;

fn round_up_8(n: usize) -> usize {
    (n + 7) & !7
}

pub struct Arena {
    mmap: MmapMut,
    offset: usize,
    capacity: usize,
    worker: usize,
}

impl Arena {
    /// Create (or truncate) the scratch file at `path`, map it, and return an
    /// arena with process lifetime. The byte slices handed out by
    /// `alloc_bytes`/`alloc_str` borrow from this `'static` arena, the same
    /// soundness argument bump-allocator crates in the ecosystem rely on.
    pub fn create(path: &Path, capacity: usize, worker: usize) -> Result<&'static mut Arena, ReduceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| ReduceError::ScratchSetup { path: path.to_path_buf(), source })?;

        file.set_len(capacity as u64)
            .map_err(|source| ReduceError::ScratchSetup { path: path.to_path_buf(), source })?;

        // SAFETY: `file` is a private scratch file we just created and sized;
        // no other process touches it, and this arena is the sole owner of
        // the mapping for its entire (process) lifetime.
        let mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|source| ReduceError::ScratchSetup { path: path.to_path_buf(), source })?;

        let arena = Arena { mmap, offset: 0, capacity, worker };
        Ok(Box::leak(Box::new(arena)))
    }

    /// Reserve `n` 8-byte-aligned bytes, returning their start offset. Fatal
    /// if the arena would be exhausted.
    fn bump(&mut self, n: usize) -> Result<usize, ReduceError> {
        let aligned = round_up_8(n);
        let end = self
            .offset
            .checked_add(aligned)
            .filter(|&end| end < self.capacity)
            .ok_or(ReduceError::ArenaExhausted { worker: self.worker, capacity: self.capacity })?;

        let start = self.offset;
        self.offset = end;
        Ok(start)
    }

    /// Bump-allocate `n` zero-initialized bytes.
    pub fn alloc_bytes(&mut self, n: usize) -> Result<&'static [u8], ReduceError> {
        let start = self.bump(n)?;
        let region = &mut self.mmap[start..start + n];
        region.fill(0);

        // SAFETY: the mapping is never unmapped or truncated below `capacity`
        // for the lifetime of the process, and this range is never handed out
        // again (the bump offset only advances), so extending the borrow to
        // `'static` is sound.
        let ptr = region.as_ptr();
        let len = region.len();
        Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
    }

    /// Intern `s` into the arena and return a `'static` view of the copy.
    pub fn alloc_str(&mut self, s: &str) -> Result<&'static str, ReduceError> {
        let start = self.bump(s.len())?;
        let region = &mut self.mmap[start..start + s.len()];
        region.copy_from_slice(s.as_bytes());

        // SAFETY: same argument as `alloc_bytes`; the bytes just written are
        // an exact copy of `s`, which was valid UTF-8.
        let ptr = region.as_ptr();
        let len = region.len();
        let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
        Ok(unsafe { std::str::from_utf8_unchecked(bytes) })
    }
}
