//! Address-splitting logic
//!
//! Pure decomposition of byte-addressed requests into device-legal
//! operations: page-bounded program chunks and sector/block erase plans.
//! Kept free of any host dependency so the boundary arithmetic can be
//! tested exhaustively on its own.

use super::geometry::Geometry;

/// Iterator over `(addr, len)` program chunks for a write request
///
/// Chunks never cross a page boundary and never exceed `max_chunk` (the
/// host's transfer limit). The first chunk covers `[addr, next page
/// boundary)` clipped to the request; subsequent chunks are full pages (or
/// `max_chunk` slices of them) until fewer than one page remains.
#[derive(Debug, Clone)]
pub struct PageChunks {
    addr: u32,
    remaining: u32,
    page_size: u32,
    max_chunk: u32,
}

impl PageChunks {
    /// Plan program chunks for `len` bytes starting at `addr`
    ///
    /// `max_chunk` is clamped to at least 1; pass the host's
    /// `max_transfer()` (or the page size if the host is unconstrained).
    pub fn new(addr: u32, len: u32, page_size: u32, max_chunk: u32) -> Self {
        Self {
            addr,
            remaining: len,
            page_size,
            max_chunk: max_chunk.max(1),
        }
    }
}

impl Iterator for PageChunks {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        if self.remaining == 0 {
            return None;
        }
        let to_page_end = self.page_size - self.addr % self.page_size;
        let len = to_page_end.min(self.remaining).min(self.max_chunk);
        let chunk = (self.addr, len);
        self.addr += len;
        self.remaining -= len;
        Some(chunk)
    }
}

/// Erase unit selected for one step of an erase plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseUnit {
    /// One sector
    Sector,
    /// One block
    Block,
}

/// A single erase step: erase one `unit` at `addr`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseStep {
    /// Unit-aligned start address
    pub addr: u32,
    /// Size of the unit in bytes
    pub len: u32,
    /// Which erase primitive to issue
    pub unit: EraseUnit,
}

/// Iterator over erase steps for a sector-aligned region
///
/// Prefers block erases wherever the current address is block-aligned and
/// at least one full block remains; falls back to sector erases for the
/// unaligned head and the partial tail. The caller must have validated
/// sector alignment of both `addr` and `len` beforehand.
#[derive(Debug, Clone)]
pub struct ErasePlan {
    addr: u32,
    remaining: u32,
    sector_size: u32,
    block_size: u32,
}

impl ErasePlan {
    /// Plan the erase of `len` bytes starting at `addr`
    pub fn new(addr: u32, len: u32, geometry: &Geometry) -> Self {
        Self {
            addr,
            remaining: len,
            sector_size: geometry.sector_size,
            block_size: geometry.block_size,
        }
    }
}

impl Iterator for ErasePlan {
    type Item = EraseStep;

    fn next(&mut self) -> Option<EraseStep> {
        if self.remaining == 0 {
            return None;
        }
        let (unit, len) = if self.addr % self.block_size == 0 && self.remaining >= self.block_size
        {
            (EraseUnit::Block, self.block_size)
        } else {
            (EraseUnit::Sector, self.sector_size)
        };
        let step = EraseStep {
            addr: self.addr,
            len,
            unit,
        };
        self.addr += len;
        self.remaining -= len;
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: u32 = 256;

    fn chunks(addr: u32, len: u32, max_chunk: u32) -> std::vec::Vec<(u32, u32)> {
        PageChunks::new(addr, len, PAGE, max_chunk).collect()
    }

    #[test]
    fn zero_length_yields_nothing() {
        assert!(chunks(0x123, 0, PAGE).is_empty());
    }

    #[test]
    fn aligned_write_splits_into_pages() {
        assert_eq!(
            chunks(0x1000, 3 * PAGE, PAGE),
            [(0x1000, PAGE), (0x1100, PAGE), (0x1200, PAGE)]
        );
    }

    #[test]
    fn unaligned_head_stops_at_page_boundary() {
        // 0x10f3: 13 bytes to the boundary, then a full page, then the tail
        assert_eq!(
            chunks(0x10F3, 13 + PAGE + 5, PAGE),
            [(0x10F3, 13), (0x1100, PAGE), (0x1200, 5)]
        );
    }

    #[test]
    fn tiny_unaligned_write_stays_inside_request() {
        assert_eq!(chunks(0x10FF, 3, PAGE), [(0x10FF, 1), (0x1100, 2)]);
        assert_eq!(chunks(0x1001, 1, PAGE), [(0x1001, 1)]);
    }

    #[test]
    fn chunks_respect_host_transfer_limit() {
        // 64-byte host limit: pages are sliced but never cross a boundary
        assert_eq!(
            chunks(0x10C0, 128, 64),
            [(0x10C0, 64), (0x1100, 64)]
        );
        assert_eq!(chunks(0x10F0, 40, 64), [(0x10F0, 16), (0x1100, 24)]);
    }

    #[test]
    fn chunks_cover_request_exactly() {
        let mut expected = 0x10F3u32;
        let mut total = 0u32;
        for (addr, len) in PageChunks::new(0x10F3, 10_000, PAGE, 64) {
            assert_eq!(addr, expected);
            assert!(len > 0 && len <= 64);
            assert_eq!(addr / PAGE, (addr + len - 1) / PAGE, "chunk crosses a page");
            expected += len;
            total += len;
        }
        assert_eq!(total, 10_000);
    }

    fn plan(addr: u32, len: u32) -> std::vec::Vec<EraseStep> {
        ErasePlan::new(addr, len, &Geometry::uniform(16 * 1024 * 1024)).collect()
    }

    #[test]
    fn single_sector() {
        assert_eq!(
            plan(0x1000, 0x1000),
            [EraseStep {
                addr: 0x1000,
                len: 0x1000,
                unit: EraseUnit::Sector
            }]
        );
    }

    #[test]
    fn block_preferred_when_aligned() {
        let steps = plan(0x10000, 0x10000);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].unit, EraseUnit::Block);
    }

    #[test]
    fn head_and_tail_fall_back_to_sectors() {
        // 4 sectors up to the block boundary, one block, 2 trailing sectors
        let steps = plan(0x10000 - 4 * 0x1000, 4 * 0x1000 + 0x10000 + 2 * 0x1000);
        let units: std::vec::Vec<_> = steps.iter().map(|s| s.unit).collect();
        assert_eq!(
            units,
            [
                EraseUnit::Sector,
                EraseUnit::Sector,
                EraseUnit::Sector,
                EraseUnit::Sector,
                EraseUnit::Block,
                EraseUnit::Sector,
                EraseUnit::Sector
            ]
        );
        // contiguous coverage
        let mut next = 0x10000 - 4 * 0x1000;
        for s in &steps {
            assert_eq!(s.addr, next);
            next += s.len;
        }
        assert_eq!(next, 0x10000 + 0x10000 + 2 * 0x1000);
    }

    #[test]
    fn zero_length_erase_is_empty() {
        assert!(plan(0x2000, 0).is_empty());
    }
}
