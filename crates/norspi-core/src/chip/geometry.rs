//! Flash chip geometry

/// Physical layout of one flash chip
///
/// `page_size` divides `sector_size`, `sector_size` divides `block_size`,
/// and `block_size` divides `total_size`; the registry only contains
/// records that satisfy this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Smallest unit a program operation can write (typically 256)
    pub page_size: u32,
    /// Smallest unit an erase operation can clear (typically 4 KiB)
    pub sector_size: u32,
    /// Larger erase unit (typically 64 KiB)
    pub block_size: u32,
    /// Total chip capacity in bytes
    pub total_size: u32,
}

impl Geometry {
    /// Create a geometry description
    pub const fn new(page_size: u32, sector_size: u32, block_size: u32, total_size: u32) -> Self {
        Self {
            page_size,
            sector_size,
            block_size,
            total_size,
        }
    }

    /// Uniform 256/4K/64K layout of the given capacity
    pub const fn uniform(total_size: u32) -> Self {
        Self::new(256, 4096, 64 * 1024, total_size)
    }

    /// Whether `[addr, addr + len)` lies entirely on the chip
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        (addr as u64) + (len as u64) <= self.total_size as u64
    }

    /// Whether `addr` and `len` are both multiples of the sector size
    pub fn is_sector_aligned(&self, addr: u32, len: u32) -> bool {
        addr % self.sector_size == 0 && len % self.sector_size == 0
    }

    /// Number of sectors on the chip
    pub fn sector_count(&self) -> u32 {
        self.total_size / self.sector_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_handles_end_of_chip() {
        let g = Geometry::uniform(4096 * 4);
        assert!(g.contains(0, 4096 * 4));
        assert!(g.contains(4096 * 4 - 1, 1));
        assert!(!g.contains(4096 * 4 - 1, 2));
        assert!(!g.contains(4096 * 4, 1));
        // offset + length must not wrap
        assert!(!g.contains(u32::MAX, 2));
    }

    #[test]
    fn zero_length_at_end_is_in_range() {
        let g = Geometry::uniform(4096);
        assert!(g.contains(4096, 0));
    }

    #[test]
    fn sector_alignment() {
        let g = Geometry::uniform(1 << 20);
        assert!(g.is_sector_aligned(0, 8192));
        assert!(g.is_sector_aligned(4096, 0));
        assert!(!g.is_sector_aligned(1, 4096));
        assert!(!g.is_sector_aligned(4096, 100));
    }
}
