//! Static chip registry
//!
//! Maps JEDEC identification to known chip geometry and capabilities. The
//! registry is deliberately small: only chips whose geometry and speed
//! limits have been confirmed against a datasheet belong here, because an
//! entry with the wrong capacity corrupts data silently.

use core::fmt;

use crate::host::{ClockSpeed, HostCaps};

use super::geometry::Geometry;

/// JEDEC manufacturer/device identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JedecId {
    /// Manufacturer id (first RDID byte)
    pub manufacturer: u8,
    /// Device id (second and third RDID bytes)
    pub device: u16,
}

impl JedecId {
    /// Create an id from its manufacturer and device parts
    pub const fn new(manufacturer: u8, device: u16) -> Self {
        Self {
            manufacturer,
            device,
        }
    }

    /// The id as a single 24-bit value (manufacturer << 16 | device)
    pub const fn id(self) -> u32 {
        ((self.manufacturer as u32) << 16) | (self.device as u32)
    }

    /// The capacity code (low device byte); for most chips the capacity
    /// is `1 << code` bytes
    pub const fn capacity_code(self) -> u8 {
        (self.device & 0xFF) as u8
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:04X}", self.manufacturer, self.device)
    }
}

/// One registry entry: identification plus compatible defaults
#[derive(Debug, Clone, Copy)]
pub struct ChipRecord {
    /// Vendor name (e.g. "Winbond")
    pub vendor: &'static str,
    /// Chip model name (e.g. "W25Q32JV")
    pub name: &'static str,
    /// JEDEC identification
    pub id: JedecId,
    /// Physical layout
    pub geometry: Geometry,
    /// Fastest clock tier the chip tolerates
    pub max_speed: ClockSpeed,
    /// Read modes the chip can answer
    pub read_caps: HostCaps,
}

const KIB: u32 = 1024;
const MIB: u32 = 1024 * 1024;

/// All chips the engine can attach to
pub const KNOWN_CHIPS: &[ChipRecord] = &[
    ChipRecord {
        vendor: "Winbond",
        name: "W25Q80DV",
        id: JedecId::new(0xEF, 0x4014),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ
            .union(HostCaps::DUAL)
            .union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "Winbond",
        name: "W25Q16JV",
        id: JedecId::new(0xEF, 0x4015),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 2 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ
            .union(HostCaps::DUAL)
            .union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "Winbond",
        name: "W25Q32JV",
        id: JedecId::new(0xEF, 0x4016),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 4 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ
            .union(HostCaps::DUAL)
            .union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "Winbond",
        name: "W25Q64JV",
        id: JedecId::new(0xEF, 0x4017),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 8 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ
            .union(HostCaps::DUAL)
            .union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "Winbond",
        name: "W25Q128JV",
        id: JedecId::new(0xEF, 0x4018),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 16 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ
            .union(HostCaps::DUAL)
            .union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "GigaDevice",
        name: "GD25Q32C",
        id: JedecId::new(0xC8, 0x4016),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 4 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ
            .union(HostCaps::DUAL)
            .union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "GigaDevice",
        name: "GD25Q64C",
        id: JedecId::new(0xC8, 0x4017),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 8 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ
            .union(HostCaps::DUAL)
            .union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "Macronix",
        name: "MX25L3233F",
        id: JedecId::new(0xC2, 0x2016),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 4 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ.union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "Macronix",
        name: "MX25L6433F",
        id: JedecId::new(0xC2, 0x2017),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 8 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ.union(HostCaps::QUAD),
    },
    ChipRecord {
        vendor: "ISSI",
        name: "IS25LP064",
        id: JedecId::new(0x9D, 0x6017),
        geometry: Geometry::new(256, 4 * KIB, 64 * KIB, 8 * MIB),
        max_speed: ClockSpeed::Mhz80,
        read_caps: HostCaps::FAST_READ
            .union(HostCaps::DUAL)
            .union(HostCaps::QUAD),
    },
];

/// Look up a chip record by its JEDEC identification
pub fn find_by_jedec_id(id: JedecId) -> Option<&'static ChipRecord> {
    KNOWN_CHIPS.iter().find(|rec| rec.id == id)
}
