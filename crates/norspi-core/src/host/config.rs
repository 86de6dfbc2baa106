//! Host transport configuration types

use crate::error::{Error, Result};
use bitflags::bitflags;
use core::fmt;

/// Clock speed tiers supported by flash hosts
///
/// A fixed ladder from the minimum to the maximum supported rate. Hosts map
/// each tier to whatever divider configuration their hardware needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClockSpeed {
    /// 5 MHz - always safe, used for conservative defaults
    Mhz5,
    /// 10 MHz
    Mhz10,
    /// 20 MHz
    Mhz20,
    /// 26 MHz
    Mhz26,
    /// 40 MHz
    Mhz40,
    /// 80 MHz - only reachable on dedicated pins with matched input delay
    Mhz80,
}

impl ClockSpeed {
    /// The slowest supported tier
    pub const MIN: ClockSpeed = ClockSpeed::Mhz5;
    /// The fastest supported tier
    pub const MAX: ClockSpeed = ClockSpeed::Mhz80;

    /// All tiers, slowest to fastest
    pub const LADDER: [ClockSpeed; 6] = [
        ClockSpeed::Mhz5,
        ClockSpeed::Mhz10,
        ClockSpeed::Mhz20,
        ClockSpeed::Mhz26,
        ClockSpeed::Mhz40,
        ClockSpeed::Mhz80,
    ];

    /// Clock rate in hertz
    pub const fn hz(self) -> u32 {
        match self {
            Self::Mhz5 => 5_000_000,
            Self::Mhz10 => 10_000_000,
            Self::Mhz20 => 20_000_000,
            Self::Mhz26 => 26_000_000,
            Self::Mhz40 => 40_000_000,
            Self::Mhz80 => 80_000_000,
        }
    }
}

impl Default for ClockSpeed {
    fn default() -> Self {
        ClockSpeed::MIN
    }
}

impl fmt::Display for ClockSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}MHz", self.hz() / 1_000_000)
    }
}

/// Read I/O mode for flash transactions
///
/// Determines how many data lines the read path uses and whether dummy
/// cycles are required. Programming and erasing always run single-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadMode {
    /// Plain read, no dummy cycles, limited clock rate
    Slow,
    /// Fast read with dummy cycles, full clock rate
    Fast,
    /// Dual Output: data phase on 2 lines (1-1-2)
    DualOut,
    /// Dual I/O: address and data on 2 lines (1-2-2)
    DualIo,
    /// Quad Output: data phase on 4 lines (1-1-4)
    QuadOut,
    /// Quad I/O: address and data on 4 lines (1-4-4)
    QuadIo,
}

impl ReadMode {
    /// All modes, simplest to most capable
    pub const ALL: [ReadMode; 6] = [
        ReadMode::Slow,
        ReadMode::Fast,
        ReadMode::DualOut,
        ReadMode::DualIo,
        ReadMode::QuadOut,
        ReadMode::QuadIo,
    ];

    /// Host capability required to run this mode
    pub const fn required_caps(self) -> HostCaps {
        match self {
            Self::Slow => HostCaps::empty(),
            Self::Fast => HostCaps::FAST_READ,
            Self::DualOut => HostCaps::DUAL_OUT,
            Self::DualIo => HostCaps::DUAL_IO,
            Self::QuadOut => HostCaps::QUAD_OUT,
            Self::QuadIo => HostCaps::QUAD_IO,
        }
    }

    /// Number of data lines the data phase uses
    pub const fn data_lines(self) -> u8 {
        match self {
            Self::Slow | Self::Fast => 1,
            Self::DualOut | Self::DualIo => 2,
            Self::QuadOut | Self::QuadIo => 4,
        }
    }
}

impl Default for ReadMode {
    fn default() -> Self {
        ReadMode::Slow
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Slow => "slow",
            Self::Fast => "fast",
            Self::DualOut => "dual-out",
            Self::DualIo => "dual-io",
            Self::QuadOut => "quad-out",
            Self::QuadIo => "quad-io",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Read-path capability flags
    ///
    /// Declared by hosts (what the transport can clock) and by chip records
    /// (what the device can answer); the effective mode set is the
    /// intersection of both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostCaps: u32 {
        /// Fast read with dummy cycles
        const FAST_READ = 1 << 0;
        /// Can read two bits at once (1-1-2 mode)
        const DUAL_OUT  = 1 << 1;
        /// Can transfer address and data on two lines (1-2-2 mode)
        const DUAL_IO   = 1 << 2;
        /// Can read four bits at once (1-1-4 mode)
        const QUAD_OUT  = 1 << 3;
        /// Can transfer address and data on four lines (1-4-4 mode)
        const QUAD_IO   = 1 << 4;

        /// Shorthand for both dual modes
        const DUAL = Self::DUAL_OUT.bits() | Self::DUAL_IO.bits();
        /// Shorthand for both quad modes
        const QUAD = Self::QUAD_OUT.bits() | Self::QUAD_IO.bits();
    }
}

impl Default for HostCaps {
    fn default() -> Self {
        HostCaps::empty()
    }
}

/// Check that a capability set covers the requested read mode
///
/// Returns `Ok(())` if the mode is supported, or `Err(UnsupportedIoMode)`
/// if not.
pub fn check_mode_supported(mode: ReadMode, caps: HostCaps) -> Result<()> {
    if caps.contains(mode.required_caps()) {
        Ok(())
    } else {
        Err(Error::UnsupportedIoMode)
    }
}

/// Pin routing between the SPI peripheral and the package pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinRouting {
    /// Dedicated fast pins (direct mux), full clock range
    #[default]
    Dedicated,
    /// General-purpose routed pins, adds propagation delay
    Routed,
}

/// Host driver construction parameters
///
/// Immutable once a `Chip` has been initialized against the host; changing
/// speed or mode afterwards requires an explicit reconfigure back through
/// the `Uninitialized` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Physical bus identifier
    pub bus_id: u8,
    /// Chip-select index on that bus
    pub cs: u8,
    /// Maximum clock speed tier
    pub speed: ClockSpeed,
    /// Read I/O mode
    pub read_mode: ReadMode,
    /// Input-sampling delay compensation in nanoseconds
    pub input_delay_ns: u32,
    /// Pin routing mode
    pub routing: PinRouting,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bus_id: 0,
            cs: 0,
            speed: ClockSpeed::MIN,
            read_mode: ReadMode::Slow,
            input_delay_ns: 0,
            routing: PinRouting::Dedicated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_ordered() {
        for pair in ClockSpeed::LADDER.windows(2) {
            assert!(pair[0].hz() < pair[1].hz());
        }
        assert_eq!(ClockSpeed::LADDER[0], ClockSpeed::MIN);
        assert_eq!(ClockSpeed::LADDER[5], ClockSpeed::MAX);
    }

    #[test]
    fn slow_mode_needs_no_caps() {
        assert!(check_mode_supported(ReadMode::Slow, HostCaps::empty()).is_ok());
    }

    #[test]
    fn quad_mode_needs_quad_cap() {
        assert_eq!(
            check_mode_supported(ReadMode::QuadIo, HostCaps::FAST_READ | HostCaps::DUAL),
            Err(Error::UnsupportedIoMode)
        );
        assert!(check_mode_supported(ReadMode::QuadIo, HostCaps::QUAD).is_ok());
    }

    #[test]
    fn data_lines_match_mode() {
        assert_eq!(ReadMode::Slow.data_lines(), 1);
        assert_eq!(ReadMode::DualIo.data_lines(), 2);
        assert_eq!(ReadMode::QuadOut.data_lines(), 4);
    }
}
