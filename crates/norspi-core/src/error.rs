//! Error types for norspi-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Variants carry the faulting address and requested
//! length where available so that failures can be reproduced from the error
//! alone.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Requested region extends beyond the end of the chip
    OutOfRange {
        /// First byte of the requested region
        addr: u32,
        /// Requested length in bytes
        len: u32,
    },
    /// Erase region is not aligned to the sector size
    Misaligned {
        /// First byte of the requested region
        addr: u32,
        /// Requested length in bytes
        len: u32,
    },
    /// JEDEC identification read returned an id with no known geometry
    UnknownDevice {
        /// The 24-bit JEDEC id that was read (manufacturer << 16 | device)
        id: u32,
    },
    /// Requested read I/O mode is not supported by the host or the chip
    UnsupportedIoMode,
    /// Bus signaling fault during a primitive operation
    Transport {
        /// Device address of the failing primitive, if it had one
        addr: Option<u32>,
    },
    /// Device did not become idle within the allotted time
    Timeout {
        /// Device address of the primitive that was being waited on
        addr: Option<u32>,
    },
    /// Chip has not been initialized (or identification failed)
    NotInitialized,
    /// A previous primitive failed; only an explicit reset can recover
    Faulted,
}

impl Error {
    /// Attach a device address to a `Transport` or `Timeout` error that was
    /// raised without one (e.g. by a `wait_idle` primitive). Other variants
    /// pass through unchanged.
    pub fn with_addr(self, addr: u32) -> Self {
        match self {
            Self::Transport { addr: None } => Self::Transport { addr: Some(addr) },
            Self::Timeout { addr: None } => Self::Timeout { addr: Some(addr) },
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { addr, len } => {
                write!(f, "region 0x{:08X}+{} is out of range", addr, len)
            }
            Self::Misaligned { addr, len } => {
                write!(f, "region 0x{:08X}+{} is not sector aligned", addr, len)
            }
            Self::UnknownDevice { id } => write!(f, "unknown flash device id 0x{:06X}", id),
            Self::UnsupportedIoMode => write!(f, "read I/O mode not supported"),
            Self::Transport { addr: Some(addr) } => {
                write!(f, "transport error at 0x{:08X}", addr)
            }
            Self::Transport { addr: None } => write!(f, "transport error"),
            Self::Timeout { addr: Some(addr) } => {
                write!(f, "operation timed out at 0x{:08X}", addr)
            }
            Self::Timeout { addr: None } => write!(f, "operation timed out"),
            Self::NotInitialized => write!(f, "chip not initialized"),
            Self::Faulted => write!(f, "chip faulted, reset required"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
