//! Host driver trait definition
//!
//! These traits use `maybe_async` to support both sync and async modes.
//! - By default, traits are async
//! - With the `is_sync` feature, traits become synchronous

use crate::chip::JedecId;
use crate::error::Result;
use maybe_async::maybe_async;

use super::config::{ClockSpeed, HostCaps, ReadMode};

/// Status register bit: write/erase cycle in progress
pub const STATUS_BUSY: u8 = 0x01;

/// Flash host driver (sync or async depending on `is_sync` feature)
///
/// One implementation per physical transport generation. Every method takes
/// device-relative byte addresses; alignment and bounds are the caller's
/// (the `Chip`'s) responsibility:
///
/// - `program_page` data must fit in one page and must not cross a page
///   boundary. A violating call is a caller bug, not a host runtime fault.
/// - `erase_sector`/`erase_block` addresses must be aligned to the
///   respective unit.
///
/// All primitives assume exclusive ownership of the underlying transport
/// for their duration; none are reentrant. Serialization across chips on
/// one physical bus is the job of [`crate::guard::BusArbiter`], not the
/// host.
#[maybe_async(AFIT)]
pub trait FlashHost {
    /// Read-path capabilities of this transport
    fn caps(&self) -> HostCaps;

    /// Largest number of bytes one read or program primitive can move
    fn max_transfer(&self) -> usize;

    /// Apply a clock speed and read I/O mode to the transport
    ///
    /// Fails with `UnsupportedIoMode` if the mode is outside `caps()`.
    async fn configure(&mut self, speed: ClockSpeed, mode: ReadMode) -> Result<()>;

    /// Read the JEDEC manufacturer/device identification
    async fn read_id(&mut self) -> Result<JedecId>;

    /// Read the device status byte (bit 0: [`STATUS_BUSY`])
    async fn read_status(&mut self) -> Result<u8>;

    /// Read `buf.len()` bytes starting at `addr`
    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data` starting at `addr`, within a single page
    async fn program_page(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Erase the sector at the sector-aligned `addr` to all-ones
    async fn erase_sector(&mut self, addr: u32) -> Result<()>;

    /// Erase the block at the block-aligned `addr` to all-ones
    async fn erase_block(&mut self, addr: u32) -> Result<()>;

    /// Block until the current write/erase cycle completes
    ///
    /// Fails with `Timeout` if the device is still busy after `timeout_us`
    /// microseconds. A timed-out operation is never retried by the engine.
    async fn wait_idle(&mut self, timeout_us: u32) -> Result<()>;
}
