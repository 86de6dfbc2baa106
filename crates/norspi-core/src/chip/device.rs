//! The byte-addressable flash device
//!
//! `Chip` binds one host driver to identified geometry and decomposes
//! byte-addressed read/write/erase requests into the host's primitive
//! operations, honoring page and sector boundaries.

use std::sync::Arc;

use maybe_async::maybe_async;

use crate::error::{Error, Result};
use crate::guard::{BusArbiter, FenceHold, FetchFence};
use crate::host::{check_mode_supported, ClockSpeed, FlashHost, ReadMode};

use super::database::{self, ChipRecord, JedecId};
use super::geometry::Geometry;
use super::split::{ErasePlan, EraseUnit, PageChunks};

// Poll limits per primitive, sized from typical datasheet maxima.
const PROGRAM_TIMEOUT_US: u32 = 10_000;
const SECTOR_ERASE_TIMEOUT_US: u32 = 1_000_000;
const BLOCK_ERASE_TIMEOUT_US: u32 = 4_000_000;

/// Lifecycle state of a chip binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipState {
    /// Constructed but not yet identified
    Uninitialized,
    /// Identification read in progress
    Detecting,
    /// Identified and idle
    Ready,
    /// A primitive sequence is in flight
    Busy,
    /// A primitive failed; only an explicit reset recovers
    Faulted,
}

/// One logical flash device: a host driver binding plus geometry and state
///
/// Exactly one `Chip` exists per physical attach; it owns its host driver
/// for its lifetime (reclaim it with [`Chip::detach`]). Construction does
/// not touch the bus; [`Chip::init`] performs identification and moves the
/// chip to `Ready`.
///
/// Erase-before-write is a caller contract: `write` programs bits 1 -> 0 and
/// never erases on its own, so the target range must be freshly erased (or
/// known erased) before writing. The engine does not track per-sector
/// erase state.
pub struct Chip<H> {
    host: H,
    arbiter: BusArbiter,
    fence: Option<Arc<FetchFence>>,
    record: Option<&'static ChipRecord>,
    id: Option<JedecId>,
    speed: ClockSpeed,
    read_mode: ReadMode,
    state: ChipState,
}

impl<H: FlashHost> Chip<H> {
    /// Bind a host driver, without touching the bus yet
    ///
    /// Defaults to the lowest clock speed and the slow read mode; override
    /// with [`Chip::with_io`] before calling [`Chip::init`].
    pub fn new(host: H, arbiter: BusArbiter) -> Self {
        Self {
            host,
            arbiter,
            fence: None,
            record: None,
            id: None,
            speed: ClockSpeed::MIN,
            read_mode: ReadMode::Slow,
            state: ChipState::Uninitialized,
        }
    }

    /// Attach the fetch fence for a chip that backs the running system's
    /// own code/data
    ///
    /// Every primitive against this chip will hold the fence for its
    /// duration, excluding concurrent instruction/constant fetches.
    pub fn with_fence(mut self, fence: Arc<FetchFence>) -> Self {
        self.fence = Some(fence);
        self
    }

    /// Select clock speed and read mode before initialization
    pub fn with_io(mut self, speed: ClockSpeed, mode: ReadMode) -> Self {
        debug_assert_eq!(self.state, ChipState::Uninitialized);
        self.speed = speed;
        self.read_mode = mode;
        self
    }

    /// Identify the chip and move it to `Ready`
    ///
    /// Configures the host, reads the JEDEC id and resolves it against the
    /// registry. On any failure the chip returns to `Uninitialized` with
    /// nothing partially attached.
    #[maybe_async]
    pub async fn init(&mut self) -> Result<()> {
        if self.state == ChipState::Busy {
            return Err(Error::Faulted);
        }
        check_mode_supported(self.read_mode, self.host.caps())?;
        self.state = ChipState::Detecting;
        match self.detect().await {
            Ok(()) => {
                self.state = ChipState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = ChipState::Uninitialized;
                self.record = None;
                self.id = None;
                Err(e)
            }
        }
    }

    #[maybe_async]
    async fn detect(&mut self) -> Result<()> {
        let _claim = self.arbiter.claim();
        {
            let _hold = hold_fence(self.fence.as_deref());
            self.host.configure(self.speed, self.read_mode).await?;
        }
        let id = {
            let _hold = hold_fence(self.fence.as_deref());
            self.host.read_id().await?
        };
        let record =
            database::find_by_jedec_id(id).ok_or(Error::UnknownDevice { id: id.id() })?;
        check_mode_supported(self.read_mode, record.read_caps)?;
        if self.speed > record.max_speed {
            log::warn!(
                "{} {} tops out at {}, clamping requested {}",
                record.vendor,
                record.name,
                record.max_speed,
                self.speed
            );
            self.speed = record.max_speed;
            let _hold = hold_fence(self.fence.as_deref());
            self.host.configure(self.speed, self.read_mode).await?;
        }
        log::debug!(
            "detected {} {} ({} bytes) id {} at {} {}",
            record.vendor,
            record.name,
            record.geometry.total_size,
            id,
            self.speed,
            self.read_mode
        );
        self.record = Some(record);
        self.id = Some(id);
        Ok(())
    }

    /// Change clock speed and read mode
    ///
    /// The host configuration is immutable while initialized, so this
    /// transitions back through `Uninitialized` and re-identifies the chip.
    #[maybe_async]
    pub async fn reconfigure(&mut self, speed: ClockSpeed, mode: ReadMode) -> Result<()> {
        if self.state == ChipState::Busy {
            return Err(Error::Faulted);
        }
        self.state = ChipState::Uninitialized;
        self.record = None;
        self.id = None;
        self.speed = speed;
        self.read_mode = mode;
        self.init().await
    }

    /// Recover a `Faulted` chip by re-running identification
    #[maybe_async]
    pub async fn reset(&mut self) -> Result<()> {
        self.state = ChipState::Uninitialized;
        self.record = None;
        self.id = None;
        self.init().await
    }

    /// Read `buf.len()` bytes starting at `offset`
    ///
    /// An erased, never-written range reads as all-ones (0xFF) bytes.
    #[maybe_async]
    pub async fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        let geometry = self.require_ready()?;
        if buf.is_empty() {
            return Ok(());
        }
        check_range(&geometry, offset, buf.len())?;
        self.state = ChipState::Busy;
        let res = {
            let _claim = self.arbiter.claim();
            read_span(&mut self.host, self.fence.as_deref(), offset, buf).await
        };
        self.finish(res)
    }

    /// Program `data` starting at `offset`
    ///
    /// Decomposed into page-bounded program primitives with a busy-wait
    /// after each; the target range must already be erased (caller
    /// contract). A zero-length write is a no-op. On failure the region is
    /// left partially written and the first host error is surfaced; there
    /// is no rollback.
    #[maybe_async]
    pub async fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let geometry = self.require_ready()?;
        if data.is_empty() {
            return Ok(());
        }
        check_range(&geometry, offset, data.len())?;
        self.state = ChipState::Busy;
        let res = {
            let _claim = self.arbiter.claim();
            program_span(&mut self.host, self.fence.as_deref(), &geometry, offset, data).await
        };
        self.finish(res)
    }

    /// Erase `[offset, offset + len)` to all-ones
    ///
    /// Both `offset` and `len` must be sector-aligned. Blocks are erased
    /// where alignment allows, sectors elsewhere. A mid-region failure
    /// leaves preceding units erased and reports the failing address.
    #[maybe_async]
    pub async fn erase_region(&mut self, offset: u32, len: u32) -> Result<()> {
        let geometry = self.require_ready()?;
        check_range(&geometry, offset, len as usize)?;
        if !geometry.is_sector_aligned(offset, len) {
            return Err(Error::Misaligned { addr: offset, len });
        }
        if len == 0 {
            return Ok(());
        }
        self.state = ChipState::Busy;
        let res = {
            let _claim = self.arbiter.claim();
            erase_span(&mut self.host, self.fence.as_deref(), &geometry, offset, len).await
        };
        self.finish(res)
    }

    /// Erase the whole chip to all-ones
    #[maybe_async]
    pub async fn erase_chip(&mut self) -> Result<()> {
        let geometry = self.require_ready()?;
        self.state = ChipState::Busy;
        let res = {
            let _claim = self.arbiter.claim();
            erase_span(
                &mut self.host,
                self.fence.as_deref(),
                &geometry,
                0,
                geometry.total_size,
            )
            .await
        };
        self.finish(res)
    }

    /// Read the JEDEC identification from the device
    #[maybe_async]
    pub async fn read_identification(&mut self) -> Result<JedecId> {
        self.require_ready()?;
        self.state = ChipState::Busy;
        let res = {
            let _claim = self.arbiter.claim();
            let _hold = hold_fence(self.fence.as_deref());
            self.host.read_id().await
        };
        self.finish_with(res)
    }

    /// Total chip capacity in bytes
    pub fn size(&self) -> Result<u32> {
        self.record
            .map(|r| r.geometry.total_size)
            .ok_or(Error::NotInitialized)
    }

    /// Identified chip geometry
    pub fn geometry(&self) -> Result<Geometry> {
        self.record.map(|r| r.geometry).ok_or(Error::NotInitialized)
    }

    /// Identified chip record (vendor, model, capabilities)
    pub fn record(&self) -> Option<&'static ChipRecord> {
        self.record
    }

    /// JEDEC id captured at initialization
    pub fn jedec_id(&self) -> Result<JedecId> {
        self.id.ok_or(Error::NotInitialized)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChipState {
        self.state
    }

    /// Active clock speed tier
    pub fn speed(&self) -> ClockSpeed {
        self.speed
    }

    /// Active read I/O mode
    pub fn read_mode(&self) -> ReadMode {
        self.read_mode
    }

    /// Release the host driver binding
    pub fn detach(self) -> H {
        self.host
    }

    /// The bound host driver
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the bound host driver
    ///
    /// Must not be used to issue primitives behind the engine's back while
    /// the chip is initialized.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn require_ready(&self) -> Result<Geometry> {
        match (self.state, self.record) {
            (ChipState::Ready, Some(rec)) => Ok(rec.geometry),
            (ChipState::Faulted, _) => Err(Error::Faulted),
            _ => Err(Error::NotInitialized),
        }
    }

    fn finish(&mut self, res: Result<()>) -> Result<()> {
        self.finish_with(res)
    }

    fn finish_with<T>(&mut self, res: Result<T>) -> Result<T> {
        match res {
            Ok(v) => {
                self.state = ChipState::Ready;
                Ok(v)
            }
            Err(e) => {
                log::warn!("primitive failed ({}), chip faulted", e);
                self.state = ChipState::Faulted;
                Err(e)
            }
        }
    }
}

fn hold_fence(fence: Option<&FetchFence>) -> Option<FenceHold<'_>> {
    fence.map(FetchFence::hold)
}

fn check_range(geometry: &Geometry, addr: u32, len: usize) -> Result<()> {
    if geometry.contains(addr, len) {
        Ok(())
    } else {
        Err(Error::OutOfRange {
            addr,
            len: u32::try_from(len).unwrap_or(u32::MAX),
        })
    }
}

#[maybe_async]
async fn read_span<H: FlashHost>(
    host: &mut H,
    fence: Option<&FetchFence>,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    let max = host.max_transfer().max(1);
    let mut offset = 0usize;
    while offset < buf.len() {
        let chunk_len = max.min(buf.len() - offset);
        let chunk_addr = addr + offset as u32;
        let chunk = &mut buf[offset..offset + chunk_len];
        let _hold = hold_fence(fence);
        host.read(chunk_addr, chunk)
            .await
            .map_err(|e| e.with_addr(chunk_addr))?;
        offset += chunk_len;
    }
    Ok(())
}

#[maybe_async]
async fn program_span<H: FlashHost>(
    host: &mut H,
    fence: Option<&FetchFence>,
    geometry: &Geometry,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    let max_chunk = geometry.page_size.min(host.max_transfer().max(1) as u32);
    let mut offset = 0usize;
    for (chunk_addr, chunk_len) in
        PageChunks::new(addr, data.len() as u32, geometry.page_size, max_chunk)
    {
        let chunk = &data[offset..offset + chunk_len as usize];
        // The fence spans the program and its busy-wait: the device is
        // unreadable until the write cycle completes.
        let _hold = hold_fence(fence);
        host.program_page(chunk_addr, chunk)
            .await
            .map_err(|e| e.with_addr(chunk_addr))?;
        host.wait_idle(PROGRAM_TIMEOUT_US)
            .await
            .map_err(|e| e.with_addr(chunk_addr))?;
        offset += chunk_len as usize;
    }
    Ok(())
}

#[maybe_async]
async fn erase_span<H: FlashHost>(
    host: &mut H,
    fence: Option<&FetchFence>,
    geometry: &Geometry,
    addr: u32,
    len: u32,
) -> Result<()> {
    for step in ErasePlan::new(addr, len, geometry) {
        let _hold = hold_fence(fence);
        let res = match step.unit {
            EraseUnit::Sector => host.erase_sector(step.addr).await,
            EraseUnit::Block => host.erase_block(step.addr).await,
        };
        res.map_err(|e| e.with_addr(step.addr))?;
        let timeout = match step.unit {
            EraseUnit::Sector => SECTOR_ERASE_TIMEOUT_US,
            EraseUnit::Block => BLOCK_ERASE_TIMEOUT_US,
        };
        host.wait_idle(timeout)
            .await
            .map_err(|e| e.with_addr(step.addr))?;
    }
    Ok(())
}
