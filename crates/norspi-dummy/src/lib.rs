//! norspi-dummy - In-memory flash host emulator for testing
//!
//! Emulates a SPI NOR chip behind the [`FlashHost`] trait so the access
//! engine can be exercised without hardware. The emulation is faithful to
//! NOR physics where it matters for correctness testing: programming can
//! only clear bits (new = old & data), erase sets whole sectors to 0xFF,
//! and a program that crosses a page boundary is rejected rather than
//! silently wrapped.
//!
//! Faults can be injected at a chosen primitive count to drive the
//! engine's error paths.

use norspi_core::chip::JedecId;
use norspi_core::host::{ClockSpeed, FlashHost, HostCaps, HostConfig, ReadMode, STATUS_BUSY};
use norspi_core::{Error, Result};

/// Configuration for the emulated chip and host
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC manufacturer id returned by identification
    pub manufacturer_id: u8,
    /// JEDEC device id returned by identification
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Sector erase unit
    pub sector_size: usize,
    /// Block erase unit
    pub block_size: usize,
    /// I/O modes the emulated host supports
    pub caps: HostCaps,
    /// Largest single transfer the host accepts
    pub max_transfer: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4016,     // W25Q32JV
            size: 4 * 1024 * 1024,
            page_size: 256,
            sector_size: 4096,
            block_size: 64 * 1024,
            caps: HostCaps::all(),
            max_transfer: 4096,
        }
    }
}

/// Which error an injected fault produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The primitive fails with a transport error
    Transport,
    /// The primitive succeeds but the following busy-wait times out
    Timeout,
}

#[derive(Debug)]
struct Fault {
    kind: FaultKind,
    /// Primitives left before the fault fires (0 = next one)
    after: u32,
}

/// Per-primitive operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    /// Read primitives issued
    pub reads: usize,
    /// Page program primitives issued
    pub programs: usize,
    /// Sector erase primitives issued
    pub sector_erases: usize,
    /// Block erase primitives issued
    pub block_erases: usize,
}

/// In-memory flash host
///
/// Holds a [`HostConfig`] like a real bus binding would; `configure`
/// updates its speed and read mode fields in place.
pub struct DummyHost {
    config: DummyConfig,
    host_config: HostConfig,
    data: Vec<u8>,
    counts: OpCounts,
    fault: Option<Fault>,
    timeout_pending: bool,
}

impl DummyHost {
    /// Create an emulated host with the given configuration, all-erased
    pub fn new(config: DummyConfig) -> Self {
        Self::with_host_config(config, HostConfig::default())
    }

    /// Create an emulated host with explicit bus parameters
    pub fn with_host_config(config: DummyConfig, host_config: HostConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            host_config,
            data,
            counts: OpCounts::default(),
            fault: None,
            timeout_pending: false,
        }
    }

    /// Create an emulated W25Q32JV (4 MiB) host
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create an emulated host with pre-filled contents
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut host = Self::new(config);
        let len = initial_data.len().min(host.data.len());
        host.data[..len].copy_from_slice(&initial_data[..len]);
        host
    }

    /// Backing storage, for direct inspection in tests
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable backing storage
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The configuration this host was built with
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// The bus parameters, reflecting the most recent `configure`
    pub fn host_config(&self) -> &HostConfig {
        &self.host_config
    }

    /// Clock speed from the most recent `configure`
    pub fn configured_speed(&self) -> ClockSpeed {
        self.host_config.speed
    }

    /// Read mode from the most recent `configure`
    pub fn configured_mode(&self) -> ReadMode {
        self.host_config.read_mode
    }

    /// Primitive operation counters accumulated so far
    pub fn counts(&self) -> OpCounts {
        self.counts
    }

    /// Reset the primitive operation counters
    pub fn reset_counts(&mut self) {
        self.counts = OpCounts::default();
    }

    /// Arrange for a fault after `after` further mutating primitives
    ///
    /// `after = 0` fails the very next program or erase. A `Transport`
    /// fault fails the primitive itself; a `Timeout` fault lets the
    /// primitive mutate the array and then fails the busy-wait.
    pub fn inject_fault(&mut self, kind: FaultKind, after: u32) {
        self.fault = Some(Fault { kind, after });
        self.timeout_pending = false;
    }

    /// Drop any pending injected fault
    pub fn clear_fault(&mut self) {
        self.fault = None;
        self.timeout_pending = false;
    }

    /// Returns the fault to raise for the current mutating primitive
    fn take_fault(&mut self, addr: u32) -> Result<()> {
        if let Some(f) = &mut self.fault {
            if f.after == 0 {
                let kind = f.kind;
                self.fault = None;
                match kind {
                    FaultKind::Transport => return Err(Error::Transport { addr: Some(addr) }),
                    FaultKind::Timeout => self.timeout_pending = true,
                }
            } else {
                f.after -= 1;
            }
        }
        Ok(())
    }

    fn check_bounds(&self, addr: u32, len: usize) -> Result<()> {
        if (addr as usize)
            .checked_add(len)
            .is_some_and(|end| end <= self.data.len())
        {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                addr,
                len: len as u32,
            })
        }
    }
}

impl FlashHost for DummyHost {
    fn caps(&self) -> HostCaps {
        self.config.caps
    }

    fn max_transfer(&self) -> usize {
        self.config.max_transfer
    }

    fn configure(&mut self, speed: ClockSpeed, mode: ReadMode) -> Result<()> {
        if !self.config.caps.contains(mode.required_caps()) {
            return Err(Error::UnsupportedIoMode);
        }
        log::trace!(
            "dummy: configure {} {} ({} data lines)",
            speed,
            mode,
            mode.data_lines()
        );
        self.host_config.speed = speed;
        self.host_config.read_mode = mode;
        Ok(())
    }

    fn read_id(&mut self) -> Result<JedecId> {
        Ok(JedecId::new(
            self.config.manufacturer_id,
            self.config.device_id,
        ))
    }

    fn read_status(&mut self) -> Result<u8> {
        Ok(if self.timeout_pending { STATUS_BUSY } else { 0 })
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.check_bounds(addr, buf.len())?;
        if buf.len() > self.config.max_transfer {
            return Err(Error::Transport { addr: Some(addr) });
        }
        self.counts.reads += 1;
        let start = addr as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn program_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.check_bounds(addr, data.len())?;
        let page = self.config.page_size;
        if (addr as usize) % page + data.len() > page {
            // A real chip would wrap within the page and corrupt data;
            // refuse so a bad split is caught instead of hidden.
            return Err(Error::Transport { addr: Some(addr) });
        }
        self.take_fault(addr)?;
        self.counts.programs += 1;
        let start = addr as usize;
        // NOR programming only clears bits
        for (cell, &byte) in self.data[start..start + data.len()].iter_mut().zip(data) {
            *cell &= byte;
        }
        Ok(())
    }

    fn erase_sector(&mut self, addr: u32) -> Result<()> {
        let size = self.config.sector_size;
        if (addr as usize) % size != 0 {
            return Err(Error::Misaligned {
                addr,
                len: size as u32,
            });
        }
        self.check_bounds(addr, size)?;
        self.take_fault(addr)?;
        self.counts.sector_erases += 1;
        let start = addr as usize;
        self.data[start..start + size].fill(0xFF);
        Ok(())
    }

    fn erase_block(&mut self, addr: u32) -> Result<()> {
        let size = self.config.block_size;
        if (addr as usize) % size != 0 {
            return Err(Error::Misaligned {
                addr,
                len: size as u32,
            });
        }
        self.check_bounds(addr, size)?;
        self.take_fault(addr)?;
        self.counts.block_erases += 1;
        let start = addr as usize;
        self.data[start..start + size].fill(0xFF);
        Ok(())
    }

    fn wait_idle(&mut self, _timeout_us: u32) -> Result<()> {
        if self.timeout_pending {
            self.timeout_pending = false;
            return Err(Error::Timeout { addr: None });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_array_reads_erased() {
        let mut host = DummyHost::new_default();
        let mut buf = [0u8; 16];
        host.read(0x1234, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn programming_only_clears_bits() {
        let mut host = DummyHost::new_default();
        host.program_page(0x100, &[0xF0]).unwrap();
        host.program_page(0x100, &[0x0F]).unwrap();
        let mut buf = [0u8; 1];
        host.read(0x100, &mut buf).unwrap();
        // 0xF0 & 0x0F, not 0x0F: the second program cannot set bits back
        assert_eq!(buf[0], 0x00);
    }

    #[test]
    fn erase_restores_all_ones() {
        let mut host = DummyHost::new_default();
        host.program_page(0x1000, &[0u8; 256]).unwrap();
        host.erase_sector(0x1000).unwrap();
        let mut buf = [0u8; 256];
        host.read(0x1000, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn page_crossing_program_rejected() {
        let mut host = DummyHost::new_default();
        let err = host.program_page(0x1FF, &[0xAA, 0xBB]).unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }

    #[test]
    fn unaligned_erase_rejected() {
        let mut host = DummyHost::new_default();
        assert!(matches!(
            host.erase_sector(0x1001),
            Err(Error::Misaligned { .. })
        ));
        assert!(matches!(
            host.erase_block(0x1000),
            Err(Error::Misaligned { .. })
        ));
    }

    #[test]
    fn out_of_bounds_rejected() {
        let mut host = DummyHost::new_default();
        let size = host.config().size as u32;
        let mut buf = [0u8; 4];
        assert!(matches!(
            host.read(size - 2, &mut buf),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            host.erase_sector(size),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn transport_fault_fires_once_after_countdown() {
        let mut host = DummyHost::new_default();
        host.inject_fault(FaultKind::Transport, 2);
        host.program_page(0x000, &[0x11]).unwrap();
        host.program_page(0x001, &[0x22]).unwrap();
        let err = host.program_page(0x002, &[0x33]).unwrap_err();
        assert!(matches!(err, Error::Transport { addr: Some(0x002) }));
        // One-shot: the next primitive succeeds again
        host.program_page(0x003, &[0x44]).unwrap();
    }

    #[test]
    fn cleared_fault_never_fires() {
        let mut host = DummyHost::new_default();
        host.inject_fault(FaultKind::Transport, 0);
        host.clear_fault();
        host.program_page(0x000, &[0x11]).unwrap();
        host.wait_idle(10_000).unwrap();
    }

    #[test]
    fn timeout_fault_hits_the_busy_wait() {
        let mut host = DummyHost::new_default();
        host.inject_fault(FaultKind::Timeout, 0);
        host.program_page(0x000, &[0x11]).unwrap();
        assert_eq!(host.read_status().unwrap(), STATUS_BUSY);
        assert!(matches!(host.wait_idle(10_000), Err(Error::Timeout { .. })));
        host.wait_idle(10_000).unwrap();
    }
}
