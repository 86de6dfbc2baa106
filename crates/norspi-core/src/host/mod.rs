//! Host Driver contract
//!
//! A host driver owns one physical transport configuration (bus id, clock
//! speed, I/O mode, chip-select line, input delay) and exposes the flash
//! primitives the engine is built from. Concrete implementations live in
//! their own crates, one per transport generation.

mod config;
mod traits;

pub use config::{
    check_mode_supported, ClockSpeed, HostCaps, HostConfig, PinRouting, ReadMode,
};
pub use traits::{FlashHost, STATUS_BUSY};
