//! norspi-core - byte-addressable access engine for SPI NOR flash
//!
//! This crate turns a raw, erase-before-write, page/sector-organized flash
//! chip into a byte-addressable random-access read/write/erase API. Arbitrary
//! offset/length requests are decomposed into device-legal page programs and
//! sector/block erases; bus sharing between chips is arbitrated explicitly.
//!
//! The physical transport is abstracted behind the [`host::FlashHost`] trait:
//! one implementation per bus generation provides the flash primitives
//! (read, program-page, erase-sector/block, wait-idle) and the engine never
//! touches wires itself.
//!
//! # Features
//!
//! - `std` - Enable standard library support (bus arbitration, `Chip`)
//! - `is_sync` - Compile the async engine code as synchronous
//!
//! # Example
//!
//! ```ignore
//! use norspi_core::chip::Chip;
//! use norspi_core::guard::BusArbiter;
//!
//! fn attach<H: norspi_core::host::FlashHost>(host: H) {
//!     let mut chip = Chip::new(host, BusArbiter::new());
//!     match chip.init() {
//!         Ok(()) => println!("found {} bytes of flash", chip.size().unwrap()),
//!         Err(e) => println!("init failed: {}", e),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod error;
#[cfg(feature = "std")]
pub mod guard;
pub mod host;

pub use error::{Error, Result};
