//! Flash chip model
//!
//! Geometry, JEDEC identification, the static chip registry, the pure
//! address-splitting logic, and the byte-addressable `Chip` device built
//! on top of a host driver.

pub mod database;
#[cfg(feature = "std")]
mod device;
pub mod geometry;
pub mod split;

pub use database::{find_by_jedec_id, ChipRecord, JedecId, KNOWN_CHIPS};
#[cfg(feature = "std")]
pub use device::{Chip, ChipState};
pub use geometry::Geometry;
