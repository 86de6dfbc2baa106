//! CLI argument parsing

use clap::{Parser, Subcommand};
use norspi_core::host::{ClockSpeed, ReadMode};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

fn parse_speed(s: &str) -> Result<ClockSpeed, String> {
    let mhz: u32 = s
        .trim_end_matches("MHz")
        .trim_end_matches("mhz")
        .parse()
        .map_err(|e| format!("Invalid speed: {}", e))?;
    ClockSpeed::LADDER
        .iter()
        .copied()
        .find(|tier| Some(tier.hz()) == mhz.checked_mul(1_000_000))
        .ok_or_else(|| {
            format!(
                "Unsupported speed {} MHz (supported: 5, 10, 20, 26, 40, 80)",
                mhz
            )
        })
}

fn parse_mode(s: &str) -> Result<ReadMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "slow" | "slowrd" => Ok(ReadMode::Slow),
        "fast" | "fastrd" => Ok(ReadMode::Fast),
        "dout" => Ok(ReadMode::DualOut),
        "dio" => Ok(ReadMode::DualIo),
        "qout" => Ok(ReadMode::QuadOut),
        "qio" => Ok(ReadMode::QuadIo),
        other => Err(format!(
            "Unknown read mode '{}' (expected slow, fast, dout, dio, qout or qio)",
            other
        )),
    }
}

#[derive(Parser)]
#[command(name = "norspi")]
#[command(author, version, about = "SPI NOR flash access engine", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Bus clock speed in MHz (5, 10, 20, 26, 40, 80)
    #[arg(long, global = true, default_value = "80", value_parser = parse_speed)]
    pub speed: ClockSpeed,

    /// Read I/O mode (slow, fast, dout, dio, qout, qio)
    #[arg(long, global = true, default_value = "fast", value_parser = parse_mode)]
    pub mode: ReadMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a blank (all-erased) flash image
    Create {
        /// Image file to create
        #[arg(short, long)]
        image: PathBuf,

        /// Image size in bytes (hex or decimal, power of two)
        #[arg(short, long, value_parser = parse_hex_u32)]
        size: u32,
    },

    /// Show chip information for an image
    Info {
        /// Flash image file
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Read a range of the flash into a file
    Read {
        /// Flash image file
        #[arg(short, long)]
        image: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (defaults to the rest of the chip)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write a file into the flash
    Write {
        /// Flash image file
        #[arg(short, long)]
        image: PathBuf,

        /// Input file path
        #[arg(long)]
        input: PathBuf,

        /// Destination address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        offset: u32,

        /// Don't erase the covering sectors before writing
        #[arg(long)]
        no_erase: bool,

        /// Verify after writing
        #[arg(long, default_value = "true")]
        verify: bool,
    },

    /// Erase a region (or the whole chip)
    Erase {
        /// Flash image file
        #[arg(short, long)]
        image: PathBuf,

        /// Start address for partial erase (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32)]
        start: Option<u32>,

        /// Length of region to erase (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },
}
