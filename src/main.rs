//! norspi - SPI NOR flash access engine
//!
//! Byte-addressed read/write/erase on SPI NOR flash chips, on top of a
//! pluggable `FlashHost` bus driver. This binary drives the engine against
//! file-backed emulated chips; the same engine runs unchanged against real
//! host bindings.
//!
//! An image file is interpreted as the raw contents of a Winbond chip of
//! the matching capacity (the file size must be a supported power of two).

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use indicatif::{ProgressBar, ProgressStyle};
use norspi_core::chip::{find_by_jedec_id, Chip, JedecId};
use norspi_core::guard::BusArbiter;
use norspi_core::host::{ClockSpeed, ReadMode};
use norspi_dummy::{DummyConfig, DummyHost};
use std::fs;
use std::path::Path;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() -> CliResult {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Create { image, size } => cmd_create(&image, size),
        Commands::Info { image } => {
            let chip = open_chip(&image, cli.speed, cli.mode)?;
            print_chip_info(&chip);
            Ok(())
        }
        Commands::Read {
            image,
            output,
            start,
            length,
        } => cmd_read(&image, cli.speed, cli.mode, &output, start, length),
        Commands::Write {
            image,
            input,
            offset,
            no_erase,
            verify,
        } => cmd_write(&image, cli.speed, cli.mode, &input, offset, no_erase, verify),
        Commands::Erase {
            image,
            start,
            length,
        } => cmd_erase(&image, cli.speed, cli.mode, start, length),
    }
}

/// Map an image size onto the JEDEC id of the matching Winbond part
fn image_device_id(size: usize) -> Result<JedecId, Box<dyn std::error::Error>> {
    if !size.is_power_of_two() {
        return Err(format!("image size {} is not a power of two", size).into());
    }
    let id = JedecId::new(0xEF, 0x4000 | size.trailing_zeros() as u16);
    if find_by_jedec_id(id).is_none() {
        return Err(format!("no known chip of size {} bytes", size).into());
    }
    Ok(id)
}

fn open_chip(
    image: &Path,
    speed: ClockSpeed,
    mode: ReadMode,
) -> Result<Chip<DummyHost>, Box<dyn std::error::Error>> {
    let data = fs::read(image)?;
    let id = image_device_id(data.len())?;
    let config = DummyConfig {
        manufacturer_id: id.manufacturer,
        device_id: id.device,
        size: data.len(),
        ..DummyConfig::default()
    };
    let host = DummyHost::with_data(config, &data);
    let mut chip = Chip::new(host, BusArbiter::new()).with_io(speed, mode);
    chip.init()?;
    Ok(chip)
}

/// Write the chip contents back to the image file
fn save_image(chip: Chip<DummyHost>, image: &Path) -> CliResult {
    let host = chip.detach();
    fs::write(image, host.data())?;
    Ok(())
}

fn cmd_create(image: &Path, size: u32) -> CliResult {
    image_device_id(size as usize)?;
    fs::write(image, vec![0xFFu8; size as usize])?;
    log::info!("created blank {} byte image at {}", size, image.display());
    Ok(())
}

fn print_chip_info(chip: &Chip<DummyHost>) {
    println!("Flash Chip Information");
    println!("======================");
    println!();
    if let (Some(rec), Ok(id)) = (chip.record(), chip.jedec_id()) {
        println!("Vendor:          {}", rec.vendor);
        println!("Name:            {}", rec.name);
        println!("JEDEC ID:        {}", id);
        println!(
            "Size:            {} bytes ({} KiB / {} MiB)",
            rec.geometry.total_size,
            rec.geometry.total_size / 1024,
            rec.geometry.total_size / (1024 * 1024)
        );
        println!("Page size:       {} bytes", rec.geometry.page_size);
        println!("Sector size:     {} bytes", rec.geometry.sector_size);
        println!("Sectors:         {}", rec.geometry.sector_count());
        println!("Block size:      {} bytes", rec.geometry.block_size);
        println!("Max speed:       {}", rec.max_speed);
        println!();
        println!("Bus speed:       {}", chip.speed());
        println!("Read mode:       {}", chip.read_mode());
    }
}

fn cmd_read(
    image: &Path,
    speed: ClockSpeed,
    mode: ReadMode,
    output: &Path,
    start: u32,
    length: Option<u32>,
) -> CliResult {
    let mut chip = open_chip(image, speed, mode)?;
    let size = chip.size()?;
    let length = match length {
        Some(l) => l,
        None => size.saturating_sub(start),
    };
    let mut buf = vec![0u8; length as usize];
    chip.read(start, &mut buf)?;
    fs::write(output, &buf)?;
    log::info!(
        "read {} bytes at {:#x} into {}",
        length,
        start,
        output.display()
    );
    Ok(())
}

fn cmd_write(
    image: &Path,
    speed: ClockSpeed,
    mode: ReadMode,
    input: &Path,
    offset: u32,
    no_erase: bool,
    verify: bool,
) -> CliResult {
    let data = fs::read(input)?;
    let len = u32::try_from(data.len()).map_err(|_| "input file too large for a flash chip")?;
    let mut chip = open_chip(image, speed, mode)?;

    if no_erase {
        write_with_progress(&mut chip, offset, &data)?;
    } else {
        // Preserve the untouched parts of the covering sectors: read, merge,
        // erase, write back the whole sector-aligned span.
        let sector = chip.geometry()?.sector_size;
        let start = offset - offset % sector;
        let end = (offset + len).div_ceil(sector) * sector;
        let mut merged = vec![0u8; (end - start) as usize];
        chip.read(start, &mut merged)?;
        merged[(offset - start) as usize..][..data.len()].copy_from_slice(&data);
        chip.erase_region(start, end - start)?;
        write_with_progress(&mut chip, start, &merged)?;
    }

    if verify {
        let mut readback = vec![0u8; data.len()];
        chip.read(offset, &mut readback)?;
        if readback != data {
            return Err("verification failed: readback differs from input".into());
        }
        log::info!("verified {} bytes at {:#x}", len, offset);
    }

    save_image(chip, image)
}

fn cmd_erase(
    image: &Path,
    speed: ClockSpeed,
    mode: ReadMode,
    start: Option<u32>,
    length: Option<u32>,
) -> CliResult {
    let mut chip = open_chip(image, speed, mode)?;
    match (start, length) {
        (None, None) => {
            log::info!("erasing whole chip");
            chip.erase_chip()?;
        }
        (Some(start), Some(length)) => {
            log::info!("erasing {} bytes at {:#x}", length, start);
            chip.erase_region(start, length)?;
        }
        _ => return Err("--start and --length must be given together".into()),
    }
    save_image(chip, image)
}

fn write_with_progress(chip: &mut Chip<DummyHost>, offset: u32, data: &[u8]) -> CliResult {
    const CHUNK: usize = 64 * 1024;
    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(ProgressStyle::default_bar());
    for (i, chunk) in data.chunks(CHUNK).enumerate() {
        chip.write(offset + (i * CHUNK) as u32, chunk)?;
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();
    Ok(())
}
