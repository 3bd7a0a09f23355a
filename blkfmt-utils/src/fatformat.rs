use blkfmt::fat32::{self, Options};
use blkfmt::io::std::FileIO;
use chrono::{Datelike, Local, Timelike};

use crate::{Error, FatFormat};

pub fn parse_volume_id(text: &str) -> Result<u32, String> {
    let result = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    result.map_err(|e| format!("Invalid volume ID {}: {}", text, e))
}

/// Same scheme as DOS FORMAT, date and time words summed pairwise
fn timestamp_id() -> u32 {
    let now = Local::now();
    let centiseconds = now.timestamp_subsec_millis() / 10;
    let low = ((now.month() << 8) | now.day()) + ((now.second() << 8) | centiseconds);
    let high = ((now.hour() << 8) | now.minute()) + now.year() as u32;
    (high & 0xFFFF) << 16 | (low & 0xFFFF)
}

pub fn fatformat(io: &mut FileIO, args: &FatFormat) -> Result<(), Error> {
    let mut options = Options { mirror_fat: args.mirror_fat, ..Default::default() };
    match (args.volume_id, args.timestamp_id) {
        (Some(volume_id), _) => options.volume_id = volume_id,
        (None, true) => options.volume_id = timestamp_id(),
        (None, false) => (),
    }
    if let Some(label) = args.label.as_ref() {
        options = options.with_label(label);
    }
    let fat_size = fat32::format_partition(io, args.partition, &options)?;
    println!("Partition {} formatted, volume ID {:08X}, FAT size {} sectors", args.partition, options.volume_id, fat_size);
    Ok(())
}
