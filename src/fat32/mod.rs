//! FAT32 volume formatting.
//!
//! Lays down the reserved region (boot sector plus FSInfo), zeroes both FAT copies and
//! the root directory cluster, then marks clusters 0 to 2 as allocated. Only the
//! structures of an empty volume are written, the data region is left untouched.

pub mod boot;
mod fat;

use core::fmt::Debug;

pub use boot::{BootSector, FSInfo};

use crate::error::{Error, VolumeError};
use crate::io::{self, Wrap, ERASE_SECTORS};
use crate::mbr::MasterBootRecord;
use crate::types::{Partition, SectorID};

pub const RESERVED_SECTORS: u16 = 32;
pub const NUMBER_OF_FATS: u8 = 2;

/// 64MiB, anything smaller is refused
pub const MIN_SECTORS: u64 = 0x20000;

/// Upper bound in sectors, sectors per cluster
const CLUSTER_TIERS: [(u64, u8); 5] = [
    (0x20000, 1),    // 64MiB
    (0x40000, 2),    // 128MiB
    (0x80000, 4),    // 256MiB
    (0xFA0000, 8),   // 8GB
    (0x1F40000, 16), // 16GB
];

fn pad<const N: usize>(text: &str) -> [u8; N] {
    let mut bytes = [b' '; N];
    let length = core::cmp::min(text.len(), N);
    bytes[..length].copy_from_slice(&text.as_bytes()[..length]);
    bytes
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub oem_name: [u8; 8],
    pub volume_id: u32,
    /// Space padded
    pub volume_label: [u8; 11],
    /// Also write the FAT head into the second FAT
    pub mirror_fat: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { oem_name: *b"SAMSUNG ", volume_id: 0x3333, volume_label: pad("NO NAME"), mirror_fat: false }
    }
}

impl Options {
    /// Truncated to 11 bytes
    pub fn with_label(mut self, label: &str) -> Self {
        self.volume_label = pad(label);
        self
    }

    pub fn with_oem_name(mut self, oem_name: &str) -> Self {
        self.oem_name = pad(oem_name);
        self
    }
}

pub fn sectors_per_cluster(num_sectors: u64) -> Result<u8, VolumeError> {
    if num_sectors < MIN_SECTORS {
        return Err(VolumeError::TooSmall(num_sectors));
    }
    if num_sectors > u32::MAX as u64 {
        return Err(VolumeError::TooLarge(num_sectors));
    }
    let tier = CLUSTER_TIERS.iter().find(|(limit, _)| num_sectors <= *limit);
    Ok(tier.map(|&(_, sectors)| sectors).unwrap_or(32))
}

/// Sectors per FAT copy
pub fn fat_size(num_sectors: u32, sectors_per_cluster: u8) -> u32 {
    num_sectors / (sectors_per_cluster as u32 * 128)
}

/// Both FATs plus the root directory cluster, in whole erase batches
fn fat_erase_extent(num_sectors: u64, fat_size: u32, sectors_per_cluster: u8) -> u64 {
    let extent = fat_size as u64 * NUMBER_OF_FATS as u64 + sectors_per_cluster as u64;
    let rounded = extent.div_ceil(ERASE_SECTORS as u64) * ERASE_SECTORS as u64;
    core::cmp::min(rounded, num_sectors - RESERVED_SECTORS as u64)
}

/// Formats `partition` as an empty FAT32 volume, returns sectors per FAT
#[cfg_attr(not(feature = "async"), deasync::deasync)]
pub async fn format<E, IO>(io: &mut IO, partition: Partition, options: &Options) -> Result<u32, Error<E>>
where
    E: Debug,
    IO: io::IO<Error = E>,
{
    let sectors_per_cluster = sectors_per_cluster(partition.num_sectors)?;
    let num_sectors = partition.num_sectors as u32;
    let fat_size = fat_size(num_sectors, sectors_per_cluster);
    info!("Format partition {} as FAT32, {} sectors per cluster", partition, sectors_per_cluster);
    debug!("FAT size {} sectors", fat_size);

    let mut io = io.wrap();
    let start = partition.start;
    io.erase(start, RESERVED_SECTORS as u64).await?;

    let boot_sector = BootSector::new(num_sectors, sectors_per_cluster, fat_size, options);
    io.write(start, &[boot_sector.to_sector()]).await?;
    io.write(start + boot::FSINFO_SECTOR, &[FSInfo::default().to_sector()]).await?;

    let fat_start = start + RESERVED_SECTORS;
    let extent = fat_erase_extent(partition.num_sectors, fat_size, sectors_per_cluster);
    debug!("Erase FAT region, {} sectors from sector {}", extent, fat_start);
    io.erase(fat_start, extent).await?;
    io.write(fat_start, &[fat::head()]).await?;
    if options.mirror_fat {
        io.write(fat_start + fat_size, &[fat::head()]).await?;
    }
    io.flush().await?;
    Ok(fat_size)
}

/// Formats partition `number` (1 based) of the MBR on `io`
#[cfg_attr(not(feature = "async"), deasync::deasync)]
pub async fn format_partition<E, IO>(io: &mut IO, number: usize, options: &Options) -> Result<u32, Error<E>>
where
    E: Debug,
    IO: io::IO<Error = E>,
{
    let mbr = MasterBootRecord::read(io).await?;
    let partition = mbr.partition(number)?;
    if partition.end() > SectorID::from(io.num_sectors()) {
        warn!("Partition {} runs past the end of device", partition);
    }
    format(io, partition, options).await
}
