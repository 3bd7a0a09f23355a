//! Classic MBR with four primary partitions.
//!
//! Partitions 1 to 3 get the requested sizes after a 16MiB lead-in, the last one takes
//! whatever remains except a 10MiB tail. The remainder partition is stored in the first
//! table slot, followed by the three sized ones.

pub mod entry;
pub mod geometry;

use core::fmt::Debug;
use core::mem::{size_of, transmute};

pub use entry::{Chs, PartitionEntry, PartitionKind};
use entry::ENTRY_SIZE;
pub use geometry::{AddressMode, Geometry};

use crate::error::{Error, GeometryError, PartitionError};
use crate::io::{self, Sector, Wrap, SECTOR_SIZE};
use crate::types::{Partition, SectorID};

pub const TABLE_OFFSET: usize = 0x1BE;
pub const SIGNATURE_OFFSET: usize = 0x1FE;
pub const SIGNATURE: [u8; 2] = hex!("55 AA");

pub const MIB: u64 = 1024 * 1024;
/// Kept free in front of the first partition
pub const DISK_START: u64 = 16 * MIB;
/// Kept free behind the last partition
pub const TAIL_RESERVE: u64 = 10 * MIB;

#[repr(C)]
struct RawMBR {
    bootcode: [u8; TABLE_OFFSET],
    entries: [[u8; ENTRY_SIZE]; 4],
    signature: [u8; 2],
}

const _: () = assert!(size_of::<RawMBR>() == SECTOR_SIZE);

/// Requested sizes of partition 1 to 3, unit byte
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub sizes: [u64; 3],
}

impl Default for Layout {
    /// System, user data and cache
    fn default() -> Self {
        Self { sizes: [1024 * MIB, 1024 * MIB, 300 * MIB] }
    }
}

impl Layout {
    /// Smaller user data partition for removable cards
    pub fn sd_card() -> Self {
        Self { sizes: [1024 * MIB, 300 * MIB, 300 * MIB] }
    }

    pub fn from_mib(sizes: [u64; 3]) -> Self {
        Self { sizes: sizes.map(|size| size * MIB) }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MasterBootRecord {
    /// In on-disk order, slot 0 at 0x1BE
    pub slots: [PartitionEntry; 4],
}

impl MasterBootRecord {
    pub fn build(total_sectors: u64, layout: &Layout) -> Result<Self, GeometryError> {
        let geometry = Geometry::new(total_sectors)?;
        let available = geometry.available_sectors();
        let mut start = geometry.sectors_for(DISK_START);
        let mut entries = [PartitionEntry::default(); 4];
        for (index, &size) in layout.sizes.iter().enumerate() {
            let num_sectors = geometry.sectors_for(size);
            if num_sectors == 0 {
                return Err(GeometryError::EmptyPartition(index + 1));
            }
            let end = start + num_sectors;
            if end > available {
                return Err(GeometryError::Exceeded { end, available });
            }
            entries[index] = geometry.entry(PartitionKind::LINUX, start, num_sectors);
            start = end;
        }

        let usable = available.saturating_sub(geometry.sectors_for(TAIL_RESERVE));
        if start >= usable {
            return Err(GeometryError::Exceeded { end: start, available: usable });
        }
        entries[3] = geometry.entry(PartitionKind::FAT32_LBA, start, usable - start);
        for entry in entries.iter() {
            debug!("Partition {} at {} of {} sectors", entry.kind, entry.lba, entry.num_sectors);
        }
        Ok(Self { slots: [entries[3], entries[0], entries[1], entries[2]] })
    }

    pub fn to_sector(&self) -> Sector {
        let raw = RawMBR {
            bootcode: [0u8; TABLE_OFFSET],
            entries: self.slots.map(|entry| entry.to_bytes()),
            signature: SIGNATURE,
        };
        unsafe { transmute(raw) }
    }

    pub fn from_sector(sector: &Sector) -> Result<Self, PartitionError> {
        let raw: &RawMBR = unsafe { transmute(sector) };
        if raw.signature != SIGNATURE {
            return Err(PartitionError::Signature(raw.signature));
        }
        Ok(Self { slots: raw.entries.map(PartitionEntry::from_bytes) })
    }

    /// `number` counts from 1, in slot order
    pub fn partition(&self, number: usize) -> Result<Partition, PartitionError> {
        match number.checked_sub(1).and_then(|index| self.slots.get(index)) {
            Some(entry) if entry.is_used() => Ok(entry.partition()),
            _ => Err(PartitionError::NoSuchPartition(number)),
        }
    }

    /// Used entries along with their partition number
    pub fn partitions(&self) -> heapless::Vec<(usize, PartitionEntry), 4> {
        let iter = self.slots.iter().enumerate().filter(|(_, entry)| entry.is_used());
        iter.map(|(index, entry)| (index + 1, *entry)).collect()
    }
}

#[cfg_attr(not(feature = "async"), deasync::deasync)]
impl MasterBootRecord {
    pub async fn read<E, IO>(io: &mut IO) -> Result<Self, Error<E>>
    where
        E: Debug,
        IO: io::IO<Error = E>,
    {
        let sector = Self::read_sector(io).await?;
        Ok(Self::from_sector(&sector)?)
    }

    /// Sector 0 as is, signature not checked
    pub async fn read_sector<E, IO>(io: &mut IO) -> Result<Sector, Error<E>>
    where
        E: Debug,
        IO: io::IO<Error = E>,
    {
        let mut sector = [[0u8; SECTOR_SIZE]; 1];
        io.wrap().read(SectorID::MBR, &mut sector).await?;
        Ok(sector[0])
    }

    /// Refuses to overwrite a sector 0 without MBR signature unless `force`
    pub async fn write<E, IO>(&self, io: &mut IO, force: bool) -> Result<(), Error<E>>
    where
        E: Debug,
        IO: io::IO<Error = E>,
    {
        let mut io = io.wrap();
        if !force {
            let mut sector = [[0u8; SECTOR_SIZE]; 1];
            io.read(SectorID::MBR, &mut sector).await?;
            let signature = [sector[0][SIGNATURE_OFFSET], sector[0][SIGNATURE_OFFSET + 1]];
            if signature != SIGNATURE {
                warn!("MBR is broken, signature {:02X?}", signature);
                return Err(PartitionError::Signature(signature).into());
            }
        }
        io.write(SectorID::MBR, &[self.to_sector()]).await?;
        io.flush().await
    }

    /// Partitions the whole device according to `layout`
    pub async fn create<E, IO>(io: &mut IO, layout: &Layout, force: bool) -> Result<Self, Error<E>>
    where
        E: Debug,
        IO: io::IO<Error = E>,
    {
        let mbr = Self::build(io.num_sectors(), layout)?;
        mbr.write(io, force).await?;
        info!("Partition table written");
        Ok(mbr)
    }
}
