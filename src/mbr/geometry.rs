use super::entry::{Chs, PartitionEntry, PartitionKind};
use crate::error::GeometryError;
use crate::io::SECTOR_SIZE;

pub const MAX_CYLINDERS: u32 = 1023;
pub const MAX_HEADS: u32 = 255;
pub const MAX_SECTORS_PER_TRACK: u32 = 63;

/// Disks of at least this many sectors (about 8.4GB) are addressed by LBA
pub const LBA_THRESHOLD: u64 = 1023 * 254 * 63;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressMode {
    CHS,
    LBA,
}

/// Derived from the sector count on every partitioning, never stored
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub mode: AddressMode,
    pub cylinders: u32,
    pub heads: u32,
    pub sectors_per_track: u32,
    pub total_sectors: u32,
}

impl Geometry {
    pub fn new(total_sectors: u64) -> Result<Self, GeometryError> {
        let total = u32::try_from(total_sectors).map_err(|_| GeometryError::TooLarge(total_sectors))?;
        if total_sectors >= LBA_THRESHOLD {
            debug!("{} sectors, LBA mode", total_sectors);
            let (cylinders, heads, sectors_per_track) = (1023, 254, 63);
            return Ok(Self { mode: AddressMode::LBA, cylinders, heads, sectors_per_track, total_sectors: total });
        }

        // Closest to the cylinder ceiling wins, later pairs win ties
        let mut best = None;
        let mut diff_min = MAX_CYLINDERS;
        for heads in 1..=MAX_HEADS {
            for sectors_per_track in 1..=MAX_SECTORS_PER_TRACK {
                let cylinders = total / (heads * sectors_per_track);
                if cylinders == 0 || cylinders > MAX_CYLINDERS {
                    continue;
                }
                let diff = MAX_CYLINDERS - cylinders;
                if diff <= diff_min {
                    diff_min = diff;
                    best = Some((cylinders, heads, sectors_per_track));
                }
            }
        }
        let (cylinders, heads, sectors_per_track) = best.ok_or(GeometryError::NoGeometry(total_sectors))?;
        debug!("{} sectors, CHS mode {}/{}/{}", total_sectors, cylinders, heads, sectors_per_track);
        Ok(Self { mode: AddressMode::CHS, cylinders, heads, sectors_per_track, total_sectors: total })
    }

    /// Sectors per cylinder
    pub fn unit(&self) -> u32 {
        self.heads * self.sectors_per_track
    }

    pub fn available_sectors(&self) -> u64 {
        match self.mode {
            AddressMode::CHS => self.cylinders as u64 * self.unit() as u64,
            AddressMode::LBA => self.total_sectors as u64,
        }
    }

    /// Sector count for `bytes`. In CHS mode always rounded up to the next whole
    /// cylinder, even when already aligned.
    pub fn sectors_for(&self, bytes: u64) -> u64 {
        let sectors = bytes / SECTOR_SIZE as u64;
        match self.mode {
            AddressMode::CHS => (sectors / self.unit() as u64 + 1) * self.unit() as u64,
            AddressMode::LBA => sectors,
        }
    }

    pub fn chs(&self, lba: u32) -> Chs {
        let unit = self.unit();
        let temp = lba % unit;
        Chs {
            cylinder: (lba / unit) as u16,
            head: (temp / self.sectors_per_track) as u8,
            sector: (temp % self.sectors_per_track + 1) as u8,
        }
    }

    pub fn lba(&self, chs: Chs) -> u32 {
        let track = chs.cylinder as u32 * self.heads + chs.head as u32;
        track * self.sectors_per_track + chs.sector as u32 - 1
    }

    /// Caller guarantees `start + num_sectors` within 32 bits
    pub(crate) fn entry(&self, kind: PartitionKind, start: u64, num_sectors: u64) -> PartitionEntry {
        let (lba, num_sectors) = (start as u32, num_sectors as u32);
        let (first, last) = match self.mode {
            AddressMode::CHS => (self.chs(lba), self.chs(lba + num_sectors - 1)),
            AddressMode::LBA => (Chs::LBA_FIRST, Chs::LBA_LAST),
        };
        PartitionEntry { bootable: false, kind, first, last, lba, num_sectors }
    }
}
