use derive_more::{Display, From, Into};

use crate::io::SECTOR_SIZE;

#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, Ord, PartialOrd, PartialEq)]
pub struct SectorID(u64);

impl SectorID {
    pub const MBR: Self = Self(0);
}

impl<I: Into<u64>> core::ops::Add<I> for SectorID {
    type Output = Self;

    fn add(self, rhs: I) -> Self {
        Self(self.0 + rhs.into())
    }
}

impl<I: Into<u64>> core::ops::AddAssign<I> for SectorID {
    fn add_assign(&mut self, rhs: I) {
        self.0 += rhs.into()
    }
}

impl core::ops::Sub for SectorID {
    type Output = u64;

    fn sub(self, rhs: Self) -> u64 {
        self.0 - rhs.0
    }
}

/// Contiguous sector range on a device, usually one MBR partition
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub start: SectorID,
    pub num_sectors: u64,
}

impl Partition {
    pub fn new<I: Into<SectorID>>(start: I, num_sectors: u64) -> Self {
        Self { start: start.into(), num_sectors }
    }

    pub fn size(&self) -> u64 {
        self.num_sectors * SECTOR_SIZE as u64
    }

    /// First sector after this partition
    pub fn end(&self) -> SectorID {
        self.start + self.num_sectors
    }
}

impl core::fmt::Display for Partition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}+{}", self.start, self.num_sectors)
    }
}
