use core::mem::{size_of, transmute};

use bitfield::bitfield;
use derive_more::{Display, From, Into};

use crate::endian::Little as LE;
use crate::types::Partition;

pub const ENTRY_SIZE: usize = 16;

bitfield! {
    /// Second and third byte of a CHS address
    #[derive(Copy, Clone, Default)]
    struct CylinderSector(u16);
    u8, sector, set_sector: 5, 0;
    u16, cylinder_high, set_cylinder_high: 7, 6;
    u16, cylinder_low, set_cylinder_low: 15, 8;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Chs {
    /// 10 bits
    pub cylinder: u16,
    pub head: u8,
    /// 6 bits, 1 based
    pub sector: u8,
}

impl Chs {
    /// Placeholder addresses for partitions on LBA addressed disks
    pub const LBA_FIRST: Self = Self { cylinder: 0, head: 1, sector: 1 };
    pub const LBA_LAST: Self = Self { cylinder: 1023, head: 254, sector: 63 };

    pub fn to_bytes(self) -> [u8; 3] {
        let mut cs = CylinderSector(0);
        cs.set_sector(self.sector & 0x3F);
        cs.set_cylinder_high((self.cylinder >> 8) & 0x3);
        cs.set_cylinder_low(self.cylinder & 0xFF);
        let [low, high] = cs.0.to_le_bytes();
        [self.head, low, high]
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        let cs = CylinderSector(u16::from_le_bytes([bytes[1], bytes[2]]));
        let cylinder = cs.cylinder_high() << 8 | cs.cylinder_low();
        Self { cylinder, head: bytes[0], sector: cs.sector() }
    }
}

#[derive(Copy, Clone, Debug, Default, Display, From, Into, PartialEq, Eq)]
#[display("{_0:#04x}")]
pub struct PartitionKind(u8);

impl PartitionKind {
    pub const EMPTY: Self = Self(0);
    pub const FAT32_LBA: Self = Self(0x0C);
    pub const LINUX: Self = Self(0x83);
}

#[derive(Copy, Clone, Debug, Default)]
#[repr(C)]
struct RawEntry {
    boot_indicator: u8,
    first: [u8; 3],
    kind: u8,
    last: [u8; 3],
    lba: LE<u32>,
    num_sectors: LE<u32>,
}

const _: () = assert!(size_of::<RawEntry>() == ENTRY_SIZE);

/// One of the four primary partition slots
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionEntry {
    pub bootable: bool,
    pub kind: PartitionKind,
    pub first: Chs,
    pub last: Chs,
    pub lba: u32,
    pub num_sectors: u32,
}

impl PartitionEntry {
    pub fn is_used(&self) -> bool {
        self.kind != PartitionKind::EMPTY && self.num_sectors > 0
    }

    pub fn partition(&self) -> Partition {
        Partition::new(self.lba as u64, self.num_sectors as u64)
    }

    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE] {
        let raw = RawEntry {
            boot_indicator: if self.bootable { 0x80 } else { 0 },
            first: self.first.to_bytes(),
            kind: self.kind.into(),
            last: self.last.to_bytes(),
            lba: self.lba.into(),
            num_sectors: self.num_sectors.into(),
        };
        unsafe { transmute(raw) }
    }

    pub fn from_bytes(bytes: [u8; ENTRY_SIZE]) -> Self {
        let raw: RawEntry = unsafe { transmute(bytes) };
        Self {
            bootable: raw.boot_indicator & 0x80 > 0,
            kind: raw.kind.into(),
            first: Chs::from_bytes(raw.first),
            last: Chs::from_bytes(raw.last),
            lba: raw.lba.to_ne(),
            num_sectors: raw.num_sectors.to_ne(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Chs, PartitionEntry, PartitionKind};

    #[test]
    fn test_chs_bytes() {
        let chs = Chs { cylinder: 0x2A5, head: 0x10, sector: 0x3F };
        // Cylinder bits 8..9 ride on top of the sector byte
        assert_eq!(chs.to_bytes(), [0x10, 0xBF, 0xA5]);
        assert_eq!(Chs::from_bytes([0x10, 0xBF, 0xA5]), chs);
        assert_eq!(Chs::LBA_LAST.to_bytes(), [0xFE, 0xFF, 0xFF]);
        assert_eq!(Chs::LBA_FIRST.to_bytes(), [0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_entry_bytes() {
        let entry = PartitionEntry {
            bootable: false,
            kind: PartitionKind::FAT32_LBA,
            first: Chs { cylinder: 2, head: 0, sector: 1 },
            last: Chs { cylinder: 1000, head: 63, sector: 32 },
            lba: 0x12345678,
            num_sectors: 0x00ABCDEF,
        };
        let bytes = entry.to_bytes();
        let expected = hex!("00 00 01 02 0C 3F E0 E8 78 56 34 12 EF CD AB 00");
        assert_eq!(bytes, expected);
        assert_eq!(PartitionEntry::from_bytes(bytes), entry);
        assert!(entry.is_used());
        assert_eq!(entry.partition().num_sectors, 0x00ABCDEF);

        let bootable = PartitionEntry { bootable: true, ..entry };
        assert_eq!(bootable.to_bytes()[0], 0x80);
        assert!(!PartitionEntry::default().is_used());
    }
}
