// Boot sector and FSInfo sector

use core::mem::{size_of, transmute};

use super::Options;
use crate::endian::Little as LE;
use crate::io::{Sector, SECTOR_SIZE};

pub const JUMP_BOOT: [u8; 3] = hex!("EB 58 90");
pub const MEDIA_FIXED: u8 = 0xF8;
pub const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;
pub const FILESYSTEM_TYPE: [u8; 8] = *b"FAT32   ";
pub const BOOT_SIGNATURE: [u8; 2] = hex!("55 AA");

/// Cluster holding the root directory
pub const ROOT_CLUSTER: u32 = 2;
/// Partition relative
pub const FSINFO_SECTOR: u16 = 1;

#[derive(Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct BootSector {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: LE<u16>,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: LE<u16>,
    pub number_of_fats: u8,
    pub root_entries: LE<u16>,    // FAT12/16 only
    pub total_sectors16: LE<u16>, // FAT12/16 only
    pub media: u8,
    pub sectors_per_fat16: LE<u16>, // FAT12/16 only
    pub sectors_per_track: LE<u16>,
    pub number_of_heads: LE<u16>,
    pub hidden_sectors: LE<u32>,
    pub total_sectors32: LE<u32>,
    pub sectors_per_fat32: LE<u32>,
    pub ext_flags: LE<u16>,
    pub version: LE<u16>,
    pub root_cluster: LE<u32>,
    pub fsinfo_sector: LE<u16>,
    pub backup_boot_sector: LE<u16>, // 0 for none
    _reserved: [u8; 12],
    pub drive_number: u8,
    _reserved1: u8,
    pub extended_boot_signature: u8,
    pub volume_id: LE<u32>,
    pub volume_label: [u8; 11],
    pub filesystem_type: [u8; 8],
    pub bootcode: [u8; 420],
    pub signature: [u8; 2],
}

const _: () = assert!(size_of::<BootSector>() == SECTOR_SIZE);

impl BootSector {
    pub fn new(total_sectors: u32, sectors_per_cluster: u8, fat_size: u32, options: &Options) -> Self {
        Self {
            jump_boot: JUMP_BOOT,
            oem_name: options.oem_name,
            bytes_per_sector: (SECTOR_SIZE as u16).into(),
            sectors_per_cluster,
            reserved_sectors: super::RESERVED_SECTORS.into(),
            number_of_fats: super::NUMBER_OF_FATS,
            root_entries: LE::default(),
            total_sectors16: LE::default(),
            media: MEDIA_FIXED,
            sectors_per_fat16: LE::default(),
            sectors_per_track: LE::default(),
            number_of_heads: LE::default(),
            hidden_sectors: LE::default(),
            total_sectors32: total_sectors.into(),
            sectors_per_fat32: fat_size.into(),
            ext_flags: LE::default(),
            version: LE::default(),
            root_cluster: ROOT_CLUSTER.into(),
            fsinfo_sector: FSINFO_SECTOR.into(),
            backup_boot_sector: LE::default(),
            _reserved: [0u8; 12],
            drive_number: 0,
            _reserved1: 0,
            extended_boot_signature: EXTENDED_BOOT_SIGNATURE,
            volume_id: options.volume_id.into(),
            volume_label: options.volume_label,
            filesystem_type: FILESYSTEM_TYPE,
            bootcode: [0u8; 420],
            signature: BOOT_SIGNATURE,
        }
    }

    pub fn from_sector(sector: &Sector) -> &Self {
        unsafe { transmute(sector) }
    }

    pub fn to_sector(self) -> Sector {
        unsafe { transmute(self) }
    }

    pub fn is_fat32(&self) -> bool {
        self.signature == BOOT_SIGNATURE && self.filesystem_type == FILESYSTEM_TYPE
    }

    /// Cluster size in bytes
    pub fn cluster_size(&self) -> u32 {
        self.sectors_per_cluster as u32 * self.bytes_per_sector.to_ne() as u32
    }
}

pub const LEAD_SIGNATURE: u32 = 0x41615252;
pub const STRUCT_SIGNATURE: u32 = 0x61417272;
pub const TRAIL_SIGNATURE: u32 = 0xAA550000;
pub const UNKNOWN_FREE_COUNT: u32 = 0xFFFFFFFF;

#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct FSInfo {
    pub lead_signature: LE<u32>,
    _reserved: [u8; 480],
    pub struct_signature: LE<u32>,
    pub free_count: LE<u32>,
    /// Allocation hint
    pub next_free: LE<u32>,
    _reserved1: [u8; 12],
    pub trail_signature: LE<u32>,
}

const _: () = assert!(size_of::<FSInfo>() == SECTOR_SIZE);

impl Default for FSInfo {
    /// Free cluster count unknown, allocation starts after the root directory
    fn default() -> Self {
        Self {
            lead_signature: LEAD_SIGNATURE.into(),
            _reserved: [0u8; 480],
            struct_signature: STRUCT_SIGNATURE.into(),
            free_count: UNKNOWN_FREE_COUNT.into(),
            next_free: (ROOT_CLUSTER + 1).into(),
            _reserved1: [0u8; 12],
            trail_signature: TRAIL_SIGNATURE.into(),
        }
    }
}

impl FSInfo {
    pub fn to_sector(self) -> Sector {
        unsafe { transmute(self) }
    }

    pub fn is_valid(&self) -> bool {
        self.lead_signature.to_ne() == LEAD_SIGNATURE
            && self.struct_signature.to_ne() == STRUCT_SIGNATURE
            && self.trail_signature.to_ne() == TRAIL_SIGNATURE
    }
}

#[cfg(test)]
mod test {
    use memoffset::offset_of;

    use super::{BootSector, FSInfo};
    use crate::fat32::Options;

    #[test]
    fn test_boot_sector_offsets() {
        assert_eq!(offset_of!(BootSector, bytes_per_sector), 11);
        assert_eq!(offset_of!(BootSector, sectors_per_cluster), 13);
        assert_eq!(offset_of!(BootSector, reserved_sectors), 14);
        assert_eq!(offset_of!(BootSector, number_of_fats), 16);
        assert_eq!(offset_of!(BootSector, media), 21);
        assert_eq!(offset_of!(BootSector, total_sectors32), 32);
        assert_eq!(offset_of!(BootSector, sectors_per_fat32), 36);
        assert_eq!(offset_of!(BootSector, root_cluster), 44);
        assert_eq!(offset_of!(BootSector, fsinfo_sector), 48);
        assert_eq!(offset_of!(BootSector, backup_boot_sector), 50);
        assert_eq!(offset_of!(BootSector, drive_number), 64);
        assert_eq!(offset_of!(BootSector, extended_boot_signature), 66);
        assert_eq!(offset_of!(BootSector, volume_id), 67);
        assert_eq!(offset_of!(BootSector, volume_label), 71);
        assert_eq!(offset_of!(BootSector, filesystem_type), 82);
        assert_eq!(offset_of!(BootSector, signature), 510);
    }

    #[test]
    fn test_fsinfo_offsets() {
        assert_eq!(offset_of!(FSInfo, struct_signature), 484);
        assert_eq!(offset_of!(FSInfo, free_count), 488);
        assert_eq!(offset_of!(FSInfo, next_free), 492);
        assert_eq!(offset_of!(FSInfo, trail_signature), 508);
    }

    #[test]
    fn test_boot_sector() {
        let sector = BootSector::new(204800, 2, 800, &Options::default()).to_sector();
        assert_eq!(&sector[..11], b"\xEB\x58\x90SAMSUNG ");
        assert_eq!(&sector[11..17], &[0x00, 0x02, 0x02, 0x20, 0x00, 0x02]);
        assert_eq!(sector[21], 0xF8);
        assert_eq!(&sector[32..40], &hex!("00 20 03 00 20 03 00 00"));
        assert_eq!(&sector[44..52], &hex!("02 00 00 00 01 00 00 00"));
        assert_eq!(&sector[64..71], &hex!("00 00 29 33 33 00 00"));
        assert_eq!(&sector[71..90], b"NO NAME    FAT32   ");
        assert!(sector[90..510].iter().all(|&b| b == 0));
        assert_eq!(&sector[510..], &[0x55, 0xAA]);

        let boot_sector = BootSector::from_sector(&sector);
        assert!(boot_sector.is_fat32());
        assert_eq!(boot_sector.cluster_size(), 1024);
        assert_eq!({ boot_sector.sectors_per_fat32 }.to_ne(), 800);
    }

    #[test]
    fn test_fsinfo() {
        let sector = FSInfo::default().to_sector();
        assert_eq!(&sector[..4], &hex!("52 52 61 41"));
        assert!(sector[4..484].iter().all(|&b| b == 0));
        assert_eq!(&sector[484..496], &hex!("72 72 41 61 FF FF FF FF 03 00 00 00"));
        assert_eq!(&sector[508..], &hex!("00 00 55 AA"));
        assert!(FSInfo::default().is_valid());
    }
}
