use core::mem::transmute;

use crate::endian::Little as LE;
use crate::io::{Sector, SECTOR_SIZE};

/// Cluster 0 carries the media descriptor in its low byte
pub const MEDIA_ENTRY: u32 = 0x0FFFFF00 | super::boot::MEDIA_FIXED as u32;
pub const END_OF_CHAIN: u32 = 0x0FFFFFFF;

pub const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / 4;

/// First FAT sector of a fresh volume: two reserved entries plus the
/// single cluster chain of the root directory
pub fn head() -> Sector {
    let mut entries = [LE::<u32>::default(); ENTRIES_PER_SECTOR];
    entries[0] = MEDIA_ENTRY.into();
    entries[1] = END_OF_CHAIN.into();
    entries[super::boot::ROOT_CLUSTER as usize] = END_OF_CHAIN.into();
    unsafe { transmute(entries) }
}

#[cfg(test)]
mod test {
    #[test]
    fn test_head() {
        let sector = super::head();
        assert_eq!(&sector[..12], &hex!("F8 FF FF 0F FF FF FF 0F FF FF FF 0F"));
        assert!(sector[12..].iter().all(|&b| b == 0));
    }
}
