use std::io::SeekFrom;
use std::path::Path;
#[cfg(not(feature = "async"))]
use std::{fs, io::prelude::*};

#[cfg(all(feature = "async", feature = "smol"))]
use smol::fs;
#[cfg(all(feature = "async", feature = "smol"))]
use smol::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
#[cfg(all(feature = "async", feature = "tokio"))]
use tokio::fs;
#[cfg(all(feature = "async", feature = "tokio"))]
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

#[cfg(feature = "async")]
use async_trait::async_trait;

use super::{Sector, SECTOR_SIZE};
use crate::types::SectorID;

/// Block device node or disk image file
#[derive(Debug)]
pub struct FileIO {
    file: fs::File,
    num_sectors: u64,
}

#[cfg_attr(not(feature = "async"), deasync::deasync)]
impl FileIO {
    pub async fn open<P: AsRef<Path>>(filepath: P) -> std::io::Result<Self> {
        let mut options = match () {
            #[cfg(feature = "async")]
            () => fs::OpenOptions::new(),
            #[cfg(not(feature = "async"))]
            () => fs::File::options(),
        };
        let mut file = options.read(true).write(true).open(filepath).await?;
        // Metadata length of a block device node is zero, seek to end instead
        let size = file.seek(SeekFrom::End(0)).await?;
        Ok(Self { file, num_sectors: size / SECTOR_SIZE as u64 })
    }
}

#[cfg_attr(feature = "async", async_trait)]
#[cfg_attr(not(feature = "async"), deasync::deasync)]
impl super::IO for FileIO {
    type Error = std::io::Error;

    fn num_sectors(&self) -> u64 {
        self.num_sectors
    }

    async fn read(&mut self, id: SectorID, sectors: &mut [Sector]) -> Result<usize, Self::Error> {
        let seek = SeekFrom::Start(u64::from(id) * SECTOR_SIZE as u64);
        self.file.seek(seek).await?;
        let mut count = 0;
        for sector in sectors.iter_mut() {
            let mut filled = 0;
            while filled < SECTOR_SIZE {
                match self.file.read(&mut sector[filled..]).await? {
                    0 => return Ok(count),
                    size => filled += size,
                }
            }
            count += 1;
        }
        Ok(count)
    }

    async fn write(&mut self, id: SectorID, sectors: &[Sector]) -> Result<usize, Self::Error> {
        let start = u64::from(id);
        if start >= self.num_sectors {
            return Ok(0);
        }
        let count = core::cmp::min(sectors.len() as u64, self.num_sectors - start) as usize;
        self.file.seek(SeekFrom::Start(start * SECTOR_SIZE as u64)).await?;
        self.file.write_all(super::flatten(&sectors[..count])).await?;
        Ok(count)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.file.flush().await?;
        match () {
            #[cfg(not(feature = "async"))]
            () => self.file.sync_data(),
            #[cfg(feature = "async")]
            () => self.file.sync_data().await,
        }
    }
}

#[cfg(all(test, not(feature = "async")))]
mod test {
    use super::FileIO;
    use crate::io::{IO, SECTOR_SIZE};
    use crate::types::SectorID;

    #[test]
    fn test_file_io() {
        let path = std::env::temp_dir().join(format!("blkfmt-{}.img", std::process::id()));
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(8 * SECTOR_SIZE as u64 + 100).unwrap();
        drop(file);

        let mut io = FileIO::open(&path).unwrap();
        assert_eq!(io.num_sectors(), 8);
        let sectors = [[0x5Au8; SECTOR_SIZE]; 3];
        assert_eq!(io.write(SectorID::from(2u64), &sectors).unwrap(), 3);
        // Clamped at capacity
        assert_eq!(io.write(SectorID::from(6u64), &sectors).unwrap(), 2);
        assert_eq!(io.write(SectorID::from(8u64), &sectors).unwrap(), 0);
        io.flush().unwrap();

        let mut buffer = [[0u8; SECTOR_SIZE]; 4];
        assert_eq!(io.read(SectorID::from(1u64), &mut buffer).unwrap(), 4);
        assert_eq!(buffer[0], [0u8; SECTOR_SIZE]);
        assert_eq!(&buffer[1..], &sectors);
        // Partial tail sector does not count
        assert_eq!(io.read(SectorID::from(7u64), &mut buffer).unwrap(), 1);
        std::fs::remove_file(&path).unwrap();
    }
}
