#[cfg(feature = "std")]
pub mod std;

pub mod memory;

#[cfg(all(feature = "async", not(feature = "std")))]
use alloc::boxed::Box;
use core::fmt::Debug;
use core::ops::DerefMut;

#[cfg(feature = "async")]
use async_trait::async_trait;

use crate::error::Error;
use crate::types::SectorID;

pub const SECTOR_SIZE: usize = 512;
pub type Sector = [u8; SECTOR_SIZE];

/// Sectors written per call when zeroing a region, 8KiB
pub const ERASE_SECTORS: usize = 16;

pub(crate) fn flatten(sectors: &[Sector]) -> &[u8] {
    unsafe { core::slice::from_raw_parts(sectors.as_ptr() as *const u8, sectors.len() * SECTOR_SIZE) }
}

/// Caller guarantees bytes.len() is a multiple of SECTOR_SIZE
pub(crate) fn as_sectors(bytes: &[u8]) -> &[Sector] {
    let len = bytes.len() / SECTOR_SIZE;
    unsafe { core::slice::from_raw_parts(bytes.as_ptr() as *const Sector, len) }
}

/// Raw block device, addressed in 512B sectors.
///
/// `read` and `write` return the number of sectors actually transferred,
/// anything less than requested is treated as fatal by every operation in this crate.
#[cfg_attr(feature = "async", async_trait)]
#[cfg_attr(not(feature = "async"), deasync::deasync)]
pub trait IO {
    type Error: Debug;

    fn num_sectors(&self) -> u64;
    async fn read(&mut self, id: SectorID, sectors: &mut [Sector]) -> Result<usize, Self::Error>;
    async fn write(&mut self, id: SectorID, sectors: &[Sector]) -> Result<usize, Self::Error>;
    async fn flush(&mut self) -> Result<(), Self::Error>;
}

pub(crate) struct Wrapper<D>(D);

#[cfg_attr(not(feature = "async"), deasync::deasync)]
impl<E: Debug, T, D> Wrapper<D>
where
    T: IO<Error = E> + ?Sized,
    D: DerefMut<Target = T>,
{
    pub async fn read(&mut self, id: SectorID, sectors: &mut [Sector]) -> Result<(), Error<E>> {
        let expected = sectors.len();
        let actual = self.0.read(id, sectors).await.map_err(|e| Error::IO(e))?;
        if actual < expected {
            warn!("Short read from sector {}, {} of {}", id, actual, expected);
            return Err(Error::ShortIO { sector: id + actual as u64, expected, actual });
        }
        Ok(())
    }

    pub async fn write(&mut self, id: SectorID, sectors: &[Sector]) -> Result<(), Error<E>> {
        let expected = sectors.len();
        let actual = self.0.write(id, sectors).await.map_err(|e| Error::IO(e))?;
        if actual < expected {
            warn!("Short write from sector {}, {} of {}", id, actual, expected);
            return Err(Error::ShortIO { sector: id + actual as u64, expected, actual });
        }
        Ok(())
    }

    /// Repeat `pattern` over `count` sectors starting at `id`
    pub async fn fill(&mut self, id: SectorID, count: u64, pattern: &Sector) -> Result<(), Error<E>> {
        let sectors = [*pattern; ERASE_SECTORS];
        let mut offset = 0u64;
        while offset < count {
            let length = core::cmp::min(count - offset, ERASE_SECTORS as u64) as usize;
            self.write(id + offset, &sectors[..length]).await?;
            offset += length as u64;
        }
        Ok(())
    }

    /// Zero `count` sectors starting at `id`
    pub async fn erase(&mut self, id: SectorID, count: u64) -> Result<(), Error<E>> {
        trace!("Erase {} sectors from sector {}", count, id);
        self.fill(id, count, &[0u8; SECTOR_SIZE]).await
    }

    pub async fn flush(&mut self) -> Result<(), Error<E>> {
        self.0.flush().await.map_err(|e| Error::IO(e))
    }
}

pub(crate) trait Wrap {
    type Output;
    fn wrap(self) -> Self::Output;
}

impl<E: Debug, T, D> Wrap for D
where
    T: IO<Error = E> + ?Sized,
    D: DerefMut<Target = T>,
{
    type Output = Wrapper<D>;
    fn wrap(self) -> Self::Output {
        Wrapper(self)
    }
}
