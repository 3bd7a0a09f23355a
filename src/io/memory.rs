use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

#[cfg(all(feature = "async", not(feature = "std")))]
use alloc::boxed::Box;
#[cfg(feature = "async")]
use async_trait::async_trait;

use super::{Sector, SECTOR_SIZE};
use crate::types::SectorID;

/// Device held in memory, keeps a log of every write request
#[derive(Clone, Debug)]
pub struct MemoryIO {
    sectors: Vec<Sector>,
    writes: Vec<(SectorID, usize)>,
    bad_sector: Option<SectorID>,
}

impl MemoryIO {
    pub fn new(num_sectors: u64) -> Self {
        let sectors = vec![[0u8; SECTOR_SIZE]; num_sectors as usize];
        Self { sectors, writes: Vec::new(), bad_sector: None }
    }

    /// Every sector reads back as `byte` until overwritten
    pub fn filled(num_sectors: u64, byte: u8) -> Self {
        let sectors = vec![[byte; SECTOR_SIZE]; num_sectors as usize];
        Self { sectors, writes: Vec::new(), bad_sector: None }
    }

    /// Transfers stop right before `id`, reporting a short count
    pub fn with_bad_sector(mut self, id: SectorID) -> Self {
        self.bad_sector = Some(id);
        self
    }

    pub fn sector(&self, id: SectorID) -> &Sector {
        &self.sectors[u64::from(id) as usize]
    }

    pub fn sector_mut(&mut self, id: SectorID) -> &mut Sector {
        &mut self.sectors[u64::from(id) as usize]
    }

    /// (start, count) of every write request, in issue order
    pub fn writes(&self) -> &[(SectorID, usize)] {
        &self.writes
    }

    pub fn written(&self, id: SectorID) -> bool {
        self.writes.iter().any(|&(start, count)| start <= id && id < start + count as u64)
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear()
    }

    fn transferable(&self, id: SectorID, count: usize) -> usize {
        let start = u64::from(id);
        let mut end = core::cmp::min(start + count as u64, self.sectors.len() as u64);
        if let Some(bad) = self.bad_sector.map(u64::from) {
            if start <= bad && bad < end {
                end = bad;
            }
        }
        end.saturating_sub(start) as usize
    }
}

#[cfg_attr(feature = "async", async_trait)]
#[cfg_attr(not(feature = "async"), deasync::deasync)]
impl super::IO for MemoryIO {
    type Error = Infallible;

    fn num_sectors(&self) -> u64 {
        self.sectors.len() as u64
    }

    async fn read(&mut self, id: SectorID, sectors: &mut [Sector]) -> Result<usize, Self::Error> {
        let count = self.transferable(id, sectors.len());
        if count == 0 {
            return Ok(0);
        }
        let start = u64::from(id) as usize;
        sectors[..count].copy_from_slice(&self.sectors[start..start + count]);
        Ok(count)
    }

    async fn write(&mut self, id: SectorID, sectors: &[Sector]) -> Result<usize, Self::Error> {
        self.writes.push((id, sectors.len()));
        let count = self.transferable(id, sectors.len());
        if count == 0 {
            return Ok(0);
        }
        let start = u64::from(id) as usize;
        self.sectors[start..start + count].copy_from_slice(&sectors[..count]);
        Ok(count)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
