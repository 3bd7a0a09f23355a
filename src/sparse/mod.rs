//! Chunked (sparse) disk image replay.
//!
//! An image starts with a [`FileHeader`] followed by `total_chunks` records, each a
//! [`ChunkHeader`] plus payload. RAW chunks carry literal blocks, FILL chunks a 32-bit
//! pattern and DONT-CARE chunks nothing. Chunks are replayed onto consecutive sectors.

pub mod header;

use core::fmt::Debug;

pub use header::{ChunkHeader, ChunkType, FileHeader};
use header::{BLOCK_SIZE, CHUNK_HEADER_SIZE, FILE_HEADER_SIZE, MAGIC, MAJOR_VERSION};

use crate::error::{CapacityError, Error, FormatError, ImageError};
use crate::io::{self, as_sectors, Sector, Wrap, SECTOR_SIZE};
use crate::types::{Partition, SectorID};

const SECTORS_PER_BLOCK: u64 = BLOCK_SIZE as u64 / SECTOR_SIZE as u64;

/// What to do with FILL chunks
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FillPolicy {
    /// Leave the span untouched, assuming the medium already reads as the fill value
    #[default]
    Skip,
    /// Paint the fill value over the whole span
    Expand,
}

#[derive(Copy, Clone, Debug)]
pub struct Chunk<'a> {
    pub index: u32,
    pub chunk_type: ChunkType,
    pub num_blocks: u32,
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn num_sectors(&self) -> u64 {
        self.num_blocks as u64 * SECTORS_PER_BLOCK
    }

    fn data(&self) -> &'a [Sector] {
        as_sectors(&self.payload[..self.num_sectors() as usize * SECTOR_SIZE])
    }

    fn fill_value(&self) -> Result<[u8; 4], FormatError> {
        let total_size = (CHUNK_HEADER_SIZE + self.payload.len()) as u32;
        match self.payload.get(..4) {
            Some(bytes) => Ok([bytes[0], bytes[1], bytes[2], bytes[3]]),
            None => Err(FormatError::Framing { index: self.index, total_size }),
        }
    }
}

/// Walks chunk records, `total_size` of each record locates the next one
pub struct Chunks<'a> {
    bytes: &'a [u8],
    offset: usize,
    index: u32,
    total: u32,
}

impl<'a> Chunks<'a> {
    fn next_chunk(&mut self) -> Result<Chunk<'a>, FormatError> {
        let index = self.index;
        let remain = &self.bytes[self.offset..];
        let header = ChunkHeader::parse(remain).ok_or(FormatError::Truncated(self.offset))?;
        let total_size = header.total_size.to_ne();
        let framing = FormatError::Framing { index, total_size };
        if (total_size as usize) < CHUNK_HEADER_SIZE || total_size as usize > remain.len() {
            return Err(framing);
        }
        let payload = &remain[CHUNK_HEADER_SIZE..total_size as usize];
        let chunk_type = header.chunk_type();
        let num_blocks = header.chunk_size.to_ne();
        let chunk = Chunk { index, chunk_type, num_blocks, payload };
        if chunk_type == ChunkType::Raw && (payload.len() as u64) < chunk.num_sectors() * SECTOR_SIZE as u64 {
            return Err(framing);
        }
        self.offset += total_size as usize;
        Ok(chunk)
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<Chunk<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }
        let result = self.next_chunk();
        self.index = match result {
            Ok(_) => self.index + 1,
            Err(_) => self.total,
        };
        Some(result)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Image<'a> {
    header: FileHeader,
    bytes: &'a [u8],
}

impl<'a> Image<'a> {
    /// `Ok(None)` when magic does not match, which means a plain raw image.
    /// Every chunk record is framed and checked here, before anything is written.
    pub fn parse(bytes: &'a [u8]) -> Result<Option<Self>, FormatError> {
        let magic = match bytes.get(..4) {
            Some(b) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            None => return Ok(None),
        };
        if magic != MAGIC {
            return Ok(None);
        }
        let header = FileHeader::parse(bytes).ok_or(FormatError::Truncated(bytes.len()))?;
        let (major, minor) = (header.major_version.to_ne(), header.minor_version.to_ne());
        if major != MAJOR_VERSION {
            return Err(FormatError::Version(major, minor));
        }
        let file_header_size = header.file_header_size.to_ne();
        if file_header_size as usize != FILE_HEADER_SIZE {
            return Err(FormatError::FileHeaderSize(file_header_size));
        }
        let chunk_header_size = header.chunk_header_size.to_ne();
        if chunk_header_size as usize != CHUNK_HEADER_SIZE {
            return Err(FormatError::ChunkHeaderSize(chunk_header_size));
        }
        let block_size = header.block_size.to_ne();
        if block_size != BLOCK_SIZE {
            return Err(FormatError::BlockSize(block_size));
        }

        let image = Self { header, bytes };
        let mut num_blocks = 0u64;
        for chunk in image.chunks() {
            num_blocks += chunk?.num_blocks as u64;
        }
        if num_blocks > image.total_blocks() as u64 {
            return Err(FormatError::BlockCount(num_blocks));
        }
        debug!("Chunked image of {} blocks in {} chunks", image.total_blocks(), image.total_chunks());
        Ok(Some(image))
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn total_blocks(&self) -> u32 {
        self.header.total_blocks.to_ne()
    }

    pub fn total_chunks(&self) -> u32 {
        self.header.total_chunks.to_ne()
    }

    pub fn checksum(&self) -> u32 {
        self.header.checksum.to_ne()
    }

    /// Size of the image once replayed, unit byte
    pub fn expanded_size(&self) -> u64 {
        self.total_blocks() as u64 * BLOCK_SIZE as u64
    }

    pub fn chunks(&self) -> Chunks<'a> {
        Chunks { bytes: self.bytes, offset: FILE_HEADER_SIZE, index: 0, total: self.total_chunks() }
    }

    pub fn check_capacity(&self, partition_size: u64) -> Result<(), CapacityError> {
        let available = partition_size / BLOCK_SIZE as u64;
        let needed = self.total_blocks() as u64;
        if available < needed {
            warn!("Image is bigger than partition, {} blocks over {}", needed, available);
            return Err(CapacityError::Blocks { needed, available });
        }
        Ok(())
    }
}

#[cfg_attr(not(feature = "async"), deasync::deasync)]
impl<'a> Image<'a> {
    /// Replays every chunk from `start`, returns the sector following the last chunk
    pub async fn apply<E, IO>(
        &self,
        io: &mut IO,
        start: SectorID,
        fill: FillPolicy,
    ) -> Result<SectorID, Error<E>>
    where
        E: Debug,
        IO: io::IO<Error = E>,
    {
        let mut io = io.wrap();
        let mut cursor = start;
        for chunk in self.chunks() {
            let chunk = chunk?;
            let num_sectors = chunk.num_sectors();
            match (chunk.chunk_type, fill) {
                (ChunkType::Raw, _) => {
                    trace!("Chunk {} raw, {} sectors on sector {}", chunk.index, num_sectors, cursor);
                    io.write(cursor, chunk.data()).await?;
                }
                (ChunkType::Fill, FillPolicy::Expand) => {
                    let value = chunk.fill_value()?;
                    trace!("Chunk {} fill {:02X?}, {} sectors", chunk.index, value, num_sectors);
                    let mut pattern = [0u8; SECTOR_SIZE];
                    pattern.chunks_exact_mut(4).for_each(|word| word.copy_from_slice(&value));
                    io.fill(cursor, num_sectors, &pattern).await?;
                }
                (ChunkType::Fill, FillPolicy::Skip) => {
                    warn!("Chunk {} fill not expanded, skip {} sectors", chunk.index, num_sectors);
                }
                (ChunkType::DontCare, _) => {
                    trace!("Chunk {} don't care, skip {} sectors", chunk.index, num_sectors);
                }
                (ChunkType::Unknown(value), _) => {
                    warn!("Chunk {} of unknown type {:#06x}, skip {} sectors", chunk.index, value, num_sectors);
                }
            }
            cursor += num_sectors;
        }
        io.flush().await?;
        debug!("Chunked image written to sectors {}..{}", start, cursor);
        Ok(cursor)
    }
}

/// `Ok(false)` for a plain raw image, `Ok(true)` for a well formed chunked image
/// that fits in `partition_size` bytes
pub fn validate(bytes: &[u8], partition_size: u64) -> Result<bool, ImageError> {
    match Image::parse(bytes)? {
        Some(image) => image.check_capacity(partition_size).map(|_| true).map_err(|e| e.into()),
        None => Ok(false),
    }
}

#[cfg_attr(not(feature = "async"), deasync::deasync)]
pub async fn apply<E, IO>(bytes: &[u8], start: SectorID, io: &mut IO) -> Result<SectorID, Error<E>>
where
    E: Debug,
    IO: io::IO<Error = E>,
{
    let magic = bytes.get(..4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
    match Image::parse(bytes)? {
        Some(image) => image.apply(io, start, FillPolicy::default()).await,
        None => Err(FormatError::Magic(magic.unwrap_or_default()).into()),
    }
}

/// Writes either a chunked image or, when magic does not match, the bytes verbatim
/// onto `partition`. Returns the number of sectors the image spans.
#[cfg_attr(not(feature = "async"), deasync::deasync)]
pub async fn flash<E, IO>(
    io: &mut IO,
    partition: Partition,
    bytes: &[u8],
    fill: FillPolicy,
) -> Result<u64, Error<E>>
where
    E: Debug,
    IO: io::IO<Error = E>,
{
    if let Some(image) = Image::parse(bytes)? {
        info!("Chunked image, {} chunks", image.total_chunks());
        image.check_capacity(partition.size())?;
        let end = image.apply(io, partition.start, fill).await?;
        return Ok(end - partition.start);
    }

    let needed = bytes.len() as u64;
    if needed > partition.size() {
        warn!("Raw image of {} bytes does not fit in partition {}", needed, partition);
        return Err(CapacityError::Bytes { needed, available: partition.size() }.into());
    }
    info!("Raw image, {} bytes", needed);
    let mut io = io.wrap();
    let full = bytes.len() / SECTOR_SIZE;
    io.write(partition.start, as_sectors(&bytes[..full * SECTOR_SIZE])).await?;
    let tail = &bytes[full * SECTOR_SIZE..];
    let mut num_sectors = full as u64;
    if !tail.is_empty() {
        let mut sector = [0u8; SECTOR_SIZE];
        sector[..tail.len()].copy_from_slice(tail);
        io.write(partition.start + num_sectors, &[sector]).await?;
        num_sectors += 1;
    }
    io.flush().await?;
    Ok(num_sectors)
}

#[cfg(test)]
mod test {
    use std::vec::Vec;

    use super::header::{BLOCK_SIZE, MAGIC};
    use super::{apply, flash, validate, ChunkType, FillPolicy, Image};
    use crate::error::{CapacityError, Error, FormatError, ImageError};
    use crate::io::memory::MemoryIO;
    use crate::types::{Partition, SectorID};

    const BLOCK: usize = BLOCK_SIZE as usize;

    struct Builder {
        header: [u8; 28],
        chunks: Vec<u8>,
        num_chunks: u32,
        num_blocks: u32,
    }

    impl Builder {
        fn new() -> Self {
            let mut header = [0u8; 28];
            header[0..4].copy_from_slice(&MAGIC.to_le_bytes());
            header[4..6].copy_from_slice(&1u16.to_le_bytes());
            header[8..10].copy_from_slice(&28u16.to_le_bytes());
            header[10..12].copy_from_slice(&12u16.to_le_bytes());
            header[12..16].copy_from_slice(&BLOCK_SIZE.to_le_bytes());
            Self { header, chunks: Vec::new(), num_chunks: 0, num_blocks: 0 }
        }

        fn chunk(mut self, chunk_type: ChunkType, num_blocks: u32, payload: &[u8]) -> Self {
            let total_size = (12 + payload.len()) as u32;
            self.chunks.extend_from_slice(&u16::from(chunk_type).to_le_bytes());
            self.chunks.extend_from_slice(&[0, 0]);
            self.chunks.extend_from_slice(&num_blocks.to_le_bytes());
            self.chunks.extend_from_slice(&total_size.to_le_bytes());
            self.chunks.extend_from_slice(payload);
            self.num_chunks += 1;
            self.num_blocks += num_blocks;
            self
        }

        fn raw(self, num_blocks: u32, byte: u8) -> Self {
            let payload = std::vec![byte; num_blocks as usize * BLOCK];
            self.chunk(ChunkType::Raw, num_blocks, &payload)
        }

        fn set(mut self, offset: usize, bytes: &[u8]) -> Self {
            self.header[offset..offset + bytes.len()].copy_from_slice(bytes);
            self
        }

        fn build(self) -> Vec<u8> {
            let mut header = self.header;
            if header[16..20] == [0; 4] {
                header[16..20].copy_from_slice(&self.num_blocks.to_le_bytes());
            }
            header[20..24].copy_from_slice(&self.num_chunks.to_le_bytes());
            let mut bytes = header.to_vec();
            bytes.extend_from_slice(&self.chunks);
            bytes
        }
    }

    fn sample() -> Vec<u8> {
        Builder::new()
            .raw(2, 0xA1)
            .chunk(ChunkType::Fill, 1, &0xDEADBEEFu32.to_le_bytes())
            .raw(1, 0xB2)
            .build()
    }

    #[test]
    fn test_raw_image_is_not_chunked() {
        let bytes = std::vec![0x5Au8; 4096];
        assert_eq!(validate(&bytes, 1 << 20), Ok(false));
        assert_eq!(validate(&[], 1 << 20), Ok(false));
        let mut header = Builder::new().raw(1, 0).build();
        header[0] ^= 0xFF;
        assert_eq!(validate(&header, 1 << 20), Ok(false));
    }

    #[test]
    fn test_header_mismatch() {
        let bytes = Builder::new().set(12, &512u32.to_le_bytes()).raw(1, 0).build();
        let expected = ImageError::Format(FormatError::BlockSize(512));
        assert_eq!(validate(&bytes, 1 << 20), Err(expected));

        let bytes = Builder::new().set(4, &2u16.to_le_bytes()).build();
        assert_eq!(validate(&bytes, 1 << 20), Err(ImageError::Format(FormatError::Version(2, 0))));

        let bytes = Builder::new().set(8, &32u16.to_le_bytes()).build();
        assert_eq!(validate(&bytes, 1 << 20), Err(ImageError::Format(FormatError::FileHeaderSize(32))));

        let bytes = Builder::new().set(10, &16u16.to_le_bytes()).build();
        assert_eq!(validate(&bytes, 1 << 20), Err(ImageError::Format(FormatError::ChunkHeaderSize(16))));

        let bytes = sample();
        assert_eq!(validate(&bytes[..20], 1 << 20), Err(ImageError::Format(FormatError::Truncated(20))));
    }

    #[test]
    fn test_capacity() {
        let bytes = sample();
        assert_eq!(validate(&bytes, 4 * 4096), Ok(true));
        let expected = CapacityError::Blocks { needed: 4, available: 3 };
        assert_eq!(validate(&bytes, 4 * 4096 - 1), Err(ImageError::Capacity(expected)));
    }

    #[test]
    fn test_framing() {
        let mut bytes = sample();
        // total_size of the first chunk shrunk below its RAW payload
        bytes[28 + 8..28 + 12].copy_from_slice(&(12u32 + 4096).to_le_bytes());
        let result = Image::parse(&bytes);
        assert_eq!(result.err(), Some(FormatError::Framing { index: 0, total_size: 4108 }));

        let mut bytes = sample();
        bytes[28 + 8..28 + 12].copy_from_slice(&4u32.to_le_bytes());
        let result = Image::parse(&bytes);
        assert_eq!(result.err(), Some(FormatError::Framing { index: 0, total_size: 4 }));

        let bytes = sample();
        let result = Image::parse(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(FormatError::Framing { index: 2, .. })));

        let bytes = Builder::new().set(16, &1u32.to_le_bytes()).raw(2, 0).build();
        assert_eq!(Image::parse(&bytes).err(), Some(FormatError::BlockCount(2)));
    }

    #[test]
    fn test_apply() {
        let bytes = sample();
        let mut io = MemoryIO::filled(64, 0xEE);
        let start = SectorID::from(8u64);
        let end = apply(&bytes, start, &mut io).unwrap();
        assert_eq!(end, start + (2u64 + 1 + 1) * 8);

        assert_eq!(io.writes(), &[(SectorID::from(8u64), 16), (SectorID::from(32u64), 8)]);
        for i in 8..24u64 {
            assert_eq!(io.sector(i.into()), &[0xA1; 512]);
        }
        for i in 24..32u64 {
            assert_eq!(io.sector(i.into()), &[0xEE; 512]);
        }
        for i in 32..40u64 {
            assert_eq!(io.sector(i.into()), &[0xB2; 512]);
        }
        assert_eq!(io.sector(40u64.into()), &[0xEE; 512]);
    }

    #[test]
    fn test_apply_unknown_chunk() {
        let bytes = Builder::new()
            .chunk(ChunkType::Unknown(0xCAC4), 3, &[1, 2, 3, 4])
            .chunk(ChunkType::DontCare, 1, &[])
            .raw(1, 0x11)
            .build();
        let mut io = MemoryIO::new(64);
        let end = apply(&bytes, SectorID::default(), &mut io).unwrap();
        assert_eq!(end, SectorID::from(40u64));
        assert_eq!(io.writes(), &[(SectorID::from(32u64), 8)]);
    }

    #[test]
    fn test_apply_not_chunked() {
        let mut io = MemoryIO::new(8);
        let result = apply(&[1, 2, 3, 4, 5], SectorID::default(), &mut io);
        assert!(matches!(result, Err(Error::Image(ImageError::Format(FormatError::Magic(0x04030201))))));
        assert!(io.writes().is_empty());
    }

    #[test]
    fn test_expand_fill() {
        let bytes = sample();
        let image = Image::parse(&bytes).unwrap().unwrap();
        let mut io = MemoryIO::filled(64, 0xEE);
        image.apply(&mut io, SectorID::default(), FillPolicy::Expand).unwrap();
        let sector = io.sector(16u64.into());
        assert_eq!(&sector[..8], &[0xEF, 0xBE, 0xAD, 0xDE, 0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(io.sector(23u64.into()), sector);
        assert_eq!(io.sector(24u64.into()), &[0xB2; 512]);
    }

    #[test]
    fn test_short_write() {
        let bytes = sample();
        let mut io = MemoryIO::new(64).with_bad_sector(36u64.into());
        let result = apply(&bytes, SectorID::from(8u64), &mut io);
        match result {
            Err(Error::ShortIO { sector, expected, actual }) => {
                assert_eq!(sector, SectorID::from(36u64));
                assert_eq!((expected, actual), (8, 4));
            }
            _ => panic!("Expect short write"),
        }
    }

    #[test]
    fn test_flash_raw() {
        let bytes = std::vec![0x77u8; 1000];
        let mut io = MemoryIO::new(16);
        let partition = Partition::new(4u64, 8);
        assert_eq!(flash(&mut io, partition, &bytes, FillPolicy::Skip).unwrap(), 2);
        assert_eq!(io.sector(4u64.into()), &[0x77; 512]);
        let sector = io.sector(5u64.into());
        assert_eq!(sector[487], 0x77);
        assert_eq!(sector[488], 0);
        assert!(!io.written(6u64.into()));

        let bytes = std::vec![0x77u8; 8 * 512 + 1];
        let result = flash(&mut io, partition, &bytes, FillPolicy::Skip);
        let expected = CapacityError::Bytes { needed: 4097, available: 4096 };
        assert!(matches!(result, Err(Error::Image(ImageError::Capacity(e))) if e == expected));
    }

    #[test]
    fn test_flash_chunked() {
        let bytes = sample();
        let mut io = MemoryIO::new(64);
        let partition = Partition::new(16u64, 32);
        assert_eq!(flash(&mut io, partition, &bytes, FillPolicy::Skip).unwrap(), 32);
        assert_eq!(io.sector(16u64.into()), &[0xA1; 512]);

        let mut io = MemoryIO::new(64);
        let partition = Partition::new(16u64, 31);
        let result = flash(&mut io, partition, &bytes, FillPolicy::Skip);
        assert!(matches!(result, Err(Error::Image(ImageError::Capacity(_)))));
        assert!(io.writes().is_empty());
    }
}
