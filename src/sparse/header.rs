use core::mem::size_of;

use crate::endian::Little as LE;

pub const MAGIC: u32 = 0xED26FF3A;
pub const MAJOR_VERSION: u16 = 1;
pub const BLOCK_SIZE: u32 = 4096;

pub const FILE_HEADER_SIZE: usize = size_of::<FileHeader>();
pub const CHUNK_HEADER_SIZE: usize = size_of::<ChunkHeader>();

const _: () = assert!(FILE_HEADER_SIZE == 28);
const _: () = assert!(CHUNK_HEADER_SIZE == 12);

#[derive(Copy, Clone, Debug, Default)]
#[repr(C)]
pub struct FileHeader {
    pub magic: LE<u32>,
    pub major_version: LE<u16>,
    pub minor_version: LE<u16>,
    pub file_header_size: LE<u16>,
    pub chunk_header_size: LE<u16>,
    pub block_size: LE<u32>,
    pub total_blocks: LE<u32>,
    pub total_chunks: LE<u32>,
    /// Carried along, never verified
    pub checksum: LE<u32>,
}

#[derive(Copy, Clone, Debug, Default)]
#[repr(C)]
pub struct ChunkHeader {
    pub chunk_type: LE<u16>,
    _reserved: LE<u16>,
    /// Unit block
    pub chunk_size: LE<u32>,
    /// Chunk header plus payload, unit byte
    pub total_size: LE<u32>,
}

/// Both headers consist of plain integers only, any bit pattern is valid
unsafe fn read<T: Copy>(bytes: &[u8]) -> Option<T> {
    if bytes.len() < size_of::<T>() {
        return None;
    }
    Some(core::ptr::read_unaligned(bytes.as_ptr() as *const T))
}

impl FileHeader {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        unsafe { read(bytes) }
    }
}

impl ChunkHeader {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        unsafe { read(bytes) }
    }

    pub fn chunk_type(&self) -> ChunkType {
        ChunkType::from(self.chunk_type.to_ne())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkType {
    Raw,
    Fill,
    DontCare,
    Unknown(u16),
}

impl From<u16> for ChunkType {
    fn from(value: u16) -> Self {
        match value {
            0xCAC1 => Self::Raw,
            0xCAC2 => Self::Fill,
            0xCAC3 => Self::DontCare,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ChunkType> for u16 {
    fn from(chunk_type: ChunkType) -> u16 {
        match chunk_type {
            ChunkType::Raw => 0xCAC1,
            ChunkType::Fill => 0xCAC2,
            ChunkType::DontCare => 0xCAC3,
            ChunkType::Unknown(value) => value,
        }
    }
}
