use core::fmt::Debug;

use displaydoc::Display;
use thiserror::Error;

use crate::types::SectorID;

/// Chunked image header or chunk record does not match the expected layout
#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum FormatError {
    /// Not a chunked image, magic {0:#010x}
    Magic(u32),
    /// Invalid version {0}.{1}
    Version(u16, u16),
    /// Invalid file header size {0}
    FileHeaderSize(u16),
    /// Invalid chunk header size {0}
    ChunkHeaderSize(u16),
    /// Invalid block size {0}
    BlockSize(u32),
    /// Image truncated at offset {0}
    Truncated(usize),
    /// Chunk {index} declares total size {total_size} which does not frame its content
    Framing { index: u32, total_size: u32 },
    /// Chunks cover {0} blocks, more than the declared total
    BlockCount(u64),
}

/// Image does not fit in the target partition
#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum CapacityError {
    /// Image needs {needed} bytes but partition only has {available} bytes
    Bytes { needed: u64, available: u64 },
    /// Image needs {needed} blocks but partition only has {available} blocks
    Blocks { needed: u64, available: u64 },
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum ImageError {
    /// {0}
    Format(#[from] FormatError),
    /// {0}
    Capacity(#[from] CapacityError),
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// No CHS geometry fits {0} sectors
    NoGeometry(u64),
    /// {0} sectors exceed 32-bit LBA addressing
    TooLarge(u64),
    /// Partition {0} requested with zero size
    EmptyPartition(usize),
    /// Partitions reach sector {end} but only {available} sectors are usable
    Exceeded { end: u64, available: u64 },
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum PartitionError {
    /// MBR is broken, signature {0:02X?}
    Signature([u8; 2]),
    /// No such partition {0}
    NoSuchPartition(usize),
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum VolumeError {
    /// Can not format partition of {0} sectors, too small
    TooSmall(u64),
    /// Can not format partition of {0} sectors, too large
    TooLarge(u64),
}

#[derive(Debug, Display, Error)]
pub enum Error<E: Debug> {
    /// IO({0:?})
    IO(E),
    /// Short IO stopped at sector {sector}, {actual} of {expected} sectors transferred
    ShortIO { sector: SectorID, expected: usize, actual: usize },
    /// Image: {0}
    Image(#[from] ImageError),
    /// Geometry: {0}
    Geometry(#[from] GeometryError),
    /// Partition: {0}
    Partition(#[from] PartitionError),
    /// Volume: {0}
    Volume(#[from] VolumeError),
}

impl<E: Debug> From<FormatError> for Error<E> {
    fn from(error: FormatError) -> Self {
        Self::Image(error.into())
    }
}

impl<E: Debug> From<CapacityError> for Error<E> {
    fn from(error: CapacityError) -> Self {
        Self::Image(error.into())
    }
}
