#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(all(feature = "async", feature = "std", not(any(feature = "smol", feature = "tokio"))))]
compile_error!("Either smol or tokio must be selected");

extern crate alloc;

#[macro_use]
extern crate hex_literal;
extern crate heapless;
#[macro_use]
extern crate log;

mod endian;
pub mod error;
pub mod fat32;
pub mod io;
pub mod mbr;
pub mod sparse;
pub mod types;

pub use error::Error;
pub use mbr::{Layout, MasterBootRecord};
pub use sparse::{FillPolicy, Image};
pub use types::{Partition, SectorID};
