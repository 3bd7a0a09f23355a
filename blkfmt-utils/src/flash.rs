use blkfmt::io::std::FileIO;
use blkfmt::mbr::MasterBootRecord;
use blkfmt::sparse::{self, FillPolicy};

use crate::{Error, Flash};

pub fn flash(io: &mut FileIO, args: &Flash) -> Result<(), Error> {
    let bytes = std::fs::read(&args.image)?;
    let mbr = MasterBootRecord::read(io)?;
    let partition = mbr.partition(args.partition).map_err(blkfmt::Error::<std::io::Error>::from)?;
    let fill = if args.expand_fill { FillPolicy::Expand } else { FillPolicy::Skip };
    log::debug!("Flash {} bytes onto partition {} at {}", bytes.len(), args.partition, partition);
    let num_sectors = sparse::flash(io, partition, &bytes, fill)?;
    println!("{} sectors written to partition {}", num_sectors, args.partition);
    Ok(())
}
