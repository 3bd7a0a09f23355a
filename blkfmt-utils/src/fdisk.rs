use blkfmt::io::std::FileIO;
use blkfmt::io::{IO, SECTOR_SIZE};
use blkfmt::mbr::{Layout, MasterBootRecord};

use crate::{Error, Fdisk};

fn layout(args: &Fdisk) -> Layout {
    match (&args.sizes, args.sd_card) {
        (Some(sizes), _) => Layout::from_mib([sizes[0], sizes[1], sizes[2]]),
        (None, true) => Layout::sd_card(),
        (None, false) => Layout::default(),
    }
}

fn print(mbr: &MasterBootRecord) {
    println!("{:9}  {:4}  {:4}  {:>10}  {:>10}  {:>9}", "Partition", "Boot", "Type", "Start", "Sectors", "Size");
    for (number, entry) in mbr.partitions() {
        let boot = if entry.bootable { "*" } else { "" };
        let size = entry.num_sectors as u64 * SECTOR_SIZE as u64 / 1024 / 1024;
        let (kind, start) = (entry.kind, entry.lba);
        println!("{:9}  {:4}  {}  {:10}  {:10}  {:6}MiB", number, boot, kind, start, entry.num_sectors, size);
    }
}

pub fn fdisk(io: &mut FileIO, args: &Fdisk) -> Result<(), Error> {
    if args.create {
        let layout = layout(args);
        let mbr = MasterBootRecord::create(io, &layout, args.force)?;
        print(&mbr);
        return Ok(());
    }

    if args.dump {
        let sector = MasterBootRecord::read_sector(io)?;
        println!("{}", pretty_hex::pretty_hex(&sector));
    }
    let mbr = MasterBootRecord::read(io)?;
    println!("{} sectors", io.num_sectors());
    print(&mbr);
    Ok(())
}
