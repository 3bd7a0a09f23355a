mod fatformat;
mod fdisk;
mod flash;

use blkfmt::io::std::FileIO;
use clap::Parser;
use derive_more::Display;
use thiserror::Error;

#[derive(Debug, Display, Error)]
pub enum Error {
    #[display("{_0}")]
    Blkfmt(#[from] blkfmt::Error<std::io::Error>),
    #[display("IO: {_0}")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, clap::Args)]
#[clap(group(clap::ArgGroup::new("mode").required(true).args(["create", "print"])))]
struct Fdisk {
    /// Create partition table over the whole device
    #[clap(short, long)]
    create: bool,
    /// Print partition table
    #[clap(short, long)]
    print: bool,
    /// Size of partition 1 to 3, unit MiB
    #[clap(long, num_args = 3, value_names = ["SYSTEM", "DATA", "CACHE"], requires = "create")]
    sizes: Option<Vec<u64>>,
    /// Use the smaller SD card layout
    #[clap(long, conflicts_with = "sizes", requires = "create")]
    sd_card: bool,
    /// Overwrite sector 0 even without a valid MBR signature
    #[clap(long, requires = "create")]
    force: bool,
    /// Hex dump the MBR sector
    #[clap(long, requires = "print")]
    dump: bool,
}

#[derive(Debug, clap::Args)]
struct FatFormat {
    /// Partition number, counting from 1
    partition: usize,
    /// Volume ID, hex accepted with 0x prefix
    #[clap(long, value_parser = fatformat::parse_volume_id)]
    volume_id: Option<u32>,
    /// Derive volume ID from current date and time
    #[clap(long, conflicts_with = "volume_id")]
    timestamp_id: bool,
    /// Volume label, at most 11 characters
    #[clap(long)]
    label: Option<String>,
    /// Also initialize the second FAT
    #[clap(long)]
    mirror_fat: bool,
}

#[derive(Debug, clap::Args)]
struct Flash {
    /// Partition number, counting from 1
    partition: usize,
    /// Chunked or raw image file
    image: String,
    /// Write FILL chunks instead of skipping them
    #[clap(long)]
    expand_fill: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Action {
    /// Create or print MBR partition table
    Fdisk(Fdisk),
    /// Format partition as FAT32
    #[clap(name = "fatformat")]
    FatFormat(FatFormat),
    /// Write image to partition
    Flash(Flash),
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long)]
    quiet: bool,
    #[clap(short, action = clap::ArgAction::Count)]
    verbosity: u8,
    /// Block device or disk image file
    #[clap(short, long)]
    device: String,
    #[clap(subcommand)]
    action: Action,
}

fn main() {
    let args = Args::parse();
    let level = match (args.quiet, args.verbosity) {
        (true, _) => log::LevelFilter::Off,
        (_, 0) => log::LevelFilter::Info,
        (_, 1) => log::LevelFilter::Debug,
        (_, _) => log::LevelFilter::Trace,
    };
    log::set_max_level(level);
    env_logger::builder().filter(None, level).target(env_logger::Target::Stdout).init();

    let result = FileIO::open(&args.device).map_err(Error::from).and_then(|mut io| match args.action {
        Action::Fdisk(args) => fdisk::fdisk(&mut io, &args),
        Action::FatFormat(args) => fatformat::fatformat(&mut io, &args),
        Action::Flash(args) => flash::flash(&mut io, &args),
    });
    if let Some(error) = result.err() {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}
