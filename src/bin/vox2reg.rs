//! Maps covered voxels to anatomical regions and recomputes the adjacency
//! matrix in region space.
//!
//! Usage: `vox2reg <sparse-binary> <spatial-file> <region-volume> [weights 0|1]`
//!
//! Prints the 71×71 region count matrix row-major to standard output; with
//! weights enabled, the weighted-sum matrix follows after a blank line.

use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use tractograph::region::{aggregate, default_atlas_dims, RegionVolume};
use tractograph::sparse::{read_spatial, SparseReader};
use tractograph::Result;

fn run(sb_name: &str, spatial_name: &str, region_name: &str, weights: bool) -> Result<()> {
    let mut matrix = SparseReader::new(BufReader::new(File::open(sb_name)?))?;
    let coords = read_spatial(BufReader::new(File::open(spatial_name)?))?;
    let volume = RegionVolume::read_from(
        default_atlas_dims(),
        &mut BufReader::new(File::open(region_name)?),
    )?;

    let stats = aggregate(&mut matrix, &coords, &volume, weights)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    stats.write_counts(&mut out)?;
    if stats.has_weights() {
        writeln!(out)?;
        stats.write_sums(&mut out)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let weights = match args.len() {
        4 => false,
        5 => match args[4].parse::<i32>() {
            Ok(flag) => flag != 0,
            Err(_) => {
                eprintln!("{}: invalid weights flag {:?}", args[0], args[4]);
                return ExitCode::FAILURE;
            }
        },
        _ => {
            eprintln!(
                "usage: {} <sparse-binary> <spatial-file> <region-volume> [weights 0|1]",
                args[0]
            );
            return ExitCode::FAILURE;
        }
    };

    match run(&args[1], &args[2], &args[3], weights) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {}", args[0], err);
            ExitCode::FAILURE
        }
    }
}
