//! Builds the voxel-level connectivity graph from a fiber-data file.
//!
//! Usage: `fiber2graph <input> <output> [<max-fiber-count>]`
//!
//! Writes `<output>.spatial` (the text side table) and `<output>.sb` (the
//! sparse binary matrix). Diagnostic counters go to standard output.

use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::process::ExitCode;

use tractograph::fiber::FiberReader;
use tractograph::graph::FiberGraph;
use tractograph::sparse::{write_sparse, write_spatial};
use tractograph::voxelize::voxelize;
use tractograph::Result;

fn run(input: &str, output: &str, max_fibers: Option<u32>) -> Result<()> {
    println!("** Reading file {input}...");
    let mut fibers = FiberReader::new(BufReader::new(File::open(input)?))?;

    let header = fibers.header().clone();
    println!("=== File Info ===");
    println!(
        "= {} fibers; max-length {}; mean-length {}",
        header.fiber_count, header.max_fiber_len, header.mean_fiber_len
    );
    println!(
        "= Image size: {}x{}(x{})",
        header.dims.x, header.dims.y, header.dims.z
    );
    println!(
        "= Voxel size: {}x{}(x{})",
        header.voxel_size.x, header.voxel_size.y, header.voxel_size.z
    );
    let version = String::from_utf8_lossy(&header.version);
    println!("= Version: {}", version.trim_end_matches('\0'));
    println!("=== End Info ===");

    if let Some(max) = max_fibers {
        println!("** Limiting input to {max} fibers.");
        fibers.limit(max);
    }

    let mut graph = FiberGraph::new(header.grid());
    for (index, fiber) in (&mut fibers).enumerate() {
        let fiber = fiber?;
        let voxels = voxelize(index, &fiber.points, graph.grid())?;
        graph.add_fiber(&voxels);
        if (index + 1) % 20_000 == 0 {
            log::info!("processed {} fibers", index + 1);
        }
    }

    println!(
        "\n=== {} self-overlapping fibers",
        graph.self_overlapping_fibers()
    );

    let spatial_name = format!("{output}.spatial");
    println!("** Opening text format spatial output file {spatial_name}...");
    let mut spatial = BufWriter::new(File::create(&spatial_name)?);
    write_spatial(&graph, &mut spatial)?;
    spatial.flush()?;
    println!("\n** {} voxels used", graph.coverage().len());

    println!("** {} non-zero values", graph.edges().len() * 2);
    let sb_name = format!("{output}.sb");
    println!("** Opening sparse binary matrix output file {sb_name}...");
    let mut sb = BufWriter::new(File::create(&sb_name)?);
    write_sparse(&graph, &mut sb)?;
    sb.flush()?;

    println!("\n** Done.");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let max_fibers = match args.len() {
        3 => None,
        4 => match args[3].parse() {
            Ok(count) => Some(count),
            Err(_) => {
                eprintln!("{}: invalid fiber count {:?}", args[0], args[3]);
                return ExitCode::FAILURE;
            }
        },
        _ => {
            eprintln!("usage: {} <input> <output> [<max-fiber-count>]", args[0]);
            return ExitCode::FAILURE;
        }
    };

    match run(&args[1], &args[2], max_fibers) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {}", args[0], err);
            ExitCode::FAILURE
        }
    }
}
