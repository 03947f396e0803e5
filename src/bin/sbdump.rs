//! Dumps a sparse binary matrix as sparse text.
//!
//! Usage: `sbdump <input>`

use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use tractograph::sparse::SparseReader;
use tractograph::Result;

fn run(input: &str) -> Result<()> {
    let mut matrix = SparseReader::new(BufReader::new(File::open(input)?))?;
    let header = matrix.header();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(
        out,
        "{} {} {}",
        header.num_rows, header.num_cols, header.non_zero_entries
    )?;
    while let Some(entries) = matrix.next_column()? {
        writeln!(out, "{}", entries.len())?;
        for (row, value) in entries {
            writeln!(out, "{} {:.1}", row, value)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <input>", args[0]);
        return ExitCode::FAILURE;
    }

    match run(&args[1]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {}", args[0], err);
            ExitCode::FAILURE
        }
    }
}
