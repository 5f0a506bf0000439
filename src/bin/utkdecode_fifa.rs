//! Decode FIFA 2001/2002 MicroTalk (EA `SCHl/SCCl/SCDl/SCEl`) to wav.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

/// Decode FIFA 2001/2002 MicroTalk to wav.
#[derive(Parser)]
#[command(name = "utkdecode-fifa", version)]
struct Args {
    /// Overwrite outfile without prompting.
    #[arg(short, long)]
    force: bool,

    /// Suppress the overwrite prompt; fail instead of asking.
    #[arg(short, long)]
    quiet: bool,

    /// Input file, or "-" for stdin.
    infile: PathBuf,

    /// Output file, or "-" for stdout.
    outfile: PathBuf,
}

fn main() -> anyhow::Result<()> {
    utk::init_logging();
    let args = Args::parse();

    let mut input: Box<dyn Read> = if args.infile.as_os_str() == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(&args.infile).with_context(|| format!("failed to open '{}' for reading", args.infile.display()))?)
    };

    if args.outfile.as_os_str() != "-" {
        utk::cli::confirm_overwrite(&args.outfile, args.force, args.quiet)?;
    }

    let mut output: Box<dyn Write> = if args.outfile.as_os_str() == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(BufWriter::new(
            File::create(&args.outfile).with_context(|| format!("failed to create '{}'", args.outfile.display()))?,
        ))
    };

    utk::containers::ea::decode(&mut input, &mut output)?;
    Ok(())
}
