//! Encode wav to Maxis UTalk.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use utk::containers::utm0;
use utk::containers::wave::read_wave;
use utk::encoder::UtkEncoderConfig;
use utk::types::StreamParams;

/// Encode wav to Maxis UTalk.
#[derive(Parser)]
#[command(name = "utkencode", version)]
struct Args {
    /// Overwrite outfile without prompting.
    #[arg(short, long)]
    force: bool,

    /// Suppress normal output and do not prompt.
    #[arg(short, long)]
    quiet: bool,

    /// Target bitrate in bits/sec.
    #[arg(short, long, default_value_t = 32_000)]
    bitrate: u32,

    /// Encode innovation using half bandwidth (default).
    #[arg(short = 'H', long = "halved-inn", conflicts_with = "full_inn")]
    halved_inn: bool,

    /// Encode innovation using full bandwidth.
    #[arg(short = 'F', long = "full-inn")]
    full_inn: bool,

    /// Use the Huffman codebook with threshold N, 16..=32.
    #[arg(short = 'T', long = "huff-threshold", default_value_t = 24)]
    huff_threshold: u8,

    /// Innovation gain significand, 8..=128 in steps of 8.
    #[arg(short = 'S', long = "inngain-sig", default_value_t = 64)]
    inngain_sig: u16,

    /// Innovation gain base, 1.040..=1.103 in steps of 0.001.
    #[arg(short = 'B', long = "inngain-base", default_value_t = 1.068)]
    inngain_base: f32,

    /// Input WAV file, or "-" for stdin.
    infile: PathBuf,

    /// Output UTK file, or "-" for stdout.
    outfile: PathBuf,
}

fn main() -> Result<()> {
    utk::init_logging();
    let args = Args::parse();

    if !(16..=32).contains(&args.huff_threshold) {
        bail!("huffman threshold must be between 16 and 32 (inclusive)");
    }
    if args.inngain_sig < 8 || args.inngain_sig > 128 || args.inngain_sig % 8 != 0 {
        bail!("innovation gain significand must be between 8 and 128 in steps of 8");
    }
    if !(1.040..=1.103).contains(&args.inngain_base) {
        bail!("innovation gain base must be between 1.040 and 1.103 (inclusive)");
    }

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

    let wave = read_wave(&mut input)?;

    let params = StreamParams {
        halved_innovation: !args.full_inn,
        huffman_threshold: args.huff_threshold,
        inngain_sig: args.inngain_sig,
        inngain_base: args.inngain_base,
    };
    let config = UtkEncoderConfig {
        params,
        bitrate: args.bitrate,
        sample_rate: wave.format.sample_rate,
    };

    utm0::encode(&mut output, &wave.samples, wave.format.sample_rate, config)?;

    if !args.quiet {
        eprintln!(
            "encoded {} samples at {} Hz, {} bits/sec",
            wave.samples.len(),
            wave.format.sample_rate,
            args.bitrate
        );
    }

    Ok(())
}
