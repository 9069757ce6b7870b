use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::Level;
use zinspect::{inspect, inspect_with, Format, InflateConfig, InspectConfig, Inspection, LogReporter, Result};

#[derive(Parser, Debug)]
#[command(name = "zinspect")]
#[command(about = "Dump the bit-level structure of DEFLATE, zlib, gzip, LZ4 and Zstandard data")]
#[command(version)]
struct Args {
    /// Input file (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Container format. Auto-detection takes any input whose first two
    /// bytes form a valid zlib header to be zlib, which a raw DEFLATE stream
    /// can also start with; use `--format deflate` to force raw decoding.
    #[arg(short, long, value_enum, default_value_t = FormatArg::Auto)]
    format: FormatArg,

    /// Ignore this many leading bytes
    #[arg(long, default_value = "0")]
    skip: usize,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the decompressed data to this file
    #[arg(short, long)]
    write: Option<PathBuf>,

    /// Only measure the decoded size; no output and no calculated checksums
    #[arg(long, conflicts_with = "write")]
    measure_only: bool,

    /// Treat back-references before the start of output as zero bytes
    #[arg(long)]
    allow_distance_too_far: bool,

    /// Include every symbol and code table entry in the report
    #[arg(long)]
    verbose_report: bool,

    /// Write the report on one line
    #[arg(long)]
    compact: bool,

    /// Send report events to the log at TRACE level instead of writing JSON
    #[arg(long, conflicts_with_all = ["output", "compact"])]
    trace_report: bool,

    /// Log decoding progress
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Auto,
    Deflate,
    Zlib,
    Gzip,
    Lz4,
    Zstd,
}

impl FormatArg {
    fn format(self) -> Option<Format> {
        match self {
            Self::Auto => None,
            Self::Deflate => Some(Format::Deflate),
            Self::Zlib => Some(Format::Zlib),
            Self::Gzip => Some(Format::Gzip),
            Self::Lz4 => Some(Format::Lz4),
            Self::Zstd => Some(Format::Zstd),
        }
    }
}

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_DECODE_FAILED: u8 = 1;
const EXIT_ERROR: u8 = 2;

/// Read the whole input from a file, or from stdin for "-"
fn load(path: &Path) -> io::Result<Vec<u8>> {
    if path.to_str() == Some("-") {
        let mut bytes = Vec::new();
        io::stdin().lock().read_to_end(&mut bytes)?;
        return Ok(bytes);
    }
    std::fs::read(path)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.quiet {
        Level::ERROR
    } else if args.trace_report {
        Level::TRACE
    } else if args.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(io::stderr).with_target(false).init();

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(args: &Args) -> Result<u8> {
    let config = InspectConfig {
        format: args.format.format(),
        skip: args.skip,
        verbose: args.verbose_report,
        materialize: !args.measure_only,
        inflate: InflateConfig { allow_distance_too_far: args.allow_distance_too_far },
    };

    let input = load(&args.input)?;
    let start = std::time::Instant::now();
    let inspection = if args.trace_report {
        let mut reporter = LogReporter::new(args.verbose_report);
        inspect_with(&input, &config, &mut reporter)?
    } else {
        inspect(&input, &config)?
    };
    tracing::debug!(elapsed = ?start.elapsed(), format = %inspection.format, "inspection finished");

    if !args.trace_report {
        write_report(args, &inspection)?;
    }
    if let (Some(path), Some(data)) = (&args.write, &inspection.decompressed) {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(data)?;
        out.flush()?;
    }

    Ok(summarize(&inspection))
}

fn write_report(args: &Args, inspection: &Inspection) -> Result<()> {
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    if args.compact {
        serde_json::to_writer(&mut out, &inspection.report)?;
    } else {
        serde_json::to_writer_pretty(&mut out, &inspection.report)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// One-line result on stderr; returns the exit code
fn summarize(inspection: &Inspection) -> u8 {
    if let Some(failure) = inspection.failure() {
        eprintln!("decode failed with status {}: {}", failure.status(), failure.error);
        return EXIT_DECODE_FAILED;
    }
    if let Some(Ok(done)) = &inspection.outcome {
        eprintln!("succeeded uncompressing {} bytes", done.produced);
    }
    if inspection.trailing_bytes > 0 {
        eprintln!("{} compressed bytes unused", inspection.trailing_bytes);
    }
    let mut code = EXIT_SUCCESS;
    for check in inspection.mismatches() {
        eprintln!(
            "{} mismatch: stored 0x{:08x}, calculated 0x{:08x}",
            check.name, check.expected, check.calculated
        );
        code = EXIT_DECODE_FAILED;
    }
    code
}
