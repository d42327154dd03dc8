//! Benchmark runner for the multiplication strategies.

use std::alloc::System;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tilemul::alloc::CountingAllocator;
use tilemul::bench::{self, BenchConfig};
use tilemul::{ALGORITHM_TOLERANCE, DEFAULT_TILE_SIZE};

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator::new(System);

/// Time naive, tiled and BLAS-backed matrix multiplication on the same
/// random operands and verify that they agree.
#[derive(Parser, Debug)]
#[command(name = "tilemul", version, about)]
struct Cli {
    /// Edge of the square operands
    #[arg(short, long, default_value_t = 1024)]
    size: usize,

    /// Rows of A (overrides --size)
    #[arg(long)]
    m: Option<usize>,

    /// Columns of A and rows of B (overrides --size)
    #[arg(long)]
    k: Option<usize>,

    /// Columns of B (overrides --size)
    #[arg(long)]
    n: Option<usize>,

    /// Tile edge for the tiled strategy
    #[arg(short, long, default_value_t = DEFAULT_TILE_SIZE)]
    tile_size: usize,

    /// Try these tile sizes and report the fastest, e.g. 16,32,64,128
    #[arg(long, value_delimiter = ',')]
    sweep: Vec<usize>,

    /// Seed for the random operands
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Runs per strategy; the fastest is reported
    #[arg(short, long, default_value_t = 3)]
    repeat: usize,

    /// Maximum absolute difference tolerated between strategies
    #[arg(long, default_value_t = ALGORITHM_TOLERANCE)]
    tolerance: f64,

    /// Also time the multi-threaded tiled strategy
    #[arg(short, long)]
    parallel: bool,

    /// Write the report to this file as well as stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> BenchConfig {
        BenchConfig {
            m: self.m.unwrap_or(self.size),
            k: self.k.unwrap_or(self.size),
            n: self.n.unwrap_or(self.size),
            tile_size: self.tile_size,
            seed: self.seed,
            repeat: self.repeat,
            tolerance: self.tolerance,
            tile_sweep: self.sweep.clone(),
            parallel: self.parallel,
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config();
    log::debug!("{:?}", config);

    let report = bench::run(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report.write_to(&mut out)?;
    out.flush()?;

    if let Some(path) = &cli.output {
        let mut file = BufWriter::new(File::create(path)?);
        report.write_to(&mut file)?;
        file.flush()?;
        log::info!("performance data written to {}", path.display());
    }

    log::info!("memory: {}", ALLOC.snapshot());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
