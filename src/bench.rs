//! Verification and benchmark harness.
//!
//! [`run`] generates two reproducible operands, times every strategy on the
//! same pair, and refuses to report anything unless all products agree
//! within the configured tolerance.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use rand::prelude::*;

use crate::error::{validation_error, verification_error, Result};
use crate::gemm::active_provider;
use crate::matmul::{
    flop_count, multiply_naive, multiply_reference_with, multiply_tile, multiply_tile_par,
    DEFAULT_TILE_SIZE,
};
use crate::{Matrix, ALGORITHM_TOLERANCE};

/// A multiplication strategy under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Naive,
    Tiled,
    TiledParallel,
    Reference,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Naive => "naive",
            Strategy::Tiled => "tiled",
            Strategy::TiledParallel => "tiled-parallel",
            Strategy::Reference => "reference",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Benchmark parameters. `A` is `m x k`, `B` is `k x n`.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub m: usize,
    pub k: usize,
    pub n: usize,
    /// Tile edge used when `tile_sweep` is empty.
    pub tile_size: usize,
    /// Seed for `A`; `B` uses `seed + 1`.
    pub seed: u64,
    /// Each strategy runs this many times, the fastest run is kept.
    pub repeat: usize,
    pub tolerance: f64,
    /// Tile sizes to try; the fastest becomes the reported tiled timing.
    pub tile_sweep: Vec<usize>,
    /// Also time the rayon tiled variant.
    pub parallel: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            m: 1024,
            k: 1024,
            n: 1024,
            tile_size: DEFAULT_TILE_SIZE,
            seed: 42,
            repeat: 3,
            tolerance: ALGORITHM_TOLERANCE,
            tile_sweep: Vec::new(),
            parallel: false,
        }
    }
}

impl BenchConfig {
    /// Default configuration for `size x size` operands.
    pub fn square(size: usize) -> Self {
        BenchConfig {
            m: size,
            k: size,
            n: size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.m == 0 || self.k == 0 || self.n == 0 {
            return Err(validation_error(format!(
                "matrix dimensions must be positive, got {}x{} * {}x{}",
                self.m, self.k, self.k, self.n
            )));
        }
        if self.tile_size == 0 || self.tile_sweep.contains(&0) {
            return Err(validation_error("tile sizes must be positive"));
        }
        if self.repeat == 0 {
            return Err(validation_error("repeat must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(validation_error(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Timing of one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub strategy: Strategy,
    /// Tile edge for the tiled strategies.
    pub tile_size: Option<usize>,
    /// Fastest of the repeated runs.
    pub elapsed: Duration,
    pub gflops: f64,
}

/// Outcome of a verified benchmark run.
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub m: usize,
    pub k: usize,
    pub n: usize,
    pub started_at: DateTime<Local>,
    /// Name of the GEMM provider behind the reference strategy.
    pub provider: String,
    pub repeat: usize,
    pub timings: Vec<Timing>,
    /// `(tile_size, best elapsed)` for every swept tile size.
    pub tile_sweep: Vec<(usize, Duration)>,
}

impl BenchReport {
    pub fn timing(&self, strategy: Strategy) -> Option<&Timing> {
        self.timings.iter().find(|t| t.strategy == strategy)
    }

    /// How many times faster `strategy` ran than the naive strategy.
    pub fn speedup(&self, strategy: Strategy) -> Option<f64> {
        let naive = self.timing(Strategy::Naive)?.elapsed.as_secs_f64();
        let other = self.timing(strategy)?.elapsed.as_secs_f64();
        if other > 0.0 {
            Some(naive / other)
        } else {
            None
        }
    }
}

/// Generates a `rows x cols` matrix with entries uniform in `[-1, 1)`.
///
/// The same seed always yields the same matrix.
pub fn random_matrix(rows: usize, cols: usize, seed: u64) -> Result<Matrix> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut m = Matrix::new(rows, cols)?;
    for v in m.as_mut_slice() {
        *v = rng.random_range(-1.0..1.0);
    }
    Ok(m)
}

/// Runs `f` `repeat` times and returns the fastest duration together with
/// the product of the last run. Only `f` itself is timed.
fn time_best<F>(repeat: usize, mut f: F) -> Result<(Duration, Matrix)>
where
    F: FnMut() -> Result<Matrix>,
{
    let mut best = Duration::MAX;
    let mut product = Matrix::default();

    for _ in 0..repeat {
        let start = Instant::now();
        let c = f()?;
        let elapsed = start.elapsed();

        best = best.min(elapsed);
        product = c;
    }

    Ok((best, product))
}

/// Fails unless `left` and `right` agree within `tolerance`.
fn verify_pair(
    left: (&str, &Matrix),
    right: (&str, &Matrix),
    tolerance: f64,
) -> Result<()> {
    if left.1.approx_eq(right.1, tolerance) {
        return Ok(());
    }
    let diff = left.1.max_abs_diff(right.1).unwrap_or(f64::INFINITY);
    log::error!(
        "{} and {} disagree: max abs diff {:e} > {:e}",
        left.0,
        right.0,
        diff,
        tolerance
    );
    Err(verification_error(left.0, right.0, diff, tolerance))
}

fn gflops(m: usize, n: usize, k: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        flop_count(m, n, k) / secs / 1e9
    } else {
        0.0
    }
}

/// Runs the full benchmark described by `config`.
///
/// # Errors
///
/// A validation error for a bad configuration, any error raised by a
/// strategy, and a verification error if two strategies disagree.
pub fn run(config: &BenchConfig) -> Result<BenchReport> {
    config.validate()?;

    let (m, k, n) = (config.m, config.k, config.n);
    let started_at = Local::now();

    log::info!("generating random matrices {}x{} and {}x{}", m, k, k, n);
    let a = random_matrix(m, k, config.seed)?;
    let b = random_matrix(k, n, config.seed.wrapping_add(1))?;

    let provider = active_provider();
    let provider_name = provider
        .as_deref()
        .map_or("tiled fallback", |p| p.name())
        .to_string();

    let mut timings = Vec::new();
    let mut record = |strategy: Strategy, tile_size: Option<usize>, elapsed: Duration| {
        log::info!(
            "{} multiplication took {:.6} seconds",
            strategy,
            elapsed.as_secs_f64()
        );
        timings.push(Timing {
            strategy,
            tile_size,
            elapsed,
            gflops: gflops(m, n, k, elapsed),
        });
    };

    let (elapsed, c_naive) = time_best(config.repeat, || multiply_naive(&a, &b))?;
    record(Strategy::Naive, None, elapsed);

    let mut tile_sweep = Vec::new();
    let (tile_size, elapsed, c_tile) = if config.tile_sweep.is_empty() {
        let (elapsed, c) = time_best(config.repeat, || multiply_tile(&a, &b, config.tile_size))?;
        (config.tile_size, elapsed, c)
    } else {
        let mut best: Option<(usize, Duration, Matrix)> = None;
        for &tile in &config.tile_sweep {
            let (elapsed, c) = time_best(config.repeat, || multiply_tile(&a, &b, tile))?;
            log::debug!("tile size {}: {:.6} seconds", tile, elapsed.as_secs_f64());
            verify_pair(("naive", &c_naive), ("tiled", &c), config.tolerance)?;
            tile_sweep.push((tile, elapsed));

            if best.as_ref().map_or(true, |(_, t, _)| elapsed < *t) {
                best = Some((tile, elapsed, c));
            }
        }
        best.ok_or_else(|| validation_error("empty tile sweep"))?
    };
    record(Strategy::Tiled, Some(tile_size), elapsed);

    let mut products = vec![(Strategy::Naive, c_naive), (Strategy::Tiled, c_tile)];

    if config.parallel {
        let (elapsed, c) = time_best(config.repeat, || multiply_tile_par(&a, &b, tile_size))?;
        record(Strategy::TiledParallel, Some(tile_size), elapsed);
        products.push((Strategy::TiledParallel, c));
    }

    let (elapsed, c_ref) =
        time_best(config.repeat, || multiply_reference_with(&a, &b, provider.as_deref()))?;
    record(Strategy::Reference, None, elapsed);
    products.push((Strategy::Reference, c_ref));

    for (i, (left, c_left)) in products.iter().enumerate() {
        for (right, c_right) in &products[i + 1..] {
            verify_pair(
                (left.name(), c_left),
                (right.name(), c_right),
                config.tolerance,
            )?;
        }
    }
    log::info!("all {} strategies agree", products.len());

    Ok(BenchReport {
        m,
        k,
        n,
        started_at,
        provider: provider_name,
        repeat: config.repeat,
        timings,
        tile_sweep,
    })
}
