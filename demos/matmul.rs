//! Multiply two random matrices with every strategy and print how long each
//! one took.
//!
//! ```bash
//! cargo run --release --example matmul -- 512
//! ```

use std::time::Instant;

use tilemul::bench::random_matrix;
use tilemul::gemm::active_provider;
use tilemul::{
    multiply_naive, multiply_reference, multiply_tile, multiply_tile_par, Matrix, Result,
    ALGORITHM_TOLERANCE, DEFAULT_TILE_SIZE,
};

fn timed<F: FnOnce() -> Result<Matrix>>(label: &str, f: F) -> Result<Matrix> {
    let start = Instant::now();
    let c = f()?;
    println!("{:<16} {:>10.3} ms", label, start.elapsed().as_secs_f64() * 1e3);
    Ok(c)
}

fn main() -> Result<()> {
    env_logger::init();

    let size = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(256usize);

    let a = random_matrix(size, size, 42)?;
    let b = random_matrix(size, size, 43)?;

    println!("{}x{} operands", size, size);
    println!(
        "provider: {}",
        active_provider().map_or("tiled fallback", |p| p.name())
    );

    let naive = timed("naive", || multiply_naive(&a, &b))?;
    let tiled = timed("tiled", || multiply_tile(&a, &b, DEFAULT_TILE_SIZE))?;
    let parallel = timed("tiled-parallel", || {
        multiply_tile_par(&a, &b, DEFAULT_TILE_SIZE)
    })?;
    let reference = timed("reference", || multiply_reference(&a, &b))?;

    for (label, c) in [("tiled", &tiled), ("tiled-parallel", &parallel), ("reference", &reference)] {
        println!(
            "{:<16} max |diff| vs naive = {:e} ({})",
            label,
            c.max_abs_diff(&naive).unwrap_or(f64::NAN),
            if c.approx_eq(&naive, ALGORITHM_TOLERANCE) {
                "ok"
            } else {
                "MISMATCH"
            }
        );
    }

    Ok(())
}
