use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};
use std::cmp::min;

use crate::error::{validation_error, Result};
use crate::Matrix;

use super::check_operands;

/// Tile edge used when the caller has no better guess. 32x32 doubles is
/// 8 KiB per operand block, three blocks sit comfortably in a 32 KiB L1.
pub const DEFAULT_TILE_SIZE: usize = 32;

/// Validates `tile_size` and clamps it to the largest matrix extent.
///
/// Anything larger than every dimension already yields a single block, so
/// clamping only keeps the band arithmetic small.
fn effective_tile(tile_size: usize, m: usize, n: usize, k: usize) -> Result<usize> {
    if tile_size == 0 {
        return Err(validation_error("tile_size must be a positive integer"));
    }
    Ok(min(tile_size, m.max(n).max(k)))
}

/// Rows of C per band. Never exceeds `m`, so `band_rows * n <= m * n`.
#[inline]
fn band_rows(tile: usize, m: usize) -> usize {
    min(tile, m)
}

/// Accumulates every `(kk, jj)` block of one band of output rows.
///
/// `c_band` holds rows `ii..ii + rows_in_band` of C. Inside a block the
/// order is i-k-j: `A(i, p)` stays in a register while the matching row
/// segments of B and C are walked contiguously.
///
/// # Arguments
///
/// * `a` - Matrix A (m × k), row-major
/// * `b` - Matrix B (k × n), row-major
/// * `c_band` - Rows `ii..` of C (m × n), row-major, accumulated into
/// * `ii` - First global row covered by `c_band`
/// * `k` - Columns of A, rows of B
/// * `n` - Columns of B and C
/// * `tile` - Block edge
#[inline]
fn accumulate_band(
    a: &[f64],
    b: &[f64],
    c_band: &mut [f64],
    ii: usize,
    k: usize,
    n: usize,
    tile: usize,
) {
    let rows_in_band = c_band.len() / n;

    for kk in (0..k).step_by(tile) {
        let k_max = min(kk + tile, k);

        for jj in (0..n).step_by(tile) {
            let j_max = min(jj + tile, n);

            for local_i in 0..rows_in_band {
                let i = ii + local_i;
                let c_row = &mut c_band[local_i * n + jj..local_i * n + j_max];

                for p in kk..k_max {
                    // SAFETY: i < m and p < k, so i * k + p < a.len().
                    let a_ip = unsafe { *a.get_unchecked(i * k + p) };
                    let b_row = &b[p * n + jj..p * n + j_max];

                    for (c_ij, b_pj) in c_row.iter_mut().zip(b_row) {
                        *c_ij += a_ip * b_pj;
                    }
                }
            }
        }
    }
}

/// Cache-blocked matrix multiplication.
///
/// The `(i, k, j)` iteration space is cut into cubes of edge `tile_size`;
/// the last cube along each axis is clipped to the matrix extent. Partial
/// products are accumulated into a zero-initialized C, so the sum for each
/// element is split across `k` blocks and may round differently from
/// [`multiply_naive`](super::multiply_naive). Compare with a tolerance.
///
/// # Errors
///
/// Same dimension checks as the naive strategy, plus a validation error
/// when `tile_size == 0`.
///
/// # Example
///
/// ```
/// use tilemul::{multiply_tile, Matrix};
///
/// let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
/// let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
/// let c = multiply_tile(&a, &b, 1).unwrap();
///
/// assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
/// ```
pub fn multiply_tile(a: &Matrix, b: &Matrix, tile_size: usize) -> Result<Matrix> {
    check_operands(a, b)?;

    let (m, k) = a.shape();
    let n = b.cols();
    let tile = effective_tile(tile_size, m, n, k)?;

    let mut c = Matrix::new(m, n)?;
    let (a_data, b_data) = (a.as_slice(), b.as_slice());

    let rows = band_rows(tile, m);

    c.as_mut_slice()
        .chunks_mut(rows * n)
        .enumerate()
        .for_each(|(band, c_band)| {
            accumulate_band(a_data, b_data, c_band, band * rows, k, n, tile);
        });

    Ok(c)
}

/// Performs [`multiply_tile`] in parallel using Rayon.
///
/// Parallelism strategy:
/// - C is split into bands of at most `tile_size` rows. Each band is an independent
///   `&mut` chunk, so every output block has exactly one writer.
/// - The `kk` and `jj` block loops run serially inside each band, in the
///   same order as the sequential version; results are bit-identical to it.
pub fn multiply_tile_par(a: &Matrix, b: &Matrix, tile_size: usize) -> Result<Matrix> {
    check_operands(a, b)?;

    let (m, k) = a.shape();
    let n = b.cols();
    let tile = effective_tile(tile_size, m, n, k)?;

    let mut c = Matrix::new(m, n)?;
    let (a_data, b_data) = (a.as_slice(), b.as_slice());

    let rows = band_rows(tile, m);

    c.as_mut_slice()
        .par_chunks_mut(rows * n)
        .enumerate()
        .for_each(|(band, c_band)| {
            accumulate_band(a_data, b_data, c_band, band * rows, k, n, tile);
        });

    Ok(c)
}
