//! Matrix multiplication strategies.
//!
//! All strategies share one contract: given `A` (`m x k`) and `B` (`k x n`)
//! they return a freshly allocated `m x n` product. They differ only in
//! traversal order, so results agree up to floating-point round-off.
//!
//! - [`multiply_naive`]: triple loop, ascending `k`, the correctness oracle.
//! - [`multiply_tile`]: cache-blocked traversal with a configurable tile edge.
//! - [`multiply_tile_par`]: the blocked traversal with row bands spread over rayon.
//! - [`multiply_reference`]: delegates to a [`GemmProvider`](crate::gemm::GemmProvider),
//!   falling back to the blocked traversal when none is available.

mod naive;
mod reference;
mod tile;

pub use naive::multiply_naive;
pub use reference::{multiply_reference, multiply_reference_with};
pub use tile::{multiply_tile, multiply_tile_par, DEFAULT_TILE_SIZE};

use crate::error::{dimension_mismatch, validation_error, Result};
use crate::Matrix;

/// Checks that `a * b` is defined and non-degenerate.
///
/// Runs before any allocation so a failed call leaves nothing behind.
pub(crate) fn check_operands(a: &Matrix, b: &Matrix) -> Result<()> {
    if a.cols() != b.rows() {
        return Err(dimension_mismatch(
            a.shape(),
            b.shape(),
            format!(
                "left operand has {} columns but right operand has {} rows",
                a.cols(),
                b.rows()
            ),
        ));
    }
    if a.rows() == 0 || a.cols() == 0 || b.cols() == 0 {
        return Err(validation_error(format!(
            "cannot multiply zero-sized operands ({}x{} * {}x{})",
            a.rows(),
            a.cols(),
            b.rows(),
            b.cols()
        )));
    }
    Ok(())
}

/// Number of floating-point operations of an `m x k` by `k x n` product.
#[inline]
pub fn flop_count(m: usize, n: usize, k: usize) -> f64 {
    2.0 * m as f64 * n as f64 * k as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatrixError;

    #[test]
    fn test_check_operands_mismatch() {
        let a = Matrix::new(2, 3).unwrap();
        let b = Matrix::new(2, 3).unwrap();
        let err = check_operands(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::DimensionMismatch {
                left: (2, 3),
                right: (2, 3),
                ..
            }
        ));
    }

    #[test]
    fn test_check_operands_zero_sized() {
        let a = Matrix::new(0, 3).unwrap();
        let b = Matrix::new(3, 2).unwrap();
        assert!(matches!(
            check_operands(&a, &b),
            Err(MatrixError::ValidationError { .. })
        ));

        let mut moved_from = Matrix::identity(2).unwrap();
        let _ = moved_from.take();
        assert!(check_operands(&moved_from, &moved_from).is_err());
    }

    #[test]
    fn test_flop_count() {
        assert_eq!(flop_count(2, 3, 4), 48.0);
    }
}
