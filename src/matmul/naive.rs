use crate::error::Result;
use crate::Matrix;

use super::check_operands;

/// Naive matrix multiplication using i-j-k loop order.
///
/// This is the textbook triple loop. Every output element is summed in a
/// local accumulator in ascending `k` and stored once, which fixes the
/// summation order all other strategies are compared against.
///
/// The inner loop walks `B` with stride `n`, so this is the slowest strategy
/// by design; use it as a correctness baseline, not for performance.
///
/// # Errors
///
/// [`MatrixError::DimensionMismatch`](crate::MatrixError::DimensionMismatch)
/// if `a.cols() != b.rows()`, a validation error for zero-sized operands.
///
/// # Example
///
/// ```
/// use tilemul::{multiply_naive, Matrix};
///
/// let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
/// let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
/// let c = multiply_naive(&a, &b).unwrap();
///
/// assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
/// ```
pub fn multiply_naive(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    check_operands(a, b)?;

    let (m, k) = a.shape();
    let n = b.cols();
    let mut c = Matrix::new(m, n)?;

    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0;
            for p in 0..k {
                // SAFETY: i < m = a.rows, p < k = a.cols = b.rows, j < n = b.cols.
                sum += unsafe { a.get_unchecked(i, p) * b.get_unchecked(p, j) };
            }
            // SAFETY: c is m x n.
            unsafe { *c.get_unchecked_mut(i, j) = sum };
        }
    }

    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatrixError;

    #[test]
    fn test_naive_2x2() {
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
        let c = multiply_naive(&a, &b).unwrap();
        assert_eq!(c, Matrix::from_rows(&[[19.0, 22.0], [43.0, 50.0]]).unwrap());
    }

    #[test]
    fn test_naive_rectangular() {
        // (2x3) * (3x1)
        let a = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let b = Matrix::from_rows(&[[1.0], [0.5], [-1.0]]).unwrap();
        let c = multiply_naive(&a, &b).unwrap();
        assert_eq!(c.shape(), (2, 1));
        assert_eq!(c.as_slice(), &[-1.0, 0.5]);
    }

    #[test]
    fn test_naive_dimension_mismatch() {
        let a = Matrix::new(2, 3).unwrap();
        let b = Matrix::new(2, 3).unwrap();
        assert!(matches!(
            multiply_naive(&a, &b),
            Err(MatrixError::DimensionMismatch { .. })
        ));
    }
}
