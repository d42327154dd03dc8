//! Dense row-major `f64` matrix storage.
//!
//! Element `(i, j)` lives at offset `i * cols + j` of a single contiguous,
//! exclusively owned buffer. Cloning duplicates the buffer; taking a matrix
//! (see [`Matrix::take`]) moves the buffer out and leaves a `0 x 0` matrix
//! behind.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::error::{allocation_error, index_error, validation_error, Result};

/// Tolerance for comparisons where both sides should agree bit for bit
/// up to representation noise (identity products, copies).
pub const EXACT_TOLERANCE: f64 = 1e-9;

/// Tolerance for comparisons between strategies that sum in different orders.
pub const ALGORITHM_TOLERANCE: f64 = 1e-5;

/// A dense, row-major, double-precision matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Allocates a zero-filled buffer of `len` elements, reporting failure
/// instead of aborting.
fn alloc_zeroed_buffer(len: usize) -> Result<Vec<f64>> {
    let bytes = len
        .checked_mul(std::mem::size_of::<f64>())
        .ok_or_else(|| allocation_error(usize::MAX, "matrix size overflows usize"))?;

    let mut data: Vec<f64> = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|e| allocation_error(bytes, e.to_string()))?;
    data.resize(len, 0.0);
    Ok(data)
}

impl Matrix {
    /// Creates a `rows x cols` matrix filled with zeros.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::AllocationError`](crate::MatrixError::AllocationError)
    /// if `rows * cols` overflows or the storage cannot be reserved.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            allocation_error(
                usize::MAX,
                format!("{}x{} elements overflow usize", rows, cols),
            )
        })?;

        Ok(Matrix {
            rows,
            cols,
            data: alloc_zeroed_buffer(len)?,
        })
    }

    /// Same as [`Matrix::new`].
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::new(rows, cols)
    }

    /// Creates an `n x n` identity matrix.
    pub fn identity(n: usize) -> Result<Self> {
        let mut m = Self::new(n, n)?;
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        Ok(m)
    }

    /// Wraps an existing row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(validation_error(format!(
                "buffer of {} elements does not match a {}x{} shape",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Builds a matrix from a list of equally long rows.
    ///
    /// ```
    /// use tilemul::Matrix;
    ///
    /// let m = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
    /// assert_eq!(m.shape(), (2, 2));
    /// assert_eq!(m[(1, 0)], 3.0);
    /// ```
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, |r| r.as_ref().len());

        let mut m = Self::new(nrows, ncols)?;
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != ncols {
                return Err(validation_error(format!(
                    "row {} has {} elements, expected {}",
                    i,
                    row.len(),
                    ncols
                )));
            }
            m.data[i * ncols..(i + 1) * ncols].copy_from_slice(row);
        }
        Ok(m)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of stored elements, always `rows * cols`.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The row-major buffer.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Row `i` as a contiguous slice.
    ///
    /// # Panics
    ///
    /// Panics if `i >= rows`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.rows, "row {} out of range for {} rows", i, self.rows);
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Checked read of element `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.offset(row, col).map(|at| self.data[at])
    }

    /// Checked write of element `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let at = self.offset(row, col)?;
        self.data[at] = value;
        Ok(())
    }

    /// Reads element `(row, col)` without bounds checking.
    ///
    /// # Safety
    ///
    /// `row < self.rows()` and `col < self.cols()` must hold.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.cols);
        *self.data.get_unchecked(row * self.cols + col)
    }

    /// Mutable reference to element `(row, col)` without bounds checking.
    ///
    /// # Safety
    ///
    /// `row < self.rows()` and `col < self.cols()` must hold.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        debug_assert!(row < self.rows && col < self.cols);
        self.data.get_unchecked_mut(row * self.cols + col)
    }

    /// Moves the buffer out, leaving `self` as a valid `0 x 0` matrix.
    pub fn take(&mut self) -> Matrix {
        std::mem::take(self)
    }

    /// Returns the transposed matrix as a new allocation.
    pub fn transpose(&self) -> Result<Matrix> {
        let mut t = Matrix::new(self.cols, self.rows)?;
        for i in 0..self.rows {
            for j in 0..self.cols {
                t.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Ok(t)
    }

    /// Tolerance-based equality: same shape and `|a - b| <= tolerance`
    /// for every element pair.
    pub fn approx_eq(&self, other: &Matrix, tolerance: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Largest element-wise absolute difference, or `None` when the
    /// shapes differ. A NaN on either side yields NaN.
    pub fn max_abs_diff(&self, other: &Matrix) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, |acc: f64, d| {
                    if acc.is_nan() || d.is_nan() {
                        f64::NAN
                    } else {
                        acc.max(d)
                    }
                }),
        )
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(index_error(row, col, self.rows, self.cols));
        }
        Ok(row * self.cols + col)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of range for {}x{} matrix",
            row,
            col,
            self.rows,
            self.cols
        );
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of range for {}x{} matrix",
            row,
            col,
            self.rows,
            self.cols
        );
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{}:", self.rows, self.cols)?;
        for i in 0..self.rows {
            write!(f, "  [")?;
            for (j, v) in self.row(i).iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
