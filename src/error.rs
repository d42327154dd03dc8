//! Error types for tilemul operations.
//!
//! Every failure is detected synchronously at the point of violation and
//! handed back to the caller; nothing here is retried.

use std::fmt;

/// Errors that can occur while building or multiplying matrices.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixError {
    /// Inner dimensions of the two operands disagree.
    DimensionMismatch {
        /// Shape `(rows, cols)` of the left operand.
        left: (usize, usize),
        /// Shape `(rows, cols)` of the right operand.
        right: (usize, usize),
        /// Human-readable error message.
        message: String,
    },
    /// Checked element access outside the matrix bounds.
    IndexError {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Row count of the matrix.
        rows: usize,
        /// Column count of the matrix.
        cols: usize,
    },
    /// Storage for a matrix could not be obtained.
    AllocationError {
        /// The number of bytes that was requested.
        requested_size: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Input validation error.
    ValidationError {
        /// Human-readable error message.
        message: String,
    },
    /// Two multiplication strategies produced different products.
    VerificationError {
        /// Name of the first strategy.
        left: String,
        /// Name of the second strategy.
        right: String,
        /// Largest element-wise absolute difference found.
        max_abs_diff: f64,
        /// Tolerance that was exceeded.
        tolerance: f64,
    },
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixError::DimensionMismatch {
                left,
                right,
                message,
            } => write!(
                f,
                "Dimension mismatch: {} (left is {}x{}, right is {}x{})",
                message, left.0, left.1, right.0, right.1
            ),
            MatrixError::IndexError {
                row,
                col,
                rows,
                cols,
            } => write!(
                f,
                "Index out of range: ({}, {}) in a {}x{} matrix",
                row, col, rows, cols
            ),
            MatrixError::AllocationError {
                requested_size,
                message,
            } => write!(
                f,
                "Memory allocation failed: {} (requested {} bytes)",
                message, requested_size
            ),
            MatrixError::ValidationError { message } => {
                write!(f, "Validation error: {}", message)
            }
            MatrixError::VerificationError {
                left,
                right,
                max_abs_diff,
                tolerance,
            } => write!(
                f,
                "Verification failed: {} and {} differ by {:e} (tolerance {:e})",
                left, right, max_abs_diff, tolerance
            ),
        }
    }
}

impl std::error::Error for MatrixError {}

/// Result type alias for tilemul operations.
pub type Result<T> = std::result::Result<T, MatrixError>;

/// Creates a dimension mismatch error for a `left * right` product.
pub fn dimension_mismatch(
    left: (usize, usize),
    right: (usize, usize),
    message: impl Into<String>,
) -> MatrixError {
    MatrixError::DimensionMismatch {
        left,
        right,
        message: message.into(),
    }
}

/// Creates an index error.
pub fn index_error(row: usize, col: usize, rows: usize, cols: usize) -> MatrixError {
    MatrixError::IndexError {
        row,
        col,
        rows,
        cols,
    }
}

/// Creates an allocation error.
pub fn allocation_error(size: usize, message: impl Into<String>) -> MatrixError {
    MatrixError::AllocationError {
        requested_size: size,
        message: message.into(),
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> MatrixError {
    MatrixError::ValidationError {
        message: message.into(),
    }
}

/// Creates a verification error between two named strategies.
pub fn verification_error(
    left: impl Into<String>,
    right: impl Into<String>,
    max_abs_diff: f64,
    tolerance: f64,
) -> MatrixError {
    MatrixError::VerificationError {
        left: left.into(),
        right: right.into(),
        max_abs_diff,
        tolerance,
    }
}
