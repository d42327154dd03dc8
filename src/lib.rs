//! Dense matrix multiplication three ways.
//!
//! `tilemul` provides a row-major `f64` [`Matrix`] and three interchangeable
//! ways to multiply two of them:
//!
//! - [`multiply_naive`]: the textbook triple loop, used as ground truth.
//! - [`multiply_tile`]: cache blocking with a configurable tile edge, plus
//!   [`multiply_tile_par`] which spreads row bands over rayon.
//! - [`multiply_reference`]: hands the product to an optimized GEMM through
//!   the [`gemm::GemmProvider`] capability and falls back to tiling when no
//!   provider is available.
//!
//! The [`bench`] module times all of them on the same operands and refuses
//! to report numbers unless every product agrees within tolerance.
//!
//! ## Usage
//!
//! ```
//! use tilemul::{multiply_naive, multiply_reference, multiply_tile, Matrix, ALGORITHM_TOLERANCE};
//!
//! let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]])?;
//! let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]])?;
//!
//! let naive = multiply_naive(&a, &b)?;
//! let tiled = multiply_tile(&a, &b, 16)?;
//! let reference = multiply_reference(&a, &b)?;
//!
//! assert!(naive.approx_eq(&tiled, ALGORITHM_TOLERANCE));
//! assert!(naive.approx_eq(&reference, ALGORITHM_TOLERANCE));
//! # Ok::<(), tilemul::MatrixError>(())
//! ```

pub mod alloc;
pub mod bench;
pub mod error;
pub mod gemm;
pub mod matmul;
pub mod matrix;
mod report;

pub use error::{MatrixError, Result};
pub use matmul::{
    multiply_naive, multiply_reference, multiply_reference_with, multiply_tile,
    multiply_tile_par, DEFAULT_TILE_SIZE,
};
pub use matrix::{Matrix, ALGORITHM_TOLERANCE, EXACT_TOLERANCE};
