use std::sync::Once;

use crate::error::Result;
use crate::gemm::{active_provider, GemmProvider, Layout, Transpose};
use crate::Matrix;

use super::{check_operands, multiply_tile, DEFAULT_TILE_SIZE};

static FALLBACK_WARNING: Once = Once::new();

/// Matrix multiplication through the active [`GemmProvider`].
///
/// Calls the provider with row-major, untransposed operands,
/// `alpha = 1` and `beta = 0`. When no provider is available the product
/// is computed by [`multiply_tile`] with [`DEFAULT_TILE_SIZE`]; callers
/// always get a correct product.
///
/// # Errors
///
/// Same dimension checks as the naive strategy. Errors reported by the
/// provider are passed through.
pub fn multiply_reference(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    multiply_reference_with(a, b, active_provider().as_deref())
}

/// Same as [`multiply_reference`] with an explicitly chosen provider.
/// `None` selects the tiled fallback.
pub fn multiply_reference_with(
    a: &Matrix,
    b: &Matrix,
    provider: Option<&dyn GemmProvider>,
) -> Result<Matrix> {
    check_operands(a, b)?;

    let Some(provider) = provider else {
        FALLBACK_WARNING.call_once(|| {
            log::warn!("no GEMM provider available, reference multiplication uses tiling");
        });
        return multiply_tile(a, b, DEFAULT_TILE_SIZE);
    };

    let (m, k) = a.shape();
    let n = b.cols();
    let mut c = Matrix::new(m, n)?;

    log::trace!("dgemm via {} ({}x{}x{})", provider.name(), m, k, n);
    provider.dgemm(
        Layout::RowMajor,
        Transpose::No,
        Transpose::No,
        m,
        n,
        k,
        1.0,
        a.as_slice(),
        k,
        b.as_slice(),
        n,
        0.0,
        c.as_mut_slice(),
        n,
    )?;

    Ok(c)
}
