//! Pluggable GEMM backends for the reference multiplier.
//!
//! A [`GemmProvider`] is anything that can compute
//! `C = alpha * op(A) * op(B) + beta * C` with the classic CBLAS argument
//! list. Two providers ship with the crate:
//!
//! - [`NdarrayGemm`] (cargo feature `ndarray`, on by default) calls
//!   `ndarray::linalg::general_mat_mul`. With the `blas` feature ndarray
//!   forwards that call to the linked system CBLAS.
//! - [`CblasGemm`] wraps a raw `cblas_dgemm` function pointer handed in by
//!   the embedding application (for example one resolved with `dlopen`).
//!
//! The active provider lives in a process-wide registry guarded by a
//! `RwLock`. When nothing is registered the built-in provider is used, and
//! when no built-in provider was compiled in [`active_provider`] returns
//! `None` and the reference multiplier falls back to tiling.

use std::fmt;
use std::os::raw::c_int;
use std::sync::{Arc, RwLock};

use crate::error::{validation_error, Result};

/// Storage order of a GEMM operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    RowMajor,
    ColMajor,
}

/// Whether an operand is used as stored or transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    No,
    Yes,
}

// CBLAS enum values from cblas.h.
const CBLAS_ROW_MAJOR: c_int = 101;
const CBLAS_COL_MAJOR: c_int = 102;
const CBLAS_NO_TRANS: c_int = 111;
const CBLAS_TRANS: c_int = 112;

impl Layout {
    fn to_cblas(self) -> c_int {
        match self {
            Layout::RowMajor => CBLAS_ROW_MAJOR,
            Layout::ColMajor => CBLAS_COL_MAJOR,
        }
    }
}

impl Transpose {
    fn to_cblas(self) -> c_int {
        match self {
            Transpose::No => CBLAS_NO_TRANS,
            Transpose::Yes => CBLAS_TRANS,
        }
    }
}

/// GEMM backend trait for runtime dispatch.
///
/// Implementations compute `C = alpha * op(A) * op(B) + beta * C` where
/// `op(A)` is `m x k`, `op(B)` is `k x n` and `C` is `m x n`, all stored in
/// `layout` order with leading dimensions `lda`, `ldb`, `ldc`.
pub trait GemmProvider: Send + Sync {
    /// Returns backend name for reports and logs.
    fn name(&self) -> &'static str;

    /// Double-precision general matrix multiply.
    ///
    /// # Errors
    ///
    /// A validation error when a slice is too short for the given
    /// dimensions and leading dimensions, or a dimension is not
    /// representable by the backend.
    #[allow(clippy::too_many_arguments)]
    fn dgemm(
        &self,
        layout: Layout,
        transa: Transpose,
        transb: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: f64,
        a: &[f64],
        lda: usize,
        b: &[f64],
        ldb: usize,
        beta: f64,
        c: &mut [f64],
        ldc: usize,
    ) -> Result<()>;
}

impl fmt::Debug for dyn GemmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GemmProvider({})", self.name())
    }
}

/// Storage shape `(rows, cols)` of an operand whose `op()` is
/// `op_rows x op_cols`.
#[inline]
fn stored_shape(trans: Transpose, op_rows: usize, op_cols: usize) -> (usize, usize) {
    match trans {
        Transpose::No => (op_rows, op_cols),
        Transpose::Yes => (op_cols, op_rows),
    }
}

/// Checks leading dimension and slice length of one operand.
fn check_operand(
    name: &str,
    layout: Layout,
    (rows, cols): (usize, usize),
    len: usize,
    ld: usize,
) -> Result<()> {
    // Outer extent is walked with stride `ld`, inner extent is contiguous.
    let (outer, inner) = match layout {
        Layout::RowMajor => (rows, cols),
        Layout::ColMajor => (cols, rows),
    };

    if ld < inner.max(1) {
        return Err(validation_error(format!(
            "{}: leading dimension {} is smaller than {}",
            name, ld, inner
        )));
    }

    let required = if outer == 0 || inner == 0 {
        0
    } else {
        (outer - 1) * ld + inner
    };
    if len < required {
        return Err(validation_error(format!(
            "{}: slice of {} elements is too short, {} required",
            name, len, required
        )));
    }
    Ok(())
}

/// Validates a full GEMM argument list.
#[allow(clippy::too_many_arguments)]
pub(crate) fn check_gemm_args(
    layout: Layout,
    transa: Transpose,
    transb: Transpose,
    m: usize,
    n: usize,
    k: usize,
    a_len: usize,
    lda: usize,
    b_len: usize,
    ldb: usize,
    c_len: usize,
    ldc: usize,
) -> Result<()> {
    check_operand("A", layout, stored_shape(transa, m, k), a_len, lda)?;
    check_operand("B", layout, stored_shape(transb, k, n), b_len, ldb)?;
    check_operand("C", layout, (m, n), c_len, ldc)
}

//==============================================================================
// ndarray backend
//==============================================================================

/// Provider backed by `ndarray::linalg::general_mat_mul`.
#[cfg(feature = "ndarray")]
#[derive(Debug, Clone, Copy, Default)]
pub struct NdarrayGemm;

#[cfg(feature = "ndarray")]
mod ndarray_backend {
    use ndarray::linalg::general_mat_mul;
    use ndarray::{ArrayView2, ArrayViewMut2, ShapeBuilder};

    use super::{check_gemm_args, stored_shape, GemmProvider, Layout, NdarrayGemm, Transpose};
    use crate::error::{validation_error, Result};

    fn view<'a>(
        layout: Layout,
        (rows, cols): (usize, usize),
        data: &'a [f64],
        ld: usize,
    ) -> Result<ArrayView2<'a, f64>> {
        let strides = match layout {
            Layout::RowMajor => (ld, 1),
            Layout::ColMajor => (1, ld),
        };
        ArrayView2::from_shape((rows, cols).strides(strides), data)
            .map_err(|e| validation_error(format!("ndarray view: {}", e)))
    }

    impl GemmProvider for NdarrayGemm {
        fn name(&self) -> &'static str {
            if cfg!(feature = "blas") {
                "ndarray (cblas)"
            } else {
                "ndarray"
            }
        }

        fn dgemm(
            &self,
            layout: Layout,
            transa: Transpose,
            transb: Transpose,
            m: usize,
            n: usize,
            k: usize,
            alpha: f64,
            a: &[f64],
            lda: usize,
            b: &[f64],
            ldb: usize,
            beta: f64,
            c: &mut [f64],
            ldc: usize,
        ) -> Result<()> {
            check_gemm_args(
                layout,
                transa,
                transb,
                m,
                n,
                k,
                a.len(),
                lda,
                b.len(),
                ldb,
                c.len(),
                ldc,
            )?;

            let a_view = view(layout, stored_shape(transa, m, k), a, lda)?;
            let b_view = view(layout, stored_shape(transb, k, n), b, ldb)?;
            let a_op = match transa {
                Transpose::No => a_view,
                Transpose::Yes => a_view.reversed_axes(),
            };
            let b_op = match transb {
                Transpose::No => b_view,
                Transpose::Yes => b_view.reversed_axes(),
            };

            let c_strides = match layout {
                Layout::RowMajor => (ldc, 1),
                Layout::ColMajor => (1, ldc),
            };
            let mut c_view = ArrayViewMut2::from_shape((m, n).strides(c_strides), c)
                .map_err(|e| validation_error(format!("ndarray view: {}", e)))?;

            general_mat_mul(alpha, &a_op, &b_op, beta, &mut c_view);
            Ok(())
        }
    }
}

//==============================================================================
// External CBLAS backend
//==============================================================================

/// `cblas_dgemm` function pointer type.
///
/// Signature matches cblas.h:
/// ```c
/// void cblas_dgemm(CBLAS_LAYOUT layout, CBLAS_TRANSPOSE transa,
///                  CBLAS_TRANSPOSE transb, int m, int n, int k,
///                  double alpha, const double *a, int lda,
///                  const double *b, int ldb, double beta,
///                  double *c, int ldc);
/// ```
pub type CblasDgemmFn = unsafe extern "C" fn(
    layout: c_int,
    transa: c_int,
    transb: c_int,
    m: c_int,
    n: c_int,
    k: c_int,
    alpha: f64,
    a: *const f64,
    lda: c_int,
    b: *const f64,
    ldb: c_int,
    beta: f64,
    c: *mut f64,
    ldc: c_int,
);

/// Provider calling an externally supplied `cblas_dgemm`.
#[derive(Clone, Copy)]
pub struct CblasGemm {
    dgemm: CblasDgemmFn,
}

impl CblasGemm {
    /// Wraps a `cblas_dgemm` implementation.
    ///
    /// # Safety
    ///
    /// `dgemm` must follow the CBLAS contract: read and write only within
    /// the extents implied by its arguments, and be callable from any thread.
    pub unsafe fn new(dgemm: CblasDgemmFn) -> Self {
        CblasGemm { dgemm }
    }
}

impl fmt::Debug for CblasGemm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CblasGemm").finish_non_exhaustive()
    }
}

fn to_c_int(name: &str, value: usize) -> Result<c_int> {
    c_int::try_from(value).map_err(|_| {
        validation_error(format!(
            "{} = {} does not fit the 32-bit CBLAS interface",
            name, value
        ))
    })
}

impl GemmProvider for CblasGemm {
    fn name(&self) -> &'static str {
        "cblas"
    }

    fn dgemm(
        &self,
        layout: Layout,
        transa: Transpose,
        transb: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: f64,
        a: &[f64],
        lda: usize,
        b: &[f64],
        ldb: usize,
        beta: f64,
        c: &mut [f64],
        ldc: usize,
    ) -> Result<()> {
        check_gemm_args(
            layout,
            transa,
            transb,
            m,
            n,
            k,
            a.len(),
            lda,
            b.len(),
            ldb,
            c.len(),
            ldc,
        )?;

        let (m_c, n_c, k_c) = (to_c_int("m", m)?, to_c_int("n", n)?, to_c_int("k", k)?);
        let (lda_c, ldb_c, ldc_c) = (
            to_c_int("lda", lda)?,
            to_c_int("ldb", ldb)?,
            to_c_int("ldc", ldc)?,
        );

        // SAFETY: slice extents were checked against every dimension and
        // leading dimension above; `CblasGemm::new` holds the caller to the
        // CBLAS contract.
        unsafe {
            (self.dgemm)(
                layout.to_cblas(),
                transa.to_cblas(),
                transb.to_cblas(),
                m_c,
                n_c,
                k_c,
                alpha,
                a.as_ptr(),
                lda_c,
                b.as_ptr(),
                ldb_c,
                beta,
                c.as_mut_ptr(),
                ldc_c,
            );
        }
        Ok(())
    }
}

//==============================================================================
// Registry
//==============================================================================

static PROVIDER: RwLock<Option<Arc<dyn GemmProvider>>> = RwLock::new(None);

/// Registers `provider` for every subsequent reference multiplication.
pub fn set_provider(provider: Arc<dyn GemmProvider>) {
    log::debug!("registering GEMM provider {}", provider.name());
    let mut slot = PROVIDER.write().unwrap_or_else(|e| e.into_inner());
    *slot = Some(provider);
}

/// Registers an external `cblas_dgemm`.
///
/// # Safety
///
/// Same contract as [`CblasGemm::new`].
pub unsafe fn set_cblas_dgemm(dgemm: CblasDgemmFn) {
    set_provider(Arc::new(CblasGemm::new(dgemm)));
}

/// Drops any registered provider, returning to the built-in default.
pub fn clear_provider() {
    let mut slot = PROVIDER.write().unwrap_or_else(|e| e.into_inner());
    *slot = None;
}

/// The provider compiled into the crate, if any.
pub fn builtin_provider() -> Option<Arc<dyn GemmProvider>> {
    #[cfg(feature = "ndarray")]
    {
        Some(Arc::new(NdarrayGemm))
    }
    #[cfg(not(feature = "ndarray"))]
    {
        None
    }
}

/// The registered provider, else the built-in one.
pub fn active_provider() -> Option<Arc<dyn GemmProvider>> {
    let registered = PROVIDER.read().unwrap_or_else(|e| e.into_inner()).clone();
    registered.or_else(builtin_provider)
}
