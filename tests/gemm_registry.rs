//! The provider registry is process-global, so everything that mutates it
//! lives in a single test function.

use std::os::raw::c_int;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use tilemul::bench::{self, BenchConfig};
use tilemul::gemm::{self, GemmProvider, Layout, Transpose};
use tilemul::{multiply_naive, multiply_reference, Matrix, MatrixError, Result, EXACT_TOLERANCE};

static CALLS: AtomicUsize = AtomicUsize::new(0);
static LAST_LAYOUT: AtomicI32 = AtomicI32::new(0);
static LAST_TRANSA: AtomicI32 = AtomicI32::new(0);
static LAST_TRANSB: AtomicI32 = AtomicI32::new(0);
static LAST_DIMS: [AtomicI32; 3] = [AtomicI32::new(0), AtomicI32::new(0), AtomicI32::new(0)];

/// Row-major, no-transpose `cblas_dgemm` stand-in that records its
/// arguments.
#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn fake_cblas_dgemm(
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
) {
    CALLS.fetch_add(1, Ordering::SeqCst);
    LAST_LAYOUT.store(layout, Ordering::SeqCst);
    LAST_TRANSA.store(transa, Ordering::SeqCst);
    LAST_TRANSB.store(transb, Ordering::SeqCst);
    LAST_DIMS[0].store(m, Ordering::SeqCst);
    LAST_DIMS[1].store(n, Ordering::SeqCst);
    LAST_DIMS[2].store(k, Ordering::SeqCst);

    let (m, n, k) = (m as usize, n as usize, k as usize);
    let (lda, ldb, ldc) = (lda as usize, ldb as usize, ldc as usize);
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0;
            for p in 0..k {
                sum += *a.add(i * lda + p) * *b.add(p * ldb + j);
            }
            let out = c.add(i * ldc + j);
            *out = alpha * sum + beta * *out;
        }
    }
}

struct Doubling;

impl GemmProvider for Doubling {
    fn name(&self) -> &'static str {
        "doubling"
    }

    fn dgemm(
        &self,
        _layout: Layout,
        _transa: Transpose,
        _transb: Transpose,
        _m: usize,
        _n: usize,
        _k: usize,
        _alpha: f64,
        _a: &[f64],
        _lda: usize,
        _b: &[f64],
        _ldb: usize,
        _beta: f64,
        c: &mut [f64],
        _ldc: usize,
    ) -> Result<()> {
        c.fill(2.0);
        Ok(())
    }
}

#[test]
fn test_provider_registry_lifecycle() {
    let a = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
    let b = Matrix::from_rows(&[[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]]).unwrap();
    let expected = multiply_naive(&a, &b).unwrap();

    // Nothing registered: the built-in provider (or the tiled fallback).
    let builtin = gemm::builtin_provider().map(|p| p.name());
    assert_eq!(gemm::active_provider().map(|p| p.name()), builtin);
    let c = multiply_reference(&a, &b).unwrap();
    assert!(c.approx_eq(&expected, EXACT_TOLERANCE));

    // External cblas_dgemm.
    unsafe { gemm::set_cblas_dgemm(fake_cblas_dgemm) };
    assert_eq!(gemm::active_provider().map(|p| p.name()), Some("cblas"));

    let c = multiply_reference(&a, &b).unwrap();
    assert!(c.approx_eq(&expected, EXACT_TOLERANCE), "got {}", c);
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(LAST_LAYOUT.load(Ordering::SeqCst), 101, "CblasRowMajor");
    assert_eq!(LAST_TRANSA.load(Ordering::SeqCst), 111, "CblasNoTrans");
    assert_eq!(LAST_TRANSB.load(Ordering::SeqCst), 111, "CblasNoTrans");
    let dims: Vec<i32> = LAST_DIMS.iter().map(|d| d.load(Ordering::SeqCst)).collect();
    assert_eq!(dims, vec![2, 2, 3]);

    // Dimension errors never reach the provider.
    assert!(multiply_reference(&a, &a).is_err());
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);

    // A later registration replaces the earlier one.
    gemm::set_provider(Arc::new(Doubling));
    let c = multiply_reference(&a, &b).unwrap();
    assert!(c.as_slice().iter().all(|&v| v == 2.0));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);

    // The harness refuses to report a provider that gets the product wrong.
    let config = BenchConfig {
        repeat: 1,
        ..BenchConfig::square(8)
    };
    match bench::run(&config) {
        Err(MatrixError::VerificationError { right, .. }) => assert_eq!(right, "reference"),
        other => panic!("expected a verification failure, got {:?}", other),
    }

    gemm::clear_provider();
    assert_eq!(gemm::active_provider().map(|p| p.name()), builtin);
    let c = multiply_reference(&a, &b).unwrap();
    assert!(c.approx_eq(&expected, EXACT_TOLERANCE));
}
