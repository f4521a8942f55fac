use super::illegal;
use crate::{
    assert,
    tile::{warn_if_strided, TileMut, TileRef},
    Result, TileScalar, Transpose,
};
use reborrow::*;

/// Computes `dst := beta * dst + alpha * lhs * rhs`, with `lhs` and `rhs` optionally conjugated.
///
/// `beta == None` overwrites `dst` without reading it.
#[track_caller]
pub(crate) fn matmul<E: TileScalar>(
    mut dst: TileMut<'_, E>,
    beta: Option<E>,
    lhs: TileRef<'_, E>,
    conj_lhs: bool,
    rhs: TileRef<'_, E>,
    conj_rhs: bool,
    alpha: E,
) {
    let (m, n, k) = (dst.nrows(), dst.ncols(), lhs.ncols());
    assert!(all(lhs.nrows() == m, rhs.nrows() == k, rhs.ncols() == n));
    if m == 0 || n == 0 {
        return;
    }

    let beta = beta.filter(|beta| !beta.is_zero());
    if k == 0 || alpha.is_zero() {
        match beta {
            None => dst.fill(E::zero()),
            Some(beta) if beta != E::one() => {
                for j in 0..n {
                    for i in 0..m {
                        dst.write(i, j, beta * dst.read(i, j));
                    }
                }
            }
            Some(_) => {}
        }
        return;
    }

    unsafe {
        gemm::gemm(
            m,
            n,
            k,
            dst.as_ptr_mut(),
            dst.col_stride(),
            dst.row_stride(),
            beta.is_some(),
            lhs.as_ptr(),
            lhs.col_stride(),
            lhs.row_stride(),
            rhs.as_ptr(),
            rhs.col_stride(),
            rhs.row_stride(),
            beta.unwrap_or(E::zero()),
            alpha,
            false,
            conj_lhs,
            conj_rhs,
            gemm::Parallelism::None,
        );
    }
}

#[inline]
fn apply<E>(a: TileRef<'_, E>, trans: Transpose) -> (TileRef<'_, E>, bool) {
    match trans {
        Transpose::NoTrans => (a, false),
        Transpose::Trans => (a.transpose(), false),
        Transpose::ConjTrans => (a.transpose(), true),
    }
}

/// Computes `c := alpha * op(a) * op(b) + beta * c`.
///
/// When `beta` is zero, `c` is overwritten without being read.
pub fn gemm<E: TileScalar>(
    transa: Transpose,
    transb: Transpose,
    alpha: E,
    a: TileRef<'_, E>,
    b: TileRef<'_, E>,
    beta: E,
    c: TileMut<'_, E>,
) -> Result<()> {
    let (a, conj_a) = apply(a, transa);
    let (b, conj_b) = apply(b, transb);
    if a.nrows() != c.nrows() {
        return Err(illegal(4));
    }
    if b.nrows() != a.ncols() || b.ncols() != c.ncols() {
        return Err(illegal(5));
    }
    warn_if_strided("gemm", c.rb());

    let beta = if beta.is_zero() { None } else { Some(beta) };
    matmul(c, beta, a, conj_a, b, conj_b, alpha);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;
    use crate::{c64, TileError};
    use assert_approx_eq::assert_approx_eq;
    use rand::prelude::*;

    fn naive(
        transa: Transpose,
        transb: Transpose,
        alpha: c64,
        a: TileRef<'_, c64>,
        b: TileRef<'_, c64>,
        beta: c64,
        c: &mut [c64],
        ldc: usize,
    ) {
        let (a, conj_a) = apply(a, transa);
        let (b, conj_b) = apply(b, transb);
        for j in 0..b.ncols() {
            for i in 0..a.nrows() {
                let mut acc = c64::new(0.0, 0.0);
                for l in 0..a.ncols() {
                    let x = if conj_a { a.read(i, l).conj() } else { a.read(i, l) };
                    let y = if conj_b { b.read(l, j).conj() } else { b.read(l, j) };
                    acc += x * y;
                }
                c[i + j * ldc] = alpha * acc + beta * c[i + j * ldc];
            }
        }
    }

    fn random(rng: &mut StdRng, len: usize) -> Vec<c64> {
        (0..len)
            .map(|_| c64::new(rng.gen(), rng.gen()))
            .collect()
    }

    #[test]
    fn matches_naive_product() {
        let rng = &mut StdRng::seed_from_u64(0);
        let (m, n, k) = (5, 4, 3);
        let ops = [Transpose::NoTrans, Transpose::Trans, Transpose::ConjTrans];
        for transa in ops {
            for transb in ops {
                let (ar, ac) = if transa == Transpose::NoTrans { (m, k) } else { (k, m) };
                let (br, bc) = if transb == Transpose::NoTrans { (k, n) } else { (n, k) };
                let a = random(rng, ar * ac);
                let b = random(rng, br * bc);
                let c0 = random(rng, m * n);
                let alpha = c64::new(0.5, -1.0);
                let beta = c64::new(2.0, 0.25);

                let a = TileRef::from_col_major(&a, ar, ac, ar);
                let b = TileRef::from_col_major(&b, br, bc, br);
                let mut expected = c0.clone();
                naive(transa, transb, alpha, a, b, beta, &mut expected, m);

                let mut c = c0.clone();
                gemm(transa, transb, alpha, a, b, beta, TileMut::from_col_major(&mut c, m, n, m))
                    .unwrap();
                for (x, y) in c.iter().zip(&expected) {
                    assert_approx_eq!(x.re, y.re, 1e-12);
                    assert_approx_eq!(x.im, y.im, 1e-12);
                }
            }
        }
    }

    #[test]
    fn zero_beta_ignores_garbage() {
        let a = [1.0f64, 2.0, 3.0, 4.0];
        let b = [1.0f64, 0.0, 0.0, 1.0];
        let mut c = [f64::NAN; 4];
        gemm(
            Transpose::NoTrans,
            Transpose::NoTrans,
            1.0,
            TileRef::from_col_major(&a, 2, 2, 2),
            TileRef::from_col_major(&b, 2, 2, 2),
            0.0,
            TileMut::from_col_major(&mut c, 2, 2, 2),
        )
        .unwrap();
        assert_eq!(c, a);

        // empty inner dimension only scales
        let mut c = [1.0f64, 2.0, 3.0, 4.0];
        let empty: [f64; 0] = [];
        gemm(
            Transpose::NoTrans,
            Transpose::NoTrans,
            1.0,
            TileRef::from_col_major(&empty, 2, 0, 2),
            TileRef::from_col_major(&empty, 0, 2, 1),
            3.0,
            TileMut::from_col_major(&mut c, 2, 2, 2),
        )
        .unwrap();
        assert_eq!(c, [3.0, 6.0, 9.0, 12.0]);
    }

    #[test]
    fn reports_mismatched_operands() {
        let a = [0.0f64; 6];
        let mut c = [0.0f64; 4];
        let mut c = TileMut::from_col_major(&mut c, 2, 2, 2);
        let a23 = TileRef::from_col_major(&a, 2, 3, 2);
        let a32 = TileRef::from_col_major(&a, 3, 2, 3);
        assert_eq!(
            gemm(Transpose::NoTrans, Transpose::NoTrans, 1.0, a32, a32, 0.0, c.rb_mut()),
            Err(TileError::KernelArgument { index: 4 })
        );
        assert_eq!(
            gemm(Transpose::NoTrans, Transpose::NoTrans, 1.0, a23, a23, 0.0, c.rb_mut()),
            Err(TileError::KernelArgument { index: 5 })
        );
        assert!(gemm(Transpose::NoTrans, Transpose::NoTrans, 1.0, a23, a32, 0.0, c).is_ok());
    }
}
