use super::{
    householder::{
        gelq2, geqr2, larfb_left_conj_trans, larfb_right_no_trans, larft_columnwise,
        larft_rowwise,
    },
    illegal,
};
use crate::{
    tile::{warn_if_strided, TileMut},
    Result, TileScalar,
};
use reborrow::*;

/// Number of scratch elements needed by [`geqrt`] on an `m×n` tile.
#[inline]
pub fn geqrt_work_len(ib: usize, m: usize, n: usize) -> usize {
    Ord::min(ib, Ord::min(m, n)) * n
}

/// Number of scratch elements needed by [`gelqt`] on an `m×n` tile.
#[inline]
pub fn gelqt_work_len(ib: usize, m: usize, n: usize) -> usize {
    Ord::min(ib, Ord::min(m, n)) * m
}

/// Blocked QR factorization of one tile, `A = Q * R`.
///
/// On exit, `R` is stored on and above the diagonal of `a` and the Householder vectors below it.
/// The `k = min(m, n)` reflectors are processed in blocks of `ib` columns; the triangular factor
/// of the block starting at column `i` is stored in `t[..sb, i..i + sb]`, so that
/// `Q = (I - V_1 T_1 V_1^H) * (I - V_2 T_2 V_2^H) * ...`. `tau` receives the scalar factors
/// and `work` holds at least [`geqrt_work_len`] elements.
///
/// # Errors
///
/// - `KernelArgument { index: 1 }` when `ib == 0` and the tile is not empty.
/// - `KernelArgument { index: 3 }` when `t` is smaller than `min(ib, k)×k`.
/// - `KernelArgument { index: 4 }` when `tau` is shorter than `k`.
/// - `KernelArgument { index: 5 }` when `work` is too short.
pub fn geqrt<E: TileScalar>(
    ib: usize,
    mut a: TileMut<'_, E>,
    mut t: TileMut<'_, E>,
    tau: &mut [E],
    work: &mut [E],
) -> Result<()> {
    let (m, n) = (a.nrows(), a.ncols());
    if ib == 0 && m > 0 && n > 0 {
        return Err(illegal(1));
    }
    if m == 0 || n == 0 {
        return Ok(());
    }
    let k = Ord::min(m, n);
    if t.nrows() < Ord::min(ib, k) || t.ncols() < k {
        return Err(illegal(3));
    }
    if tau.len() < k {
        return Err(illegal(4));
    }
    if work.len() < geqrt_work_len(ib, m, n) {
        return Err(illegal(5));
    }
    warn_if_strided("geqrt", a.rb());

    let mut i = 0;
    while i < k {
        let sb = Ord::min(ib, k - i);
        let (mut panel, trailing) = a
            .rb_mut()
            .submatrix_mut(i, i, m - i, n - i)
            .split_at_col_mut(sb);
        let tau = &mut tau[i..i + sb];

        geqr2(panel.rb_mut(), tau);
        larft_columnwise(panel.rb(), tau, t.rb_mut().submatrix_mut(0, i, sb, sb));
        if i + sb < n {
            larfb_left_conj_trans(panel.rb(), t.rb().submatrix(0, i, sb, sb), trailing, work);
        }
        i += sb;
    }
    Ok(())
}

/// Blocked LQ factorization of one tile, `A = L * Q`.
///
/// On exit, `L` is stored on and below the diagonal of `a`, and row `i` right of the diagonal
/// holds `v_i^H`. The triangular factors are stored in `t` as for [`geqrt`], so that
/// `Q^H = (I - V_1^H T_1 V_1) * (I - V_2^H T_2 V_2) * ...`. `work` holds at least
/// [`gelqt_work_len`] elements.
///
/// # Errors
///
/// Same as [`geqrt`].
pub fn gelqt<E: TileScalar>(
    ib: usize,
    mut a: TileMut<'_, E>,
    mut t: TileMut<'_, E>,
    tau: &mut [E],
    work: &mut [E],
) -> Result<()> {
    let (m, n) = (a.nrows(), a.ncols());
    if ib == 0 && m > 0 && n > 0 {
        return Err(illegal(1));
    }
    if m == 0 || n == 0 {
        return Ok(());
    }
    let k = Ord::min(m, n);
    if t.nrows() < Ord::min(ib, k) || t.ncols() < k {
        return Err(illegal(3));
    }
    if tau.len() < k {
        return Err(illegal(4));
    }
    if work.len() < gelqt_work_len(ib, m, n) {
        return Err(illegal(5));
    }
    warn_if_strided("gelqt", a.rb());

    let mut i = 0;
    while i < k {
        let sb = Ord::min(ib, k - i);
        let (mut panel, trailing) = a
            .rb_mut()
            .submatrix_mut(i, i, m - i, n - i)
            .split_at_row_mut(sb);
        let tau = &mut tau[i..i + sb];

        gelq2(panel.rb_mut(), tau);
        larft_rowwise(panel.rb(), tau, t.rb_mut().submatrix_mut(0, i, sb, sb));
        if i + sb < m {
            larfb_right_no_trans(panel.rb(), t.rb().submatrix(0, i, sb, sb), trailing, work);
        }
        i += sb;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assert;
    use crate::{c64, tile::TileRef, RealScalar, TileError};
    use assert_approx_eq::assert_approx_eq;
    use rand::prelude::*;
    use std::cell::RefCell;

    thread_local! {
        static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0));
    }

    pub(crate) fn random<E: TileScalar>(len: usize) -> Vec<E> {
        RNG.with(|rng| {
            let rng = &mut *rng.borrow_mut();
            (0..len)
                .map(|_| {
                    let re = E::Real::from_f64(rng.gen::<f64>() - 0.5);
                    let im = E::Real::from_f64(rng.gen::<f64>() - 0.5);
                    E::from_parts(re, im)
                })
                .collect()
        })
    }

    /// Dense `m×m` column-major product of the blocked reflectors stored in `v` and `t`.
    /// `rowwise` selects the LQ storage, in which case the result is `Q^H`.
    fn accumulate<E: TileScalar>(
        v: TileRef<'_, E>,
        t: TileRef<'_, E>,
        ib: usize,
        rowwise: bool,
    ) -> Vec<E> {
        let (m, n) = (v.nrows(), v.ncols());
        let k = Ord::min(m, n);
        let order = if rowwise { n } else { m };
        let mut q = identity::<E>(order);

        let mut i = 0;
        while i < k {
            let sb = Ord::min(ib, k - i);
            // reflector j of the block as a dense vector
            let reflector = |j: usize| -> Vec<E> {
                let mut out = vec![E::zero(); order];
                out[i + j] = E::one();
                for r in i + j + 1..order {
                    out[r] = if rowwise { v.read(i + j, r).conj() } else { v.read(r, i + j) };
                }
                out
            };
            // H = I - Vb Tb Vb^H
            let mut h = identity::<E>(order);
            for a in 0..sb {
                for b in a..sb {
                    let tab = t.read(a, i + b);
                    if tab.is_zero() {
                        continue;
                    }
                    let (va, vb) = (reflector(a), reflector(b));
                    for c in 0..order {
                        for r in 0..order {
                            h[r + c * order] -= va[r] * tab * vb[c].conj();
                        }
                    }
                }
            }
            q = matmul_dense(&q, &h, order);
            i += sb;
        }
        q
    }

    fn identity<E: TileScalar>(n: usize) -> Vec<E> {
        let mut out = vec![E::zero(); n * n];
        for i in 0..n {
            out[i + i * n] = E::one();
        }
        out
    }

    fn matmul_dense<E: TileScalar>(a: &[E], b: &[E], n: usize) -> Vec<E> {
        let mut out = vec![E::zero(); n * n];
        for j in 0..n {
            for l in 0..n {
                let blj = b[l + j * n];
                for i in 0..n {
                    out[i + j * n] += a[i + l * n] * blj;
                }
            }
        }
        out
    }

    fn check_qr<E: TileScalar>(m: usize, n: usize, ib: usize, tol: f64) {
        let a0 = random::<E>(m * n);
        let k = Ord::min(m, n);
        let mut a = a0.clone();
        let mut t = vec![E::zero(); ib * k];
        let mut tau = vec![E::zero(); k];
        let mut work = vec![E::zero(); geqrt_work_len(ib, m, n)];
        geqrt(
            ib,
            TileMut::from_col_major(&mut a, m, n, m),
            TileMut::from_col_major(&mut t, ib, k, ib),
            &mut tau,
            &mut work,
        )
        .unwrap();

        let q = accumulate(
            TileRef::from_col_major(&a, m, n, m),
            TileRef::from_col_major(&t, ib, k, ib),
            ib,
            false,
        );
        // Q R == A
        for j in 0..n {
            for i in 0..m {
                let mut acc = E::zero();
                for l in 0..=Ord::min(j, m - 1) {
                    acc += q[i + l * m] * a[l + j * m];
                }
                let diff = (acc - a0[i + j * m]).abs().to_f64();
                assert_approx_eq!(diff, 0.0, tol);
            }
        }
        // Q^H Q == I
        for j in 0..m {
            for i in 0..m {
                let mut acc = E::zero();
                for l in 0..m {
                    acc += q[l + i * m].conj() * q[l + j * m];
                }
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_approx_eq!(acc.re().to_f64(), expected, tol);
                assert_approx_eq!(acc.im().to_f64(), 0.0, tol);
            }
        }
    }

    fn check_lq<E: TileScalar>(m: usize, n: usize, ib: usize, tol: f64) {
        let a0 = random::<E>(m * n);
        let k = Ord::min(m, n);
        let mut a = a0.clone();
        let mut t = vec![E::zero(); ib * k];
        let mut tau = vec![E::zero(); k];
        let mut work = vec![E::zero(); gelqt_work_len(ib, m, n)];
        gelqt(
            ib,
            TileMut::from_col_major(&mut a, m, n, m),
            TileMut::from_col_major(&mut t, ib, k, ib),
            &mut tau,
            &mut work,
        )
        .unwrap();

        // A Q^H == L
        let qh = accumulate(
            TileRef::from_col_major(&a, m, n, m),
            TileRef::from_col_major(&t, ib, k, ib),
            ib,
            true,
        );
        for j in 0..n {
            for i in 0..m {
                let mut acc = E::zero();
                for l in 0..n {
                    acc += a0[i + l * m] * qh[l + j * n];
                }
                let expected = if j <= i { a[i + j * m] } else { E::zero() };
                let diff = (acc - expected).abs().to_f64();
                assert_approx_eq!(diff, 0.0, tol);
            }
        }
    }

    #[test]
    fn qr_reconstructs() {
        for (m, n, ib) in [(6, 6, 2), (8, 5, 3), (4, 7, 2), (5, 5, 8), (1, 3, 1)] {
            check_qr::<f64>(m, n, ib, 1e-10);
            check_qr::<c64>(m, n, ib, 1e-10);
        }
        check_qr::<f32>(6, 4, 2, 1e-4);
    }

    #[test]
    fn lq_reconstructs() {
        for (m, n, ib) in [(6, 6, 2), (8, 5, 3), (4, 7, 2), (5, 5, 8), (3, 1, 1)] {
            check_lq::<f64>(m, n, ib, 1e-10);
            check_lq::<c64>(m, n, ib, 1e-10);
        }
    }

    #[test]
    fn qr_matches_unblocked_reflectors() {
        let (m, n, ib) = (6, 4, 2);
        let a0 = random::<c64>(m * n);
        let mut blocked = a0.clone();
        let mut t = vec![c64::new(0.0, 0.0); ib * n];
        let mut tau = vec![c64::new(0.0, 0.0); n];
        let mut work = vec![c64::new(0.0, 0.0); ib * n];
        geqrt(
            ib,
            TileMut::from_col_major(&mut blocked, m, n, m),
            TileMut::from_col_major(&mut t, ib, n, ib),
            &mut tau,
            &mut work,
        )
        .unwrap();

        let mut unblocked = a0.clone();
        let mut tau2 = vec![c64::new(0.0, 0.0); n];
        geqr2(TileMut::from_col_major(&mut unblocked, m, n, m), &mut tau2);

        for (x, y) in blocked.iter().zip(&unblocked) {
            assert_approx_eq!((x - y).norm(), 0.0, 1e-12);
        }
        for (x, y) in tau.iter().zip(&tau2) {
            assert_approx_eq!((x - y).norm(), 0.0, 1e-12);
        }
        // diagonal of T holds tau
        for b in 0..n {
            let x = t[b % ib + b * ib];
            assert_approx_eq!((x - tau[b]).norm(), 0.0, 1e-14);
        }
    }

    #[test]
    fn argument_errors() {
        let mut a = vec![1.0f64; 16];
        let mut t = vec![0.0f64; 16];
        let mut tau = vec![0.0f64; 4];
        let mut work = vec![0.0f64; 16];

        let a_before = a.clone();
        assert_eq!(
            geqrt(
                0,
                TileMut::from_col_major(&mut a, 4, 4, 4),
                TileMut::from_col_major(&mut t, 4, 4, 4),
                &mut tau,
                &mut work
            ),
            Err(TileError::KernelArgument { index: 1 })
        );
        assert_eq!(a, a_before);
        assert_eq!(
            gelqt(
                0,
                TileMut::from_col_major(&mut a, 4, 4, 4),
                TileMut::from_col_major(&mut t, 4, 4, 4),
                &mut tau,
                &mut work
            ),
            Err(TileError::KernelArgument { index: 1 })
        );

        // empty tiles are a no-op, even with ib == 0
        assert!(geqrt(
            0,
            TileMut::from_col_major(&mut a, 0, 4, 4),
            TileMut::from_col_major(&mut t, 4, 4, 4),
            &mut tau,
            &mut work
        )
        .is_ok());

        assert_eq!(
            geqrt(
                2,
                TileMut::from_col_major(&mut a, 4, 4, 4),
                TileMut::from_col_major(&mut t, 1, 4, 4),
                &mut tau,
                &mut work
            ),
            Err(TileError::KernelArgument { index: 3 })
        );
        assert_eq!(
            geqrt(
                2,
                TileMut::from_col_major(&mut a, 4, 4, 4),
                TileMut::from_col_major(&mut t, 2, 4, 4),
                &mut tau[..3],
                &mut work
            ),
            Err(TileError::KernelArgument { index: 4 })
        );
        assert_eq!(
            gelqt(
                2,
                TileMut::from_col_major(&mut a, 4, 4, 4),
                TileMut::from_col_major(&mut t, 2, 4, 4),
                &mut tau,
                &mut work[..7]
            ),
            Err(TileError::KernelArgument { index: 5 })
        );
    }

    #[test]
    fn empty_tiles_leave_every_buffer_untouched() {
        let bits = |x: &[f64]| x.iter().map(|x| x.to_bits()).collect::<Vec<_>>();

        for (m, n, ib) in [(0, 4, 0), (0, 4, 2), (4, 0, 0), (4, 0, 2), (0, 0, 3)] {
            for lq in [false, true] {
                let mut a: Vec<f64> = (0..16).map(|x| x as f64 + 0.25).collect();
                let mut t = vec![-3.5f64; 16];
                let mut tau = vec![7.0f64; 4];
                let mut work = vec![f64::NAN; 16];
                let before = (bits(&a), bits(&t), bits(&tau), bits(&work));

                let a_view = TileMut::from_col_major(&mut a, m, n, 4);
                let t_view = TileMut::from_col_major(&mut t, 4, 4, 4);
                let result = if lq {
                    gelqt(ib, a_view, t_view, &mut tau, &mut work)
                } else {
                    geqrt(ib, a_view, t_view, &mut tau, &mut work)
                };

                assert!(result.is_ok());
                assert_eq!((bits(&a), bits(&t), bits(&tau), bits(&work)), before);
            }
        }
    }
}
