//! Elementary reflectors and their blocked application.
//!
//! A reflector is `H = I - tau * v * v^H` with `v[0] == 1`. Blocks of `k` reflectors are
//! accumulated in the compact WY form `H_1 * ... * H_k = I - V * T * V^H`, with `T` upper
//! triangular. For row-stored reflectors, row `i` of `V` holds `v_i^H`, and the block reads
//! `I - V^H * T * V`.

use super::{matmul, norm::SumSquares};
use crate::{
    tile::{TileMut, TileRef},
    RealScalar, TileScalar,
};
use reborrow::*;

/// Euclidean norm of a vector view.
fn norm2<E: TileScalar>(x: TileRef<'_, E>) -> E::Real {
    let mut ssq = SumSquares::<E::Real>::new();
    for j in 0..x.ncols() {
        for i in 0..x.nrows() {
            ssq.push(x.read(i, j).abs(), E::Real::one());
        }
    }
    ssq.value()
}

/// Generates a reflector `H` such that `H^H * [alpha; x] = [beta; 0]` with `beta` real.
///
/// `x` is overwritten with `v[1..]`. Returns `(tau, beta)`; `tau == 0` means `H == I`.
pub(crate) fn larfg<E: TileScalar>(alpha: E, mut x: TileMut<'_, E>) -> (E, E) {
    let zero = E::Real::zero();
    let one = E::Real::one();
    let mut xnorm = norm2(x.rb());
    if xnorm == zero && alpha.im() == zero {
        return (E::zero(), alpha);
    }

    let mut alpha = alpha;
    let mut beta = signed_norm(alpha, xnorm);

    // |beta| may be subnormal, in which case 1 / (alpha - beta) overflows
    let safmin = E::Real::safe_min();
    let rsafmn = one / safmin;
    let mut knt = 0;
    if beta.abs() < safmin {
        while beta.abs() < safmin && knt < 20 {
            knt += 1;
            scale(x.rb_mut(), E::from_real(rsafmn));
            beta = beta * rsafmn;
            alpha = alpha.scale_real(rsafmn);
        }
        xnorm = norm2(x.rb());
        beta = signed_norm(alpha, xnorm);
    }

    let tau = E::from_parts((beta - alpha.re()) / beta, -alpha.im() / beta);
    scale(x.rb_mut(), E::one() / (alpha - E::from_real(beta)));
    for _ in 0..knt {
        beta = beta * safmin;
    }
    (tau, E::from_real(beta))
}

/// `-sign(re(alpha)) * |[alpha; x]|`, given `xnorm = |x|`.
#[inline]
fn signed_norm<E: TileScalar>(alpha: E, xnorm: E::Real) -> E::Real {
    let r = alpha.re().hypot(alpha.im()).hypot(xnorm);
    if alpha.re() >= E::Real::zero() {
        -r
    } else {
        r
    }
}

fn scale<E: TileScalar>(mut x: TileMut<'_, E>, factor: E) {
    for j in 0..x.ncols() {
        for i in 0..x.nrows() {
            x.write(i, j, x.read(i, j) * factor);
        }
    }
}

/// Unblocked QR factorization of a panel. Reflector `i` is stored below the diagonal of
/// column `i`, and `R` on and above the diagonal.
pub(crate) fn geqr2<E: TileScalar>(mut a: TileMut<'_, E>, tau: &mut [E]) {
    let (m, n) = (a.nrows(), a.ncols());
    let k = Ord::min(m, n);
    for i in 0..k {
        let alpha = a.read(i, i);
        let (tau_i, beta) = larfg(alpha, a.rb_mut().submatrix_mut(i + 1, i, m - i - 1, 1));
        tau[i] = tau_i;

        if i + 1 < n {
            a.write(i, i, E::one());
            let (v, c) = a
                .rb_mut()
                .submatrix_mut(i, i, m - i, n - i)
                .split_at_col_mut(1);
            // H^H from the left
            reflect_left(tau_i.conj(), v.into_const(), c);
        }
        a.write(i, i, beta);
    }
}

/// Unblocked LQ factorization of a panel. Row `i` right of the diagonal stores `v_i^H`, and
/// `L` on and below the diagonal.
pub(crate) fn gelq2<E: TileScalar>(mut a: TileMut<'_, E>, tau: &mut [E]) {
    let (m, n) = (a.nrows(), a.ncols());
    let k = Ord::min(m, n);
    for i in 0..k {
        conjugate(a.rb_mut().submatrix_mut(i, i, 1, n - i));
        let alpha = a.read(i, i);
        let (tau_i, beta) = larfg(
            alpha,
            a.rb_mut()
                .submatrix_mut(i, i + 1, 1, n - i - 1)
                .transpose_mut(),
        );
        tau[i] = tau_i;

        if i + 1 < m {
            a.write(i, i, E::one());
            let (v, c) = a
                .rb_mut()
                .submatrix_mut(i, i, m - i, n - i)
                .split_at_row_mut(1);
            reflect_right(tau_i, v.into_const(), c);
        }
        a.write(i, i, beta);
        conjugate(a.rb_mut().submatrix_mut(i, i, 1, n - i));
    }
}

fn conjugate<E: TileScalar>(mut x: TileMut<'_, E>) {
    for j in 0..x.ncols() {
        for i in 0..x.nrows() {
            x.write(i, j, x.read(i, j).conj());
        }
    }
}

/// `c := (I - tau * v * v^H) * c`, for a column `v`.
fn reflect_left<E: TileScalar>(tau: E, v: TileRef<'_, E>, mut c: TileMut<'_, E>) {
    for j in 0..c.ncols() {
        let mut w = E::zero();
        for r in 0..c.nrows() {
            w += v.read(r, 0).conj() * c.read(r, j);
        }
        let w = tau * w;
        for r in 0..c.nrows() {
            c.write(r, j, c.read(r, j) - v.read(r, 0) * w);
        }
    }
}

/// `c := c * (I - tau * v * v^H)`, for a row `v`.
fn reflect_right<E: TileScalar>(tau: E, v: TileRef<'_, E>, mut c: TileMut<'_, E>) {
    for r in 0..c.nrows() {
        let mut w = E::zero();
        for j in 0..c.ncols() {
            w += c.read(r, j) * v.read(0, j);
        }
        let w = tau * w;
        for j in 0..c.ncols() {
            c.write(r, j, c.read(r, j) - w * v.read(0, j).conj());
        }
    }
}

/// Forms the triangular factor of a block of column-stored reflectors.
pub(crate) fn larft_columnwise<E: TileScalar>(v: TileRef<'_, E>, tau: &[E], mut t: TileMut<'_, E>) {
    let (mv, k) = (v.nrows(), v.ncols());
    for i in 0..k {
        let tau_i = tau[i];
        if tau_i.is_zero() {
            for j in 0..=i {
                t.write(j, i, E::zero());
            }
            continue;
        }
        for j in 0..i {
            let mut s = v.read(i, j).conj();
            for r in i + 1..mv {
                s += v.read(r, j).conj() * v.read(r, i);
            }
            t.write(j, i, -tau_i * s);
        }
        triangular_update(t.rb_mut(), i);
        t.write(i, i, tau_i);
    }
}

/// Forms the triangular factor of a block of row-stored reflectors.
pub(crate) fn larft_rowwise<E: TileScalar>(v: TileRef<'_, E>, tau: &[E], mut t: TileMut<'_, E>) {
    let (k, nv) = (v.nrows(), v.ncols());
    for i in 0..k {
        let tau_i = tau[i];
        if tau_i.is_zero() {
            for j in 0..=i {
                t.write(j, i, E::zero());
            }
            continue;
        }
        for j in 0..i {
            let mut s = v.read(j, i);
            for c in i + 1..nv {
                s += v.read(j, c) * v.read(i, c).conj();
            }
            t.write(j, i, -tau_i * s);
        }
        triangular_update(t.rb_mut(), i);
        t.write(i, i, tau_i);
    }
}

/// `t[..i, i] := t[..i, ..i] * t[..i, i]`.
fn triangular_update<E: TileScalar>(mut t: TileMut<'_, E>, i: usize) {
    for j in 0..i {
        let mut s = E::zero();
        for l in j..i {
            s += t.read(j, l) * t.read(l, i);
        }
        t.write(j, i, s);
    }
}

/// `c := (I - V * T * V^H)^H * c` for column-stored reflectors. `work` holds at least
/// `k * c.ncols()` elements.
pub(crate) fn larfb_left_conj_trans<E: TileScalar>(
    v: TileRef<'_, E>,
    t: TileRef<'_, E>,
    mut c: TileMut<'_, E>,
    work: &mut [E],
) {
    let (mv, k, nc) = (v.nrows(), v.ncols(), c.ncols());
    if k == 0 || nc == 0 {
        return;
    }
    let mut w = TileMut::from_col_major(&mut work[..k * nc], k, nc, k);
    let v2 = v.submatrix(k, 0, mv - k, k);

    // W := V^H C
    for col in 0..nc {
        for j in 0..k {
            let mut s = c.read(j, col);
            for r in j + 1..k {
                s += v.read(r, j).conj() * c.read(r, col);
            }
            w.write(j, col, s);
        }
    }
    if mv > k {
        matmul(
            w.rb_mut(),
            Some(E::one()),
            v2.transpose(),
            true,
            c.rb().submatrix(k, 0, mv - k, nc),
            false,
            E::one(),
        );
    }

    // W := T^H W
    for col in 0..nc {
        for i in (0..k).rev() {
            let mut s = E::zero();
            for j in 0..=i {
                s += t.read(j, i).conj() * w.read(j, col);
            }
            w.write(i, col, s);
        }
    }

    // C := C - V W
    if mv > k {
        matmul(
            c.rb_mut().submatrix_mut(k, 0, mv - k, nc),
            Some(E::one()),
            v2,
            false,
            w.rb(),
            false,
            -E::one(),
        );
    }
    for col in 0..nc {
        for r in 0..k {
            let mut s = w.read(r, col);
            for j in 0..r {
                s += v.read(r, j) * w.read(j, col);
            }
            c.write(r, col, c.read(r, col) - s);
        }
    }
}

/// `c := c * (I - V^H * T * V)` for row-stored reflectors. `work` holds at least
/// `c.nrows() * k` elements.
pub(crate) fn larfb_right_no_trans<E: TileScalar>(
    v: TileRef<'_, E>,
    t: TileRef<'_, E>,
    mut c: TileMut<'_, E>,
    work: &mut [E],
) {
    let (k, nv, mc) = (v.nrows(), v.ncols(), c.nrows());
    if k == 0 || mc == 0 {
        return;
    }
    let mut w = TileMut::from_col_major(&mut work[..mc * k], mc, k, mc);
    let v2 = v.submatrix(0, k, k, nv - k);

    // W := C V^H
    for j in 0..k {
        for r in 0..mc {
            let mut s = c.read(r, j);
            for col in j + 1..k {
                s += c.read(r, col) * v.read(j, col).conj();
            }
            w.write(r, j, s);
        }
    }
    if nv > k {
        matmul(
            w.rb_mut(),
            Some(E::one()),
            c.rb().submatrix(0, k, mc, nv - k),
            false,
            v2.transpose(),
            true,
            E::one(),
        );
    }

    // W := W T
    for r in 0..mc {
        for j in (0..k).rev() {
            let mut s = E::zero();
            for l in 0..=j {
                s += w.read(r, l) * t.read(l, j);
            }
            w.write(r, j, s);
        }
    }

    // C := C - W V
    if nv > k {
        matmul(
            c.rb_mut().submatrix_mut(0, k, mc, nv - k),
            Some(E::one()),
            w.rb(),
            false,
            v2,
            false,
            -E::one(),
        );
    }
    for col in 0..k {
        for r in 0..mc {
            let mut s = w.read(r, col);
            for j in 0..col {
                s += w.read(r, j) * v.read(j, col);
            }
            c.write(r, col, c.read(r, col) - s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c64;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn reflector_annihilates_the_tail() {
        let x0 = [c64::new(1.0, 2.0), c64::new(-0.5, 0.25), c64::new(3.0, -1.0)];
        let mut x = x0[1..].to_vec();
        let (tau, beta) = larfg(x0[0], TileMut::from_col_major(&mut x, 2, 1, 2));
        assert_approx_eq!(beta.im, 0.0);

        // H^H [alpha; x] = [beta; 0]
        let v = [c64::new(1.0, 0.0), x[0], x[1]];
        let mut y = x0.to_vec();
        reflect_left(
            tau.conj(),
            TileRef::from_col_major(&v, 3, 1, 3),
            TileMut::from_col_major(&mut y, 3, 1, 3),
        );
        assert_approx_eq!(y[0].re, beta.re, 1e-12);
        assert_approx_eq!(y[0].im, 0.0, 1e-12);
        for y in &y[1..] {
            assert_approx_eq!(y.norm(), 0.0, 1e-12);
        }
    }

    #[test]
    fn subnormal_columns_are_rescaled() {
        let mut x = [4e-310f64];
        let (tau, beta) = larfg(3e-310, TileMut::from_col_major(&mut x, 1, 1, 1));
        assert!(x[0].is_finite());
        assert_approx_eq!(x[0], 0.5, 1e-10);
        assert_approx_eq!(tau, 1.6, 1e-10);
        assert_approx_eq!(beta / 5e-310, -1.0, 1e-10);
    }

    #[test]
    fn zero_tail_gives_identity() {
        let mut x = [0.0f64; 3];
        let (tau, beta) = larfg(-2.0, TileMut::from_col_major(&mut x, 3, 1, 3));
        assert_eq!((tau, beta), (0.0, -2.0));
    }
}
