//! Multi-tile algorithms expressed as task graphs.
//!
//! These routines submit one task per tile operation to a [`Region`] and return immediately.
//! They assume that their operands are tiled consistently, which the [`drivers`](crate::drivers)
//! guarantee by construction. Each routine checks the sequence before emitting anything.

use crate::{
    assert,
    desc::Descriptor,
    sched::Region,
    storage::TileMatrix,
    tasks,
    tile::{TileMut, TileRef},
    Diag, Request, Sequence, Side, TileScalar, Transpose, Uplo,
};

#[inline]
fn op_shape(desc: &Descriptor, trans: Transpose) -> (usize, usize) {
    match trans {
        Transpose::NoTrans => (desc.m(), desc.n()),
        _ => (desc.n(), desc.m()),
    }
}

#[inline]
fn op_tiles(desc: &Descriptor, trans: Transpose) -> (usize, usize) {
    match trans {
        Transpose::NoTrans => (desc.mt(), desc.nt()),
        _ => (desc.nt(), desc.mt()),
    }
}

/// Tile `(m, n)` of `op(a)`, as stored.
#[inline]
unsafe fn op_tile<'scope, E: TileScalar>(
    a: &'scope TileMatrix<'_, E>,
    trans: Transpose,
    m: usize,
    n: usize,
) -> TileRef<'scope, E> {
    match trans {
        Transpose::NoTrans => a.view_tile_raw(m, n).into_const(),
        _ => a.view_tile_raw(n, m).into_const(),
    }
}

/// `c := alpha * op(a) * op(b) + beta * c`.
///
/// One task is submitted per triple of output tile and inner tile. Tasks updating the same
/// output tile are ordered by submission, the first one scaling by `beta` and the later ones
/// accumulating. When `alpha` is zero or the inner dimension is empty, a single scaling task is
/// submitted per output tile and `a` and `b` are not read.
///
/// # Panics
///
/// Panics if the shapes of the operands, or their tile grids, do not agree.
pub fn gemm<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    transa: Transpose,
    transb: Transpose,
    alpha: E,
    a: &'scope TileMatrix<'_, E>,
    b: &'scope TileMatrix<'_, E>,
    beta: E,
    c: &'scope TileMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.check(request).is_err() {
        return;
    }
    let cd = c.desc();
    let (am, ak) = op_shape(a.desc(), transa);
    let (bk, bn) = op_shape(b.desc(), transb);
    let (amt, akt) = op_tiles(a.desc(), transa);
    let (bkt, bnt) = op_tiles(b.desc(), transb);
    assert!(all(
        am == cd.m(),
        bn == cd.n(),
        ak == bk,
        amt == cd.mt(),
        bnt == cd.nt(),
        akt == bkt,
    ));

    let empty: &'scope [E] = &[];
    for n in 0..cd.nt() {
        for m in 0..cd.mt() {
            if alpha.is_zero() || ak == 0 {
                let c_tile = unsafe { c.view_tile_raw(m, n) };
                let (rows, cols) = (c_tile.nrows(), c_tile.ncols());
                tasks::gemm(
                    region,
                    Transpose::NoTrans,
                    Transpose::NoTrans,
                    alpha,
                    TileRef::from_col_major(empty, rows, 0, rows),
                    TileRef::from_col_major(empty, 0, cols, 0),
                    beta,
                    c_tile,
                    sequence,
                    request,
                );
                continue;
            }

            for k in 0..akt {
                let (a_tile, b_tile, c_tile) = unsafe {
                    (
                        op_tile(a, transa, m, k),
                        op_tile(b, transb, k, n),
                        c.view_tile_raw(m, n),
                    )
                };
                let zbeta = if k == 0 { beta } else { E::one() };
                tasks::gemm(
                    region, transa, transb, alpha, a_tile, b_tile, zbeta, c_tile, sequence,
                    request,
                );
            }
        }
    }
}

/// `b := alpha * op(a) * b` (`Side::Left`) or `b := alpha * b * op(a)` (`Side::Right`), where
/// `a` is triangular and only its triangle `uplo` is read.
///
/// Tiles of `b` are updated in the order in which the tiles they read are still unchanged: a
/// triangular task on the diagonal tile of `a`, then one accumulating product per
/// off-diagonal tile of the triangle. When `alpha` is zero, `b` is cleared and `a` is not read.
///
/// # Panics
///
/// Panics if `uplo` is [`Uplo::General`], if `a` is not square with square tiles, or if its
/// tile grid does not match the side of `b` it multiplies.
pub fn trmm<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    side: Side,
    uplo: Uplo,
    transa: Transpose,
    diag: Diag,
    alpha: E,
    a: &'scope TileMatrix<'_, E>,
    b: &'scope TileMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.check(request).is_err() {
        return;
    }
    let (ad, bd) = (a.desc(), b.desc());
    let (order, tiles, tile_size) = match side {
        Side::Left => (bd.m(), bd.mt(), bd.mb()),
        Side::Right => (bd.n(), bd.nt(), bd.nb()),
    };
    assert!(all(
        uplo != Uplo::General,
        ad.m() == ad.n(),
        ad.mb() == ad.nb(),
        ad.m() == order,
        ad.mt() == tiles,
        ad.mb() == tile_size,
    ));
    let (mt, nt) = (bd.mt(), bd.nt());

    if alpha.is_zero() {
        for n in 0..nt {
            for m in 0..mt {
                let tile = unsafe { b.view_tile_raw(m, n) };
                let zero = E::zero();
                tasks::laset(region, Uplo::General, zero, zero, tile, 0, sequence, request);
            }
        }
        return;
    }

    // op(a) is upper triangular
    let upper = (uplo == Uplo::Upper) == (transa == Transpose::NoTrans);
    match side {
        Side::Left => {
            for step in 0..mt {
                let m = if upper { step } else { mt - 1 - step };
                let ks = if upper { m + 1..mt } else { 0..m };
                for n in 0..nt {
                    let (a_mm, b_mn) =
                        unsafe { (a.view_tile_raw(m, m).into_const(), b.view_tile_raw(m, n)) };
                    tasks::trmm(
                        region, side, uplo, transa, diag, alpha, a_mm, b_mn, sequence, request,
                    );
                    for k in ks.clone() {
                        let (a_mk, b_kn, b_mn) = unsafe {
                            (
                                op_tile(a, transa, m, k),
                                b.view_tile_raw(k, n).into_const(),
                                b.view_tile_raw(m, n),
                            )
                        };
                        tasks::gemm(
                            region,
                            transa,
                            Transpose::NoTrans,
                            alpha,
                            a_mk,
                            b_kn,
                            E::one(),
                            b_mn,
                            sequence,
                            request,
                        );
                    }
                }
            }
        }
        Side::Right => {
            for step in 0..nt {
                let n = if upper { nt - 1 - step } else { step };
                let ks = if upper { 0..n } else { n + 1..nt };
                for m in 0..mt {
                    let (a_nn, b_mn) =
                        unsafe { (a.view_tile_raw(n, n).into_const(), b.view_tile_raw(m, n)) };
                    tasks::trmm(
                        region, side, uplo, transa, diag, alpha, a_nn, b_mn, sequence, request,
                    );
                    for k in ks.clone() {
                        let (b_mk, a_kn, b_mn) = unsafe {
                            (
                                b.view_tile_raw(m, k).into_const(),
                                op_tile(a, transa, k, n),
                                b.view_tile_raw(m, n),
                            )
                        };
                        tasks::gemm(
                            region,
                            Transpose::NoTrans,
                            transa,
                            alpha,
                            b_mk,
                            a_kn,
                            E::one(),
                            b_mn,
                            sequence,
                            request,
                        );
                    }
                }
            }
        }
    }
}

/// `c := alpha * op(a) * op(b)^T + alpha * op(b) * op(a)^T + beta * c` on the triangle `uplo` of
/// the symmetric matrix `c`, with `trans` either `NoTrans` or `Trans`.
///
/// Off-diagonal tiles of the triangle receive two products per inner tile, diagonal tiles one
/// rank-2k task per inner tile. As in [`gemm`], the first inner tile scales by `beta` and the
/// later ones accumulate. Tiles outside the triangle are not touched.
///
/// # Panics
///
/// Panics if `uplo` is [`Uplo::General`], if `trans` is [`Transpose::ConjTrans`], or if the
/// shapes or tile grids of the operands do not agree.
pub fn syr2k<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    uplo: Uplo,
    trans: Transpose,
    alpha: E,
    a: &'scope TileMatrix<'_, E>,
    b: &'scope TileMatrix<'_, E>,
    beta: E,
    c: &'scope TileMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.check(request).is_err() {
        return;
    }
    let cd = c.desc();
    let (an, ak) = op_shape(a.desc(), trans);
    let (ant, akt) = op_tiles(a.desc(), trans);
    assert!(all(
        uplo != Uplo::General,
        trans != Transpose::ConjTrans,
        cd.m() == cd.n(),
        cd.mb() == cd.nb(),
        an == cd.m(),
        ant == cd.mt(),
        b.desc().m() == a.desc().m(),
        b.desc().n() == a.desc().n(),
        b.desc().mt() == a.desc().mt(),
        b.desc().nt() == a.desc().nt(),
    ));
    // second factor of each off-diagonal product
    let trans_t = match trans {
        Transpose::NoTrans => Transpose::Trans,
        _ => Transpose::NoTrans,
    };

    let empty: &'scope [E] = &[];
    let nt = cd.nt();
    for n in 0..nt {
        let rows = match uplo {
            Uplo::Upper => 0..n + 1,
            _ => n..nt,
        };
        for m in rows {
            if alpha.is_zero() || ak == 0 {
                let c_tile = unsafe { c.view_tile_raw(m, n) };
                let (rows, cols) = (c_tile.nrows(), c_tile.ncols());
                if m == n {
                    let none = TileRef::from_col_major(empty, rows, 0, rows);
                    tasks::syr2k(
                        region,
                        uplo,
                        Transpose::NoTrans,
                        alpha,
                        none,
                        none,
                        beta,
                        c_tile,
                        sequence,
                        request,
                    );
                } else {
                    tasks::gemm(
                        region,
                        Transpose::NoTrans,
                        Transpose::NoTrans,
                        alpha,
                        TileRef::from_col_major(empty, rows, 0, rows),
                        TileRef::from_col_major(empty, 0, cols, 0),
                        beta,
                        c_tile,
                        sequence,
                        request,
                    );
                }
                continue;
            }

            for k in 0..akt {
                let zbeta = if k == 0 { beta } else { E::one() };
                let (a_mk, b_nk, b_mk, a_nk, c_mn) = unsafe {
                    (
                        op_tile(a, trans, m, k),
                        op_tile(b, trans, n, k),
                        op_tile(b, trans, m, k),
                        op_tile(a, trans, n, k),
                        c.view_tile_raw(m, n),
                    )
                };
                if m == n {
                    tasks::syr2k(
                        region, uplo, trans, alpha, a_mk, b_mk, zbeta, c_mn, sequence, request,
                    );
                } else {
                    tasks::gemm(
                        region, trans, trans_t, alpha, a_mk, b_nk, zbeta, c_mn, sequence, request,
                    );
                    let c_mn = unsafe { c.view_tile_raw(m, n) };
                    tasks::gemm(
                        region, trans, trans_t, alpha, b_mk, a_nk, E::one(), c_mn, sequence,
                        request,
                    );
                }
            }
        }
    }
}

/// Sets the triangle `uplo` of the view `a` to `alpha` off the diagonal and `beta` on it.
///
/// The diagonal is the one of the view, located in each tile from the tile's position in the
/// view. Tiles entirely outside the triangle are skipped.
pub fn laset<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    uplo: Uplo,
    alpha: E,
    beta: E,
    a: &'scope TileMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.check(request).is_err() {
        return;
    }
    let desc = a.desc();
    for n in 0..desc.nt() {
        for m in 0..desc.mt() {
            let offset = desc.view_row_start(m) as isize - desc.view_col_start(n) as isize;
            let (rows, cols) = (desc.tile_mview(m) as isize, desc.tile_nview(n) as isize);
            let touched = match uplo {
                Uplo::General => true,
                Uplo::Upper => offset < cols,
                Uplo::Lower => offset > -rows,
            };
            if touched {
                let tile = unsafe { a.view_tile_raw(m, n) };
                tasks::laset(region, uplo, alpha, beta, tile, offset, sequence, request);
            }
        }
    }
}

/// Number of reals needed by [`lansy_frobenius`] for its partial sums.
pub fn lansy_work_len(desc: &Descriptor) -> usize {
    let nt = desc.nt();
    nt * (nt + 1)
}

/// Frobenius norm of the symmetric matrix whose triangle `uplo` is stored in `a`, written to
/// `value`.
///
/// One task computes the scaled sum of squares of each tile of the triangle into its own slot
/// of `work`, and a final task combines the slots, counting off-diagonal tiles twice.
///
/// # Panics
///
/// Panics if `uplo` is [`Uplo::General`], if the view is not square with its diagonal on the
/// tile diagonal, or if `work` is shorter than [`lansy_work_len`].
pub fn lansy_frobenius<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    uplo: Uplo,
    a: &'scope TileMatrix<'_, E>,
    work: &'scope mut [E::Real],
    value: &'scope mut E::Real,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.check(request).is_err() {
        return;
    }
    let desc = a.desc();
    let nt = desc.nt();
    assert!(all(
        uplo != Uplo::General,
        desc.m() == desc.n(),
        desc.mb() == desc.nb(),
        desc.i() % desc.mb() == desc.j() % desc.nb(),
        work.len() >= lansy_work_len(desc),
    ));

    let noff = nt * nt.saturating_sub(1) / 2;
    let slots = work.as_mut_ptr();
    let slot = |k: usize| unsafe {
        TileMut::<E::Real>::from_raw_parts(slots.add(2 * k), 2, 1, 1, 2)
    };

    let mut next = 0;
    for n in 0..nt {
        let rows = match uplo {
            Uplo::Upper => 0..n,
            _ => n + 1..nt,
        };
        for m in rows {
            let tile = unsafe { a.view_tile_raw(m, n).into_const() };
            tasks::gessq(region, tile, slot(next), sequence, request);
            next += 1;
        }
    }
    for n in 0..nt {
        let tile = unsafe { a.view_tile_raw(n, n).into_const() };
        tasks::syssq(region, uplo, tile, slot(noff + n), sequence, request);
    }

    let (offdiag, diag) = unsafe {
        (
            TileRef::<E::Real>::from_raw_parts(slots, 2, noff, 1, 2),
            TileRef::<E::Real>::from_raw_parts(slots.add(2 * noff), 2, nt, 1, 2),
        )
    };
    tasks::ssq_combine(region, offdiag, diag, value, sequence);
}
