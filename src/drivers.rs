//! Synchronous entry points on column-major matrices.
//!
//! Each driver validates its arguments, tiles its operands with the context's tile size, runs
//! the translation and computation stages in a single scheduling region, and returns the status
//! of the sequence once the region has joined.

use crate::{
    compute,
    desc::Descriptor,
    storage::{NaturalMatrix, TileMatrix},
    tasks, translate, Context, Diag, Request, Result, Sequence, Side, TileError, TileScalar,
    Transpose, Uplo,
};
use dyn_stack::StackReq;

/// Zeroed tiled buffer for `desc`.
fn tile_buffer<E: TileScalar>(desc: &Descriptor) -> Result<Vec<E>> {
    let len = desc.storage_len();
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| TileError::OutOfMemory {
            bytes: len.saturating_mul(core::mem::size_of::<E>()),
        })?;
    buf.resize(len, E::zero());
    Ok(buf)
}

fn dense_desc<E: TileScalar>(ctx: &Context, m: usize, n: usize) -> Result<Descriptor> {
    let nb = ctx.tile_size();
    Descriptor::general(E::PRECISION, nb, nb, m, n, 0, 0, m, n)
}

/// Status of a driver: the first failure recorded in the sequence, otherwise the result of the
/// submission stage.
#[inline]
fn finish(sequence: &Sequence, submitted: Result<()>) -> Result<()> {
    sequence.status()?;
    submitted
}

#[inline]
fn op_dims(trans: Transpose, m: usize, n: usize) -> (usize, usize) {
    match trans {
        Transpose::NoTrans => (m, n),
        _ => (n, m),
    }
}

/// `c := alpha * op(a) * op(b) + beta * c`, where `op(a)` is `m×k`, `op(b)` is `k×n` and `c` is
/// `m×n`.
///
/// # Errors
///
/// - [`TileError::Config`] when a leading dimension or a buffer is too small.
/// - Any failure recorded by the tasks.
pub fn gemm<E: TileScalar>(
    ctx: &Context,
    transa: Transpose,
    transb: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: E,
    a: &[E],
    lda: usize,
    b: &[E],
    ldb: usize,
    beta: E,
    c: &mut [E],
    ldc: usize,
) -> Result<()> {
    let (am, an) = op_dims(transa, m, k);
    let (bm, bn) = op_dims(transb, k, n);

    // the natural inputs are only read, through private copies
    let mut a_copy = a.to_vec();
    let mut b_copy = b.to_vec();
    let a_nat = NaturalMatrix::new(&mut a_copy, am, an, lda)?;
    let b_nat = NaturalMatrix::new(&mut b_copy, bm, bn, ldb)?;
    let c_nat = NaturalMatrix::new(c, m, n, ldc)?;

    if m == 0 || n == 0 || ((alpha.is_zero() || k == 0) && beta == E::one()) {
        return Ok(());
    }

    let (a_desc, b_desc, c_desc) = (
        dense_desc::<E>(ctx, am, an)?,
        dense_desc::<E>(ctx, bm, bn)?,
        dense_desc::<E>(ctx, m, n)?,
    );
    let mut a_buf = tile_buffer::<E>(&a_desc)?;
    let mut b_buf = tile_buffer::<E>(&b_desc)?;
    let mut c_buf = tile_buffer::<E>(&c_desc)?;
    let a_tiles = TileMatrix::new(a_desc, &mut a_buf)?;
    let b_tiles = TileMatrix::new(b_desc, &mut b_buf)?;
    let c_tiles = TileMatrix::new(c_desc, &mut c_buf)?;

    let sequence = Sequence::new();
    let request = Request::new();
    let submitted = ctx.region(StackReq::empty(), |region| -> Result<()> {
        translate::ge_to_tiles_async(region, &a_nat, &a_tiles, &sequence, &request)?;
        translate::ge_to_tiles_async(region, &b_nat, &b_tiles, &sequence, &request)?;
        if !beta.is_zero() {
            translate::ge_to_tiles_async(region, &c_nat, &c_tiles, &sequence, &request)?;
        }
        compute::gemm(
            region, transa, transb, alpha, &a_tiles, &b_tiles, beta, &c_tiles, &sequence,
            &request,
        );
        translate::tiles_to_ge_async(region, &c_tiles, &c_nat, &sequence, &request)
    })?;
    finish(&sequence, submitted)
}

/// `b := alpha * op(a) * b` (`Side::Left`) or `b := alpha * b * op(a)` (`Side::Right`), where
/// `b` is `m×n` and `a` is triangular of order `m` or `n`. Only the triangle `uplo` of `a` is
/// read, and its diagonal is taken to be one for [`Diag::Unit`].
///
/// # Errors
///
/// - [`TileError::Config`] when `uplo` is [`Uplo::General`], or when a leading dimension or a
///   buffer is too small.
/// - Any failure recorded by the tasks.
pub fn trmm<E: TileScalar>(
    ctx: &Context,
    side: Side,
    uplo: Uplo,
    transa: Transpose,
    diag: Diag,
    m: usize,
    n: usize,
    alpha: E,
    a: &[E],
    lda: usize,
    b: &mut [E],
    ldb: usize,
) -> Result<()> {
    if uplo == Uplo::General {
        return Err(TileError::config(
            "triangular product needs the stored triangle, not the whole matrix",
        ));
    }
    let order = match side {
        Side::Left => m,
        Side::Right => n,
    };
    let mut a_copy = a.to_vec();
    let a_nat = NaturalMatrix::new(&mut a_copy, order, order, lda)?;
    let b_nat = NaturalMatrix::new(b, m, n, ldb)?;
    if m == 0 || n == 0 {
        return Ok(());
    }

    let (a_desc, b_desc) = (
        dense_desc::<E>(ctx, order, order)?,
        dense_desc::<E>(ctx, m, n)?,
    );
    let mut a_buf = tile_buffer::<E>(&a_desc)?;
    let mut b_buf = tile_buffer::<E>(&b_desc)?;
    let a_tiles = TileMatrix::new(a_desc, &mut a_buf)?;
    let b_tiles = TileMatrix::new(b_desc, &mut b_buf)?;

    let sequence = Sequence::new();
    let request = Request::new();
    let submitted = ctx.region(StackReq::empty(), |region| -> Result<()> {
        if !alpha.is_zero() {
            translate::ge_to_tiles_async(region, &a_nat, &a_tiles, &sequence, &request)?;
            translate::ge_to_tiles_async(region, &b_nat, &b_tiles, &sequence, &request)?;
        }
        compute::trmm(
            region, side, uplo, transa, diag, alpha, &a_tiles, &b_tiles, &sequence, &request,
        );
        translate::tiles_to_ge_async(region, &b_tiles, &b_nat, &sequence, &request)
    })?;
    finish(&sequence, submitted)
}

/// Symmetric rank-2k update of the triangle `uplo` of the `n×n` matrix `c`:
/// `c := alpha * op(a) * op(b)^T + alpha * op(b) * op(a)^T + beta * c`, where `op(a)` and
/// `op(b)` are `n×k`. The other triangle of `c` is left unchanged.
///
/// # Errors
///
/// - [`TileError::Config`] when `uplo` is [`Uplo::General`], when `trans` is
///   [`Transpose::ConjTrans`], or when a leading dimension or a buffer is too small.
/// - Any failure recorded by the tasks.
pub fn syr2k<E: TileScalar>(
    ctx: &Context,
    uplo: Uplo,
    trans: Transpose,
    n: usize,
    k: usize,
    alpha: E,
    a: &[E],
    lda: usize,
    b: &[E],
    ldb: usize,
    beta: E,
    c: &mut [E],
    ldc: usize,
) -> Result<()> {
    if uplo == Uplo::General {
        return Err(TileError::config(
            "symmetric update needs the stored triangle, not the whole matrix",
        ));
    }
    if trans == Transpose::ConjTrans {
        return Err(TileError::config(
            "symmetric update takes no conjugate transpose",
        ));
    }
    let (am, an) = op_dims(trans, n, k);
    let mut a_copy = a.to_vec();
    let mut b_copy = b.to_vec();
    let a_nat = NaturalMatrix::new(&mut a_copy, am, an, lda)?;
    let b_nat = NaturalMatrix::new(&mut b_copy, am, an, ldb)?;
    let c_nat = NaturalMatrix::new(c, n, n, ldc)?;

    if n == 0 || ((alpha.is_zero() || k == 0) && beta == E::one()) {
        return Ok(());
    }

    let (a_desc, c_desc) = (dense_desc::<E>(ctx, am, an)?, dense_desc::<E>(ctx, n, n)?);
    let mut a_buf = tile_buffer::<E>(&a_desc)?;
    let mut b_buf = tile_buffer::<E>(&a_desc)?;
    let mut c_buf = tile_buffer::<E>(&c_desc)?;
    let a_tiles = TileMatrix::new(a_desc, &mut a_buf)?;
    let b_tiles = TileMatrix::new(a_desc, &mut b_buf)?;
    let c_tiles = TileMatrix::new(c_desc, &mut c_buf)?;

    let sequence = Sequence::new();
    let request = Request::new();
    let submitted = ctx.region(StackReq::empty(), |region| -> Result<()> {
        translate::ge_to_tiles_async(region, &a_nat, &a_tiles, &sequence, &request)?;
        translate::ge_to_tiles_async(region, &b_nat, &b_tiles, &sequence, &request)?;
        // the other triangle goes back out unchanged
        translate::ge_to_tiles_async(region, &c_nat, &c_tiles, &sequence, &request)?;
        compute::syr2k(
            region, uplo, trans, alpha, &a_tiles, &b_tiles, beta, &c_tiles, &sequence, &request,
        );
        translate::tiles_to_ge_async(region, &c_tiles, &c_nat, &sequence, &request)
    })?;
    finish(&sequence, submitted)
}

/// Sets the triangle `uplo` of the `m×n` matrix `a` to `alpha` off the diagonal and `beta` on
/// it.
pub fn laset<E: TileScalar>(
    ctx: &Context,
    uplo: Uplo,
    m: usize,
    n: usize,
    alpha: E,
    beta: E,
    a: &mut [E],
    lda: usize,
) -> Result<()> {
    let a_nat = NaturalMatrix::new(a, m, n, lda)?;
    if m == 0 || n == 0 {
        return Ok(());
    }

    let desc = dense_desc::<E>(ctx, m, n)?;
    let mut buf = tile_buffer::<E>(&desc)?;
    let tiles = TileMatrix::new(desc, &mut buf)?;

    let sequence = Sequence::new();
    let request = Request::new();
    let submitted = ctx.region(StackReq::empty(), |region| -> Result<()> {
        if uplo != Uplo::General {
            translate::ge_to_tiles_async(region, &a_nat, &tiles, &sequence, &request)?;
        }
        compute::laset(region, uplo, alpha, beta, &tiles, &sequence, &request);
        translate::tiles_to_ge_async(region, &tiles, &a_nat, &sequence, &request)
    })?;
    finish(&sequence, submitted)
}

/// Frobenius norm of the `n×n` symmetric matrix whose triangle `uplo` is stored in `a`. The other
/// triangle is not read.
///
/// # Errors
///
/// - [`TileError::Config`] when `uplo` is [`Uplo::General`], or when `lda` or `a` is too small.
pub fn lansy_frobenius<E: TileScalar>(
    ctx: &Context,
    uplo: Uplo,
    n: usize,
    a: &[E],
    lda: usize,
) -> Result<E::Real> {
    if uplo == Uplo::General {
        return Err(TileError::config(
            "symmetric norm needs the stored triangle, not the whole matrix",
        ));
    }
    let mut a_copy = a.to_vec();
    let a_nat = NaturalMatrix::new(&mut a_copy, n, n, lda)?;
    if n == 0 {
        return Ok(E::Real::zero());
    }

    let desc = dense_desc::<E>(ctx, n, n)?;
    let mut buf = tile_buffer::<E>(&desc)?;
    let tiles = TileMatrix::new(desc, &mut buf)?;
    let mut work = vec![E::Real::zero(); compute::lansy_work_len(&desc)];
    let mut value = E::Real::zero();

    let sequence = Sequence::new();
    let request = Request::new();
    let work = &mut work[..];
    let value_ref = &mut value;
    let submitted = ctx.region(StackReq::empty(), |region| -> Result<()> {
        translate::ge_to_tiles_async(region, &a_nat, &tiles, &sequence, &request)?;
        compute::lansy_frobenius(region, uplo, &tiles, work, value_ref, &sequence, &request);
        Ok(())
    })?;
    finish(&sequence, submitted)?;
    Ok(value)
}

/// Tiles factored independently, with the block reflector factors of every tile.
#[derive(Debug, Clone)]
pub struct TileFactors<E> {
    /// Layout of `tiles`.
    pub desc: Descriptor,
    /// Factored tiles: the reflectors below (QR) or right of (LQ) the diagonal, and the triangular
    /// factor on and above (QR) or below (LQ) it.
    pub tiles: Vec<E>,
    /// Layout of `t`, one `ib×nb` tile per tile of `tiles`.
    pub t_desc: Descriptor,
    /// Triangular block reflector factors.
    pub t: Vec<E>,
}

impl<E: TileScalar> TileFactors<E> {
    /// Views of the factored tiles and of the reflector factors.
    pub fn matrices(&mut self) -> Result<(TileMatrix<'_, E>, TileMatrix<'_, E>)> {
        Ok((
            TileMatrix::new(self.desc, &mut self.tiles)?,
            TileMatrix::new(self.t_desc, &mut self.t)?,
        ))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Panel {
    Qr,
    Lq,
}

fn factor_tiles<E: TileScalar>(
    ctx: &Context,
    panel: Panel,
    m: usize,
    n: usize,
    a: &[E],
    lda: usize,
) -> Result<TileFactors<E>> {
    let mut a_copy = a.to_vec();
    let a_nat = NaturalMatrix::new(&mut a_copy, m, n, lda)?;

    let nb = ctx.tile_size();
    let ib = ctx.inner_block();
    let desc = dense_desc::<E>(ctx, m, n)?;
    let t_desc = Descriptor::householder_factor(E::PRECISION, ib, nb, desc.mt(), desc.nt())?;
    let mut tiles = tile_buffer::<E>(&desc)?;
    let mut t = tile_buffer::<E>(&t_desc)?;
    if m == 0 || n == 0 {
        return Ok(TileFactors {
            desc,
            tiles,
            t_desc,
            t,
        });
    }

    let workspace = match panel {
        Panel::Qr => tasks::geqrt_req::<E>(ib, nb, nb)?,
        Panel::Lq => tasks::gelqt_req::<E>(ib, nb, nb)?,
    };

    let sequence = Sequence::new();
    let request = Request::new();
    let submitted = {
        let a_tiles = TileMatrix::new(desc, &mut tiles)?;
        let t_tiles = TileMatrix::new(t_desc, &mut t)?;
        let (a_tiles, t_tiles) = (&a_tiles, &t_tiles);
        ctx.region(workspace, |region| -> Result<()> {
            translate::ge_to_tiles_async(region, &a_nat, a_tiles, &sequence, &request)?;
            for n in 0..desc.nt() {
                for m in 0..desc.mt() {
                    let (a_tile, t_tile) =
                        unsafe { (a_tiles.view_tile_raw(m, n), t_tiles.tile_raw(m, n)) };
                    match panel {
                        Panel::Qr => {
                            tasks::geqrt(region, ib, a_tile, t_tile, &sequence, &request)
                        }
                        Panel::Lq => {
                            tasks::gelqt(region, ib, a_tile, t_tile, &sequence, &request)
                        }
                    }
                }
            }
            Ok(())
        })?
    };
    finish(&sequence, submitted)?;

    log::debug!(
        target: "tilework",
        "factored {}×{} tiles of a {m}×{n} matrix ({panel:?})",
        desc.mt(),
        desc.nt(),
    );
    Ok(TileFactors {
        desc,
        tiles,
        t_desc,
        t,
    })
}

/// QR factorization of every tile of the `m×n` matrix `a`, independently.
///
/// Tile `(i, j)` is factored as `Q R` with [`kernel::geqrt`](crate::kernel::geqrt), using the
/// context's inner blocking size. This is the building block of tiled QR factorizations.
pub fn factor_tiles_qr<E: TileScalar>(
    ctx: &Context,
    m: usize,
    n: usize,
    a: &[E],
    lda: usize,
) -> Result<TileFactors<E>> {
    factor_tiles(ctx, Panel::Qr, m, n, a, lda)
}

/// LQ factorization of every tile of the `m×n` matrix `a`, independently. See
/// [`factor_tiles_qr`].
pub fn factor_tiles_lq<E: TileScalar>(
    ctx: &Context,
    m: usize,
    n: usize,
    a: &[E],
    lda: usize,
) -> Result<TileFactors<E>> {
    factor_tiles(ctx, Panel::Lq, m, n, a, lda)
}
