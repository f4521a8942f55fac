//! Kernels wrapped as scheduled tasks.
//!
//! Each function declares the footprint of its operands, then submits a body that checks the
//! [`Sequence`] first, runs the kernel, and records a kernel failure in the sequence and the
//! request. Operands are borrowed for `'scope`, so they outlive the region; ordering between
//! tasks touching the same tiles comes from the declared footprints alone.

use crate::{
    assert,
    kernel::{self, SumSquares},
    sched::{MemRange, Region, Task},
    storage::BandBlock,
    tile::{TileMut, TileRef},
    Diag, RealScalar, Request, Result, Sequence, Side, TileError, TileScalar, Transpose, Uplo,
};
use dyn_stack::{SizeOverflow, StackReq};

fn record(kernel: &'static str, sequence: &Sequence, request: &Request, result: Result<()>) {
    if let Err(err) = result {
        log::error!(target: "tilework", "{kernel} failed: {err}");
        sequence.fail(request, err);
    }
}

/// Fails the call when the region's scratch buffers cannot hold `req`.
fn ensure_workspace(
    region: &Region<'_, '_>,
    kernel: &'static str,
    req: core::result::Result<StackReq, SizeOverflow>,
    sequence: &Sequence,
    request: &Request,
) -> bool {
    let bytes = match req {
        Ok(req) if region.workspace_covers(req) => return true,
        Ok(req) => req.size_bytes(),
        Err(_) => usize::MAX,
    };
    record(
        kernel,
        sequence,
        request,
        Err(TileError::OutOfMemory { bytes }),
    );
    false
}

/// Scratch space of a [`geqrt`] task on an `m×n` tile.
pub fn geqrt_req<E: TileScalar>(
    ib: usize,
    m: usize,
    n: usize,
) -> core::result::Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        StackReq::try_new::<E>(Ord::min(m, n))?,
        StackReq::try_new::<E>(kernel::geqrt_work_len(ib, m, n))?,
    ])
}

/// Scratch space of a [`gelqt`] task on an `m×n` tile.
pub fn gelqt_req<E: TileScalar>(
    ib: usize,
    m: usize,
    n: usize,
) -> core::result::Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        StackReq::try_new::<E>(Ord::min(m, n))?,
        StackReq::try_new::<E>(kernel::gelqt_work_len(ib, m, n))?,
    ])
}

/// Copies the triangle `uplo` of `a` into `b`.
pub fn lacpy<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    uplo: Uplo,
    a: TileRef<'scope, E>,
    b: TileMut<'scope, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let task = Task::new("lacpy").reads(a.footprint()).writes(b.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        record("lacpy", sequence, request, kernel::lacpy(uplo, a, b));
    });
}

/// Copies a block of a band matrix into a tile, zeroing the entries outside the band.
pub fn lacpy_band_to_tile<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    src: BandBlock<'scope, E>,
    dst: TileMut<'scope, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let task = Task::new("lacpy_band_to_tile")
        .reads(src.footprint())
        .writes(dst.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let result = kernel::lacpy_band_to_tile(&src, dst);
        record("lacpy_band_to_tile", sequence, request, result);
    });
}

/// Copies the in-band entries of a tile into a block of a band matrix.
pub fn lacpy_tile_to_band<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    src: TileRef<'scope, E>,
    mut dst: BandBlock<'scope, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let task = Task::new("lacpy_tile_to_band")
        .reads(src.footprint())
        .writes(dst.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let result = kernel::lacpy_tile_to_band(src, &mut dst);
        record("lacpy_tile_to_band", sequence, request, result);
    });
}

/// Sets a tile to `alpha` off the diagonal and `beta` on it. See [`kernel::laset`].
pub fn laset<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    uplo: Uplo,
    alpha: E,
    beta: E,
    a: TileMut<'scope, E>,
    offset: isize,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let task = Task::new("laset").writes(a.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        record(
            "laset",
            sequence,
            request,
            kernel::laset(uplo, alpha, beta, a, offset),
        );
    });
}

/// `c := alpha * op(a) * op(b) + beta * c`.
pub fn gemm<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    transa: Transpose,
    transb: Transpose,
    alpha: E,
    a: TileRef<'scope, E>,
    b: TileRef<'scope, E>,
    beta: E,
    c: TileMut<'scope, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let task = Task::new("gemm")
        .reads(a.footprint())
        .reads(b.footprint())
        .reads_writes(c.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let result = kernel::gemm(transa, transb, alpha, a, b, beta, c);
        record("gemm", sequence, request, result);
    });
}

/// Triangular tile product, `b := alpha * op(a) * b` or `b := alpha * b * op(a)`. See
/// [`kernel::trmm`].
pub fn trmm<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    side: Side,
    uplo: Uplo,
    transa: Transpose,
    diag: Diag,
    alpha: E,
    a: TileRef<'scope, E>,
    b: TileMut<'scope, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let task = Task::new("trmm").reads(a.footprint()).reads_writes(b.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let result = kernel::trmm(side, uplo, transa, diag, alpha, a, b);
        record("trmm", sequence, request, result);
    });
}

/// Symmetric rank-2k update of a diagonal tile. See [`kernel::syr2k`].
pub fn syr2k<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    uplo: Uplo,
    trans: Transpose,
    alpha: E,
    a: TileRef<'scope, E>,
    b: TileRef<'scope, E>,
    beta: E,
    c: TileMut<'scope, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let task = Task::new("syr2k")
        .reads(a.footprint())
        .reads(b.footprint())
        .reads_writes(c.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let result = kernel::syr2k(uplo, trans, alpha, a, b, beta, c);
        record("syr2k", sequence, request, result);
    });
}

/// QR factorization of one tile. See [`kernel::geqrt`].
///
/// `tau` and the kernel scratch space are taken from the worker's buffer, which must cover
/// [`geqrt_req`].
pub fn geqrt<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    ib: usize,
    a: TileMut<'scope, E>,
    t: TileMut<'scope, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let (m, n) = (a.nrows(), a.ncols());
    // empty tiles are a no-op for any `ib`
    if m == 0 || n == 0 {
        return;
    }
    let req = geqrt_req::<E>(ib, m, n);
    if !ensure_workspace(region, "geqrt", req, sequence, request) {
        return;
    }

    let task = Task::new("geqrt")
        .reads_writes(a.footprint())
        .writes(t.footprint());
    region.submit(task, move |stack| {
        if sequence.is_failed() {
            return;
        }
        let (tau, stack) = stack.make_raw::<E>(Ord::min(m, n));
        let (work, _) = stack.make_raw::<E>(kernel::geqrt_work_len(ib, m, n));
        record("geqrt", sequence, request, kernel::geqrt(ib, a, t, tau, work));
    });
}

/// LQ factorization of one tile. See [`kernel::gelqt`].
///
/// The worker's buffer must cover [`gelqt_req`].
pub fn gelqt<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    ib: usize,
    a: TileMut<'scope, E>,
    t: TileMut<'scope, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let (m, n) = (a.nrows(), a.ncols());
    // empty tiles are a no-op for any `ib`
    if m == 0 || n == 0 {
        return;
    }
    let req = gelqt_req::<E>(ib, m, n);
    if !ensure_workspace(region, "gelqt", req, sequence, request) {
        return;
    }

    let task = Task::new("gelqt")
        .reads_writes(a.footprint())
        .writes(t.footprint());
    region.submit(task, move |stack| {
        if sequence.is_failed() {
            return;
        }
        let (tau, stack) = stack.make_raw::<E>(Ord::min(m, n));
        let (work, _) = stack.make_raw::<E>(kernel::gelqt_work_len(ib, m, n));
        record("gelqt", sequence, request, kernel::gelqt(ib, a, t, tau, work));
    });
}

/// Cholesky factorization of a diagonal tile. A failure is reported at `offset + position`,
/// where `offset` is the index of the tile's first row in the whole matrix.
pub fn potrf<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    uplo: Uplo,
    a: TileMut<'scope, E>,
    offset: usize,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    let task = Task::new("potrf").reads_writes(a.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let result = kernel::potrf(uplo, a).map_err(|err| match err {
            TileError::NumericFailure { position } => TileError::NumericFailure {
                position: offset + position,
            },
            err => err,
        });
        record("potrf", sequence, request, result);
    });
}

#[inline]
fn store_ssq<R: TileScalar>(mut slot: TileMut<'_, R>, ssq: SumSquares<R>) {
    slot.write(0, 0, ssq.scale);
    slot.write(1, 0, ssq.sumsq);
}

#[inline]
fn load_ssq<R: TileScalar>(slots: TileRef<'_, R>, k: usize) -> SumSquares<R> {
    SumSquares {
        scale: slots.read(0, k),
        sumsq: slots.read(1, k),
    }
}

/// Sum of squares of a tile, stored as `[scale, sumsq]` in the `2×1` slot `ssq`.
pub fn gessq<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    a: TileRef<'scope, E>,
    ssq: TileMut<'scope, E::Real>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    assert!(all(ssq.nrows() == 2, ssq.ncols() == 1));
    let task = Task::new("gessq").reads(a.footprint()).writes(ssq.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let mut acc = SumSquares::new();
        let result = kernel::gessq(a, &mut acc);
        if result.is_ok() {
            store_ssq(ssq, acc);
        }
        record("gessq", sequence, request, result);
    });
}

/// Sum of squares of a symmetric diagonal tile stored in the triangle `uplo`, stored in the
/// `2×1` slot `ssq`.
pub fn syssq<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    uplo: Uplo,
    a: TileRef<'scope, E>,
    ssq: TileMut<'scope, E::Real>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    assert!(all(ssq.nrows() == 2, ssq.ncols() == 1));
    let task = Task::new("syssq").reads(a.footprint()).writes(ssq.footprint());
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let mut acc = SumSquares::new();
        let result = kernel::syssq(uplo, a, &mut acc);
        if result.is_ok() {
            store_ssq(ssq, acc);
        }
        record("syssq", sequence, request, result);
    });
}

/// Reduces the `2×p` off-diagonal slots and `2×q` diagonal slots into a Frobenius norm.
pub fn ssq_combine<'scope, R: RealScalar>(
    region: &Region<'_, 'scope>,
    offdiag: TileRef<'scope, R>,
    diag: TileRef<'scope, R>,
    value: &'scope mut R,
    sequence: &'scope Sequence,
) {
    let task = Task::new("ssq_combine")
        .reads(offdiag.footprint())
        .reads(diag.footprint())
        .writes([MemRange::of(&*value)]);
    region.submit(task, move |_| {
        if sequence.is_failed() {
            return;
        }
        let offdiag: Vec<_> = (0..offdiag.ncols()).map(|k| load_ssq(offdiag, k)).collect();
        let diag: Vec<_> = (0..diag.ncols()).map(|k| load_ssq(diag, k)).collect();
        *value = kernel::ssq_combine(&offdiag, &diag);
    });
}
