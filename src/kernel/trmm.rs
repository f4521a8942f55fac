use super::illegal;
use crate::{
    tile::{warn_if_strided, TileMut, TileRef},
    Diag, Result, Side, TileScalar, Transpose, Uplo,
};
use reborrow::*;

/// Entry `(i, j)` of `op(a)` for the triangle `uplo` of `a`, zero outside of it.
#[inline]
fn tri<E: TileScalar>(
    a: TileRef<'_, E>,
    uplo: Uplo,
    transa: Transpose,
    diag: Diag,
    i: usize,
    j: usize,
) -> E {
    if i == j && diag == Diag::Unit {
        return E::one();
    }
    let (r, c) = match transa {
        Transpose::NoTrans => (i, j),
        _ => (j, i),
    };
    let stored = match uplo {
        Uplo::Upper => r <= c,
        _ => r >= c,
    };
    if !stored {
        return E::zero();
    }
    let x = a.read(r, c);
    if transa == Transpose::ConjTrans {
        x.conj()
    } else {
        x
    }
}

/// Computes `b := alpha * op(a) * b` or `b := alpha * b * op(a)`, where `a` is triangular and
/// only its triangle `uplo` is read.
///
/// # Errors
///
/// - `KernelArgument { index: 2 }` for `Uplo::General`.
/// - `KernelArgument { index: 6 }` when `a` is not square.
/// - `KernelArgument { index: 7 }` when the order of `a` does not match `b`.
pub fn trmm<E: TileScalar>(
    side: Side,
    uplo: Uplo,
    transa: Transpose,
    diag: Diag,
    alpha: E,
    a: TileRef<'_, E>,
    mut b: TileMut<'_, E>,
) -> Result<()> {
    if uplo == Uplo::General {
        return Err(illegal(2));
    }
    if a.nrows() != a.ncols() {
        return Err(illegal(6));
    }
    let (m, n) = (b.nrows(), b.ncols());
    let order = match side {
        Side::Left => m,
        Side::Right => n,
    };
    if a.nrows() != order {
        return Err(illegal(7));
    }
    warn_if_strided("trmm", b.rb());

    if alpha.is_zero() {
        b.fill(E::zero());
        return Ok(());
    }

    // op(a) is upper triangular
    let upper = (uplo == Uplo::Upper) == (transa == Transpose::NoTrans);
    let op = |i: usize, j: usize| tri(a, uplo, transa, diag, i, j);

    match side {
        Side::Left => {
            // row i reads rows on its side of the diagonal, which are still unchanged
            for c in 0..n {
                for step in 0..m {
                    let i = if upper { step } else { m - 1 - step };
                    let ls = if upper { i..m } else { 0..i + 1 };
                    let mut acc = E::zero();
                    for l in ls {
                        acc += op(i, l) * b.read(l, c);
                    }
                    b.write(i, c, alpha * acc);
                }
            }
        }
        Side::Right => {
            for step in 0..n {
                let j = if upper { n - 1 - step } else { step };
                for r in 0..m {
                    let ls = if upper { 0..j + 1 } else { j..n };
                    let mut acc = E::zero();
                    for l in ls {
                        acc += b.read(r, l) * op(l, j);
                    }
                    b.write(r, j, alpha * acc);
                }
            }
        }
    }
    Ok(())
}
