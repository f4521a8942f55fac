use super::illegal;
use crate::{
    tile::{warn_if_strided, TileMut, TileRef},
    Result, TileScalar, Transpose, Uplo,
};
use reborrow::*;

/// Computes `c := alpha * op(a) * op(b)^T + alpha * op(b) * op(a)^T + beta * c` on the triangle
/// `uplo` of `c`, where `op(x)` is `x` for `Transpose::NoTrans` and `x^T` for
/// `Transpose::Trans`. The update is symmetric, not Hermitian: nothing is conjugated.
///
/// When `beta` is zero, `c` is overwritten without being read. The other triangle of `c` is
/// not accessed.
///
/// # Errors
///
/// - `KernelArgument { index: 1 }` for `Uplo::General`.
/// - `KernelArgument { index: 2 }` for `Transpose::ConjTrans`.
/// - `KernelArgument { index: 4 }` when `op(a)` does not have as many rows as `c`.
/// - `KernelArgument { index: 5 }` when `b` and `a` differ in shape.
/// - `KernelArgument { index: 7 }` when `c` is not square.
pub fn syr2k<E: TileScalar>(
    uplo: Uplo,
    trans: Transpose,
    alpha: E,
    a: TileRef<'_, E>,
    b: TileRef<'_, E>,
    beta: E,
    mut c: TileMut<'_, E>,
) -> Result<()> {
    if uplo == Uplo::General {
        return Err(illegal(1));
    }
    if trans == Transpose::ConjTrans {
        return Err(illegal(2));
    }
    let n = c.nrows();
    if c.ncols() != n {
        return Err(illegal(7));
    }
    let (a, b) = match trans {
        Transpose::NoTrans => (a, b),
        _ => (a.transpose(), b.transpose()),
    };
    if a.nrows() != n {
        return Err(illegal(4));
    }
    if b.nrows() != a.nrows() || b.ncols() != a.ncols() {
        return Err(illegal(5));
    }
    warn_if_strided("syr2k", c.rb());

    let k = a.ncols();
    for j in 0..n {
        let rows = match uplo {
            Uplo::Upper => 0..j + 1,
            _ => j..n,
        };
        for i in rows {
            let mut acc = E::zero();
            for l in 0..k {
                acc += a.read(i, l) * b.read(j, l) + b.read(i, l) * a.read(j, l);
            }
            let value = if beta.is_zero() {
                alpha * acc
            } else {
                alpha * acc + beta * c.read(i, j)
            };
            c.write(i, j, value);
        }
    }
    Ok(())
}
