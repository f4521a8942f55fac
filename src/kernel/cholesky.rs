use super::illegal;
use crate::{tile::TileMut, RealScalar, Result, TileError, TileScalar, Uplo};

/// Cholesky factorization of a Hermitian positive definite tile, in place.
///
/// With `Uplo::Lower`, computes `A = L * L^H` and stores `L` in the lower triangle. With
/// `Uplo::Upper`, computes `A = U^H * U` and stores `U` in the upper triangle. The other
/// triangle is not accessed.
///
/// # Errors
///
/// - `KernelArgument { index: 1 }` for `Uplo::General`.
/// - `KernelArgument { index: 2 }` when the tile is not square.
/// - `NumericFailure { position }` when the leading minor of order `position` is not positive
///   definite. Columns before `position` hold their factor.
pub fn potrf<E: TileScalar>(uplo: Uplo, a: TileMut<'_, E>) -> Result<()> {
    if uplo == Uplo::General {
        return Err(illegal(1));
    }
    if a.nrows() != a.ncols() {
        return Err(illegal(2));
    }
    match uplo {
        Uplo::Upper => potrf_lower(a.transpose_mut(), true),
        _ => potrf_lower(a, false),
    }
}

/// Lower factorization. `conj` works on the transpose of an upper tile, where the stored
/// entries are the conjugates of the lower ones.
fn potrf_lower<E: TileScalar>(mut a: TileMut<'_, E>, conj: bool) -> Result<()> {
    let n = a.nrows();
    let read = |a: &TileMut<'_, E>, i: usize, j: usize| {
        let x = a.read(i, j);
        if conj {
            x.conj()
        } else {
            x
        }
    };

    for j in 0..n {
        let mut d = a.read(j, j).re();
        for l in 0..j {
            d -= read(&a, j, l).abs2();
        }
        if d <= E::Real::zero() || !d.is_finite() {
            return Err(TileError::NumericFailure { position: j + 1 });
        }
        let ljj = d.sqrt();
        a.write(j, j, E::from_real(ljj));

        for i in j + 1..n {
            let mut s = read(&a, i, j);
            for l in 0..j {
                s -= read(&a, i, l) * read(&a, j, l).conj();
            }
            let s = s.scale_real(E::Real::one() / ljj);
            a.write(i, j, if conj { s.conj() } else { s });
        }
    }
    Ok(())
}
