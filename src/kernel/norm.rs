use super::illegal;
use crate::{tile::TileRef, RealScalar, Result, TileScalar, Uplo};

/// Scaled sum of squares, representing `scale² * sumsq`.
///
/// Keeping the largest magnitude seen so far in `scale` avoids overflow and underflow when
/// accumulating the squares.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SumSquares<R> {
    pub scale: R,
    pub sumsq: R,
}

impl<R: RealScalar> Default for SumSquares<R> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RealScalar> SumSquares<R> {
    /// Empty sum.
    #[inline]
    pub fn new() -> Self {
        Self {
            scale: R::zero(),
            sumsq: R::one(),
        }
    }

    /// Adds `weight * value²`, where `value` is non-negative.
    #[inline]
    pub fn push(&mut self, value: R, weight: R) {
        if value == R::zero() {
            return;
        }
        if self.scale < value {
            let ratio = self.scale / value;
            self.sumsq = weight + self.sumsq * ratio * ratio;
            self.scale = value;
        } else {
            let ratio = value / self.scale;
            self.sumsq += weight * ratio * ratio;
        }
    }

    /// Adds another sum of squares.
    #[inline]
    pub fn merge(&mut self, other: Self) {
        if other.scale == R::zero() {
            return;
        }
        if self.scale < other.scale {
            let ratio = self.scale / other.scale;
            self.sumsq = other.sumsq + self.sumsq * ratio * ratio;
            self.scale = other.scale;
        } else {
            let ratio = other.scale / self.scale;
            self.sumsq += other.sumsq * ratio * ratio;
        }
    }

    /// `sqrt(scale² * sumsq)`.
    #[inline]
    pub fn value(self) -> R {
        if self.scale == R::zero() {
            R::zero()
        } else {
            self.scale * self.sumsq.sqrt()
        }
    }
}

/// Accumulates the squares of every entry of `a` into `ssq`.
pub fn gessq<E: TileScalar>(a: TileRef<'_, E>, ssq: &mut SumSquares<E::Real>) -> Result<()> {
    let one = E::Real::one();
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            ssq.push(a.read(i, j).abs(), one);
        }
    }
    Ok(())
}

/// Accumulates the squares of the symmetric matrix whose triangle `uplo` is stored in `a`.
/// Strictly off-diagonal entries count twice.
pub fn syssq<E: TileScalar>(
    uplo: Uplo,
    a: TileRef<'_, E>,
    ssq: &mut SumSquares<E::Real>,
) -> Result<()> {
    if uplo == Uplo::General {
        return Err(illegal(1));
    }
    if a.nrows() != a.ncols() {
        return Err(illegal(2));
    }
    let one = E::Real::one();
    let two = one + one;
    let n = a.nrows();
    for j in 0..n {
        let rows = match uplo {
            Uplo::Upper => 0..j,
            _ => j + 1..n,
        };
        for i in rows {
            ssq.push(a.read(i, j).abs(), two);
        }
    }
    for j in 0..n {
        ssq.push(a.read(j, j).abs(), one);
    }
    Ok(())
}

/// Combines per-tile partial sums into a Frobenius norm. Off-diagonal tiles of a symmetric
/// matrix are stored once and count twice.
pub fn ssq_combine<R: RealScalar>(offdiag: &[SumSquares<R>], diag: &[SumSquares<R>]) -> R {
    let mut total = SumSquares::<R>::new();
    for &part in offdiag {
        total.merge(part);
    }
    total.sumsq = total.sumsq + total.sumsq;
    for &part in diag {
        total.merge(part);
    }
    total.value()
}
