use super::illegal;
use crate::{
    storage::BandBlock,
    tile::{warn_if_strided, TileMut, TileRef},
    Result, TileScalar, Uplo,
};

/// Copies `a` into `b`, restricted to the triangle selected by `uplo`.
pub fn lacpy<E: TileScalar>(uplo: Uplo, a: TileRef<'_, E>, mut b: TileMut<'_, E>) -> Result<()> {
    if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
        return Err(illegal(3));
    }
    warn_if_strided("lacpy", a);

    for j in 0..a.ncols() {
        let rows = match uplo {
            Uplo::General => 0..a.nrows(),
            Uplo::Upper => 0..Ord::min(j + 1, a.nrows()),
            Uplo::Lower => Ord::min(j, a.nrows())..a.nrows(),
        };
        for i in rows {
            b.write(i, j, a.read(i, j));
        }
    }
    Ok(())
}

/// Copies a block of a band matrix into a tile. Tile entries outside the band are zeroed.
pub fn lacpy_band_to_tile<E: TileScalar>(
    src: &BandBlock<'_, E>,
    mut dst: TileMut<'_, E>,
) -> Result<()> {
    if src.nrows() != dst.nrows() || src.ncols() != dst.ncols() {
        return Err(illegal(2));
    }
    for j in 0..dst.ncols() {
        let band = src.band_rows(j);
        for i in 0..dst.nrows() {
            let value = if band.contains(&i) {
                src.read(i, j)
            } else {
                E::zero()
            };
            dst.write(i, j, value);
        }
    }
    Ok(())
}

/// Copies the in-band entries of a tile back into a block of a band matrix.
pub fn lacpy_tile_to_band<E: TileScalar>(
    src: TileRef<'_, E>,
    dst: &mut BandBlock<'_, E>,
) -> Result<()> {
    if src.nrows() != dst.nrows() || src.ncols() != dst.ncols() {
        return Err(illegal(2));
    }
    for j in 0..src.ncols() {
        for i in dst.band_rows(j) {
            dst.write(i, j, src.read(i, j));
        }
    }
    Ok(())
}

/// Sets the off-diagonal entries of the triangle selected by `uplo` to `alpha` and the diagonal
/// entries to `beta`.
///
/// Entry `(i, j)` of the tile lies on the diagonal of the enclosing matrix when
/// `j - i == offset`.
pub fn laset<E: TileScalar>(
    uplo: Uplo,
    alpha: E,
    beta: E,
    mut a: TileMut<'_, E>,
    offset: isize,
) -> Result<()> {
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            let d = j as isize - i as isize;
            let value = if d == offset {
                beta
            } else {
                match uplo {
                    Uplo::General => alpha,
                    Uplo::Upper if d > offset => alpha,
                    Uplo::Lower if d < offset => alpha,
                    _ => continue,
                }
            };
            a.write(i, j, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::NaturalBand, TileError};

    #[test]
    fn copies_triangles() {
        let a: Vec<f64> = (0..12).map(|x| x as f64 + 1.0).collect();
        let a = TileRef::from_col_major(&a, 4, 3, 4);

        let mut b = vec![0.0f64; 12];
        lacpy(Uplo::Upper, a, TileMut::from_col_major(&mut b, 4, 3, 4)).unwrap();
        assert_eq!(
            b,
            vec![1.0, 0.0, 0.0, 0.0, 5.0, 6.0, 0.0, 0.0, 9.0, 10.0, 11.0, 0.0]
        );

        let mut b = vec![0.0f64; 12];
        lacpy(Uplo::Lower, a, TileMut::from_col_major(&mut b, 4, 3, 4)).unwrap();
        assert_eq!(
            b,
            vec![1.0, 2.0, 3.0, 4.0, 0.0, 6.0, 7.0, 8.0, 0.0, 0.0, 11.0, 12.0]
        );

        let mut b = vec![0.0f64; 9];
        assert_eq!(
            lacpy(Uplo::General, a, TileMut::from_col_major(&mut b, 3, 3, 3)),
            Err(TileError::KernelArgument { index: 3 })
        );
    }

    #[test]
    fn sets_diagonal_with_offset() {
        let mut a = vec![0.0f64; 9];
        laset(Uplo::Upper, 2.0, 5.0, TileMut::from_col_major(&mut a, 3, 3, 3), 1).unwrap();
        // diagonal of the enclosing matrix runs through (0, 1) and (1, 2)
        assert_eq!(a, vec![0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 2.0, 5.0, 0.0]);

        let mut a = vec![9.0f64; 4];
        laset(Uplo::General, 0.0, 1.0, TileMut::from_col_major(&mut a, 2, 2, 2), 0).unwrap();
        assert_eq!(a, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn band_round_trip_through_a_tile() {
        let n = 5;
        let ldab = 3;
        let mut ab: Vec<f64> = (0..ldab * n).map(|x| x as f64).collect();
        let mut band = NaturalBand::new(&mut ab, Uplo::Lower, n, n, 2, 0, ldab).unwrap();

        let mut tile = vec![-1.0f64; 9];
        let block = unsafe { band.block_raw(1, 0, 3, 3) };
        lacpy_band_to_tile(&block, TileMut::from_col_major(&mut tile, 3, 3, 3)).unwrap();
        // (1, 0) (2, 0) are in band, (3, 0) is not
        assert_eq!(&tile[..3], &[1.0, 2.0, 0.0]);
        // column 1 holds rows 1..4, all in band
        assert_eq!(&tile[3..6], &[3.0, 4.0, 5.0]);
        // column 2 starts at the diagonal (2, 2)
        assert_eq!(&tile[6..], &[0.0, 6.0, 7.0]);

        for x in tile.iter_mut() {
            *x *= 10.0;
        }
        let mut block = unsafe { band.block_raw(1, 0, 3, 3) };
        lacpy_tile_to_band(TileRef::from_col_major(&tile, 3, 3, 3), &mut block).unwrap();
        assert_eq!(band.read(2, 0), 20.0);
        assert_eq!(band.read(3, 2), 70.0);
        // outside the block
        assert_eq!(band.read(0, 0), 0.0);
    }
}
