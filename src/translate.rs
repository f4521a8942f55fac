//! Translation between natural layouts and tiled storage.
//!
//! Each translator submits one copy task per tile of the target view. The tasks only touch the
//! part of each tile covered by the view, and the part of the natural matrix matching it, so
//! translating a submatrix leaves everything around it untouched.
//!
//! The `*_async` front ends validate their arguments and check the sequence before submitting
//! anything. The plain routines assume valid arguments and only skip their work once the
//! sequence has failed.

use crate::{
    assert,
    desc::StorageKind,
    sched::Region,
    storage::{NaturalBand, NaturalMatrix, TileMatrix},
    tasks, Request, Result, Sequence, TileError, TileScalar, Uplo,
};

fn check_dense_shape<E: TileScalar>(
    natural: &NaturalMatrix<'_, E>,
    a: &TileMatrix<'_, E>,
) -> Result<()> {
    let desc = a.desc();
    desc.check()?;
    if desc.kind() != StorageKind::General {
        return Err(TileError::config("dense translation needs a dense descriptor"));
    }
    if (natural.nrows(), natural.ncols()) != (desc.m(), desc.n()) {
        return Err(TileError::config(format!(
            "natural matrix is {}×{}, tiled view is {}×{}",
            natural.nrows(),
            natural.ncols(),
            desc.m(),
            desc.n()
        )));
    }
    Ok(())
}

fn check_band_shape<E: TileScalar>(
    natural: &NaturalBand<'_, E>,
    a: &TileMatrix<'_, E>,
) -> Result<()> {
    let desc = a.desc();
    desc.check()?;
    if desc.kind() != StorageKind::Band(natural.uplo()) {
        return Err(TileError::config(format!(
            "natural band storage is {:?}, tiled storage is {:?}",
            natural.uplo(),
            desc.kind()
        )));
    }
    if (natural.kl(), natural.ku()) != (desc.kl(), desc.ku()) {
        return Err(TileError::config(format!(
            "natural band has bandwidths ({}, {}), tiled storage ({}, {})",
            natural.kl(),
            natural.ku(),
            desc.kl(),
            desc.ku()
        )));
    }
    if (natural.nrows(), natural.ncols()) != (desc.m(), desc.n()) {
        return Err(TileError::config(format!(
            "natural band is {}×{}, tiled view is {}×{}",
            natural.nrows(),
            natural.ncols(),
            desc.m(),
            desc.n()
        )));
    }
    Ok(())
}

/// Copies a column-major matrix into the tiled view `a`.
pub fn ge_to_tiles<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    natural: &'scope NaturalMatrix<'_, E>,
    a: &'scope TileMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.is_failed() {
        return;
    }
    let desc = a.desc();
    assert!(all(natural.nrows() == desc.m(), natural.ncols() == desc.n()));

    for n in 0..desc.nt() {
        let (col, width) = (desc.view_col_start(n), desc.tile_nview(n));
        for m in 0..desc.mt() {
            let (row, height) = (desc.view_row_start(m), desc.tile_mview(m));
            let (src, dst) = unsafe {
                (
                    natural.block_raw(row, col, height, width).into_const(),
                    a.view_tile_raw(m, n),
                )
            };
            tasks::lacpy(region, Uplo::General, src, dst, sequence, request);
        }
    }
}

/// Copies the tiled view `a` into a column-major matrix.
pub fn tiles_to_ge<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    a: &'scope TileMatrix<'_, E>,
    natural: &'scope NaturalMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.is_failed() {
        return;
    }
    let desc = a.desc();
    assert!(all(natural.nrows() == desc.m(), natural.ncols() == desc.n()));

    for n in 0..desc.nt() {
        let (col, width) = (desc.view_col_start(n), desc.tile_nview(n));
        for m in 0..desc.mt() {
            let (row, height) = (desc.view_row_start(m), desc.tile_mview(m));
            let (src, dst) = unsafe {
                (
                    a.view_tile_raw(m, n).into_const(),
                    natural.block_raw(row, col, height, width),
                )
            };
            tasks::lacpy(region, Uplo::General, src, dst, sequence, request);
        }
    }
}

/// Copies a band matrix into banded tiled storage. Only tiles intersecting the band are
/// visited, and their entries outside the band are zeroed.
pub fn band_to_tiles<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    natural: &'scope NaturalBand<'_, E>,
    a: &'scope TileMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.is_failed() {
        return;
    }
    let desc = a.desc();
    assert!(all(natural.nrows() == desc.m(), natural.ncols() == desc.n()));

    for n in 0..desc.nt() {
        let (col, width) = (desc.view_col_start(n), desc.tile_nview(n));
        for m in desc.band_tile_rows(n) {
            let (row, height) = (desc.view_row_start(m), desc.tile_mview(m));
            let (src, dst) = unsafe {
                (
                    natural.block_raw(row, col, height, width),
                    a.view_tile_raw(m, n),
                )
            };
            tasks::lacpy_band_to_tile(region, src, dst, sequence, request);
        }
    }
}

/// Copies banded tiled storage back into a band matrix. Only entries inside the band are
/// written.
pub fn tiles_to_band<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    a: &'scope TileMatrix<'_, E>,
    natural: &'scope NaturalBand<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) {
    if sequence.is_failed() {
        return;
    }
    let desc = a.desc();
    assert!(all(natural.nrows() == desc.m(), natural.ncols() == desc.n()));

    for n in 0..desc.nt() {
        let (col, width) = (desc.view_col_start(n), desc.tile_nview(n));
        for m in desc.band_tile_rows(n) {
            let (row, height) = (desc.view_row_start(m), desc.tile_mview(m));
            let (src, dst) = unsafe {
                (
                    a.view_tile_raw(m, n).into_const(),
                    natural.block_raw(row, col, height, width),
                )
            };
            tasks::lacpy_tile_to_band(region, src, dst, sequence, request);
        }
    }
}

/// Validating front end of [`ge_to_tiles`].
///
/// # Errors
///
/// - [`TileError::Config`] when the shapes do not match.
/// - [`TileError::SequenceFailed`] when the sequence already failed; the request records it.
pub fn ge_to_tiles_async<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    natural: &'scope NaturalMatrix<'_, E>,
    a: &'scope TileMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) -> Result<()> {
    check_dense_shape(natural, a)?;
    sequence.check(request)?;
    if a.desc().m() == 0 || a.desc().n() == 0 {
        return Ok(());
    }
    ge_to_tiles(region, natural, a, sequence, request);
    Ok(())
}

/// Validating front end of [`tiles_to_ge`]. Errors as in [`ge_to_tiles_async`].
pub fn tiles_to_ge_async<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    a: &'scope TileMatrix<'_, E>,
    natural: &'scope NaturalMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) -> Result<()> {
    check_dense_shape(natural, a)?;
    sequence.check(request)?;
    if a.desc().m() == 0 || a.desc().n() == 0 {
        return Ok(());
    }
    tiles_to_ge(region, a, natural, sequence, request);
    Ok(())
}

/// Validating front end of [`band_to_tiles`]. The band storage kind and bandwidths of both
/// sides must agree.
pub fn band_to_tiles_async<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    natural: &'scope NaturalBand<'_, E>,
    a: &'scope TileMatrix<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) -> Result<()> {
    check_band_shape(natural, a)?;
    sequence.check(request)?;
    if a.desc().m() == 0 || a.desc().n() == 0 {
        return Ok(());
    }
    band_to_tiles(region, natural, a, sequence, request);
    Ok(())
}

/// Validating front end of [`tiles_to_band`].
pub fn tiles_to_band_async<'scope, E: TileScalar>(
    region: &Region<'_, 'scope>,
    a: &'scope TileMatrix<'_, E>,
    natural: &'scope NaturalBand<'_, E>,
    sequence: &'scope Sequence,
    request: &'scope Request,
) -> Result<()> {
    check_band_shape(natural, a)?;
    sequence.check(request)?;
    if a.desc().m() == 0 || a.desc().n() == 0 {
        return Ok(());
    }
    tiles_to_band(region, a, natural, sequence, request);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;
    use crate::{Config, Context, Descriptor, Precision};
    use dyn_stack::StackReq;

    fn context() -> Context {
        Context::new(
            Config::default()
                .with_tile_size(4)
                .with_inner_block(2)
                .with_num_threads(4),
        )
        .unwrap()
    }

    #[test]
    fn eight_by_eight_round_trip() {
        let ctx = context();
        let sequence = Sequence::new();
        let request = Request::new();

        let mut original: Vec<f64> = (1..=64).map(|x| x as f64).collect();
        let expected = original.clone();
        let desc = Descriptor::general(Precision::Double, 2, 2, 8, 8, 0, 0, 8, 8).unwrap();
        let mut tiles = vec![0.0f64; 64];
        let mut back = vec![0.0f64; 64];
        {
            let natural = NaturalMatrix::new(&mut original, 8, 8, 8).unwrap();
            let a = TileMatrix::new(desc, &mut tiles).unwrap();
            let out = NaturalMatrix::new(&mut back, 8, 8, 8).unwrap();
            ctx.region(StackReq::empty(), |region| {
                ge_to_tiles_async(region, &natural, &a, &sequence, &request)?;
                tiles_to_ge_async(region, &a, &out, &sequence, &request)
            })
            .unwrap()
            .unwrap();
        }
        assert!(sequence.status().is_ok());
        // tile (1, 0) holds rows 2..4 of columns 0..2
        assert_eq!(&tiles[4..8], &[3.0, 4.0, 11.0, 12.0]);
        assert_eq!(back, expected);
    }

    #[test]
    fn unaligned_view_leaves_the_rest_untouched() {
        let ctx = context();
        let sequence = Sequence::new();
        let request = Request::new();

        let (m, n) = (7, 5);
        let mut natural: Vec<f32> = (0..m * n).map(|x| x as f32 + 0.5).collect();
        let expected = natural.clone();
        let desc = Descriptor::general(Precision::Single, 4, 4, 10, 10, 0, 0, 10, 10).unwrap();
        let mut tiles = vec![-99.0f32; 100];
        let mut back = vec![0.0f32; m * n];
        {
            let src = NaturalMatrix::new(&mut natural, m, n, m).unwrap();
            let mut full = TileMatrix::new(desc, &mut tiles).unwrap();
            let view = full.view(1, 2, m, n).unwrap();
            let out = NaturalMatrix::new(&mut back, m, n, m).unwrap();
            ctx.region(StackReq::empty(), |region| {
                ge_to_tiles_async(region, &src, &view, &sequence, &request)?;
                tiles_to_ge_async(region, &view, &out, &sequence, &request)
            })
            .unwrap()
            .unwrap();
        }
        assert_eq!(back, expected);

        let mut check = TileMatrix::new(desc, &mut tiles).unwrap();
        let inside = |r: usize, c: usize| (1..1 + m).contains(&r) && (2..2 + n).contains(&c);
        for tn in 0..3 {
            for tm in 0..3 {
                let tile = check.tile(tm, tn);
                for c in 0..tile.ncols() {
                    for r in 0..tile.nrows() {
                        let (gr, gc) = (4 * tm + r, 4 * tn + c);
                        if inside(gr, gc) {
                            let x = expected[(gr - 1) + (gc - 2) * m];
                            assert_eq!(tile.read(r, c), x);
                        } else {
                            assert_eq!(tile.read(r, c), -99.0);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn band_round_trip() {
        let ctx = context();
        let nb = 3;
        let n = 10;
        for (uplo, kl, ku) in [(Uplo::Lower, 4, 0), (Uplo::Upper, 0, 2), (Uplo::General, 2, 1)] {
            let sequence = Sequence::new();
            let request = Request::new();

            let du = match uplo {
                Uplo::General => kl + ku,
                Uplo::Upper => ku,
                Uplo::Lower => 0,
            };
            let ldab = du + kl + 1;
            let mut ab: Vec<f64> = (0..ldab * n).map(|x| x as f64 + 1.0).collect();
            let mut back = vec![0.0f64; ldab * n];

            let lm = Descriptor::band_storage_rows(uplo, nb, kl, ku);
            let desc = Descriptor::general_band(
                Precision::Double,
                uplo,
                nb,
                nb,
                lm,
                n,
                0,
                0,
                n,
                n,
                kl,
                ku,
            )
            .unwrap();
            let mut tiles = vec![f64::NAN; desc.storage_len()];
            {
                let src = NaturalBand::new(&mut ab, uplo, n, n, kl, ku, ldab).unwrap();
                let a = TileMatrix::new(desc, &mut tiles).unwrap();
                let out = NaturalBand::new(&mut back, uplo, n, n, kl, ku, ldab).unwrap();
                ctx.region(StackReq::empty(), |region| {
                    band_to_tiles_async(region, &src, &a, &sequence, &request)?;
                    tiles_to_band_async(region, &a, &out, &sequence, &request)
                })
                .unwrap()
                .unwrap();
            }
            assert!(sequence.status().is_ok());

            let mut src = NaturalBand::new(&mut ab, uplo, n, n, kl, ku, ldab).unwrap();
            let mut out = NaturalBand::new(&mut back, uplo, n, n, kl, ku, ldab).unwrap();
            let mut a = TileMatrix::new(desc, &mut tiles).unwrap();
            for c in 0..n {
                for r in 0..n {
                    assert_eq!(out.read(r, c), src.read(r, c));
                }
            }
            // visited tiles hold the band and zeros around it
            for tn in 0..desc.nt() {
                for tm in desc.band_tile_rows(tn) {
                    let tile = a.tile(tm, tn);
                    for c in 0..tile.ncols() {
                        for r in 0..tile.nrows() {
                            let (gr, gc) = (tm * nb + r, tn * nb + c);
                            assert_eq!(tile.read(r, c), src.read(gr, gc));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn validation_and_failed_sequences() {
        let ctx = context();
        let desc = Descriptor::general(Precision::Double, 2, 2, 4, 4, 0, 0, 4, 4).unwrap();
        let mut data = vec![1.0f64; 16];
        let mut tiles = vec![0.0f64; 16];
        let sequence = Sequence::new();
        let request = Request::new();
        {
            let wrong = NaturalMatrix::new(&mut data, 3, 4, 4).unwrap();
            let a = TileMatrix::new(desc, &mut tiles).unwrap();
            let result = ctx
                .region(StackReq::empty(), |region| {
                    ge_to_tiles_async(region, &wrong, &a, &sequence, &request)
                })
                .unwrap();
            assert!(matches!(result, Err(TileError::Config { .. })));
            assert!(request.status().is_ok());
        }

        sequence.fail(&Request::new(), TileError::NumericFailure { position: 1 });
        {
            let natural = NaturalMatrix::new(&mut data, 4, 4, 4).unwrap();
            let a = TileMatrix::new(desc, &mut tiles).unwrap();
            let result = ctx
                .region(StackReq::empty(), |region| {
                    ge_to_tiles_async(region, &natural, &a, &sequence, &request)
                })
                .unwrap();
            assert_eq!(result, Err(TileError::SequenceFailed));
            assert_eq!(request.status(), Err(TileError::SequenceFailed));
        }
        assert!(tiles.iter().all(|&x| x == 0.0));
    }
}
